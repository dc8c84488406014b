pub mod listener;

pub use listener::RegistryListener;
