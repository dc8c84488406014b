pub mod listener;

pub use listener::ResponseListener;
