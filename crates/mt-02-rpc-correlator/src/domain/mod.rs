pub mod errors;
pub mod pending;
pub mod target;

pub use errors::*;
pub use pending::*;
pub use target::*;
