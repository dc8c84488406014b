pub mod dispatcher;
pub mod presence;

pub use dispatcher::{QueryDispatcher, QueryHandler, REQUEST_RECEIVED};
pub use presence::{announce, heartbeat_task};
