//! # Event Handlers
//!
//! Bus handlers of the master coordinator.

pub mod asset_requests;

pub use asset_requests::{MasterRequestHandler, MasterRequestListener, BALANCE_UPDATE_EVENT, MASTER_SERVICE_ID};
