//! Publishes derived deposit statuses to whoever is watching.

mod snapshot;
mod status_manager;

pub use snapshot::{DepositView, ResolverStatus, StatusSnapshot, StatusTransition};
pub use status_manager::{StatusChannel, StatusError};
