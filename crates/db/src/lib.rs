//! Persistence for client-side deposit hints.

pub mod errors;
pub mod file_store;
pub mod traits;

#[cfg(any(test, feature = "stubs"))]
pub mod stubs;

mod ops;

/// Wrapper result type for database operations.
pub type DbResult<T> = Result<T, errors::StoreError>;

pub use errors::StoreError;
pub use file_store::FilePendingStore;
pub use traits::PendingDepositStore;
