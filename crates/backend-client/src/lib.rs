//! Fetcher for the backend-owned deposit records.

mod client;
mod envelope;
mod errors;
mod traits;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use client::BackendClient;
pub use errors::BackendError;
pub use traits::DepositApi;
