//! Client for the external cross-chain swap tracking service.
//!
//! The engine only ever asks one question of a swap: which Bitcoin
//! transaction funded it.

mod errors;
mod http;
mod traits;
mod types;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use errors::SwapTrackerError;
pub use http::HttpSwapTracker;
pub use traits::SwapTracker;
pub use types::SwapRecord;
