//! Reconciles backend records, local pending records and live chain data
//! into one effective status per deposit.

pub mod book;
pub mod cache;
pub mod clock;
pub mod derive;
pub mod errors;
pub mod policy;
pub mod progress;
mod refresh;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use book::{open_deposits, DepositBook};
pub use cache::{BlockchainDataCache, CacheEntry};
pub use clock::Now;
pub use derive::derive_status;
pub use errors::TrackerError;
pub use policy::StatusPolicy;
pub use progress::{progress_stage, ProgressIndicator};
pub use scheduler::{DepositSource, FocusState, FocusedView, Scheduler};
pub use session::TrackerSession;
