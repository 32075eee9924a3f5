//! Data types shared by the deposit tracker crates.
//!
//! The backend owns [`Deposit`] records, the local client owns
//! [`PendingDepositRecord`]s, and [`EffectiveStatus`] / [`ProgressStage`] are
//! always derived and never persisted.

pub mod deposit;
pub mod errors;
pub mod network;
pub mod pending;
pub mod status;

pub use deposit::{Deposit, DepositAction, DepositId, DepositStatus};
pub use errors::ParseError;
pub use network::ExplorerNetwork;
pub use pending::PendingDepositRecord;
pub use status::{EffectiveStatus, ProgressStage};
