pub mod client;
pub mod error;
pub mod traits;
pub mod types;

/// This is an alias for the result type returned by explorer clients.
pub type ClientResult<T> = Result<T, error::ClientError>;

/// Number of confirmations a transaction included at `included_height` has
/// when the chain tip is at `tip_height`.
///
/// An unconfirmed transaction has zero confirmations. A tip lagging behind
/// the inclusion height (lookups served by different backends) also yields
/// zero rather than underflowing.
pub fn confirmations(tip_height: u64, included_height: Option<u64>) -> u64 {
    match included_height {
        Some(h) => tip_height.saturating_add(1).saturating_sub(h),
        None => 0,
    }
}
