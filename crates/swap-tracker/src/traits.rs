use async_trait::async_trait;

use crate::{errors::SwapTrackerError, types::SwapRecord};

/// Session with the swap tracking service.
///
/// `init` must complete before lookups are meaningful. `stop` is best-effort
/// and may be called while `init` is still running on another task.
#[async_trait]
pub trait SwapTracker: Send + Sync + 'static {
    async fn init(&self) -> Result<(), SwapTrackerError>;

    /// Looks up a swap by its opaque id, `None` if the tracker does not know
    /// it (yet).
    async fn swap_by_id(&self, swap_id: &str) -> Result<Option<SwapRecord>, SwapTrackerError>;

    async fn stop(&self) -> Result<(), SwapTrackerError>;
}
