use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// One reading of both clocks.
///
/// Cache freshness uses the monotonic clock, deposit age uses wall time.
/// Every deposit of a sweep is evaluated against the same reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    pub at: Instant,
    pub wall: DateTime<Utc>,
}

impl Now {
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            wall: Utc::now(),
        }
    }

    pub fn with_wall(wall: DateTime<Utc>) -> Self {
        Self {
            at: Instant::now(),
            wall,
        }
    }
}
