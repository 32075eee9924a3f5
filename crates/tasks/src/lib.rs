//! Scoped async task lifecycle: every loop belongs to an owner and dies with
//! it.

mod panic;
mod scope;
mod shutdown;

pub use panic::PanickedTaskError;
pub use scope::TaskScope;
pub use shutdown::{ShutdownGuard, ShutdownSignal};
