//! Crate includes reusable utils for the tracker binaries, such as
//! initializing the tracing framework.

pub mod logging;
