//! Read-only input from the Bitcoin network through an esplora-style block
//! explorer.

pub mod explorer;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use explorer::{
    client::{EsploraClient, ExplorerClientConfig},
    confirmations,
    error::ClientError,
    traits::BlockExplorer,
    ClientResult,
};
pub use onesat_primitives::ExplorerNetwork;
