use async_trait::async_trait;
use bitcoin::Txid;

use super::ClientResult;

/// Read-only view of the Bitcoin chain.
#[async_trait]
pub trait BlockExplorer: Sync + Send + 'static {
    /// Height of the current best block.
    async fn tip_height(&self) -> ClientResult<u64>;

    /// Height of the block that included `txid`.
    ///
    /// `None` if the transaction is unconfirmed or the explorer has never
    /// seen it.
    async fn tx_block_height(&self, txid: &Txid) -> ClientResult<Option<u64>>;
}
