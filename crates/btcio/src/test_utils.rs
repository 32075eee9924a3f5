use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    sync::Mutex,
};

use async_trait::async_trait;
use bitcoin::Txid;

use crate::explorer::{error::ClientError, traits::BlockExplorer, ClientResult};

/// A test implementation of a block explorer.
///
/// Tip and inclusion heights are mutable so a test can advance the chain
/// between sweeps.
#[derive(Debug, Default)]
pub struct TestExplorer {
    tip: AtomicU64,
    included: Mutex<HashMap<Txid, u64>>,
    failing: AtomicBool,
    tip_calls: AtomicUsize,
    tx_calls: AtomicUsize,
}

impl TestExplorer {
    pub fn new(tip: u64) -> Self {
        Self {
            tip: AtomicU64::new(tip),
            ..Default::default()
        }
    }

    pub fn set_tip(&self, tip: u64) {
        self.tip.store(tip, Ordering::SeqCst);
    }

    /// Marks `txid` as included at `height`.
    pub fn include(&self, txid: Txid, height: u64) {
        self.included
            .lock()
            .expect("test: explorer lock")
            .insert(txid, height);
    }

    /// Makes every subsequent call fail with a timeout.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn tip_calls(&self) -> usize {
        self.tip_calls.load(Ordering::SeqCst)
    }

    pub fn tx_calls(&self) -> usize {
        self.tx_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockExplorer for TestExplorer {
    async fn tip_height(&self) -> ClientResult<u64> {
        self.tip_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout);
        }
        Ok(self.tip.load(Ordering::SeqCst))
    }

    async fn tx_block_height(&self, txid: &Txid) -> ClientResult<Option<u64>> {
        self.tx_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout);
        }
        Ok(self
            .included
            .lock()
            .expect("test: explorer lock")
            .get(txid)
            .copied())
    }
}
