use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bitcoin::Txid;

use crate::{errors::SwapTrackerError, traits::SwapTracker, types::SwapRecord};

/// How [`TestSwapTracker::init`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitBehavior {
    Succeed,
    Fail,
    /// Never completes.
    Hang,
}

/// A test implementation of a swap tracker.
#[derive(Debug)]
pub struct TestSwapTracker {
    init: InitBehavior,
    swaps: Mutex<HashMap<String, Option<Txid>>>,
    lookups: AtomicUsize,
    stops: AtomicUsize,
}

impl TestSwapTracker {
    pub fn new(init: InitBehavior) -> Self {
        Self {
            init,
            swaps: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// Registers a swap, with its funding tx if already seen.
    pub fn insert_swap(&self, swap_id: &str, source: Option<Txid>) {
        self.swaps
            .lock()
            .expect("test: tracker lock")
            .insert(swap_id.to_string(), source);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapTracker for TestSwapTracker {
    async fn init(&self) -> Result<(), SwapTrackerError> {
        match self.init {
            InitBehavior::Succeed => Ok(()),
            InitBehavior::Fail => Err(SwapTrackerError::Unavailable("test".to_string())),
            InitBehavior::Hang => std::future::pending().await,
        }
    }

    async fn swap_by_id(&self, swap_id: &str) -> Result<Option<SwapRecord>, SwapTrackerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .swaps
            .lock()
            .expect("test: tracker lock")
            .get(swap_id)
            .map(|src| SwapRecord::new(swap_id, *src)))
    }

    async fn stop(&self) -> Result<(), SwapTrackerError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
