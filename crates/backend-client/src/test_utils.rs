use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onesat_primitives::{Deposit, DepositAction, DepositId, DepositStatus};

use crate::{errors::BackendError, traits::DepositApi};

/// Builds a deposit whose id is `id_byte` repeated 32 times.
pub fn deposit_fixture(id_byte: u8, status: DepositStatus, created_at: DateTime<Utc>) -> Deposit {
    let id: DepositId = hex_id(id_byte).parse().expect("test: fixture id");
    Deposit {
        id,
        owner_address: "0x04a1".to_string(),
        action: DepositAction::Deposit,
        amount: "0.001".to_string(),
        token: "0x0beef".to_string(),
        target_address: "0x0cafe".to_string(),
        deposit_address: "0x0dead".to_string(),
        status,
        created_at,
        swap_id: None,
        destination_tx_hash: None,
    }
}

pub fn hex_id(id_byte: u8) -> String {
    format!("{id_byte:02x}").repeat(32)
}

/// A test implementation of the deposit backend.
#[derive(Debug, Default)]
pub struct TestDepositApi {
    deposits: Mutex<BTreeMap<DepositId, Deposit>>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl TestDepositApi {
    pub fn new(deposits: impl IntoIterator<Item = Deposit>) -> Self {
        let api = Self::default();
        for d in deposits {
            api.upsert(d);
        }
        api
    }

    pub fn upsert(&self, deposit: Deposit) {
        self.deposits
            .lock()
            .expect("test: api lock")
            .insert(deposit.id.clone(), deposit);
    }

    pub fn set_status(&self, id: &DepositId, status: DepositStatus) {
        if let Some(d) = self.deposits.lock().expect("test: api lock").get_mut(id) {
            d.status = status;
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of single-deposit fetches served.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Http("test: backend down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DepositApi for TestDepositApi {
    async fn deposit(&self, id: &DepositId) -> Result<Option<Deposit>, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.deposits.lock().expect("test: api lock").get(id).cloned())
    }

    async fn deposits_by_owner(&self, owner: &str) -> Result<Vec<Deposit>, BackendError> {
        self.check()?;
        Ok(self
            .deposits
            .lock()
            .expect("test: api lock")
            .values()
            .filter(|d| d.owner_address == owner)
            .cloned()
            .collect())
    }

    async fn created_deposits(&self) -> Result<Vec<Deposit>, BackendError> {
        self.check()?;
        Ok(self
            .deposits
            .lock()
            .expect("test: api lock")
            .values()
            .filter(|d| d.status == DepositStatus::Created)
            .cloned()
            .collect())
    }
}
