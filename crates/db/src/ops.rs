//! Mutations shared by every store implementation.

use std::collections::BTreeMap;

use bitcoin::Txid;
use onesat_primitives::{DepositId, PendingDepositRecord};

use crate::{errors::StoreError, DbResult};

pub(crate) type RecordMap = BTreeMap<DepositId, PendingDepositRecord>;

pub(crate) fn insert(map: &mut RecordMap, record: PendingDepositRecord) -> DbResult<()> {
    if map.contains_key(&record.deposit_id) {
        return Err(StoreError::AlreadyExists(record.deposit_id));
    }
    map.insert(record.deposit_id.clone(), record);
    Ok(())
}

pub(crate) fn set_bitcoin_tx(map: &mut RecordMap, id: &DepositId, txid: Txid) -> DbResult<bool> {
    let rec = map
        .get_mut(id)
        .ok_or_else(|| StoreError::UnknownDeposit(id.clone()))?;

    match rec.bitcoin_tx_id {
        Some(existing) if existing == txid => Ok(false),
        Some(existing) => Err(StoreError::TxAlreadyPinned {
            id: id.clone(),
            existing,
            attempted: txid,
        }),
        None => {
            rec.bitcoin_tx_id = Some(txid);
            Ok(true)
        }
    }
}

pub(crate) fn set_swap_id(map: &mut RecordMap, id: &DepositId, swap_id: &str) -> DbResult<bool> {
    let rec = map
        .get_mut(id)
        .ok_or_else(|| StoreError::UnknownDeposit(id.clone()))?;

    if rec.swap_id.is_some() || swap_id.trim().is_empty() {
        return Ok(false);
    }
    rec.swap_id = Some(swap_id.to_string());
    Ok(true)
}
