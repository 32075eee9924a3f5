//! JSON file backed pending store.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use bitcoin::Txid;
use onesat_primitives::{DepositId, PendingDepositRecord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::{
    errors::StoreError,
    ops::{self, RecordMap},
    traits::PendingDepositStore,
    DbResult,
};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    records: Vec<PendingDepositRecord>,
}

/// Pending store persisted as a single JSON file.
///
/// Every mutation rewrites the file through a temp file and a rename, so a
/// crash leaves either the old or the new table on disk. The in-memory table
/// only changes once the write succeeded.
///
/// The file is the source of truth: reads and mutations reload it first, so
/// records written by another process sharing the path are seen and kept.
#[derive(Debug)]
pub struct FilePendingStore {
    path: PathBuf,
    records: Mutex<RecordMap>,
}

impl FilePendingStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match read_file(&path)? {
            Some(records) => records,
            None => {
                info!(path = %path.display(), "no pending store found, starting empty");
                RecordMap::new()
            }
        };

        debug!(path = %path.display(), count = records.len(), "opened pending store");

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory table with what is on disk. Keeps it if the file
    /// is gone.
    fn reload(&self, records: &mut RecordMap) -> DbResult<()> {
        if let Some(on_disk) = read_file(&self.path)? {
            *records = on_disk;
        }
        Ok(())
    }

    fn persist(&self, records: &RecordMap) -> DbResult<()> {
        let file = StoreFile {
            version: STORE_VERSION,
            records: records.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;

        trace!(path = %self.path.display(), count = records.len(), "saved pending store");
        Ok(())
    }

    /// Reloads the table, applies `f` to a copy of it and commits the copy if
    /// `f` succeeds and reports a change.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RecordMap) -> DbResult<T>,
        changed: impl Fn(&T) -> bool,
    ) -> DbResult<T> {
        let mut records = self.records.lock();
        self.reload(&mut records)?;
        let mut next = records.clone();
        let out = f(&mut next)?;
        if changed(&out) {
            self.persist(&next)?;
            *records = next;
        }
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&RecordMap) -> T) -> DbResult<T> {
        let mut records = self.records.lock();
        self.reload(&mut records)?;
        Ok(f(&records))
    }
}

fn read_file(path: &Path) -> DbResult<Option<RecordMap>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let file: StoreFile = serde_json::from_str(&content)?;
    if file.version != STORE_VERSION {
        return Err(StoreError::UnsupportedVersion(file.version));
    }
    Ok(Some(
        file.records
            .into_iter()
            .map(|r| (r.deposit_id.clone(), r))
            .collect(),
    ))
}

impl PendingDepositStore for FilePendingStore {
    fn get(&self, id: &DepositId) -> DbResult<Option<PendingDepositRecord>> {
        self.read(|m| m.get(id).cloned())
    }

    fn insert(&self, record: PendingDepositRecord) -> DbResult<()> {
        self.mutate(|m| ops::insert(m, record), |_| true)
    }

    fn set_bitcoin_tx(&self, id: &DepositId, txid: Txid) -> DbResult<bool> {
        self.mutate(|m| ops::set_bitcoin_tx(m, id, txid), |c| *c)
    }

    fn set_swap_id(&self, id: &DepositId, swap_id: &str) -> DbResult<bool> {
        self.mutate(|m| ops::set_swap_id(m, id, swap_id), |c| *c)
    }

    fn remove(&self, id: &DepositId) -> DbResult<Option<PendingDepositRecord>> {
        self.mutate(|m| Ok(m.remove(id)), |r| r.is_some())
    }

    fn list(&self) -> DbResult<Vec<PendingDepositRecord>> {
        self.read(|m| m.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn id(b: u8) -> DepositId {
        format!("{b:02x}").repeat(32).parse().unwrap()
    }

    fn txid(b: u8) -> Txid {
        format!("{b:02x}").repeat(32).parse().unwrap()
    }

    fn record(b: u8) -> PendingDepositRecord {
        PendingDepositRecord::new(id(b), Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");

        {
            let store = FilePendingStore::open(&path).unwrap();
            store.insert(record(1)).unwrap();
            store.insert(record(2).with_swap_id("swap-2")).unwrap();
            assert!(store.set_bitcoin_tx(&id(1), txid(9)).unwrap());
        }

        let store = FilePendingStore::open(&path).unwrap();
        let rec = store.get(&id(1)).unwrap().unwrap();
        assert_eq!(rec.bitcoin_tx_id, Some(txid(9)));
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_bitcoin_tx_pinned_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::open(dir.path().join("p.json")).unwrap();
        store.insert(record(1)).unwrap();

        assert!(store.set_bitcoin_tx(&id(1), txid(7)).unwrap());
        assert!(!store.set_bitcoin_tx(&id(1), txid(7)).unwrap());
        assert!(matches!(
            store.set_bitcoin_tx(&id(1), txid(8)),
            Err(StoreError::TxAlreadyPinned { .. })
        ));
        assert_eq!(
            store.get(&id(1)).unwrap().unwrap().bitcoin_tx_id,
            Some(txid(7))
        );
    }

    #[test]
    fn test_unknown_and_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::open(dir.path().join("p.json")).unwrap();

        assert!(matches!(
            store.set_bitcoin_tx(&id(3), txid(1)),
            Err(StoreError::UnknownDeposit(_))
        ));

        store.insert(record(3)).unwrap();
        assert!(matches!(
            store.insert(record(3)),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_swap_id_only_filled_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::open(dir.path().join("p.json")).unwrap();
        store.insert(record(4)).unwrap();

        assert!(!store.set_swap_id(&id(4), "  ").unwrap());
        assert!(store.set_swap_id(&id(4), "swap-a").unwrap());
        assert!(!store.set_swap_id(&id(4), "swap-b").unwrap());
        assert_eq!(
            store.get(&id(4)).unwrap().unwrap().swap_id.as_deref(),
            Some("swap-a")
        );
    }

    #[test]
    fn test_remove_is_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        let store = FilePendingStore::open(&path).unwrap();
        store.insert(record(5)).unwrap();

        assert!(store.remove(&id(5)).unwrap().is_some());
        assert!(store.remove(&id(5)).unwrap().is_none());
        assert!(FilePendingStore::open(&path).unwrap().list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, r#"{"version": 9, "records": []}"#).unwrap();

        assert!(matches!(
            FilePendingStore::open(&path),
            Err(StoreError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_handles_sharing_a_file_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        let tracker = FilePendingStore::open(&path).unwrap();
        let cli = FilePendingStore::open(&path).unwrap();

        tracker.insert(record(1)).unwrap();
        cli.insert(record(2)).unwrap();
        assert!(cli.set_bitcoin_tx(&id(2), txid(4)).unwrap());

        // the tracker sees the tx written through the other handle
        assert_eq!(
            tracker.get(&id(2)).unwrap().unwrap().bitcoin_tx_id,
            Some(txid(4))
        );

        // and its own writes keep the other handle's records
        assert!(tracker.set_swap_id(&id(1), "swap-1").unwrap());
        let reopened = FilePendingStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 2);
        assert_eq!(
            reopened.get(&id(2)).unwrap().unwrap().bitcoin_tx_id,
            Some(txid(4))
        );
        assert_eq!(
            reopened.get(&id(1)).unwrap().unwrap().swap_id.as_deref(),
            Some("swap-1")
        );
    }
}
