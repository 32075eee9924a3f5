use argh::FromArgs;
use bitcoin::Txid;
use chrono::Utc;
use onesat_db::{PendingDepositStore, StoreError};
use onesat_primitives::{DepositId, PendingDepositRecord};

/// Inspects and edits the local pending-deposit store
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "pending")]
pub struct PendingArgs {
    #[argh(subcommand)]
    pub cmd: PendingCommands,
}

#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand)]
pub enum PendingCommands {
    List(ListArgs),
    SetTx(SetTxArgs),
    Forget(ForgetArgs),
}

/// Lists every locally recorded deposit
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "list")]
pub struct ListArgs {}

/// Records the bitcoin transaction that funded a deposit
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "set-tx")]
pub struct SetTxArgs {
    /// deposit id, hex with or without 0x
    #[argh(positional)]
    pub deposit_id: DepositId,

    /// funding transaction id
    #[argh(positional)]
    pub txid: Txid,
}

/// Removes a deposit from the local store
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "forget")]
pub struct ForgetArgs {
    /// deposit id, hex with or without 0x
    #[argh(positional)]
    pub deposit_id: DepositId,
}

pub fn pending(args: PendingArgs, store: &dyn PendingDepositStore) -> anyhow::Result<()> {
    match args.cmd {
        PendingCommands::List(_) => {
            let records = store.list()?;
            if records.is_empty() {
                println!("no pending deposits");
            }
            for rec in records {
                println!("{}", format_record(&rec));
            }
        }
        PendingCommands::SetTx(a) => {
            if set_tx(store, &a.deposit_id, a.txid)? {
                println!("{}: funding tx set to {}", a.deposit_id, a.txid);
            } else {
                println!("{}: funding tx already {}", a.deposit_id, a.txid);
            }
        }
        PendingCommands::Forget(a) => match store.remove(&a.deposit_id)? {
            Some(_) => println!("{}: forgotten", a.deposit_id),
            None => println!("{}: not in the store", a.deposit_id),
        },
    }
    Ok(())
}

/// Pins the funding tx of a deposit, creating the record if needed.
fn set_tx(store: &dyn PendingDepositStore, id: &DepositId, txid: Txid) -> Result<bool, StoreError> {
    if store.get(id)?.is_none() {
        store.insert(PendingDepositRecord::new(id.clone(), Utc::now()).with_bitcoin_tx(txid))?;
        return Ok(true);
    }
    store.set_bitcoin_tx(id, txid)
}

fn format_record(rec: &PendingDepositRecord) -> String {
    let tx = rec
        .bitcoin_tx_id
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    let swap = rec.swap_id.as_deref().unwrap_or("-");
    format!(
        "{}  tx={tx}  swap={swap}  created={}",
        rec.deposit_id,
        rec.created_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use onesat_db::FilePendingStore;

    use super::*;

    fn id(b: u8) -> DepositId {
        format!("{b:02x}").repeat(32).parse().unwrap()
    }

    fn txid(b: u8) -> Txid {
        format!("{b:02x}").repeat(32).parse().unwrap()
    }

    #[test]
    fn test_set_tx_creates_then_pins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::open(dir.path().join("pending.json")).unwrap();

        assert!(set_tx(&store, &id(1), txid(1)).unwrap());
        assert!(!set_tx(&store, &id(1), txid(1)).unwrap());
        assert!(matches!(
            set_tx(&store, &id(1), txid(2)),
            Err(StoreError::TxAlreadyPinned { .. })
        ));

        let reopened = FilePendingStore::open(dir.path().join("pending.json")).unwrap();
        assert_eq!(
            reopened.get(&id(1)).unwrap().unwrap().bitcoin_tx_id,
            Some(txid(1))
        );
    }

    #[test]
    fn test_forget_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::open(dir.path().join("pending.json")).unwrap();
        set_tx(&store, &id(1), txid(1)).unwrap();

        let forget = PendingArgs {
            cmd: PendingCommands::Forget(ForgetArgs { deposit_id: id(1) }),
        };
        pending(forget, &store).unwrap();
        assert!(store.list().unwrap().is_empty());

        let list = PendingArgs {
            cmd: PendingCommands::List(ListArgs {}),
        };
        pending(list, &store).unwrap();
    }

    #[test]
    fn test_format_record() {
        let rec = PendingDepositRecord::new(id(3), Utc::now()).with_swap_id("s-1");
        let line = format_record(&rec);
        assert!(line.contains("tx=-"));
        assert!(line.contains("swap=s-1"));
    }
}
