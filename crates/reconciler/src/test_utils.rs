use bitcoin::Txid;
use chrono::{DateTime, TimeZone, Utc};
use onesat_primitives::DepositId;

pub(crate) fn id(b: u8) -> DepositId {
    format!("{b:02x}").repeat(32).parse().expect("test: id")
}

pub(crate) fn txid(b: u8) -> Txid {
    format!("{b:02x}").repeat(32).parse().expect("test: txid")
}

/// Fixed wall clock origin for deposits created in tests.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
}
