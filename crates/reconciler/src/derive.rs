//! The effective status of a deposit, from everything we know about it.

use chrono::{DateTime, Utc};
use onesat_primitives::{Deposit, DepositStatus, EffectiveStatus, PendingDepositRecord};

use crate::{cache::CacheEntry, policy::StatusPolicy};

/// Combines the backend record, the local pending record and the cached chain
/// data into one status.
///
/// Rules, highest precedence first:
/// 1. backend `deposited` is final;
/// 2. backend `created` older than the expiry window is `expired`;
/// 3. a known funding tx with enough confirmations is `redeemed`;
/// 4. a known funding tx otherwise is `initiated`;
/// 5. backend `created` with no tx while the swap resolver is not ready is
///    `checking`, since "not found" cannot be trusted yet;
/// 6. otherwise the backend status.
pub fn derive_status(
    deposit: &Deposit,
    pending: Option<&PendingDepositRecord>,
    cache: Option<&CacheEntry>,
    resolver_ready: bool,
    policy: &StatusPolicy,
    now: DateTime<Utc>,
) -> EffectiveStatus {
    if deposit.status == DepositStatus::Deposited {
        return EffectiveStatus::Deposited;
    }

    if deposit.status == DepositStatus::Created && now - deposit.created_at > policy.expiry {
        return EffectiveStatus::Expired;
    }

    let tx_known = cache
        .and_then(|c| c.resolved_tx_id)
        .or_else(|| pending.and_then(|p| p.bitcoin_tx_id))
        .is_some();

    if tx_known {
        let confirmations = cache.map(|c| c.confirmations).unwrap_or(0);
        return if confirmations >= policy.redeem_confirmations {
            EffectiveStatus::Redeemed
        } else {
            EffectiveStatus::Initiated
        };
    }

    match deposit.status {
        DepositStatus::Created if !resolver_ready => EffectiveStatus::Checking,
        DepositStatus::Created => EffectiveStatus::Created,
        DepositStatus::Initiated => EffectiveStatus::Initiated,
        DepositStatus::Deposited => EffectiveStatus::Deposited,
    }
}
