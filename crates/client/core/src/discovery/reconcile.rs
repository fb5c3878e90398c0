//! Creator liveness from registration and deletion events.
//!
//! Liveness is decided by tombstone counting: an address with `N`
//! registrations and `M` deletions is deleted when `N > 0 && M >= N`.
//! The same events are also folded in ledger order through
//! `Unregistered → Active → Deleted`; when the two disagree (e.g. a
//! deletion recorded before its registration) a warning is logged and the
//! count still decides.

use std::cmp::Ordering;
use std::collections::HashMap;

use client_blockchain_core::{LedgerEvent, normalize_hex_id};

/// Canonical map key for an address.
pub fn address_key(raw: &str) -> String {
    normalize_hex_id(raw).unwrap_or_else(|| raw.trim().to_ascii_lowercase())
}

/// `creator` field of a lifecycle event, normalised.
pub fn event_creator(event: &LedgerEvent) -> Option<String> {
    event.str_field("creator").map(address_key)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Unregistered,
    Active,
    Deleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Registered,
    Deleted,
}

#[derive(Default, Debug)]
struct Tally {
    registrations: usize,
    deletions: usize,
    folded: Option<LifecycleState>,
}

/// Per-address registration/deletion tallies over one page of events.
#[derive(Debug, Default)]
pub struct Reconciliation {
    tallies: HashMap<String, Tally>,
}

impl Reconciliation {
    pub fn new(registered: &[LedgerEvent], deleted: &[LedgerEvent]) -> Self {
        let mut ordered: Vec<(&LedgerEvent, Lifecycle)> = registered
            .iter()
            .map(|e| (e, Lifecycle::Registered))
            .chain(deleted.iter().map(|e| (e, Lifecycle::Deleted)))
            .collect();
        ordered.sort_by(|(a, _), (b, _)| ledger_order(a, b));

        let mut tallies: HashMap<String, Tally> = HashMap::new();
        for (event, kind) in ordered {
            let Some(creator) = event_creator(event) else {
                continue;
            };
            let tally = tallies.entry(creator).or_default();
            let state = tally.folded.unwrap_or(LifecycleState::Unregistered);
            tally.folded = Some(match kind {
                Lifecycle::Registered => {
                    tally.registrations += 1;
                    LifecycleState::Active
                }
                Lifecycle::Deleted => {
                    tally.deletions += 1;
                    match state {
                        LifecycleState::Active => LifecycleState::Deleted,
                        other => other,
                    }
                }
            });
        }

        let reconciliation = Self { tallies };
        for address in reconciliation.disagreements() {
            tracing::warn!(
                "Creator {} lifecycle is ambiguous: counts say {}, ledger order says {:?}",
                address,
                if reconciliation.is_deleted(address) { "deleted" } else { "live" },
                reconciliation.folded_state(address)
            );
        }
        reconciliation
    }

    pub fn registrations(&self, address: &str) -> usize {
        self.tallies
            .get(&address_key(address))
            .map_or(0, |t| t.registrations)
    }

    pub fn deletions(&self, address: &str) -> usize {
        self.tallies
            .get(&address_key(address))
            .map_or(0, |t| t.deletions)
    }

    /// Tombstone rule: at least one registration and no fewer deletions.
    pub fn is_deleted(&self, address: &str) -> bool {
        let registrations = self.registrations(address);
        registrations > 0 && self.deletions(address) >= registrations
    }

    /// State reached by folding the events in ledger order.
    pub fn folded_state(&self, address: &str) -> LifecycleState {
        self.tallies
            .get(&address_key(address))
            .and_then(|t| t.folded)
            .unwrap_or(LifecycleState::Unregistered)
    }

    /// Addresses where counting and ordered folding disagree.
    pub fn disagreements(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = self
            .tallies
            .iter()
            .filter(|(_, tally)| tally.registrations > 0)
            .filter(|(_, tally)| {
                let counted_live = tally.registrations > tally.deletions;
                let folded_live = tally.folded == Some(LifecycleState::Active);
                counted_live != folded_live
            })
            .map(|(address, _)| address.as_str())
            .collect();
        addresses.sort_unstable();
        addresses
    }
}

fn ledger_order(a: &LedgerEvent, b: &LedgerEvent) -> Ordering {
    a.timestamp_ms
        .unwrap_or(0)
        .cmp(&b.timestamp_ms.unwrap_or(0))
        .then(a.event_seq.cmp(&b.event_seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::TxDigest;
    use serde_json::json;

    fn event(creator: &str, seq: u64) -> LedgerEvent {
        LedgerEvent {
            tx_digest: TxDigest::new(format!("tx{}", seq)),
            event_seq: seq,
            event_type: String::new(),
            sender: None,
            parsed_json: json!({ "creator": creator }),
            timestamp_ms: None,
        }
    }

    #[test]
    fn deleted_iff_deletions_reach_registrations() {
        for n in 1..4usize {
            for m in 0..5usize {
                let registered: Vec<_> = (0..n).map(|i| event("0xa", i as u64 * 2)).collect();
                let deleted: Vec<_> = (0..m).map(|i| event("0xa", i as u64 * 2 + 1)).collect();
                let reconciliation = Reconciliation::new(&registered, &deleted);
                assert_eq!(reconciliation.is_deleted("0xa"), m >= n, "n={} m={}", n, m);
            }
        }
    }

    #[test]
    fn unknown_address_is_not_deleted() {
        let reconciliation = Reconciliation::new(&[event("0xa", 0)], &[]);
        assert!(!reconciliation.is_deleted("0xb"));
        assert_eq!(reconciliation.folded_state("0xb"), LifecycleState::Unregistered);
    }

    #[test]
    fn addresses_are_normalised() {
        let full = format!("0x{:0>64}", "a");
        let reconciliation = Reconciliation::new(&[event(&full, 0)], &[event("0xA", 1)]);
        assert_eq!(reconciliation.registrations("0xa"), 1);
        assert!(reconciliation.is_deleted(&full));
    }

    #[test]
    fn fold_follows_ledger_order() {
        let registered = [event("0xa", 0), event("0xa", 2)];
        let deleted = [event("0xa", 1)];
        let reconciliation = Reconciliation::new(&registered, &deleted);
        assert_eq!(reconciliation.folded_state("0xa"), LifecycleState::Active);
        assert!(!reconciliation.is_deleted("0xa"));
        assert!(reconciliation.disagreements().is_empty());
    }

    #[test]
    fn out_of_order_deletion_is_reported() {
        // delete, delete, register, register: counts say deleted, order says active
        let registered = [event("0xa", 2), event("0xa", 3)];
        let deleted = [event("0xa", 0), event("0xa", 1)];
        let reconciliation = Reconciliation::new(&registered, &deleted);

        assert!(reconciliation.is_deleted("0xa"));
        assert_eq!(reconciliation.folded_state("0xa"), LifecycleState::Active);
        assert_eq!(reconciliation.disagreements(), vec![address_key("0xa").as_str()]);
    }
}
