// Reconciliation store - optimistic local totals layered over the
// authoritative vault snapshot
//
// Precedence:
// - No snapshot yet: totals are the local running sum of recorded round-ups
// - Snapshot present: totals are the snapshot's net deposits plus whatever
//   was recorded after that snapshot landed
// - Every reconcile replaces the snapshot and clears the pending layer

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::ledger::models::{SpendEvent, VaultSnapshot};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Rough heuristic: 12 spends a day over 30 days
const PROJECTION_DAYS: u32 = 30;
const PROJECTION_EVENTS_PER_DAY: u32 = 12;

pub type SharedStore = Arc<RwLock<ReconciliationStore>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledView {
    pub total_saved: Decimal,
    pub history: Vec<SpendEvent>,
    pub count: u64,
    pub average_round_up: Decimal,
    pub projected_monthly: Decimal,
    /// Round-ups recorded locally but not yet reflected in a snapshot
    pub pending_total: Decimal,
    pub snapshot: Option<VaultSnapshot>,
    pub reconciled_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ReconciliationStore {
    history: VecDeque<SpendEvent>,
    history_limit: usize,
    pending_total: Decimal,
    pending_count: u64,
    snapshot: Option<VaultSnapshot>,
    reconciled_at: Option<DateTime<Utc>>,
}

impl ReconciliationStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
            pending_total: Decimal::ZERO,
            pending_count: 0,
            snapshot: None,
            reconciled_at: None,
        }
    }

    pub fn shared(history_limit: usize) -> SharedStore {
        Arc::new(RwLock::new(Self::new(history_limit)))
    }

    /// Newest first; the oldest entry is evicted past the history limit
    pub fn record(&mut self, event: SpendEvent) {
        self.pending_total += event.round_up;
        self.pending_count += 1;

        self.history.push_front(event);
        self.history.truncate(self.history_limit);
    }

    /// The snapshot wins: pending optimistic totals are dropped.
    /// History is kept since snapshots carry no itemization.
    pub fn reconcile_with_snapshot(&mut self, snapshot: VaultSnapshot) {
        let confirmed = snapshot_delta(self.snapshot.as_ref(), &snapshot);
        if self.pending_total != confirmed {
            debug!(
                "Snapshot differs from optimistic view: pending {} vs confirmed change {}",
                self.pending_total, confirmed
            );
        }

        self.pending_total = Decimal::ZERO;
        self.pending_count = 0;
        self.snapshot = Some(snapshot);
        self.reconciled_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> Option<&VaultSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn total_saved(&self) -> Decimal {
        match &self.snapshot {
            Some(snapshot) => snapshot.net_saved() + self.pending_total,
            None => self.pending_total,
        }
    }

    pub fn count(&self) -> u64 {
        match &self.snapshot {
            Some(snapshot) => snapshot.deposit_count + self.pending_count,
            None => self.pending_count,
        }
    }

    pub fn view(&self) -> ReconciledView {
        let total_saved = self.total_saved();
        let count = self.count();

        let average_round_up = if count > 0 {
            total_saved / Decimal::from(count)
        } else {
            Decimal::ZERO
        };

        let projected_monthly = average_round_up
            * Decimal::from(PROJECTION_DAYS)
            * Decimal::from(PROJECTION_EVENTS_PER_DAY);

        ReconciledView {
            total_saved,
            history: self.history.iter().cloned().collect(),
            count,
            average_round_up,
            projected_monthly,
            pending_total: self.pending_total,
            snapshot: self.snapshot.clone(),
            reconciled_at: self.reconciled_at,
        }
    }
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

fn snapshot_delta(previous: Option<&VaultSnapshot>, next: &VaultSnapshot) -> Decimal {
    next.net_saved() - previous.map_or(Decimal::ZERO, |p| p.net_saved())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::{SpendKind, Strategy};
    use rust_decimal_macros::dec;

    fn event(id: &str, round_up: Decimal) -> SpendEvent {
        SpendEvent {
            id: id.to_string(),
            signature: id.to_string(),
            amount: dec!(0.341),
            round_up,
            kind: SpendKind::Swap,
            description: "0.341 SOL out".to_string(),
            observed_at: Utc::now(),
        }
    }

    fn snapshot(deposited: Decimal, withdrawn: Decimal, count: u64) -> VaultSnapshot {
        VaultSnapshot {
            owner: "owner".to_string(),
            round_up_increment: dec!(0.1),
            strategy: Strategy::LiquidStake,
            total_deposited: deposited,
            total_withdrawn: withdrawn,
            deposit_count: count,
            created_at: 0,
            last_deposit_at: 0,
            is_active: true,
            vault_balance: deposited - withdrawn,
        }
    }

    #[test]
    fn test_local_totals_before_snapshot() {
        let mut store = ReconciliationStore::default();
        store.record(event("a", dec!(0.059)));
        store.record(event("b", dec!(0.041)));

        let view = store.view();
        assert_eq!(view.total_saved, dec!(0.1));
        assert_eq!(view.count, 2);
        assert_eq!(view.average_round_up, dec!(0.05));
        assert_eq!(view.projected_monthly, dec!(18));
        assert_eq!(view.history[0].id, "b");
        assert!(view.snapshot.is_none());
    }

    #[test]
    fn test_empty_view() {
        let view = ReconciliationStore::default().view();
        assert_eq!(view.total_saved, Decimal::ZERO);
        assert_eq!(view.count, 0);
        assert_eq!(view.average_round_up, Decimal::ZERO);
        assert_eq!(view.projected_monthly, Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_takes_precedence() {
        let mut store = ReconciliationStore::default();
        for i in 0..7 {
            store.record(event(&format!("e{}", i), dec!(0.05)));
        }

        store.reconcile_with_snapshot(snapshot(dec!(1.2), dec!(0.2), 4));

        let view = store.view();
        assert_eq!(view.total_saved, dec!(1.0));
        assert_eq!(view.count, 4);
        assert_eq!(view.pending_total, Decimal::ZERO);
        // history survives reconciliation
        assert_eq!(view.history.len(), 7);
        assert!(view.reconciled_at.is_some());
    }

    #[test]
    fn test_events_after_snapshot_are_optimistic_until_next_snapshot() {
        let mut store = ReconciliationStore::default();
        store.reconcile_with_snapshot(snapshot(dec!(0.5), Decimal::ZERO, 5));

        store.record(event("late", dec!(0.059)));
        assert_eq!(store.total_saved(), dec!(0.559));
        assert_eq!(store.count(), 6);

        // deposit never landed
        store.reconcile_with_snapshot(snapshot(dec!(0.5), Decimal::ZERO, 5));
        assert_eq!(store.total_saved(), dec!(0.5));
        assert_eq!(store.count(), 5);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut store = ReconciliationStore::new(3);
        for i in 0..5 {
            store.record(event(&format!("e{}", i), dec!(0.01)));
        }

        let ids: Vec<String> = store.view().history.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e4", "e3", "e2"]);
        // totals still count evicted events
        assert_eq!(store.total_saved(), dec!(0.05));
    }
}
