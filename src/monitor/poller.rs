// Ledger poller - incremental scan of one account's transaction feed
//
// Per tick:
// 1. List the newest `fetch_limit` entries, stopping at the cursor. The
//    cursor entry and anything from an older slot are dropped even if the
//    feed returns them
// 2. First tick only: pin the cursor to the newest entry and report nothing
// 3. Advance the cursor to the newest entry, even if everything is filtered
// 4. Drop failed entries, vault self-deposits, entries without a balance
//    delta for the account, and dust
// 5. Round up survivors and pass them through the cooldown gate

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::traits::{LedgerFeed, ListOptions};
use crate::ledger::models::{AccountContext, EntrySummary, LedgerEntry, SpendEvent, SpendKind};
use crate::monitor::cooldown::{Admission, CooldownGate};
use crate::monitor::roundup::{lamports_to_sol, round_up};

const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
const COMPUTE_BUDGET_PROGRAM: &str = "ComputeBudget111111111111111111111111111111";

/// Programs whose invocation marks an entry as a swap
const SWAP_PROGRAMS: [&str; 3] = [
    // Jupiter v6
    "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4",
    // Raydium AMM v4
    "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
    // Orca Whirlpool
    "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc",
];

/// Immutable per-session poller settings
#[derive(Debug, Clone)]
pub struct PollerParams {
    pub increment: Decimal,
    pub cooldown: Duration,
    /// Spends at or below this many SOL are fee noise
    pub dust_threshold: Decimal,
    pub fetch_limit: usize,
    pub vault_program_id: String,
}

/// Position of the most recent entry already seen.
///
/// Only moves forward in feed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    last_seen: Option<String>,
    last_slot: Option<u64>,
}

impl Cursor {
    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    pub fn last_slot(&self) -> Option<u64> {
        self.last_slot
    }

    pub fn is_unset(&self) -> bool {
        self.last_seen.is_none()
    }

    /// Never moves back to an older slot
    fn advance(&mut self, entry: &EntrySummary) {
        if self.last_slot.is_some_and(|slot| entry.slot < slot) {
            return;
        }

        self.last_seen = Some(entry.signature.clone());
        self.last_slot = Some(entry.slot);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Failed,
    SelfDeposit,
    NoDelta,
    Dust,
}

pub struct LedgerPoller {
    account: AccountContext,
    feed: Arc<dyn LedgerFeed>,
    params: PollerParams,
    cursor: Cursor,
    gate: CooldownGate,
}

impl LedgerPoller {
    pub fn new(account: AccountContext, feed: Arc<dyn LedgerFeed>, params: PollerParams) -> Self {
        let gate = CooldownGate::new(params.cooldown, params.increment);
        Self {
            account,
            feed,
            params,
            cursor: Cursor::default(),
            gate,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub async fn tick(&mut self) -> Vec<SpendEvent> {
        self.tick_at(Utc::now()).await
    }

    /// One bounded unit of work. Never fails: feed errors end the tick early.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<SpendEvent> {
        let options = ListOptions {
            limit: self.params.fetch_limit,
            until: self.cursor.last_seen.clone(),
        };

        let mut entries = match self
            .feed
            .list_recent_entries(&self.account.address, options)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!("⚠️ Feed listing failed on {}: {}", self.feed.name(), e);
                return Vec::new();
            }
        };

        // `until` is exclusive; if the feed echoes the cursor back, it and
        // everything listed after it were seen before
        if let Some(last_seen) = self.cursor.last_seen() {
            if let Some(position) = entries.iter().position(|entry| entry.signature == last_seen) {
                entries.truncate(position);
            }
        }

        // Nodes that ignore `until` list history from before the cursor
        if let Some(cursor_slot) = self.cursor.last_slot() {
            let listed = entries.len();
            entries.retain(|entry| entry.slot >= cursor_slot);
            if entries.len() < listed {
                warn!(
                    "⚠️ Feed returned {} entries older than cursor slot {}, ignoring them",
                    listed - entries.len(),
                    cursor_slot
                );
            }
        }

        let Some(newest) = entries.first() else {
            return Vec::new();
        };

        if self.cursor.is_unset() {
            self.cursor.advance(newest);
            info!(
                "📍 Cursor established at {} (slot {}), existing history ignored",
                newest.signature, newest.slot
            );
            return Vec::new();
        }

        self.cursor.advance(newest);

        let mut events = Vec::new();

        for summary in &entries {
            if !summary.success {
                debug!("⏭️ {} skipped: {:?}", summary.signature, Skip::Failed);
                continue;
            }

            let entry = match self.feed.fetch_entry_detail(&summary.signature).await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    debug!("⏭️ {} has no detail yet", summary.signature);
                    continue;
                }
                Err(e) => {
                    warn!(
                        "⚠️ Detail fetch failed for {}, ending tick early: {}",
                        summary.signature, e
                    );
                    break;
                }
            };

            if let Some(event) = self.evaluate(&entry, now) {
                events.push(event);
            }
        }

        events
    }

    fn evaluate(&mut self, entry: &LedgerEntry, now: DateTime<Utc>) -> Option<SpendEvent> {
        let spent = match self.measure_spend(entry) {
            Ok(spent) => spent,
            Err(skip) => {
                debug!("⏭️ {} skipped: {:?}", entry.signature, skip);
                return None;
            }
        };

        let round_up = round_up(spent, self.params.increment);

        match self.gate.admit(round_up, now) {
            Admission::Accept => {
                let event = SpendEvent {
                    id: SpendEvent::event_id(&entry.signature, now),
                    signature: entry.signature.clone(),
                    amount: spent,
                    round_up,
                    kind: classify_kind(&entry.log_messages),
                    description: format!("{:.3} SOL out", spent),
                    observed_at: now,
                };
                info!(
                    "💸 {} spend of {} SOL, round-up {} SOL ({})",
                    event.kind, event.amount, event.round_up, event.signature
                );
                Some(event)
            }
            Admission::Reject(reason) => {
                debug!("⏭️ {} not admitted: {:?}", entry.signature, reason);
                None
            }
        }
    }

    /// SOL that left the monitored account in this entry
    fn measure_spend(&self, entry: &LedgerEntry) -> Result<Decimal, Skip> {
        if !entry.success {
            return Err(Skip::Failed);
        }

        if entry.references_program(&self.params.vault_program_id) {
            return Err(Skip::SelfDeposit);
        }

        let delta = entry
            .delta_for(&self.account.address)
            .ok_or(Skip::NoDelta)?;

        let spent = lamports_to_sol(delta.spent_lamports());
        if spent <= self.params.dust_threshold {
            return Err(Skip::Dust);
        }

        Ok(spent)
    }
}

/// Classify an entry from the programs its logs show being invoked
pub fn classify_kind(log_messages: &[String]) -> SpendKind {
    let invoked: Vec<&str> = log_messages
        .iter()
        .filter_map(|line| {
            let rest = line.strip_prefix("Program ")?;
            let (program, tail) = rest.split_once(' ')?;
            tail.starts_with("invoke").then_some(program)
        })
        .collect();

    let swap_logged = log_messages
        .iter()
        .any(|line| line.contains("Instruction: Swap") || line.contains("Instruction: Route"));

    if swap_logged || invoked.iter().any(|p| SWAP_PROGRAMS.contains(p)) {
        return SpendKind::Swap;
    }

    let only_system = invoked
        .iter()
        .all(|p| *p == SYSTEM_PROGRAM || *p == COMPUTE_BUDGET_PROGRAM);

    if only_system && invoked.contains(&SYSTEM_PROGRAM) {
        SpendKind::Transfer
    } else {
        SpendKind::Other
    }
}
