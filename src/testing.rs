// In-memory collaborators for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::adapters::traits::{LedgerFeed, ListOptions};
use crate::error::{AppResult, FeedError, VaultError};
use crate::execution::traits::VaultClient;
use crate::ledger::models::{BalanceDelta, EntrySummary, LedgerEntry, Strategy, VaultSnapshot};

pub const TEST_VAULT_PROGRAM: &str = "8ZwBUokcMFPVtjSXrCxhXNgqgshn4PNpE9Q3grtH61mq";

const STARTING_BALANCE: u64 = 10_000_000_000;

/// A successful system transfer that moved `spent` lamports out of `account`
pub fn spend_entry(signature: &str, slot: u64, account: &str, spent: u64) -> LedgerEntry {
    LedgerEntry {
        signature: signature.to_string(),
        slot,
        block_time: Some(1_704_110_400 + slot as i64),
        success: true,
        balance_deltas: vec![BalanceDelta {
            account: account.to_string(),
            pre: STARTING_BALANCE,
            post: STARTING_BALANCE - spent,
        }],
        log_messages: vec![
            "Program 11111111111111111111111111111111 invoke [1]".to_string(),
            "Program 11111111111111111111111111111111 success".to_string(),
        ],
    }
}

#[derive(Default)]
struct FeedState {
    /// Oldest first
    entries: Vec<LedgerEntry>,
    fail_listing: bool,
    ignore_until: bool,
    failing_details: HashSet<String>,
    detail_calls: HashMap<String, usize>,
    last_limit: Option<usize>,
}

#[derive(Default)]
pub struct MemoryFeed {
    state: Mutex<FeedState>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: LedgerEntry) {
        self.state.lock().entries.push(entry);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.lock().fail_listing = fail;
    }

    /// Behave like a node that does not know the `until` signature
    pub fn ignore_until(&self, ignore: bool) {
        self.state.lock().ignore_until = ignore;
    }

    pub fn fail_detail(&self, signature: &str) {
        self.state.lock().failing_details.insert(signature.to_string());
    }

    pub fn detail_calls(&self, signature: &str) -> usize {
        self.state.lock().detail_calls.get(signature).copied().unwrap_or(0)
    }

    pub fn last_limit(&self) -> Option<usize> {
        self.state.lock().last_limit
    }
}

#[async_trait]
impl LedgerFeed for MemoryFeed {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_recent_entries(
        &self,
        _account: &str,
        options: ListOptions,
    ) -> AppResult<Vec<EntrySummary>> {
        let mut state = self.state.lock();
        state.last_limit = Some(options.limit);

        if state.fail_listing {
            return Err(FeedError::Rpc("connection reset".to_string()).into());
        }

        let until = if state.ignore_until {
            None
        } else {
            options.until
        };

        Ok(state
            .entries
            .iter()
            .rev()
            .take_while(|entry| until.as_deref() != Some(entry.signature.as_str()))
            .take(options.limit)
            .map(|entry| EntrySummary {
                signature: entry.signature.clone(),
                slot: entry.slot,
                block_time: entry.block_time,
                success: entry.success,
            })
            .collect())
    }

    async fn fetch_entry_detail(&self, signature: &str) -> AppResult<Option<LedgerEntry>> {
        let mut state = self.state.lock();
        *state.detail_calls.entry(signature.to_string()).or_insert(0) += 1;

        if state.failing_details.contains(signature) {
            return Err(FeedError::Rpc(format!("detail unavailable for {}", signature)).into());
        }

        Ok(state
            .entries
            .iter()
            .find(|entry| entry.signature == signature)
            .cloned())
    }
}

#[derive(Default)]
struct VaultState {
    snapshot: Option<VaultSnapshot>,
    fail_writes: bool,
    calls: Vec<String>,
    deposits: Vec<Decimal>,
}

#[derive(Default)]
pub struct MemoryVault {
    state: Mutex<VaultState>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialized(increment: Decimal, strategy: Strategy) -> Self {
        let vault = Self::new();
        vault.state.lock().snapshot = Some(fresh_snapshot(increment, strategy));
        vault
    }

    pub fn set_active(&self, active: bool) {
        if let Some(snapshot) = self.state.lock().snapshot.as_mut() {
            snapshot.is_active = active;
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn deposits(&self) -> Vec<Decimal> {
        self.state.lock().deposits.clone()
    }

    fn begin_write(&self, call: &str) -> AppResult<parking_lot::MutexGuard<'_, VaultState>> {
        let mut state = self.state.lock();
        state.calls.push(call.to_string());
        if state.fail_writes {
            return Err(VaultError::Rpc(format!("{} rejected", call)).into());
        }
        Ok(state)
    }
}

fn fresh_snapshot(increment: Decimal, strategy: Strategy) -> VaultSnapshot {
    VaultSnapshot {
        owner: "owner".to_string(),
        round_up_increment: increment,
        strategy,
        total_deposited: Decimal::ZERO,
        total_withdrawn: Decimal::ZERO,
        deposit_count: 0,
        created_at: 1_704_110_400,
        last_deposit_at: 0,
        is_active: true,
        vault_balance: Decimal::ZERO,
    }
}

#[async_trait]
impl VaultClient for MemoryVault {
    async fn initialize(&self, increment: Decimal, strategy: Strategy) -> AppResult<String> {
        let mut state = self.begin_write("initialize")?;
        state.snapshot = Some(fresh_snapshot(increment, strategy));
        Ok("init-tx".to_string())
    }

    async fn deposit(&self, amount: Decimal) -> AppResult<String> {
        let mut state = self.begin_write("deposit")?;
        let snapshot = state.snapshot.as_mut().ok_or(VaultError::NotInitialized)?;
        if !snapshot.is_active {
            return Err(VaultError::Inactive.into());
        }

        snapshot.total_deposited += amount;
        snapshot.vault_balance += amount;
        snapshot.deposit_count += 1;
        state.deposits.push(amount);
        Ok(format!("deposit-tx-{}", state.deposits.len()))
    }

    async fn withdraw(&self, amount: Decimal) -> AppResult<String> {
        let mut state = self.begin_write("withdraw")?;
        let snapshot = state.snapshot.as_mut().ok_or(VaultError::NotInitialized)?;
        if amount > snapshot.vault_balance {
            return Err(VaultError::InsufficientFunds {
                requested: amount.to_string(),
                available: snapshot.vault_balance.to_string(),
            }
            .into());
        }

        snapshot.total_withdrawn += amount;
        snapshot.vault_balance -= amount;
        Ok("withdraw-tx".to_string())
    }

    async fn update_settings(
        &self,
        increment: Option<Decimal>,
        strategy: Option<Strategy>,
        active: bool,
    ) -> AppResult<String> {
        let mut state = self.begin_write("update_settings")?;
        let snapshot = state.snapshot.as_mut().ok_or(VaultError::NotInitialized)?;
        if let Some(increment) = increment {
            snapshot.round_up_increment = increment;
        }
        if let Some(strategy) = strategy {
            snapshot.strategy = strategy;
        }
        snapshot.is_active = active;
        Ok("settings-tx".to_string())
    }

    async fn fetch_snapshot(&self) -> AppResult<Option<VaultSnapshot>> {
        Ok(self.state.lock().snapshot.clone())
    }

    fn program_id(&self) -> String {
        TEST_VAULT_PROGRAM.to_string()
    }
}
