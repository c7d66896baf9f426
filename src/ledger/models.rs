use borsh::{BorshDeserialize, BorshSerialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Round-up increments a vault can be configured with
pub const ROUND_UP_OPTIONS: [Decimal; 4] = [dec!(0.01), dec!(0.05), dec!(0.1), dec!(0.5)];

pub fn is_supported_increment(increment: Decimal) -> bool {
    ROUND_UP_OPTIONS.iter().any(|option| *option == increment)
}

/// Destination the vault routes swept funds into.
///
/// Variant order matches the on-chain enum; borsh encodes the variant index.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    LiquidStake,
    LpYield,
    Dca,
    Vault,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LiquidStake => "stake",
            Strategy::LpYield => "lp",
            Strategy::Dca => "dca",
            Strategy::Vault => "save",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stake" => Ok(Strategy::LiquidStake),
            "lp" => Ok(Strategy::LpYield),
            "dca" => Ok(Strategy::Dca),
            "save" | "vault" => Ok(Strategy::Vault),
            other => Err(AppError::InvalidInput(format!("Unknown strategy: {}", other))),
        }
    }
}

/// The account a monitoring session watches. Immutable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountContext {
    pub address: String,
}

impl AccountContext {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Feed listing row, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub signature: String,
    /// Feed position marker (slot)
    pub slot: u64,
    pub block_time: Option<i64>,
    pub success: bool,
}

/// Native balance of one account before and after an entry, in lamports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub account: String,
    pub pre: u64,
    pub post: u64,
}

impl BalanceDelta {
    /// Lamports that left the account, zero when the balance grew
    pub fn spent_lamports(&self) -> u64 {
        self.pre.saturating_sub(self.post)
    }
}

/// Full ledger entry as returned by the feed's detail query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub success: bool,
    /// One delta per account key, in account-index order
    pub balance_deltas: Vec<BalanceDelta>,
    pub log_messages: Vec<String>,
}

impl LedgerEntry {
    pub fn delta_for(&self, account: &str) -> Option<&BalanceDelta> {
        self.balance_deltas.iter().find(|delta| delta.account == account)
    }

    /// True when any log line or account key names the given program
    pub fn references_program(&self, program_id: &str) -> bool {
        self.log_messages.iter().any(|line| line.contains(program_id))
            || self.balance_deltas.iter().any(|delta| delta.account == program_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendKind {
    Swap,
    Transfer,
    Other,
}

impl fmt::Display for SpendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpendKind::Swap => "Swap",
            SpendKind::Transfer => "Transfer",
            SpendKind::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// An accepted spend with its computed round-up. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendEvent {
    pub id: String,
    pub signature: String,
    pub amount: Decimal,
    pub round_up: Decimal,
    pub kind: SpendKind,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

impl SpendEvent {
    pub fn event_id(signature: &str, fired_at: DateTime<Utc>) -> String {
        format!("{}-{}", signature, fired_at.timestamp_millis())
    }
}

/// Authoritative vault state as read from the program account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub owner: String,
    pub round_up_increment: Decimal,
    pub strategy: Strategy,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub deposit_count: u64,
    pub created_at: i64,
    pub last_deposit_at: i64,
    pub is_active: bool,
    /// Lamport balance of the SOL holding account, in SOL
    pub vault_balance: Decimal,
}

impl VaultSnapshot {
    pub fn net_saved(&self) -> Decimal {
        self.total_deposited - self.total_withdrawn
    }
}
