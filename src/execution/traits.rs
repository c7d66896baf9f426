use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AppResult;
use crate::ledger::models::{Strategy, VaultSnapshot};

/// Savings vault collaborator.
///
/// INVARIANTS:
/// - The vault is authoritative; callers never assume a call landed
///   without a following `fetch_snapshot`
/// - Mutating calls return the transaction signature
#[async_trait]
pub trait VaultClient: Send + Sync {
    /// Create the vault with its round-up increment and strategy
    async fn initialize(&self, increment: Decimal, strategy: Strategy) -> AppResult<String>;

    /// Sweep `amount` SOL from the owner into the vault
    async fn deposit(&self, amount: Decimal) -> AppResult<String>;

    /// Return `amount` SOL from the vault to the owner
    async fn withdraw(&self, amount: Decimal) -> AppResult<String>;

    /// `None` leaves a setting unchanged
    async fn update_settings(
        &self,
        increment: Option<Decimal>,
        strategy: Option<Strategy>,
        active: bool,
    ) -> AppResult<String>;

    /// Current vault state, `None` if the vault was never initialized
    async fn fetch_snapshot(&self) -> AppResult<Option<VaultSnapshot>>;

    /// Program identity; entries that invoke it are the vault's own deposits
    fn program_id(&self) -> String;
}
