// Vault manager - every state-changing vault call goes through here and is
// followed by a snapshot refresh into the reconciliation store

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult, VaultError};
use crate::execution::traits::VaultClient;
use crate::ledger::models::{is_supported_increment, SpendEvent, Strategy, VaultSnapshot};
use crate::settlement::store::SharedStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    Confirmed(String),
    Skipped,
    Failed(String),
}

pub struct VaultManager {
    vault: Arc<dyn VaultClient>,
    store: SharedStore,
}

impl VaultManager {
    pub fn new(vault: Arc<dyn VaultClient>, store: SharedStore) -> Self {
        Self { vault, store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn program_id(&self) -> String {
        self.vault.program_id()
    }

    /// Make sure the vault exists, carries these settings and is active.
    /// Monitoring must not start unless this succeeds.
    pub async fn activate(
        &self,
        increment: Decimal,
        strategy: Strategy,
    ) -> AppResult<VaultSnapshot> {
        if !is_supported_increment(increment) {
            return Err(AppError::InvalidInput(format!(
                "Unsupported round-up increment: {}",
                increment
            )));
        }

        let existing = self.vault.fetch_snapshot().await.map_err(activation_error)?;

        match existing {
            None => {
                let signature = self
                    .vault
                    .initialize(increment, strategy)
                    .await
                    .map_err(activation_error)?;
                info!(
                    "✅ Vault initialized: round to {} SOL, strategy {} (tx: {})",
                    increment, strategy, signature
                );
            }
            Some(snapshot)
                if !snapshot.is_active
                    || snapshot.round_up_increment != increment
                    || snapshot.strategy != strategy =>
            {
                let signature = self
                    .vault
                    .update_settings(Some(increment), Some(strategy), true)
                    .await
                    .map_err(activation_error)?;
                info!(
                    "✅ Vault settings updated: round to {} SOL, strategy {} (tx: {})",
                    increment, strategy, signature
                );
            }
            Some(_) => {
                info!("✓ Vault already active with requested settings");
            }
        }

        let snapshot = self
            .vault
            .fetch_snapshot()
            .await
            .map_err(activation_error)?
            .ok_or_else(|| AppError::Activation("vault not visible after activation".to_string()))?;

        self.store.write().reconcile_with_snapshot(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn deactivate(&self) -> AppResult<()> {
        let signature = self
            .vault
            .update_settings(None, None, false)
            .await
            .map_err(activation_error)?;
        info!("⏸️ Vault deactivated (tx: {})", signature);

        self.refresh().await?;
        Ok(())
    }

    pub async fn withdraw(&self, amount: Decimal) -> AppResult<String> {
        if amount <= Decimal::ZERO {
            return Err(VaultError::ZeroAmount.into());
        }

        let known = self.store.read().snapshot().cloned();
        let snapshot = match known {
            Some(snapshot) => snapshot,
            None => self.refresh().await?.ok_or(VaultError::NotInitialized)?,
        };

        if amount > snapshot.vault_balance {
            return Err(VaultError::InsufficientFunds {
                requested: amount.to_string(),
                available: snapshot.vault_balance.to_string(),
            }
            .into());
        }

        let signature = self.vault.withdraw(amount).await?;
        info!("💰 Withdrew {} SOL from vault (tx: {})", amount, signature);

        if let Err(e) = self.refresh().await {
            warn!("⚠️ Snapshot refresh after withdrawal failed: {}", e);
        }

        Ok(signature)
    }

    /// Fetch the authoritative snapshot and reconcile the store with it
    pub async fn refresh(&self) -> AppResult<Option<VaultSnapshot>> {
        let snapshot = self.vault.fetch_snapshot().await?;

        if let Some(snapshot) = &snapshot {
            self.store.write().reconcile_with_snapshot(snapshot.clone());
        }

        Ok(snapshot)
    }

    /// Submit the sweep for an already-recorded event.
    ///
    /// Never fails: a rejected deposit leaves the optimistic total in place
    /// until the next successful refresh.
    pub async fn deposit_round_up(&self, event: &SpendEvent) -> DepositOutcome {
        match self.vault.deposit(event.round_up).await {
            Ok(signature) => {
                info!(
                    "✅ Swept {} SOL for {} (tx: {})",
                    event.round_up, event.signature, signature
                );

                if let Err(e) = self.refresh().await {
                    warn!("⚠️ Snapshot refresh after deposit failed: {}", e);
                }

                DepositOutcome::Confirmed(signature)
            }
            Err(AppError::Vault(VaultError::Inactive)) => {
                warn!("⚠️ Vault inactive, round-up for {} not swept", event.signature);
                DepositOutcome::Skipped
            }
            Err(e) => {
                error!("❌ Deposit for {} failed: {}", event.signature, e);
                DepositOutcome::Failed(e.to_string())
            }
        }
    }
}

fn activation_error(error: AppError) -> AppError {
    match error {
        AppError::Activation(_) => error,
        other => AppError::Activation(other.to_string()),
    }
}
