use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;
use tracing::info;

use crate::{
    adapters::SolanaLedgerFeed,
    config::MonitorConfig,
    error::{AppError, AppResult},
    execution::SolanaVaultProgram,
    ledger::models::AccountContext,
    monitor::MonitorController,
    settlement::{ReconciliationStore, VaultManager},
};

/// Everything the binary needs to run one monitored wallet
pub struct App {
    pub account: AccountContext,
    pub controller: MonitorController,
}

pub fn initialize_app(config: &MonitorConfig) -> AppResult<App> {
    info!("Initializing monitor components ...");

    let secret = config
        .owner_keypair
        .as_deref()
        .ok_or_else(|| AppError::Config("OWNER_KEYPAIR must be set".to_string()))?;
    let owner = parse_keypair(secret)?;
    let account = AccountContext::new(owner.pubkey().to_string());
    info!("🔑 Vault owner: {}", account.address);

    let feed = Arc::new(SolanaLedgerFeed::new(config.feed_config()));
    info!("✅ Ledger feed connected to {}", config.rpc_url);

    let vault_program = Arc::new(SolanaVaultProgram::new(config.vault_config()?, owner));
    let store = ReconciliationStore::shared(config.history_limit);
    let vault = Arc::new(VaultManager::new(vault_program, store));
    info!("✅ Vault program client ready ({})", vault.program_id());

    let controller = MonitorController::new(feed, vault, config.session_params()?);

    info!(
        "📋 Round to {} SOL, strategy {}, poll every {:?}, cooldown {:?}",
        config.increment, config.strategy, config.poll_interval, config.cooldown
    );

    Ok(App { account, controller })
}

fn parse_keypair(secret: &str) -> AppResult<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|e| AppError::Config(format!("OWNER_KEYPAIR is not base58: {}", e)))?;

    Keypair::try_from(bytes.as_slice())
        .map_err(|e| AppError::Config(format!("OWNER_KEYPAIR is not a valid keypair: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keypair() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();

        let parsed = parse_keypair(&encoded).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());

        assert!(parse_keypair("0OIl").is_err());
        assert!(parse_keypair(&bs58::encode([1u8; 12]).into_string()).is_err());
    }

    #[test]
    fn test_initialize_requires_owner() {
        let config = MonitorConfig::default();
        assert!(matches!(initialize_app(&config), Err(AppError::Config(_))));
    }
}
