use config::{ConfigError, Environment};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use solana_client::rpc_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::adapters::SolanaFeedConfig;
use crate::error::{AppError, AppResult};
use crate::execution::VaultProgramConfig;
use crate::ledger::models::{is_supported_increment, Strategy};
use crate::monitor::{PollerParams, SessionParams};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_VAULT_PROGRAM_ID: &str = "8ZwBUokcMFPVtjSXrCxhXNgqgshn4PNpE9Q3grtH61mq";

/// Raw environment values, before validation
#[derive(Debug, Deserialize)]
struct RawConfig {
    solana_rpc_url: String,
    vault_program_id: String,
    owner_keypair: Option<String>,
    roundup_increment: String,
    roundup_strategy: String,
    poll_interval_secs: u64,
    cooldown_secs: u64,
    dust_threshold_sol: String,
    history_limit: usize,
    fetch_limit: usize,
}

#[derive(Clone)]
pub struct MonitorConfig {
    pub rpc_url: String,
    pub vault_program_id: String,
    /// Base58 secret key of the vault owner (also the monitored wallet)
    pub owner_keypair: Option<String>,
    pub increment: Decimal,
    pub strategy: Strategy,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub dust_threshold: Decimal,
    pub history_limit: usize,
    pub fetch_limit: usize,
}

impl std::fmt::Debug for MonitorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorConfig")
            .field("rpc_url", &self.rpc_url)
            .field("vault_program_id", &self.vault_program_id)
            .field("owner_keypair", &self.owner_keypair.as_ref().map(|_| "<redacted>"))
            .field("increment", &self.increment)
            .field("strategy", &self.strategy)
            .field("poll_interval", &self.poll_interval)
            .field("cooldown", &self.cooldown)
            .field("dust_threshold", &self.dust_threshold)
            .field("history_limit", &self.history_limit)
            .field("fetch_limit", &self.fetch_limit)
            .finish()
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            vault_program_id: DEFAULT_VAULT_PROGRAM_ID.to_string(),
            owner_keypair: None,
            increment: dec!(0.1),
            strategy: Strategy::LiquidStake,
            poll_interval: Duration::from_secs(10),
            cooldown: Duration::from_secs(15),
            dust_threshold: dec!(0.000005),
            history_limit: 50,
            fetch_limit: 5,
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Load from an explicit variable map instead of the process environment
    fn from_source(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let raw: RawConfig = config::Config::builder()
            .set_default("solana_rpc_url", defaults.rpc_url)?
            .set_default("vault_program_id", defaults.vault_program_id)?
            .set_default("roundup_increment", defaults.increment.to_string())?
            .set_default("roundup_strategy", defaults.strategy.as_str())?
            .set_default("poll_interval_secs", defaults.poll_interval.as_secs())?
            .set_default("cooldown_secs", defaults.cooldown.as_secs())?
            .set_default("dust_threshold_sol", defaults.dust_threshold.to_string())?
            .set_default("history_limit", defaults.history_limit as u64)?
            .set_default("fetch_limit", defaults.fetch_limit as u64)?
            .add_source(Environment::default().source(vars))
            .build()?
            .try_deserialize()?;

        let config = Self {
            rpc_url: raw.solana_rpc_url,
            vault_program_id: raw.vault_program_id,
            owner_keypair: raw.owner_keypair.filter(|key| !key.trim().is_empty()),
            increment: parse_decimal("ROUNDUP_INCREMENT", &raw.roundup_increment)?,
            strategy: Strategy::from_str(&raw.roundup_strategy)
                .map_err(|e| ConfigError::Message(format!("ROUNDUP_STRATEGY: {}", e)))?,
            poll_interval: Duration::from_secs(raw.poll_interval_secs),
            cooldown: Duration::from_secs(raw.cooldown_secs),
            dust_threshold: parse_decimal("DUST_THRESHOLD_SOL", &raw.dust_threshold_sol)?,
            history_limit: raw.history_limit,
            fetch_limit: raw.fetch_limit,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Message("SOLANA_RPC_URL must not be empty".to_string()));
        }
        if !is_supported_increment(self.increment) {
            return Err(ConfigError::Message(format!(
                "ROUNDUP_INCREMENT must be one of 0.01, 0.05, 0.1, 0.5 (got {})",
                self.increment
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Message("POLL_INTERVAL_SECS must be > 0".to_string()));
        }
        if self.dust_threshold < Decimal::ZERO {
            return Err(ConfigError::Message("DUST_THRESHOLD_SOL must be >= 0".to_string()));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Message("HISTORY_LIMIT must be > 0".to_string()));
        }
        if !(1..=1000).contains(&self.fetch_limit) {
            return Err(ConfigError::Message(format!(
                "FETCH_LIMIT must be between 1 and 1000 (got {})",
                self.fetch_limit
            )));
        }
        Ok(())
    }

    pub fn session_params(&self) -> AppResult<SessionParams> {
        let cooldown = chrono::Duration::from_std(self.cooldown)
            .map_err(|e| AppError::Config(format!("COOLDOWN_SECS: {}", e)))?;

        Ok(SessionParams {
            poll_interval: self.poll_interval,
            poller: PollerParams {
                increment: self.increment,
                cooldown,
                dust_threshold: self.dust_threshold,
                fetch_limit: self.fetch_limit,
                vault_program_id: self.vault_program_id.clone(),
            },
            strategy: self.strategy,
        })
    }

    pub fn feed_config(&self) -> SolanaFeedConfig {
        SolanaFeedConfig {
            rpc_url: self.rpc_url.clone(),
            commitment: CommitmentConfig::confirmed(),
        }
    }

    pub fn vault_config(&self) -> AppResult<VaultProgramConfig> {
        let program_id = Pubkey::from_str(&self.vault_program_id).map_err(|_| {
            AppError::Config(format!(
                "VAULT_PROGRAM_ID is not a valid address: {}",
                self.vault_program_id
            ))
        })?;

        Ok(VaultProgramConfig {
            rpc_url: self.rpc_url.clone(),
            program_id,
            commitment: CommitmentConfig::confirmed(),
        })
    }
}

fn parse_decimal(name: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim())
        .map_err(|e| ConfigError::Message(format!("{} is not a number ({}): {}", name, value, e)))
}
