use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::CommitmentConfig;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppResult, VaultError};
use crate::execution::traits::VaultClient;
use crate::ledger::models::{Strategy, VaultSnapshot};
use crate::monitor::roundup::{lamports_to_sol, sol_to_lamports};

const VAULT_SEED: &[u8] = b"vault";
const VAULT_SOL_SEED: &[u8] = b"vault_sol";

/// Anchor custom error codes of the vault program (6000 + variant index)
const ERR_ZERO_AMOUNT: &str = "0x1770";
const ERR_VAULT_INACTIVE: &str = "0x1771";
const ERR_INSUFFICIENT_FUNDS: &str = "0x1772";

#[derive(Debug, Clone)]
pub struct VaultProgramConfig {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub commitment: CommitmentConfig,
}

#[derive(BorshSerialize)]
struct InitializeVaultArgs {
    round_up_amount: u64,
    strategy: Strategy,
}

#[derive(BorshSerialize)]
struct AmountArgs {
    amount: u64,
}

#[derive(BorshSerialize)]
struct UpdateSettingsArgs {
    round_up_amount: Option<u64>,
    strategy: Option<Strategy>,
    is_active: Option<bool>,
}

/// On-chain `Vault` account body, after the 8-byte discriminator
#[derive(Debug, BorshDeserialize)]
struct VaultAccount {
    owner: [u8; 32],
    round_up_amount: u64,
    strategy: Strategy,
    total_deposited: u64,
    total_withdrawn: u64,
    deposit_count: u64,
    created_at: i64,
    last_deposit_at: i64,
    is_active: bool,
    #[allow(dead_code)]
    bump: u8,
}

/// Client for the round-up vault program, signing as the vault owner
pub struct SolanaVaultProgram {
    config: VaultProgramConfig,
    client: RpcClient,
    owner: Arc<Keypair>,
    vault: Pubkey,
    vault_sol: Pubkey,
}

impl SolanaVaultProgram {
    pub fn new(config: VaultProgramConfig, owner: Keypair) -> Self {
        let client = RpcClient::new_with_commitment(config.rpc_url.clone(), config.commitment);
        let owner_key = owner.pubkey();
        let (vault, _) =
            Pubkey::find_program_address(&[VAULT_SEED, owner_key.as_ref()], &config.program_id);
        let (vault_sol, _) =
            Pubkey::find_program_address(&[VAULT_SOL_SEED, owner_key.as_ref()], &config.program_id);

        info!("Vault account {} (funds held at {})", vault, vault_sol);

        Self {
            config,
            client,
            owner: Arc::new(owner),
            vault,
            vault_sol,
        }
    }

    /// Accounts for initialize / deposit / withdraw
    fn funds_accounts(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.vault, false),
            AccountMeta::new(self.vault_sol, false),
            AccountMeta::new(self.owner.pubkey(), true),
            // System program is all zeros
            AccountMeta::new_readonly(Pubkey::new_from_array([0; 32]), false),
        ]
    }

    fn settings_accounts(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.vault, false),
            AccountMeta::new_readonly(self.owner.pubkey(), true),
        ]
    }

    fn instruction<T: BorshSerialize>(
        &self,
        name: &str,
        args: &T,
        accounts: Vec<AccountMeta>,
    ) -> AppResult<Instruction> {
        let mut data = sighash("global", name).to_vec();
        let encoded =
            borsh::to_vec(args).map_err(|e| VaultError::Rpc(format!("encode {}: {}", name, e)))?;
        data.extend_from_slice(&encoded);

        Ok(Instruction {
            program_id: self.config.program_id,
            accounts,
            data,
        })
    }

    async fn send(&self, name: &str, instruction: Instruction) -> AppResult<String> {
        let recent_blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| VaultError::Rpc(format!("Failed to get blockhash: {}", e)))?;

        let owner = self.owner.pubkey();
        let transaction = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&owner),
            &[&*self.owner],
            recent_blockhash,
        );

        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(|e| program_error(name, &e.to_string()))?;

        debug!("{} confirmed: {}", name, signature);
        Ok(signature.to_string())
    }
}

/// Anchor's 8-byte discriminator: sha256("<namespace>:<name>")[..8]
fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn program_error(instruction: &str, message: &str) -> VaultError {
    if message.contains(ERR_VAULT_INACTIVE) {
        VaultError::Inactive
    } else if message.contains(ERR_ZERO_AMOUNT) {
        VaultError::ZeroAmount
    } else if message.contains(ERR_INSUFFICIENT_FUNDS) {
        VaultError::InsufficientFunds {
            requested: "unknown".to_string(),
            available: "unknown".to_string(),
        }
    } else {
        VaultError::Rpc(format!("{} failed: {}", instruction, message))
    }
}

fn decode_vault_account(data: &[u8]) -> Result<VaultAccount, VaultError> {
    if data.len() < 8 {
        return Err(VaultError::AccountDecode(format!(
            "account too short: {} bytes",
            data.len()
        )));
    }

    if data[..8] != sighash("account", "Vault") {
        return Err(VaultError::AccountDecode("discriminator mismatch".to_string()));
    }

    // Trailing bytes past the struct are allowed
    let mut body = &data[8..];
    VaultAccount::deserialize(&mut body).map_err(|e| VaultError::AccountDecode(e.to_string()))
}

fn to_snapshot(account: VaultAccount, vault_balance: u64) -> VaultSnapshot {
    VaultSnapshot {
        owner: Pubkey::new_from_array(account.owner).to_string(),
        round_up_increment: lamports_to_sol(account.round_up_amount),
        strategy: account.strategy,
        total_deposited: lamports_to_sol(account.total_deposited),
        total_withdrawn: lamports_to_sol(account.total_withdrawn),
        deposit_count: account.deposit_count,
        created_at: account.created_at,
        last_deposit_at: account.last_deposit_at,
        is_active: account.is_active,
        vault_balance: lamports_to_sol(vault_balance),
    }
}

fn positive_lamports(amount: Decimal) -> AppResult<u64> {
    let lamports = sol_to_lamports(amount)?;
    if lamports == 0 {
        return Err(VaultError::ZeroAmount.into());
    }
    Ok(lamports)
}

#[async_trait]
impl VaultClient for SolanaVaultProgram {
    async fn initialize(&self, increment: Decimal, strategy: Strategy) -> AppResult<String> {
        let args = InitializeVaultArgs {
            round_up_amount: positive_lamports(increment)?,
            strategy,
        };
        let instruction = self.instruction("initialize_vault", &args, self.funds_accounts())?;
        self.send("initialize_vault", instruction).await
    }

    async fn deposit(&self, amount: Decimal) -> AppResult<String> {
        let args = AmountArgs {
            amount: positive_lamports(amount)?,
        };
        let instruction = self.instruction("deposit", &args, self.funds_accounts())?;
        self.send("deposit", instruction).await
    }

    async fn withdraw(&self, amount: Decimal) -> AppResult<String> {
        let args = AmountArgs {
            amount: positive_lamports(amount)?,
        };
        let instruction = self.instruction("withdraw", &args, self.funds_accounts())?;
        self.send("withdraw", instruction).await
    }

    async fn update_settings(
        &self,
        increment: Option<Decimal>,
        strategy: Option<Strategy>,
        active: bool,
    ) -> AppResult<String> {
        let args = UpdateSettingsArgs {
            round_up_amount: increment.map(positive_lamports).transpose()?,
            strategy,
            is_active: Some(active),
        };
        let instruction = self.instruction("update_settings", &args, self.settings_accounts())?;
        self.send("update_settings", instruction).await
    }

    async fn fetch_snapshot(&self) -> AppResult<Option<VaultSnapshot>> {
        let response = self
            .client
            .get_account_with_commitment(&self.vault, self.config.commitment)
            .await
            .map_err(|e| VaultError::Rpc(format!("Failed to fetch vault account: {}", e)))?;

        let Some(account) = response.value else {
            return Ok(None);
        };

        let vault = decode_vault_account(&account.data)?;

        let balance = self
            .client
            .get_balance_with_commitment(&self.vault_sol, self.config.commitment)
            .await
            .map_err(|e| VaultError::Rpc(format!("Failed to get vault balance: {}", e)))?
            .value;

        Ok(Some(to_snapshot(vault, balance)))
    }

    fn program_id(&self) -> String {
        self.config.program_id.to_string()
    }
}
