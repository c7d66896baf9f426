use async_trait::async_trait;
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::{CommitmentConfig, RpcTransactionConfig, UiTransactionEncoding};
use solana_client::rpc_request::RpcRequest;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;
use std::str::FromStr;
use tracing::debug;

use crate::adapters::traits::{LedgerFeed, ListOptions};
use crate::error::{AppResult, FeedError};
use crate::ledger::models::{BalanceDelta, EntrySummary, LedgerEntry};

#[derive(Debug, Clone)]
pub struct SolanaFeedConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
}

impl Default for SolanaFeedConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

/// Transaction feed over Solana JSON-RPC
/// (`getSignaturesForAddress` + `getTransaction`)
pub struct SolanaLedgerFeed {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaLedgerFeed {
    pub fn new(config: SolanaFeedConfig) -> Self {
        let client = RpcClient::new_with_commitment(config.rpc_url, config.commitment);
        Self {
            client,
            commitment: config.commitment,
        }
    }
}

fn to_ledger_entry(
    signature: &str,
    confirmed: EncodedConfirmedTransactionWithStatusMeta,
) -> AppResult<Option<LedgerEntry>> {
    let Some(meta) = confirmed.transaction.meta else {
        return Ok(None);
    };

    let Some(transaction) = confirmed.transaction.transaction.decode() else {
        return Err(FeedError::Rpc(format!("undecodable transaction {}", signature)).into());
    };

    // Balances are indexed like the account keys; static keys come first,
    // which always covers the signer whose spend we measure
    let balance_deltas = transaction
        .message
        .static_account_keys()
        .iter()
        .zip(meta.pre_balances.iter().zip(meta.post_balances.iter()))
        .map(|(key, (pre, post))| BalanceDelta {
            account: key.to_string(),
            pre: *pre,
            post: *post,
        })
        .collect();

    let log_messages: Option<Vec<String>> = meta.log_messages.into();

    Ok(Some(LedgerEntry {
        signature: signature.to_string(),
        slot: confirmed.slot,
        block_time: confirmed.block_time,
        success: meta.err.is_none(),
        balance_deltas,
        log_messages: log_messages.unwrap_or_default(),
    }))
}

fn parse_signature(signature: &str) -> Result<Signature, FeedError> {
    Signature::from_str(signature).map_err(|_| FeedError::InvalidSignature(signature.to_string()))
}

#[async_trait]
impl LedgerFeed for SolanaLedgerFeed {
    fn name(&self) -> &'static str {
        "solana-rpc"
    }

    async fn list_recent_entries(
        &self,
        account: &str,
        options: ListOptions,
    ) -> AppResult<Vec<EntrySummary>> {
        let address =
            Pubkey::from_str(account).map_err(|_| FeedError::InvalidAddress(account.to_string()))?;

        let until = options.until.as_deref().map(parse_signature).transpose()?;

        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until,
            limit: Some(options.limit),
            commitment: Some(self.commitment),
        };

        let statuses = self
            .client
            .get_signatures_for_address_with_config(&address, config)
            .await
            .map_err(|e| FeedError::Rpc(format!("getSignaturesForAddress: {}", e)))?;

        debug!("Feed returned {} signatures for {}", statuses.len(), account);

        Ok(statuses
            .into_iter()
            .map(|status| EntrySummary {
                success: status.err.is_none(),
                signature: status.signature,
                slot: status.slot,
                block_time: status.block_time,
            })
            .collect())
    }

    async fn fetch_entry_detail(&self, signature: &str) -> AppResult<Option<LedgerEntry>> {
        let parsed = parse_signature(signature)?;

        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        // The node answers `null` for signatures it has not indexed yet
        let confirmed: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .client
            .send(
                RpcRequest::GetTransaction,
                json!([parsed.to_string(), config]),
            )
            .await
            .map_err(|e| FeedError::Rpc(format!("getTransaction {}: {}", signature, e)))?;

        let Some(confirmed) = confirmed else {
            debug!("Transaction {} not available yet", signature);
            return Ok(None);
        };

        to_ledger_entry(signature, confirmed)
    }

}
