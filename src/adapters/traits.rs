use async_trait::async_trait;

use crate::error::AppResult;
use crate::ledger::models::{EntrySummary, LedgerEntry};

/// Query options for a feed listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: usize,
    /// Exclusive lower bound: stop listing once this id is reached
    pub until: Option<String>,
}

/// Read-only view of an account's transaction history.
///
/// All calls are fallible and safe to retry. The monitor itself never retries.
#[async_trait]
pub trait LedgerFeed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Most recent entries for `account`, newest first
    async fn list_recent_entries(
        &self,
        account: &str,
        options: ListOptions,
    ) -> AppResult<Vec<EntrySummary>>;

    /// Full entry for a signature, `None` when the feed does not know it yet
    async fn fetch_entry_detail(&self, signature: &str) -> AppResult<Option<LedgerEntry>>;
}
