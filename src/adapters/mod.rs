pub mod solana_feed;
pub mod traits;

pub use solana_feed::{SolanaFeedConfig, SolanaLedgerFeed};
