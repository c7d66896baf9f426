pub mod activation;
pub mod store;

pub use activation::VaultManager;
pub use store::ReconciliationStore;
