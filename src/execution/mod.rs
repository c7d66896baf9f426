pub mod traits;
pub mod vault_program;

pub use vault_program::{SolanaVaultProgram, VaultProgramConfig};
