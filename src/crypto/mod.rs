pub mod encryption;
pub mod seed_vault;

pub use encryption::SeedCipher;
pub use seed_vault::SeedVault;
