use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub dir: String,
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Rotate the log file once it grows past this size
    pub max_file_size_mb: u64,
    /// Number of rotated files kept on disk
    pub max_files: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    /// Attach hex dumps of PCZT artifacts to support reports.
    /// Only enable in debug builds: the dumps contain transaction details.
    pub debug_pczt_dumps: bool,
    /// Maximum number of submission records kept in the transaction store
    pub store_capacity: usize,
    /// Transparent balance (zatoshis) required before a shielding proposal is built
    pub shielding_threshold_zatoshis: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub seed_encryption_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub submission: SubmissionConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Logging defaults
            .set_default("logging.dir", "logs")?
            .set_default("logging.level", "info")?
            .set_default("logging.max_file_size_mb", 50)?
            .set_default("logging.max_files", 5)?
            // Submission defaults
            .set_default("submission.debug_pczt_dumps", false)?
            .set_default("submission.store_capacity", 500)?
            .set_default("submission.shielding_threshold_zatoshis", 100_000)?
            // Security defaults
            .set_default("security.seed_encryption_key", "32-byte-seed-encryption-key!!!!!")?
            // Load from config.toml if exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (prefix: ZASHI_)
            // ZASHI_SUBMISSION__DEBUG_PCZT_DUMPS -> submission.debug_pczt_dumps
            .add_source(
                Environment::with_prefix("ZASHI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // AES-256 needs exactly 32 bytes of key material
        if self.security.seed_encryption_key.len() != 32 {
            return Err(ConfigError::Message(
                "Seed encryption key must be exactly 32 bytes".to_string(),
            ));
        }

        if self.submission.store_capacity == 0 {
            return Err(ConfigError::Message(
                "Transaction store capacity must be at least 1".to_string(),
            ));
        }

        if self.logging.dir.is_empty() {
            return Err(ConfigError::Message(
                "Log directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                dir: "logs".to_string(),
                level: "info".to_string(),
                max_file_size_mb: 50,
                max_files: 5,
            },
            submission: SubmissionConfig::default(),
            security: SecurityConfig {
                seed_encryption_key: "32-byte-seed-encryption-key!!!!!".to_string(),
            },
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            debug_pczt_dumps: false,
            store_capacity: 500,
            shielding_threshold_zatoshis: 100_000,
        }
    }
}
