use std::env;
use std::path::PathBuf;
use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The root directory for stored background assets.
    pub storage_root: PathBuf,
    /// The base URL prepended to signed asset URLs.
    pub public_base_url: String,
    /// How long a signed asset URL stays valid, in seconds.
    pub signed_url_ttl_secs: i64,
    /// The key used to sign asset URLs and bearer tokens.
    pub signing_key: Zeroizing<Vec<u8>>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut signing_key_hex = env::var("URL_SIGNING_KEY")
            .context("URL_SIGNING_KEY must be set (generate with: openssl rand -hex 32)")?;

        let signing_key_bytes = hex::decode(&signing_key_hex)
            .context("URL_SIGNING_KEY must be valid hexadecimal")?;

        signing_key_hex.zeroize();

        if signing_key_bytes.len() != 32 {
            anyhow::bail!("URL_SIGNING_KEY must be exactly 32 bytes (64 hex characters)");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            storage_root: env::var("STORAGE_ROOT")
                .unwrap_or_else(|_| "storage/backgrounds".to_string())
                .into(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string()),
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("Invalid SIGNED_URL_TTL_SECS")?,
            signing_key: Zeroizing::new(signing_key_bytes),
        })
    }
}
