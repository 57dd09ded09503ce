use std::sync::Arc;

use crate::config::Config;
use crate::crypto::signer::Signer;
use crate::db;
use crate::error::Result;
use crate::repositories::drawing::PgDrawingStore;
use crate::services::drawings::DrawingService;
use crate::storage::asset::FsAssetStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The drawing persistence service.
    pub drawings: DrawingService,
    /// The filesystem asset store; handlers use it to verify signed URLs.
    pub assets: Arc<FsAssetStore>,
    /// The shared token/URL signer.
    pub signer: Signer,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        tokio::fs::create_dir_all(&config.storage_root).await?;
        let signer = Signer::new(&config.signing_key);
        let assets = Arc::new(FsAssetStore::new(
            config.storage_root.clone(),
            signer.clone(),
            config.public_base_url.clone(),
        ));
        tracing::info!("✅ Asset store ready at {}", config.storage_root.display());

        let drawings = DrawingService::new(
            Arc::new(PgDrawingStore::new(pool)),
            assets.clone(),
            config.signed_url_ttl_secs,
        );
        tracing::info!("✅ Drawing service initialized");

        Ok(AppState {
            drawings,
            assets,
            signer,
            config: config.clone(),
        })
    }
}
