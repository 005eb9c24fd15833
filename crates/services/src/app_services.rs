use std::sync::Arc;

use storage::repository::Storage;
use storage::sqlite::SqliteRepository;
use tracing::{debug, info};

use crate::Clock;
use crate::adaptive_service::HttpAdaptiveContentSource;
use crate::config::EngineConfig;
use crate::deck_service::StudyDeckService;
use crate::error::AppServicesError;
use crate::sessions::SessionLauncher;

/// Assembles app-facing services from one storage backend.
#[derive(Clone)]
pub struct AppServices {
    config: EngineConfig,
    decks: Arc<StudyDeckService>,
    launcher: Arc<SessionLauncher>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: EngineConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let (repo, report) = SqliteRepository::open(&config.db_url).await?;
        if report.is_up_to_date_on_open() {
            debug!(schema_version = report.schema_version, "sqlite schema up to date");
        } else {
            info!(applied = ?report.applied, schema_version = report.schema_version, "sqlite schema migrated");
        }
        Ok(Self::assemble(&Storage::from_repository(repo), config, clock))
    }

    #[must_use]
    pub fn in_memory(config: EngineConfig, clock: Clock) -> Self {
        Self::assemble(&Storage::in_memory(), config, clock)
    }

    fn assemble(storage: &Storage, config: EngineConfig, clock: Clock) -> Self {
        let mut launcher = SessionLauncher::from_storage(clock, storage);
        if let Some(settings) = config.content_source.clone() {
            launcher = launcher.with_adaptive_source(Arc::new(HttpAdaptiveContentSource::new(settings)));
        }
        Self {
            decks: Arc::new(StudyDeckService::from_storage(storage)),
            launcher: Arc::new(launcher),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Access token configured for the adaptive content source, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.config
            .content_source
            .as_ref()
            .and_then(|settings| settings.access_token())
    }

    #[must_use]
    pub fn decks(&self) -> Arc<StudyDeckService> {
        Arc::clone(&self.decks)
    }

    #[must_use]
    pub fn launcher(&self) -> Arc<SessionLauncher> {
        Arc::clone(&self.launcher)
    }
}
