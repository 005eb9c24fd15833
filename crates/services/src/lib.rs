#![forbid(unsafe_code)]

pub mod adaptive_service;
pub mod app_services;
pub mod config;
pub mod deck_service;
pub mod error;
pub mod sessions;

pub use study_core::Clock;

pub use adaptive_service::{AdaptiveContentSource, HttpAdaptiveContentSource, StaticAdaptiveContent};
pub use app_services::AppServices;
pub use config::EngineConfig;
pub use deck_service::{StudyDeck, StudyDeckService};
pub use error::{AccessError, ContentError, PersistenceFailure, SessionError};
pub use sessions::{
    PersistenceGateway, PersistenceStatus, SessionController, SessionLauncher, SessionResult,
    SessionState,
};
