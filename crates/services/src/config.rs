use std::env;

use study_core::model::{ContentSourceSettings, ContentSourceSettingsDraft, DEFAULT_QUESTION_SECONDS};

pub const DEFAULT_DB_URL: &str = "sqlite://study.sqlite3";

/// Runtime settings read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub db_url: String,
    pub question_seconds: u32,
    pub content_source: Option<ContentSourceSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            question_seconds: DEFAULT_QUESTION_SECONDS,
            content_source: None,
        }
    }
}

impl EngineConfig {
    /// Reads `STUDY_DB_URL`, `STUDY_QUESTION_SECONDS`, `STUDY_ADAPTIVE_BASE_URL`
    /// and `STUDY_ADAPTIVE_TOKEN`. Unusable values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_url = lookup("STUDY_DB_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.into());

        let question_seconds = match lookup("STUDY_QUESTION_SECONDS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid STUDY_QUESTION_SECONDS");
                    DEFAULT_QUESTION_SECONDS
                }
            },
            None => DEFAULT_QUESTION_SECONDS,
        };

        let draft = ContentSourceSettingsDraft {
            base_url: lookup("STUDY_ADAPTIVE_BASE_URL"),
            access_token: lookup("STUDY_ADAPTIVE_TOKEN"),
        };
        let content_source = if draft.base_url.is_some() {
            draft
                .validate()
                .inspect_err(|err| tracing::warn!(error = %err, "adaptive content source disabled"))
                .ok()
        } else {
            None
        };

        Self {
            db_url,
            question_seconds,
            content_source,
        }
    }
}
