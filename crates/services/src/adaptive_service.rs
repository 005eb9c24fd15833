use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use study_core::model::{AdaptiveQuestion, ContentSourceSettings, DeckId};

use crate::error::AdaptiveContentError;

/// Supplies pre-built quiz questions for a deck.
#[async_trait]
pub trait AdaptiveContentSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `AdaptiveContentError` when the source rejects the token or the
    /// request fails.
    async fn fetch_questions(
        &self,
        access_token: &str,
        deck_id: DeckId,
        count: u32,
    ) -> Result<Vec<AdaptiveQuestion>, AdaptiveContentError>;
}

/// Fetches quiz questions from the adaptive content HTTP endpoint.
#[derive(Clone)]
pub struct HttpAdaptiveContentSource {
    client: Client,
    settings: ContentSourceSettings,
}

impl HttpAdaptiveContentSource {
    #[must_use]
    pub fn new(settings: ContentSourceSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn questions_url(&self, deck_id: DeckId) -> String {
        format!(
            "{}/decks/{deck_id}/adaptive-questions",
            self.settings.base_url().as_str().trim_end_matches('/')
        )
    }
}

#[async_trait]
impl AdaptiveContentSource for HttpAdaptiveContentSource {
    async fn fetch_questions(
        &self,
        access_token: &str,
        deck_id: DeckId,
        count: u32,
    ) -> Result<Vec<AdaptiveQuestion>, AdaptiveContentError> {
        tracing::debug!(%deck_id, count, "requesting adaptive questions");
        let response = self
            .client
            .post(self.questions_url(deck_id))
            .bearer_auth(access_token)
            .json(&QuestionsRequest { count })
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AdaptiveContentError::Unauthorized);
            }
            status if !status.is_success() => {
                return Err(AdaptiveContentError::HttpStatus(status));
            }
            _ => {}
        }

        let body: QuestionsResponse = response.json().await?;
        Ok(body.questions)
    }
}

/// Serves a fixed question list. Handy offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAdaptiveContent {
    questions: Vec<AdaptiveQuestion>,
}

impl StaticAdaptiveContent {
    #[must_use]
    pub fn new(questions: Vec<AdaptiveQuestion>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl AdaptiveContentSource for StaticAdaptiveContent {
    async fn fetch_questions(
        &self,
        _access_token: &str,
        _deck_id: DeckId,
        count: u32,
    ) -> Result<Vec<AdaptiveQuestion>, AdaptiveContentError> {
        Ok(self
            .questions
            .iter()
            .take(count as usize)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct QuestionsRequest {
    count: u32,
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    questions: Vec<AdaptiveQuestion>,
}
