use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use storage::repository::Storage;
use study_core::Clock;
use study_core::model::{SessionConfig, SessionConfigDraft, StudyMode, UserId, validate_questions};

use super::controller::SessionController;
use super::machine::{QuestionSource, SessionContent};
use super::persistence::PersistenceGateway;
use super::rounds::MIN_DECK_SIZE;
use crate::adaptive_service::AdaptiveContentSource;
use crate::deck_service::StudyDeckService;
use crate::error::{AccessError, ContentError, SessionError};

/// Starts study sessions: validates the request, loads the content and hands
/// back a controller.
#[derive(Clone)]
pub struct SessionLauncher {
    clock: Clock,
    decks: StudyDeckService,
    gateway: PersistenceGateway,
    adaptive: Option<Arc<dyn AdaptiveContentSource>>,
    seed: Option<u64>,
}

impl SessionLauncher {
    #[must_use]
    pub fn new(clock: Clock, decks: StudyDeckService, gateway: PersistenceGateway) -> Self {
        Self {
            clock,
            decks,
            gateway,
            adaptive: None,
            seed: None,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            StudyDeckService::from_storage(storage),
            PersistenceGateway::from_storage(storage),
        )
    }

    #[must_use]
    pub fn with_adaptive_source(mut self, source: Arc<dyn AdaptiveContentSource>) -> Self {
        self.adaptive = Some(source);
        self
    }

    /// Fix the random source so card sampling and option order repeat.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Launch a session.
    ///
    /// Always returns a controller: a failed launch leaves it in its error
    /// state, available through `SessionController::failure`. The draft is
    /// validated before any deck is fetched.
    pub async fn launch(
        &self,
        user_id: UserId,
        draft: SessionConfigDraft,
        access_token: Option<&str>,
    ) -> SessionController {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut controller =
            SessionController::new(user_id, self.clock, self.gateway.clone(), rng);
        tracing::info!(
            session_id = %controller.session_id(),
            %user_id,
            mode = %draft.mode,
            rounds = draft.rounds,
            timed = draft.timed,
            "launching session"
        );

        let loaded = self.load(user_id, draft, access_token).await;
        let _ = controller.finish_loading(loaded).await;
        controller
    }

    async fn load(
        &self,
        user_id: UserId,
        draft: SessionConfigDraft,
        access_token: Option<&str>,
    ) -> Result<SessionContent, SessionError> {
        let config = draft.validate()?;
        let study = self.decks.fetch_for_study(user_id, config.deck_id()).await?;
        let found = study.deck.card_count();
        if found < MIN_DECK_SIZE {
            return Err(ContentError::TooFewFlashcards {
                found,
                required: MIN_DECK_SIZE,
            }
            .into());
        }

        let source = match config.mode() {
            StudyMode::Challenge => QuestionSource::Flashcards(study.deck.into_flashcards()),
            StudyMode::Quiz => self.load_adaptive(&config, access_token).await?,
        };
        Ok(SessionContent {
            config,
            source,
            prior_mastery: study.progress.mastery,
        })
    }

    async fn load_adaptive(
        &self,
        config: &SessionConfig,
        access_token: Option<&str>,
    ) -> Result<QuestionSource, SessionError> {
        let token = access_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AccessError::MissingAccessToken)?;
        let source = self.adaptive.as_ref().ok_or_else(|| {
            ContentError::SourceUnavailable("no adaptive content source configured".into())
        })?;

        let mut questions = source
            .fetch_questions(token, config.deck_id(), config.quiz_questions())
            .await?;
        questions.truncate(config.quiz_questions() as usize);
        validate_questions(&questions).map_err(ContentError::from)?;
        Ok(QuestionSource::Adaptive(questions))
    }
}
