use anyhow::{bail, Result};

use crate::assist::{self, AssistError, CompletionProvider};
use crate::challenges::{self, Challenge, ChallengeBoard, ChallengeStatus};
use crate::db::Store;
use crate::history::HistoryLog;
use crate::http_client::HttpClient;
use crate::request_builder::RequestBuilder;
use crate::settings::Settings;
use crate::types::ResponseOutcome;

/// One playground session: the request being edited, the last response and the history
pub struct Playground {
    store: Store,
    settings: Settings,
    builder: RequestBuilder,
    client: HttpClient,
    history: HistoryLog,
    challenges: ChallengeBoard,
    last_outcome: Option<ResponseOutcome>,
}

impl Playground {
    /// Load settings, history and generated challenges from `store`.
    pub fn open(store: Store) -> Result<Self> {
        let settings = Settings::load(&store)?;
        let history = HistoryLog::load(&store)?;
        let challenges = ChallengeBoard::load(&store)?;
        let client = HttpClient::new(&settings)?;
        log::debug!("Session opened with {} history entries", history.len());

        Ok(Self {
            store,
            settings,
            builder: RequestBuilder::new(),
            client,
            history,
            challenges,
            last_outcome: None,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Persist new settings and rebuild the HTTP client so they apply to the next send.
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        settings.save(&self.store)?;
        self.client = HttpClient::new(&settings)?;
        self.settings = settings;
        Ok(())
    }

    pub fn builder(&mut self) -> &mut RequestBuilder {
        &mut self.builder
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn challenges(&self) -> &ChallengeBoard {
        &self.challenges
    }

    pub fn last_outcome(&self) -> Option<&ResponseOutcome> {
        self.last_outcome.as_ref()
    }

    /// Send the current draft and record it in history, whatever the outcome.
    ///
    /// Takes `&mut self`, so a second send cannot start while one is in flight.
    pub async fn send(&mut self) -> &ResponseOutcome {
        let snapshot = self.builder.snapshot();
        let request = self.builder.resolve();

        let outcome = self.client.send(&request).await;

        self.history.record(snapshot, outcome.clone());
        if let Err(e) = self.history.save(&self.store) {
            log::error!("Failed to save history: {}", e);
        }

        self.last_outcome.insert(outcome)
    }

    /// Restore a past request into the builder and its response into the view.
    pub fn load_from_history(&mut self, id: &str) -> Option<&ResponseOutcome> {
        let Some((snapshot, outcome)) = self.history.load_entry(id) else {
            log::warn!("No history entry with id {}", id);
            return None;
        };
        self.builder.populate(snapshot);
        Some(&*self.last_outcome.insert(outcome))
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear();
        self.history.save(&self.store)
    }

    /// Fill the builder from a natural-language instruction. On error the builder is untouched.
    pub async fn apply_assist(
        &mut self,
        provider: &dyn CompletionProvider,
        instruction: &str,
    ) -> Result<(), AssistError> {
        let snapshot =
            assist::generate_request(provider, instruction, Some(self.settings.ai_creativity))
                .await?;
        self.builder.populate(snapshot);
        Ok(())
    }

    /// Load a challenge's request into the builder.
    pub fn start_challenge(&mut self, id: &str) -> Result<&Challenge> {
        let Some(challenge) = self.challenges.get(id) else {
            bail!("Unknown challenge '{}'", id);
        };
        if challenge.status == ChallengeStatus::Completed {
            bail!("Challenge '{}' is already completed", id);
        }

        self.builder.populate(challenge.request.clone());
        Ok(challenge)
    }

    /// Generate a challenge and add it to the top of the board.
    pub async fn generate_challenge(
        &mut self,
        provider: &dyn CompletionProvider,
    ) -> Result<Challenge, AssistError> {
        let challenge =
            challenges::generate_challenge(provider, Some(self.settings.ai_creativity)).await?;
        if self.challenges.add_generated(challenge.clone()) {
            if let Err(e) = self.challenges.save(&self.store) {
                log::error!("Failed to save challenges: {}", e);
            }
        }
        Ok(challenge)
    }
}
