//! Async driver tying the session to the model and the key-gate.
//!
//! [`Studio`] owns a [`Session`] and performs the effects the session itself
//! cannot: awaiting the key-gate, calling the model, reading reference files
//! and writing downloads. Each effect ends in one [`SessionEvent`].

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{AppError, Result};
use crate::gemini::{GeminiClient, ImageModel};
use crate::image_processing::{self, ReferenceImage};
use crate::key_gate::KeyGate;
use crate::options::{AspectRatio, ModelTier};
use crate::session::{GeneratedImage, Mode, Phase, Session, SessionEvent};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a call to [`Studio::submit`] ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Inputs failed validation; nothing was sent.
    Invalid(String),
    /// A generation is already running, or the key prompt is still open.
    Busy,
    /// The paid tier needs a key; the key prompt should be shown.
    AwaitingKey,
    Generated(GeneratedImage),
    Failed(String),
}

pub struct Studio<M> {
    session: Session,
    model: M,
    gate: KeyGate,
}

impl<M: ImageModel> Studio<M> {
    pub fn new(model: M, gate: KeyGate) -> Self {
        Self::with_session(Session::default(), model, gate)
    }

    pub fn with_session(session: Session, model: M, gate: KeyGate) -> Self {
        Self {
            session,
            model,
            gate,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Applies a single event to the owned session.
    pub fn dispatch(&mut self, event: SessionEvent) {
        let session = std::mem::take(&mut self.session);
        self.session = session.apply(event);
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.dispatch(SessionEvent::SetPrompt(prompt.into()));
    }

    pub fn set_model(&mut self, model: ModelTier) {
        self.dispatch(SessionEvent::SetModel(model));
    }

    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.dispatch(SessionEvent::SetAspectRatio(ratio));
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.dispatch(SessionEvent::SetMode(mode));
    }

    pub fn clear_reference(&mut self) {
        self.dispatch(SessionEvent::ClearReference);
    }

    /// Runs one generation from the current inputs.
    ///
    /// Suspends on the key-gate (paid tier only) and on the model call. No
    /// retries: every failure needs a new submission.
    pub async fn submit(&mut self) -> SubmitOutcome {
        match self.session.phase() {
            Phase::Generating => return SubmitOutcome::Busy,
            Phase::AwaitingKey => return SubmitOutcome::AwaitingKey,
            _ => {}
        }

        let submission = match self.session.plan_submission() {
            Ok(submission) => submission,
            Err(e) => {
                let message = e.to_string();
                debug!(%message, "Submission rejected");
                self.dispatch(SessionEvent::Rejected(message.clone()));
                return SubmitOutcome::Invalid(message);
            }
        };

        if submission.needs_key_check && !self.gate.has_capable_key().await {
            info!("Paid model selected without a capable key, asking for one");
            self.dispatch(SessionEvent::KeyMissing);
            return SubmitOutcome::AwaitingKey;
        }

        let config = submission.config;
        self.dispatch(SessionEvent::Started(config.clone()));

        let result = self.model.generate(&config).await;
        match result {
            Ok(url) => {
                let image = GeneratedImage::new(
                    url,
                    config.prompt,
                    config.model,
                    Some(config.aspect_ratio),
                );
                info!(id = %image.id(), model = config.model.api_id(), "Image generated");
                self.dispatch(SessionEvent::Succeeded(image.clone()));
                SubmitOutcome::Generated(image)
            }
            Err(e) => {
                let message = e.to_string();
                self.dispatch(SessionEvent::Failed(message.clone()));
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Runs the host's key selection flow, then closes the key prompt.
    ///
    /// Never fails; the user has to submit again afterwards.
    pub async fn select_key(&mut self) {
        self.gate.request_key_selection().await;
        self.dispatch(SessionEvent::KeyPromptClosed);
    }

    /// Closes the key prompt without selecting a key.
    pub fn dismiss_key_prompt(&mut self) {
        self.dispatch(SessionEvent::KeyPromptClosed);
    }

    /// Loads `path` as the reference image and switches to edit mode.
    ///
    /// On rejection the message is recorded in the session and the previous
    /// reference, if any, is kept.
    pub async fn attach_reference(&mut self, path: impl AsRef<Path>) -> Result<()> {
        match ReferenceImage::from_file(path.as_ref()).await {
            Ok(reference) => {
                self.dispatch(SessionEvent::AttachReference(reference));
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "Reference image rejected");
                self.dispatch(SessionEvent::Rejected(e.to_string()));
                Err(e)
            }
        }
    }

    /// Uses the current image as the reference for the next edit.
    pub fn reference_current_image(&mut self) -> Result<()> {
        let image = self
            .session
            .current_image()
            .ok_or_else(|| AppError::validation("There is no image to edit."))?;
        let reference = ReferenceImage::from_data_uri(image.url())?;
        self.dispatch(SessionEvent::AttachReference(reference));
        Ok(())
    }

    pub fn select_history(&mut self, id: Uuid) {
        self.dispatch(SessionEvent::SelectHistory(id));
    }

    pub fn delete_history(&mut self, id: Uuid) {
        self.dispatch(SessionEvent::DeleteHistory(id));
    }

    /// Saves the current image into `dir` as `lumina-{id}.{ext}`.
    pub async fn download_current(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let image = self
            .session
            .current_image()
            .ok_or_else(|| AppError::validation("There is no image to download."))?;
        image_processing::save_data_uri(image.id(), image.url(), dir).await
    }
}

impl Studio<GeminiClient> {
    /// Builds a studio backed by the Gemini REST client.
    ///
    /// `credentials` is shared with the client, so a key selected through
    /// `gate` is used by the next request.
    pub fn gemini(config: &Config, credentials: Credentials, gate: KeyGate) -> Result<Self> {
        let client = GeminiClient::new(config, credentials)?;
        let session = Session::new(config.default_model, config.default_aspect_ratio);
        Ok(Self::with_session(session, client, gate))
    }
}
