//! Session container, events and the transition function.

use super::history::{GeneratedImage, History};
use crate::error::{AppError, Result};
use crate::gemini::GenerationConfig;
use crate::image_processing::ReferenceImage;
use crate::key_gate::KeyGate;
use crate::options::{AspectRatio, ModelTier};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

/// Whether the user is creating from text or editing a reference image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Generate,
    Edit,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
        })
    }
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate" | "gen" => Ok(Self::Generate),
            "edit" => Ok(Self::Edit),
            other => Err(AppError::validation(format!(
                "Unknown mode '{}'. Expected 'generate' or 'edit'",
                other
            ))),
        }
    }
}

/// Where the session is in the generation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Paid tier selected without a capable key; waiting on the key prompt.
    AwaitingKey,
    Generating,
    Success,
    Error,
}

impl Phase {
    /// Phases from which a new submission may start.
    pub fn accepts_submission(self) -> bool {
        matches!(self, Self::Idle | Self::Success | Self::Error)
    }
}

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SetPrompt(String),
    SetModel(ModelTier),
    SetAspectRatio(AspectRatio),
    SetMode(Mode),
    /// Attaches a reference image and switches to edit mode.
    AttachReference(ReferenceImage),
    ClearReference,
    /// Input was refused before any request; the message is shown inline.
    Rejected(String),
    /// Paid tier requested but the key-gate failed.
    KeyMissing,
    /// The key prompt was dismissed, with or without a selection.
    KeyPromptClosed,
    Started(GenerationConfig),
    Succeeded(GeneratedImage),
    Failed(String),
    SelectHistory(Uuid),
    DeleteHistory(Uuid),
}

impl SessionEvent {
    /// Variant name, for logs. Payloads can hold whole images.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPrompt(_) => "SetPrompt",
            Self::SetModel(_) => "SetModel",
            Self::SetAspectRatio(_) => "SetAspectRatio",
            Self::SetMode(_) => "SetMode",
            Self::AttachReference(_) => "AttachReference",
            Self::ClearReference => "ClearReference",
            Self::Rejected(_) => "Rejected",
            Self::KeyMissing => "KeyMissing",
            Self::KeyPromptClosed => "KeyPromptClosed",
            Self::Started(_) => "Started",
            Self::Succeeded(_) => "Succeeded",
            Self::Failed(_) => "Failed",
            Self::SelectHistory(_) => "SelectHistory",
            Self::DeleteHistory(_) => "DeleteHistory",
        }
    }
}

/// A validated request, ready to be gated and sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub config: GenerationConfig,
    /// Whether the key-gate must pass first.
    pub needs_key_check: bool,
}

/// The state of one interactive session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    mode: Mode,
    prompt: String,
    aspect_ratio: AspectRatio,
    model: ModelTier,
    reference: Option<ReferenceImage>,
    phase: Phase,
    current_image: Option<GeneratedImage>,
    last_error: Option<String>,
    history: History,
}

impl Session {
    pub fn new(model: ModelTier, aspect_ratio: AspectRatio) -> Self {
        Self {
            model,
            aspect_ratio,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn model(&self) -> ModelTier {
        self.model
    }

    pub fn reference(&self) -> Option<&ReferenceImage> {
        self.reference.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_flight(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn current_image(&self) -> Option<&GeneratedImage> {
        self.current_image.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Validates the current inputs and builds the request they describe.
    ///
    /// An attached reference image is forwarded in either mode.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] if the prompt is blank, or if edit mode has no
    /// reference image attached.
    pub fn plan_submission(&self) -> Result<Submission> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::validation("Please enter a prompt."));
        }

        if self.mode == Mode::Edit && self.reference.is_none() {
            return Err(AppError::validation("Attach a reference image to edit."));
        }

        Ok(Submission {
            config: GenerationConfig {
                prompt: self.prompt.clone(),
                aspect_ratio: self.aspect_ratio,
                model: self.model,
                reference: self.reference.clone(),
            },
            needs_key_check: KeyGate::applies_to(self.model),
        })
    }

    /// Applies one event and returns the resulting session.
    ///
    /// Lifecycle events that do not fit the current phase are ignored.
    pub fn apply(mut self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::SetPrompt(prompt) => self.prompt = prompt,
            SessionEvent::SetModel(model) => self.model = model,
            SessionEvent::SetAspectRatio(ratio) => self.aspect_ratio = ratio,
            SessionEvent::SetMode(mode) => self.mode = mode,
            SessionEvent::AttachReference(reference) => {
                self.reference = Some(reference);
                self.mode = Mode::Edit;
                self.last_error = None;
            }
            SessionEvent::ClearReference => self.reference = None,
            SessionEvent::Rejected(message) => self.last_error = Some(message),

            SessionEvent::KeyMissing if self.phase.accepts_submission() => {
                self.phase = Phase::AwaitingKey;
                self.last_error = None;
            }
            SessionEvent::KeyPromptClosed if self.phase == Phase::AwaitingKey => {
                self.phase = Phase::Idle;
            }
            SessionEvent::Started(config) if self.phase.accepts_submission() => {
                debug!(
                    model = config.model.api_id(),
                    ratio = config.aspect_ratio.as_str(),
                    with_reference = config.reference.is_some(),
                    "Generation started"
                );
                self.phase = Phase::Generating;
                self.last_error = None;
            }
            SessionEvent::Succeeded(image) if self.phase == Phase::Generating => {
                self.phase = Phase::Success;
                self.last_error = None;
                if !self.history.push_front(image.clone()) {
                    warn!(id = %image.id(), "Image id already in history, not added again");
                }
                self.current_image = Some(image);
            }
            SessionEvent::Failed(message) if self.phase == Phase::Generating => {
                self.phase = Phase::Error;
                self.last_error = Some(message);
            }

            SessionEvent::SelectHistory(id) => match self.history.get(id).cloned() {
                Some(image) => {
                    self.prompt = image.prompt().to_string();
                    self.model = image.model();
                    if let Some(ratio) = image.aspect_ratio() {
                        self.aspect_ratio = ratio;
                    }
                    self.current_image = Some(image);
                }
                None => debug!(%id, "Selected image is not in history"),
            },
            SessionEvent::DeleteHistory(id) => {
                if self.history.remove(id).is_some()
                    && self.current_image.as_ref().is_some_and(|c| c.id() == id)
                {
                    self.current_image = None;
                }
            }

            ignored => warn!(
                phase = ?self.phase,
                event = ignored.name(),
                "Ignoring event in this phase"
            ),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ReferenceImage {
        ReferenceImage {
            data: "QUJD".into(),
            mime_type: "image/png".into(),
        }
    }

    fn image(prompt: &str, model: ModelTier, ratio: AspectRatio) -> GeneratedImage {
        GeneratedImage::new("data:image/png;base64,AAAA", prompt, model, Some(ratio))
    }

    fn generating(session: Session) -> Session {
        let submission = session.plan_submission().unwrap();
        session.apply(SessionEvent::Started(submission.config))
    }

    fn with_prompt(prompt: &str) -> Session {
        Session::default().apply(SessionEvent::SetPrompt(prompt.into()))
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let session = Session::default().apply(SessionEvent::SetPrompt("   ".into()));
        let err = session.plan_submission().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn edit_mode_requires_reference() {
        let session = with_prompt("make it snowy").apply(SessionEvent::SetMode(Mode::Edit));
        assert!(session.plan_submission().is_err());

        let session = session.apply(SessionEvent::AttachReference(reference()));
        let submission = session.plan_submission().unwrap();
        assert_eq!(submission.config.reference, Some(reference()));
    }

    #[test]
    fn reference_is_forwarded_in_generate_mode() {
        let session = with_prompt("a cat")
            .apply(SessionEvent::AttachReference(reference()))
            .apply(SessionEvent::SetMode(Mode::Generate));
        let planned = session.plan_submission().unwrap();
        assert_eq!(planned.config.reference, Some(reference()));
    }

    #[test]
    fn attaching_reference_switches_to_edit() {
        let session = Session::default().apply(SessionEvent::AttachReference(reference()));
        assert_eq!(session.mode(), Mode::Edit);
    }

    #[test]
    fn pro_submission_needs_key_check() {
        let session = with_prompt("x").apply(SessionEvent::SetModel(ModelTier::Pro));
        assert!(session.plan_submission().unwrap().needs_key_check);
        let session = session.apply(SessionEvent::SetModel(ModelTier::Flash));
        assert!(!session.plan_submission().unwrap().needs_key_check);
    }

    #[test]
    fn success_sets_current_and_prepends_history() {
        let session = generating(with_prompt("first"));
        assert!(session.in_flight());

        let img = image("first", ModelTier::Flash, AspectRatio::Square);
        let session = session.apply(SessionEvent::Succeeded(img.clone()));
        assert_eq!(session.phase(), Phase::Success);
        assert_eq!(session.current_image(), Some(&img));
        assert_eq!(session.history().nth(0), Some(&img));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn failure_keeps_previous_result() {
        let img = image("first", ModelTier::Flash, AspectRatio::Square);
        let session = generating(with_prompt("first")).apply(SessionEvent::Succeeded(img.clone()));
        let session = generating(session).apply(SessionEvent::Failed("boom".into()));

        assert_eq!(session.phase(), Phase::Error);
        assert_eq!(session.last_error(), Some("boom"));
        assert_eq!(session.current_image(), Some(&img));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn new_submission_clears_error() {
        let session = generating(with_prompt("x")).apply(SessionEvent::Failed("boom".into()));
        let session = generating(session);
        assert_eq!(session.phase(), Phase::Generating);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn key_prompt_round_trip_returns_to_idle() {
        let session = with_prompt("x").apply(SessionEvent::KeyMissing);
        assert_eq!(session.phase(), Phase::AwaitingKey);

        // Cannot start while the key prompt is open.
        let submission = session.plan_submission().unwrap();
        let session = session.apply(SessionEvent::Started(submission.config));
        assert_eq!(session.phase(), Phase::AwaitingKey);

        let session = session.apply(SessionEvent::KeyPromptClosed);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn out_of_phase_results_are_ignored() {
        let img = image("x", ModelTier::Flash, AspectRatio::Square);
        let session = with_prompt("x").apply(SessionEvent::Succeeded(img));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.history().is_empty());

        let session = session.apply(SessionEvent::Failed("late".into()));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn rejection_records_message_only() {
        let session = with_prompt("x").apply(SessionEvent::Rejected("too big".into()));
        assert_eq!(session.last_error(), Some("too big"));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.reference().is_none());
    }

    #[test]
    fn selecting_history_restores_settings() {
        let wide_pro = image("castle", ModelTier::Pro, AspectRatio::Wide);
        let square_flash = image("forest", ModelTier::Flash, AspectRatio::Square);

        let mut session = with_prompt("castle");
        for img in [wide_pro.clone(), square_flash.clone()] {
            session = generating(session).apply(SessionEvent::Succeeded(img));
        }
        assert_eq!(session.current_image(), Some(&square_flash));

        let session = session.apply(SessionEvent::SelectHistory(wide_pro.id()));
        assert_eq!(session.current_image(), Some(&wide_pro));
        assert_eq!(session.prompt(), "castle");
        assert_eq!(session.model(), ModelTier::Pro);
        assert_eq!(session.aspect_ratio(), AspectRatio::Wide);

        let ids: Vec<Uuid> = session.history().iter().map(|i| i.id()).collect();
        assert_eq!(ids, [square_flash.id(), wide_pro.id()]);
    }

    #[test]
    fn selecting_entry_without_ratio_keeps_current_ratio() {
        let img = GeneratedImage::new("data:image/png;base64,AAAA", "p", ModelTier::Flash, None);
        let session = generating(with_prompt("p").apply(SessionEvent::SetAspectRatio(AspectRatio::Tall)))
            .apply(SessionEvent::Succeeded(img.clone()))
            .apply(SessionEvent::SelectHistory(img.id()));
        assert_eq!(session.aspect_ratio(), AspectRatio::Tall);
    }

    #[test]
    fn deleting_current_image_clears_it() {
        let a = image("a", ModelTier::Flash, AspectRatio::Square);
        let b = image("b", ModelTier::Flash, AspectRatio::Square);
        let session = generating(with_prompt("a")).apply(SessionEvent::Succeeded(a.clone()));
        let session = generating(session).apply(SessionEvent::Succeeded(b.clone()));

        let session = session.apply(SessionEvent::DeleteHistory(a.id()));
        assert_eq!(session.current_image(), Some(&b));
        assert_eq!(session.history().len(), 1);

        let session = session.apply(SessionEvent::DeleteHistory(b.id()));
        assert!(session.current_image().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn mode_parses() {
        assert_eq!("Edit".parse::<Mode>().unwrap(), Mode::Edit);
        assert_eq!("generate".parse::<Mode>().unwrap(), Mode::Generate);
        assert!("paint".parse::<Mode>().is_err());
    }
}
