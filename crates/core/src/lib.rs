//! Lumina Core Library
//!
//! This library provides the core functionality for Lumina, a terminal studio
//! for Google's Gemini image models: text-to-image generation, editing from a
//! reference image, and an in-memory history of everything generated in the
//! session.
//!
//! # Overview
//!
//! - **Options**: aspect ratios and model tiers via the [`options`] module
//! - **API Client**: the Gemini `generateContent` call via [`gemini`]
//! - **Key-Gate**: billing-key check for the paid tier via [`key_gate`]
//! - **Session**: the generation state machine and history via [`session`]
//! - **Image I/O**: reference uploads and downloads via [`image_processing`]
//!
//! # Quick Start
//!
//! ```ignore
//! use lumina_core::{Config, Credentials, KeyGate, Studio, SubmitOutcome};
//!
//! let config = Config::load()?;
//! let credentials = Credentials::from_config(&config);
//! let mut studio = Studio::gemini(&config, credentials, KeyGate::permissive())?;
//!
//! studio.set_prompt("A lighthouse on a cliff at dusk");
//! if let SubmitOutcome::Generated(image) = studio.submit().await {
//!     studio.download_current(".").await?;
//!     println!("{}", image.id());
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: Configuration loading from the environment
//! - [`credentials`]: The API key shared by the client and the key-gate
//! - [`error`]: Error types and result aliases
//! - [`gemini`]: Request/response types and the REST client
//! - [`image_processing`]: Data URIs, reference images, downloads
//! - [`key_gate`]: Host key hooks and the gate policy
//! - [`options`]: Aspect ratio and model tier registry
//! - [`session`]: Session state, events and history
//! - [`studio`]: Async driver over a session

pub mod config;
pub mod credentials;
pub mod error;
pub mod gemini;
pub mod image_processing;
pub mod key_gate;
pub mod options;
pub mod session;
pub mod studio;

// Re-export primary types for convenience
pub use config::Config;
pub use credentials::Credentials;
pub use error::{AppError, ErrorKind, Result};
pub use gemini::{GeminiClient, GenerationConfig, ImageModel};
pub use image_processing::ReferenceImage;
pub use key_gate::{KeyGate, KeyHost};
pub use options::{AspectRatio, ModelTier};
pub use session::{GeneratedImage, History, Mode, Phase, Session, SessionEvent};
pub use studio::{Studio, SubmitOutcome};
pub use uuid::Uuid;

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
/// This loads `.env` files if present.
pub fn init() {
    let _ = dotenvy::dotenv();
}
