//! Generation session state.
//!
//! The session is a plain value. Every change goes through
//! [`Session::apply`], which takes the current state and one
//! [`SessionEvent`] and returns the next state, so the whole lifecycle can be
//! tested without a network or a terminal.
//!
//! # Phases
//!
//! ```text
//! Idle ──submit──▶ Generating ──ok──▶ Success
//!   │                   └──fail──▶ Error
//!   └──submit (pro, no key)──▶ AwaitingKey ──closed──▶ Idle
//! Success / Error ──submit──▶ Generating | AwaitingKey
//! ```
//!
//! - [`history`]: generated images and the newest-first history list
//! - [`state`]: the session container, events and transitions

mod history;
mod state;

pub use history::{GeneratedImage, History};
pub use state::{Mode, Phase, Session, SessionEvent, Submission};
