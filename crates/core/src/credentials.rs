//! Shared API credential state.
//!
//! The Gemini client reads the active key on every request, so a key picked
//! through the key-selection flow takes effect on the very next generation.

use crate::config::Config;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct KeyState {
    default_key: String,
    paid_key: Option<String>,
}

/// Cloneable handle to the keys in use.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    inner: Arc<RwLock<KeyState>>,
}

impl Credentials {
    pub fn new(default_key: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(KeyState {
                default_key: default_key.into(),
                paid_key: None,
            })),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let credentials = Self::new(config.gemini_api_key.clone());
        if let Some(key) = &config.paid_api_key {
            credentials.select_paid_key(key.clone());
        }
        credentials
    }

    /// Key to send with the next request. A selected paid key replaces the default.
    pub fn active_key(&self) -> String {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state
            .paid_key
            .clone()
            .unwrap_or_else(|| state.default_key.clone())
    }

    pub fn has_paid_key(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .paid_key
            .is_some()
    }

    /// Makes `key` the active, billing-enabled key. Blank keys are ignored.
    pub fn select_paid_key(&self, key: impl Into<String>) -> bool {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return false;
        }
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .paid_key = Some(key);
        true
    }
}
