//! Pre-flight credential check for the paid model tier.
//!
//! The host environment may or may not be able to tell whether a
//! billing-enabled key is active, and may or may not offer a way to pick one.
//! [`KeyHost`] models both capabilities as optional; [`KeyGate`] applies the
//! policy on top:
//!
//! - no capability check available: assume the key is fine
//! - no selection flow available: log a warning and carry on
//! - host failures never reach the caller

use crate::error::Result;
use crate::options::ModelTier;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};

/// Credential hooks provided by the host environment.
///
/// Return `None` from a method when the host does not offer that capability.
pub trait KeyHost: Send + Sync {
    /// Whether a billing-capable key is currently selected.
    fn has_selected_api_key(&self) -> Option<BoxFuture<'_, bool>> {
        None
    }

    /// Runs the host's key selection flow.
    fn open_select_key(&self) -> Option<BoxFuture<'_, Result<()>>> {
        None
    }
}

/// A host with neither capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyHost;

impl KeyHost for NoKeyHost {}

#[derive(Clone)]
pub struct KeyGate {
    host: Arc<dyn KeyHost>,
}

impl KeyGate {
    pub fn new(host: Arc<dyn KeyHost>) -> Self {
        Self { host }
    }

    /// A gate that always passes and whose selection flow is a no-op.
    pub fn permissive() -> Self {
        Self::new(Arc::new(NoKeyHost))
    }

    /// Whether submitting with `model` requires consulting the gate at all.
    pub fn applies_to(model: ModelTier) -> bool {
        model.requires_paid_key()
    }

    pub async fn has_capable_key(&self) -> bool {
        match self.host.has_selected_api_key() {
            Some(check) => {
                let selected = check.await;
                debug!(selected, "Host reported key selection state");
                selected
            }
            None => {
                debug!("Host has no key check, assuming the configured key is adequate");
                true
            }
        }
    }

    pub async fn request_key_selection(&self) {
        match self.host.open_select_key() {
            Some(flow) => {
                if let Err(e) = flow.await {
                    warn!(error = %e, "Key selection flow failed");
                }
            }
            None => warn!("Key selector not available in this environment."),
        }
    }
}

impl Default for KeyGate {
    fn default() -> Self {
        Self::permissive()
    }
}

impl std::fmt::Debug for KeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGate").finish_non_exhaustive()
    }
}
