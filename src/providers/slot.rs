//! One-shot readiness handle for the chat back-end.
//!
//! The chat back-end may finish initialising after the first upload has
//! already started. [`ChatSlot`] is handed to whoever needs the capability;
//! [`ChatInstaller`] is kept by whoever builds it and fires exactly once.

use std::sync::Arc;
use tokio::sync::watch;

use super::ChatCapability;
use crate::error::PipelineError;

type Shared = Option<Arc<dyn ChatCapability>>;

/// Write side of a [`ChatSlot`]. Dropping it without installing marks the
/// capability as permanently unavailable.
pub struct ChatInstaller {
    tx: watch::Sender<Shared>,
}

impl ChatInstaller {
    pub fn install(self, capability: Arc<dyn ChatCapability>) {
        log::info!("Chat capability '{}' is ready", capability.provider_name());
        self.tx.send_replace(Some(capability));
    }
}

/// Read side: cloneable, cheap, and shareable across uploads.
#[derive(Clone)]
pub struct ChatSlot {
    rx: watch::Receiver<Shared>,
}

impl ChatSlot {
    /// An empty slot and the installer that fills it.
    pub fn pending() -> (ChatInstaller, ChatSlot) {
        let (tx, rx) = watch::channel(None);
        (ChatInstaller { tx }, ChatSlot { rx })
    }

    /// A slot that is ready from the start.
    pub fn installed(capability: Arc<dyn ChatCapability>) -> ChatSlot {
        let (installer, slot) = Self::pending();
        installer.install(capability);
        slot
    }

    /// The capability if it has been installed.
    pub fn try_get(&self) -> Result<Arc<dyn ChatCapability>, PipelineError> {
        self.rx
            .borrow()
            .clone()
            .ok_or(PipelineError::CapabilityUnavailable)
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait, without a deadline, until the capability is installed.
    ///
    /// Fails with `CapabilityUnavailable` only if the installer was dropped
    /// without ever installing.
    pub async fn ready(&self) -> Result<Arc<dyn ChatCapability>, PipelineError> {
        let mut rx = self.rx.clone();
        let installed = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| PipelineError::CapabilityUnavailable)?;
        let capability = installed.clone();
        capability.ok_or(PipelineError::CapabilityUnavailable)
    }
}
