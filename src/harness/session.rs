//! Mount session: signal routing, epoch guarding and load waiting
//!
//! One session owns one mount at a time. Each mount attempt gets a fresh
//! epoch; signals stamped with an older epoch are discarded so a torn-down
//! mount can never flip a newer mount's state. Waiting for the loaded signal
//! is bounded by a timeout whose expiry is interpreted by the configured
//! policy.

use crate::core::artifact::StageArtifact;
use crate::harness::document::{self, MountDocument};
use crate::harness::messages::{HarnessMessage, SignalEnvelope};
use crate::harness::shim::RendererBinding;
use crate::harness::state::{MountPhase, MountState};
use crate::harness::MountPolicy;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Handle given to whatever hosts the mounted document; sends signals stamped
/// with the epoch of the mount that created it.
#[derive(Debug, Clone)]
pub struct SignalSender {
    epoch: u64,
    tx: mpsc::UnboundedSender<SignalEnvelope>,
}

impl SignalSender {
    pub fn send(&self, message: HarnessMessage) {
        // A dropped session makes the send fail; stale signals are no-ops
        let _ = self.tx.send(SignalEnvelope {
            epoch: self.epoch,
            message,
        });
    }

    /// Forward a raw message payload, dropping unrecognized tags
    pub fn send_raw(&self, data: &str) {
        if let Some(message) = HarnessMessage::parse(data) {
            self.send(message);
        }
    }
}

/// Drives the mount lifecycle for one preview surface
pub struct MountSession {
    policy: MountPolicy,
    epoch: u64,
    state: MountState,
    tx: mpsc::UnboundedSender<SignalEnvelope>,
    rx: mpsc::UnboundedReceiver<SignalEnvelope>,
}

impl MountSession {
    pub fn new(policy: MountPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MountSession {
            policy,
            epoch: 0,
            state: MountState::default(),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &MountState {
        &self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Build the in-page mount for an artifact and enter the loading phase.
    ///
    /// Implicitly cleans up any previous mount first; only one mount is ever
    /// active per session.
    pub fn mount(&mut self, artifact: &StageArtifact, binding: RendererBinding) -> (MountDocument, SignalSender) {
        self.cleanup();
        self.state = MountState::loading();
        debug!("Mount epoch {} for artifact '{}'", self.epoch, artifact.id);
        (document::build_fragment(artifact, binding), self.sender())
    }

    /// Build the iframe document for an artifact and enter the loading phase
    pub fn mount_iframe(&mut self, artifact: &StageArtifact, binding: RendererBinding) -> (String, SignalSender) {
        self.cleanup();
        self.state = MountState::loading();
        debug!("Iframe mount epoch {} for artifact '{}'", self.epoch, artifact.id);
        (document::build_srcdoc(artifact, binding), self.sender())
    }

    /// Tear down the current mount: bump the epoch so pending signals from it
    /// are discarded, drain anything already queued, and reset state. Safe to
    /// call repeatedly.
    pub fn cleanup(&mut self) {
        self.epoch += 1;
        while self.rx.try_recv().is_ok() {}
        self.state = MountState::default();
    }

    fn sender(&self) -> SignalSender {
        SignalSender {
            epoch: self.epoch,
            tx: self.tx.clone(),
        }
    }

    /// Apply one signal envelope to the mount state
    pub fn handle_message(&mut self, envelope: SignalEnvelope) {
        if envelope.epoch != self.epoch {
            debug!(
                "Discarding stale signal from epoch {} (current {})",
                envelope.epoch, self.epoch
            );
            return;
        }
        match envelope.message {
            HarnessMessage::Loaded => self.state.mark_loaded(),
            HarnessMessage::Error { error, source, line } => {
                let detail = match (source, line) {
                    (Some(source), Some(line)) => format!("{} ({}:{})", error, source, line),
                    (Some(source), None) => format!("{} ({})", error, source),
                    _ => error,
                };
                self.state.record_error(detail);
            }
            HarnessMessage::Log { message } => self.state.record_log(message),
        }
    }

    /// Wait for the mount to leave the loading phase, bounded by `timeout`.
    ///
    /// On expiry the lenient policy treats the silent mount as loaded unless
    /// an error was captured first; the strict policy reports it as an error.
    pub async fn wait_loaded(&mut self, timeout: Duration) -> MountPhase {
        let deadline = Instant::now() + timeout;
        while !self.state.is_terminal() {
            match timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(envelope)) => self.handle_message(envelope),
                // Channel closed or deadline hit: fall through to policy
                Ok(None) | Err(_) => break,
            }
        }

        if !self.state.is_terminal() {
            match self.policy {
                MountPolicy::Lenient => {
                    warn!("No loaded signal within {:?}, treating mount as loaded", timeout);
                    self.state.mark_loaded();
                }
                MountPolicy::Strict => {
                    self.state
                        .record_error(format!("No loaded signal within {:?}", timeout));
                }
            }
        }
        self.state.phase
    }

    /// Manual override: the user asserts the stage is visible and playable
    pub fn force_show(&mut self) {
        self.state.error = None;
        self.state.phase = MountPhase::Loaded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::GAME_CONTAINER_ID;

    fn artifact() -> StageArtifact {
        StageArtifact {
            id: "core-concept-1".to_string(),
            title: "Core Concept".to_string(),
            description: String::new(),
            html: format!("<div id=\"{}\"></div>", GAME_CONTAINER_ID),
            css: String::new(),
            js: "let score = 0;".to_string(),
            md: None,
        }
    }

    #[tokio::test]
    async fn test_loaded_signal_resolves_mount() {
        let mut session = MountSession::new(MountPolicy::Strict);
        let (_doc, sender) = session.mount(&artifact(), RendererBinding::Stub);

        sender.send(HarnessMessage::Log {
            message: "booting".to_string(),
        });
        sender.send(HarnessMessage::Loaded);

        let phase = session.wait_loaded(Duration::from_secs(5)).await;
        assert_eq!(phase, MountPhase::Loaded);
        assert_eq!(session.state().logs, vec!["booting"]);
    }

    #[tokio::test]
    async fn test_sync_throw_moves_to_error() {
        let mut session = MountSession::new(MountPolicy::Lenient);
        let (_doc, sender) = session.mount(&artifact(), RendererBinding::Stub);

        sender.send_raw(r#"{"type": "gameError", "error": "boom", "line": 3}"#);

        let phase = session.wait_loaded(Duration::from_secs(5)).await;
        assert_eq!(phase, MountPhase::Error);
        assert!(session.state().error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lenient_timeout_is_soft_success() {
        let mut session = MountSession::new(MountPolicy::Lenient);
        let (_doc, _sender) = session.mount(&artifact(), RendererBinding::Stub);

        let phase = session.wait_loaded(Duration::from_secs(10)).await;
        assert_eq!(phase, MountPhase::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_timeout_is_error() {
        let mut session = MountSession::new(MountPolicy::Strict);
        let (_doc, _sender) = session.mount(&artifact(), RendererBinding::Stub);

        let phase = session.wait_loaded(Duration::from_secs(10)).await;
        assert_eq!(phase, MountPhase::Error);
    }

    #[tokio::test]
    async fn test_stale_epoch_signals_are_discarded() {
        let mut session = MountSession::new(MountPolicy::Strict);
        let (_doc, old_sender) = session.mount(&artifact(), RendererBinding::Stub);

        let (_doc, new_sender) = session.mount(&artifact(), RendererBinding::Stub);
        old_sender.send(HarnessMessage::Error {
            error: "stale".to_string(),
            source: None,
            line: None,
        });
        new_sender.send(HarnessMessage::Loaded);

        let phase = session.wait_loaded(Duration::from_secs(5)).await;
        assert_eq!(phase, MountPhase::Loaded);
        assert!(session.state().error.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_then_mount_is_idempotent() {
        let mut session = MountSession::new(MountPolicy::Lenient);
        session.cleanup();
        session.cleanup();
        let (_doc, sender) = session.mount(&artifact(), RendererBinding::Stub);
        sender.send(HarnessMessage::Loaded);

        let phase = session.wait_loaded(Duration::from_secs(5)).await;
        assert_eq!(phase, MountPhase::Loaded);
        assert!(session.state().logs.is_empty());
    }

    #[tokio::test]
    async fn test_force_show_overrides_pending_state() {
        let mut session = MountSession::new(MountPolicy::Strict);
        let (_doc, _sender) = session.mount(&artifact(), RendererBinding::Stub);

        session.force_show();
        assert_eq!(session.state().phase, MountPhase::Loaded);
    }
}
