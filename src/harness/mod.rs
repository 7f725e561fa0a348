//! Execution harness: mounts generated stage code for preview
//!
//! The harness turns a stage artifact into a host document (in-page fragment
//! or isolated iframe srcdoc), then tracks the mount's lifecycle from the
//! typed signals the document emits back. Untrusted generated code never gets
//! to crash the host: script errors become signals, and an unresponsive mount
//! is resolved by a bounded timeout.

pub mod document;
pub mod messages;
pub mod session;
pub mod shim;
pub mod state;

use std::time::Duration;

pub use document::MountDocument;
pub use messages::{HarnessMessage, SignalEnvelope};
pub use session::{MountSession, SignalSender};
pub use shim::RendererBinding;
pub use state::{MountPhase, MountState};

/// Fixed container element id every stage mounts into
pub const GAME_CONTAINER_ID: &str = "game-container";

/// Default bound on how long a mount may stay in the loading phase
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Delay before the synthesized loaded signal fires, in milliseconds
pub const LOADED_SIGNAL_DELAY_MS: u64 = 100;

/// What to do when the load timeout expires without a loaded signal.
///
/// Lenient treats the silent mount as a success (many generated games render
/// fine without ever signaling); strict reports it as an error. Lenient is
/// the default because availability beats strictness for previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountPolicy {
    Strict,
    #[default]
    Lenient,
}
