//! Per-mount lifecycle state

/// Lifecycle phase of one mount attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// State owned by exactly one mount attempt, reset on every re-mount
#[derive(Debug, Clone, Default)]
pub struct MountState {
    pub phase: MountPhase,
    pub logs: Vec<String>,
    pub error: Option<String>,
}

impl MountState {
    pub fn loading() -> Self {
        MountState {
            phase: MountPhase::Loading,
            logs: Vec::new(),
            error: None,
        }
    }

    pub fn record_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// An error is terminal and wins over a later loaded signal
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.logs.push(format!("error: {}", message));
        self.error = Some(message);
        self.phase = MountPhase::Error;
    }

    pub fn mark_loaded(&mut self) {
        if self.phase != MountPhase::Error {
            self.phase = MountPhase::Loaded;
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, MountPhase::Loaded | MountPhase::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wins_over_loaded() {
        let mut state = MountState::loading();
        state.record_error("boom");
        state.mark_loaded();
        assert_eq!(state.phase, MountPhase::Error);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_logs_accumulate_in_order() {
        let mut state = MountState::loading();
        state.record_log("one");
        state.record_error("boom");
        assert_eq!(state.logs, vec!["one", "error: boom"]);
    }
}
