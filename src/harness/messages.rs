//! Typed signal envelope crossing the mount boundary
//!
//! Inside an iframe mount these travel as postMessage payloads; the in-page
//! variant produces the same shapes through its injected handlers. Unknown
//! message tags are ignored on receipt for forward compatibility.

use serde::{Deserialize, Serialize};

/// A signal emitted by mounted stage code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HarnessMessage {
    /// The stage finished initializing
    #[serde(rename = "gameLoaded")]
    Loaded,

    /// A script error escaped the stage's init or run loop
    #[serde(rename = "gameError")]
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u64>,
    },

    /// A console log line captured from the stage
    #[serde(rename = "gameLog")]
    Log { message: String },
}

impl HarnessMessage {
    /// Parse a raw message payload. Unrecognized tags and malformed payloads
    /// yield `None` rather than an error.
    pub fn parse(data: &str) -> Option<HarnessMessage> {
        serde_json::from_str(data).ok()
    }
}

/// A message bound to the mount attempt that produced it.
///
/// Signals can arrive after their mount has been torn down; the epoch lets
/// the session discard them instead of corrupting a newer mount's state.
#[derive(Debug, Clone)]
pub struct SignalEnvelope {
    pub epoch: u64,
    pub message: HarnessMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!(
            HarnessMessage::parse(r#"{"type": "gameLoaded"}"#),
            Some(HarnessMessage::Loaded)
        );

        let error = HarnessMessage::parse(
            r#"{"type": "gameError", "error": "boom", "source": "game.js", "line": 7}"#,
        );
        assert_eq!(
            error,
            Some(HarnessMessage::Error {
                error: "boom".to_string(),
                source: Some("game.js".to_string()),
                line: Some(7),
            })
        );

        assert_eq!(
            HarnessMessage::parse(r#"{"type": "gameLog", "message": "tick"}"#),
            Some(HarnessMessage::Log {
                message: "tick".to_string()
            })
        );
    }

    #[test]
    fn test_parse_ignores_unknown_tags() {
        assert_eq!(HarnessMessage::parse(r#"{"type": "gameReady"}"#), None);
        assert_eq!(HarnessMessage::parse("not json"), None);
    }

    #[test]
    fn test_error_optional_fields_omitted() {
        let message = HarnessMessage::Error {
            error: "boom".to_string(),
            source: None,
            line: None,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains("source"));
        assert!(!json.contains("line"));
    }
}
