//! Mount lifecycle tests across the harness boundary

use stageforge::harness::{
    HarnessMessage, MountPhase, MountPolicy, MountSession, RendererBinding, GAME_CONTAINER_ID,
};
use stageforge::StageArtifact;
use std::time::Duration;

fn artifact(js: &str) -> StageArtifact {
    StageArtifact {
        id: "core-concept-1".to_string(),
        title: "Core Concept".to_string(),
        description: "Minimal loop".to_string(),
        html: "<canvas id=\"play\"></canvas>".to_string(),
        css: "#play { background: #000; }".to_string(),
        js: js.to_string(),
        md: None,
    }
}

#[tokio::test]
async fn test_script_error_reaches_error_state_with_container_intact() {
    let mut session = MountSession::new(MountPolicy::Lenient);
    let (doc, signals) = session.mount(&artifact("boom("), RendererBinding::Stub);

    // What the page would report for a synchronous throw in the init block
    signals.send_raw(
        r#"{"type": "gameError", "error": "SyntaxError: unexpected end of input", "line": 1}"#,
    );

    let phase = session.wait_loaded(Duration::from_secs(5)).await;
    assert_eq!(phase, MountPhase::Error);
    assert!(session
        .state()
        .error
        .as_deref()
        .unwrap()
        .contains("SyntaxError"));
    // The markup stays available for inspection
    assert!(doc.html.contains("<canvas"));
}

#[tokio::test]
async fn test_repeated_cleanup_mount_leaves_single_active_mount() {
    let mut session = MountSession::new(MountPolicy::Strict);

    session.cleanup();
    let (first_doc, first_signals) = session.mount(&artifact("let a = 1;"), RendererBinding::Stub);
    session.cleanup();
    let (second_doc, second_signals) =
        session.mount(&artifact("let a = 1;"), RendererBinding::Stub);

    // Both documents carry exactly one error handler install and one wrapped
    // script; nothing accumulates across the re-mount.
    for doc in [&first_doc, &second_doc] {
        assert_eq!(doc.script.matches("window.onerror = function").count(), 1);
        assert_eq!(doc.script.matches("console.log = function").count(), 1);
        assert_eq!(doc.css.matches("box-sizing").count(), 1);
    }

    // Only the second mount's signals count
    first_signals.send(HarnessMessage::Error {
        error: "stale".to_string(),
        source: None,
        line: None,
    });
    second_signals.send(HarnessMessage::Loaded);

    let phase = session.wait_loaded(Duration::from_secs(5)).await;
    assert_eq!(phase, MountPhase::Loaded);
    assert!(session.state().error.is_none());
}

#[tokio::test]
async fn test_iframe_mount_consumes_postmessage_payloads() {
    let mut session = MountSession::new(MountPolicy::Strict);
    let (srcdoc, signals) = session.mount_iframe(&artifact("let a = 1;"), RendererBinding::Stub);

    assert!(srcdoc.contains("<!DOCTYPE html>"));
    assert!(srcdoc.contains(GAME_CONTAINER_ID));

    // Payloads exactly as the bridge posts them
    signals.send_raw(r#"{"type": "gameLog", "message": "tick 1"}"#);
    signals.send_raw(r#"{"type": "futureTag", "whatever": true}"#);
    signals.send_raw(r#"{"type": "gameLoaded"}"#);

    let phase = session.wait_loaded(Duration::from_secs(5)).await;
    assert_eq!(phase, MountPhase::Loaded);
    // Unknown tag was ignored, the log line kept
    assert_eq!(session.state().logs, vec!["tick 1"]);
}

#[tokio::test(start_paused = true)]
async fn test_policies_disagree_on_silent_mounts() {
    for (policy, expected) in [
        (MountPolicy::Lenient, MountPhase::Loaded),
        (MountPolicy::Strict, MountPhase::Error),
    ] {
        let mut session = MountSession::new(policy);
        let (_doc, _signals) = session.mount(&artifact("let a = 1;"), RendererBinding::Stub);
        let phase = session.wait_loaded(Duration::from_secs(10)).await;
        assert_eq!(phase, expected, "policy {:?}", policy);
    }
}

#[tokio::test]
async fn test_error_before_timeout_wins_under_lenient_policy() {
    let mut session = MountSession::new(MountPolicy::Lenient);
    let (_doc, signals) = session.mount(&artifact("boom("), RendererBinding::Stub);

    signals.send(HarnessMessage::Error {
        error: "boom".to_string(),
        source: Some("game.js".to_string()),
        line: Some(3),
    });
    signals.send(HarnessMessage::Loaded);

    let phase = session.wait_loaded(Duration::from_secs(5)).await;
    assert_eq!(phase, MountPhase::Error);
    assert!(session.state().error.as_deref().unwrap().contains("game.js:3"));
}
