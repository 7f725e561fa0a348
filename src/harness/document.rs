//! Host document construction for stage mounts
//!
//! Two variants share the same shimming and signal logic: the in-page
//! fragment (markup, scoped styles and a wrapped script injected into the
//! hosting page) and the isolated iframe document (a complete HTML string for
//! `srcdoc` whose signals cross the boundary via postMessage).

use crate::core::artifact::StageArtifact;
use crate::harness::shim::RendererBinding;
use crate::harness::{GAME_CONTAINER_ID, LOADED_SIGNAL_DELAY_MS};
use regex::Regex;

/// Baseline reset prepended to every stage's styles so each mount starts from
/// the same layout assumptions.
pub const BASELINE_CSS: &str = "\
*, *::before, *::after { box-sizing: border-box; }\n\
html, body { margin: 0; padding: 0; width: 100%; height: 100%; overflow: hidden; }\n\
#game-container { position: relative; width: 100%; height: 100%; }\n\
#game-container canvas { display: block; }\n\
.harness-error-banner {\n\
  position: fixed; top: 0; left: 0; right: 0; z-index: 9999;\n\
  padding: 0.75rem 1rem; background: #b91c1c; color: #fff;\n\
  font-family: monospace; font-size: 0.85rem;\n\
}\n";

const READY_MARKER_PATTERN: &str =
    r#"DOMContentLoaded|window\.onload\s*=|addEventListener\(\s*['"]load['"]"#;

/// Whether the script already registers its own ready-event initialization
pub fn has_ready_marker(js: &str) -> bool {
    Regex::new(READY_MARKER_PATTERN)
        .map(|re| re.is_match(js))
        .unwrap_or(false)
}

/// The three injectable pieces of an in-page mount
#[derive(Debug, Clone)]
pub struct MountDocument {
    /// Markup to place inside the game container
    pub html: String,
    /// Baseline reset plus the stage's styles
    pub css: String,
    /// Shim installer (when stubbed), console.log rewire, error capture,
    /// wrapped stage script and the deferred loaded signal
    pub script: String,
}

/// Build the in-page mount pieces for an artifact
pub fn build_fragment(artifact: &StageArtifact, binding: RendererBinding) -> MountDocument {
    let mut script = String::new();

    if let Some(shim) = binding.install_script() {
        script.push_str(&shim);
    }
    script.push_str(&log_bridge_script(SignalChannel::Event));
    script.push_str(&error_capture_script(SignalChannel::Event));
    script.push_str(&wrap_stage_script(&artifact.js, SignalChannel::Event));

    MountDocument {
        html: artifact.html.clone(),
        css: format!("{}\n{}", BASELINE_CSS, artifact.css),
        script,
    }
}

/// Build a complete iframe document for an artifact.
///
/// Signals leave through postMessage with a wildcard target origin; the
/// hosted content is first-party-generated, so origin scoping buys nothing
/// and breaks the srcdoc usage pattern.
pub fn build_srcdoc(artifact: &StageArtifact, binding: RendererBinding) -> String {
    let mut script = String::new();
    if let Some(shim) = binding.install_script() {
        script.push_str(&shim);
    }
    script.push_str(&log_bridge_script(SignalChannel::PostMessage));
    script.push_str(&error_capture_script(SignalChannel::PostMessage));
    script.push_str(&wrap_stage_script(&artifact.js, SignalChannel::PostMessage));

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>\n{}\n{}\n</style>\n</head>\n<body>\n\
         <div id=\"{}\">{}</div>\n<script>\n{}\n</script>\n</body>\n</html>\n",
        BASELINE_CSS, artifact.css, GAME_CONTAINER_ID, artifact.html, script,
    )
}

/// How a mount variant delivers its signals back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalChannel {
    /// In-page: dispatch custom events on the hosting window
    Event,
    /// Iframe: postMessage to the parent with a wildcard origin
    PostMessage,
}

fn emit_loaded(channel: SignalChannel) -> &'static str {
    match channel {
        SignalChannel::Event => {
            "window.dispatchEvent(new CustomEvent('harness:signal', \
             { detail: { type: 'gameLoaded' } }));"
        }
        SignalChannel::PostMessage => "window.parent.postMessage({ type: 'gameLoaded' }, '*');",
    }
}

fn emit_error(channel: SignalChannel) -> &'static str {
    match channel {
        SignalChannel::Event => {
            "window.dispatchEvent(new CustomEvent('harness:signal', \
             { detail: { type: 'gameError', error: __msg, source: __src, line: __line } }));"
        }
        SignalChannel::PostMessage => {
            "window.parent.postMessage({ type: 'gameError', error: __msg, \
             source: __src, line: __line }, '*');"
        }
    }
}

/// Uncaught-error capture: signal the host, render a visible banner, and
/// suppress the default browser error UI. Suppression means returning true
/// from `window.onerror`; the convention is inverted relative to ordinary
/// DOM event handlers, where returning false cancels the default.
fn error_capture_script(channel: SignalChannel) -> String {
    format!(
        "window.onerror = function (message, source, lineno) {{\n\
         \x20 var __msg = String(message);\n\
         \x20 var __src = source ? String(source) : null;\n\
         \x20 var __line = lineno || null;\n\
         \x20 {}\n\
         \x20 var banner = document.createElement('div');\n\
         \x20 banner.className = 'harness-error-banner';\n\
         \x20 banner.textContent = __msg;\n\
         \x20 document.body.appendChild(banner);\n\
         \x20 return true;\n\
         }};\n",
        emit_error(channel),
    )
}

/// Reroute console.log through the signal channel so the host can show the
/// stage's log lines. The original console.log still runs afterwards.
fn log_bridge_script(channel: SignalChannel) -> String {
    let emit = match channel {
        SignalChannel::Event => {
            "window.dispatchEvent(new CustomEvent('harness:signal', \
             { detail: { type: 'gameLog', message: line } }));"
        }
        SignalChannel::PostMessage => {
            "window.parent.postMessage({ type: 'gameLog', message: line }, '*');"
        }
    };
    format!(
        "var __log = console.log;\n\
         console.log = function () {{\n\
         \x20 var line = Array.prototype.slice.call(arguments).join(' ');\n\
         \x20 {}\n\
         \x20 __log.apply(console, arguments);\n\
         }};\n",
        emit,
    )
}

/// Wrap the stage script and guarantee an initialization signal.
///
/// Self-initializing scripts (those carrying a ready-event marker) run as-is.
/// Everything else is wrapped in a synthesized DOMContentLoaded listener with
/// its own try/catch routed through the error handler. Either way a deferred
/// loaded signal fires after a short delay, and if the ready event may have
/// fired before the listener attached, it is redispatched once.
fn wrap_stage_script(js: &str, channel: SignalChannel) -> String {
    let body = if has_ready_marker(js) {
        js.to_string()
    } else {
        format!(
            "document.addEventListener('DOMContentLoaded', function () {{\n\
             \x20 try {{\n{}\n  }} catch (e) {{\n\
             \x20   window.onerror(e.message, null, null);\n\
             \x20 }}\n\
             }});\n",
            js,
        )
    };

    format!(
        "{}\n\
         if (document.readyState !== 'loading') {{\n\
         \x20 setTimeout(function () {{\n\
         \x20   document.dispatchEvent(new Event('DOMContentLoaded'));\n\
         \x20 }}, 0);\n\
         }}\n\
         setTimeout(function () {{ {} }}, {});\n",
        body,
        emit_loaded(channel),
        LOADED_SIGNAL_DELAY_MS,
    )
}
