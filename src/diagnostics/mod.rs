//! Environment diagnostics for the debug panel
//!
//! Pure functions over a reported environment snapshot. Every probe is
//! independently fault tolerant: a missing or malformed piece of the snapshot
//! lands in the report's warnings or errors instead of aborting the report.

use serde::{Deserialize, Serialize};

/// Container smaller than this on either axis is flagged as unusable
const MIN_CONTAINER_DIMENSION: f64 = 1.0;

/// Raw facts reported by the preview surface about its environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// WebGL context could be created on a disposable canvas
    pub webgl: bool,
    /// WebGL2 context could be created
    pub webgl2: bool,
    /// Storage write-then-delete probe succeeded
    pub storage_available: bool,
    pub cookies_enabled: bool,
    #[serde(default)]
    pub platform: String,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// 3D-library global facts, absent when the library is not loaded
    #[serde(default)]
    pub renderer_library: Option<RendererLibraryInfo>,

    /// Storage content facts, absent when storage is unavailable
    #[serde(default)]
    pub storage: Option<StorageSnapshot>,

    /// Mount container geometry, absent when the container does not exist
    #[serde(default)]
    pub container: Option<ContainerSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RendererLibraryInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub renderer_string: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub key_count: usize,
    pub total_bytes: usize,
    /// Keys matching the game-artifact naming conventions
    pub artifact_key_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub left: f64,
    pub visible: bool,
    #[serde(default)]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub position: String,
}

/// Structured diagnostics report for the debug panel
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticsReport {
    pub webgl: bool,
    pub webgl2: bool,
    pub storage_available: bool,
    pub cookies_enabled: bool,
    pub platform: String,
    pub viewport: (u32, u32),
    pub renderer_library: Option<RendererLibraryInfo>,
    pub storage: Option<StorageSnapshot>,
    pub container: Option<ContainerSnapshot>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Pre-flight readiness verdict
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessCheck {
    pub ready: bool,
    pub issues: Vec<String>,
}

/// Build the full diagnostics report from a snapshot
pub fn run_diagnostics(snapshot: &EnvironmentSnapshot) -> DiagnosticsReport {
    let mut report = DiagnosticsReport {
        webgl: snapshot.webgl,
        webgl2: snapshot.webgl2,
        storage_available: snapshot.storage_available,
        cookies_enabled: snapshot.cookies_enabled,
        platform: snapshot.platform.clone(),
        viewport: (snapshot.viewport_width, snapshot.viewport_height),
        renderer_library: snapshot.renderer_library.clone(),
        storage: snapshot.storage.clone(),
        container: snapshot.container.clone(),
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    if !snapshot.webgl {
        report.warnings.push("WebGL is not available".to_string());
    }
    if !snapshot.storage_available {
        report
            .warnings
            .push("Storage is unavailable; progress will not persist".to_string());
    }

    match &snapshot.renderer_library {
        Some(info) if info.version.is_none() => {
            report
                .warnings
                .push("3D library present but its version could not be read".to_string());
        }
        Some(_) => {}
        None => {
            report
                .warnings
                .push("3D library not loaded; stages will use the stand-in".to_string());
        }
    }

    match &snapshot.container {
        Some(container) => {
            if container.width < MIN_CONTAINER_DIMENSION
                || container.height < MIN_CONTAINER_DIMENSION
            {
                report.warnings.push(format!(
                    "Game container has zero size ({}x{})",
                    container.width, container.height
                ));
            }
            let viewport_w = snapshot.viewport_width as f64;
            let viewport_h = snapshot.viewport_height as f64;
            if container.left + container.width <= 0.0
                || container.top + container.height <= 0.0
                || container.left >= viewport_w
                || container.top >= viewport_h
            {
                report
                    .warnings
                    .push("Game container is positioned outside the viewport".to_string());
            }
            if !container.visible {
                report.warnings.push("Game container is hidden".to_string());
            }
        }
        None => {
            report.errors.push("Game container not found".to_string());
        }
    }

    report
}

/// Stricter pre-flight subset checked before committing to a mount attempt
pub fn is_environment_ready(snapshot: &EnvironmentSnapshot) -> ReadinessCheck {
    let mut issues = Vec::new();

    match &snapshot.container {
        None => issues.push("Game container not found".to_string()),
        Some(container) => {
            if container.width < MIN_CONTAINER_DIMENSION
                || container.height < MIN_CONTAINER_DIMENSION
            {
                issues.push("Game container has zero size".to_string());
            }
            if !container.visible {
                issues.push("Game container is hidden".to_string());
            }
        }
    }
    if snapshot.renderer_library.is_none() {
        issues.push("3D library not loaded".to_string());
    }
    if !snapshot.webgl {
        issues.push("WebGL is not available".to_string());
    }

    ReadinessCheck {
        ready: issues.is_empty(),
        issues,
    }
}
