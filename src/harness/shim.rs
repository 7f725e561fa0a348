//! Optional 3D-library binding for mounted stages
//!
//! Generated code may assume a THREE-style global. When the real library is
//! available the mount delegates to it; otherwise a no-op stand-in covering
//! the factory surface the generated code is permitted to assume is installed
//! first, so naive calls do not throw.

/// Factory and helper names the stand-in must expose
pub const SHIM_SURFACE: &[&str] = &[
    "Scene",
    "PerspectiveCamera",
    "OrthographicCamera",
    "WebGLRenderer",
    "BoxGeometry",
    "SphereGeometry",
    "PlaneGeometry",
    "MeshBasicMaterial",
    "MeshStandardMaterial",
    "Mesh",
    "Group",
    "AmbientLight",
    "DirectionalLight",
    "Vector2",
    "Vector3",
    "Clock",
];

/// How the mount satisfies a stage's 3D-library references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererBinding {
    /// The real library global is present; use it untouched
    Real,
    /// Install the no-op stand-in before the stage script runs
    Stub,
}

impl RendererBinding {
    pub fn for_availability(real_available: bool) -> Self {
        if real_available {
            RendererBinding::Real
        } else {
            RendererBinding::Stub
        }
    }

    /// Script installing the stand-in, or `None` when the real library is used
    pub fn install_script(&self) -> Option<String> {
        match self {
            RendererBinding::Real => None,
            RendererBinding::Stub => Some(stub_script()),
        }
    }
}

/// Emit the stand-in installer.
///
/// Every surface name becomes a constructor returning an object whose
/// property reads yield chainable no-ops, so arbitrary method chains on the
/// result are safe. The renderer's `domElement` is a real canvas so that
/// append calls in generated code still work.
fn stub_script() -> String {
    let mut script = String::from(
        "if (typeof THREE === 'undefined') {\n\
         \x20 var __noop = function () { return __shape(); };\n\
         \x20 var __shape = function () {\n\
         \x20   return new Proxy({ set: __noop, copy: __noop, add: __noop }, {\n\
         \x20     get: function (target, prop) {\n\
         \x20       if (prop === 'domElement') { return document.createElement('canvas'); }\n\
         \x20       if (prop in target) { return target[prop]; }\n\
         \x20       return __noop;\n\
         \x20     }\n\
         \x20   });\n\
         \x20 };\n\
         \x20 window.THREE = {};\n",
    );
    for name in SHIM_SURFACE {
        script.push_str(&format!(
            "  window.THREE.{} = function () {{ return __shape(); }};\n",
            name
        ));
    }
    script.push_str("}\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_selection() {
        assert_eq!(RendererBinding::for_availability(true), RendererBinding::Real);
        assert_eq!(RendererBinding::for_availability(false), RendererBinding::Stub);
        assert!(RendererBinding::Real.install_script().is_none());
    }

    #[test]
    fn test_stub_covers_declared_surface() {
        let script = RendererBinding::Stub.install_script().unwrap();
        for name in SHIM_SURFACE {
            assert!(
                script.contains(&format!("window.THREE.{}", name)),
                "missing {}",
                name
            );
        }
        // Guarded install: never clobbers a real library
        assert!(script.starts_with("if (typeof THREE === 'undefined')"));
    }
}
