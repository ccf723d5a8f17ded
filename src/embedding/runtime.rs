//! One-shot initialization of the ONNX Runtime environment.
//!
//! The environment is process-global inside `ort`; [`TensorRuntime`] makes the
//! initialization explicit and injectable. Concurrent first use initializes exactly
//! once, and the outcome (including a failure) is kept for later callers.

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use ort::session::Session;

static SHARED: OnceLock<Arc<TensorRuntime>> = OnceLock::new();

/// Handle to the tensor-execution environment used by [`super::local::LocalEmbedder`].
#[derive(Debug)]
pub struct TensorRuntime {
    name: String,
    initialized: OnceLock<std::result::Result<(), String>>,
}

impl TensorRuntime {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initialized: OnceLock::new(),
        }
    }

    /// The process-wide runtime, created lazily on first call.
    pub fn shared() -> Arc<TensorRuntime> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(TensorRuntime::new("mnemos"))))
    }

    /// Bring up the ONNX Runtime environment if this handle has not tried yet.
    ///
    /// Building a session builder forces `ort` to create its global environment.
    pub fn ensure_initialized(&self) -> Result<()> {
        let outcome = self.initialized.get_or_init(|| match Session::builder() {
            Ok(_) => {
                tracing::info!(name = %self.name, "ONNX Runtime environment initialized");
                Ok(())
            }
            Err(e) => {
                tracing::error!(name = %self.name, error = %e, "ONNX Runtime initialization failed");
                Err(e.to_string())
            }
        });
        outcome
            .clone()
            .map_err(|e| anyhow::anyhow!("ONNX Runtime initialization failed: {e}"))
    }

    /// True once initialization has succeeded.
    pub fn is_initialized(&self) -> bool {
        matches!(self.initialized.get(), Some(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_is_singleton() {
        let a = TensorRuntime::shared();
        let b = TensorRuntime::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_fresh_runtime_is_lazy() {
        let runtime = TensorRuntime::new("test");
        assert!(!runtime.is_initialized());
    }

    #[test]
    #[ignore] // Requires the ONNX Runtime shared library
    fn test_initialization_outcome_is_sticky() {
        let runtime = TensorRuntime::new("test");
        let first = runtime.ensure_initialized().is_ok();
        let second = runtime.ensure_initialized().is_ok();
        assert_eq!(first, second);
        assert_eq!(runtime.is_initialized(), first);
    }
}
