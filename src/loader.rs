//! Startup-time model loading.
//!
//! Invoked exactly once at boot; the result (or failure) fixes the engine
//! variant for the lifetime of the process. A native inference backend links
//! in here by returning its [`ChatRuntime`] implementation; this build does
//! not bundle one, so loading reports a startup error and the caller falls
//! back to mock mode rather than refusing to start.

use std::path::Path;

use tracing::info;

use crate::config::RuntimeOptions;
use crate::engine::ChatRuntime;
use crate::error::{GatewayError, Result};

pub fn load(path: &Path, options: &RuntimeOptions) -> Result<Box<dyn ChatRuntime>> {
    if !path.exists() {
        return Err(GatewayError::Startup(format!(
            "model path does not exist: {}",
            path.display()
        )));
    }

    info!(
        "loading model from {} (gpu_layers={}, context_window={})",
        path.display(),
        options.gpu_layers,
        options.context_window
    );

    Err(GatewayError::Startup(
        "no inference backend linked into this build".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_a_startup_error() {
        let options = RuntimeOptions {
            gpu_layers: -1,
            context_window: 2048,
        };
        let err = load(Path::new("/nonexistent/model.gguf"), &options).err().unwrap();
        assert!(matches!(err, GatewayError::Startup(_)));
    }
}
