//! Resolves external tool binaries.
//!
//! Lookup order: configured path, environment variable, `PATH`.

use scenecut_core::settings::{ENV_FFMPEG, ENV_FFPROBE};
use scenecut_core::Settings;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Locates one external binary.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    binary: &'static str,
    configured: Option<PathBuf>,
    env_var: Option<&'static str>,
}

impl ToolLocator {
    /// Locator for an arbitrary binary name, searched on `PATH` only.
    pub fn new(binary: &'static str) -> Self {
        Self {
            binary,
            configured: None,
            env_var: None,
        }
    }

    /// Locator for ffmpeg honoring `settings.ffmpeg_path` and `SCENECUT_FFMPEG`.
    pub fn ffmpeg(settings: &Settings) -> Self {
        Self::new("ffmpeg")
            .with_configured(settings.ffmpeg_path.clone())
            .with_env(ENV_FFMPEG)
    }

    /// Locator for ffprobe honoring `settings.ffprobe_path` and `SCENECUT_FFPROBE`.
    pub fn ffprobe(settings: &Settings) -> Self {
        Self::new("ffprobe")
            .with_configured(settings.ffprobe_path.clone())
            .with_env(ENV_FFPROBE)
    }

    pub fn with_configured(mut self, path: Option<PathBuf>) -> Self {
        self.configured = path;
        self
    }

    pub fn with_env(mut self, var: &'static str) -> Self {
        self.env_var = Some(var);
        self
    }

    /// Resolve the binary, or `None` when it cannot be found anywhere.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.configured {
            if path.is_file() {
                debug!(tool = self.binary, path = %path.display(), "Using configured tool");
                return Some(path.clone());
            }
            warn!(tool = self.binary, path = %path.display(), "Configured tool path does not exist");
        }

        if let Some(var) = self.env_var {
            if let Some(path) = std::env::var_os(var).map(PathBuf::from) {
                if path.is_file() {
                    debug!(tool = self.binary, path = %path.display(), "Using tool from environment");
                    return Some(path);
                }
                warn!(tool = self.binary, var, path = %path.display(), "Tool from environment does not exist");
            }
        }

        match which::which(self.binary) {
            Ok(path) => {
                debug!(tool = self.binary, path = %path.display(), "Found tool on PATH");
                Some(path)
            }
            Err(_) => None,
        }
    }
}
