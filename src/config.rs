//! Engine configuration
//!
//! Defaults can be overridden by environment variables, which in turn can be
//! overridden by CLI flags:
//!
//! - `VEDA_STEP_LIMIT` - node visits allowed per run
//! - `VEDA_OUTPUT_DIR` - base directory for run outputs
//! - `OPENAI_API_KEY` / `OPENAI_BASE_URL` - consumed by the OpenAI backend

use std::path::PathBuf;

use tracing::warn;

use crate::executor::DEFAULT_STEP_LIMIT;

pub const DEFAULT_OUTPUT_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub step_limit: u32,
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied. A malformed
    /// `VEDA_STEP_LIMIT` is ignored with a warning rather than failing
    /// startup.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("VEDA_STEP_LIMIT") {
            match raw.parse::<u32>() {
                Ok(limit) if limit > 0 => config.step_limit = limit,
                _ => warn!(%raw, "ignoring invalid VEDA_STEP_LIMIT"),
            }
        }
        if let Ok(dir) = std::env::var("VEDA_OUTPUT_DIR") {
            if !dir.is_empty() {
                config.output_dir = PathBuf::from(dir);
            }
        }
        config
    }
}
