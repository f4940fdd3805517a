//! Runtime configuration loaded from `marquee.toml`.
//!
//! Every field has a default, so a missing or partial file is fine. A file
//! that cannot be parsed is reported and replaced by the defaults rather than
//! stopping the show.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::eval::EvaluatorKind;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "marquee.toml";
pub const DEFAULT_SCRIPT: &str = "script.txt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Display width in pixels.
    pub width: u32,
    /// Display height in pixels.
    pub height: u32,
    /// Frames per second the runner aims for.
    pub framerate: u32,
    /// Rotate the display a quarter turn (portrait screens mounted sideways).
    pub rotate: bool,
    /// Folder the script path is relative to.
    pub dir: PathBuf,
    pub script: PathBuf,
    pub evaluator: EvaluatorKind,
    /// Seed for the random built-ins. Random each run when unset.
    pub seed: Option<u64>,
    /// Stop after this many frames. Runs until `exit` when unset.
    pub max_frames: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            framerate: 30,
            rotate: false,
            dir: PathBuf::from("."),
            script: PathBuf::from(DEFAULT_SCRIPT),
            evaluator: EvaluatorKind::Restricted,
            seed: None,
            max_frames: None,
        }
    }
}

impl RuntimeConfig {
    pub fn script_path(&self) -> PathBuf {
        self.dir.join(&self.script)
    }

    /// Width and height as commands and `$WIDTH`/`$HEIGHT` see them.
    pub fn display_size(&self) -> (u32, u32) {
        if self.rotate {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Apply `MARQUEE_SCRIPT` and `MARQUEE_DIR` overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(env::var("MARQUEE_SCRIPT").ok(), env::var("MARQUEE_DIR").ok())
    }

    fn with_overrides(mut self, script: Option<String>, dir: Option<String>) -> Self {
        if let Some(script) = script.filter(|s| !s.is_empty()) {
            self.script = PathBuf::from(script);
        }
        if let Some(dir) = dir.filter(|d| !d.is_empty()) {
            self.dir = PathBuf::from(dir);
        }
        self
    }
}

/// Load configuration from `path`, falling back to defaults on any problem.
pub fn load_config(path: &Path) -> RuntimeConfig {
    if !path.exists() {
        info!("no config file at '{}', using defaults", path.display());
        return RuntimeConfig::default();
    }
    match try_load_config(path) {
        Ok(config) => {
            info!("loaded runtime config from '{}'", path.display());
            config
        },
        Err(e) => {
            warn!("failed to load config from '{}': {e:#}; using defaults", path.display());
            RuntimeConfig::default()
        },
    }
}

fn try_load_config(path: &Path) -> Result<RuntimeConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("reading config file '{}'", path.display()))?;
    let config: RuntimeConfig =
        toml::from_str(&text).with_context(|| format!("parsing config file '{}'", path.display()))?;
    Ok(config)
}
