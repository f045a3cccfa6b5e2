//! Logging settings from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Filter directive used when neither `RUST_LOG` nor `-v` is given
    pub level: Option<String>,
    /// Also write JSON log lines to this file (rotated daily)
    pub file: Option<PathBuf>,
}
