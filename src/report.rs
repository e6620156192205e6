//! CI-facing outputs: step outputs and the build status file.
//!
//! The status file keeps the layout the downstream workflow reads: empty
//! strings for absent fields and `updated_at` as a UTC timestamp such as
//! `Sat Oct 17 09:30:00 UTC 2026`.

use std::path::Path;

use chrono::Utc;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::runtime::Runtime;

/// Environment variable naming the CI step-output file.
pub const OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Publishes `key=value` as a CI step output.
///
/// Appends to the file named by `GITHUB_OUTPUT` when set, otherwise prints
/// the pair to stdout.
pub fn set_output<R: Runtime>(runtime: &R, key: &str, value: &str) -> Result<()> {
    match runtime.env_var(OUTPUT_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Writing output {} to {}", key, path);
            runtime
                .append(Path::new(&path), format!("{}={}\n", key, value).as_bytes())
                .with_context(|| format!("Failed to write CI output {}", key))
        }
        _ => {
            println!("[Output] {}={}", key, value);
            Ok(())
        }
    }
}

const TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S UTC %Y";

/// Outcome of the last build, persisted for the next CI run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub success: bool,
    #[serde(default)]
    pub failed_version: String,
    #[serde(default)]
    pub error_message: String,
    pub updated_at: String,
}

impl BuildStatus {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            failed_version: String::new(),
            error_message: String::new(),
            updated_at: timestamp(),
        }
    }

    pub fn failed(version: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            failed_version: version.unwrap_or_default().to_string(),
            error_message: message.into(),
            updated_at: timestamp(),
        }
    }
}

fn timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Writes `status` as pretty JSON to `path`, creating parent directories.
pub fn write_status<R: Runtime>(runtime: &R, path: &Path, status: &BuildStatus) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        runtime.create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(status)?;
    runtime
        .write(path, json.as_bytes())
        .with_context(|| format!("Failed to write build status to {}", path.display()))
}
