//! Tracked package configuration.
//!
//! Each tracked app lives in `<apps_dir>/<id>/app.json`:
//!
//! ```json
//! {
//!   "id": "bit",
//!   "name": "Bit",
//!   "package_name": "com.bnhp.payments.paymentsapp",
//!   "source": "apkmirror",
//!   "version_file": "apps/bit/version.txt"
//! }
//! ```

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Name of the per-app configuration file.
pub const CONFIG_FILE: &str = "app.json";

/// Immutable descriptor of one tracked package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default)]
    pub id: String,
    /// Display name used in log lines.
    #[serde(default)]
    pub name: String,
    /// Android package id, the lookup key for catalog sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// `owner/repo`, the lookup key for the release-API source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Source name; unknown or absent falls back to the default source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub version_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apkpure_file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apkpure_version: Option<String>,
    /// Asset suffix picked from a release listing (default `.apk`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_extension: Option<String>,
}

impl PackageConfig {
    pub fn new(id: impl Into<String>, version_file: impl Into<PathBuf>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version_file: version_file.into(),
            ..Default::default()
        }
    }

    pub fn package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }

    pub fn repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Parses an `app.json` document. Missing `id`/`name` fall back to `id_hint`.
    pub fn from_json(content: &str, id_hint: &str) -> Result<Self> {
        let mut config: PackageConfig =
            serde_json::from_str(content).context("Failed to parse app config")?;
        if config.id.is_empty() {
            config.id = id_hint.to_string();
        }
        if config.name.is_empty() {
            config.name = config.id.clone();
        }
        Ok(config)
    }
}

/// Loads `<apps_dir>/<app_id>/app.json`.
#[tracing::instrument(skip(runtime))]
pub fn load_app_config<R: Runtime>(
    runtime: &R,
    apps_dir: &Path,
    app_id: &str,
) -> Result<PackageConfig> {
    let path = apps_dir.join(app_id).join(CONFIG_FILE);
    if !runtime.exists(&path) {
        anyhow::bail!("App config not found: {}", path.display());
    }

    debug!("Loading app config from {}", path.display());
    let content = runtime.read_to_string(&path)?;
    PackageConfig::from_json(&content, app_id)
        .with_context(|| format!("Invalid app config at {}", path.display()))
}

/// Returns the sorted ids of every sub-directory holding an `app.json`.
#[tracing::instrument(skip(runtime))]
pub fn discover_apps<R: Runtime>(runtime: &R, apps_dir: &Path) -> Result<Vec<String>> {
    if !runtime.is_dir(apps_dir) {
        return Ok(vec![]);
    }

    let mut ids: Vec<String> = runtime
        .read_dir(apps_dir)?
        .into_iter()
        .filter(|p| runtime.is_file(&p.join(CONFIG_FILE)))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    ids.sort();
    Ok(ids)
}

/// Writes the discovered app ids to `output` as a JSON array.
pub fn write_apps_listing<R: Runtime>(
    runtime: &R,
    apps_dir: &Path,
    output: &Path,
) -> Result<Vec<String>> {
    let ids = discover_apps(runtime, apps_dir)?;
    let json = serde_json::to_string_pretty(&ids)?;
    runtime.write(output, json.as_bytes())?;
    info!("Generated {} with {} apps.", output.display(), ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use tempfile::tempdir;

    fn write_app(apps_dir: &Path, id: &str, json: &str) {
        let dir = apps_dir.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILE), json).unwrap();
    }

    #[test]
    fn test_from_json_full() {
        let config = PackageConfig::from_json(
            r#"{
                "id": "spotify",
                "name": "Spotify",
                "package_name": "com.spotify.music",
                "source": "apkpure",
                "version_file": "apps/spotify/version.txt",
                "apkpure_file_type": "apk",
                "apkpure_version": "latest"
            }"#,
            "ignored",
        )
        .unwrap();

        assert_eq!(config.id, "spotify");
        assert_eq!(config.display_name(), "Spotify");
        assert_eq!(config.package_name.as_deref(), Some("com.spotify.music"));
        assert_eq!(config.source.as_deref(), Some("apkpure"));
        assert_eq!(config.apkpure_file_type.as_deref(), Some("apk"));
        assert_eq!(config.repo, None);
        assert_eq!(
            config.version_file,
            PathBuf::from("apps/spotify/version.txt")
        );
    }

    #[test]
    fn test_from_json_fills_id_and_name() {
        let config =
            PackageConfig::from_json(r#"{"version_file": "v.txt", "extra": 1}"#, "yahav").unwrap();
        assert_eq!(config.id, "yahav");
        assert_eq!(config.name, "yahav");
    }

    #[test]
    fn test_from_json_requires_version_file() {
        let result = PackageConfig::from_json(r#"{"id": "x"}"#, "x");
        assert!(result.is_err());
    }

    #[test]
    fn test_builder() {
        let config = PackageConfig::new("app", "v.txt")
            .repo("owner/app")
            .source("github");
        assert_eq!(config.repo.as_deref(), Some("owner/app"));
        assert_eq!(config.source.as_deref(), Some("github"));
        assert_eq!(config.display_name(), "app");
    }

    #[test]
    fn test_load_app_config() {
        let dir = tempdir().unwrap();
        write_app(
            dir.path(),
            "bit",
            r#"{"name": "Bit", "package_name": "com.bnhp.payments.paymentsapp", "version_file": "apps/bit/version.txt"}"#,
        );

        let config = load_app_config(&RealRuntime, dir.path(), "bit").unwrap();
        assert_eq!(config.id, "bit");
        assert_eq!(config.name, "Bit");
        assert_eq!(config.source, None);
    }

    #[test]
    fn test_load_app_config_missing() {
        let dir = tempdir().unwrap();
        let err = load_app_config(&RealRuntime, dir.path(), "nope").unwrap_err();
        assert!(err.to_string().contains("App config not found"));
    }

    #[test]
    fn test_discover_apps_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        write_app(dir.path(), "yahav", r#"{"version_file": "v"}"#);
        write_app(dir.path(), "bit", r#"{"version_file": "v"}"#);
        std::fs::create_dir_all(dir.path().join("no-config")).unwrap();

        let ids = discover_apps(&RealRuntime, dir.path()).unwrap();
        assert_eq!(ids, vec!["bit".to_string(), "yahav".to_string()]);
    }

    #[test]
    fn test_discover_apps_missing_dir() {
        let dir = tempdir().unwrap();
        let ids = discover_apps(&RealRuntime, &dir.path().join("apps")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_write_apps_listing() {
        let dir = tempdir().unwrap();
        let apps = dir.path().join("apps");
        write_app(&apps, "bit", r#"{"version_file": "v"}"#);
        let output = dir.path().join("apps.json");

        let ids = write_apps_listing(&RealRuntime, &apps, &output).unwrap();

        assert_eq!(ids, vec!["bit".to_string()]);
        let listed: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(listed, ids);
    }
}
