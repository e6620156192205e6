//! Retrieve action - orchestrates checking and downloading one package.
//!
//! This action coordinates:
//! - Selecting the catalog source for a package config
//! - Comparing the catalog's latest version against the version store
//! - Resolving the direct download URL and streaming the artifact
//! - Committing the new version once the artifact is fully written

use std::fmt;
use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use log::{debug, info, warn};

use crate::app::PackageConfig;
use crate::download::download_file;
use crate::error::FetchError;
use crate::runtime::Runtime;
use crate::source::{Source, SourceRegistry};
use crate::version::{VersionStore, versions_match};

/// Outcome of one package check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub updated: bool,
    /// Set only when `updated` is true.
    pub new_version: Option<String>,
}

impl DownloadResult {
    pub fn up_to_date() -> Self {
        Self {
            updated: false,
            new_version: None,
        }
    }

    pub fn updated(version: impl Into<String>) -> Self {
        Self {
            updated: true,
            new_version: Some(version.into()),
        }
    }
}

/// Progress of a single retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ProviderSelected,
    VersionFetched,
    UpToDate,
    LocatorResolved,
    Downloading,
    Committed,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::ProviderSelected => "provider selected",
            Stage::VersionFetched => "version fetched",
            Stage::UpToDate => "up to date",
            Stage::LocatorResolved => "locator resolved",
            Stage::Downloading => "downloading",
            Stage::Committed => "committed",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Retrieve action - checks for a newer release and downloads it.
pub struct RetrieveAction<'a, R: Runtime> {
    runtime: &'a R,
    registry: &'a SourceRegistry,
}

impl<'a, R: Runtime> RetrieveAction<'a, R> {
    pub fn new(runtime: &'a R, registry: &'a SourceRegistry) -> Self {
        Self { runtime, registry }
    }

    /// Checks one package and downloads it to `output` if the catalog has a
    /// different version than the one on record.
    #[tracing::instrument(skip(self, config, output), fields(app = %config.id))]
    pub async fn retrieve(
        &self,
        config: &PackageConfig,
        output: &Path,
    ) -> Result<DownloadResult, FetchError> {
        debug!("[{}] {}", config.display_name(), Stage::Init);

        let selected = self.registry.create(config).inspect_err(|e| {
            warn!(
                "[{}] {} after stage {}: {}",
                config.display_name(),
                Stage::Failed,
                Stage::Init,
                e
            );
        })?;
        debug!(
            "[{}] {} ({})",
            config.display_name(),
            Stage::ProviderSelected,
            selected.kind
        );

        self.run(
            selected.source.as_ref(),
            &selected.lookup_value,
            config,
            output,
        )
        .await
    }

    /// Runs the check against an already selected source.
    pub async fn run(
        &self,
        source: &dyn Source,
        identifier: &str,
        config: &PackageConfig,
        output: &Path,
    ) -> Result<DownloadResult, FetchError> {
        let name = config.display_name();
        let mut stage = Stage::ProviderSelected;

        let result = self
            .run_stages(source, identifier, config, output, &mut stage)
            .await;
        if let Err(e) = &result {
            warn!("[{}] {} after stage {}: {}", name, Stage::Failed, stage, e);
            if e.is_blocked() {
                warn!("[{}] Request was refused by the server, try again later", name);
            }
            if e.output_untrusted() {
                warn!(
                    "[{}] {} holds a partial download and must not be used",
                    name,
                    output.display()
                );
            }
        }
        result
    }

    async fn run_stages(
        &self,
        source: &dyn Source,
        identifier: &str,
        config: &PackageConfig,
        output: &Path,
        stage: &mut Stage,
    ) -> Result<DownloadResult, FetchError> {
        let name = config.display_name();
        let store = VersionStore::new(self.runtime, &config.version_file);

        let release = source.get_latest_version(identifier).await?;
        *stage = Stage::VersionFetched;
        let current = store.read()?;
        info!(
            "[{}] Latest: {}, current: {}",
            name, release.version, current
        );

        if versions_match(&release.version, &current) {
            *stage = Stage::UpToDate;
            info!("[{}] Already up to date ({})", name, current);
            return Ok(DownloadResult::up_to_date());
        }

        let request = source.get_download_request(&release.locator).await?;
        *stage = Stage::LocatorResolved;
        debug!("[{}] {}: {}", name, Stage::LocatorResolved, request.url);

        *stage = Stage::Downloading;
        download_file(
            self.runtime,
            &request.url,
            request.referer.as_deref(),
            output,
            self.registry.http_client(),
        )
        .await?;

        store.commit(&release.version)?;
        *stage = Stage::Committed;
        info!(
            "[{}] Updated {} -> {} ({})",
            name, current, release.version, release.title
        );

        Ok(DownloadResult::updated(release.version))
    }

    /// Checks every package concurrently. One failure does not stop the others.
    pub async fn retrieve_all(
        &self,
        jobs: &[(PackageConfig, PathBuf)],
    ) -> Vec<(String, Result<DownloadResult, FetchError>)> {
        let runs = jobs.iter().map(|(config, output)| async move {
            (config.id.clone(), self.retrieve(config, output).await)
        });
        join_all(runs).await
    }
}
