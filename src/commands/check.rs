use anyhow::Result;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::{
    app::{discover_apps, load_app_config},
    error::FetchError,
    report::{BuildStatus, set_output, write_status},
    retrieve::{DownloadResult, RetrieveAction},
    runtime::Runtime,
};

use super::config::Config;

/// Output file used when `check` is given no `--output`.
pub const DEFAULT_OUTPUT: &str = "latest.apk";

/// Checks one app and downloads it when the catalog has a newer version.
///
/// Publishes `update_needed` (and `new_version` on update) as CI outputs. A
/// catalog without the package counts as "no update".
#[tracing::instrument(skip(config))]
pub async fn check<R: Runtime>(
    config: &Config<R>,
    app_id: &str,
    output: Option<PathBuf>,
    status_file: Option<PathBuf>,
) -> Result<()> {
    let app = load_app_config(&config.runtime, &config.apps_dir, app_id)?;
    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    info!(
        "Checking {} ({})",
        app.display_name(),
        app.source.as_deref().unwrap_or("default source")
    );

    let action = RetrieveAction::new(&config.runtime, &config.registry);
    let result = action.retrieve(&app, &output).await;

    let status = match &result {
        Ok(_) => BuildStatus::succeeded(),
        Err(e) if e.is_not_found() => BuildStatus::succeeded(),
        Err(e) => BuildStatus::failed(None, e.to_string()),
    };
    if let Some(path) = &status_file {
        write_status(&config.runtime, path, &status)?;
    }

    match result {
        Ok(DownloadResult {
            updated: true,
            new_version: Some(version),
        }) => {
            println!("{}: updated to {} ({})", app_id, version, output.display());
            set_output(&config.runtime, "update_needed", "true")?;
            set_output(&config.runtime, "new_version", &version)?;
        }
        Ok(_) => {
            println!("{}: up to date", app_id);
            set_output(&config.runtime, "update_needed", "false")?;
        }
        Err(e) if e.is_not_found() => {
            warn!("{}: {}", app_id, e);
            println!("{}: no release found", app_id);
            set_output(&config.runtime, "update_needed", "false")?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Checks every configured app concurrently, writing `<output_dir>/<id>.apk`.
///
/// Fails only after every app has been attempted, if any of them failed.
#[tracing::instrument(skip(config))]
pub async fn check_all<R: Runtime>(config: &Config<R>, output_dir: &Path) -> Result<()> {
    let ids = discover_apps(&config.runtime, &config.apps_dir)?;
    if ids.is_empty() {
        println!("No apps configured.");
        return Ok(());
    }

    let mut failures = 0;
    let mut jobs = Vec::new();
    for id in &ids {
        match load_app_config(&config.runtime, &config.apps_dir, id) {
            Ok(app) => {
                let output = output_dir.join(format!("{}.apk", id));
                jobs.push((app, output));
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", id, e);
                println!("{}: failed: {:#}", id, e);
                failures += 1;
            }
        }
    }

    let action = RetrieveAction::new(&config.runtime, &config.registry);
    for (id, result) in action.retrieve_all(&jobs).await {
        match result {
            Ok(DownloadResult {
                new_version: Some(version),
                ..
            }) => println!("{}: updated to {}", id, version),
            Ok(_) => println!("{}: up to date", id),
            Err(e) if e.is_not_found() => println!("{}: no release found", id),
            Err(e) => {
                println!("{}: failed: {}", id, describe(&e));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} apps failed", failures, ids.len());
    }
    Ok(())
}

fn describe(err: &FetchError) -> String {
    if err.output_untrusted() {
        format!("{} (output file is incomplete)", err)
    } else {
        err.to_string()
    }
}
