use anyhow::Result;
use log::debug;
use std::path::Path;

use crate::{app::write_apps_listing, runtime::Runtime};

/// Writes the tracked app ids to `output` and prints them.
#[tracing::instrument(skip(runtime))]
pub fn list<R: Runtime>(runtime: &R, apps_dir: &Path, output: &Path) -> Result<()> {
    debug!("Listing apps from {:?}", apps_dir);

    let ids = write_apps_listing(runtime, apps_dir, output)?;
    if ids.is_empty() {
        println!("No apps configured.");
        return Ok(());
    }

    for id in ids {
        println!("{}", id);
    }
    Ok(())
}
