use anyhow::Result;
use log::debug;

use std::path::PathBuf;

use crate::{
    http::HttpSettings,
    runtime::Runtime,
    source::{Endpoints, SourceContext, SourceRegistry},
};

/// Environment variable holding the release API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Everything a command needs: filesystem access, the source registry and
/// the directory holding the per-app configs.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub registry: SourceRegistry,
    pub apps_dir: PathBuf,
}

impl<R: Runtime> Config<R> {
    pub fn new(
        runtime: R,
        apps_dir: PathBuf,
        settings: &HttpSettings,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let token = runtime.env_var(TOKEN_ENV).ok();
        if let Some(token) = token.as_deref().filter(|t| !t.trim().is_empty()) {
            debug!(
                "Using {} for authentication ({} chars)",
                TOKEN_ENV,
                token.len()
            );
        }

        let context = SourceContext::new(settings, endpoints)?.with_github_token(token.as_deref())?;

        Ok(Self {
            runtime,
            registry: SourceRegistry::new(context),
            apps_dir,
        })
    }
}
