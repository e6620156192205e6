//! Source registry mapping configured source names to constructors.
//!
//! The table is flat and static: each entry names a source, the config field
//! it keys on, and a constructor. Lookup is case-insensitive and an unknown or
//! absent name selects the first entry.

use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};
use reqwest::header::HeaderValue;

use super::{
    ApkMirrorSource, ApkPureSource, AptoideSource, Endpoints, GitHubSource, Source, SourceKind,
};
use crate::app::PackageConfig;
use crate::error::FetchError;
use crate::http::{HttpClient, HttpSettings};

const DEFAULT_APKPURE_FILE_TYPE: &str = "XAPK";
const DEFAULT_APKPURE_VERSION: &str = "latest";

/// Config field a source uses as its lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    PackageName,
    Repo,
}

impl LookupField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupField::PackageName => "package_name",
            LookupField::Repo => "repo",
        }
    }

    /// The field's value in `config`. Empty or blank values count as missing.
    pub fn value<'c>(&self, config: &'c PackageConfig) -> Option<&'c str> {
        let value = match self {
            LookupField::PackageName => config.package_name.as_deref(),
            LookupField::Repo => config.repo.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Shared construction inputs handed to every source constructor.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub http_client: HttpClient,
    pub endpoints: Endpoints,
    pub request_delay: Duration,
    /// `Authorization` value sent to the release API only.
    pub github_auth: Option<HeaderValue>,
}

impl SourceContext {
    pub fn new(settings: &HttpSettings, endpoints: Endpoints) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::from_settings(settings)?,
            endpoints,
            request_delay: settings.request_delay,
            github_auth: None,
        })
    }

    /// Attaches an API token to the release API source. Blank tokens are ignored.
    pub fn with_github_token(mut self, token: Option<&str>) -> Result<Self> {
        self.github_auth = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Some(HttpClient::bearer(token)?),
            None => None,
        };
        Ok(self)
    }
}

/// One row of the registry table.
pub struct SourceDefinition {
    pub name: &'static str,
    pub kind: SourceKind,
    pub lookup_field: LookupField,
    pub build: fn(&SourceContext, &PackageConfig) -> Box<dyn Source>,
}

fn build_apkmirror(ctx: &SourceContext, _config: &PackageConfig) -> Box<dyn Source> {
    Box::new(ApkMirrorSource::new(
        ctx.http_client.clone(),
        &ctx.endpoints.apkmirror,
        ctx.request_delay,
    ))
}

fn build_apkpure(ctx: &SourceContext, config: &PackageConfig) -> Box<dyn Source> {
    Box::new(ApkPureSource::new(
        ctx.http_client.clone(),
        &ctx.endpoints.apkpure,
        config
            .apkpure_file_type
            .as_deref()
            .unwrap_or(DEFAULT_APKPURE_FILE_TYPE),
        config
            .apkpure_version
            .as_deref()
            .unwrap_or(DEFAULT_APKPURE_VERSION),
    ))
}

fn build_aptoide(ctx: &SourceContext, _config: &PackageConfig) -> Box<dyn Source> {
    Box::new(AptoideSource::new(
        ctx.http_client.clone(),
        &ctx.endpoints.aptoide,
    ))
}

fn build_github(ctx: &SourceContext, config: &PackageConfig) -> Box<dyn Source> {
    let client = match &ctx.github_auth {
        Some(auth) => ctx.http_client.clone().with_authorization(auth.clone()),
        None => ctx.http_client.clone(),
    };
    let source = GitHubSource::new(client, &ctx.endpoints.github);
    Box::new(match config.asset_extension.as_deref() {
        Some(ext) if !ext.trim().is_empty() => source.with_asset_extension(ext),
        _ => source,
    })
}

/// The registry table. The first entry is the fallback.
static SOURCE_DEFINITIONS: &[SourceDefinition] = &[
    SourceDefinition {
        name: "apkmirror",
        kind: SourceKind::ApkMirror,
        lookup_field: LookupField::PackageName,
        build: build_apkmirror,
    },
    SourceDefinition {
        name: "apkpure",
        kind: SourceKind::ApkPure,
        lookup_field: LookupField::PackageName,
        build: build_apkpure,
    },
    SourceDefinition {
        name: "aptoide",
        kind: SourceKind::Aptoide,
        lookup_field: LookupField::PackageName,
        build: build_aptoide,
    },
    SourceDefinition {
        name: "github",
        kind: SourceKind::GitHub,
        lookup_field: LookupField::Repo,
        build: build_github,
    },
];

/// A constructed source together with the identifier to query it with.
pub struct SelectedSource {
    pub kind: SourceKind,
    pub source: Box<dyn Source>,
    pub lookup_value: String,
}

/// Registry resolving package configs to catalog sources.
pub struct SourceRegistry {
    context: SourceContext,
}

impl SourceRegistry {
    pub fn new(context: SourceContext) -> Self {
        Self { context }
    }

    /// Finds the definition for `name`, falling back to the first entry.
    pub fn definition(name: Option<&str>) -> &'static SourceDefinition {
        let fallback = &SOURCE_DEFINITIONS[0];
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return fallback;
        };

        SOURCE_DEFINITIONS
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .unwrap_or_else(|| {
                warn!(
                    "Unknown source '{}', falling back to '{}'",
                    name, fallback.name
                );
                fallback
            })
    }

    /// Selects and builds the source for `config`. Mutates nothing.
    pub fn create(&self, config: &PackageConfig) -> Result<SelectedSource, FetchError> {
        let definition = Self::definition(config.source.as_deref());
        let lookup_value = definition
            .lookup_field
            .value(config)
            .ok_or_else(|| FetchError::Configuration {
                field: definition.lookup_field.as_str(),
                source_name: definition.name.to_string(),
            })?
            .to_string();

        debug!(
            "Selected source {} for {} ({} = {})",
            definition.name,
            config.display_name(),
            definition.lookup_field.as_str(),
            lookup_value
        );

        Ok(SelectedSource {
            kind: definition.kind,
            source: (definition.build)(&self.context, config),
            lookup_value,
        })
    }

    /// The shared client, for fetching artifacts.
    pub fn http_client(&self) -> &HttpClient {
        &self.context.http_client
    }
}
