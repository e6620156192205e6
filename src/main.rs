use anyhow::Result;
use apkfetch::commands::{self, config::Config};
use apkfetch::http::HttpSettings;
use apkfetch::source::Endpoints;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// apkfetch - APK update tracker
///
/// Checks app catalogs for new releases of tracked Android packages and
/// downloads them when the version on record is out of date.
///
/// If the GITHUB_TOKEN environment variable is set, it is sent to the GitHub
/// release API. This avoids rate limits and allows private repositories.
///
/// Examples:
///   apkfetch check bit              # Check apps/bit/app.json, download to latest.apk
///   apkfetch check-all -o build     # Check every app, download to build/<id>.apk
///   apkfetch list                   # Write apps.json with every tracked app
#[derive(Parser, Debug)]
#[command(author, version = env!("APKFETCH_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding one <id>/app.json per tracked app
    #[arg(
        long = "apps-dir",
        env = "APKFETCH_APPS_DIR",
        value_name = "PATH",
        default_value = "apps",
        global = true
    )]
    pub apps_dir: PathBuf,

    /// Log progress at info level (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Pause before each catalog page request, in milliseconds
    #[arg(long = "request-delay-ms", value_name = "MS", default_value_t = 5000, global = true)]
    pub request_delay_ms: u64,

    /// Connect and idle-read timeout, in seconds (0 disables it)
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 60, global = true)]
    pub timeout_secs: u64,

    /// Point every catalog at one base URL (e.g. a local mirror)
    #[arg(long = "base-url", value_name = "URL", global = true, hide = true)]
    pub base_url: Option<String>,

    /// GitHub API URL (defaults to https://api.github.com)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Check one app and download it if a new version is available
    Check(CheckArgs),

    /// Check every tracked app concurrently
    CheckAll(CheckAllArgs),

    /// Write the list of tracked apps as JSON
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// App id, the directory name under the apps dir
    #[arg(value_name = "APP_ID")]
    pub app_id: String,

    /// Where to write the downloaded file
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write a JSON build status file after the check
    #[arg(long = "status-file", value_name = "PATH")]
    pub status_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct CheckAllArgs {
    /// Directory receiving <id>.apk for every updated app
    #[arg(long = "output-dir", short = 'o', value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Where to write the JSON listing
    #[arg(long, short = 'o', value_name = "PATH", default_value = "apps.json")]
    pub output: PathBuf,
}

impl Cli {
    fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            request_delay: Duration::from_millis(self.request_delay_ms),
            ..Default::default()
        }
    }

    fn endpoints(&self) -> Endpoints {
        let mut endpoints = match &self.base_url {
            Some(base) => Endpoints::all(base),
            None => Endpoints::default(),
        };
        if let Some(api_url) = &self.api_url {
            endpoints.github = api_url.clone();
        }
        endpoints
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    let runtime = apkfetch::runtime::RealRuntime;

    match &cli.command {
        Commands::List(args) => commands::list(&runtime, &cli.apps_dir, &args.output)?,
        Commands::Check(args) => {
            let config = Config::new(
                runtime,
                cli.apps_dir.clone(),
                &cli.http_settings(),
                cli.endpoints(),
            )?;
            commands::check(
                &config,
                &args.app_id,
                args.output.clone(),
                args.status_file.clone(),
            )
            .await?
        }
        Commands::CheckAll(args) => {
            let config = Config::new(
                runtime,
                cli.apps_dir.clone(),
                &cli.http_settings(),
                cli.endpoints(),
            )?;
            commands::check_all(&config, &args.output_dir).await?
        }
    }
    Ok(())
}
