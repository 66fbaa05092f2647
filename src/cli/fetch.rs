//! Fetch command implementation

use crate::downloader::config::{
    validate_window_minutes, DEFAULT_BASE_URL, DEFAULT_WINDOW_MINUTES,
};
use crate::downloader::{BatchConfig, BatchExecutor, BatchJob, BatchReport};
use crate::endpoint::Endpoint;
use crate::fetcher::{ApiClient, ApiConfig, Credential};
use crate::output::ArtifactStore;
use crate::shutdown::SharedShutdown;
use crate::ItemId;
use clap::{ArgGroup, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::{CliError, EndpointsCommand};

/// Archive per-item API resources within the server's rate limit
#[derive(Parser, Debug)]
#[command(name = "strava-archive", version, about)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Data root directory; artifacts land in <data-dir>/<category>/
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch one endpoint for every identifier of a batch
    Fetch(FetchArgs),

    /// List the endpoints that can be fetched
    Endpoints(EndpointsCommand),
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Fetch command arguments
#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["ids", "ids_file"])))]
pub struct FetchArgs {
    /// Endpoint key (see `strava-archive endpoints`)
    pub endpoint: String,

    /// Comma-separated identifiers
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<ItemId>,

    /// JSON file with a list of identifiers or of objects carrying an `id`
    #[arg(long)]
    pub ids_file: Option<PathBuf>,

    /// Bearer access token
    #[arg(long, env = "STRAVA_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Rate-limit window length in minutes (a divisor of 60)
    #[arg(
        long,
        default_value_t = DEFAULT_WINDOW_MINUTES,
        value_parser = parse_window_minutes
    )]
    pub window_minutes: u32,

    /// Give up after this many window waits (default: wait as long as needed)
    #[arg(long)]
    pub max_window_cycles: Option<u32>,

    /// Report format
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,
}

impl FetchArgs {
    /// Run the batch and print its report
    pub async fn execute(
        &self,
        cli: &Cli,
        shutdown: SharedShutdown,
    ) -> Result<BatchReport, CliError> {
        let endpoint: Endpoint = self.endpoint.parse()?;
        let ids = self.load_ids()?;

        let credential = Credential::new(self.token.clone());
        if credential.is_empty() {
            return Err(CliError::ConfigurationError(
                "access token is empty (use --token or STRAVA_ACCESS_TOKEN)".to_string(),
            ));
        }

        let api_config = ApiConfig::default().with_base_url(self.base_url.clone());
        let descriptor = endpoint.descriptor(api_config.base_url.clone());
        let api = Arc::new(ApiClient::new(api_config, credential)?);

        let job = BatchJob::new(descriptor, ids);
        info!(
            endpoint = endpoint.key(),
            ids = job.len(),
            data_dir = %cli.data_dir.display(),
            "Fetch command starting"
        );

        let batch_config = BatchConfig::default()
            .with_window_minutes(self.window_minutes)
            .with_max_window_cycles(self.max_window_cycles);

        let mut executor = BatchExecutor::new(api, ArtifactStore::new(cli.data_dir.clone()))
            .with_config(batch_config)
            .with_shutdown(shutdown);
        if self.output_format == OutputFormat::Human {
            executor = executor.with_progress_bar(create_progress_bar(job.len(), endpoint));
        }

        let report = executor.execute(&job).await?;
        print_report(&report, self.output_format)?;
        Ok(report)
    }

    /// Identifiers from `--ids` or `--ids-file`, in the order given
    pub fn load_ids(&self) -> Result<Vec<ItemId>, CliError> {
        match &self.ids_file {
            Some(path) => read_ids_file(path),
            None => Ok(self.ids.clone()),
        }
    }
}

fn parse_window_minutes(value: &str) -> Result<u32, String> {
    let minutes: u32 = value
        .parse()
        .map_err(|e| format!("invalid window length '{value}': {e}"))?;
    validate_window_minutes(minutes)?;
    Ok(minutes)
}

/// Read identifiers from a JSON file
pub fn read_ids_file(path: &Path) -> Result<Vec<ItemId>, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CliError::InvalidArgument(format!("cannot read ids file {}: {e}", path.display()))
    })?;
    parse_ids(&contents)
}

/// Parse a JSON list of identifiers
///
/// Accepts plain integers (`[1, 2]`) and the list-fetch shape, objects that
/// carry an integer `id` (`[{"id": 1, "name": "Morning Ride"}]`).
pub fn parse_ids(contents: &str) -> Result<Vec<ItemId>, CliError> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|e| CliError::InvalidArgument(format!("ids file is not valid JSON: {e}")))?;

    let items = value.as_array().ok_or_else(|| {
        CliError::InvalidArgument("ids file must contain a JSON array".to_string())
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_u64()
                .or_else(|| item.get("id").and_then(Value::as_u64))
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!(
                        "entry {index} is neither an integer nor an object with an integer id"
                    ))
                })
        })
        .collect()
}

/// Print the completion report
fn print_report(report: &BatchReport, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| CliError::ConfigurationError(format!("cannot encode report: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Human => {
            println!(
                "{}: {} fetched, {} skipped, {} failed of {} in {:.1}s ({} chunks, {} window waits)",
                report.endpoint,
                report.fetched.len(),
                report.skipped.len(),
                report.failed.len(),
                report.total,
                report.elapsed.as_secs_f64(),
                report.chunks.len(),
                report.windows_waited,
            );
            for failure in &report.failed {
                println!("  failed {}: {}", failure.id, failure.reason);
            }
        }
    }
    Ok(())
}

fn create_progress_bar(total: usize, endpoint: Endpoint) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Fetching {}", endpoint.label()));
    pb
}
