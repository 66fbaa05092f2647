//! CLI command for listing the endpoint registry

use crate::endpoint::Endpoint;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use super::OutputFormat;

/// Endpoints subcommand
#[derive(Debug, Args)]
pub struct EndpointsCommand {
    /// Output format
    #[arg(long, default_value = "human")]
    format: OutputFormat,
}

impl EndpointsCommand {
    /// Print every registered endpoint
    pub fn execute(&self) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<_> = Endpoint::ALL
                    .iter()
                    .map(|endpoint| {
                        json!({
                            "key": endpoint.key(),
                            "label": endpoint.label(),
                            "category": endpoint.category().dir_name(),
                            "example": endpoint.artifact_name_of(1),
                        })
                    })
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&entries)
                        .context("Failed to serialize endpoints to JSON")?
                );
            }
            OutputFormat::Human => {
                println!("{} endpoints:\n", Endpoint::ALL.len());
                for endpoint in Endpoint::ALL {
                    println!(
                        "{:<16} | {:<26} | {:<10} | {}",
                        endpoint.key(),
                        endpoint.label(),
                        endpoint.category().dir_name(),
                        endpoint.artifact_name_of(1)
                    );
                }
            }
        }
        Ok(())
    }
}
