//! CLI command implementations

pub mod endpoints;
pub mod error;
pub mod fetch;

pub use endpoints::EndpointsCommand;
pub use error::CliError;
pub use fetch::{Cli, Commands, FetchArgs, OutputFormat};
