//! Command-line overrides.

use clap::Parser;
use serde::Serialize;

/// Command-line options. Unset flags fall through to the environment and
/// defaults.
#[derive(Debug, Clone, Default, Parser, Serialize)]
#[command(name = "redirect-api", about = "Serve key to URL redirections")]
pub struct Cli {
    /// Database location (`:memory:` or a file path).
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,

    /// Socket address to listen on.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,

    /// Log filter directive, for example `debug` or `redirect_api=trace`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}
