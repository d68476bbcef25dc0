//! Infrastructure dashboard CLI
//!
//! Queries the dashboard server for cluster heatmaps, utilization trends,
//! recently created inventory and provider status.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{heatmap, recent, status, utilization};
use dashboard_lib::Viewer;
use std::path::PathBuf;

/// Infrastructure dashboard CLI
#[derive(Parser)]
#[command(name = "infradash")]
#[command(author, version, about = "CLI for the infrastructure dashboard", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via INFRADASH_API_URL env var)
    #[arg(long, env = "INFRADASH_API_URL")]
    pub api_url: Option<String>,

    /// User whose time profile selects the daily rollups
    #[arg(long, env = "INFRADASH_USER_ID")]
    pub user_id: Option<u64>,

    /// Timezone of the user's time profile
    #[arg(long, env = "INFRADASH_TIMEZONE")]
    pub timezone: Option<String>,

    /// Output format
    #[arg(long, short, value_enum)]
    pub format: Option<output::OutputFormat>,

    /// Config file (defaults to ~/.config/infradash/config.json)
    #[arg(long, env = "INFRADASH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show CPU and memory usage per cluster
    Heatmap {
        /// Limit to one provider
        #[arg(long)]
        ems: Option<u64>,
    },

    /// Show daily CPU and memory utilization for the last 30 days
    Utilization {
        /// Limit to one provider
        #[arg(long)]
        ems: Option<u64>,
    },

    /// Show hosts or VMs created per day in the last 30 days
    Recent {
        #[arg(value_enum)]
        kind: recent::RecentKind,

        /// Limit to one provider
        #[arg(long)]
        ems: Option<u64>,
    },

    /// Show inventory counts for a provider
    Status {
        /// Provider id
        #[arg(long)]
        ems: u64,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Config::load(cli.config.as_deref())?.resolve(
        cli.api_url,
        cli.user_id,
        cli.timezone,
        cli.format,
    )?;

    let client = client::ApiClient::new(
        &settings.api_url,
        Viewer::new(settings.user_id, settings.timezone),
    )?;
    let format = settings.format;

    match cli.command {
        Commands::Heatmap { ems } => heatmap::show_heatmap(&client, ems, format).await?,
        Commands::Utilization { ems } => {
            utilization::show_utilization(&client, ems, format).await?
        }
        Commands::Recent { kind, ems } => recent::show_recent(&client, kind, ems, format).await?,
        Commands::Status { ems } => status::show_status(&client, ems, format).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
