//! alissa-review - Alissa Interpret command line tooling
//!
//! Subcommands:
//! - `manual-review`: count manual review labels per analysis into a TSV store
//! - `upload-vcf`: upload a VCF data file
//! - `analyses`: list analyses as JSON lines

use std::path::PathBuf;

use alissa_common::config::{load_toml_config, ConnectionConfig, ConnectionOverrides};
use alissa_review::services::{AlissaClient, AnalysisFilter, VCF_FILE_TYPE};
use alissa_review::workflow::{created_after_param, default_created_after, DEFAULT_STATUS};
use alissa_review::{run_manual_review, ManualReviewOptions};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for alissa-review
#[derive(Parser, Debug)]
#[command(name = "alissa-review")]
#[command(about = "Alissa Interpret manual review tooling")]
#[command(version)]
struct Cli {
    /// TOML config file (default: <config dir>/alissa-review/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

/// Connection settings; each falls back to ALISSA_* env vars, then the config file
#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Alissa API base uri
    #[arg(long, global = true)]
    base_uri: Option<String>,

    /// Alissa API client id
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Alissa API client secret
    #[arg(long, global = true)]
    client_secret: Option<String>,

    /// Alissa API username
    #[arg(long, global = true)]
    username: Option<String>,

    /// Alissa API password
    #[arg(long, global = true)]
    password: Option<String>,
}

impl From<ConnectionArgs> for ConnectionOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            base_uri: args.base_uri,
            client_id: args.client_id,
            client_secret: args.client_secret,
            username: args.username,
            password: args.password,
        }
    }
}

#[derive(Args, Debug)]
struct ListingArgs {
    /// Analysis status to select
    #[arg(long, default_value = DEFAULT_STATUS)]
    status: String,

    /// Only analyses created after this date (YYYY-MM-DD)
    #[arg(long)]
    created_after: Option<NaiveDate>,
}

impl ListingArgs {
    fn filter(&self) -> AnalysisFilter {
        let created_after = self.created_after.unwrap_or_else(default_created_after);
        AnalysisFilter {
            status: Some(self.status.clone()),
            created_after: Some(created_after_param(created_after)),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count manual review labels and update the review store
    ManualReview {
        /// Review store (tab-separated) to read and rewrite
        #[arg(short, long)]
        database: PathBuf,

        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Upload a VCF file to Alissa Interpret
    UploadVcf {
        /// VCF file path
        vcf_file: PathBuf,
    },

    /// List analyses as JSON lines
    Analyses {
        #[command(flatten)]
        listing: ListingArgs,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_toml_config(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = &loaded.config.logging.level;
                format!("alissa_review={level},alissa_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("alissa-review {}", env!("CARGO_PKG_VERSION"));
    loaded.log_source();

    let connection = ConnectionConfig::resolve(&cli.connection.into(), &loaded.config.connection)
        .context("Incomplete Alissa connection settings")?;

    match cli.command {
        Command::ManualReview { database, listing } => {
            let options = ManualReviewOptions {
                database,
                filter: listing.filter(),
                export: loaded.config.export.clone(),
            };

            let summary = run_manual_review(&connection, &options)
                .await
                .with_context(|| format!("Manual review run on {} failed", options.database.display()))?;

            info!(
                rows = summary.rows_written,
                reviewed = summary.reviewed,
                reused = summary.reused,
                "Done"
            );
        }
        Command::UploadVcf { vcf_file } => {
            let client = AlissaClient::connect(&connection)
                .await
                .context("Failed to connect to Alissa")?;
            let uploaded = client
                .post_data_file(&vcf_file, VCF_FILE_TYPE)
                .await
                .with_context(|| format!("Failed to upload {}", vcf_file.display()))?;
            println!("{}", uploaded);
            client.close();
        }
        Command::Analyses { listing } => {
            let client = AlissaClient::connect(&connection)
                .await
                .context("Failed to connect to Alissa")?;
            let analyses = client
                .get_analyses(&listing.filter())
                .await
                .context("Failed to list analyses")?;
            for analysis in &analyses {
                println!("{}", serde_json::to_string(analysis)?);
            }
            client.close();
        }
    }

    Ok(())
}
