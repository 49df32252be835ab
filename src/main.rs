//! Command-line interface for mongo-filtering
//!
//! ```bash
//! # Full default grid (Docker required)
//! mongo-filtering
//!
//! # JSON summary, reusing a running server
//! MONGODB_CONNECTION_STRING=mongodb://localhost:27017 \
//!   mongo-filtering --provisioner existing --format json --no-wait
//! ```

use clap::{Parser, ValueEnum};
use mongo_filtering::config::args::{mask_connection_password, GridArgs, MongoDBArgs};
use mongo_filtering::{report, Benchmark};
use tracing::info;

/// Output format of the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "mongo-filtering")]
#[command(about = "Compare server-side and client-side filtering of nested MongoDB arrays")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    grid: GridArgs,

    #[command(flatten)]
    mongodb: MongoDBArgs,

    /// Format of the final summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Exit as soon as the run finishes instead of waiting for Enter
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let grid = cli.grid.grid();
    grid.validate()?;

    if let Some(conn) = &cli.mongodb.mongodb_connection_string {
        info!("MongoDB connection string: {}", mask_connection_password(conn));
    }
    let provisioner = cli.mongodb.provisioner()?;

    let benchmark = Benchmark::new(grid, provisioner).with_batch_size(cli.mongodb.batch_size);
    let format = cli.format;

    let results = benchmark
        .run(|result| {
            if format == OutputFormat::Text {
                println!("{}", report::format_run_result(result));
            }
        })
        .await?;

    match format {
        OutputFormat::Text => print!("{}", report::format_summary(&results)),
        OutputFormat::Json => println!("{}", report::summary_json(&results)?),
    }

    if !cli.no_wait {
        println!("Press Enter to exit");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
    }

    Ok(())
}
