use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use tabular_etl::{cli, config, logging};

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Tabular ETL: extract from CSV files and REST APIs, clean the table, load it into CSV files and SQL databases
#[derive(Parser)]
#[command(name = "tetl", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source environment overrides from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Also append log records to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a JSON or YAML config file
    Run {
        /// The pipeline config file
        #[arg(short, long, default_value = "pipeline.json")]
        config: PathBuf,

        /// Prefix of environment variables that override config keys
        #[arg(short, long, default_value = config::ENV_PREFIX)]
        prefix: String,
    },

    /// Print the merged configuration (file + environment) as JSON
    Config {
        /// The config file
        #[arg(short, long, default_value = "pipeline.json")]
        config: PathBuf,

        /// Prefix of environment variables that override config keys
        #[arg(short, long, default_value = config::ENV_PREFIX)]
        prefix: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if Path::new(&cli.env).exists() {
        dotenvy::from_filename(&cli.env)?;
    }

    let log_level = match cli.debug {
        true => log::LevelFilter::Debug,
        false => log::LevelFilter::Info,
    };
    logging::init(log_level, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run { config, prefix } => {
            log::info!("Running pipeline from {}", config.display().bright_black());
            let (name, data) = cli::run_from_config(&config, &prefix).await?;
            log::info!(
                "✓ Pipeline {} completed with {} {}",
                name.cyan(),
                data.len(),
                match data.kind() {
                    "table" => "row(s)",
                    _ => "item(s)",
                }
            );
        }
        Commands::Config { config: path, prefix } => {
            let merged = config::load_config(Some(&path), &prefix)?;
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
    }

    Ok(())
}
