use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use study_dictionary::pipeline;
use study_dictionary::{ConsolidationConfig, DictionaryError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;
    match cli.command {
        Command::Consolidate(args) => execute_consolidate(args),
        Command::DefaultConfig => {
            let config = ConsolidationConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn execute_consolidate(args: ConsolidateArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ConsolidationConfig::from_path(path)?,
        None => ConsolidationConfig::default(),
    };
    if let Some(title) = args.title {
        config.title = title;
    }

    let dictionary = pipeline::consolidate_files(&args.inputs, &config)?;
    pipeline::write_outputs(
        &dictionary,
        &args.output,
        args.json.as_deref(),
        &config.title,
    )
}

fn init_logging(verbosity: u8) -> Result<()> {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("study_dictionary={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| DictionaryError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate per-study variable workbooks into one data dictionary."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge study workbooks into a consolidated dictionary workbook.
    Consolidate(ConsolidateArgs),
    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(clap::Args)]
struct ConsolidateArgs {
    /// Study workbooks; each file name (up to its first dot) is the study code.
    inputs: Vec<PathBuf>,

    /// Output workbook path.
    #[arg(long)]
    output: PathBuf,

    /// Optional path for a JSON copy of the dictionary.
    #[arg(long)]
    json: Option<PathBuf>,

    /// JSON configuration file overriding sheet sets and category columns.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Title shown on the contents sheet.
    #[arg(long)]
    title: Option<String>,
}
