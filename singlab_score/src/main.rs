// singlab: command line front end for full-context labels.
//
// Every subcommand reads one input file and writes its result to `-o` or to
// stdout. Labels are propagated with the default `PropagationConfig` unless
// `--config` names a JSON file.
//
// Usage:
//   singlab fill labels.lab [-o filled.lab] [--config cfg.json]
//   singlab check labels.lab [--config cfg.json]
//   singlab compose score.json [--table dict.table] [-o out.lab] [--config cfg.json]
//   singlab csv labels.lab [-o out.csv]
//   singlab json labels.lab [-o out.json]
//
// `-v` turns on debug logging; `RUST_LOG` overrides it. `check` exits with
// status 1 when the file has inconsistencies.

use clap::{Parser, Subcommand};
use singlab_label::{PropagationConfig, Sequence, export};
use singlab_lexicon::{PhonemeTable, default_table};
use singlab_score::{Score, compose};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log pass summaries (debug level)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propagate context windows through a label file
    Fill {
        input: PathBuf,
        /// Output path (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Propagation config JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Report inconsistencies in a label file
    Check {
        input: PathBuf,
        /// Propagation config JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Build labels from a score JSON file
    Compose {
        score: PathBuf,
        /// Lyric dictionary (table text, or JSON for .json); built-in kana table when absent
        #[arg(long)]
        table: Option<PathBuf>,
        /// Output path (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Propagation config JSON
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Export a label file as CSV
    Csv {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a label file as JSON
    Json {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fill {
            input,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let mut seq = Sequence::read(&input)?;
            let report = seq.propagate(&config);
            info!(input = %input.display(), %report, "filled");
            emit_labels(output.as_deref(), &seq)?;
        }
        Command::Check { input, config } => {
            let config = load_config(config.as_deref())?;
            let seq = Sequence::read(&input)?;
            let issues = seq.validate_with(&config);
            for issue in &issues {
                println!("{issue}");
            }
            if !issues.is_empty() {
                eprintln!("{}: {} inconsistencies", input.display(), issues.len());
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Compose {
            score,
            table,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let table = match table {
                Some(path) => PhonemeTable::read(path)?,
                None => default_table(),
            };
            let mut seq = compose(&Score::read(&score)?, &table)?;
            let report = seq.propagate(&config);
            info!(score = %score.display(), %report, "composed");
            emit_labels(output.as_deref(), &seq)?;
        }
        Command::Csv { input, output } => {
            let seq = Sequence::read(&input)?;
            emit(output.as_deref(), &export::to_csv(&seq))?;
        }
        Command::Json { input, output } => {
            let seq = Sequence::read(&input)?;
            emit(output.as_deref(), &export::to_json(&seq)?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PropagationConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => PropagationConfig::read(path)?,
        None => PropagationConfig::default(),
    })
}

fn emit_labels(output: Option<&Path>, seq: &Sequence) -> Result<(), Box<dyn Error>> {
    match output {
        Some(path) => seq.write(path)?,
        None => println!("{seq}"),
    }
    Ok(())
}

fn emit(output: Option<&Path>, text: &str) -> std::io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, text),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
