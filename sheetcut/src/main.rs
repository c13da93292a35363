use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use colored::*;
use sheetcut_core::{CutoffDate, CutoverConfig, empty_dir, run_cutover, run_instantiation};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "sheetcut")]
#[command(about = "Year-end cutover for per-entity ledger workbooks", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Archive rows dated before the cutoff year and trim the ledgers
    Split {
        /// Directory holding the ledgers
        #[arg(short, long, value_name = "DIR")]
        source: PathBuf,

        /// Where current ledgers and the archive folder go (default: the source directory)
        #[arg(short, long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Reference ledger whose row formulas are filled down
        #[arg(short, long, value_name = "FILE")]
        template: Option<PathBuf>,

        /// Cutoff year; rows dated before January 1 of it are archived
        #[arg(short, long, value_name = "YEAR")]
        year: Option<String>,
    },
    /// Create one workbook per ledger from a template
    Instantiate {
        /// Directory whose ledger names are used
        #[arg(short, long, value_name = "DIR")]
        source: PathBuf,

        /// Output directory (default: the source directory)
        #[arg(short, long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Template workbook
        #[arg(short, long, value_name = "FILE")]
        template: PathBuf,

        /// Text appended to each entity name in output file names
        #[arg(long)]
        suffix: Option<String>,
    },
    /// Delete everything inside a directory
    Clean {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sheetcut=info,sheetcut_core=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(err) = ctrlc::set_handler(|| {
        eprintln!(
            "{}",
            "Run terminated, new files might be incomplete or corrupted".red().bold()
        );
        std::process::exit(130);
    }) {
        tracing::warn!("Interrupt handler not installed: {}", err);
    }

    let mut config = load_config(cli.config.as_deref())?;

    let all_ok = match cli.command {
        Command::Split {
            source,
            dest,
            template,
            year,
        } => {
            let year = resolve_year(year.as_deref());
            let cutoff = CutoffDate::from_year(year)
                .with_context(|| format!("Year {} is out of range", year))?;
            let dest = dest.unwrap_or_else(|| source.clone());

            println!(
                "{}",
                format!("Cutting over ledgers in {} at {}", source.display(), year).bold()
            );
            let run = run_cutover(&source, &dest, template.as_deref(), cutoff, &config)?;
            report::print_cutover(&run);
            run.failed() == 0
        }
        Command::Instantiate {
            source,
            dest,
            template,
            suffix,
        } => {
            if let Some(suffix) = suffix {
                config.instantiate.suffix = suffix;
            }
            let dest = dest.unwrap_or_else(|| source.clone());

            println!(
                "{}",
                format!("Instantiating {} for ledgers in {}", template.display(), source.display())
                    .bold()
            );
            let run = run_instantiation(&source, &dest, &template, &config)?;
            report::print_instances(&run);
            run.failed() == 0
        }
        Command::Clean { dir } => {
            let failures = empty_dir(&dir)?;
            report::print_cleanup(&dir, &failures);
            failures.is_empty()
        }
    };

    std::process::exit(if all_ok { 0 } else { 1 });
}

fn load_config(path: Option<&Path>) -> Result<CutoverConfig> {
    let config = if let Some(config_path) = path {
        CutoverConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("sheetcut.toml");
        if default_config_path.exists() {
            CutoverConfig::from_file(&default_config_path).with_context(|| {
                format!("Failed to load config from {}", default_config_path.display())
            })?
        } else {
            CutoverConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Parse the cutoff year, falling back to the current year
fn resolve_year(input: Option<&str>) -> i32 {
    let current = chrono::Local::now().year();
    match input.map(str::trim) {
        None => current,
        Some(text) => text.parse().unwrap_or_else(|_| {
            eprintln!(
                "{}",
                format!("Invalid year '{}', using {}", text, current).red()
            );
            current
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_year() {
        let current = chrono::Local::now().year();
        assert_eq!(resolve_year(Some("2023")), 2023);
        assert_eq!(resolve_year(Some(" 2021 ")), 2021);
        assert_eq!(resolve_year(Some("twenty")), current);
        assert_eq!(resolve_year(None), current);
    }

    #[test]
    fn test_parse_split_command() {
        let cli = Cli::parse_from(["sheetcut", "split", "-s", "ledgers", "-y", "2024"]);
        match cli.command {
            Command::Split { source, dest, year, .. } => {
                assert_eq!(source, PathBuf::from("ledgers"));
                assert!(dest.is_none());
                assert_eq!(year.as_deref(), Some("2024"));
            }
            _ => panic!("expected split"),
        }
    }
}
