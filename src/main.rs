//! polysched Command Line Interface
//!
//! Usage:
//!   polysched [OPTIONS] <COMMAND> <FILE>
//!   polysched --help
//!
//! Examples:
//!   polysched sections blur.json                       # Candidate sections per root
//!   polysched candidates --kind interchange blur.json  # Interchange candidates
//!   polysched search --oracle ./oracle blur.json       # Sequential parallelization

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use polysched::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// polysched - schedule search over loop nests
#[derive(Parser, Debug)]
#[command(name = "polysched")]
#[command(version)]
#[command(about = "Search-based loop scheduling core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the iterator tree and its candidate sections
    Sections {
        /// Program annotation (.json)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the candidates of one transformation kind
    Candidates {
        /// Transformation kind
        #[arg(short, long, default_value = "parallelization")]
        kind: ActionKind,

        /// Program annotation (.json)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Run sequential parallelization against an oracle program
    Search {
        /// Oracle executable
        #[arg(long, value_name = "PROGRAM")]
        oracle: PathBuf,

        /// Argument passed to the oracle (repeatable)
        #[arg(long = "oracle-arg", value_name = "ARG", allow_hyphen_values = true)]
        oracle_args: Vec<String>,

        /// Per-call oracle timeout
        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        /// Candidates tried per root
        #[arg(long)]
        max_candidates: Option<usize>,

        /// Oracle calls allowed for the whole search
        #[arg(long)]
        max_oracle_calls: Option<usize>,

        /// Print compiler calls instead of the short form
        #[arg(long)]
        calls: bool,

        /// Program annotation (.json)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("polysched v{}", polysched::VERSION);

    match cli.command {
        Command::Sections { input } => {
            let program = load(&input)?;
            let tree = &program.tree;
            print!("{}", tree);
            let sections = tree.get_candidate_sections()?;
            for (root, sections) in sections.iter() {
                println!("{}:", root);
                for section in sections {
                    let names: Vec<&str> = section.iter().map(|id| id.as_str()).collect();
                    println!("  [{}]", names.join(", "));
                }
            }
        }
        Command::Candidates { kind, input } => {
            let program = load(&input)?;
            let candidates = kind
                .candidates(&program.tree)
                .with_context(|| format!("Failed to generate {} candidates", kind))?;
            for (root, candidates) in candidates.iter() {
                println!("{} ({} candidates):", root, candidates.len());
                for candidate in candidates {
                    let levels = program.tree.get_iterator_levels(candidate)?;
                    let shown: Vec<String> = candidate
                        .iter()
                        .zip(levels)
                        .map(|(id, level)| format!("{}@L{}", id, level))
                        .collect();
                    println!("  {}", shown.join(" "));
                }
            }
        }
        Command::Search {
            oracle,
            oracle_args,
            timeout_secs,
            max_candidates,
            max_oracle_calls,
            calls,
            input,
        } => {
            let program = Arc::new(load(&input)?);
            let oracle = CommandOracle::new(
                CommandOracleConfig::new(oracle)
                    .args(oracle_args)
                    .timeout(Duration::from_secs(timeout_secs)),
            );
            debug!("Oracle config: {:?}", oracle.config());

            let mut config = SearchConfig::new();
            config.max_candidates_per_root = max_candidates;
            config.max_oracle_calls = max_oracle_calls;
            let mut search = SequentialParallelization::new(config);

            let outcome = search
                .search(program, &oracle)
                .with_context(|| format!("Search failed on {:?}", input))?;
            info!("{}", outcome.statistics);

            match outcome.schedule {
                Some(schedule) if calls => println!("{}", schedule.compiler_calls()?),
                Some(schedule) => println!("{}", schedule.short_form()?),
                None => println!("no schedule found"),
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<Program> {
    debug!("Input file: {:?}", path);
    Program::from_path(path).with_context(|| format!("Failed to load program annotation: {:?}", path))
}
