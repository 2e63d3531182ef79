//! `vaulttag` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, load `.env` and configuration, start logging.
//! - Wire the external-command classifier and the terminal prompt into
//!   the core tagging service.

mod classifier;
mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classifier::CommandClassifier;
use log::info;
use prompt::TerminalConfirm;
use std::path::PathBuf;
use vaulttag_core::model::tag::display_tags;
use vaulttag_core::{
    init_logging, rank, AutoApprove, ChangeCache, Confirm, IndexResult, RunReport, TaggerConfig,
    TaggingService,
};

#[derive(Parser)]
#[command(
    name = "vaulttag",
    about = "Keep a Markdown vault's tag taxonomy consistent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Vault root (overrides VAULT_PATH)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the vault and print a summary
    Scan,

    /// Print the most frequent tags
    Rank {
        /// Number of tags to print (defaults to the vocabulary size)
        #[arg(long, short)]
        n: Option<usize>,
    },

    /// Ask the classifier about one note and print the proposed diff
    Suggest {
        /// Note file
        note: PathBuf,

        /// Write the proposed tags
        #[arg(long)]
        apply: bool,
    },

    /// Suggest and apply tags for every changed note
    Run {
        /// Apply every change without asking
        #[arg(long, alias = "yes")]
        auto: bool,

        /// Ignore the change cache
        #[arg(long)]
        force: bool,

        /// Restrict to a folder inside the vault
        #[arg(long)]
        folder: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = TaggerConfig::from_env().context("failed to load configuration")?;
    if let Some(vault) = cli.vault {
        config.vault_path = vault;
    }
    init_logging(&config.log_level, &config.log_dir)
        .map_err(anyhow::Error::msg)
        .context("failed to start logging")?;
    info!(
        "event=cli_start module=cli status=ok vault={}",
        config.vault_path.display()
    );

    let classifier = CommandClassifier::new(config.classifier_command.clone());
    let (force, auto_approve) = match &cli.command {
        Commands::Run { force, auto, .. } => (*force, *auto),
        _ => (false, false),
    };
    let mut service = TaggingService::new(
        &classifier,
        ChangeCache::open(&config.cache_path),
        config.tag_policy(),
        config.run_options(force, auto_approve),
    );
    let root = config.vault_path.as_path();

    match cli.command {
        Commands::Scan => {
            let scan = service.scan(root)?;
            print_scan(&scan);
        }
        Commands::Rank { n } => {
            let scan = service.scan(root)?;
            let limit = n.unwrap_or(config.vocabulary_size);
            for (position, (tag, count)) in scan.index.ranked().into_iter().take(limit).enumerate()
            {
                println!("{:>4}. {tag} ({count})", position + 1);
            }
        }
        Commands::Suggest { note, apply } => {
            let scan = service.scan(root)?;
            let vocabulary = rank(&scan, config.vocabulary_size);
            let change = service.suggest(&note, &vocabulary)?;
            prompt::print_change(&change);
            if apply && !change.reconciliation.is_noop() {
                service.apply(&change)?;
                println!("applied: {}", display_tags(&change.reconciliation.final_tags));
            }
        }
        Commands::Run { auto, folder, .. } => {
            let mut confirm: Box<dyn Confirm> = if auto {
                Box::new(AutoApprove)
            } else {
                Box::new(TerminalConfirm::default())
            };
            let report = service.run(root, folder.as_deref(), confirm.as_mut())?;
            print_report(&report);
        }
    }
    Ok(())
}

fn print_scan(scan: &IndexResult) {
    println!(
        "notes: {}  unique tags: {}  unreadable: {}  malformed headers: {}",
        scan.files.len(),
        scan.index.unique_tags(),
        scan.failures.len(),
        scan.malformed_headers.len()
    );
    for failure in &scan.failures {
        println!("  skipped {}: {}", failure.path.display(), failure.reason);
    }
    for path in &scan.malformed_headers {
        println!("  malformed header: {}", path.display());
    }
}

fn print_report(report: &RunReport) {
    println!(
        "targets: {}  cached: {}  applied: {}  skipped: {}  ignored: {}  unchanged: {}  \
         no suggestion: {}  failed: {}  changed during run: {}",
        report.targets,
        report.cached,
        report.applied,
        report.skipped,
        report.ignored,
        report.unchanged,
        report.no_suggestion,
        report.failed,
        report.conflicted
    );
    if report.aborted {
        println!("run stopped by operator");
    }
}
