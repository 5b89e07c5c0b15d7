use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tally_core::fingerprint;
use tally_finance::{CategoryTable, Dataset};
use tally_ingest::{ingest_data_root, scanner::bank_dirs, BatchOutcome, DescriptorStore};

mod config;
mod report;

use config::{load_config, TallyConfig};
use report::VerifyReport;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Normalize bank-statement CSV exports")]
struct Cli {
    /// Config file (default: ./tally.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory with one subdirectory of statements per bank
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Directory with <bank>_schema.json descriptors
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match and normalize every statement; fail on unmatched files or high error rates
    Verify {
        /// Largest tolerated share of skipped rows in any one file
        #[arg(long)]
        max_error_rate: Option<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List loaded banks and their formats
    Schemas,

    /// Write the combined normalized dataset as CSV
    Export {
        #[arg(long)]
        out: PathBuf,

        /// Keep card payments and transfers in the output
        #[arg(long)]
        include_payments: bool,
    },

    /// Show the normalized category distribution
    Categories {
        /// Only list raw categories no keyword mapped
        #[arg(long)]
        unmapped: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr).compact())
        .init();

    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(p) = cli.data_root {
        cfg.data_root = p;
    }
    if let Some(p) = cli.config_dir {
        cfg.config_dir = p;
    }

    match cli.command {
        Command::Verify {
            max_error_rate,
            json,
        } => {
            if let Some(rate) = max_error_rate {
                cfg.max_error_rate = rate;
            }
            cfg.validate()?;
            verify(&cfg, json)
        }
        Command::Schemas => {
            schemas(&cfg)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Export {
            out,
            include_payments,
        } => {
            export(&cfg, &out, include_payments)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Categories { unmapped } => {
            categories(&cfg, unmapped)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_store(cfg: &TallyConfig) -> Result<DescriptorStore> {
    if !cfg.config_dir.is_dir() {
        bail!("config directory not found: {}", cfg.config_dir.display());
    }
    let banks = if cfg.data_root.is_dir() {
        bank_dirs(&cfg.data_root)?
    } else {
        Vec::new()
    };
    Ok(DescriptorStore::load(
        &cfg.config_dir,
        banks.iter().map(String::as_str),
    ))
}

fn ingest(cfg: &TallyConfig) -> Result<BatchOutcome> {
    let store = load_store(cfg)?;
    ingest_data_root(&store, &cfg.data_root)
        .with_context(|| format!("scan {}", cfg.data_root.display()))
}

fn build_dataset(cfg: &TallyConfig) -> Result<(Dataset, CategoryTable)> {
    let rules = cfg.payment_rules()?;
    let table = cfg.category_table()?;
    let outcome = ingest(cfg)?;
    Ok((Dataset::build(outcome.into_rows(), &rules, &table), table))
}

fn verify(cfg: &TallyConfig, json: bool) -> Result<ExitCode> {
    let outcome = ingest(cfg)?;
    let report = VerifyReport::new(&outcome, cfg.max_error_rate);

    let mut stdout = io::stdout().lock();
    if json {
        report.write_json(&mut stdout)?;
    } else {
        report.write_text(&mut stdout)?;
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn schemas(cfg: &TallyConfig) -> Result<()> {
    let store = load_store(cfg)?;
    let info = store.schema_info();
    if info.is_empty() {
        println!("No format descriptors in {}", store.config_dir().display());
    }
    for s in info {
        println!("{}: {}", s.bank, s.formats.join(", "));
    }
    for e in store.failures() {
        println!("{}: ERROR {}", e.bank(), e);
    }
    Ok(())
}

fn export(cfg: &TallyConfig, out: &Path, include_payments: bool) -> Result<()> {
    let (dataset, _) = build_dataset(cfg)?;
    let records = dataset.view(cfg.filter_payments && !include_payments);

    let mut w = csv::Writer::from_path(out).with_context(|| format!("create {}", out.display()))?;
    w.write_record([
        "fingerprint",
        "date",
        "amount",
        "category",
        "normalized_category",
        "description",
        "bank",
        "source_file",
        "is_payment",
        "payment_rule",
    ])?;
    for r in &records {
        w.write_record([
            fingerprint(r),
            r.date.format("%Y-%m-%d").to_string(),
            r.amount.to_string(),
            r.category.clone(),
            r.normalized_category.clone(),
            r.description.clone(),
            r.bank.clone(),
            r.source_file.clone(),
            r.is_payment.to_string(),
            r.payment_rule.clone().unwrap_or_default(),
        ])?;
    }
    w.flush().with_context(|| format!("write {}", out.display()))?;

    info!(
        "Wrote {} records to {} ({} total)",
        records.len(),
        out.display(),
        dataset.len()
    );
    Ok(())
}

fn categories(cfg: &TallyConfig, unmapped: bool) -> Result<()> {
    let (dataset, table) = build_dataset(cfg)?;

    if unmapped {
        let names = dataset.unmapped_categories(&table);
        if names.is_empty() {
            println!("Every raw category mapped.");
        }
        for name in names {
            println!("{name}");
        }
        return Ok(());
    }

    for t in dataset.category_totals(cfg.filter_payments) {
        let label = if t.category.is_empty() {
            "(none)"
        } else {
            t.category.as_str()
        };
        println!("{:<24} {:>6} {:>12}", label, t.count, t.total);
    }
    Ok(())
}
