//! loan-audit: offline audit and repair tool for a loan book database.
//!
//! Usage:
//!   loan-audit summary    --db book.db
//!   loan-audit drift      --db book.db
//!   loan-audit reconcile  --db book.db
//!   loan-audit remainders --db book.db
//!   loan-audit interest   --db book.db [--start 2025-01-01] [--end 2025-12-31] [--group S01]
//!
//! All reports are printed as JSON. `reconcile` is the only command that
//! writes; everything else is read-only. `--config path.json` overrides
//! the built-in defaults.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use loanbook_core::{
    LoanConfig, LoanStore, ReconciliationService, ReportingClock, StatsReporter,
};
use std::env;
use std::path::Path;

#[derive(serde::Serialize)]
struct BookSummary {
    global: loanbook_core::AggregateRecord,
    groups: Vec<GroupSummary>,
}

#[derive(serde::Serialize)]
struct GroupSummary {
    group_id: String,
    record: loanbook_core::AggregateRecord,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = match args.get(1) {
        Some(c) if !c.starts_with("--") => c.clone(),
        _ => bail!("usage: loan-audit <summary|drift|reconcile|remainders|interest> --db <path>"),
    };
    let db = flag_value(&args, "--db").context("--db <path> is required")?;

    let config = match flag_value(&args, "--config") {
        Some(path) => LoanConfig::load(Path::new(&path))
            .with_context(|| format!("load config {path}"))?,
        None => LoanConfig::default(),
    };
    let clock = ReportingClock::wall(config.daily_cutoff_hour);

    let store = LoanStore::open(&db)?;
    store.migrate(&config)?;

    let service = ReconciliationService::new(&store, &config, &clock);
    match command.as_str() {
        "summary" => {
            let reporter = StatsReporter::new(&store);
            let mut groups = Vec::new();
            for group_id in reporter.all_group_ids()? {
                if let Some(record) = reporter.get_group(&group_id)? {
                    groups.push(GroupSummary { group_id, record });
                }
            }
            let summary = BookSummary {
                global: reporter.get_global()?,
                groups,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "drift" => {
            let drift = service.find_aggregate_drift()?;
            println!("{}", serde_json::to_string_pretty(&drift)?);
        }
        "reconcile" => {
            let corrections = service.reconcile_all()?;
            let repaired = corrections.iter().filter(|c| c.corrected).count();
            log::info!("reconciled {} groups, {} repaired", corrections.len(), repaired);
            println!("{}", serde_json::to_string_pretty(&corrections)?);
        }
        "remainders" => {
            let remainders = service.trace_amount_remainders()?;
            println!("{}", serde_json::to_string_pretty(&remainders)?);
        }
        "interest" => {
            let start = date_flag(&args, "--start", NaiveDate::from_ymd_opt(2025, 1, 1))?;
            let end = date_flag(&args, "--end", Some(clock.reporting_date()))?;
            let group = flag_value(&args, "--group");
            let check = service.verify_interest_against_ledger(start, end, group.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
        other => bail!("unknown command '{other}'"),
    }

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn date_flag(args: &[String], flag: &str, default: Option<NaiveDate>) -> Result<NaiveDate> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse::<NaiveDate>()
            .with_context(|| format!("{flag} expects YYYY-MM-DD, got '{raw}'")),
        None => default.context("internal: missing default date"),
    }
}
