//! # Table Archiver
//!
//! Keeps cold-storage snapshots of growing tables and a daily summary of them.
//!
//! - `weekly`: exports every configured table to a flat file with keyset
//!   pagination and partial-batch recovery, then archives each file.
//! - `daily` (default): gathers row-count statistics and mails an HTML report.
//!
//! This application follows the **Hexagonal Architecture** (Ports and Adapters)
//! to keep the export logic independent of the store, archive and mailer.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::runtime::RuntimeContext;
use crate::config::{AppConfig, CliArgs, Mode};
use clap::Parser;
use log::{error, info};
use std::process;
use std::time::Instant;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = if let Some(config_path) = &args.config {
        match AppConfig::from_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config: {}", e);
                process::exit(1);
            }
        }
    } else {
        AppConfig::default()
    };

    // Merge CLI overrides, then fill secrets from the environment
    config.merge_cli(&args);
    config.apply_env(|k| std::env::var(k).ok());

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Initialize Hexagonal Components
    let ctx = match RuntimeContext::init(config) {
        Ok(c) => c,
        Err(e) => {
            error!("Initialization failed: {}", e);
            process::exit(1);
        }
    };

    let today = chrono::Local::now().date_naive();
    let code = match args.mode {
        Mode::Weekly => run_weekly(&ctx, today),
        Mode::Daily => run_daily(&ctx, today),
    };
    process::exit(code);
}

fn run_weekly(ctx: &RuntimeContext, today: chrono::NaiveDate) -> i32 {
    let start = Instant::now();
    let pipeline = match ctx.pipeline(today) {
        Ok(p) => p,
        Err(e) => {
            error!("Could not set up the archive pipeline: {}", e);
            return 1;
        }
    };

    info!("Starting weekly backup...");
    let outcomes = pipeline.run(&ctx.config.export.tables);
    for o in &outcomes {
        info!(
            "{}: {} ({} rows){}",
            o.table,
            o.status,
            o.rows,
            o.error.as_deref().map(|e| format!(" - {}", e)).unwrap_or_default()
        );
    }

    match pipeline.generate_report(&outcomes, start.elapsed().as_secs_f64()) {
        Ok(path) => info!("Run report written to {}", path.display()),
        Err(e) => error!("Could not write run report: {}", e),
    }

    let archived = outcomes.iter().filter(|o| o.is_archived()).count();
    info!(
        "Weekly backup finished. {}/{} tables archived.",
        archived,
        outcomes.len()
    );
    if archived == outcomes.len() {
        0
    } else {
        1
    }
}

fn run_daily(ctx: &RuntimeContext, today: chrono::NaiveDate) -> i32 {
    let notifier = match ctx.notifier() {
        Ok(n) => n,
        Err(e) => {
            error!("Cannot send the daily report: {}", e);
            return 1;
        }
    };
    match ctx.daily_report().send(notifier.as_ref(), today) {
        Ok(_) => {
            info!("Daily report email sent successfully!");
            0
        }
        Err(e) => {
            error!("Failed to send email: {}", e);
            1
        }
    }
}
