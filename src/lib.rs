// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod run;
pub mod runner;
pub mod sink;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::cli::{CliArgs, Command, OutputFormat};
use crate::config::{ConfigFile, default_config_path, load_and_validate};
use crate::run::RunResult;
use crate::runner::{CheckRegistry, CheckRunner, ExclusiveRunner, LocalKeyedLock, Orchestrator};
use crate::sink::{
    ChannelBroadcaster, FailedRun, FileRunStore, MemoryRunStore, RunQuery, RunRecord, RunStore,
};
use crate::types::{RunMethod, RunStatus, StoreMode};

/// High-level entry point used by `main.rs`.
///
/// Returns `true` when every run that was executed passed.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = args
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;
    let store = build_store(&cfg, &config_path);

    match args.command {
        Command::List => {
            print_checks(&cfg);
            Ok(true)
        }
        Command::Run {
            name,
            format,
            method,
        } => {
            let runner = build_runner(&cfg, Arc::clone(&store))?;
            let result = runner.execute_by_name(&name, method).await?;
            print_result(&result, format)?;
            Ok(result.status() == RunStatus::Ok)
        }
        Command::RunAll { format, method } => run_all(&cfg, store, format, method).await,
        Command::History {
            check,
            take,
            skip,
            failed,
        } => {
            let query = RunQuery {
                check,
                take,
                skip,
                ..RunQuery::default()
            };
            if failed {
                for run in store.failed_runs(&query)? {
                    print_failed_run(&run);
                }
            } else {
                for record in store.runs(&query)? {
                    print_record(&record);
                }
            }
            Ok(true)
        }
        Command::Status { steps } => {
            print_status(&cfg, store.as_ref(), steps)?;
            Ok(true)
        }
        Command::Prune => {
            let (success_cutoff, failed_cutoff) = cfg.retention().cutoffs(chrono::Utc::now());
            let removed = store.prune(success_cutoff, failed_cutoff)?;
            println!("removed {removed} run(s)");
            Ok(true)
        }
    }
}

type CliRunner =
    ExclusiveRunner<Orchestrator<Arc<dyn RunStore>, ChannelBroadcaster>, LocalKeyedLock>;

/// Wire registry → orchestrator → single-flight guard.
fn build_runner(cfg: &ConfigFile, store: Arc<dyn RunStore>) -> Result<CliRunner> {
    build_runner_with(cfg, store, ChannelBroadcaster::default())
}

fn build_runner_with(
    cfg: &ConfigFile,
    store: Arc<dyn RunStore>,
    broadcaster: ChannelBroadcaster,
) -> Result<CliRunner> {
    let registry = Arc::new(CheckRegistry::from_config(cfg)?);
    debug!(checks = registry.len(), "check registry built");

    let orchestrator = Orchestrator::new(Arc::clone(&registry), store, broadcaster);
    Ok(ExclusiveRunner::new(
        orchestrator,
        LocalKeyedLock::new(),
        registry,
    ))
}

fn build_store(cfg: &ConfigFile, config_path: &Path) -> Arc<dyn RunStore> {
    match cfg.config().store {
        StoreMode::Memory => Arc::new(MemoryRunStore::new()),
        StoreMode::File => {
            let path = config_root_dir(config_path).join(&cfg.config().store_path);
            info!(path = ?path, "using file run store");
            Arc::new(FileRunStore::new(path))
        }
    }
}

/// Run every check at once; records are printed as they are broadcast.
async fn run_all(
    cfg: &ConfigFile,
    store: Arc<dyn RunStore>,
    format: OutputFormat,
    method: RunMethod,
) -> Result<bool> {
    let broadcaster = ChannelBroadcaster::default();
    let mut finished = broadcaster.subscribe();
    let runner = Arc::new(build_runner_with(cfg, store, broadcaster)?);

    let printer = tokio::spawn(async move {
        loop {
            match finished.recv().await {
                Ok(record) if format == OutputFormat::Text => print_record(&record),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "result printer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut runs = JoinSet::new();
    for name in cfg.checks().keys().cloned() {
        let runner = Arc::clone(&runner);
        runs.spawn(async move { runner.execute_by_name(&name, method).await });
    }

    let mut all_ok = true;
    while let Some(joined) = runs.join_next().await {
        match joined.context("check task panicked")? {
            Ok(result) => {
                all_ok &= result.status() == RunStatus::Ok;
                if format == OutputFormat::Json {
                    print_result(&result, format)?;
                }
            }
            Err(err) => {
                all_ok = false;
                error!(error = %err, "check run failed");
            }
        }
    }

    // Dropping the last runner closes the broadcast channel and ends the printer.
    drop(runner);
    printer.await.context("result printer panicked")?;

    Ok(all_ok)
}

/// Resolve paths in the config relative to the config file's directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn print_checks(cfg: &ConfigFile) {
    println!("checks ({}):", cfg.checks().len());
    for (name, check) in cfg.checks().iter() {
        println!("  - {name}");
        if !check.description.is_empty() {
            println!("      description: {}", check.description);
        }
        if !check.schedule.is_empty() {
            println!("      schedule: {}", check.schedule);
        }
        for step in check.steps.iter() {
            println!("      step {} (budget {} ms): {}", step.name, step.latency_ms, step.cmd);
        }
    }
}

fn print_result(result: &RunResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Text => {
            println!(
                "{}: {} ({} ms)",
                result.check_name(),
                result.status(),
                result.elapsed_ms
            );
            for step in result.steps.iter() {
                match step.fail_reason.as_deref() {
                    Some(reason) => println!(
                        "  - {}: {} ({} ms) {}",
                        step.step.name, step.status, step.elapsed_ms, reason
                    ),
                    None => println!(
                        "  - {}: {} ({} ms)",
                        step.step.name, step.status, step.elapsed_ms
                    ),
                }
            }
        }
    }
    Ok(())
}

fn print_record(record: &RunRecord) {
    println!(
        "{} {} {}: {} ({} ms, {})",
        record.started_at.to_rfc3339(),
        record.id,
        record.check,
        record.status(),
        record.elapsed_ms,
        record.run_method
    );
    for step in record.steps.iter() {
        match step.fail_reason.as_deref() {
            Some(reason) => println!("  - {}: {} {}", step.step, step.status, reason),
            None => println!("  - {}: {}", step.step, step.status),
        }
    }
}

fn print_failed_run(run: &FailedRun) {
    println!(
        "{} {} {}: {} ({} ms)",
        run.started_at.to_rfc3339(),
        run.id,
        run.check,
        run.fail_reason,
        run.elapsed_ms
    );
}

/// Latest run per configured check, then the recent record of each step
/// rendered oldest to newest as a strip of `+` (ok), `x` (failed), `.` (never run).
fn print_status(cfg: &ConfigFile, store: &dyn RunStore, per_step: usize) -> Result<()> {
    let names: Vec<&str> = cfg.checks().keys().map(String::as_str).collect();
    let latest = store.latest_per_check(&names)?;

    println!("latest runs:");
    for (name, record) in names.iter().zip(latest.iter()) {
        match record {
            Some(record) => println!(
                "  - {name}: {} at {} ({} ms)",
                record.status(),
                record.started_at.to_rfc3339(),
                record.elapsed_ms
            ),
            None => println!("  - {name}: no runs"),
        }
    }

    println!("recent steps:");
    for ((check, step), records) in store.recent_steps(per_step)? {
        let strip: String = records
            .iter()
            .rev()
            .map(|r| match r.status {
                RunStatus::Ok => '+',
                RunStatus::Failed => 'x',
                RunStatus::NeverRun => '.',
            })
            .collect();
        println!("  - {check}/{step}: {strip}");
    }
    Ok(())
}
