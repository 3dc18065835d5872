// src/sink/store.rs

//! Persistence for finished runs.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::sink::record::{FailedRun, RunRecord, StepRecord};
use crate::types::RunStatus;

/// Page size used when a query does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 100;
/// Largest page a query may ask for.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Filter for [`RunStore::runs`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct RunQuery {
    pub check: Option<String>,
    /// Inclusive lower bound on `started_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `started_at`.
    pub to: Option<DateTime<Utc>>,
    /// `0` means [`DEFAULT_PAGE_SIZE`]; clamped to [`MAX_PAGE_SIZE`].
    pub take: usize,
    pub skip: usize,
}

impl RunQuery {
    pub fn for_check(check: impl Into<String>) -> Self {
        Self {
            check: Some(check.into()),
            ..Self::default()
        }
    }

    fn page_size(&self) -> usize {
        match self.take {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    fn matches(&self, record: &RunRecord) -> bool {
        if let Some(check) = self.check.as_deref().map(str::trim) {
            if !check.is_empty() && record.check != check {
                return false;
            }
        }
        if self.from.is_some_and(|from| record.started_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.started_at > to) {
            return false;
        }
        true
    }
}

/// `(check, step)` pair used to group step records.
pub type StepKey = (String, String);

/// Abstract storage for finished runs.
pub trait RunStore: Send + Sync {
    fn save(&self, record: RunRecord) -> Result<()>;

    fn runs(&self, query: &RunQuery) -> Result<Vec<RunRecord>>;

    /// Most recent record of `step` within runs of `check`.
    fn last_step(&self, check: &str, step: &str) -> Result<Option<StepRecord>>;

    /// Runs matching `query` that have an explained failure, newest first.
    fn failed_runs(&self, query: &RunQuery) -> Result<Vec<FailedRun>>;

    /// Newest run of each of `checks`, in the same order.
    fn latest_per_check(&self, checks: &[&str]) -> Result<Vec<Option<RunRecord>>>;

    /// Up to `per_step` newest records of every step, keyed by `(check, step)`.
    fn recent_steps(&self, per_step: usize) -> Result<BTreeMap<StepKey, Vec<StepRecord>>>;

    /// Remove runs that finished before the cutoffs.
    ///
    /// - fully passing runs are removed once older than `success_cutoff`;
    /// - any run is removed once older than `failed_cutoff`.
    ///
    /// Returns the number of runs removed.
    fn prune(&self, success_cutoff: DateTime<Utc>, failed_cutoff: DateTime<Utc>) -> Result<usize>;
}

impl<T: RunStore + ?Sized> RunStore for std::sync::Arc<T> {
    fn save(&self, record: RunRecord) -> Result<()> {
        (**self).save(record)
    }

    fn runs(&self, query: &RunQuery) -> Result<Vec<RunRecord>> {
        (**self).runs(query)
    }

    fn last_step(&self, check: &str, step: &str) -> Result<Option<StepRecord>> {
        (**self).last_step(check, step)
    }

    fn failed_runs(&self, query: &RunQuery) -> Result<Vec<FailedRun>> {
        (**self).failed_runs(query)
    }

    fn latest_per_check(&self, checks: &[&str]) -> Result<Vec<Option<RunRecord>>> {
        (**self).latest_per_check(checks)
    }

    fn recent_steps(&self, per_step: usize) -> Result<BTreeMap<StepKey, Vec<StepRecord>>> {
        (**self).recent_steps(per_step)
    }

    fn prune(&self, success_cutoff: DateTime<Utc>, failed_cutoff: DateTime<Utc>) -> Result<usize> {
        (**self).prune(success_cutoff, failed_cutoff)
    }
}

/// Keeps records in memory only.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    records: Mutex<Vec<RunRecord>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RunRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RunStore for MemoryRunStore {
    fn save(&self, record: RunRecord) -> Result<()> {
        debug!(run_id = %record.id, check = %record.check, "stored run (memory)");
        self.lock().push(record);
        Ok(())
    }

    fn runs(&self, query: &RunQuery) -> Result<Vec<RunRecord>> {
        Ok(select_runs(&self.lock(), query))
    }

    fn last_step(&self, check: &str, step: &str) -> Result<Option<StepRecord>> {
        Ok(find_last_step(&self.lock(), check, step))
    }

    fn failed_runs(&self, query: &RunQuery) -> Result<Vec<FailedRun>> {
        Ok(select_failed(&self.lock(), query))
    }

    fn latest_per_check(&self, checks: &[&str]) -> Result<Vec<Option<RunRecord>>> {
        Ok(select_latest(&self.lock(), checks))
    }

    fn recent_steps(&self, per_step: usize) -> Result<BTreeMap<StepKey, Vec<StepRecord>>> {
        Ok(group_recent_steps(&self.lock(), per_step))
    }

    fn prune(&self, success_cutoff: DateTime<Utc>, failed_cutoff: DateTime<Utc>) -> Result<usize> {
        let mut records = self.lock();
        let removed = retain_fresh(&mut records, success_cutoff, failed_cutoff);
        if removed > 0 {
            info!(removed, "pruned old runs (memory)");
        }
        Ok(removed)
    }
}

/// Stores records as JSON lines in a single file.
///
/// Every call re-reads the file, so several processes may append to it; pruning
/// rewrites it in place.
#[derive(Debug)]
pub struct FileRunStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RunStore for FileRunStore {
    fn save(&self, record: RunRecord) -> Result<()> {
        let _held = self.lock();
        ensure_parent_dir(&self.path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening run store at {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &record).context("serializing run record")?;
        writeln!(writer)?;
        writer.flush()?;

        debug!(run_id = %record.id, check = %record.check, "stored run (file)");
        Ok(())
    }

    fn runs(&self, query: &RunQuery) -> Result<Vec<RunRecord>> {
        let records = load_all_records(&self.path)?;
        Ok(select_runs(&records, query))
    }

    fn last_step(&self, check: &str, step: &str) -> Result<Option<StepRecord>> {
        let records = load_all_records(&self.path)?;
        Ok(find_last_step(&records, check, step))
    }

    fn failed_runs(&self, query: &RunQuery) -> Result<Vec<FailedRun>> {
        let records = load_all_records(&self.path)?;
        Ok(select_failed(&records, query))
    }

    fn latest_per_check(&self, checks: &[&str]) -> Result<Vec<Option<RunRecord>>> {
        let records = load_all_records(&self.path)?;
        Ok(select_latest(&records, checks))
    }

    fn recent_steps(&self, per_step: usize) -> Result<BTreeMap<StepKey, Vec<StepRecord>>> {
        let records = load_all_records(&self.path)?;
        Ok(group_recent_steps(&records, per_step))
    }

    fn prune(&self, success_cutoff: DateTime<Utc>, failed_cutoff: DateTime<Utc>) -> Result<usize> {
        let _held = self.lock();
        let mut records = load_all_records(&self.path)?;
        let removed = retain_fresh(&mut records, success_cutoff, failed_cutoff);

        if removed > 0 {
            save_all_records(&self.path, &records)?;
            info!(removed, "pruned old runs (file)");
        }
        Ok(removed)
    }
}

fn select_runs(records: &[RunRecord], query: &RunQuery) -> Vec<RunRecord> {
    let mut matching: Vec<&RunRecord> = records.iter().filter(|r| query.matches(r)).collect();
    matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    matching
        .into_iter()
        .skip(query.skip)
        .take(query.page_size())
        .cloned()
        .collect()
}

fn find_last_step(records: &[RunRecord], check: &str, step: &str) -> Option<StepRecord> {
    records
        .iter()
        .filter(|r| r.check == check)
        .flat_map(|r| {
            r.steps
                .iter()
                .filter(|s| s.step == step)
                .map(move |s| (r.started_at, s))
        })
        .max_by(|(run_a, step_a), (run_b, step_b)| {
            run_a.cmp(run_b).then(step_a.started_at.cmp(&step_b.started_at))
        })
        .map(|(_, s)| s.clone())
}

fn select_failed(records: &[RunRecord], query: &RunQuery) -> Vec<FailedRun> {
    let mut failed: Vec<FailedRun> = records
        .iter()
        .filter(|r| query.matches(r))
        .filter_map(FailedRun::from_record)
        .collect();
    failed.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    failed
        .into_iter()
        .skip(query.skip)
        .take(query.page_size())
        .collect()
}

fn select_latest(records: &[RunRecord], checks: &[&str]) -> Vec<Option<RunRecord>> {
    checks
        .iter()
        .map(|check| {
            records
                .iter()
                .filter(|r| r.check == *check)
                .max_by_key(|r| r.started_at)
                .cloned()
        })
        .collect()
}

fn group_recent_steps(
    records: &[RunRecord],
    per_step: usize,
) -> BTreeMap<StepKey, Vec<StepRecord>> {
    let mut grouped: BTreeMap<StepKey, Vec<StepRecord>> = BTreeMap::new();
    for record in records {
        for step in record.steps.iter() {
            grouped
                .entry((record.check.clone(), step.step.clone()))
                .or_default()
                .push(step.clone());
        }
    }

    for steps in grouped.values_mut() {
        steps.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        steps.truncate(per_step);
    }
    grouped.retain(|_, steps| !steps.is_empty());
    grouped
}

fn retain_fresh(
    records: &mut Vec<RunRecord>,
    success_cutoff: DateTime<Utc>,
    failed_cutoff: DateTime<Utc>,
) -> usize {
    let before = records.len();
    records.retain(|r| {
        let finished = r.finished_at();
        let expired_success = finished < success_cutoff && r.status() == RunStatus::Ok;
        let expired_any = finished < failed_cutoff;
        !(expired_success || expired_any)
    });
    before - records.len()
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating run store directory at {:?}", parent))?;
        }
    }
    Ok(())
}

/// Load every record from the JSON-lines file at `path`.
fn load_all_records(path: &Path) -> Result<Vec<RunRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).with_context(|| format!("opening run store at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: RunRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parsing run record at {:?}:{}", path, line_no + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// Rewrite the JSON-lines file at `path` with `records`.
fn save_all_records(path: &Path, records: &[RunRecord]) -> Result<()> {
    ensure_parent_dir(path)?;

    let file = File::create(path).with_context(|| format!("creating run store at {:?}", path))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record).context("serializing run record")?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
