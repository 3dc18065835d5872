// tests/run_store.rs

use chrono::{DateTime, TimeDelta, Utc};
use deepcheck::sink::{FileRunStore, MemoryRunStore, RunQuery, RunRecord, RunStore, StepRecord};
use deepcheck::types::{RunMethod, RunStatus};
use tempfile::tempdir;
use uuid::Uuid;

fn step(name: &str, started_at: DateTime<Utc>, status: RunStatus) -> StepRecord {
    StepRecord {
        step: name.to_string(),
        started_at,
        elapsed_ms: 10,
        status,
        fail_reason: match status {
            RunStatus::Ok => None,
            _ => Some("nope".to_string()),
        },
    }
}

fn record(check: &str, started_at: DateTime<Utc>, statuses: &[RunStatus]) -> RunRecord {
    RunRecord {
        id: Uuid::now_v7(),
        check: check.to_string(),
        started_at,
        elapsed_ms: 100,
        run_method: RunMethod::Scheduled,
        steps: statuses
            .iter()
            .enumerate()
            .map(|(i, s)| step(&format!("step{}", i + 1), started_at, *s))
            .collect(),
    }
}

fn hours_ago(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now - TimeDelta::hours(hours)
}

fn exercise_store(store: &dyn RunStore) {
    let now = Utc::now();
    for i in 0..5 {
        store
            .save(record("a", hours_ago(now, i), &[RunStatus::Ok]))
            .unwrap();
    }
    store.save(record("b", now, &[RunStatus::Failed])).unwrap();

    // Newest first, filtered by check.
    let runs = store.runs(&RunQuery::for_check("a")).unwrap();
    assert_eq!(runs.len(), 5);
    assert!(runs.windows(2).all(|w| w[0].started_at >= w[1].started_at));
    assert!(runs.iter().all(|r| r.check == "a"));

    // A blank check filter matches everything.
    let all = store
        .runs(&RunQuery {
            check: Some("  ".to_string()),
            ..RunQuery::default()
        })
        .unwrap();
    assert_eq!(all.len(), 6);

    // Paging.
    let page = store
        .runs(&RunQuery {
            check: Some("a".to_string()),
            take: 2,
            skip: 1,
            ..RunQuery::default()
        })
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].started_at, runs[1].started_at);
    assert_eq!(page[1].started_at, runs[2].started_at);

    // Time window (inclusive bounds).
    let window = store
        .runs(&RunQuery {
            check: Some("a".to_string()),
            from: Some(hours_ago(now, 3)),
            to: Some(hours_ago(now, 1)),
            ..RunQuery::default()
        })
        .unwrap();
    assert_eq!(window.len(), 3);
}

#[test]
fn memory_store_queries() {
    exercise_store(&MemoryRunStore::new());
}

#[test]
fn file_store_queries() {
    let dir = tempdir().unwrap();
    exercise_store(&FileRunStore::new(dir.path().join("nested/runs.jsonl")));
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("runs.jsonl");
    let saved = record("a", Utc::now(), &[RunStatus::Ok, RunStatus::Failed]);

    FileRunStore::new(&path).save(saved.clone()).unwrap();

    let reopened = FileRunStore::new(&path);
    let runs = reopened.runs(&RunQuery::default()).unwrap();
    assert_eq!(runs, vec![saved]);
}

#[test]
fn missing_file_is_an_empty_store() {
    let dir = tempdir().unwrap();
    let store = FileRunStore::new(dir.path().join("absent.jsonl"));

    assert!(store.runs(&RunQuery::default()).unwrap().is_empty());
    assert_eq!(store.last_step("a", "step1").unwrap(), None);
}

#[test]
fn default_page_size_is_capped() {
    let store = MemoryRunStore::new();
    let now = Utc::now();
    for i in 0..150 {
        store
            .save(record("a", now - TimeDelta::seconds(i), &[RunStatus::Ok]))
            .unwrap();
    }

    assert_eq!(store.runs(&RunQuery::default()).unwrap().len(), 100);
    let big = RunQuery {
        take: 5_000,
        ..RunQuery::default()
    };
    assert_eq!(store.runs(&big).unwrap().len(), 150);
}

#[test]
fn last_step_picks_most_recent_run() {
    let store = MemoryRunStore::new();
    let now = Utc::now();
    store
        .save(record("a", hours_ago(now, 2), &[RunStatus::Ok, RunStatus::Ok]))
        .unwrap();
    store
        .save(record("a", hours_ago(now, 1), &[RunStatus::Ok, RunStatus::Failed]))
        .unwrap();
    store
        .save(record("b", now, &[RunStatus::Ok, RunStatus::Ok]))
        .unwrap();

    let last = store.last_step("a", "step2").unwrap().unwrap();
    assert_eq!(last.status, RunStatus::Failed);
    assert_eq!(last.started_at, hours_ago(now, 1));

    assert_eq!(store.last_step("a", "step9").unwrap(), None);
    assert_eq!(store.last_step("c", "step1").unwrap(), None);
}

fn exercise_prune(store: &dyn RunStore) {
    let now = Utc::now();
    // Fresh, kept regardless of status.
    store
        .save(record("fresh-ok", now, &[RunStatus::Ok]))
        .unwrap();
    store
        .save(record("fresh-bad", now, &[RunStatus::Failed]))
        .unwrap();
    // Two days old: passing runs expire, failing ones are kept.
    store
        .save(record("old-ok", hours_ago(now, 48), &[RunStatus::Ok]))
        .unwrap();
    store
        .save(record("old-bad", hours_ago(now, 48), &[RunStatus::Ok, RunStatus::Failed]))
        .unwrap();
    // Ten days old: everything expires.
    store
        .save(record("ancient-bad", hours_ago(now, 240), &[RunStatus::Failed]))
        .unwrap();

    let removed = store
        .prune(hours_ago(now, 24), hours_ago(now, 24 * 7))
        .unwrap();
    assert_eq!(removed, 2);

    let mut left: Vec<String> = store
        .runs(&RunQuery::default())
        .unwrap()
        .into_iter()
        .map(|r| r.check)
        .collect();
    left.sort();
    assert_eq!(left, vec!["fresh-bad", "fresh-ok", "old-bad"]);

    // Nothing left to prune.
    assert_eq!(store.prune(hours_ago(now, 24), hours_ago(now, 24 * 7)).unwrap(), 0);
}

#[test]
fn memory_store_prunes_by_status_and_age() {
    exercise_prune(&MemoryRunStore::new());
}

#[test]
fn file_store_prunes_by_status_and_age() {
    let dir = tempdir().unwrap();
    exercise_prune(&FileRunStore::new(dir.path().join("runs.jsonl")));
}

#[test]
fn corrupt_line_is_reported_with_location() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("runs.jsonl");
    std::fs::write(&path, "{not json}\n").unwrap();

    let err = FileRunStore::new(&path)
        .runs(&RunQuery::default())
        .unwrap_err();
    assert!(format!("{err:#}").contains(":1"), "error: {err:#}");
}

fn with_reason(mut record: RunRecord, step: usize, reason: &str) -> RunRecord {
    record.steps[step].fail_reason = Some(reason.to_string());
    record
}

fn exercise_failed_runs(store: &dyn RunStore) {
    let now = Utc::now();
    store
        .save(record("a", hours_ago(now, 4), &[RunStatus::Ok]))
        .unwrap();
    store
        .save(with_reason(
            record("a", hours_ago(now, 3), &[RunStatus::Failed, RunStatus::Failed]),
            0,
            "   ",
        ))
        .unwrap();
    store
        .save(with_reason(
            record("a", hours_ago(now, 2), &[RunStatus::Ok, RunStatus::Failed]),
            1,
            "timeout",
        ))
        .unwrap();
    store
        .save(with_reason(
            record("b", hours_ago(now, 1), &[RunStatus::Failed]),
            0,
            "refused",
        ))
        .unwrap();
    // Never-run steps carry a reason but are not failures.
    store
        .save(record("c", now, &[RunStatus::NeverRun]))
        .unwrap();
    // Only a blank reason among the failed steps.
    store
        .save(with_reason(record("d", now, &[RunStatus::Failed]), 0, ""))
        .unwrap();

    let failed = store.failed_runs(&RunQuery::default()).unwrap();
    let summary: Vec<(&str, &str)> = failed
        .iter()
        .map(|f| (f.check.as_str(), f.fail_reason.as_str()))
        .collect();
    // Newest first; the blank first reason is skipped in favour of the second step's.
    assert_eq!(summary, vec![("b", "refused"), ("a", "timeout"), ("a", "nope")]);

    let only_a = store.failed_runs(&RunQuery::for_check("a")).unwrap();
    assert_eq!(only_a.len(), 2);
    assert_eq!(only_a[0].started_at, hours_ago(now, 2));

    let page = store
        .failed_runs(&RunQuery {
            take: 1,
            skip: 1,
            ..RunQuery::default()
        })
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].fail_reason, "timeout");
}

#[test]
fn memory_store_lists_failed_runs() {
    exercise_failed_runs(&MemoryRunStore::new());
}

#[test]
fn file_store_lists_failed_runs() {
    let dir = tempdir().unwrap();
    exercise_failed_runs(&FileRunStore::new(dir.path().join("runs.jsonl")));
}

fn exercise_latest_per_check(store: &dyn RunStore) {
    let now = Utc::now();
    store
        .save(record("a", hours_ago(now, 2), &[RunStatus::Ok]))
        .unwrap();
    store
        .save(record("a", hours_ago(now, 1), &[RunStatus::Failed]))
        .unwrap();
    store
        .save(record("b", hours_ago(now, 5), &[RunStatus::Ok]))
        .unwrap();

    let latest = store.latest_per_check(&["b", "missing", "a"]).unwrap();
    assert_eq!(latest.len(), 3);
    assert_eq!(latest[0].as_ref().unwrap().started_at, hours_ago(now, 5));
    assert_eq!(latest[1], None);
    let a = latest[2].as_ref().unwrap();
    assert_eq!(a.started_at, hours_ago(now, 1));
    assert_eq!(a.status(), RunStatus::Failed);

    assert!(store.latest_per_check(&[]).unwrap().is_empty());
}

#[test]
fn memory_store_reports_latest_per_check() {
    exercise_latest_per_check(&MemoryRunStore::new());
}

#[test]
fn file_store_reports_latest_per_check() {
    let dir = tempdir().unwrap();
    exercise_latest_per_check(&FileRunStore::new(dir.path().join("runs.jsonl")));
}

#[test]
fn latest_per_check_on_an_empty_store_is_all_none() {
    let store = MemoryRunStore::new();
    assert_eq!(store.latest_per_check(&["a", "b"]).unwrap(), vec![None, None]);
}

fn exercise_recent_steps(store: &dyn RunStore) {
    let now = Utc::now();
    for i in 0..4 {
        let status = if i == 0 { RunStatus::Failed } else { RunStatus::Ok };
        store
            .save(record("a", hours_ago(now, i), &[RunStatus::Ok, status]))
            .unwrap();
    }
    // Same step name under another check stays separate.
    store
        .save(record("b", now, &[RunStatus::NeverRun]))
        .unwrap();

    let recent = store.recent_steps(3).unwrap();
    let keys: Vec<(&str, &str)> = recent
        .keys()
        .map(|(check, step)| (check.as_str(), step.as_str()))
        .collect();
    assert_eq!(keys, vec![("a", "step1"), ("a", "step2"), ("b", "step1")]);

    let a2 = &recent[&("a".to_string(), "step2".to_string())];
    assert_eq!(a2.len(), 3);
    assert!(a2.windows(2).all(|w| w[0].started_at >= w[1].started_at));
    assert_eq!(a2[0].status, RunStatus::Failed);
    assert_eq!(a2[0].started_at, now);
    assert_eq!(a2[2].started_at, hours_ago(now, 2));

    let b1 = &recent[&("b".to_string(), "step1".to_string())];
    assert_eq!(b1.len(), 1);
    assert_eq!(b1[0].status, RunStatus::NeverRun);

    assert!(store.recent_steps(0).unwrap().is_empty());
}

#[test]
fn memory_store_keeps_recent_steps() {
    exercise_recent_steps(&MemoryRunStore::new());
}

#[test]
fn file_store_keeps_recent_steps() {
    let dir = tempdir().unwrap();
    exercise_recent_steps(&FileRunStore::new(dir.path().join("runs.jsonl")));
}
