// tests/command_check.rs
#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{definition, init_tracing};
use deepcheck::exec::{Check, CommandCheck};
use deepcheck::run::NEVER_RUN_REASON;
use deepcheck::runner::CheckRegistry;
use deepcheck::types::RunStatus;
use deepcheck_test_utils::builders::{CheckConfigBuilder, ConfigFileBuilder};

#[tokio::test]
async fn passing_commands_pass_every_step() {
    init_tracing();
    let cfg = CheckConfigBuilder::new()
        .step("one", 10_000, "true")
        .step("two", 10_000, "echo hello")
        .build();
    let check = CommandCheck::from_config("shell", &cfg).unwrap();

    let result = check.execute().await.unwrap();

    assert_eq!(result.check_name(), "shell");
    assert_eq!(result.status(), RunStatus::Ok);
    assert!(result.steps.iter().all(|s| s.status == RunStatus::Ok));
}

#[tokio::test]
async fn failing_command_stops_the_run() {
    init_tracing();
    let cfg = CheckConfigBuilder::new()
        .step("one", 10_000, "true")
        .step("two", 10_000, "exit 3")
        .step("three", 10_000, "true")
        .build();
    let check = CommandCheck::from_config("shell", &cfg).unwrap();

    let result = check.execute().await.unwrap();

    assert_eq!(result.steps[0].status, RunStatus::Ok);
    assert_eq!(result.steps[1].status, RunStatus::Failed);
    let reason = result.steps[1].fail_reason.as_deref().unwrap();
    assert!(reason.contains("step 'two'"), "reason: {reason}");
    assert!(reason.contains("status 3"), "reason: {reason}");
    assert_eq!(result.steps[2].status, RunStatus::NeverRun);
    assert_eq!(result.steps[2].fail_reason.as_deref(), Some(NEVER_RUN_REASON));
    assert_eq!(result.status(), RunStatus::Failed);
}

#[tokio::test]
async fn slow_command_exceeds_its_budget() {
    init_tracing();
    let cfg = CheckConfigBuilder::new().step("slow", 5, "sleep 0.2").build();
    let check = CommandCheck::from_config("shell", &cfg).unwrap();

    let result = check.execute().await.unwrap();

    assert_eq!(result.steps[0].status, RunStatus::Failed);
    assert!(result.steps[0]
        .fail_reason
        .as_deref()
        .unwrap()
        .contains("exceeded the allowed latency of 5 ms."));
}

#[test]
fn command_count_must_match_steps() {
    let err = CommandCheck::new(definition("c", &[10, 10]), vec!["true".to_string()]).unwrap_err();
    assert!(err.to_string().contains("2 steps but 1 commands"));
}

#[test]
fn registry_is_built_from_config() {
    let cfg = ConfigFileBuilder::new()
        .with_check("a", CheckConfigBuilder::new().step("s", 10, "true").build())
        .with_check("b", CheckConfigBuilder::new().step("s", 10, "true").build())
        .build();

    let registry = CheckRegistry::from_config(&cfg).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
    let def = registry.get("a").unwrap().definition();
    assert_eq!(def, Arc::new(cfg.definition("a").unwrap()));
    assert!(registry.get("c").is_none());
}
