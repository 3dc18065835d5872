// src/exec/command.rs

//! Checks whose steps are shell commands.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::CheckConfig;
use crate::exec::Check;
use crate::run::{RunBuilder, RunDefinition, RunResult, StepDefinition};

/// A check that runs one shell command per step, in order.
///
/// A step passes when its command exits with status 0 within the step's
/// latency budget. The first failing command fails its step and stops the
/// run; the remaining steps are recorded as never run.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    definition: Arc<RunDefinition>,
    commands: Vec<String>,
}

impl CommandCheck {
    /// `commands` must line up with `definition.steps`.
    pub fn new(definition: Arc<RunDefinition>, commands: Vec<String>) -> Result<Self> {
        if commands.len() != definition.steps.len() {
            bail!(
                "check '{}' has {} steps but {} commands",
                definition.name,
                definition.steps.len(),
                commands.len()
            );
        }
        Ok(Self {
            definition,
            commands,
        })
    }

    pub fn from_config(name: &str, cfg: &CheckConfig) -> Result<Self> {
        Self::new(Arc::new(cfg.to_definition(name)), cfg.commands())
    }

    async fn run(&self) -> Result<RunResult> {
        let mut builder = RunBuilder::new(Arc::clone(&self.definition))?;

        for (step, cmd) in self.definition.steps.iter().zip(self.commands.iter()) {
            builder.start_next_step()?;

            match run_step_command(&self.definition.name, step, cmd).await {
                Ok(()) => builder.step_done()?,
                Err(err) => {
                    warn!(
                        check = %self.definition.name,
                        step = %step.name,
                        error = %format!("{err:#}"),
                        "step command failed"
                    );
                    builder.fail_step(format!("{err:#}"))?;
                    break;
                }
            }
        }

        Ok(builder.finish_run())
    }
}

impl Check for CommandCheck {
    fn definition(&self) -> Arc<RunDefinition> {
        Arc::clone(&self.definition)
    }

    fn execute(&self) -> Pin<Box<dyn Future<Output = Result<RunResult>> + Send + '_>> {
        Box::pin(self.run())
    }
}

/// Run a single step command to completion.
async fn run_step_command(check: &str, step: &StepDefinition, cmd: &str) -> Result<()> {
    info!(check = %check, step = %step.name, cmd = %cmd, "starting step command");

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = command
        .output()
        .await
        .with_context(|| format!("spawning command for step '{}'", step.name))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(check = %check, step = %step.name, "stdout: {}", line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!(check = %check, step = %step.name, "stderr: {}", line);
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        bail!("command for step '{}' exited with status {}", step.name, code);
    }

    Ok(())
}
