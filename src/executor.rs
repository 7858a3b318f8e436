use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, anyhow};
use serde::Serialize;
use tracing::{debug, info};

use crate::env_detect;
use crate::planner::{Plan, PlannedStep};
use crate::port_forward::{BackgroundProcess, PortForwards};
use crate::step::{CommandSpec, Step, StepValidationError};

/// The boundary between plans and the operating system.
pub trait CommandRunner {
    /// Run a command to completion with inherited stdio.
    fn run(&mut self, command: &CommandSpec) -> anyhow::Result<()>;

    /// Start a command without waiting for it.
    fn spawn(&mut self, command: &CommandSpec) -> anyhow::Result<Box<dyn BackgroundProcess>>;

    fn create_dir(&mut self, path: &Path) -> anyhow::Result<()>;

    fn has_command(&self, name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &CommandSpec) -> anyhow::Result<()> {
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .with_context(|| format!("running command: {command}"))?;

        if !status.success() {
            return Err(anyhow!("command exited with status {:?}", status.code()));
        }

        Ok(())
    }

    fn spawn(&mut self, command: &CommandSpec) -> anyhow::Result<Box<dyn BackgroundProcess>> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("starting background command: {command}"))?;
        Ok(Box::new(ChildProcess { child }))
    }

    fn create_dir(&mut self, path: &Path) -> anyhow::Result<()> {
        fs::create_dir(path).with_context(|| format!("creating directory {}", path.display()))
    }

    fn has_command(&self, name: &str) -> bool {
        env_detect::has_command(name)
    }
}

struct ChildProcess {
    child: Child,
}

impl BackgroundProcess for ChildProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        // Already exited on its own; only reaping is left.
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        self.child
            .kill()
            .with_context(|| format!("killing pid {}", self.child.id()))?;
        self.child.wait()?;
        Ok(())
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub completed_steps: usize,
    /// Port-forwards this plan left running in the registry.
    pub port_forwards_started: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("step {index} ({description}) is invalid: {source}")]
    InvalidStep {
        index: usize,
        description: String,
        source: StepValidationError,
    },
    #[error("Failed to execute: {description} (step {index}), Error: {message}")]
    StepFailed {
        index: usize,
        description: String,
        message: String,
    },
    #[error("writing progress: {0}")]
    Output(#[from] io::Error),
}

/// Run every step of `plan` in order, stopping at the first failure. The whole
/// plan is validated before the first command starts. Progress goes to `output`;
/// the caller reports the returned error.
pub fn execute_plan(
    plan: &Plan,
    runner: &mut dyn CommandRunner,
    forwards: &mut PortForwards,
    output: &mut dyn Write,
) -> Result<ExecutionResult, ExecutionError> {
    info!("executing '{}' ({} steps)", plan.name, plan.steps.len());
    if let Ok(json) = serde_json::to_string(plan) {
        debug!("plan: {json}");
    }

    for step in &plan.steps {
        step.step
            .validate()
            .map_err(|source| ExecutionError::InvalidStep {
                index: step.index,
                description: step.description.clone(),
                source,
            })?;
    }

    let forwards_before = forwards.len();
    let mut stage = None;
    for (idx, step) in plan.steps.iter().enumerate() {
        if stage != Some(step.stage.as_str()) {
            writeln!(output, "{}", step.stage)?;
            stage = Some(step.stage.as_str());
        }
        writeln!(
            output,
            "==> [{}/{}] {}",
            idx + 1,
            plan.steps.len(),
            step.description
        )?;
        output.flush()?;

        execute_step(step, runner, forwards).map_err(|err| ExecutionError::StepFailed {
            index: step.index,
            description: step.description.clone(),
            message: format!("{err:#}"),
        })?;
    }

    Ok(ExecutionResult {
        completed_steps: plan.steps.len(),
        port_forwards_started: forwards.len().saturating_sub(forwards_before),
    })
}

fn execute_step(
    step: &PlannedStep,
    runner: &mut dyn CommandRunner,
    forwards: &mut PortForwards,
) -> anyhow::Result<()> {
    match &step.step {
        Step::Run { command } => runner.run(command),
        Step::PortForward { name, command } => {
            let process = runner.spawn(command)?;
            forwards.track(name, command.clone(), process);
            Ok(())
        }
        Step::CreateDir { path } => runner.create_dir(path),
        Step::StopPortForwards => forwards.stop_all(),
    }
}
