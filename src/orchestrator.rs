use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::{info, warn};

use crate::config::Config;
use crate::env_detect::detect_package_manager;
use crate::executor::{CommandRunner, execute_plan};
use crate::menu::{self, Operation, Selection};
use crate::planner::{Plan, plan_clean, plan_prepare, plan_tests};
use crate::port_forward::PortForwards;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Drives the menu and dispatches each selection to its procedure. Port-forwards
/// started by earlier selections stay tracked across iterations.
pub struct Orchestrator<R: CommandRunner> {
    config: Config,
    runner: R,
    forwards: PortForwards,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(config: Config, runner: R) -> Self {
        Self {
            config,
            runner,
            forwards: PortForwards::new(),
        }
    }

    pub fn run_menu<I: BufRead, O: Write>(
        &mut self,
        mut input: I,
        mut output: O,
    ) -> anyhow::Result<()> {
        loop {
            let selection =
                menu::prompt(&mut input, &mut output).context("reading menu selection")?;
            let flow = match selection {
                Selection::Operation(op) => self.dispatch(op, &mut output)?,
                Selection::Unknown(raw) => {
                    info!("ignoring menu input {raw:?}");
                    writeln!(output, "Unknown command.")?;
                    Flow::Continue
                }
                Selection::EndOfInput => {
                    writeln!(output)?;
                    warn!("input closed, exiting");
                    self.forwards.detach();
                    Flow::Stop
                }
            };

            if flow == Flow::Stop {
                return Ok(());
            }
        }
    }

    pub fn dispatch<O: Write>(&mut self, op: Operation, output: &mut O) -> anyhow::Result<Flow> {
        info!("selected {op:?}");
        match op {
            Operation::PrepareEnvironment => {
                self.prepare_environment(output)?;
                Ok(Flow::Continue)
            }
            Operation::RunTests => {
                self.execute(&plan_tests(&self.config), output)?;
                Ok(Flow::Continue)
            }
            Operation::ExitAndClean => {
                self.execute(&plan_clean(&self.config), output)?;
                Ok(Flow::Stop)
            }
            Operation::Exit => {
                writeln!(output, "Exiting...")?;
                self.forwards.detach();
                Ok(Flow::Stop)
            }
        }
    }

    fn prepare_environment<O: Write>(&mut self, output: &mut O) -> anyhow::Result<()> {
        let runner = &self.runner;
        let package_manager = detect_package_manager(|cmd| runner.has_command(cmd))?;
        info!("using package manager {}", package_manager.name());
        self.execute(&plan_prepare(&self.config, package_manager), output)
    }

    fn execute<O: Write>(&mut self, plan: &Plan, output: &mut O) -> anyhow::Result<()> {
        let result = execute_plan(plan, &mut self.runner, &mut self.forwards, output)?;
        info!(
            "'{}' finished: {} steps, {} port-forwards started",
            plan.name, result.completed_steps, result.port_forwards_started
        );
        Ok(())
    }
}
