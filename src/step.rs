use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// An external program invocation, kept as argv so values are never re-expanded
/// by a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Splits a fixed command line on whitespace. No quoting is understood, so
    /// callers append configuration values with [`CommandSpec::arg`].
    pub fn from_words(line: &str) -> Self {
        let mut words = line.split_whitespace().map(str::to_string);
        Self {
            program: words.next().unwrap_or_default(),
            args: words.collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Run a command to completion; a non-zero exit fails the plan.
    Run { command: CommandSpec },
    /// Start a port-forward in the background and track its handle.
    PortForward { name: String, command: CommandSpec },
    /// Create a directory. Fails if it already exists.
    CreateDir { path: PathBuf },
    /// Terminate every tracked port-forward.
    StopPortForwards,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepValidationError {
    #[error("command program cannot be empty")]
    EmptyProgram,
    #[error("port-forward name cannot be empty")]
    EmptyName,
    #[error("directory path cannot be empty")]
    EmptyPath,
}

impl Step {
    pub fn run(command: CommandSpec) -> Self {
        Step::Run { command }
    }

    pub fn validate(&self) -> Result<(), StepValidationError> {
        match self {
            Step::Run { command } if command.program.trim().is_empty() => {
                Err(StepValidationError::EmptyProgram)
            }
            Step::PortForward { name, .. } if name.trim().is_empty() => {
                Err(StepValidationError::EmptyName)
            }
            Step::PortForward { command, .. } if command.program.trim().is_empty() => {
                Err(StepValidationError::EmptyProgram)
            }
            Step::CreateDir { path } if path.as_os_str().is_empty() => {
                Err(StepValidationError::EmptyPath)
            }
            _ => Ok(()),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Step::Run { command } => format!("Run: {command}"),
            Step::PortForward { name, command } => format!("Port-forward {name}: {command}"),
            Step::CreateDir { path } => format!("Create directory {}", path.display()),
            Step::StopPortForwards => "Stop port-forwards".to_string(),
        }
    }
}
