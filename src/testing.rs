//! Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::anyhow;

use crate::config::Config;
use crate::executor::CommandRunner;
use crate::port_forward::BackgroundProcess;
use crate::step::CommandSpec;

pub type Log = Rc<RefCell<Vec<String>>>;

/// Records every call as `run: ...`, `spawn: ...`, `mkdir: ...` or `stop: ...`
/// instead of touching the system.
#[derive(Default)]
pub struct RecordingRunner {
    log: Log,
    on_path: Vec<String>,
    fail_on: Option<String>,
    next_pid: u32,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.on_path = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Fail the call whose log entry equals `entry` (after recording it).
    pub fn fail_on(mut self, entry: &str) -> Self {
        self.fail_on = Some(entry.to_string());
        self
    }

    pub fn log(&self) -> Log {
        Rc::clone(&self.log)
    }

    fn record(&mut self, entry: String) -> anyhow::Result<()> {
        let failed = self.fail_on.as_deref() == Some(entry.as_str());
        self.log.borrow_mut().push(entry);
        if failed {
            return Err(anyhow!("command exited with status Some(1)"));
        }
        Ok(())
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &CommandSpec) -> anyhow::Result<()> {
        self.record(format!("run: {command}"))
    }

    fn spawn(&mut self, command: &CommandSpec) -> anyhow::Result<Box<dyn BackgroundProcess>> {
        self.record(format!("spawn: {command}"))?;
        self.next_pid += 1;
        Ok(Box::new(RecordedProcess {
            pid: 1000 + self.next_pid,
            command: command.to_string(),
            log: Rc::clone(&self.log),
        }))
    }

    fn create_dir(&mut self, path: &Path) -> anyhow::Result<()> {
        self.record(format!("mkdir: {}", path.display()))
    }

    fn has_command(&self, name: &str) -> bool {
        self.on_path.iter().any(|c| c == name)
    }
}

struct RecordedProcess {
    pid: u32,
    command: String,
    log: Log,
}

impl BackgroundProcess for RecordedProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn terminate(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("stop: {}", self.command));
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        cluster_name: "e2e".to_string(),
        wait_timeout_secs: 240,
        namespace: "default".to_string(),
        disk_image: PathBuf::from("data/persistence-disk.vmdk"),
        work_dir: PathBuf::from("/tmp/untarova"),
        agent_image: "quay.io/test/agent:dev".to_string(),
        api_image: "quay.io/test/api:dev".to_string(),
        api_image_pull_policy: "Never".to_string(),
        insecure_registry: "true".to_string(),
        registry_ip: "10.0.0.5".to_string(),
    }
}
