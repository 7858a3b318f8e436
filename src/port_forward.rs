//! Tracked `kubectl port-forward` processes.
//!
//! Port-forwards run in the background for as long as the environment is in use.
//! Every handle is owned by a [`PortForwards`] registry so teardown can stop them
//! before the cluster goes away. Handles still registered when the registry is
//! dropped are terminated, which covers aborts on a failed step.

use tracing::{info, warn};

use crate::step::CommandSpec;

/// A running background process.
pub trait BackgroundProcess {
    fn id(&self) -> u32;

    /// Stop the process and reap it.
    fn terminate(&mut self) -> anyhow::Result<()>;
}

struct Tracked {
    name: String,
    command: CommandSpec,
    process: Box<dyn BackgroundProcess>,
}

#[derive(Default)]
pub struct PortForwards {
    tracked: Vec<Tracked>,
}

impl PortForwards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(
        &mut self,
        name: &str,
        command: CommandSpec,
        process: Box<dyn BackgroundProcess>,
    ) {
        info!(
            "port-forward '{}' running as pid {} ({})",
            name,
            process.id(),
            command
        );
        self.tracked.push(Tracked {
            name: name.to_string(),
            command,
            process,
        });
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tracked.iter().map(|t| t.name.as_str()).collect()
    }

    /// Terminate all tracked port-forwards, most recent first. Every process is
    /// attempted; the first error is returned.
    pub fn stop_all(&mut self) -> anyhow::Result<()> {
        let mut first_err = None;
        while let Some(mut entry) = self.tracked.pop() {
            info!("stopping port-forward '{}' (pid {})", entry.name, entry.process.id());
            if let Err(err) = entry.process.terminate() {
                warn!(
                    "failed to stop port-forward '{}' ({}): {err:#}",
                    entry.name, entry.command
                );
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Forget all handles without stopping the processes; they keep running after
    /// this process exits.
    pub fn detach(&mut self) {
        for entry in self.tracked.drain(..) {
            info!(
                "leaving port-forward '{}' running (pid {})",
                entry.name,
                entry.process.id()
            );
        }
    }
}

impl Drop for PortForwards {
    fn drop(&mut self) {
        if self.tracked.is_empty() {
            return;
        }
        // Errors were already logged per process.
        let _ = self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::anyhow;

    use super::{BackgroundProcess, PortForwards};
    use crate::step::CommandSpec;

    struct FakeProcess {
        id: u32,
        fail: bool,
        stopped: Rc<RefCell<Vec<u32>>>,
    }

    impl BackgroundProcess for FakeProcess {
        fn id(&self) -> u32 {
            self.id
        }

        fn terminate(&mut self) -> anyhow::Result<()> {
            self.stopped.borrow_mut().push(self.id);
            if self.fail {
                return Err(anyhow!("kill failed"));
            }
            Ok(())
        }
    }

    fn track(
        forwards: &mut PortForwards,
        id: u32,
        fail: bool,
        stopped: &Rc<RefCell<Vec<u32>>>,
    ) {
        forwards.track(
            &format!("pf-{id}"),
            CommandSpec::from_words("kubectl port-forward"),
            Box::new(FakeProcess {
                id,
                fail,
                stopped: Rc::clone(stopped),
            }),
        );
    }

    #[test]
    fn stops_in_reverse_order_and_keeps_going_after_errors() {
        let stopped = Rc::new(RefCell::new(Vec::new()));
        let mut forwards = PortForwards::new();
        track(&mut forwards, 1, false, &stopped);
        track(&mut forwards, 2, true, &stopped);
        track(&mut forwards, 3, false, &stopped);

        assert!(forwards.stop_all().is_err());
        assert_eq!(*stopped.borrow(), vec![3, 2, 1]);
        assert!(forwards.is_empty());
    }

    #[test]
    fn drop_terminates_remaining_processes() {
        let stopped = Rc::new(RefCell::new(Vec::new()));
        {
            let mut forwards = PortForwards::new();
            track(&mut forwards, 7, false, &stopped);
            assert_eq!(forwards.names(), vec!["pf-7"]);
        }
        assert_eq!(*stopped.borrow(), vec![7]);
    }

    #[test]
    fn detached_processes_are_left_running() {
        let stopped = Rc::new(RefCell::new(Vec::new()));
        {
            let mut forwards = PortForwards::new();
            track(&mut forwards, 4, false, &stopped);
            forwards.detach();
            assert_eq!(forwards.len(), 0);
        }
        assert!(stopped.borrow().is_empty());
    }
}
