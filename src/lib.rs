pub mod cli;
pub mod config;
pub mod env_detect;
pub mod executor;
pub mod menu;
pub mod orchestrator;
pub mod planner;
pub mod port_forward;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    cli::run()
}
