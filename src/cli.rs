use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::load_config;
use crate::executor::SystemRunner;
use crate::orchestrator::Orchestrator;

/// Interactive setup and teardown of the migration planner E2E environment.
///
/// Takes no arguments; everything is read from the environment and the menu.
#[derive(Debug, Parser)]
#[command(
    name = "env-setup",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {}

/// Usage line printed when the tool is invoked with arguments.
pub fn usage() -> String {
    Cli::command().render_usage().to_string()
}

/// Accept only a bare invocation. Anything else, `--help` included, is rejected.
pub fn check_invocation<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map(|_| ()).map_err(|_| usage())
}

pub fn run() -> i32 {
    if let Err(usage) = check_invocation(std::env::args_os()) {
        println!("{usage}");
        return 1;
    }

    init_logging();

    match run_menu() {
        Ok(()) => 0,
        Err(err) => {
            error!("{err:#}");
            1
        }
    }
}

fn init_logging() {
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .try_init();
}

fn run_menu() -> anyhow::Result<()> {
    let config = load_config().context("loading configuration")?;
    let summary = serde_json::to_string(&config)?;
    debug!("configuration: {summary}");

    let mut orchestrator = Orchestrator::new(config, SystemRunner);
    orchestrator.run_menu(io::stdin().lock(), io::stdout().lock())
}
