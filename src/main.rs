mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod state;
mod ui;

use anyhow::{Context as AnyhowContext, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use cloudkit::LocalControlPlane;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    config: Option<String>,
    state: Option<String>,
    remote: Option<String>,
    authenticated: bool,
}

impl Context {
    /// Desired configuration file
    pub fn config_path(&self) -> Result<PathBuf> {
        paths::resolve(self.config.as_deref(), paths::config_dir, paths::CONFIG_FILE)
    }

    /// Recorded state file
    pub fn state_path(&self) -> Result<PathBuf> {
        paths::resolve(self.state.as_deref(), paths::state_dir, paths::STATE_FILE)
    }

    /// Open the control plane store
    pub fn open_remote(&self) -> Result<LocalControlPlane> {
        let path = paths::resolve(self.remote.as_deref(), paths::state_dir, paths::REMOTE_FILE)?;
        let remote = LocalControlPlane::open(&path)
            .with_context(|| format!("Failed to open control plane at {}", path.display()))?;
        Ok(remote.authenticated(self.authenticated))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        config: cli.config,
        state: cli.state,
        remote: cli.remote,
        authenticated: cli.authenticated,
    };

    match cli.command {
        Command::Plan(args) => commands::declarative::plan(&ctx, &args),
        Command::Apply(args) => commands::declarative::apply(&ctx, &args),
        Command::Destroy(args) => commands::declarative::destroy(&ctx, &args),
        Command::Import { address, id } => commands::import::run(&ctx, &address, &id),
        Command::Show { address } => commands::show::run(&ctx, address.as_deref()),
        Command::Schema { kind } => commands::schema::run(kind.as_deref()),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "converge", &mut io::stdout());
            Ok(())
        }
    }
}
