mod cli;
mod commands;
mod config;
mod resource;
mod ui;

use anyhow::Result;
use budgetkit::HttpBackend;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub show_secret: bool,
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
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        show_secret: cli.provider.show_secret,
    };

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "budgeteer", &mut io::stdout());
        return Ok(());
    }

    let backend = HttpBackend::new(config::client_config(&cli.provider)?);
    log::debug!("Using budget service at {}", backend.config().host());

    match cli.command {
        Command::Create { name, budget } => {
            commands::lifecycle::create(&ctx, &backend, &name, budget)
        }
        Command::Read { id } => commands::lifecycle::read(&ctx, &backend, &id),
        Command::Update { id, name, budget } => {
            commands::lifecycle::update(&ctx, &backend, &id, name, budget)
        }
        Command::Delete { id } => commands::lifecycle::delete(&ctx, &backend, &id),
        Command::Apply(args) => commands::apply::run(&ctx, &backend, args),
        Command::Completions { .. } => Ok(()),
    }
}
