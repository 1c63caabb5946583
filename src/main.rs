mod cli;
mod commands;
mod config;
mod paths;
mod resource;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
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
    };

    match cli.command {
        Command::Types => commands::types::list(&ctx),
        Command::Describe { type_name } => commands::types::describe(&ctx, &type_name),
        Command::Schema { type_name } => commands::types::schema(&ctx, &type_name),
        Command::Get(args) => commands::get::run(&ctx, args),
        Command::Diff(args) => commands::diff::run(&ctx, args),
        Command::Set(args) => commands::set::run(&ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "rapi", &mut io::stdout());
            Ok(())
        }
    }
}
