mod cli;
mod commands;
mod decompiler;
mod observability;
mod server;
mod worker;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use cromper_core::config::{init_worker_env, PathsConfig};
use cromper_core::Registry;

fn main() -> Result<()> {
    let cli = Cli::parse();
    // Workers talk NDJSON on stdout; keep their logs quiet before tracing reads the config.
    if matches!(cli.command, Commands::Worker) {
        init_worker_env();
    }
    observability::init_tracing();

    match cli.command {
        Commands::Serve {
            bind,
            workers,
            inline,
        } => server::serve(server::ServeOptions {
            bind,
            workers,
            inline,
        })?,
        Commands::Worker => {
            let registry =
                Registry::init(PathsConfig::from_env()).context("Failed to build the toolchain registry")?;
            let handler = worker::Handler::from_env(registry);
            cromper_executor::serve_stdio(&handler)?;
        }
        Commands::Compile {
            compiler,
            source,
            flags,
            context,
            function,
            libraries,
            output,
        } => commands::compile(commands::CompileArgs {
            compiler,
            source,
            flags,
            context,
            function,
            libraries,
            output,
        })?,
        Commands::Assemble {
            platform,
            asm,
            output,
        } => commands::assemble(platform, asm, output)?,
        Commands::Diff {
            platform,
            target,
            compiled,
            label,
            flags,
            summary,
        } => commands::diff(commands::DiffArgs {
            platform,
            target,
            compiled,
            label,
            flags,
            summary,
        })?,
        Commands::Catalog { platform, all } => commands::catalog(platform, all)?,
    }
    Ok(())
}
