//! `ncs`: decompile, compile, assemble and optimize NCS files.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Any error (the full cause chain is printed)

mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("ncs", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Decompile {
            path,
            output,
            routines,
            no_embed,
            indent,
        } => commands::decompile(
            path,
            &commands::DecompileArgs {
                output: output.as_deref(),
                routines: routines.as_deref(),
                embed: !*no_embed,
                indent: *indent,
            },
            &cli.global,
        ),
        Command::Compile { path, output } => commands::compile(path, output.as_deref()),
        Command::Disassemble { path } => commands::disassemble(path),
        Command::Assemble { path, output } => commands::assemble(path, output.as_deref()),
        Command::Optimize {
            path,
            output,
            passes,
        } => commands::optimize(path, output.as_deref(), passes, &cli.global),
        Command::Cfg { path } => commands::cfg(path, &cli.global),
    }
}
