use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ncs - decompile, assemble and optimize compiled NWScript (NCS) files
#[derive(Debug, Parser)]
#[command(name = "ncs", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decompile an NCS file to NSS with an embedded bytecode fence.
    Decompile {
        /// Path to the .ncs file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Write the source here instead of stdout.
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// JSON routine table: {"<id>": "Name"} or {"<id>": {"name": .., "returns": false}}.
        #[arg(long, value_name = "TABLE")]
        routines: Option<PathBuf>,

        /// Leave out the bytecode fence.
        #[arg(long)]
        no_embed: bool,

        /// Spaces per indentation level.
        #[arg(long, default_value_t = 4)]
        indent: usize,
    },

    /// Compile decompiled NSS back to NCS from its bytecode fence.
    Compile {
        /// Path to the .nss file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output path (defaults to FILE with an .ncs extension).
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Print an NCS file as an instruction listing.
    Disassemble {
        /// Path to the .ncs file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Assemble an instruction listing into an NCS file.
    Assemble {
        /// Path to the listing.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output path (defaults to FILE with an .ncs extension).
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Run optimizer passes over an NCS file.
    Optimize {
        /// Path to the .ncs file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Output path (defaults to FILE with an .opt.ncs extension).
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Pass to run after NOP removal; repeatable. Defaults to
        /// remove-zero-movsp and remove-unreachable.
        #[arg(long = "pass", value_name = "NAME")]
        passes: Vec<String>,
    },

    /// Show basic blocks, edges and recovered structures.
    Cfg {
        /// Path to the .ncs file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}
