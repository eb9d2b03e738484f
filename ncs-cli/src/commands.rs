//! CLI command implementations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use ncs_analysis::{analyze, StructureKind};
use ncs_common::Program;
use ncs_decompiler::{DecompileOptions, Decompiler, FenceOnly, RoutineTable};
use ncs_optimizer::{OptimizerPass, PASS_NAMES};
use serde::Serialize;

use crate::app::GlobalOptions;
use crate::output::print_output;

/// Read and decode an NCS file.
fn read_program(path: &Path) -> anyhow::Result<Program> {
    let bytes = fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    Program::decode(&bytes).with_context(|| format!("'{}' is not a valid NCS file", path.display()))
}

/// Encode `program` and write it to `path`.
fn write_program(program: &Program, path: &Path) -> anyhow::Result<usize> {
    let bytes = program
        .encode()
        .with_context(|| format!("cannot encode program for '{}'", path.display()))?;
    fs::write(path, &bytes).with_context(|| format!("cannot write '{}'", path.display()))?;
    Ok(bytes.len())
}

fn default_output(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

pub struct DecompileArgs<'a> {
    pub output: Option<&'a Path>,
    pub routines: Option<&'a Path>,
    pub embed: bool,
    pub indent: usize,
}

#[derive(Debug, Serialize)]
struct DecompileOutput {
    source: String,
    diagnostics: Vec<String>,
}

/// Decompile an .ncs file to NSS.
pub fn decompile(
    path: &Path,
    args: &DecompileArgs<'_>,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let program = read_program(path)?;
    let routines = match args.routines {
        Some(table) => {
            let text = fs::read_to_string(table)
                .with_context(|| format!("cannot read '{}'", table.display()))?;
            RoutineTable::from_json(&text)
                .with_context(|| format!("invalid routine table '{}'", table.display()))?
        }
        None => RoutineTable::new(),
    };
    let options = DecompileOptions {
        indent: " ".repeat(args.indent),
        embed_bytecode: args.embed,
        ..Default::default()
    };

    let mut session = Decompiler::new(&routines).with_options(options);
    let source = session
        .decompile(&program)
        .with_context(|| format!("cannot decompile '{}'", path.display()))?;
    let diagnostics: Vec<String> = session.diagnostics().iter().map(ToString::to_string).collect();
    if !diagnostics.is_empty() {
        log::info!("{} diagnostics while decompiling", diagnostics.len());
    }

    if let Some(out) = args.output {
        fs::write(out, &source).with_context(|| format!("cannot write '{}'", out.display()))?;
        log::info!(
            "decompiled {} instructions -> {}",
            program.len(),
            out.display()
        );
        if !opts.json {
            return Ok(());
        }
    }

    let data = DecompileOutput {
        source,
        diagnostics,
    };
    print_output(&data, opts, |d| print!("{}", d.source))
}

/// Compile NSS back to NCS through its bytecode fence.
pub fn compile(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    let program = ncs_decompiler::compile(&source, &FenceOnly)
        .with_context(|| format!("cannot compile '{}'", path.display()))?;

    let out = output.map_or_else(|| default_output(path, "ncs"), Path::to_path_buf);
    let size = write_program(&program, &out)?;
    log::info!(
        "compiled {} instructions ({size} bytes) -> {}",
        program.len(),
        out.display()
    );
    Ok(())
}

/// Print a numbered listing.
pub fn disassemble(path: &Path) -> anyhow::Result<()> {
    let program = read_program(path)?;
    print!("{}", ncs_assembler::disassemble_numbered(&program));
    Ok(())
}

/// Assemble a listing into an .ncs file.
pub fn assemble(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    let program = ncs_assembler::assemble(&text)
        .with_context(|| format!("cannot assemble '{}'", path.display()))?;

    let out = output.map_or_else(|| default_output(path, "ncs"), Path::to_path_buf);
    let size = write_program(&program, &out)?;
    log::info!(
        "assembled {} instructions ({size} bytes) -> {}",
        program.len(),
        out.display()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct PassOutput {
    pass: &'static str,
    removed: usize,
}

#[derive(Debug, Serialize)]
struct OptimizeOutput {
    output: String,
    before: usize,
    after: usize,
    passes: Vec<PassOutput>,
}

/// Optimize an .ncs file.
pub fn optimize(
    path: &Path,
    output: Option<&Path>,
    pass_names: &[String],
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let mut program = read_program(path)?;
    let before = program.len();

    let passes = if pass_names.is_empty() {
        None
    } else {
        let mut passes: Vec<Box<dyn OptimizerPass>> = Vec::with_capacity(pass_names.len());
        for name in pass_names {
            match ncs_optimizer::pass_by_name(name) {
                Some(pass) => passes.push(pass),
                None => bail!(
                    "unknown pass '{name}' (known passes: {})",
                    PASS_NAMES.join(", ")
                ),
            }
        }
        Some(passes)
    };

    let report = ncs_optimizer::optimize(&mut program, passes)
        .with_context(|| format!("cannot optimize '{}'", path.display()))?;
    let out = output.map_or_else(|| default_output(path, "opt.ncs"), Path::to_path_buf);
    write_program(&program, &out)?;

    let data = OptimizeOutput {
        output: out.display().to_string(),
        before,
        after: program.len(),
        passes: report
            .passes
            .iter()
            .map(|&(pass, removed)| PassOutput { pass, removed })
            .collect(),
    };
    print_output(&data, opts, |d| {
        for p in &d.passes {
            println!("{:<24} {:>6}", p.pass, p.removed);
        }
        println!("{} -> {} instructions, written to {}", d.before, d.after, d.output);
    })
}

#[derive(Debug, Serialize)]
struct BlockOutput {
    id: usize,
    start: usize,
    end: usize,
    successors: Vec<usize>,
}

#[derive(Debug, Serialize)]
struct StructureOutput {
    kind: &'static str,
    start_block: usize,
    end_block: usize,
    body: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    else_blocks: Vec<usize>,
}

#[derive(Debug, Serialize)]
struct CfgOutput {
    block_count: usize,
    blocks: Vec<BlockOutput>,
    structures: Vec<StructureOutput>,
}

/// Show the control-flow graph and recovered structures.
pub fn cfg(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let program = read_program(path)?;
    let analysis = analyze(&program)
        .with_context(|| format!("cannot build control flow for '{}'", path.display()))?;

    let data = CfgOutput {
        block_count: analysis.cfg.len(),
        blocks: analysis
            .cfg
            .blocks
            .iter()
            .map(|b| BlockOutput {
                id: b.index,
                start: b.start,
                end: b.end,
                successors: b.successors.iter().copied().collect(),
            })
            .collect(),
        structures: analysis
            .structures
            .iter()
            .map(|s| StructureOutput {
                kind: match s.kind {
                    StructureKind::Loop => "loop",
                    StructureKind::If => "if",
                },
                start_block: s.start_block,
                end_block: s.end_block,
                body: s.body_blocks.clone(),
                else_blocks: s.else_blocks.clone(),
            })
            .collect(),
    };

    print_output(&data, opts, |d| {
        for b in &d.blocks {
            let succ: Vec<String> = b.successors.iter().map(ToString::to_string).collect();
            println!("block {}: {}..{} -> [{}]", b.id, b.start, b.end, succ.join(", "));
        }
        for s in &d.structures {
            println!(
                "{} {}..={} body {:?} else {:?}",
                s.kind, s.start_block, s.end_block, s.body, s.else_blocks
            );
        }
    })
}
