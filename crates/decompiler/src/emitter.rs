//! The decompilation session.
//!
//! Each basic block is replayed against a symbolic operand stack holding
//! one [`Expression`] per 4-byte slot. Statements are written as soon as an
//! instruction has a visible effect (a declaration, an assignment, a call
//! whose result is dropped). Recovered structures are emitted when the walk
//! reaches their start block; blocks inside a structure's arms are only
//! emitted from within that structure.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ncs_analysis::{
    structure, BinaryOp, ControlFlowGraph, ControlStructure, Expression, Literal, StructureKind,
    UnaryOp,
};
use ncs_common::{ByteCode, Instruction, Operand, Program, Qualifier};

use crate::error::{DecompileError, Diagnostic, DiagnosticKind};
use crate::fallback;
use crate::options::DecompileOptions;
use crate::routines::RoutineTable;

/// Output for a program without any code.
pub const EMPTY_MAIN: &str = "void main()\n{\n}\n";

/// Placeholder for operands that could not be recovered.
const UNKNOWN: &str = "__unknown";

/// One 4-byte stack slot. Declared variables keep their name so later
/// reads and writes can refer to them.
#[derive(Debug, Clone)]
struct Slot {
    value: Expression,
    var: Option<String>,
}

impl Slot {
    fn temp(value: Expression) -> Self {
        Self { value, var: None }
    }

    /// Expression that reads this slot.
    fn read(&self) -> Expression {
        match &self.var {
            Some(name) => Expression::variable(name.as_str()),
            None => self.value.clone(),
        }
    }
}

type Stack = Vec<Slot>;

/// Symbolic state at the end of a block.
#[derive(Debug, Clone)]
struct Exit {
    stack: Stack,
    /// Condition popped by a trailing JZ/JNZ.
    condition: Option<Expression>,
}

/// Per-program analysis shared by the walk.
struct Graph<'p> {
    instrs: &'p [Instruction],
    cfg: ControlFlowGraph,
    structures: Vec<ControlStructure>,
    /// Blocks that start a function.
    entries: BTreeSet<usize>,
}

impl Graph<'_> {
    fn terminator(&self, block: usize) -> &Instruction {
        &self.instrs[self.cfg.blocks[block].last()]
    }

    fn target_block(&self, instr: &Instruction) -> Option<usize> {
        instr.jump.and_then(|t| self.cfg.block_of(t))
    }

    /// CFG successors plus the continuation after a JSR, minus function
    /// entries.
    fn next_blocks(&self, block: usize) -> Vec<usize> {
        let mut next: BTreeSet<usize> = self.cfg.blocks[block].successors.clone();
        if self.terminator(block).byte_code == ByteCode::Jsr && block + 1 < self.cfg.len() {
            next.insert(block + 1);
        }
        next.into_iter()
            .filter(|b| !self.entries.contains(b))
            .collect()
    }
}

/// A single decompilation session.
///
/// ```
/// use ncs_common::{Instruction, Program};
/// use ncs_decompiler::{DecompileOptions, Decompiler, RoutineTable};
///
/// let routines = RoutineTable::new();
/// let options = DecompileOptions { embed_bytecode: false, ..Default::default() };
/// let mut session = Decompiler::new(&routines).with_options(options);
/// let text = session
///     .decompile(&Program::new(vec![Instruction::retn()]))
///     .unwrap();
/// assert_eq!(text, "void main()\n{\n    return;\n}\n");
/// assert!(session.diagnostics().is_empty());
/// ```
pub struct Decompiler<'r> {
    routines: &'r RoutineTable,
    options: DecompileOptions,
    diagnostics: Vec<Diagnostic>,
    structures: Vec<ControlStructure>,

    out: String,
    visited: BTreeSet<usize>,
    emitted: BTreeSet<usize>,
    exits: HashMap<usize, Exit>,
    conditions: BTreeMap<usize, Expression>,
    function_names: BTreeMap<usize, String>,
    function_entry: usize,
    globals: Option<Vec<Option<String>>>,
    declared: usize,
}

impl<'r> Decompiler<'r> {
    pub fn new(routines: &'r RoutineTable) -> Self {
        Self {
            routines,
            options: DecompileOptions::default(),
            diagnostics: Vec::new(),
            structures: Vec::new(),
            out: String::new(),
            visited: BTreeSet::new(),
            emitted: BTreeSet::new(),
            exits: HashMap::new(),
            conditions: BTreeMap::new(),
            function_names: BTreeMap::new(),
            function_entry: 0,
            globals: None,
            declared: 0,
        }
    }

    pub fn with_options(mut self, options: DecompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DecompileOptions {
        &self.options
    }

    /// Recoveries made during the last run.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Structures recovered during the last run, with the conditions the
    /// emitter rebuilt for them.
    pub fn structures(&self) -> &[ControlStructure] {
        &self.structures
    }

    /// Render `program` as NSS text, followed by its bytecode fence when
    /// [`DecompileOptions::embed_bytecode`] is set.
    pub fn decompile(&mut self, program: &Program) -> Result<String, DecompileError> {
        self.reset();
        for (at, instr) in program.instructions.iter().enumerate() {
            if !instr.has_valid_operands() {
                return Err(DecompileError::MalformedOperands {
                    at,
                    mnemonic: instr.mnemonic(),
                });
            }
        }

        let mut text = self.emit_program(program)?;
        if self.options.embed_bytecode {
            let bytes = program.encode()?;
            fallback::embed(&mut text, &bytes, self.options.wrap_width);
        }
        Ok(text)
    }

    fn reset(&mut self) {
        self.diagnostics.clear();
        self.structures.clear();
        self.out.clear();
        self.visited.clear();
        self.emitted.clear();
        self.exits.clear();
        self.conditions.clear();
        self.function_names.clear();
        self.function_entry = 0;
        self.globals = None;
        self.declared = 0;
    }

    fn emit_program(&mut self, program: &Program) -> Result<String, DecompileError> {
        let instrs = &program.instructions;
        let cfg = ControlFlowGraph::build(instrs)?;
        if cfg.is_empty() {
            return Ok(EMPTY_MAIN.to_string());
        }
        let structures = structure::recover(&cfg, instrs);

        let trampoline = match instrs.as_slice() {
            [first, second, ..]
                if first.byte_code == ByteCode::Jsr && second.byte_code == ByteCode::Retn =>
            {
                first.jump.filter(|&target| target > 1)
            }
            _ => None,
        };
        let main = trampoline.unwrap_or(0);
        self.function_names.insert(main, "main".to_string());
        for instr in instrs {
            if let (ByteCode::Jsr, Some(target)) = (instr.byte_code, instr.jump) {
                self.function_names
                    .entry(target)
                    .or_insert_with(|| format!("sub_{target}"));
            }
        }
        if trampoline.is_some() {
            self.visited.insert(0);
            self.visited.insert(1);
        }

        let mut functions: Vec<(usize, String)> = self
            .function_names
            .iter()
            .filter_map(|(&at, name)| cfg.block_starting_at(at).map(|b| (b, name.clone())))
            .collect();
        functions.sort_by_key(|(block, name)| (name != "main", *block));

        let graph = Graph {
            instrs,
            entries: functions.iter().map(|(b, _)| *b).collect(),
            cfg,
            structures,
        };

        for (i, (entry, name)) in functions.iter().enumerate() {
            if self.visited.contains(entry) {
                continue;
            }
            if i > 0 {
                self.out.push('\n');
            }
            self.function_entry = *entry;
            self.line(0, format!("void {name}()"));
            self.line(0, "{");
            self.walk(&graph, *entry, Vec::new(), 1, None);
            self.line(0, "}");
        }

        for block in &graph.cfg.blocks {
            if !self.visited.contains(&block.index) {
                log::debug!("block {} (instruction {}) not emitted", block.index, block.start);
                self.diagnostics.push(Diagnostic {
                    at: block.start,
                    kind: DiagnosticKind::SkippedBlock,
                });
            }
        }

        self.structures = graph.structures.clone();
        for (&idx, cond) in &self.conditions {
            self.structures[idx].condition = Some(cond.clone());
        }
        log::debug!(
            "emitted {} functions, {} structures, {} diagnostics",
            functions.len(),
            self.emitted.len(),
            self.diagnostics.len()
        );
        Ok(std::mem::take(&mut self.out))
    }

    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    /// Whether `block` sits in an arm of a structure that has not been
    /// emitted yet.
    fn deferred(&self, g: &Graph<'_>, block: usize) -> bool {
        g.structures.iter().enumerate().any(|(i, s)| {
            !self.emitted.contains(&i)
                && s.start_block != block
                && (s.body_blocks.contains(&block) || s.else_blocks.contains(&block))
        })
    }

    /// Emit `block` and everything reachable from it inside `region`,
    /// depth first in successor order.
    fn walk(
        &mut self,
        g: &Graph<'_>,
        block: usize,
        stack: Stack,
        depth: usize,
        region: Option<&BTreeSet<usize>>,
    ) {
        let mut work: Vec<(usize, Stack)> = vec![(block, stack)];
        while let Some((block, stack)) = work.pop() {
            if self.visited.contains(&block)
                || region.is_some_and(|r| !r.contains(&block))
                || (g.entries.contains(&block) && block != self.function_entry)
                || self.deferred(g, block)
            {
                continue;
            }

            let pending = g
                .structures
                .iter()
                .enumerate()
                .position(|(i, s)| s.start_block == block && !self.emitted.contains(&i));
            let next = match pending.map(|idx| (idx, g.structures[idx].kind)) {
                Some((idx, StructureKind::Loop)) => self.emit_loop(g, idx, stack, depth),
                Some((idx, StructureKind::If)) => self.emit_if(g, idx, stack, depth),
                None => {
                    self.visited.insert(block);
                    let exit = self.replay(g, block, stack, depth);
                    g.next_blocks(block)
                        .into_iter()
                        .map(|next| (next, exit.stack.clone()))
                        .collect()
                }
            };
            work.extend(next.into_iter().rev());
        }
    }

    /// Emit an `if` and return where the walk continues.
    fn emit_if(
        &mut self,
        g: &Graph<'_>,
        idx: usize,
        stack: Stack,
        depth: usize,
    ) -> Vec<(usize, Stack)> {
        let s = &g.structures[idx];
        self.emitted.insert(idx);
        self.visited.insert(s.start_block);

        let exit = self.replay(g, s.start_block, stack, depth);
        let cond = exit
            .condition
            .clone()
            .unwrap_or_else(|| Expression::variable(UNKNOWN));
        self.conditions.insert(idx, cond.clone());

        self.line(depth, format!("if ({cond})"));
        self.emit_arm(g, &s.body_blocks, &exit.stack, depth);
        if s.has_else() {
            self.line(depth, "else");
            self.emit_arm(g, &s.else_blocks, &exit.stack, depth);
        }
        vec![(s.end_block, exit.stack)]
    }

    fn emit_arm(&mut self, g: &Graph<'_>, blocks: &[usize], stack: &Stack, depth: usize) {
        self.line(depth, "{");
        if let Some(&first) = blocks.first() {
            let arm: BTreeSet<usize> = blocks.iter().copied().collect();
            self.walk(g, first, stack.clone(), depth + 1, Some(&arm));
        }
        self.line(depth, "}");
    }

    /// Emit a loop and return the blocks its exits lead to.
    fn emit_loop(
        &mut self,
        g: &Graph<'_>,
        idx: usize,
        stack: Stack,
        depth: usize,
    ) -> Vec<(usize, Stack)> {
        let header = g.structures[idx].start_block;
        let mut latch = g.structures[idx].end_block;
        for (i, s) in g.structures.iter().enumerate() {
            if s.kind == StructureKind::Loop && s.start_block == header {
                self.emitted.insert(i);
                latch = latch.max(s.end_block);
            }
        }
        let body: BTreeSet<usize> = (header..=latch).collect();
        let head_last = g.terminator(header);
        let latch_last = g.terminator(latch);

        let exits_loop = g
            .target_block(head_last)
            .is_some_and(|t| !body.contains(&t));
        let fallback_stack = stack.clone();

        if header != latch && head_last.byte_code == ByteCode::Jz && exits_loop {
            // The header's test belongs to the loop now.
            for (i, s) in g.structures.iter().enumerate() {
                if s.start_block == header {
                    self.emitted.insert(i);
                }
            }
            self.visited.insert(header);
            let exit = self.replay(g, header, stack, depth);
            let cond = exit
                .condition
                .clone()
                .unwrap_or_else(|| Expression::variable(UNKNOWN));
            self.conditions.insert(idx, cond.clone());
            self.line(depth, format!("while ({cond})"));
            self.line(depth, "{");
            for next in g.next_blocks(header) {
                if body.contains(&next) {
                    self.walk(g, next, exit.stack.clone(), depth + 1, Some(&body));
                }
            }
            self.line(depth, "}");
        } else if latch_last.byte_code.is_conditional_jump()
            && latch_last.jump == Some(g.cfg.blocks[header].start)
        {
            self.line(depth, "do");
            self.line(depth, "{");
            self.walk(g, header, stack, depth + 1, Some(&body));
            let cond = self
                .exits
                .get(&latch)
                .and_then(|e| e.condition.clone())
                .unwrap_or_else(|| Expression::variable(UNKNOWN));
            let cond = if latch_last.byte_code == ByteCode::Jz {
                cond.negated()
            } else {
                cond
            };
            self.conditions.insert(idx, cond.clone());
            self.line(depth, format!("}} while ({cond});"));
        } else {
            self.line(depth, "while (TRUE)");
            self.line(depth, "{");
            self.walk(g, header, stack, depth + 1, Some(&body));
            self.line(depth, "}");
        }

        let mut exits = Vec::new();
        for &b in &body {
            for next in g.next_blocks(b) {
                if body.contains(&next) {
                    continue;
                }
                let stack = self
                    .exits
                    .get(&b)
                    .map(|e| e.stack.clone())
                    .unwrap_or_else(|| fallback_stack.clone());
                exits.push((next, stack));
            }
        }
        exits
    }

    /// Replay one block, writing its statements at `depth`.
    fn replay(&mut self, g: &Graph<'_>, block: usize, mut stack: Stack, depth: usize) -> Exit {
        let mut condition = None;
        for at in g.cfg.blocks[block].range() {
            self.step(g, at, &mut stack, &mut condition, depth);
        }
        let exit = Exit { stack, condition };
        self.exits.insert(block, exit.clone());
        exit
    }

    fn underflow(&mut self, at: usize, needed: usize, available: usize) {
        log::warn!("stack underflow at instruction {at}: needed {needed}, had {available}");
        self.diagnostics.push(Diagnostic {
            at,
            kind: DiagnosticKind::StackUnderflow { needed, available },
        });
    }

    fn unresolved(&mut self, at: usize, offset: i64) {
        log::warn!("unresolved stack slot {offset} at instruction {at}");
        self.diagnostics.push(Diagnostic {
            at,
            kind: DiagnosticKind::UnresolvedSlot { offset },
        });
    }

    /// Pop `n` slots, bottom first. Records an underflow and returns `None`
    /// when the stack is too shallow.
    fn pop_n(&mut self, at: usize, stack: &mut Stack, n: usize) -> Option<Stack> {
        if stack.len() < n {
            self.underflow(at, n, stack.len());
            return None;
        }
        Some(stack.split_off(stack.len() - n))
    }

    fn fresh_name(&mut self) -> String {
        let name = format!("var_{}", self.declared);
        self.declared += 1;
        name
    }

    /// Name of the SP-relative slot at byte `offset`. Slots below the
    /// function's frame are parameters.
    fn sp_name(&mut self, at: usize, stack: &mut Stack, offset: i64) -> Option<String> {
        let idx = stack.len() as i64 + offset / 4;
        if idx < 0 {
            return Some(format!("param_{}", -idx));
        }
        let Some(slot) = stack.get_mut(idx as usize) else {
            self.unresolved(at, offset);
            return None;
        };
        if let Some(name) = &slot.var {
            return Some(name.clone());
        }
        let name = format!("var_{}", self.declared);
        self.declared += 1;
        slot.var = Some(name.clone());
        slot.value = Expression::variable(name.as_str());
        Some(name)
    }

    /// Name of the BP-relative slot at byte `offset`.
    fn bp_name(&self, offset: i64) -> String {
        let frame = self.globals.as_deref().unwrap_or(&[]);
        let idx = frame.len() as i64 + offset / 4;
        usize::try_from(idx)
            .ok()
            .and_then(|i| frame.get(i).cloned().flatten())
            .unwrap_or_else(|| format!("global_{}", idx.unsigned_abs()))
    }

    fn step(
        &mut self,
        g: &Graph<'_>,
        at: usize,
        stack: &mut Stack,
        condition: &mut Option<Expression>,
        depth: usize,
    ) {
        let instr = &g.instrs[at];
        let int = |i: usize| instr.int_operand(i).unwrap_or(0);

        match instr.byte_code {
            ByteCode::Const => {
                let lit = match (instr.qualifier, instr.operands.first()) {
                    (Qualifier::Float, Some(Operand::F32(v))) => Literal::Float(*v),
                    (Qualifier::String, Some(Operand::Str(s))) => Literal::String(s.clone()),
                    (Qualifier::Object, _) => Literal::Object(int(0) as i32),
                    _ => Literal::Int(int(0) as i32),
                };
                stack.push(Slot::temp(Expression::Literal(lit)));
            }
            ByteCode::RsAdd => {
                let name = self.fresh_name();
                let ty = instr.qualifier.type_name().unwrap_or("int");
                self.line(depth, format!("{ty} {name};"));
                stack.push(Slot {
                    value: Expression::variable(name.as_str()),
                    var: Some(name),
                });
            }
            ByteCode::CpDownSp => {
                let Some(value) = stack.last().map(Slot::read) else {
                    self.underflow(at, 1, 0);
                    return;
                };
                if let Some(name) = self.sp_name(at, stack, int(0)) {
                    self.line(depth, format!("{name} = {value};"));
                }
            }
            ByteCode::CpDownBp => {
                let Some(value) = stack.last().map(Slot::read) else {
                    self.underflow(at, 1, 0);
                    return;
                };
                let name = self.bp_name(int(0));
                self.line(depth, format!("{name} = {value};"));
            }
            ByteCode::CpTopSp => {
                let start = stack.len() as i64 + int(0) / 4;
                for k in 0..(int(1) / 4).max(1) {
                    let idx = start + k;
                    let value = if idx < 0 {
                        Expression::variable(format!("param_{}", -idx))
                    } else if let Some(slot) = stack.get(idx as usize) {
                        slot.read()
                    } else {
                        self.unresolved(at, int(0));
                        Expression::variable(UNKNOWN)
                    };
                    stack.push(Slot::temp(value));
                }
            }
            ByteCode::CpTopBp => {
                for k in 0..(int(1) / 4).max(1) {
                    let name = self.bp_name(int(0) + 4 * k);
                    stack.push(Slot::temp(Expression::variable(name)));
                }
            }
            ByteCode::Action => {
                let id = int(0) as u16;
                let argc = int(1) as usize;
                let args = self.pop_n(at, stack, argc).unwrap_or_else(|| std::mem::take(stack));
                let call = Expression::call(
                    self.routines.name_of(id),
                    args.iter().map(Slot::read).collect(),
                );
                if self.routines.returns(id) {
                    stack.push(Slot::temp(call));
                } else {
                    self.line(depth, format!("{call};"));
                }
            }
            ByteCode::Equal | ByteCode::NEqual if instr.qualifier == Qualifier::StructStruct => {
                let n = (int(0) / 4).max(1) as usize;
                if let Some(mut both) = self.pop_n(at, stack, 2 * n) {
                    let right = both.split_off(n);
                    let op = if instr.byte_code == ByteCode::Equal {
                        BinaryOp::Eq
                    } else {
                        BinaryOp::Ne
                    };
                    stack.push(Slot::temp(Expression::binary(
                        op,
                        both[0].read(),
                        right[0].read(),
                    )));
                }
            }
            code if code.is_binary_op() => {
                if let (Some(op), Some(pair)) =
                    (BinaryOp::from_byte_code(code), self.pop_n(at, stack, 2))
                {
                    stack.push(Slot::temp(Expression::binary(op, pair[0].read(), pair[1].read())));
                }
            }
            code if code.is_unary_op() => {
                if let (Some(op), Some(one)) = (UnaryOp::from_byte_code(code), self.pop_n(at, stack, 1)) {
                    stack.push(Slot::temp(Expression::unary(op, one[0].read())));
                }
            }
            ByteCode::MovSp => {
                let n = (int(0).unsigned_abs() / 4) as usize;
                let dropped = self
                    .pop_n(at, stack, n)
                    .unwrap_or_else(|| std::mem::take(stack));
                for slot in dropped {
                    if slot.var.is_none() && slot.value.has_call() {
                        self.line(depth, format!("{};", slot.value));
                    }
                }
            }
            ByteCode::Destruct => {
                let n = (int(0) / 4) as usize;
                if let Some(removed) = self.pop_n(at, stack, n) {
                    let Some(base) = removed.first().map(Slot::read) else {
                        return;
                    };
                    let first = (int(1) / 4).max(0) as usize;
                    for c in first..first + (int(2) / 4) as usize {
                        stack.push(Slot::temp(Expression::field(base.clone(), field_name(c))));
                    }
                }
            }
            ByteCode::IncSp | ByteCode::DecSp => {
                let op = if instr.byte_code == ByteCode::IncSp { "++" } else { "--" };
                if let Some(name) = self.sp_name(at, stack, int(0)) {
                    self.line(depth, format!("{name}{op};"));
                }
            }
            ByteCode::IncBp | ByteCode::DecBp => {
                let op = if instr.byte_code == ByteCode::IncBp { "++" } else { "--" };
                let name = self.bp_name(int(0));
                self.line(depth, format!("{name}{op};"));
            }
            ByteCode::Jz | ByteCode::Jnz => {
                *condition = self.pop_n(at, stack, 1).map(|mut one| one.remove(0).read());
            }
            ByteCode::Jsr => {
                let name = instr
                    .jump
                    .and_then(|t| self.function_names.get(&t).cloned())
                    .unwrap_or_else(|| format!("sub_{}", instr.jump.unwrap_or(0)));
                self.line(depth, format!("{name}();"));
            }
            ByteCode::Retn => match stack.last() {
                Some(slot) => {
                    let value = slot.read();
                    self.line(depth, format!("return {value};"));
                }
                None => self.line(depth, "return;"),
            },
            ByteCode::SaveBp => {
                self.globals = Some(stack.iter().map(|s| s.var.clone()).collect());
            }
            ByteCode::Jmp | ByteCode::RestoreBp | ByteCode::StoreState | ByteCode::Nop => {}
            // Remaining byte codes are binary or unary and matched above.
            _ => {}
        }
    }
}

fn field_name(component: usize) -> String {
    match component {
        0 => "x".to_string(),
        1 => "y".to_string(),
        2 => "z".to_string(),
        n => format!("field_{n}"),
    }
}
