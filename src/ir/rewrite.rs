//! Def-use rewriting and use collection
//!
//! These helpers know the operand shape of every opcode. The matches here
//! are deliberately written without wildcard arms: adding an opcode will
//! not compile until its operand shape is declared in each of them, which
//! is how a missing table entry surfaces as a compile error instead of a
//! miscompile.

use super::function::Function;
use super::instr::{InstKind, InstRef};

/// Replace every operand field of `inst` that equals `old` with `new`.
/// Opcodes with no operand fields are no-ops.
pub fn rewrite_uses(f: &mut Function, inst: InstRef, old: InstRef, new: InstRef) {
    let rep = |r: &mut InstRef| {
        if *r == old {
            *r = new;
        }
    };
    match &mut f.inst_mut(inst).kind {
        InstKind::Binop { lhs, rhs, .. } => {
            rep(lhs);
            rep(rhs);
        }
        InstKind::Cmp { lhs, rhs, .. } => {
            rep(lhs);
            rep(rhs);
        }
        InstKind::Unop { src, .. } => rep(src),
        InstKind::Cast { src, .. } => rep(src),
        InstKind::Load { addr, .. } => rep(addr),
        InstKind::Store { addr, value, .. } => {
            rep(addr);
            rep(value);
        }
        InstKind::StackStore { value, .. } => rep(value),
        InstKind::FieldPtr { base, .. } => rep(base),
        InstKind::IndexPtr { base, index } => {
            rep(base);
            rep(index);
        }
        InstKind::Mov { src } => rep(src),
        InstKind::Phi { sources } => {
            for s in sources {
                rep(&mut s.value);
            }
        }
        InstKind::Branch { cond, .. } => rep(cond),
        InstKind::ReturnVal { src, .. } => rep(src),
        // no operand fields
        InstKind::StackLoad { .. }
        | InstKind::StackAddr { .. }
        | InstKind::Const(_)
        | InstKind::LoadSymbol { .. }
        | InstKind::Jump { .. }
        | InstKind::ParamVal { .. }
        | InstKind::Return
        | InstKind::Sentinel
        | InstKind::Eliminated => {}
    }
}

/// Apply [`rewrite_uses`] across every linked instruction of every block.
pub fn rewrite_uses_in_function(f: &mut Function, old: InstRef, new: InstRef) {
    let sites = collect_uses(f, old);
    for inst in &sites {
        rewrite_uses(f, *inst, old, new);
    }
    if !sites.is_empty() {
        tracing::trace!(sites = sites.len(), "rewrote uses");
    }
}

/// Whether any operand field of `inst` references `value`.
pub fn references(f: &Function, inst: InstRef, value: InstRef) -> bool {
    let hit = |r: InstRef| r == value;
    match &f.inst(inst).kind {
        InstKind::Binop { lhs, rhs, .. } => hit(*lhs) || hit(*rhs),
        InstKind::Cmp { lhs, rhs, .. } => hit(*lhs) || hit(*rhs),
        InstKind::Unop { src, .. } => hit(*src),
        InstKind::Cast { src, .. } => hit(*src),
        InstKind::Load { addr, .. } => hit(*addr),
        InstKind::Store { addr, value: v, .. } => hit(*addr) || hit(*v),
        InstKind::StackStore { value: v, .. } => hit(*v),
        InstKind::FieldPtr { base, .. } => hit(*base),
        InstKind::IndexPtr { base, index } => hit(*base) || hit(*index),
        InstKind::Mov { src } => hit(*src),
        InstKind::Phi { sources } => sources.iter().any(|s| hit(s.value)),
        InstKind::Branch { cond, .. } => hit(*cond),
        InstKind::ReturnVal { src, .. } => hit(*src),
        InstKind::StackLoad { .. }
        | InstKind::StackAddr { .. }
        | InstKind::Const(_)
        | InstKind::LoadSymbol { .. }
        | InstKind::Jump { .. }
        | InstKind::ParamVal { .. }
        | InstKind::Return
        | InstKind::Sentinel
        | InstKind::Eliminated => false,
    }
}

/// Scan the function for instructions whose operand fields reference
/// `value`, appending each use-site once. Supports passes that need "all
/// uses of X" without maintaining a persistent use-list.
pub fn collect_uses(f: &Function, value: InstRef) -> Vec<InstRef> {
    let mut worklist = Vec::new();
    for b in f.blocks() {
        for inst in f.block_insts(b) {
            if references(f, inst, value) {
                worklist.push(inst);
            }
        }
    }
    worklist
}
