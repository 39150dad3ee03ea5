//! Control-flow analysis
//!
//! Predecessor/successor sets per block, derived from each block's
//! terminator. The result is a snapshot: any pass that edits terminators
//! or blocks must declare `invalidates_cfg` so the scheduler rebuilds this
//! before the next pass that depends on it.

use super::function::Function;
use super::instr::{BlockRef, InstKind};

/// Per-function control-flow graph, indexed by block position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgInfo {
    preds: Vec<Vec<BlockRef>>,
    succs: Vec<Vec<BlockRef>>,
}

impl CfgInfo {
    pub fn preds(&self, b: BlockRef) -> &[BlockRef] {
        &self.preds[b.0 as usize]
    }

    pub fn succs(&self, b: BlockRef) -> &[BlockRef] {
        &self.succs[b.0 as usize]
    }
}

/// Successor blocks named by a block's terminator, if it has one.
pub fn successors(f: &Function, b: BlockRef) -> Vec<BlockRef> {
    let Some(last) = f.last_inst(b) else {
        return Vec::new();
    };
    match &f.inst(last).kind {
        InstKind::Jump { dest } => vec![*dest],
        InstKind::Branch {
            if_true, if_false, ..
        } => {
            if if_true == if_false {
                vec![*if_true]
            } else {
                vec![*if_true, *if_false]
            }
        }
        InstKind::Return => Vec::new(),
        // block not yet terminated; it contributes no edges
        _ => Vec::new(),
    }
}

/// Compute the control-flow graph of a function.
pub fn compute(f: &Function) -> CfgInfo {
    let n = f.block_count();
    let mut preds: Vec<Vec<BlockRef>> = vec![Vec::new(); n];
    let mut succs: Vec<Vec<BlockRef>> = vec![Vec::new(); n];
    for b in f.blocks() {
        let s = successors(f, b);
        for dest in &s {
            let p = &mut preds[dest.0 as usize];
            if !p.contains(&b) {
                p.push(b);
            }
        }
        succs[b.0 as usize] = s;
    }
    CfgInfo { preds, succs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::build::Builder;
    use crate::ir::module::{Binding, Module};

    #[test]
    fn diamond_cfg() {
        let mut m = Module::new("test");
        let fr = m.new_function(None, Binding::Local);
        let mut b = Builder::new(&mut m, fr);
        let entry = b.new_block("entry");
        let then = b.new_block("then");
        let els = b.new_block("else");
        let join = b.new_block("join");

        let cond = b.bconst(true);
        b.append(entry, cond);
        let br = b.branch(cond, then, els);
        b.append(entry, br);
        let j1 = b.jump(join);
        b.append(then, j1);
        let j2 = b.jump(join);
        b.append(els, j2);
        let r = b.ret();
        b.append(join, r);

        let cfg = compute(m.func(fr));
        assert_eq!(cfg.succs(entry), &[then, els]);
        assert_eq!(cfg.succs(then), &[join]);
        assert_eq!(cfg.succs(els), &[join]);
        assert!(cfg.succs(join).is_empty());
        assert!(cfg.preds(entry).is_empty());
        assert_eq!(cfg.preds(join), &[then, els]);
        assert_eq!(cfg.preds(then), &[entry]);
    }

    #[test]
    fn branch_with_equal_targets_yields_one_edge() {
        let mut m = Module::new("test");
        let fr = m.new_function(None, Binding::Local);
        let mut b = Builder::new(&mut m, fr);
        let entry = b.new_block("entry");
        let next = b.new_block("next");
        let cond = b.bconst(false);
        b.append(entry, cond);
        let br = b.branch(cond, next, next);
        b.append(entry, br);

        let cfg = compute(m.func(fr));
        assert_eq!(cfg.succs(entry), &[next]);
        assert_eq!(cfg.preds(next), &[entry]);
    }

    #[test]
    fn unterminated_block_has_no_successors() {
        let mut m = Module::new("test");
        let fr = m.new_function(None, Binding::Local);
        let mut b = Builder::new(&mut m, fr);
        let entry = b.new_block("entry");
        let c = b.iconst(crate::ir::types::TyRef::I64, 1);
        b.append(entry, c);

        let cfg = compute(m.func(fr));
        assert!(cfg.succs(entry).is_empty());
    }
}
