//! Pass scheduling
//!
//! Passes act like a queue: when a pass is about to run it is taken off
//! the front. The queue carries one module-wide "control-flow analysis is
//! up to date" flag; popping a pass that requires control flow while the
//! flag is clear transparently injects the built-in CFG rebuild ahead of
//! it. The flag is module-wide, not per-function: a rebuild may repeat
//! more often than strictly necessary across unrelated functions.

use std::collections::VecDeque;

use crate::ir::module::Module;
use crate::mach::MachBuffer;

/// What a pass transforms. The callback signature is fixed by the kind.
#[derive(Debug, Clone, Copy)]
pub enum PassKind {
    ModuleToModule(fn(&mut Module)),
    ModuleToMach(fn(&mut Module, &mut MachBuffer)),
    MachToMach(fn(&mut MachBuffer)),
}

/// A scheduled unit of work over the IR.
#[derive(Debug, Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    pub kind: PassKind,
    /// Run the built-in CFG rebuild first if control flow is stale.
    pub requires_cfg: bool,
    /// Mark control flow stale once this pass has run.
    pub invalidates_cfg: bool,
}

/// The module's pending passes plus the CFG staleness flag.
///
/// Flag lifecycle: set by the built-in CFG rebuild pass, cleared whenever a
/// pass that declares `invalidates_cfg` finishes.
#[derive(Debug)]
pub struct PassQueue {
    queue: VecDeque<Pass>,
    pub(crate) cfg_up_to_date: bool,
}

impl PassQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            cfg_up_to_date: false,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Module {
    /// Append a pass so it runs after everything currently scheduled.
    pub fn schedule_pass_last(&mut self, pass: Pass) {
        self.queue.queue.push_back(pass);
    }

    /// Insert a pass at `index` in the queue. Index 0 means "run next"; an
    /// index past the end clamps to append.
    pub fn schedule_pass_at(&mut self, pass: Pass, index: usize) {
        if index >= self.queue.queue.len() {
            self.queue.queue.push_back(pass);
        } else {
            self.queue.queue.insert(index, pass);
        }
    }

    /// Schedule a pass to run before everything currently queued.
    pub fn schedule_pass_next(&mut self, pass: Pass) {
        self.schedule_pass_at(pass, 0);
    }

    pub fn pending_passes(&self) -> usize {
        self.queue.len()
    }

    pub fn cfg_up_to_date(&self) -> bool {
        self.queue.cfg_up_to_date
    }

    /// Run the next scheduled pass. Returns `false` without dispatching if
    /// the queue is empty or a fatal diagnostic has been recorded.
    pub fn run_next_pass(&mut self) -> bool {
        if self.queue.queue.is_empty() {
            return false;
        }
        if self.has_fatal() {
            tracing::debug!(module = %self.name, "fatal diagnostics present, not running passes");
            return false;
        }

        let requires_cfg = self
            .queue
            .queue
            .front()
            .expect("pass queue emptied underneath us")
            .requires_cfg;
        if requires_cfg && !self.queue.cfg_up_to_date {
            self.schedule_pass_at(builtin::cfg(), 0);
            self.run_next_pass();
        }

        let pass = self
            .queue
            .queue
            .pop_front()
            .expect("pass queue emptied underneath us");
        tracing::debug!(pass = pass.name, module = %self.name, "running pass");
        match pass.kind {
            PassKind::ModuleToModule(callback) => callback(self),
            PassKind::ModuleToMach(callback) => {
                // the buffer is taken out of the module for the call so the
                // callback can hold both sides mutably
                let mut mach = std::mem::take(&mut self.mach);
                callback(self, &mut mach);
                self.mach = mach;
            }
            PassKind::MachToMach(callback) => callback(&mut self.mach),
        }
        if pass.invalidates_cfg {
            self.queue.cfg_up_to_date = false;
            for f in self.funcs_mut() {
                f.cfg = None;
            }
        }
        true
    }

    /// Drain the queue, running passes until it is empty (or a fatal
    /// diagnostic stops the run).
    pub fn run_all_passes(&mut self) {
        while self.run_next_pass() {}
    }
}

/// Built-in passes.
pub mod builtin {
    use super::{Pass, PassKind};
    use crate::ir::instr::{InstKind, InstRef, Opcode};
    use crate::ir::module::Module;
    use crate::ir::{cfg, rewrite};

    /// Rebuild control-flow analysis for every function and set the
    /// staleness flag. Injected automatically ahead of any pass that
    /// declares `requires_cfg`.
    pub fn cfg() -> Pass {
        Pass {
            name: "cfg",
            kind: PassKind::ModuleToModule(run_cfg),
            requires_cfg: false,
            invalidates_cfg: false,
        }
    }

    fn run_cfg(m: &mut Module) {
        for f in m.funcs_mut() {
            f.cfg = Some(cfg::compute(f));
        }
        m.cfg_epoch += 1;
        m.queue.cfg_up_to_date = true;
        tracing::debug!(epoch = m.cfg_epoch, "rebuilt control-flow analysis");
    }

    /// Unlink every instruction marked `Eliminated`. The records stay in
    /// their region; only the chains forget them.
    pub fn elim() -> Pass {
        Pass {
            name: "elim",
            kind: PassKind::ModuleToModule(run_elim),
            requires_cfg: false,
            invalidates_cfg: false,
        }
    }

    fn run_elim(m: &mut Module) {
        for f in m.funcs_mut() {
            let blocks: Vec<_> = f.blocks().collect();
            for b in blocks {
                let dead: Vec<InstRef> = f
                    .block_insts(b)
                    .filter(|&i| f.inst(i).opcode() == Opcode::Eliminated)
                    .collect();
                for i in dead {
                    f.remove(i);
                }
            }
        }
    }

    /// Replace every use of a `mov` with the mov's source and mark the mov
    /// eliminated. Chains of movs collapse because movs are visited in
    /// chain order after earlier rewrites have run.
    pub fn movprop() -> Pass {
        Pass {
            name: "movprop",
            kind: PassKind::ModuleToModule(run_movprop),
            requires_cfg: false,
            invalidates_cfg: false,
        }
    }

    fn run_movprop(m: &mut Module) {
        for f in m.funcs_mut() {
            let blocks: Vec<_> = f.blocks().collect();
            for b in blocks {
                let movs: Vec<InstRef> = f
                    .block_insts(b)
                    .filter(|&i| f.inst(i).opcode() == Opcode::Mov)
                    .collect();
                for mov in movs {
                    let src = match f.inst(mov).kind {
                        InstKind::Mov { src } => src,
                        ref other => unreachable!("movprop on {:?}", other.opcode()),
                    };
                    rewrite::rewrite_uses_in_function(f, mov, src);
                    f.inst_mut(mov).kind = InstKind::Eliminated;
                }
            }
        }
    }

    /// Trivial dead code elimination: repeatedly remove instructions that
    /// have no uses and no side effects until nothing changes.
    pub fn tdce() -> Pass {
        Pass {
            name: "tdce",
            kind: PassKind::ModuleToModule(run_tdce),
            requires_cfg: false,
            invalidates_cfg: false,
        }
    }

    fn run_tdce(m: &mut Module) {
        for f in m.funcs_mut() {
            loop {
                let mut removed = 0usize;
                let blocks: Vec<_> = f.blocks().collect();
                for b in &blocks {
                    let candidates: Vec<InstRef> = f
                        .block_insts(*b)
                        .filter(|&i| !f.inst(i).opcode().has_side_effects())
                        .collect();
                    for i in candidates {
                        if rewrite::collect_uses(f, i).is_empty() {
                            f.remove(i);
                            removed += 1;
                        }
                    }
                }
                if removed == 0 {
                    break;
                }
                tracing::trace!(removed, "dead instructions removed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::builtin;
    use super::{Pass, PassKind};
    use crate::ir::build::Builder;
    use crate::ir::instr::{BinOp, Opcode};
    use crate::ir::module::{Binding, Module};
    use crate::ir::types::TyRef;
    use crate::diag::{DiagKind, Diagnostic};

    fn noop_pass(name: &'static str) -> Pass {
        fn noop(_: &mut Module) {}
        Pass {
            name,
            kind: PassKind::ModuleToModule(noop),
            requires_cfg: false,
            invalidates_cfg: false,
        }
    }

    /// Records the cfg epoch observed while the pass body runs, so tests
    /// can prove the CFG rebuild happened first.
    fn epoch_stamp_pass(requires_cfg: bool, invalidates_cfg: bool) -> Pass {
        fn stamp(m: &mut Module) {
            m.name = format!("stamped@{}", m.cfg_epoch);
        }
        Pass {
            name: "stamp",
            kind: PassKind::ModuleToModule(stamp),
            requires_cfg,
            invalidates_cfg,
        }
    }

    #[test]
    fn empty_queue_is_a_noop() {
        let mut m = Module::new("m");
        assert!(!m.run_next_pass());
        m.run_all_passes();
        assert_eq!(m.pending_passes(), 0);
    }

    #[test]
    fn schedule_at_clamps_and_orders() {
        let mut m = Module::new("m");
        m.schedule_pass_last(noop_pass("a"));
        m.schedule_pass_at(noop_pass("b"), 99); // clamps to append
        m.schedule_pass_next(noop_pass("c")); // runs next
        assert_eq!(m.pending_passes(), 3);
        assert!(m.run_next_pass());
        assert_eq!(m.pending_passes(), 2);
        m.run_all_passes();
        assert_eq!(m.pending_passes(), 0);
    }

    #[test]
    fn requires_cfg_injects_one_rebuild_before_the_callback() {
        let mut m = Module::new("m");
        assert!(!m.cfg_up_to_date());
        m.schedule_pass_last(epoch_stamp_pass(true, false));
        assert!(m.run_next_pass());
        // rebuild ran exactly once, before the pass body
        assert_eq!(m.cfg_epoch, 1);
        assert_eq!(m.name, "stamped@1");
        assert!(m.cfg_up_to_date());
        assert_eq!(m.pending_passes(), 0);
    }

    #[test]
    fn invalidating_pass_clears_the_flag() {
        let mut m = Module::new("m");
        m.schedule_pass_last(epoch_stamp_pass(true, true));
        m.run_all_passes();
        assert_eq!(m.cfg_epoch, 1);
        assert!(!m.cfg_up_to_date());
    }

    #[test]
    fn two_passes_share_one_cfg_rebuild() {
        // scenario: one pass requires the CFG, the next does not; running
        // both produces exactly one rebuild
        let mut m = Module::new("m");
        m.schedule_pass_last(epoch_stamp_pass(true, false));
        m.schedule_pass_last(noop_pass("after"));
        assert!(m.run_next_pass());
        assert!(m.run_next_pass());
        assert_eq!(m.cfg_epoch, 1);
        assert_eq!(m.pending_passes(), 0);
    }

    #[test]
    fn cfg_stays_warm_for_later_requiring_passes() {
        let mut m = Module::new("m");
        m.schedule_pass_last(epoch_stamp_pass(true, false));
        m.schedule_pass_last(epoch_stamp_pass(true, false));
        m.run_all_passes();
        assert_eq!(m.cfg_epoch, 1);
    }

    #[test]
    fn invalidation_forces_a_second_rebuild() {
        let mut m = Module::new("m");
        m.schedule_pass_last(epoch_stamp_pass(true, true));
        m.schedule_pass_last(epoch_stamp_pass(true, false));
        m.run_all_passes();
        assert_eq!(m.cfg_epoch, 2);
        assert_eq!(m.name, "stamped@2");
    }

    #[test]
    fn fatal_diagnostics_stop_the_scheduler() {
        let mut m = Module::new("m");
        m.schedule_pass_last(noop_pass("never"));
        m.report(Diagnostic::fatal(
            "binop",
            "f",
            DiagKind::MismatchedOperands {
                lhs: "i64".into(),
                rhs: "i32".into(),
            },
        ));
        assert!(!m.run_next_pass());
        // the pass was not consumed
        assert_eq!(m.pending_passes(), 1);
    }

    #[test]
    fn mach_pass_kinds_dispatch() {
        use crate::mach::{MachBuffer, MachItem};

        fn select(m: &mut Module, buf: &mut MachBuffer) {
            let sym = m.func(crate::ir::module::FuncRef(0)).sym;
            buf.push(MachItem::SymbolLabel(sym));
        }
        fn peephole(buf: &mut MachBuffer) {
            buf.push(MachItem::Align(4));
        }

        let mut m = Module::new("m");
        m.new_function(None, Binding::Export);
        m.schedule_pass_last(Pass {
            name: "select",
            kind: PassKind::ModuleToMach(select),
            requires_cfg: false,
            invalidates_cfg: false,
        });
        m.schedule_pass_last(Pass {
            name: "peephole",
            kind: PassKind::MachToMach(peephole),
            requires_cfg: false,
            invalidates_cfg: false,
        });
        m.run_all_passes();
        assert_eq!(m.mach.len(), 2);
    }

    // ============ Built-in transform passes ============

    #[test]
    fn movprop_rewrites_uses_and_elim_sweeps() {
        let mut m = Module::new("m");
        let fr = m.new_function(None, Binding::Local);
        m.func_mut(fr).set_params(&[TyRef::I64]);
        m.func_mut(fr).set_returns(&[TyRef::I64]);
        let mut b = Builder::new(&mut m, fr);
        let entry = b.new_block("entry");
        let p = b.paramval(0);
        b.append(entry, p);
        let mv = b.mov(p);
        b.append(entry, mv);
        let mv2 = b.mov(mv);
        b.append(entry, mv2);
        let add = b.binop(BinOp::Add, mv2, mv2);
        b.append(entry, add);
        let rv = b.returnval(0, add);
        b.append(entry, rv);
        let r = b.ret();
        b.append(entry, r);

        m.schedule_pass_last(builtin::movprop());
        m.schedule_pass_last(builtin::elim());
        m.run_all_passes();

        let f = m.func(fr);
        // the add now reads the parameter directly
        match f.inst(add).kind {
            crate::ir::instr::InstKind::Binop { lhs, rhs, .. } => {
                assert_eq!(lhs, p);
                assert_eq!(rhs, p);
            }
            ref other => panic!("expected binop, got {other:?}"),
        }
        // both movs are gone from the chain
        let ops: Vec<Opcode> = f.block_insts(entry).map(|i| f.inst(i).opcode()).collect();
        assert_eq!(
            ops,
            vec![
                Opcode::ParamVal,
                Opcode::Binop,
                Opcode::ReturnVal,
                Opcode::Return
            ]
        );
    }

    #[test]
    fn tdce_removes_unused_pure_instructions() {
        let mut m = Module::new("m");
        let fr = m.new_function(None, Binding::Local);
        m.func_mut(fr).set_params(&[TyRef::I64]);
        m.func_mut(fr).set_returns(&[TyRef::I64]);
        let mut b = Builder::new(&mut m, fr);
        let entry = b.new_block("entry");
        let p = b.paramval(0);
        b.append(entry, p);
        // dead chain: the add is only used by the dead mul
        let dead_add = b.binop(BinOp::Add, p, p);
        b.append(entry, dead_add);
        let dead_mul = b.binop(BinOp::Mul, dead_add, dead_add);
        b.append(entry, dead_mul);
        let rv = b.returnval(0, p);
        b.append(entry, rv);
        let r = b.ret();
        b.append(entry, r);

        m.schedule_pass_last(builtin::tdce());
        m.run_all_passes();

        let f = m.func(fr);
        let ops: Vec<Opcode> = f.block_insts(entry).map(|i| f.inst(i).opcode()).collect();
        assert_eq!(ops, vec![Opcode::ParamVal, Opcode::ReturnVal, Opcode::Return]);
    }
}
