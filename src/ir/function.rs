//! Functions, basic blocks, and the instruction chain
//!
//! Every instruction of a function lives in the function's [`Region`] and
//! is threaded into exactly one block's chain. Each block's chain is a ring
//! closed through a per-block sentinel instruction: the sentinel's `next`
//! is the block's first real instruction and its `prev` is the last, and a
//! block holding only its sentinel is empty. Because the ring is never
//! open-ended, insertion and removal at either end are the same pointer
//! relinking as anywhere else; there are no head/tail special cases.

use crate::arena::{Region, DEFAULT_REGION_BLOCK};

use super::instr::{BlockRef, Inst, InstKind, InstRef, Opcode, StackRef, SymRef};
use super::types::TyRef;

/// A named basic block. The block records only its sentinel; first and
/// last are read through the ring and can never desynchronize from it.
#[derive(Debug)]
pub struct Block {
    pub name: String,
    sentinel: InstRef,
}

impl Block {
    pub fn sentinel(&self) -> InstRef {
        self.sentinel
    }
}

/// A typed local storage slot. Address-taking and stack load/store
/// instructions refer to it by its index in the declaring function, not by
/// a memory address, so later passes may renumber or eliminate slots
/// safely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackObject {
    pub name: String,
    pub ty: TyRef,
}

/// A function: its symbol, its instruction region, its blocks, signature,
/// and stack slots. Dropping the function releases the region and with it
/// every instruction and sentinel it owns.
#[derive(Debug)]
pub struct Function {
    pub sym: SymRef,
    region: Region<Inst>,
    blocks: Vec<Block>,
    /// Index of the entry block in `blocks`. Block 0 need not be the entry.
    pub entry: u32,
    params: Vec<TyRef>,
    returns: Vec<TyRef>,
    stack: Vec<StackObject>,
    /// Control-flow analysis, present only while up to date. Rebuilt by the
    /// built-in CFG pass; cleared by the scheduler when a pass invalidates
    /// control flow.
    pub cfg: Option<super::cfg::CfgInfo>,
}

impl Function {
    pub(crate) fn new(sym: SymRef) -> Self {
        Self {
            sym,
            region: Region::open(DEFAULT_REGION_BLOCK),
            blocks: Vec::new(),
            entry: 0,
            params: Vec::new(),
            returns: Vec::new(),
            stack: Vec::new(),
            cfg: None,
        }
    }

    // ============ Signature ============

    /// Declare the parameter types, replacing any previous declaration.
    pub fn set_params(&mut self, params: &[TyRef]) {
        self.params = params.to_vec();
    }

    /// Declare the return types, replacing any previous declaration.
    pub fn set_returns(&mut self, returns: &[TyRef]) {
        self.returns = returns.to_vec();
    }

    pub fn params(&self) -> &[TyRef] {
        &self.params
    }

    pub fn returns(&self) -> &[TyRef] {
        &self.returns
    }

    // ============ Blocks and stack objects ============

    /// Create an empty block: its sentinel is allocated in the region and
    /// linked to itself.
    pub fn new_block(&mut self, name: impl Into<String>) -> BlockRef {
        let b = BlockRef(self.blocks.len() as u32);
        let sentinel = InstRef(self.region.alloc(Inst::new(InstKind::Sentinel)));
        {
            let s = self.region.get_mut(sentinel.0);
            s.prev = sentinel;
            s.next = sentinel;
            s.block = b;
        }
        self.blocks.push(Block {
            name: name.into(),
            sentinel,
        });
        b
    }

    pub fn block(&self, b: BlockRef) -> &Block {
        &self.blocks[b.0 as usize]
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockRef> {
        (0..self.blocks.len() as u32).map(BlockRef)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Position of a block in this function's block list.
    pub fn block_index(&self, b: BlockRef) -> usize {
        b.0 as usize
    }

    /// Create a typed stack slot. The synthesized name is stable for dumps.
    pub fn new_stack_object(&mut self, ty: TyRef) -> StackRef {
        let r = StackRef(self.stack.len() as u32);
        self.stack.push(StackObject {
            name: format!("slot{}", r.0),
            ty,
        });
        r
    }

    pub fn stack_object(&self, s: StackRef) -> &StackObject {
        &self.stack[s.0 as usize]
    }

    pub fn stack_objects(&self) -> &[StackObject] {
        &self.stack
    }

    // ============ Instruction access ============

    /// Allocate an instruction in this function's region. The record is
    /// typed void and unlinked; link it with [`Function::append`] or the
    /// insert operations.
    pub fn new_inst(&mut self, kind: InstKind) -> InstRef {
        InstRef(self.region.alloc(Inst::new(kind)))
    }

    pub fn inst(&self, i: InstRef) -> &Inst {
        self.region.get(i.0)
    }

    pub fn inst_mut(&mut self, i: InstRef) -> &mut Inst {
        self.region.get_mut(i.0)
    }

    /// First real instruction of a block, if any.
    pub fn first_inst(&self, b: BlockRef) -> Option<InstRef> {
        let s = self.block(b).sentinel;
        let n = self.inst(s).next;
        (n != s).then_some(n)
    }

    /// Last real instruction of a block, if any.
    pub fn last_inst(&self, b: BlockRef) -> Option<InstRef> {
        let s = self.block(b).sentinel;
        let p = self.inst(s).prev;
        (p != s).then_some(p)
    }

    pub fn block_is_empty(&self, b: BlockRef) -> bool {
        self.first_inst(b).is_none()
    }

    /// Forward traversal of a block's real instructions. The sentinel is
    /// filtered out.
    pub fn block_insts(&self, b: BlockRef) -> BlockInsts<'_> {
        let sentinel = self.block(b).sentinel;
        BlockInsts {
            func: self,
            sentinel,
            cur: self.inst(sentinel).next,
        }
    }

    // ============ Chain mutation ============

    /// Link `inst` as the new logical last instruction of `block`, i.e.
    /// directly before the sentinel.
    pub fn append(&mut self, block: BlockRef, inst: InstRef) {
        let sentinel = self.block(block).sentinel;
        self.insert_before(inst, sentinel);
    }

    /// Splice `new` into the chain immediately before `reference`.
    /// `new` must be unlinked; `reference` must be linked (a block's
    /// sentinel counts). Violating either is a fatal usage error.
    pub fn insert_before(&mut self, new: InstRef, reference: InstRef) {
        self.check_unlinked(new);
        self.check_linked(reference);
        let prev = self.inst(reference).prev;
        let block = self.inst(reference).block;
        self.inst_mut(prev).next = new;
        self.inst_mut(reference).prev = new;
        let n = self.inst_mut(new);
        n.prev = prev;
        n.next = reference;
        n.block = block;
    }

    /// Splice `new` into the chain immediately after `reference`.
    pub fn insert_after(&mut self, new: InstRef, reference: InstRef) {
        self.check_unlinked(new);
        self.check_linked(reference);
        let next = self.inst(reference).next;
        let block = self.inst(reference).block;
        self.inst_mut(next).prev = new;
        self.inst_mut(reference).next = new;
        let n = self.inst_mut(new);
        n.prev = reference;
        n.next = next;
        n.block = block;
    }

    /// Unlink `inst` by relinking its neighbors. The record itself is
    /// region-owned and is not reclaimed. Removing a sentinel is a fatal
    /// usage error.
    pub fn remove(&mut self, inst: InstRef) {
        self.check_linked(inst);
        assert!(
            self.inst(inst).opcode() != Opcode::Sentinel,
            "cannot remove a block's sentinel"
        );
        let (prev, next) = {
            let i = self.inst(inst);
            (i.prev, i.next)
        };
        self.inst_mut(prev).next = next;
        self.inst_mut(next).prev = prev;
        let i = self.inst_mut(inst);
        i.prev = InstRef::NONE;
        i.next = InstRef::NONE;
        i.block = BlockRef::NONE;
    }

    /// Move `inst` to sit immediately before `reference`. Defined as
    /// remove-then-insert; a no-op when already in position.
    pub fn move_before(&mut self, inst: InstRef, reference: InstRef) {
        if self.inst(reference).prev == inst {
            return;
        }
        self.remove(inst);
        self.insert_before(inst, reference);
    }

    /// Move `inst` to sit immediately after `reference`. A no-op when
    /// already in position.
    pub fn move_after(&mut self, inst: InstRef, reference: InstRef) {
        if self.inst(reference).next == inst {
            return;
        }
        self.remove(inst);
        self.insert_after(inst, reference);
    }

    // ============ Numbering ============

    /// Assign sequence numbers to every linked non-sentinel instruction in
    /// block order, starting at 1. Returns the count assigned.
    pub fn renumber(&mut self) -> u32 {
        let mut count = 0;
        for b in 0..self.blocks.len() {
            let mut insts: Vec<InstRef> = self.block_insts(BlockRef(b as u32)).collect();
            for i in insts.drain(..) {
                count += 1;
                self.inst_mut(i).number = count;
            }
        }
        count
    }

    fn check_unlinked(&self, inst: InstRef) {
        assert!(
            !self.inst(inst).is_linked(),
            "instruction is already linked into a block"
        );
    }

    fn check_linked(&self, inst: InstRef) {
        assert!(
            self.inst(inst).is_linked(),
            "reference instruction is not linked into a block"
        );
    }
}

/// Iterator over a block's real instructions in chain order.
pub struct BlockInsts<'a> {
    func: &'a Function,
    sentinel: InstRef,
    cur: InstRef,
}

impl Iterator for BlockInsts<'_> {
    type Item = InstRef;

    fn next(&mut self) -> Option<InstRef> {
        if self.cur == self.sentinel {
            return None;
        }
        let r = self.cur;
        self.cur = self.func.inst(r).next;
        Some(r)
    }
}
