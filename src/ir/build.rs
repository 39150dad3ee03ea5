//! Builder-facing construction API
//!
//! One validated constructor per opcode family. Every constructor checks
//! operand typing before building the record; a violation is reported as a
//! fatal, function-scoped diagnostic on the module and construction
//! continues, so a single run surfaces as many builder errors as possible.
//!
//! Constructors return the new instruction unlinked; place it with
//! [`Builder::append`] or the function's insert operations.

use crate::diag::{DiagKind, Diagnostic};

use super::instr::{
    BinOp, BlockRef, CastOp, CmpOp, ConstVal, InstKind, InstRef, Opcode, PhiSource, StackRef,
    SymRef, UnOp,
};
use super::module::{FuncRef, Module};
use super::types::TyRef;

/// Constructs validated instructions for one function of a module.
pub struct Builder<'a> {
    module: &'a mut Module,
    func: FuncRef,
}

impl<'a> Builder<'a> {
    pub fn new(module: &'a mut Module, func: FuncRef) -> Self {
        Self { module, func }
    }

    pub fn func(&self) -> FuncRef {
        self.func
    }

    // ============ Structure convenience ============

    pub fn new_block(&mut self, name: impl Into<String>) -> BlockRef {
        self.module.func_mut(self.func).new_block(name)
    }

    pub fn new_stack_object(&mut self, ty: TyRef) -> StackRef {
        self.module.func_mut(self.func).new_stack_object(ty)
    }

    /// Place an instruction as the new logical last element of `block`.
    pub fn append(&mut self, block: BlockRef, inst: InstRef) -> InstRef {
        self.module.func_mut(self.func).append(block, inst);
        inst
    }

    // ============ Value instructions ============

    /// Binary arithmetic/bitwise operation. Both operands must share a
    /// type. For commutative add/mul a constant left operand is reordered
    /// to the right-hand side to improve later pattern matching.
    pub fn binop(&mut self, op: BinOp, lhs: InstRef, rhs: InstRef) -> InstRef {
        let (mut lhs, mut rhs) = (lhs, rhs);
        let (tl, tr) = (self.ty_of(lhs), self.ty_of(rhs));
        if tl != tr {
            self.report("binop", DiagKind::MismatchedOperands {
                lhs: self.ty_name(tl),
                rhs: self.ty_name(tr),
            });
        }
        if op.is_commutative() && self.is_const(lhs) && !self.is_const(rhs) {
            std::mem::swap(&mut lhs, &mut rhs);
        }
        self.make(InstKind::Binop { op, lhs, rhs }, tl)
    }

    /// Comparison. Both operands must share a type; the result is boolean.
    pub fn cmp(&mut self, op: CmpOp, lhs: InstRef, rhs: InstRef) -> InstRef {
        let (tl, tr) = (self.ty_of(lhs), self.ty_of(rhs));
        if tl != tr {
            self.report("cmp", DiagKind::MismatchedOperands {
                lhs: self.ty_name(tl),
                rhs: self.ty_name(tr),
            });
        }
        self.make(InstKind::Cmp { op, lhs, rhs }, TyRef::BOOL)
    }

    pub fn unop(&mut self, op: UnOp, src: InstRef) -> InstRef {
        let ty = self.ty_of(src);
        self.make(InstKind::Unop { op, src }, ty)
    }

    /// Width/representation change producing a value of type `to`.
    pub fn cast(&mut self, op: CastOp, src: InstRef, to: TyRef) -> InstRef {
        self.make(InstKind::Cast { op, src }, to)
    }

    // ============ Memory ============

    /// Load a scalar of type `ty` from the address `addr`.
    pub fn load(&mut self, ty: TyRef, addr: InstRef, volatile: bool) -> InstRef {
        if !self.module.types.is_scalar(ty) {
            self.report("load", DiagKind::NonScalarMemory {
                ty: self.ty_name(ty),
            });
        }
        self.make(InstKind::Load { addr, volatile }, ty)
    }

    /// Store `value` (which must be scalar-typed) to the address `addr`.
    pub fn store(&mut self, addr: InstRef, value: InstRef, volatile: bool) -> InstRef {
        let vt = self.ty_of(value);
        if !self.module.types.is_scalar(vt) {
            self.report("store", DiagKind::NonScalarMemory {
                ty: self.ty_name(vt),
            });
        }
        self.make(
            InstKind::Store {
                addr,
                value,
                volatile,
            },
            TyRef::VOID,
        )
    }

    pub fn stack_load(&mut self, slot: StackRef) -> InstRef {
        let ty = self.slot_ty(slot);
        if !self.module.types.is_scalar(ty) {
            self.report("stack_load", DiagKind::NonScalarMemory {
                ty: self.ty_name(ty),
            });
        }
        self.make(InstKind::StackLoad { slot }, ty)
    }

    /// Store `value` into `slot`. The value's type must equal the slot's
    /// declared type.
    pub fn stack_store(&mut self, slot: StackRef, value: InstRef) -> InstRef {
        let st = self.slot_ty(slot);
        let vt = self.ty_of(value);
        if !self.module.types.is_scalar(st) {
            self.report("stack_store", DiagKind::NonScalarMemory {
                ty: self.ty_name(st),
            });
        }
        if st != vt {
            self.report("stack_store", DiagKind::SlotTypeMismatch {
                value: self.ty_name(vt),
                slot: self.ty_name(st),
            });
        }
        self.make(InstKind::StackStore { slot, value }, TyRef::VOID)
    }

    /// Materialize the address of a stack slot.
    pub fn stack_addr(&mut self, slot: StackRef) -> InstRef {
        self.make(InstKind::StackAddr { slot }, TyRef::PTR)
    }

    pub fn field_ptr(&mut self, base: InstRef, field: u32) -> InstRef {
        self.make(InstKind::FieldPtr { base, field }, TyRef::PTR)
    }

    pub fn index_ptr(&mut self, base: InstRef, index: InstRef) -> InstRef {
        self.make(InstKind::IndexPtr { base, index }, TyRef::PTR)
    }

    // ============ Constants and symbols ============

    pub fn iconst(&mut self, ty: TyRef, value: i64) -> InstRef {
        self.make(InstKind::Const(ConstVal::Int(value)), ty)
    }

    pub fn uconst(&mut self, ty: TyRef, value: u64) -> InstRef {
        self.make(InstKind::Const(ConstVal::Uint(value)), ty)
    }

    pub fn fconst(&mut self, ty: TyRef, value: f64) -> InstRef {
        self.make(InstKind::Const(ConstVal::Float(value)), ty)
    }

    pub fn bconst(&mut self, value: bool) -> InstRef {
        self.make(InstKind::Const(ConstVal::Bool(value)), TyRef::BOOL)
    }

    pub fn load_symbol(&mut self, sym: SymRef) -> InstRef {
        self.make(InstKind::LoadSymbol { sym }, TyRef::PTR)
    }

    pub fn mov(&mut self, src: InstRef) -> InstRef {
        let ty = self.ty_of(src);
        self.make(InstKind::Mov { src }, ty)
    }

    // ============ Phi ============

    /// Phi of declared type `ty`. Every source's type must equal `ty`.
    pub fn phi(&mut self, ty: TyRef, sources: &[(InstRef, BlockRef)]) -> InstRef {
        for &(value, _) in sources {
            self.check_phi_source(ty, value);
        }
        let sources = sources
            .iter()
            .map(|&(value, block)| PhiSource { value, block })
            .collect();
        self.make(InstKind::Phi { sources }, ty)
    }

    /// Append one incoming edge to an existing phi. Passing a non-phi
    /// instruction is a fatal internal error.
    pub fn phi_add_source(&mut self, phi: InstRef, value: InstRef, block: BlockRef) {
        let phi_ty = self.ty_of(phi);
        self.check_phi_source(phi_ty, value);
        let f = self.module.func_mut(self.func);
        match &mut f.inst_mut(phi).kind {
            InstKind::Phi { sources } => sources.push(PhiSource { value, block }),
            other => unreachable!("phi_add_source on a {:?} instruction", other.opcode()),
        }
    }

    fn check_phi_source(&mut self, phi_ty: TyRef, value: InstRef) {
        let vt = self.ty_of(value);
        if vt != phi_ty {
            self.report("phi", DiagKind::PhiTypeMismatch {
                src: self.ty_name(vt),
                phi: self.ty_name(phi_ty),
            });
        }
    }

    // ============ Control flow ============

    pub fn jump(&mut self, dest: BlockRef) -> InstRef {
        self.make(InstKind::Jump { dest }, TyRef::VOID)
    }

    /// Conditional branch. The condition must be boolean (the result of a
    /// comparison).
    pub fn branch(&mut self, cond: InstRef, if_true: BlockRef, if_false: BlockRef) -> InstRef {
        let ct = self.ty_of(cond);
        if ct != TyRef::BOOL {
            self.report("branch", DiagKind::NonBooleanCondition {
                ty: self.ty_name(ct),
            });
        }
        self.make(
            InstKind::Branch {
                cond,
                if_true,
                if_false,
            },
            TyRef::VOID,
        )
    }

    /// The value of declared parameter `index`.
    pub fn paramval(&mut self, index: u32) -> InstRef {
        let declared = self.module.func(self.func).params().get(index as usize).copied();
        let ty = match declared {
            Some(ty) => ty,
            None => {
                let count = self.module.func(self.func).params().len() as u32;
                self.report("paramval", DiagKind::ParamIndexOutOfRange { index, count });
                TyRef::VOID
            }
        };
        self.make(InstKind::ParamVal { index }, ty)
    }

    /// Bind `src` as declared return value `index`.
    pub fn returnval(&mut self, index: u32, src: InstRef) -> InstRef {
        let count = self.module.func(self.func).returns().len() as u32;
        if index >= count {
            self.report("returnval", DiagKind::ReturnIndexOutOfRange { index, count });
        }
        self.make(InstKind::ReturnVal { index, src }, TyRef::VOID)
    }

    pub fn ret(&mut self) -> InstRef {
        self.make(InstKind::Return, TyRef::VOID)
    }

    // ============ Internals ============

    fn make(&mut self, kind: InstKind, ty: TyRef) -> InstRef {
        let f = self.module.func_mut(self.func);
        let i = f.new_inst(kind);
        f.inst_mut(i).ty = ty;
        i
    }

    fn ty_of(&self, i: InstRef) -> TyRef {
        self.module.func(self.func).inst(i).ty
    }

    fn slot_ty(&self, s: StackRef) -> TyRef {
        self.module.func(self.func).stack_object(s).ty
    }

    fn is_const(&self, i: InstRef) -> bool {
        self.module.func(self.func).inst(i).opcode() == Opcode::Const
    }

    fn ty_name(&self, ty: TyRef) -> String {
        self.module.types.name(ty)
    }

    fn report(&mut self, op: &'static str, kind: DiagKind) {
        let func = self
            .module
            .symbol(self.module.func(self.func).sym)
            .name
            .clone();
        self.module.report(Diagnostic::fatal(op, func, kind));
    }
}
