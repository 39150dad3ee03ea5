//! Basalt Intermediate Representation (BIR)
//!
//! An SSA-oriented IR built for in-place mutation: instructions are
//! variable-shape records allocated from their function's region and
//! threaded into per-block sentinel rings, so splicing, inserting, and
//! removing inside a block are O(1) link updates. Operand references are
//! stable indices into the owning function, never pointers.
//!
//! Construction goes through [`build::Builder`], which validates operand
//! typing and reports violations as module diagnostics. Transformation
//! runs through the pass scheduler in [`crate::pass`].

pub mod build;
pub mod cfg;
pub mod dump;
pub mod function;
pub mod instr;
pub mod module;
pub mod rewrite;
pub mod types;

pub use build::Builder;
pub use cfg::CfgInfo;
pub use function::{Block, BlockInsts, Function, StackObject};
pub use instr::{
    BinOp, BlockRef, CastOp, CmpOp, ConstVal, Inst, InstKind, InstRef, Opcode, PhiSource,
    StackRef, SymRef, UnOp,
};
pub use module::{Binding, Data, DataInit, DataRef, FuncRef, Module, SymBacking, Symbol};
pub use types::{TyRef, TypeGraph, TypeKind};
