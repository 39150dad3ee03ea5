//! Basalt: an SSA intermediate representation core
//!
//! Basalt is the middle of a compiler backend: an external IR generator
//! (driven by semantic analysis) constructs modules through the builder
//! API, scheduled passes read and rewrite the IR in place, and a target
//! backend consumes the result for instruction selection.
//!
//! # Architecture
//!
//! ```text
//! Typed AST (external)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  IR Builder │  → modules, functions, blocks, instructions
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │ Pass Driver │  → module→module, module→machine, machine→machine
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │ Mach Buffer │  → consumed by a target backend (external)
//! └─────────────┘
//! ```
//!
//! Everything a function owns, every instruction and every block
//! sentinel, lives in the function's region and is released with it as
//! one unit. There is no per-instruction reclamation; removal only
//! unlinks.

pub mod arena;
pub mod diag;
pub mod ir;
pub mod mach;
pub mod pass;

// Re-exports for convenience
pub use ir::{Builder, Module};
pub use pass::{Pass, PassKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
