//! Per-module diagnostics
//!
//! Ill-formed IR coming out of the builder is reported here rather than
//! panicking: the builder is expected to keep constructing as much IR as
//! possible so one compilation surfaces every error, the same way a type
//! checker accumulates its findings. Internal invariant violations are not
//! diagnostics; those panic.

use thiserror::Error;

/// How bad a diagnostic is. `Fatal` stops the pass scheduler from running
/// any further passes on the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// Builder-misuse diagnostics. Types are rendered to text at report time so
/// the diagnostic stays readable without the module's type graph in hand.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagKind {
    #[error("operand types differ: `{lhs}` vs `{rhs}`")]
    MismatchedOperands { lhs: String, rhs: String },

    #[error("memory access of non-scalar type `{ty}`")]
    NonScalarMemory { ty: String },

    #[error("stored value type `{value}` does not match slot type `{slot}`")]
    SlotTypeMismatch { value: String, slot: String },

    #[error("branch condition is `{ty}`, not `bool`")]
    NonBooleanCondition { ty: String },

    #[error("phi source type `{src}` does not match phi type `{phi}`")]
    PhiTypeMismatch { src: String, phi: String },

    #[error("parameter index {index} out of range ({count} declared)")]
    ParamIndexOutOfRange { index: u32, count: u32 },

    #[error("return index {index} out of range ({count} declared)")]
    ReturnIndexOutOfRange { index: u32, count: u32 },
}

/// One reported problem, tagged with the construction operation that
/// produced it and the function it was building.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Name of the originating operation, e.g. `"binop"` or `"stack_store"`.
    pub op: &'static str,
    /// Name of the function being built.
    pub func: String,
    pub kind: DiagKind,
}

impl Diagnostic {
    pub fn fatal(op: &'static str, func: impl Into<String>, kind: DiagKind) -> Self {
        Self {
            severity: Severity::Fatal,
            op,
            func: func.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: in `{}`: {}", self.op, self.func, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_and_function() {
        let d = Diagnostic::fatal(
            "branch",
            "main",
            DiagKind::NonBooleanCondition { ty: "i64".into() },
        );
        assert_eq!(d.severity, Severity::Fatal);
        assert_eq!(
            format!("{d}"),
            "branch: in `main`: branch condition is `i64`, not `bool`"
        );
    }

    #[test]
    fn severity_orders_fatal_last() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }
}
