//! IR types
//!
//! Structural types interned in a per-module [`TypeGraph`]. Interning
//! deduplicates by shape, so two types compare equal exactly when their
//! `TyRef`s are equal.

use std::collections::HashMap;
use std::fmt;

/// A handle into a module's type graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TyRef(pub u32);

impl TyRef {
    // Scalars are interned at fixed positions by `TypeGraph::new`.
    pub const VOID: TyRef = TyRef(0);
    pub const BOOL: TyRef = TyRef(1);
    pub const U8: TyRef = TyRef(2);
    pub const U16: TyRef = TyRef(3);
    pub const U32: TyRef = TyRef(4);
    pub const U64: TyRef = TyRef(5);
    pub const I8: TyRef = TyRef(6);
    pub const I16: TyRef = TyRef(7);
    pub const I32: TyRef = TyRef(8);
    pub const I64: TyRef = TyRef(9);
    pub const F16: TyRef = TyRef(10);
    pub const F32: TyRef = TyRef(11);
    pub const F64: TyRef = TyRef(12);
    pub const PTR: TyRef = TyRef(13);
}

/// The shape of a type.
///
/// Pointers are untyped: address arithmetic goes through the field/index
/// pointer instructions, which carry the aggregate shape themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
    Ptr,
    /// Fixed-length array of one element type.
    Array { elem: TyRef, len: u64 },
    /// Ordered field list. Structural: two aggregates with the same field
    /// types are the same type.
    Aggregate { fields: Vec<TyRef> },
}

impl TypeKind {
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            TypeKind::Void | TypeKind::Array { .. } | TypeKind::Aggregate { .. }
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeKind::U8
                | TypeKind::U16
                | TypeKind::U32
                | TypeKind::U64
                | TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeKind::F16 | TypeKind::F32 | TypeKind::F64)
    }
}

/// Per-module type store, deduplicated by shape.
#[derive(Debug)]
pub struct TypeGraph {
    kinds: Vec<TypeKind>,
    dedup: HashMap<TypeKind, TyRef>,
}

impl TypeGraph {
    /// Create a graph with every scalar preinterned at its `TyRef` constant.
    pub fn new() -> Self {
        let mut graph = Self {
            kinds: Vec::new(),
            dedup: HashMap::new(),
        };
        for kind in [
            TypeKind::Void,
            TypeKind::Bool,
            TypeKind::U8,
            TypeKind::U16,
            TypeKind::U32,
            TypeKind::U64,
            TypeKind::I8,
            TypeKind::I16,
            TypeKind::I32,
            TypeKind::I64,
            TypeKind::F16,
            TypeKind::F32,
            TypeKind::F64,
            TypeKind::Ptr,
        ] {
            graph.intern(kind);
        }
        graph
    }

    /// Intern a type, returning the existing handle if an equal shape is
    /// already present.
    pub fn intern(&mut self, kind: TypeKind) -> TyRef {
        if let Some(&existing) = self.dedup.get(&kind) {
            return existing;
        }
        let r = TyRef(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.dedup.insert(kind, r);
        r
    }

    pub fn kind(&self, ty: TyRef) -> &TypeKind {
        &self.kinds[ty.0 as usize]
    }

    pub fn is_scalar(&self, ty: TyRef) -> bool {
        self.kind(ty).is_scalar()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Render a type for dumps and diagnostics.
    pub fn name(&self, ty: TyRef) -> String {
        match self.kind(ty) {
            TypeKind::Void => "void".into(),
            TypeKind::Bool => "bool".into(),
            TypeKind::U8 => "u8".into(),
            TypeKind::U16 => "u16".into(),
            TypeKind::U32 => "u32".into(),
            TypeKind::U64 => "u64".into(),
            TypeKind::I8 => "i8".into(),
            TypeKind::I16 => "i16".into(),
            TypeKind::I32 => "i32".into(),
            TypeKind::I64 => "i64".into(),
            TypeKind::F16 => "f16".into(),
            TypeKind::F32 => "f32".into(),
            TypeKind::F64 => "f64".into(),
            TypeKind::Ptr => "ptr".into(),
            TypeKind::Array { elem, len } => format!("[{} x {}]", len, self.name(*elem)),
            TypeKind::Aggregate { fields } => {
                let mut s = String::from("{");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&self.name(*f));
                }
                s.push('}');
                s
            }
        }
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
