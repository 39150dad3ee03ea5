//! Modules, symbols, and data objects
//!
//! A [`Module`] owns everything: its functions, its data objects, the
//! symbol table naming them, the type graph, the diagnostics list, the pass
//! queue, and the machine buffer the backend-facing passes fill. A module
//! and everything it owns is destroyed as one unit.

use crate::diag::{Diagnostic, Severity};
use crate::mach::MachBuffer;
use crate::pass::PassQueue;

use super::function::Function;
use super::instr::SymRef;
use super::types::TypeGraph;

/// A handle to a function within its owning module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(pub u32);

/// A handle to a data object within its owning module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataRef(pub u32);

/// Symbol binding: whether the name is visible outside the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Export,
    Local,
}

/// What a symbol names. Set exactly once, when the function or data object
/// is created; never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymBacking {
    None,
    Function(FuncRef),
    Data(DataRef),
}

/// A named module-level entity. Immutable after creation except for the
/// back-reference, which is bound by `new_function`/`new_data`.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub binding: Binding,
    backing: SymBacking,
}

impl Symbol {
    pub fn backing(&self) -> SymBacking {
        self.backing
    }
}

/// Initializer of a data object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataInit {
    /// Declared but not yet given contents.
    None,
    /// Raw bytes; `zeroed` marks an all-zero run that need not be stored.
    Bytes { bytes: Vec<u8>, zeroed: bool },
    /// The address of another symbol.
    SymbolRef(SymRef),
}

/// A module-level data object.
#[derive(Debug)]
pub struct Data {
    pub sym: SymRef,
    pub read_only: bool,
    pub init: DataInit,
}

/// A compilation unit.
#[derive(Debug)]
pub struct Module {
    pub name: String,
    functions: Vec<Function>,
    datas: Vec<Data>,
    symbols: Vec<Symbol>,
    pub types: TypeGraph,
    pub(crate) queue: PassQueue,
    /// Machine-side output container for module→machine and
    /// machine→machine passes.
    pub mach: MachBuffer,
    pub diags: Vec<Diagnostic>,
    /// Incremented every time the built-in CFG pass runs.
    pub cfg_epoch: u64,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            datas: Vec::new(),
            symbols: Vec::new(),
            types: TypeGraph::new(),
            queue: PassQueue::new(),
            mach: MachBuffer::default(),
            diags: Vec::new(),
            cfg_epoch: 0,
        }
    }

    // ============ Symbols ============

    /// Create a symbol unconditionally. This does NOT check whether the
    /// name already exists; in most cases use
    /// [`Module::find_or_new_symbol`].
    pub fn new_symbol(&mut self, name: impl Into<String>, binding: Binding) -> SymRef {
        let r = SymRef(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.into(),
            binding,
            backing: SymBacking::None,
        });
        r
    }

    /// Look a symbol up by name, creating it if absent.
    pub fn find_or_new_symbol(&mut self, name: &str, binding: Binding) -> SymRef {
        match self.find_symbol(name) {
            Some(s) => s,
            None => self.new_symbol(name, binding),
        }
    }

    /// Linear scan of the symbol table. Acceptable at module scale.
    pub fn find_symbol(&self, name: &str) -> Option<SymRef> {
        self.symbols
            .iter()
            .position(|s| s.name == name)
            .map(|i| SymRef(i as u32))
    }

    pub fn symbol(&self, s: SymRef) -> &Symbol {
        &self.symbols[s.0 as usize]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn bind_symbol(&mut self, s: SymRef, backing: SymBacking) {
        let sym = &mut self.symbols[s.0 as usize];
        assert!(
            sym.backing == SymBacking::None,
            "symbol `{}` already backs a function or data object",
            sym.name
        );
        sym.backing = backing;
    }

    // ============ Functions ============

    /// Create a function. With `sym == None` a symbol is synthesized with a
    /// generated name.
    pub fn new_function(&mut self, sym: Option<SymRef>, binding: Binding) -> FuncRef {
        let r = FuncRef(self.functions.len() as u32);
        let sym = sym.unwrap_or_else(|| self.new_symbol(format!("fn{}", r.0), binding));
        self.bind_symbol(sym, SymBacking::Function(r));
        self.functions.push(Function::new(sym));
        r
    }

    pub fn func(&self, f: FuncRef) -> &Function {
        &self.functions[f.0 as usize]
    }

    pub fn func_mut(&mut self, f: FuncRef) -> &mut Function {
        &mut self.functions[f.0 as usize]
    }

    pub fn funcs(&self) -> impl Iterator<Item = FuncRef> {
        (0..self.functions.len() as u32).map(FuncRef)
    }

    pub fn funcs_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.iter_mut()
    }

    // ============ Data objects ============

    /// Create a data object. With `sym == None` a symbol is synthesized.
    pub fn new_data(&mut self, sym: Option<SymRef>, binding: Binding, read_only: bool) -> DataRef {
        let r = DataRef(self.datas.len() as u32);
        let sym = sym.unwrap_or_else(|| self.new_symbol(format!("data{}", r.0), binding));
        self.bind_symbol(sym, SymBacking::Data(r));
        self.datas.push(Data {
            sym,
            read_only,
            init: DataInit::None,
        });
        r
    }

    pub fn data(&self, d: DataRef) -> &Data {
        &self.datas[d.0 as usize]
    }

    pub fn datas(&self) -> &[Data] {
        &self.datas
    }

    pub fn set_data_bytes(&mut self, d: DataRef, bytes: Vec<u8>, zeroed: bool) {
        self.datas[d.0 as usize].init = DataInit::Bytes { bytes, zeroed };
    }

    pub fn set_data_symref(&mut self, d: DataRef, sym: SymRef) {
        self.datas[d.0 as usize].init = DataInit::SymbolRef(sym);
    }

    // ============ Diagnostics ============

    pub fn report(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    /// Whether any recorded diagnostic is fatal. A fatal diagnostic stops
    /// the pass scheduler.
    pub fn has_fatal(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_or_new_returns_the_existing_symbol() {
        let mut m = Module::new("test");
        let a = m.new_symbol("counter", Binding::Local);
        let b = m.find_or_new_symbol("counter", Binding::Local);
        assert_eq!(a, b);
        let c = m.find_or_new_symbol("other", Binding::Export);
        assert_ne!(a, c);
        assert_eq!(m.symbols().len(), 2);
    }

    #[test]
    fn anonymous_function_gets_synthesized_symbol() {
        let mut m = Module::new("test");
        let f = m.new_function(None, Binding::Export);
        let sym = m.func(f).sym;
        assert_eq!(m.symbol(sym).name, "fn0");
        assert_eq!(m.symbol(sym).backing(), SymBacking::Function(f));
    }

    #[test]
    fn named_function_binds_its_symbol() {
        let mut m = Module::new("test");
        let sym = m.new_symbol("main", Binding::Export);
        let f = m.new_function(Some(sym), Binding::Export);
        assert_eq!(m.func(f).sym, sym);
        assert_eq!(m.symbol(sym).backing(), SymBacking::Function(f));
    }

    #[test]
    #[should_panic(expected = "already backs")]
    fn rebinding_a_symbol_is_fatal() {
        let mut m = Module::new("test");
        let sym = m.new_symbol("x", Binding::Local);
        m.new_function(Some(sym), Binding::Local);
        m.new_data(Some(sym), Binding::Local, false);
    }

    #[test]
    fn data_initializers() {
        let mut m = Module::new("test");
        let msg = m.new_data(None, Binding::Local, true);
        m.set_data_bytes(msg, b"hi\0".to_vec(), false);
        assert_eq!(
            m.data(msg).init,
            DataInit::Bytes {
                bytes: b"hi\0".to_vec(),
                zeroed: false
            }
        );

        let target = m.new_symbol("target", Binding::Local);
        let alias = m.new_data(None, Binding::Export, true);
        m.set_data_symref(alias, target);
        assert_eq!(m.data(alias).init, DataInit::SymbolRef(target));
    }
}
