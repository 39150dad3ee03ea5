//! Textual IR dump
//!
//! A read-only rendering of modules and functions for debugging and tests.
//! Dumping renumbers the function first so operand references print as
//! stable `#n` sequence numbers.

use std::fmt::Write;

use super::function::Function;
use super::instr::{ConstVal, InstKind, InstRef};
use super::module::{FuncRef, Module};
use super::types::TyRef;

impl Module {
    /// Dump every function of the module.
    pub fn dump(&mut self) -> String {
        let funcs: Vec<FuncRef> = self.funcs().collect();
        let mut out = String::new();
        for f in funcs {
            out.push_str(&self.dump_function(f));
        }
        out
    }

    /// Dump one function, renumbering it first.
    pub fn dump_function(&mut self, fr: FuncRef) -> String {
        self.func_mut(fr).renumber();
        let f = self.func(fr);
        let name = &self.symbol(f.sym).name;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "fn \"{}\" ({}) -> ({}) {{",
            name,
            self.ty_list(f.params()),
            self.ty_list(f.returns()),
        );
        for b in f.blocks() {
            let marker = if f.block_index(b) == f.entry as usize {
                "entry "
            } else {
                ""
            };
            let _ = writeln!(out, "    {}{}:", marker, f.block(b).name);
            for i in f.block_insts(b) {
                let _ = writeln!(out, "        {}", self.inst_text(f, i));
            }
        }
        out.push_str("}\n");
        out
    }

    fn ty_list(&self, tys: &[TyRef]) -> String {
        tys.iter()
            .map(|&t| self.types.name(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn inst_text(&self, f: &Function, i: InstRef) -> String {
        let inst = f.inst(i);
        let num = |r: InstRef| format!("#{}", f.inst(r).number);
        let slot = |s| f.stack_object(s).name.as_str();
        let ty = self.types.name(inst.ty);
        let body = match &inst.kind {
            InstKind::Binop { op, lhs, rhs } => {
                format!("{} {}, {}", op.name(), num(*lhs), num(*rhs))
            }
            InstKind::Cmp { op, lhs, rhs } => {
                format!("{} {}, {}", op.name(), num(*lhs), num(*rhs))
            }
            InstKind::Unop { op, src } => format!("{} {}", op.name(), num(*src)),
            InstKind::Cast { op, src } => format!("{} {}", op.name(), num(*src)),
            InstKind::Load { addr, volatile } => {
                format!("{} {}", if *volatile { "vol.load" } else { "load" }, num(*addr))
            }
            InstKind::Store {
                addr,
                value,
                volatile,
            } => format!(
                "{} {}, {}",
                if *volatile { "vol.store" } else { "store" },
                num(*addr),
                num(*value)
            ),
            InstKind::StackLoad { slot: s } => format!("stackload <{}>", slot(*s)),
            InstKind::StackStore { slot: s, value } => {
                format!("stackstore <{}>, {}", slot(*s), num(*value))
            }
            InstKind::StackAddr { slot: s } => format!("stackaddr <{}>", slot(*s)),
            InstKind::FieldPtr { base, field } => format!("fieldptr {}, {}", num(*base), field),
            InstKind::IndexPtr { base, index } => {
                format!("indexptr {}, {}", num(*base), num(*index))
            }
            InstKind::Const(v) => format!("const <{}, {}>", ty, const_text(*v)),
            InstKind::LoadSymbol { sym } => format!("loadsym \"{}\"", self.symbol(*sym).name),
            InstKind::Mov { src } => format!("mov {}", num(*src)),
            InstKind::Phi { sources } => {
                let mut s = String::from("phi ");
                for (n, src) in sources.iter().enumerate() {
                    if n > 0 {
                        s.push_str(", ");
                    }
                    let _ = write!(s, "[{}, {}]", num(src.value), f.block(src.block).name);
                }
                s
            }
            InstKind::Jump { dest } => format!("jump {}", f.block(*dest).name),
            InstKind::Branch {
                cond,
                if_true,
                if_false,
            } => format!(
                "branch {}, {}, {}",
                num(*cond),
                f.block(*if_true).name,
                f.block(*if_false).name
            ),
            InstKind::ParamVal { index } => format!("paramval <{}>", index),
            InstKind::ReturnVal { index, src } => {
                format!("returnval <{}> {}", index, num(*src))
            }
            InstKind::Return => "return".into(),
            InstKind::Eliminated => "---".into(),
            InstKind::Sentinel => unreachable!("sentinel reached the dump"),
        };
        format!("#{:<3} {:<4} = {}", inst.number, ty, body)
    }
}

fn const_text(v: ConstVal) -> String {
    match v {
        ConstVal::Int(i) => i.to_string(),
        ConstVal::Uint(u) => u.to_string(),
        ConstVal::Float(x) => format!("{x}"),
        ConstVal::Bool(b) => b.to_string(),
    }
}
