//! Calls, SSA selectors, and the exception-style constructs that kernel IR
//! must not contain but the parser still has to understand.

use crate::{
    instr::operand::{Label, Operand},
    name::Name,
    types::Ty,
};

/// Call target: a named symbol or an inline-asm string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Callee {
    Sym(String),
    Asm(String),
}

impl Callee {
    /// The resolvable symbol name, when there is one.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Callee::Sym(name) => Some(name),
            Callee::Asm(_) => None,
        }
    }

    pub fn is_asm(&self) -> bool {
        matches!(self, Callee::Asm(_))
    }
}

/// Function call. `ty` is `None` for `void` calls, in which case `dest`
/// must be `None` as well.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Call {
    pub dest: Option<Name>,
    pub ty: Option<Ty>,
    pub callee: Callee,
    pub args: Vec<(Ty, Operand)>,
}

/// SSA merge point. Incoming values are `(value, predecessor label)` pairs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Phi {
    pub dest: Name,
    pub ty: Ty,
    pub incoming: Vec<(Operand, Label)>,
}

/// Conditional value selection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Select {
    pub dest: Name,
    pub ty: Ty,
    pub cond: Operand,
    pub if_true: Operand,
    pub if_false: Operand,
}

/// Exception-aware call. Kernel modules never contain these; the driver
/// rejects any module in which one appears.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Invoke {
    pub dest: Option<Name>,
    pub ty: Option<Ty>,
    pub callee: Callee,
    pub args: Vec<(Ty, Operand)>,
    pub normal: Label,
    pub unwind: Label,
}

/// Exception propagation. Rejected alongside [`Invoke`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Resume {
    pub ty: Ty,
    pub value: Operand,
}
