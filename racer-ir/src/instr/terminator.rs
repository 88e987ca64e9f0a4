//! Control flow terminator instructions.

use smallvec::SmallVec;
use strum::EnumIs;

use crate::{
    instr::operand::{Label, Operand},
    types::Ty,
};

/// Unconditional jump.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Br {
    pub target: Label,
}

/// Conditional branch on an `i1` operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CondBr {
    pub cond: Operand,
    pub if_true: Label,
    pub if_false: Label,
}

/// Return from function. `value` is `None` for a `void` return.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ret {
    pub value: Option<(Ty, Operand)>,
}

/// Control flow terminator instructions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIs)]
pub enum Terminator {
    Br(Br),
    CondBr(CondBr),
    Ret(Ret),
    Unreachable,
}

impl Terminator {
    /// Labels of the blocks this terminator may transfer control to.
    pub fn successors(&self) -> SmallVec<[&Label; 2]> {
        match self {
            Terminator::Br(br) => SmallVec::from_slice(&[&br.target]),
            Terminator::CondBr(cbr) => SmallVec::from_slice(&[&cbr.if_true, &cbr.if_false]),
            Terminator::Ret(_) | Terminator::Unreachable => SmallVec::new(),
        }
    }
}

macro_rules! define_terminator_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Terminator {
            fn from(inst: $typ) -> Self {
                Terminator::$variant(inst)
            }
        }
    };
}

define_terminator_from!(Br, Br);
define_terminator_from!(CondBr, CondBr);
define_terminator_from!(Ret, Ret);
