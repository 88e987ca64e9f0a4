//! Instruction IR.
//!
//! Each instruction is a small data structure with public fields; the
//! [`Instr`] enum is the tagged union over all concrete forms and is what
//! block sequences store. The generated [`InstrOp`] discriminant (via
//! `strum`) classifies instructions without matching payloads.
//!
//! Submodules group families of operations:
//!
//! - `int`: integer arithmetic, comparisons and casts
//! - `mem`: allocas, loads, stores and address computation
//! - `misc`: calls, phis, selects, and the prohibited invoke/resume forms
//! - `terminator`: control-flow terminators
//! - `operand`: shared operand and label types

use smallvec::SmallVec;
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::{name::Name, types::Ty};

pub mod int;
pub mod mem;
pub mod misc;
pub mod operand;
pub mod terminator;

pub use operand::{Label, Operand};
pub use terminator::Terminator;

/// Discriminated union covering all instruction kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(InstrOp))]
pub enum Instr {
    // Integer instructions
    Bin(int::Bin),
    Cmp(int::Cmp),
    Cast(int::Cast),

    // Memory instructions
    Alloca(mem::Alloca),
    Load(mem::Load),
    Store(mem::Store),
    Gep(mem::Gep),

    // Calls and SSA plumbing
    Call(misc::Call),
    Phi(misc::Phi),
    Select(misc::Select),

    // Prohibited in kernel IR, parsed only to be rejected
    Invoke(misc::Invoke),
    Resume(misc::Resume),

    // Control flow
    Term(Terminator),
}

impl Instr {
    pub fn op(&self) -> InstrOp {
        self.into()
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Instr::Term(_))
    }

    /// The SSA name this instruction defines, if any.
    pub fn destination(&self) -> Option<&Name> {
        match self {
            Instr::Bin(i) => Some(&i.dest),
            Instr::Cmp(i) => Some(&i.dest),
            Instr::Cast(i) => Some(&i.dest),
            Instr::Alloca(i) => Some(&i.dest),
            Instr::Load(i) => Some(&i.dest),
            Instr::Gep(i) => Some(&i.dest),
            Instr::Call(i) => i.dest.as_ref(),
            Instr::Phi(i) => Some(&i.dest),
            Instr::Select(i) => Some(&i.dest),
            Instr::Invoke(i) => i.dest.as_ref(),
            Instr::Store(_) | Instr::Resume(_) | Instr::Term(_) => None,
        }
    }

    /// Type of the defined SSA value, if the instruction produces one.
    pub fn destination_ty(&self) -> Option<Ty> {
        match self {
            Instr::Bin(i) => Some(i.ty.clone()),
            Instr::Cmp(_) => Some(Ty::I1),
            Instr::Cast(i) => Some(i.to.clone()),
            Instr::Alloca(_) | Instr::Gep(_) => Some(Ty::Ptr),
            Instr::Load(i) => Some(i.ty.clone()),
            Instr::Call(i) => i.dest.as_ref().and_then(|_| i.ty.clone()),
            Instr::Phi(i) => Some(i.ty.clone()),
            Instr::Select(i) => Some(i.ty.clone()),
            Instr::Invoke(i) => i.dest.as_ref().and_then(|_| i.ty.clone()),
            Instr::Store(_) | Instr::Resume(_) | Instr::Term(_) => None,
        }
    }

    /// Overwrite the destination name of a value-producing instruction.
    /// No-op for instructions without a destination.
    pub fn set_destination(&mut self, name: Name) {
        match self {
            Instr::Bin(i) => i.dest = name,
            Instr::Cmp(i) => i.dest = name,
            Instr::Cast(i) => i.dest = name,
            Instr::Alloca(i) => i.dest = name,
            Instr::Load(i) => i.dest = name,
            Instr::Gep(i) => i.dest = name,
            Instr::Call(i) => i.dest = Some(name),
            Instr::Phi(i) => i.dest = name,
            Instr::Select(i) => i.dest = name,
            Instr::Invoke(i) => i.dest = Some(name),
            Instr::Store(_) | Instr::Resume(_) | Instr::Term(_) => {}
        }
    }

    /// All input operands, in textual order.
    pub fn operands(&self) -> SmallVec<[&Operand; 4]> {
        let mut out = SmallVec::new();
        match self {
            Instr::Bin(i) => out.extend([&i.lhs, &i.rhs]),
            Instr::Cmp(i) => out.extend([&i.lhs, &i.rhs]),
            Instr::Cast(i) => out.push(&i.value),
            Instr::Alloca(i) => out.extend(i.count.iter().map(|(_, op)| op)),
            Instr::Load(i) => out.push(&i.addr),
            Instr::Store(i) => out.extend([&i.value, &i.addr]),
            Instr::Gep(i) => {
                out.push(&i.addr);
                out.extend(i.indices.iter().map(|(_, op)| op));
            }
            Instr::Call(i) => out.extend(i.args.iter().map(|(_, op)| op)),
            Instr::Phi(i) => out.extend(i.incoming.iter().map(|(op, _)| op)),
            Instr::Select(i) => out.extend([&i.cond, &i.if_true, &i.if_false]),
            Instr::Invoke(i) => out.extend(i.args.iter().map(|(_, op)| op)),
            Instr::Resume(i) => out.push(&i.value),
            Instr::Term(t) => match t {
                Terminator::CondBr(cbr) => out.push(&cbr.cond),
                Terminator::Ret(ret) => out.extend(ret.value.iter().map(|(_, op)| op)),
                Terminator::Br(_) | Terminator::Unreachable => {}
            },
        }
        out
    }
}

macro_rules! define_instr_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Instr {
            fn from(inst: $typ) -> Self {
                Instr::$variant(inst)
            }
        }
    };
}

define_instr_from!(int::Bin, Bin);
define_instr_from!(int::Cmp, Cmp);
define_instr_from!(int::Cast, Cast);
define_instr_from!(mem::Alloca, Alloca);
define_instr_from!(mem::Load, Load);
define_instr_from!(mem::Store, Store);
define_instr_from!(mem::Gep, Gep);
define_instr_from!(misc::Call, Call);
define_instr_from!(misc::Phi, Phi);
define_instr_from!(misc::Select, Select);
define_instr_from!(misc::Invoke, Invoke);
define_instr_from!(misc::Resume, Resume);
define_instr_from!(Terminator, Term);
