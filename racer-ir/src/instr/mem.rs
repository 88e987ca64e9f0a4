//! Memory instructions: stack allocation, loads, stores and address
//! computation.

use smallvec::SmallVec;

use crate::{instr::operand::Operand, name::Name, types::Ty};

/// Stack allocation.
///
/// `count` distinguishes the array form `alloca i32, i64 %n` from the plain
/// form; the allocated byte size of the array form is the element alloc
/// size multiplied by the (typed) count operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Alloca {
    pub dest: Name,
    pub ty: Ty,
    pub count: Option<(Ty, Operand)>,
    pub align: Option<u64>,
}

impl Alloca {
    pub fn is_array_allocation(&self) -> bool {
        self.count.is_some()
    }
}

/// Load from memory into a destination SSA name.
///
/// When `volatile` is true, the operation is prevented from being removed
/// or merged by typical optimizations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Load {
    pub dest: Name,
    pub ty: Ty,
    pub addr: Operand,
    pub volatile: bool,
}

/// Store a value to memory.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Store {
    pub ty: Ty,
    pub value: Operand,
    pub addr: Operand,
    pub volatile: bool,
}

/// Address computation over a base pointer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Gep {
    pub dest: Name,
    pub base: Ty,
    pub addr: Operand,
    pub indices: SmallVec<[(Ty, Operand); 2]>,
}
