//! Integer arithmetic, comparison and conversion instructions.
//!
//! Each instruction carries its destination `Name`, its operating type and
//! its input operands.

use strum::{EnumIter, IntoEnumIterator};

use crate::{instr::operand::Operand, name::Name, types::Ty};

/// Two-operand integer operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinOp {
    pub fn to_str(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::UDiv => "udiv",
            BinOp::SDiv => "sdiv",
            BinOp::URem => "urem",
            BinOp::SRem => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::LShr => "lshr",
            BinOp::AShr => "ashr",
        }
    }

    pub fn from_str(s: &str) -> Option<BinOp> {
        BinOp::iter().find(|op| op.to_str() == s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bin {
    pub dest: Name,
    pub op: BinOp,
    pub ty: Ty,
    pub lhs: Operand,
    pub rhs: Operand,
}

/// Integer comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum CmpOp {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl CmpOp {
    pub fn to_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Ugt => "ugt",
            CmpOp::Uge => "uge",
            CmpOp::Ult => "ult",
            CmpOp::Ule => "ule",
            CmpOp::Sgt => "sgt",
            CmpOp::Sge => "sge",
            CmpOp::Slt => "slt",
            CmpOp::Sle => "sle",
        }
    }

    pub fn from_str(s: &str) -> Option<CmpOp> {
        CmpOp::iter().find(|op| op.to_str() == s)
    }
}

/// Integer comparison producing an `i1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cmp {
    pub dest: Name,
    pub op: CmpOp,
    pub ty: Ty,
    pub lhs: Operand,
    pub rhs: Operand,
}

/// Value conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
    Bitcast,
}

impl CastOp {
    pub fn to_str(self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::Bitcast => "bitcast",
        }
    }

    pub fn from_str(s: &str) -> Option<CastOp> {
        CastOp::iter().find(|op| op.to_str() == s)
    }
}

/// `%d = <op> <from> <value> to <to>`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cast {
    pub dest: Name,
    pub op: CastOp,
    pub from: Ty,
    pub value: Operand,
    pub to: Ty,
}
