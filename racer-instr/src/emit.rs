//! Hook emission.
//!
//! Every hook call has the shape `(flag: u64, hash: u64, payload...)` where
//! payload slots are 64-bit values: pointers are converted with an inserted
//! `ptrtoint`, narrower integers are zero-extended, and immediates are
//! folded in place. Payload-prep instructions and the hook calls themselves
//! are never part of the original-instruction records.

use bitflags::bitflags;
use racer_ir::{
    instr::{
        int::{Bin, BinOp, Cast, CastOp},
        misc::{Call, Callee},
        Operand,
    },
    module::{BlockId, Function, Inst, InstId, Module},
    types::Ty,
};
use strum::{EnumIter, IntoEnumIterator};

use crate::mark;

bitflags! {
    /// Flag word forwarded to the runtime with every hook. The shipped
    /// catalogues define no flag bits yet; the word is reserved for
    /// runtime-side dispatch.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct HookFlags: u64 {}
}

/// The runtime callbacks the core emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum Hook {
    ExecPause,
    ExecResume,
    ExecFuncEnter,
    ExecFuncExit,
    CovCfg,
    MemStackPush,
    MemStackPop,
    MemRead,
    MemWrite,
}

impl Hook {
    /// Linker-visible symbol of the runtime callback.
    pub fn symbol(self) -> &'static str {
        match self {
            Hook::ExecPause => "racer_hook_exec_pause",
            Hook::ExecResume => "racer_hook_exec_resume",
            Hook::ExecFuncEnter => "racer_hook_exec_func_enter",
            Hook::ExecFuncExit => "racer_hook_exec_func_exit",
            Hook::CovCfg => "racer_hook_cov_cfg",
            Hook::MemStackPush => "racer_hook_mem_stack_push",
            Hook::MemStackPop => "racer_hook_mem_stack_pop",
            Hook::MemRead => "racer_hook_mem_read",
            Hook::MemWrite => "racer_hook_mem_write",
        }
    }

    /// Number of payload slots after the (flag, hash) pair.
    pub fn payload_arity(self) -> usize {
        match self {
            Hook::ExecPause | Hook::ExecResume | Hook::CovCfg => 0,
            Hook::ExecFuncEnter | Hook::ExecFuncExit => 1,
            Hook::MemStackPush | Hook::MemStackPop | Hook::MemRead | Hook::MemWrite => 2,
        }
    }
}

/// Declare every runtime hook plus the mark sentinel. Hooks resolve at
/// module link time; here they only need to exist as external symbols.
pub fn declare_runtime(m: &mut Module) {
    for hook in Hook::iter() {
        let params = vec![Ty::I64; 2 + hook.payload_arity()];
        m.declare(hook.symbol(), params, None);
    }
    m.declare(mark::MARK_SYMBOL, Vec::new(), None);
}

/// Bring a typed payload value into i64 form, inserting conversion
/// instructions before `before` as needed.
fn prep_payload(
    f: &mut Function,
    block: BlockId,
    before: InstId,
    ty: &Ty,
    value: &Operand,
) -> Operand {
    match (ty, value) {
        // null folds to a zero address without a conversion
        (_, Operand::Null) => Operand::Imm(0),

        (Ty::Ptr, value) => {
            let dest = f.fresh_name();
            f.insert_before(
                block,
                before,
                Inst::new(Cast {
                    dest: dest.clone(),
                    op: CastOp::PtrToInt,
                    from: Ty::Ptr,
                    value: value.clone(),
                    to: Ty::I64,
                }),
            );
            Operand::Reg(dest)
        }

        (Ty::I(64), value) => value.clone(),

        // immediates fold; registers are zero-extended in place
        (Ty::I(bits), Operand::Imm(v)) => {
            let mask = if *bits == 64 {
                u64::MAX
            } else {
                (1u64 << bits) - 1
            };
            Operand::Imm(((*v as u64) & mask) as i64)
        }
        (Ty::I(_), value) => {
            let dest = f.fresh_name();
            f.insert_before(
                block,
                before,
                Inst::new(Cast {
                    dest: dest.clone(),
                    op: CastOp::ZExt,
                    from: ty.clone(),
                    value: value.clone(),
                    to: Ty::I64,
                }),
            );
            Operand::Reg(dest)
        }

        _ => {
            debug_assert!(false, "hook payload must be integer or pointer typed");
            Operand::Imm(0)
        }
    }
}

/// Emit one hook call before `before`. Payload entries carry the type of
/// the value at its definition site.
pub fn emit_hook(
    f: &mut Function,
    block: BlockId,
    before: InstId,
    hook: Hook,
    flags: HookFlags,
    hash: u64,
    payload: &[(Ty, Operand)],
) -> InstId {
    debug_assert_eq!(payload.len(), hook.payload_arity());

    let mut args = vec![
        (Ty::I64, Operand::Imm(flags.bits() as i64)),
        (Ty::I64, Operand::Imm(hash as i64)),
    ];
    for (ty, value) in payload {
        let prepped = prep_payload(f, block, before, ty, value);
        args.push((Ty::I64, prepped));
    }

    f.insert_before(
        block,
        before,
        Inst::new(Call {
            dest: None,
            ty: None,
            callee: Callee::Sym(hook.symbol().to_string()),
            args,
        }),
    )
}

/// Multiply an element count by the element's allocated size, yielding an
/// i64 operand for stack-object payloads. The multiply is inserted even
/// for constant counts.
pub fn emit_size_mul(
    f: &mut Function,
    block: BlockId,
    before: InstId,
    count_ty: &Ty,
    count: &Operand,
    elem_size: u64,
) -> Operand {
    let count64 = prep_payload(f, block, before, count_ty, count);
    let dest = f.fresh_name();
    f.insert_before(
        block,
        before,
        Inst::new(Bin {
            dest: dest.clone(),
            op: BinOp::Mul,
            ty: Ty::I64,
            lhs: count64,
            rhs: Operand::Imm(elem_size as i64),
        }),
    );
    Operand::Reg(dest)
}
