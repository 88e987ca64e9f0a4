//! Hook-point management.
//!
//! Every instrumentable block carries exactly one *hook mark*: a call to
//! the `llvm.donothing` intrinsic, a no-op the optimizer will not remove
//! and that never occurs in compiled kernel code (the precondition check
//! enforces the latter). The mark anchors hook placement and separates
//! original instructions from inserted ones.
//!
//! Ordering guarantees:
//!
//! - entry-side hooks insert immediately before the mark, so execution
//!   order follows emission order (FIFO);
//! - exit-side hooks insert before an anchor that is walked backwards past
//!   previously inserted instructions, so later emissions execute first
//!   (LIFO) and the earliest-emitted hook ends up closest to the return.

use racer_ir::{
    instr::{misc::Call, misc::Callee, Instr, Terminator},
    module::{BlockId, Function, Inst, InstId},
};

use crate::enumerate::FunctionRecord;

/// Symbol of the mark sentinel.
pub const MARK_SYMBOL: &str = "llvm.donothing";

/// Whether an instruction is the hook-mark sentinel.
pub fn is_hook_mark(op: &Instr) -> bool {
    match op {
        Instr::Call(call) => call.callee.symbol() == Some(MARK_SYMBOL),
        _ => false,
    }
}

fn mark_inst() -> Inst {
    Inst::new(Call {
        dest: None,
        ty: None,
        callee: Callee::Sym(MARK_SYMBOL.to_string()),
        args: Vec::new(),
    })
}

/// The block's hook mark, created before the first non-phi original
/// instruction if the block has none yet.
pub fn block_hook_point(f: &mut Function, rec: &mut FunctionRecord, block: BlockId) -> InstId {
    let record = rec
        .block_record_mut(block)
        .unwrap_or_else(|| unreachable!("hook point requested for non-enumerated block"));
    if let Some(mark) = record.mark {
        return mark;
    }

    let anchor = f
        .block(block)
        .seq
        .iter()
        .copied()
        .find(|&id| !matches!(f.inst(id).op, Instr::Phi(_)))
        .unwrap_or_else(|| unreachable!("block without terminator"));

    let mark = f.insert_before(block, anchor, mark_inst());
    record.mark = Some(mark);
    mark
}

/// Entry-side hooks anchor at the entry block's mark; insertion order
/// there follows emission order.
pub fn function_entry_point(f: &mut Function, rec: &mut FunctionRecord) -> InstId {
    let entry = f.entry();
    block_hook_point(f, rec, entry)
}

/// One anchor per returning block: the last point after all original
/// computation and before any previously inserted exit-side hooks. The
/// walk never crosses the block's mark, so in a block whose only original
/// instruction is the return itself the anchor degenerates to the
/// instruction right after the mark.
pub fn function_exit_points(f: &Function, rec: &FunctionRecord) -> Vec<(BlockId, InstId)> {
    let mut anchors = Vec::new();

    for block in f.block_ids() {
        let seq = &f.block(block).seq;
        let term = *seq.last().unwrap_or_else(|| unreachable!("empty block"));
        if !matches!(&f.inst(term).op, Instr::Term(Terminator::Ret(_))) {
            continue;
        }
        debug_assert!(rec.is_original(term), "terminator must be original");

        let mut pos = seq.len() - 1;
        let mut cur = term;
        loop {
            debug_assert!(pos > 0, "walk ran off the top of the block");
            let pre = seq[pos - 1];
            if rec.is_original(pre) || is_hook_mark(&f.inst(pre).op) {
                break;
            }
            cur = pre;
            pos -= 1;
        }

        anchors.push((block, cur));
    }

    debug_assert!(
        !anchors.is_empty(),
        "function `{}` has no return block",
        f.name
    );
    anchors
}
