//! Stack-object tracking.
//!
//! Push hooks must execute only after the stack frame has been fully
//! reserved, so they are inserted after the block's last alloca, in
//! discovery order. Pop hooks must unwind the whole function's footprint,
//! so every exit point receives one pop per allocation gathered across the
//! entire function.

use log::warn;
use racer_ir::{
    instr::{Instr, Operand},
    module::{BlockId, Function, InstId, Module},
    types::{DataLayout, StructTable, Ty},
};

use crate::{
    emit::{emit_hook, emit_size_mul, Hook, HookFlags},
    enumerate::{FunctionRecord, Registry},
    mark,
};

fn hook_stack_var(
    f: &mut Function,
    rec: &FunctionRecord,
    block: BlockId,
    anchor: InstId,
    alloca_id: InstId,
    push: bool,
    layout: &DataLayout,
    structs: &StructTable,
) {
    let (dest, ty, count) = match &f.inst(alloca_id).op {
        Instr::Alloca(a) => (a.dest.clone(), a.ty.clone(), a.count.clone()),
        _ => unreachable!("stack hook on non-alloca"),
    };

    let elem_size = layout.alloc_size(&ty, structs);
    let size = match &count {
        Some((cty, cop)) => emit_size_mul(f, block, anchor, cty, cop, elem_size),
        None => Operand::Imm(elem_size as i64),
    };

    let hash = rec
        .inst_hash(alloca_id)
        .unwrap_or_else(|| unreachable!("alloca must be original"));
    let hook = if push {
        Hook::MemStackPush
    } else {
        Hook::MemStackPop
    };
    emit_hook(
        f,
        block,
        anchor,
        hook,
        HookFlags::empty(),
        hash,
        &[(Ty::Ptr, Operand::Reg(dest)), (Ty::I64, size)],
    );
}

pub fn inst_mem_stack(m: &mut Module, reg: &mut Registry) {
    let layout = m.layout.clone();
    let structs = m.structs.clone();

    for rec in &mut reg.funcs {
        let f = m.func_mut(rec.func);

        // stack variables of the whole function, in discovery order
        let mut vars: Vec<InstId> = Vec::new();

        for bi in 0..rec.blocks.len() {
            let block = rec.blocks[bi].block;

            let mut blks: Vec<InstId> = Vec::new();
            let mut first_alloca = None;
            let mut last_alloca = None;

            for &id in &f.block(block).seq {
                // should ignore the instrumented instructions
                if !rec.is_original(id) {
                    continue;
                }
                if matches!(f.inst(id).op, Instr::Alloca(_)) {
                    if first_alloca.is_none() {
                        first_alloca = Some(id);
                    }
                    blks.push(id);
                    vars.push(id);
                    last_alloca = Some(id);
                }
            }

            let last = match last_alloca {
                Some(last) => last,
                None => continue,
            };

            if cfg!(debug_assertions) {
                let seq = &f.block(block).seq;
                let lo = seq.iter().position(|&i| Some(i) == first_alloca).unwrap_or(0);
                let hi = seq.iter().position(|&i| i == last).unwrap_or(lo);
                for &id in &seq[lo..hi] {
                    if !matches!(f.inst(id).op, Instr::Alloca(_)) {
                        warn!(
                            "non-contiguous alloca in function {}: {}",
                            f.name,
                            racer_ir::fmt::instr_repr(&f.inst(id).op)
                        );
                    }
                }
            }

            let anchor = f
                .next_in_block(block, last)
                .unwrap_or_else(|| unreachable!("alloca cannot terminate a block"));
            for &id in &blks {
                hook_stack_var(f, rec, block, anchor, id, true, &layout, &structs);
            }
        }

        for (block, anchor) in mark::function_exit_points(f, rec) {
            for &id in &vars {
                hook_stack_var(f, rec, block, anchor, id, false, &layout, &structs);
            }
        }
    }
}
