//! Memory-access hooks.
//!
//! Scalar loads and stores hook with the pointer operand and the store
//! size of the accessed type. Recognized bulk transfers hook through their
//! probed operand layout: memset as one write, memcpy/memmove as a read
//! immediately followed by a write. Instructions in the ignored set are
//! skipped; the set is reserved for finer-grained filtering and is
//! currently empty.

use std::collections::{BTreeMap, BTreeSet};

use racer_ir::{
    instr::{Instr, Operand},
    module::{FuncId, InstId, Module},
    types::Ty,
};

use crate::{
    emit::{emit_hook, Hook, HookFlags},
    enumerate::Registry,
    probe::{OperandLayout, ProbeHit},
};

pub type ProbeMap<'a> = BTreeMap<(FuncId, InstId), ProbeHit<'a>>;

pub fn inst_mem_access(
    m: &mut Module,
    reg: &mut Registry,
    memset_apis: &ProbeMap<'_>,
    memcpy_apis: &ProbeMap<'_>,
    ignored: &BTreeSet<(FuncId, InstId)>,
) {
    let layout = m.layout.clone();
    let structs = m.structs.clone();

    for rec in &mut reg.funcs {
        let fid = rec.func;
        let f = m.func_mut(fid);

        for bi in 0..rec.blocks.len() {
            let block = rec.blocks[bi].block;
            let insts = rec.blocks[bi].insts.clone();

            for irec in insts {
                let id = irec.inst;

                // ignore instructions that are already hooked by others
                if ignored.contains(&(fid, id)) {
                    continue;
                }

                match f.inst(id).op.clone() {
                    Instr::Load(load) => {
                        let size = layout.store_size(&load.ty, &structs);
                        let payload = [
                            (Ty::Ptr, load.addr),
                            (Ty::I64, Operand::Imm(size as i64)),
                        ];
                        emit_hook(
                            f,
                            block,
                            id,
                            Hook::MemRead,
                            HookFlags::empty(),
                            irec.hash,
                            &payload,
                        );
                    }

                    Instr::Store(store) => {
                        let size = layout.store_size(&store.ty, &structs);
                        let payload = [
                            (Ty::Ptr, store.addr),
                            (Ty::I64, Operand::Imm(size as i64)),
                        ];
                        emit_hook(
                            f,
                            block,
                            id,
                            Hook::MemWrite,
                            HookFlags::empty(),
                            irec.hash,
                            &payload,
                        );
                    }

                    Instr::Call(call) => {
                        if let Some(hit) = memset_apis.get(&(fid, id)) {
                            let OperandLayout::Set { addr, size } = hit.catalogue.layout else {
                                continue;
                            };
                            let (Some(addr_arg), Some(size_arg)) =
                                (call.args.get(addr), call.args.get(size))
                            else {
                                continue;
                            };
                            let payload = [addr_arg.clone(), size_arg.clone()];
                            emit_hook(
                                f,
                                block,
                                id,
                                Hook::MemWrite,
                                hit.flags(),
                                irec.hash,
                                &payload,
                            );
                            continue;
                        }

                        if let Some(hit) = memcpy_apis.get(&(fid, id)) {
                            let OperandLayout::Copy { src, dst, size } = hit.catalogue.layout
                            else {
                                continue;
                            };
                            let (Some(src_arg), Some(dst_arg), Some(size_arg)) = (
                                call.args.get(src),
                                call.args.get(dst),
                                call.args.get(size),
                            ) else {
                                continue;
                            };
                            let read = [src_arg.clone(), size_arg.clone()];
                            let write = [dst_arg.clone(), size_arg.clone()];
                            emit_hook(
                                f,
                                block,
                                id,
                                Hook::MemRead,
                                hit.flags(),
                                irec.hash,
                                &read,
                            );
                            emit_hook(
                                f,
                                block,
                                id,
                                Hook::MemWrite,
                                hit.flags(),
                                irec.hash,
                                &write,
                            );
                        }
                    }

                    _ => {}
                }
            }
        }
    }
}
