//! Per-function analysis helpers: value typing and control-flow edges.

use std::collections::BTreeMap;

use crate::{
    instr::Instr,
    module::{BlockId, Function},
    name::Name,
    types::Ty,
};

/// Map every SSA name defined in `f` (parameters included) to its type.
pub fn value_types(f: &Function) -> BTreeMap<Name, Ty> {
    let mut out: BTreeMap<Name, Ty> = f.params.iter().cloned().collect();
    for block in &f.blocks {
        for &id in &block.seq {
            let op = &f.inst(id).op;
            if let (Some(dest), Some(ty)) = (op.destination(), op.destination_ty()) {
                out.insert(dest.clone(), ty);
            }
        }
    }
    out
}

/// Successor blocks of `block`, resolved from its terminator's labels.
pub fn successors(f: &Function, block: BlockId) -> Vec<BlockId> {
    let term = f.inst(f.terminator_of(block));
    match &term.op {
        Instr::Term(t) => t
            .successors()
            .iter()
            .filter_map(|label| f.block_by_label(label))
            .collect(),
        _ => Vec::new(),
    }
}

/// Predecessor lists for every block of `f`, in block order.
pub fn predecessors(f: &Function) -> BTreeMap<BlockId, Vec<BlockId>> {
    let mut out: BTreeMap<BlockId, Vec<BlockId>> =
        f.block_ids().map(|id| (id, Vec::new())).collect();
    for from in f.block_ids() {
        for to in successors(f, from) {
            out.entry(to).or_default().push(from);
        }
    }
    out
}
