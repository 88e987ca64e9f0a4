//! Entity enumeration.
//!
//! One sweep over the module in its natural order assigns a stable 64-bit
//! hash to every eligible function, every block, and every original
//! instruction. Block and instruction ordinals are module-wide monotonic
//! counters, so identical inputs always reproduce identical identities.
//! Records built here live for the duration of the pass; instructions
//! inserted later never enter them.

use std::collections::BTreeMap;

use racer_ir::module::{BlockId, FuncId, InstId, Module};

use crate::{db::CompileDb, hash};

/// One original instruction of an enumerated block.
#[derive(Clone, Copy, Debug)]
pub struct InstructionRecord {
    pub inst: InstId,
    pub hash: u64,
}

/// One basic block of an enumerated function. `mark` is populated by the
/// hook-point manager, not by enumeration.
#[derive(Clone, Debug)]
pub struct BlockRecord {
    pub block: BlockId,
    pub hash: u64,
    pub mark: Option<InstId>,
    pub insts: Vec<InstructionRecord>,
}

/// One eligible function: has a body, is not an intrinsic, is not opted
/// out by the database.
#[derive(Clone, Debug)]
pub struct FunctionRecord {
    pub func: FuncId,
    pub hash: u64,
    pub blocks: Vec<BlockRecord>,
    inst_hash: BTreeMap<InstId, u64>,
    block_index: BTreeMap<BlockId, usize>,
}

impl FunctionRecord {
    /// Whether `id` denotes an original instruction of this function.
    pub fn is_original(&self, id: InstId) -> bool {
        self.inst_hash.contains_key(&id)
    }

    pub fn inst_hash(&self, id: InstId) -> Option<u64> {
        self.inst_hash.get(&id).copied()
    }

    pub fn block_record(&self, block: BlockId) -> Option<&BlockRecord> {
        self.block_index.get(&block).map(|&i| &self.blocks[i])
    }

    pub fn block_record_mut(&mut self, block: BlockId) -> Option<&mut BlockRecord> {
        let i = *self.block_index.get(&block)?;
        Some(&mut self.blocks[i])
    }
}

/// All records of one enumerated module.
#[derive(Debug)]
pub struct Registry {
    pub seed: u64,
    pub funcs: Vec<FunctionRecord>,
}

/// Walk the module and fill the record tables.
pub fn enumerate(m: &Module, db: &CompileDb) -> Registry {
    let seed = hash::module_seed(&m.name);
    let mut funcs = Vec::new();

    let mut block_ordinal = 0u64;
    let mut inst_ordinal = 0u64;

    for fid in m.func_ids() {
        let f = m.func(fid);

        // declarations and intrinsics have no body here by construction;
        // opted-out functions are skipped wholesale
        if f.name.starts_with("llvm.") || db.is_ignored(&f.name) {
            continue;
        }

        let fhash = hash::func_hash(seed, &f.name);
        let mut record = FunctionRecord {
            func: fid,
            hash: fhash,
            blocks: Vec::with_capacity(f.blocks.len()),
            inst_hash: BTreeMap::new(),
            block_index: BTreeMap::new(),
        };

        for bid in f.block_ids() {
            let bhash = hash::combine(fhash, block_ordinal);
            block_ordinal += 1;

            let mut insts = Vec::new();
            for &id in &f.block(bid).seq {
                let ihash = hash::combine(bhash, inst_ordinal);
                inst_ordinal += 1;
                insts.push(InstructionRecord {
                    inst: id,
                    hash: ihash,
                });
                record.inst_hash.insert(id, ihash);
            }

            record.block_index.insert(bid, record.blocks.len());
            record.blocks.push(BlockRecord {
                block: bid,
                hash: bhash,
                mark: None,
                insts,
            });
        }

        funcs.push(record);
    }

    Registry { seed, funcs }
}

#[cfg(test)]
mod tests {
    use racer_ir::parser::parse_module;

    use super::*;

    const TWO_FUNCS: &str = r#"
define void @a() {
entry:
  ret void
}

define void @b() {
entry:
  %x = add i32 1, 2
  ret void
}
"#;

    #[test]
    fn ordinals_are_module_wide() {
        let m = parse_module("t.ll", TWO_FUNCS).unwrap();
        let db = CompileDb::from_str("{}").unwrap();
        let reg = enumerate(&m, &db);
        assert_eq!(reg.funcs.len(), 2);

        // block ordinal of @b's entry continues after @a's, so its hash
        // differs from what a per-function counter would give
        let a_entry = reg.funcs[0].blocks[0].hash;
        let b_entry = reg.funcs[1].blocks[0].hash;
        assert_eq!(a_entry, hash::combine(reg.funcs[0].hash, 0));
        assert_eq!(b_entry, hash::combine(reg.funcs[1].hash, 1));
    }

    #[test]
    fn all_hashes_are_distinct() {
        let m = parse_module("t.ll", TWO_FUNCS).unwrap();
        let db = CompileDb::from_str("{}").unwrap();
        let reg = enumerate(&m, &db);

        let mut seen = std::collections::BTreeSet::new();
        for f in &reg.funcs {
            assert!(seen.insert(f.hash));
            for b in &f.blocks {
                assert!(seen.insert(b.hash));
                for i in &b.insts {
                    assert!(seen.insert(i.hash));
                }
            }
        }
    }

    #[test]
    fn ignored_functions_are_not_enumerated() {
        let m = parse_module("t.ll", TWO_FUNCS).unwrap();
        let db = CompileDb::from_str(r#"{ "ignored": { "a": true } }"#).unwrap();
        let reg = enumerate(&m, &db);
        assert_eq!(reg.funcs.len(), 1);
        assert_eq!(m.func(reg.funcs[0].func).name, "b");
    }
}
