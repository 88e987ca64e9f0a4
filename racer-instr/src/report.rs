//! Sidecar report.
//!
//! One machine-readable document per module, emitted once at the end of
//! the pass: the seed, the module's external surface, and every enumerated
//! entity with its hash, control-flow edges and textual form. Blocks and
//! instructions added during instrumentation are omitted. Map keys
//! serialize in sorted order, so identical inputs produce byte-identical
//! documents.

use std::{collections::BTreeMap, path::Path};

use racer_ir::{analysis, fmt::instr_repr, module::Module};
use serde::Serialize;

use crate::{enumerate::Registry, error::Error};

#[derive(Debug, Serialize)]
pub struct Report {
    pub meta: MetaReport,
    pub funcs: BTreeMap<String, FuncReport>,
}

#[derive(Debug, Serialize)]
pub struct MetaReport {
    pub seed: u64,
    /// Declared external symbols, intrinsics included.
    pub apis: Vec<String>,
    /// Global variables by textual form.
    pub gvar: Vec<String>,
    /// Identified struct type names.
    pub structs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FuncReport {
    pub meta: FuncMeta,
    pub blocks: Vec<BlockReport>,
}

#[derive(Debug, Serialize)]
pub struct FuncMeta {
    pub hash: u64,
}

#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub hash: u64,
    pub pred: Vec<u64>,
    pub succ: Vec<u64>,
    pub inst: Vec<InstReport>,
}

#[derive(Debug, Serialize)]
pub struct InstReport {
    pub hash: u64,
    pub repr: String,
    /// Debug location string; empty when the instruction has none.
    pub info: String,
}

pub fn build(m: &Module, reg: &Registry) -> Report {
    let meta = MetaReport {
        seed: reg.seed,
        apis: m.decls.iter().map(|d| d.name.clone()).collect(),
        gvar: m.globals.iter().map(racer_ir::fmt::global_repr).collect(),
        structs: m.structs.keys().cloned().collect(),
    };

    let mut funcs = BTreeMap::new();
    for rec in &reg.funcs {
        let f = m.func(rec.func);
        let preds = analysis::predecessors(f);

        let mut blocks = Vec::with_capacity(rec.blocks.len());
        for brec in &rec.blocks {
            let pred = preds
                .get(&brec.block)
                .into_iter()
                .flatten()
                .filter_map(|p| rec.block_record(*p))
                .map(|r| r.hash)
                .collect();
            let succ = analysis::successors(f, brec.block)
                .iter()
                .filter_map(|s| rec.block_record(*s))
                .map(|r| r.hash)
                .collect();

            let inst = brec
                .insts
                .iter()
                .map(|irec| {
                    let i = f.inst(irec.inst);
                    InstReport {
                        hash: irec.hash,
                        repr: instr_repr(&i.op),
                        info: i
                            .dloc
                            .as_ref()
                            .map(|d| d.to_string())
                            .unwrap_or_default(),
                    }
                })
                .collect();

            blocks.push(BlockReport {
                hash: brec.hash,
                pred,
                succ,
                inst,
            });
        }

        funcs.insert(
            f.name.clone(),
            FuncReport {
                meta: FuncMeta { hash: rec.hash },
                blocks,
            },
        );
    }

    Report { meta, funcs }
}

pub fn write(path: &Path, report: &Report) -> Result<(), Error> {
    let text = to_json(report);
    std::fs::write(path, text).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty JSON with a trailing newline; exposed so tests can compare
/// documents byte for byte.
pub fn to_json(report: &Report) -> String {
    let mut text = serde_json::to_string_pretty(report)
        .unwrap_or_else(|_| unreachable!("report serialization cannot fail"));
    text.push('\n');
    text
}
