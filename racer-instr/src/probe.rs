//! API and location probing.
//!
//! A catalogue describes one family of known external calls: candidate
//! symbols and the operand layout naming which argument positions carry the
//! address(es) and the byte count. Probing binds callsites to catalogue
//! entries; the memory-access mode then turns each hit into read/write
//! hooks. Location probing matches instructions by opcode and debug
//! location instead of by symbol; the shipped instrumenter carries no
//! location catalogues, but the machinery stays available to others.

use std::collections::BTreeMap;

use log::debug;
use racer_ir::{
    debugloc::DebugLoc,
    instr::{Instr, InstrOp},
    module::{FuncId, InstId, Module},
};

use crate::emit::HookFlags;

/// One symbol a catalogue entry may match.
#[derive(Debug)]
pub struct Candidate {
    pub symbol: &'static str,
    pub flags: HookFlags,
}

/// Which argument positions carry addresses and the byte count.
#[derive(Clone, Copy, Debug)]
pub enum OperandLayout {
    /// One written region: memset-style `(addr, size)`.
    Set { addr: usize, size: usize },
    /// One read and one written region: memcpy-style `(src, dst, size)`.
    Copy { src: usize, dst: usize, size: usize },
}

/// A family of known external calls.
#[derive(Debug)]
pub struct ApiCatalogue {
    pub name: &'static str,
    pub candidates: &'static [Candidate],
    pub layout: OperandLayout,
    pub flags: HookFlags,
}

/// The memset family: the libc symbol plus the two size-width intrinsics.
pub static MEMSET_APIS: &[ApiCatalogue] = &[ApiCatalogue {
    name: "memset",
    candidates: &[
        Candidate {
            symbol: "memset",
            flags: HookFlags::empty(),
        },
        Candidate {
            symbol: "llvm.memset.p0i8.i32",
            flags: HookFlags::empty(),
        },
        Candidate {
            symbol: "llvm.memset.p0i8.i64",
            flags: HookFlags::empty(),
        },
    ],
    layout: OperandLayout::Set { addr: 0, size: 2 },
    flags: HookFlags::empty(),
}];

/// The memcpy family: memcpy and memmove intrinsics at both size widths.
pub static MEMCPY_APIS: &[ApiCatalogue] = &[ApiCatalogue {
    name: "memcpy",
    candidates: &[
        Candidate {
            symbol: "llvm.memcpy.p0i8.p0i8.i32",
            flags: HookFlags::empty(),
        },
        Candidate {
            symbol: "llvm.memcpy.p0i8.p0i8.i64",
            flags: HookFlags::empty(),
        },
        Candidate {
            symbol: "llvm.memmove.p0i8.p0i8.i32",
            flags: HookFlags::empty(),
        },
        Candidate {
            symbol: "llvm.memmove.p0i8.p0i8.i64",
            flags: HookFlags::empty(),
        },
    ],
    layout: OperandLayout::Copy {
        src: 1,
        dst: 0,
        size: 2,
    },
    flags: HookFlags::empty(),
}];

/// Binding of a callsite to the catalogue entry and candidate it matched.
#[derive(Clone, Copy, Debug)]
pub struct ProbeHit<'a> {
    pub catalogue: &'a ApiCatalogue,
    pub candidate: &'a Candidate,
}

impl ProbeHit<'_> {
    /// Catalogue-level flag OR candidate-level flag.
    pub fn flags(&self) -> HookFlags {
        self.catalogue.flags | self.candidate.flags
    }
}

/// Map every callsite whose callee name equals a candidate symbol.
pub fn probe_apis<'a>(
    m: &Module,
    catalogues: &'a [ApiCatalogue],
) -> BTreeMap<(FuncId, InstId), ProbeHit<'a>> {
    let mut out = BTreeMap::new();

    for desc in catalogues {
        let mut matched = 0usize;
        for fid in m.func_ids() {
            let f = m.func(fid);
            if f.name.starts_with("llvm.") {
                continue;
            }

            for block in &f.blocks {
                for &id in &block.seq {
                    let callee = match &f.inst(id).op {
                        Instr::Call(call) => call.callee.symbol(),
                        _ => None,
                    };
                    let callee = match callee {
                        Some(name) => name,
                        None => continue,
                    };

                    for candidate in desc.candidates {
                        if callee == candidate.symbol {
                            matched += 1;
                            out.insert(
                                (fid, id),
                                ProbeHit {
                                    catalogue: desc,
                                    candidate,
                                },
                            );
                        }
                    }
                }
            }
        }
        debug!("API probe: {} matched {} callsite(s)", desc.name, matched);
    }

    out
}

/// Instruction classification for location matchers. `AsmCall` matches
/// inline-asm callsites, which share the call opcode with ordinary calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocOpcode {
    Op(InstrOp),
    AsmCall,
}

/// One source location a catalogue entry may match. The file name is
/// compared after stripping a leading `./`.
#[derive(Debug)]
pub struct LocMatcher {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
    pub opcode: LocOpcode,
    pub flags: HookFlags,
}

/// A family of known source locations.
#[derive(Debug)]
pub struct LocCatalogue {
    pub name: &'static str,
    pub locs: &'static [LocMatcher],
    pub flags: HookFlags,
}

/// Location catalogues consumed by the shipped instrumenter: none.
pub static LOC_CATALOGUES: &[LocCatalogue] = &[];

/// Binding of an instruction to the location matcher it satisfied.
#[derive(Clone, Copy, Debug)]
pub struct LocHit<'a> {
    pub catalogue: &'a LocCatalogue,
    pub loc: &'a LocMatcher,
}

fn loc_equals(dl: &DebugLoc, loc: &LocMatcher) -> bool {
    dl.normalized_file() == loc.file && dl.line == loc.line && dl.col == loc.column
}

/// The location or any of its inlined-at ancestors equals the matcher.
fn loc_includes(dl: &DebugLoc, loc: &LocMatcher) -> bool {
    dl.chain().any(|entry| loc_equals(entry, loc))
}

fn dl_equals(dl1: &DebugLoc, dl2: &DebugLoc) -> bool {
    dl1.normalized_file() == dl2.normalized_file() && dl1.line == dl2.line && dl1.col == dl2.col
}

/// Whether two matching locations denote two distinct IR sites rather than
/// one site seen through the same inlining stack.
fn dl_multi_def(dl1: &DebugLoc, dl2: &DebugLoc, loc: &LocMatcher) -> bool {
    if !dl_equals(dl1, dl2) {
        return true;
    }
    if loc_equals(dl1, loc) {
        return false;
    }
    match (&dl1.inlined_at, &dl2.inlined_at) {
        (Some(in1), Some(in2)) => dl_multi_def(in1, in2, loc),
        _ => true,
    }
}

fn opcode_matches(op: &Instr, matcher: LocOpcode) -> bool {
    match matcher {
        LocOpcode::Op(kind) => op.op() == kind,
        LocOpcode::AsmCall => matches!(op, Instr::Call(call) if call.callee.is_asm()),
    }
}

/// Map every instruction whose opcode and debug location satisfy a
/// matcher. A single source location resolving to two distinct IR sites is
/// fatal in debug builds and best-effort (last match wins) in release.
pub fn probe_locs<'a>(
    m: &Module,
    catalogues: &'a [LocCatalogue],
) -> BTreeMap<(FuncId, InstId), LocHit<'a>> {
    let mut out = BTreeMap::new();

    for desc in catalogues {
        let mut first_match: BTreeMap<usize, DebugLoc> = BTreeMap::new();

        for fid in m.func_ids() {
            let f = m.func(fid);
            if f.name.starts_with("llvm.") {
                continue;
            }

            for block in &f.blocks {
                for &id in &block.seq {
                    let inst = f.inst(id);
                    let dloc = match &inst.dloc {
                        Some(dloc) => dloc,
                        None => continue,
                    };

                    for (li, loc) in desc.locs.iter().enumerate() {
                        if !opcode_matches(&inst.op, loc.opcode) || !loc_includes(dloc, loc) {
                            continue;
                        }

                        if cfg!(debug_assertions) {
                            match first_match.get(&li) {
                                None => {
                                    first_match.insert(li, dloc.clone());
                                }
                                Some(seen) => {
                                    assert!(
                                        !dl_multi_def(seen, dloc, loc),
                                        "location {}:{}:{} resolves to multiple IR sites",
                                        loc.file,
                                        loc.line,
                                        loc.column
                                    );
                                }
                            }
                        }

                        out.insert((fid, id), LocHit {
                            catalogue: desc,
                            loc,
                        });
                    }
                }
            }
        }
        debug!("LOC probe: {} matched {} site(s)", desc.name, out.len());
    }

    out
}
