//! Module, function and basic-block containers.
//!
//! Functions own their instructions in an arena (`Vec<Inst>` addressed by
//! [`InstId`]); basic blocks store only an ordered sequence of ids. The ids
//! handed out by [`Function::push_inst`] stay valid for the lifetime of the
//! function no matter how many instructions are later spliced into a block,
//! which is the property instrumentation relies on to tell original
//! instructions from inserted ones.

use std::collections::BTreeSet;

use crate::{
    debugloc::DebugLoc,
    error::Error,
    instr::{Instr, Label},
    name::Name,
    types::{DataLayout, StructTable, Ty},
};

/// Stable handle of an instruction within its function's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId(pub u32);

/// Index of a basic block within its function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

/// Index of a function within its module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub u32);

/// An instruction together with its optional debug location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inst {
    pub op: Instr,
    pub dloc: Option<DebugLoc>,
}

impl Inst {
    pub fn new(op: impl Into<Instr>) -> Inst {
        Inst {
            op: op.into(),
            dloc: None,
        }
    }
}

/// A basic block: a label and the ordered ids of its instructions. The
/// final id is always a terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub label: Label,
    pub seq: Vec<InstId>,
}

/// A function definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<(Name, Ty)>,
    pub ret: Option<Ty>,
    pub blocks: Vec<Block>,
    insts: Vec<Inst>,
    next_value: usize,
}

impl Function {
    /// Assemble a function from parsed parts, validating block structure
    /// and SSA well-formedness.
    pub fn assemble(
        name: String,
        params: Vec<(Name, Ty)>,
        ret: Option<Ty>,
        raw_blocks: Vec<(String, Vec<Inst>)>,
    ) -> Result<Function, Error> {
        if raw_blocks.is_empty() {
            return Err(Error::EmptyFunction { function: name });
        }

        let next_value = params
            .iter()
            .filter_map(|(name, _)| match name {
                Name::Number(n) => Some(n + 1),
                Name::Name(_) => None,
            })
            .max()
            .unwrap_or(0);

        let mut f = Function {
            name,
            params,
            ret,
            blocks: Vec::with_capacity(raw_blocks.len()),
            insts: Vec::new(),
            next_value,
        };

        let mut labels = BTreeSet::new();
        for (label, insts) in raw_blocks {
            if !labels.insert(label.clone()) {
                return Err(Error::DuplicateLabel {
                    function: f.name,
                    block: label,
                });
            }

            // invoke/resume end a block in the source language even though
            // the driver later rejects modules containing them
            let ends_block = |op: &Instr| {
                op.is_terminator() || matches!(op, Instr::Invoke(_) | Instr::Resume(_))
            };

            let mut seq = Vec::with_capacity(insts.len());
            let count = insts.len();
            for (pos, inst) in insts.into_iter().enumerate() {
                if ends_block(&inst.op) && pos + 1 != count {
                    return Err(Error::TerminatorMidBlock {
                        function: f.name,
                        block: label,
                    });
                }
                seq.push(f.push_inst(inst));
            }

            match seq.last().map(|id| &f.inst(*id).op) {
                Some(op) if ends_block(op) => {}
                _ => {
                    return Err(Error::MissingTerminator {
                        function: f.name,
                        block: label,
                    });
                }
            }

            f.blocks.push(Block {
                label: Label(label),
                seq,
            });
        }

        f.validate()?;
        Ok(f)
    }

    fn validate(&self) -> Result<(), Error> {
        // branch targets must resolve
        for block in &self.blocks {
            if let Instr::Term(term) = &self.inst(*block.seq.last().unwrap_or(&InstId(0))).op {
                for label in term.successors() {
                    if self.block_by_label(label).is_none() {
                        return Err(Error::UndefinedLabel {
                            function: self.name.clone(),
                            label: label.0.clone(),
                        });
                    }
                }
            }
        }

        // SSA names are defined once and every operand resolves
        let mut defined: BTreeSet<&Name> = self.params.iter().map(|(name, _)| name).collect();
        for inst in &self.insts {
            if let Some(dest) = inst.op.destination() {
                if !defined.insert(dest) {
                    return Err(Error::DuplicateSsaName {
                        function: self.name.clone(),
                        duplicate: dest.clone(),
                    });
                }
            }
        }
        for inst in &self.insts {
            for op in inst.op.operands() {
                if let Some(name) = op.reg() {
                    if !defined.contains(name) {
                        return Err(Error::UndefinedSsaName {
                            function: self.name.clone(),
                            undefined: name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Append an instruction to the arena and return its stable id. The
    /// instruction is not yet part of any block sequence.
    pub fn push_inst(&mut self, inst: Inst) -> InstId {
        if let Some(Name::Number(n)) = inst.op.destination() {
            if *n >= self.next_value {
                self.next_value = n + 1;
            }
        }
        let id = InstId(self.insts.len() as u32);
        self.insts.push(inst);
        id
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.0 as usize]
    }

    pub fn inst_count(&self) -> usize {
        self.insts.len()
    }

    /// Next never-used numeric SSA name, for compiler-inserted values.
    pub fn fresh_name(&mut self) -> Name {
        let n = self.next_value;
        self.next_value += 1;
        Name::Number(n)
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_by_label(&self, label: &Label) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|b| b.label == *label)
            .map(|i| BlockId(i as u32))
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// The block's terminator instruction (the last id of its sequence).
    pub fn terminator_of(&self, block: BlockId) -> InstId {
        *self.block(block)
            .seq
            .last()
            .unwrap_or_else(|| unreachable!("block without terminator"))
    }

    /// Splice `inst` into `block` immediately before `anchor`. Repeated
    /// insertions before the same anchor land in emission order, exactly
    /// like a builder positioned at `anchor`.
    pub fn insert_before(&mut self, block: BlockId, anchor: InstId, inst: Inst) -> InstId {
        let id = self.push_inst(inst);
        let seq = &mut self.blocks[block.0 as usize].seq;
        let pos = seq
            .iter()
            .position(|&i| i == anchor)
            .unwrap_or_else(|| unreachable!("anchor not in block"));
        seq.insert(pos, id);
        id
    }

    /// Id of the instruction following `of` in its block, if any.
    pub fn next_in_block(&self, block: BlockId, of: InstId) -> Option<InstId> {
        let seq = &self.block(block).seq;
        let pos = seq.iter().position(|&i| i == of)?;
        seq.get(pos + 1).copied()
    }
}

/// External function declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Option<Ty>,
}

impl Declaration {
    /// Compiler intrinsics are declarations in the reserved `llvm.`
    /// namespace.
    pub fn is_intrinsic(&self) -> bool {
        self.name.starts_with("llvm.")
    }
}

/// Initializer of a module-level global.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalInit {
    Int(i64),
    Zero,
    /// Declared here, defined in another module.
    External,
}

/// A module-level global variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub ty: Ty,
    pub init: GlobalInit,
}

/// A compiled translation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub layout: DataLayout,
    pub triple: String,
    pub structs: StructTable,
    pub globals: Vec<Global>,
    pub decls: Vec<Declaration>,
    pub funcs: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            layout: DataLayout::default(),
            triple: String::new(),
            structs: StructTable::new(),
            globals: Vec::new(),
            decls: Vec::new(),
            funcs: Vec::new(),
        }
    }

    pub fn func(&self, id: FuncId) -> &Function {
        &self.funcs[id.0 as usize]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.funcs[id.0 as usize]
    }

    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.funcs.len() as u32).map(FuncId)
    }

    pub fn decl(&self, name: &str) -> Option<&Declaration> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// Add a declaration unless one with the same name already exists.
    pub fn declare(&mut self, name: &str, params: Vec<Ty>, ret: Option<Ty>) {
        if self.decl(name).is_none() {
            self.decls.push(Declaration {
                name: name.to_string(),
                params,
                ret,
            });
        }
    }

}
