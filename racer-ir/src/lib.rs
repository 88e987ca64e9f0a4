//! Low-level SSA IR for the racer instrumentation pass.
//!
//! The crate models a textual, LLVM-flavored intermediate representation:
//! a [`module::Module`] holds named struct types, globals, external
//! declarations and function definitions; each [`module::Function`] owns its
//! instructions in an arena addressed by [`module::InstId`], and basic blocks
//! hold only ordered id sequences. Rewriters can therefore splice new
//! instructions into a block without ever invalidating the identity of an
//! existing one.
//!
//! Submodules:
//!
//! - `types`: the type sum and data-layout size/alignment queries
//! - `instr`: per-family instruction structs and the `Instr` tagged union
//! - `module`: module/function/block containers and the instruction arena
//! - `analysis`: value typing and control-flow edge helpers
//! - `parser`: chumsky parser for the textual form
//! - `fmt`: printers; the printed form of a module re-parses to an equal one

pub mod analysis;
pub mod debugloc;
pub mod error;
pub mod fmt;
pub mod instr;
pub mod module;
pub mod name;
pub mod parser;
pub mod types;

pub use error::Error;
