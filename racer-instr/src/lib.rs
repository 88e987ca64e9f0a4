//! Static instrumentation core of the racer kernel fuzzer.
//!
//! The pass rewrites one IR module at a time, inserting deterministic hook
//! callsites that the paired runtime consumes to compute branch coverage,
//! memory-access traces, stack-object lifetimes and function-call depth.
//! Three sub-systems carry the weight:
//!
//! - the entity-hashing scheme (`hash`, `enumerate`) assigning stable,
//!   seeded identities to every function, block and original instruction;
//! - the hook-point manager (`mark`) deciding where hooks may and must be
//!   placed while keeping original instructions distinguishable from
//!   inserted ones;
//! - the memory-operation recognition layer (`probe`) that maps known
//!   bulk-transfer symbols onto (address, size, direction) hooks.
//!
//! Everything is single-threaded per translation unit: one
//! [`pass::Instrumentor`] owns all state from construction to teardown.

pub mod access;
pub mod check;
pub mod cov;
pub mod db;
pub mod emit;
pub mod enumerate;
pub mod error;
pub mod exec;
pub mod hash;
pub mod mark;
pub mod pass;
pub mod probe;
pub mod report;
pub mod stack;

pub use error::Error;
pub use pass::{run_pass, Instrumentor, Mode};
