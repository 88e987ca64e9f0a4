//! Module driver.
//!
//! `run_pass` is the whole pipeline for one translation unit: precondition
//! checks, database load, enumeration, mark placement, mode dispatch and
//! the sidecar. The phase order in normal mode is load-bearing: exec hooks
//! first (so they wrap everything), then coverage, then stack tracking,
//! then memory accesses; later phases rely on the hook marks and exit-walk
//! behavior established by earlier ones.

use std::{collections::BTreeSet, path::Path, str::FromStr};

use log::{debug, warn};
use racer_ir::module::Module;
use strum::EnumString;

use crate::{
    access, check, cov, db::CompileDb, emit, enumerate, exec, mark, probe, report, stack, Error,
};

/// Instrumentation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Only bracket functions with pause/resume hooks.
    Ignore,
    /// Full instrumentation.
    Normal,
}

impl Mode {
    pub fn parse(s: &str) -> Result<Mode, Error> {
        Mode::from_str(s).map_err(|_| Error::InvalidMode(s.to_string()))
    }
}

/// One pass instance: owns every record, mark, probe map and catalogue
/// binding from construction to teardown.
pub struct Instrumentor<'m> {
    module: &'m mut Module,
    db: CompileDb,
    registry: enumerate::Registry,
}

impl<'m> Instrumentor<'m> {
    /// Enumerate the module and bind the runtime declarations. The module
    /// is not otherwise mutated until [`Instrumentor::run`].
    pub fn new(module: &'m mut Module, db: CompileDb) -> Instrumentor<'m> {
        let registry = enumerate::enumerate(module, &db);
        Instrumentor {
            module,
            db,
            registry,
        }
    }

    pub fn run(&mut self, mode: Mode) -> report::Report {
        debug!("instrumenting `{}` in {} mode", self.module.name, mode);

        // probe before any rewriting so only original callsites can match
        let memset_apis = probe::probe_apis(self.module, probe::MEMSET_APIS);
        let memcpy_apis = probe::probe_apis(self.module, probe::MEMCPY_APIS);
        let _loc_hits = probe::probe_locs(self.module, probe::LOC_CATALOGUES);

        emit::declare_runtime(self.module);

        // populate hook points for every block
        for rec in &mut self.registry.funcs {
            let f = self.module.func_mut(rec.func);
            for bi in 0..rec.blocks.len() {
                let block = rec.blocks[bi].block;
                mark::block_hook_point(f, rec, block);
            }
        }

        if let Some(tag) = self.db.special_tag(&self.module.name) {
            // no special routines exist yet; an unknown tag skips normal
            // instrumentation rather than aborting the build
            warn!(
                "module `{}` carries unhandled special tag `{}`; skipping instrumentation",
                self.module.name, tag
            );
        } else {
            match mode {
                Mode::Ignore => {
                    exec::inst_exec_ignore(self.module, &mut self.registry);
                }
                Mode::Normal => {
                    /*
                     * NOTE: the following instrumentation order has to be
                     * honored.
                     */
                    exec::inst_exec_func(self.module, &mut self.registry);
                    cov::inst_cov_cfg(self.module, &mut self.registry);
                    stack::inst_mem_stack(self.module, &mut self.registry);

                    // reserved for instructions hooked by other passes
                    let ignored_mem_access = BTreeSet::new();
                    access::inst_mem_access(
                        self.module,
                        &mut self.registry,
                        &memset_apis,
                        &memcpy_apis,
                        &ignored_mem_access,
                    );
                }
            }
        }

        report::build(self.module, &self.registry)
    }
}

/// Run the full pipeline for one module and write the sidecar to
/// `out_path`. The rewritten IR stays in `module` for the caller to emit.
pub fn run_pass(
    module: &mut Module,
    mode: Mode,
    db_path: &Path,
    out_path: &Path,
) -> Result<(), Error> {
    check::preconditions(module)?;
    let db = CompileDb::load(db_path)?;

    let mut instrumentor = Instrumentor::new(module, db);
    let report = instrumentor.run(mode);

    report::write(out_path, &report)?;
    debug!("instrumentation finished for `{}`", module.name);
    Ok(())
}
