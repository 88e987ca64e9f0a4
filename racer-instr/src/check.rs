//! Module preconditions.
//!
//! Checked before any mutation: a violation aborts the translation unit.
//! The kernel target guarantees a 64-bit little-endian layout, the absence
//! of exception-style control flow, leaf-only intrinsic use, and that the
//! hook-mark sentinel never occurs naturally in compiled code.

use racer_ir::{instr::Instr, module::Module};

use crate::{error::Error, mark};

/// Intrinsics that may transfer control back into user code. Kernel
/// modules must not declare them.
const NON_LEAF_INTRINSICS: &[&str] = &[
    "llvm.experimental.deoptimize",
    "llvm.experimental.gc.statepoint",
    "llvm.experimental.guard",
    "llvm.localescape",
];

pub fn preconditions(m: &Module) -> Result<(), Error> {
    if m.layout.pointer_bits != 64 {
        return Err(Error::PointerWidth {
            module: m.name.clone(),
            bits: m.layout.pointer_bits,
        });
    }
    if !m.layout.little_endian {
        return Err(Error::BigEndian {
            module: m.name.clone(),
        });
    }

    for decl in &m.decls {
        if decl.is_intrinsic() {
            if NON_LEAF_INTRINSICS
                .iter()
                .any(|prefix| decl.name.starts_with(prefix))
            {
                return Err(Error::NonLeafIntrinsic {
                    name: decl.name.clone(),
                });
            }
            if decl.name == mark::MARK_SYMBOL {
                return Err(Error::SentinelPresent {
                    symbol: mark::MARK_SYMBOL.to_string(),
                    context: format!("declarations of module `{}`", m.name),
                });
            }
        }
    }

    for f in &m.funcs {
        // a definition in the intrinsic namespace makes the enumerator's
        // intrinsic skip ambiguous
        if f.name.starts_with("llvm.") {
            return Err(Error::ProhibitedConstruct {
                function: f.name.clone(),
                construct: "intrinsic definition".to_string(),
            });
        }

        for block in &f.blocks {
            for &id in &block.seq {
                let inst = f.inst(id);
                match &inst.op {
                    Instr::Invoke(_) => {
                        return Err(Error::ProhibitedConstruct {
                            function: f.name.clone(),
                            construct: "invoke".to_string(),
                        });
                    }
                    Instr::Resume(_) => {
                        return Err(Error::ProhibitedConstruct {
                            function: f.name.clone(),
                            construct: "resume".to_string(),
                        });
                    }
                    op if mark::is_hook_mark(op) => {
                        return Err(Error::SentinelPresent {
                            symbol: mark::MARK_SYMBOL.to_string(),
                            context: format!("function `{}`", f.name),
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use racer_ir::parser::parse_module;

    use super::*;

    #[test]
    fn clean_module_passes() {
        let m = parse_module(
            "a.ll",
            r#"
define void @f() {
entry:
  ret void
}
"#,
        )
        .unwrap();
        assert!(preconditions(&m).is_ok());
    }

    #[test]
    fn invoke_is_rejected() {
        let m = parse_module(
            "a.ll",
            r#"
define void @f() {
entry:
  invoke void @g() to label %next unwind label %next
next:
  ret void
}
"#,
        )
        .unwrap();
        match preconditions(&m) {
            Err(Error::ProhibitedConstruct { construct, .. }) => assert_eq!(construct, "invoke"),
            other => panic!("expected ProhibitedConstruct, got {:?}", other),
        }
    }

    #[test]
    fn wrong_pointer_width_is_rejected() {
        let m = parse_module(
            "a.ll",
            r#"
target datalayout = "e-p:32:32"
define void @f() {
entry:
  ret void
}
"#,
        )
        .unwrap();
        assert!(matches!(
            preconditions(&m),
            Err(Error::PointerWidth { bits: 32, .. })
        ));
    }

    #[test]
    fn user_sentinel_is_rejected() {
        let m = parse_module(
            "a.ll",
            r#"
define void @f() {
entry:
  call void @llvm.donothing()
  ret void
}
"#,
        )
        .unwrap();
        assert!(matches!(
            preconditions(&m),
            Err(Error::SentinelPresent { .. })
        ));
    }
}
