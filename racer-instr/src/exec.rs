//! Function-execution hooks.
//!
//! Ignore mode brackets every eligible function with pause/resume so the
//! runtime can mute tracing inside whitelisted regions. Normal mode emits
//! enter/exit hooks carrying the function pointer, from which the runtime
//! derives call depth. Entry hooks are emitted in the first phase, so the
//! FIFO entry / LIFO exit ordering makes them wrap everything emitted
//! later.

use racer_ir::{instr::Operand, module::Module, types::Ty};

use crate::{
    emit::{emit_hook, Hook, HookFlags},
    enumerate::Registry,
    mark,
};

pub fn inst_exec_ignore(m: &mut Module, reg: &mut Registry) {
    for rec in &mut reg.funcs {
        let f = m.func_mut(rec.func);
        let entry_block = f.entry();

        let entry = mark::function_entry_point(f, rec);
        emit_hook(
            f,
            entry_block,
            entry,
            Hook::ExecPause,
            HookFlags::empty(),
            rec.hash,
            &[],
        );

        for (block, anchor) in mark::function_exit_points(f, rec) {
            emit_hook(
                f,
                block,
                anchor,
                Hook::ExecResume,
                HookFlags::empty(),
                rec.hash,
                &[],
            );
        }
    }
}

pub fn inst_exec_func(m: &mut Module, reg: &mut Registry) {
    for rec in &mut reg.funcs {
        let f = m.func_mut(rec.func);
        let entry_block = f.entry();
        let fn_ptr = (Ty::Ptr, Operand::Sym(f.name.clone()));

        let entry = mark::function_entry_point(f, rec);
        emit_hook(
            f,
            entry_block,
            entry,
            Hook::ExecFuncEnter,
            HookFlags::empty(),
            rec.hash,
            std::slice::from_ref(&fn_ptr),
        );

        for (block, anchor) in mark::function_exit_points(f, rec) {
            emit_hook(
                f,
                block,
                anchor,
                Hook::ExecFuncExit,
                HookFlags::empty(),
                rec.hash,
                std::slice::from_ref(&fn_ptr),
            );
        }
    }
}
