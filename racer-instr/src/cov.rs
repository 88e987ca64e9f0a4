//! Control-flow coverage hooks: exactly one `cov_cfg` per enumerated
//! block, placed at the block's hook point.

use racer_ir::module::Module;

use crate::{
    emit::{emit_hook, Hook, HookFlags},
    enumerate::Registry,
    mark,
};

pub fn inst_cov_cfg(m: &mut Module, reg: &mut Registry) {
    for rec in &mut reg.funcs {
        let f = m.func_mut(rec.func);
        for bi in 0..rec.blocks.len() {
            let block = rec.blocks[bi].block;
            let hash = rec.blocks[bi].hash;
            let point = mark::block_hook_point(f, rec, block);
            emit_hook(
                f,
                block,
                point,
                Hook::CovCfg,
                HookFlags::empty(),
                hash,
                &[],
            );
        }
    }
}
