//! End-to-end instrumentation scenarios over parsed IR fixtures.

use racer_instr::{
    check,
    db::CompileDb,
    mark,
    pass::{Instrumentor, Mode},
    report,
};
use racer_ir::{
    fmt::instr_repr,
    instr::{int::CastOp, Instr, Operand},
    module::{BlockId, Function, InstId, Module},
    parser::parse_module,
};

fn instrument(src: &str, db_json: &str, mode: Mode) -> (Module, report::Report) {
    let mut m = parse_module("unit.ll", src).expect("fixture should parse");
    check::preconditions(&m).expect("fixture should pass preconditions");
    let db = CompileDb::from_str(db_json).expect("database should parse");
    let rep = Instrumentor::new(&mut m, db).run(mode);
    (m, rep)
}

fn normal(src: &str) -> (Module, report::Report) {
    instrument(src, "{}", Mode::Normal)
}

/// Textual forms of a block's instructions, in order.
fn reprs(f: &Function, block: BlockId) -> Vec<String> {
    f.block(block)
        .seq
        .iter()
        .map(|&id| instr_repr(&f.inst(id).op))
        .collect()
}

fn index_of(reprs: &[String], needle: &str) -> usize {
    reprs
        .iter()
        .position(|r| r.contains(needle))
        .unwrap_or_else(|| panic!("`{}` not found in {:#?}", needle, reprs))
}

fn count_of(reprs: &[String], needle: &str) -> usize {
    reprs.iter().filter(|r| r.contains(needle)).count()
}

fn all_reprs(f: &Function) -> Vec<String> {
    f.block_ids().flat_map(|b| reprs(f, b)).collect()
}

/// Hook calls with the given runtime symbol, as (block, position, args).
fn hook_calls(
    f: &Function,
    symbol: &str,
) -> Vec<(BlockId, usize, Vec<(racer_ir::types::Ty, Operand)>)> {
    let mut out = Vec::new();
    for block in f.block_ids() {
        for (pos, &id) in f.block(block).seq.iter().enumerate() {
            if let Instr::Call(call) = &f.inst(id).op {
                if call.callee.symbol() == Some(symbol) {
                    out.push((block, pos, call.args.clone()));
                }
            }
        }
    }
    out
}

/// Follow a hook's address argument back through its ptrtoint to the
/// original pointer operand.
fn resolve_addr(f: &Function, arg: &Operand) -> Operand {
    let name = match arg {
        Operand::Reg(name) => name,
        other => return other.clone(),
    };
    for i in 0..f.inst_count() {
        let inst = f.inst(InstId(i as u32));
        if inst.op.destination() == Some(name) {
            if let Instr::Cast(cast) = &inst.op {
                if cast.op == CastOp::PtrToInt {
                    return cast.value.clone();
                }
            }
        }
    }
    arg.clone()
}

const EMPTY_FN: &str = r#"
define void @f() {
entry:
  ret void
}
"#;

#[test]
fn empty_function_gets_wrapped_and_covered() {
    let (m, rep) = normal(EMPTY_FN);
    let f = &m.funcs[0];
    let r = reprs(f, f.entry());

    // enter executes first, then coverage; the exit hook runs right
    // before the return
    let enter = index_of(&r, "@racer_hook_exec_func_enter");
    let cov = index_of(&r, "@racer_hook_cov_cfg");
    let mark_pos = index_of(&r, "@llvm.donothing");
    let exit = index_of(&r, "@racer_hook_exec_func_exit");
    let ret = index_of(&r, "ret void");
    assert!(enter < cov && cov < mark_pos && mark_pos < exit && exit < ret);

    assert_eq!(count_of(&r, "@racer_hook_mem_"), 0);

    let func = &rep.funcs["f"];
    assert_eq!(rep.funcs.len(), 1);
    assert_eq!(func.blocks.len(), 1);
    assert_eq!(func.blocks[0].inst.len(), 1);
    assert_eq!(func.blocks[0].inst[0].repr, "ret void");
}

#[test]
fn exit_walker_stops_at_mark_in_return_only_block() {
    // the degenerate case: no original instruction before the return, so
    // exit-side hooks land between the mark and the return
    let (m, _) = normal(EMPTY_FN);
    let f = &m.funcs[0];
    let r = reprs(f, f.entry());
    let mark_pos = index_of(&r, "@llvm.donothing");
    let exit = index_of(&r, "@racer_hook_exec_func_exit");
    assert!(mark_pos < exit);
}

#[test]
fn load_then_store_hooks_once_each() {
    let (m, _) = normal(
        r#"
define i32 @g(ptr %p) {
entry:
  %x = load i32, ptr %p
  %y = add i32 %x, 1
  store i32 %y, ptr %p
  ret i32 %x
}
"#,
    );
    let f = &m.funcs[0];

    let reads = hook_calls(f, "racer_hook_mem_read");
    let writes = hook_calls(f, "racer_hook_mem_write");
    assert_eq!(reads.len(), 1);
    assert_eq!(writes.len(), 1);

    // size payloads carry the 4-byte store size of i32
    assert_eq!(reads[0].2[3].1, Operand::Imm(4));
    assert_eq!(writes[0].2[3].1, Operand::Imm(4));

    // both address payloads resolve back to %p
    assert_eq!(resolve_addr(f, &reads[0].2[2].1), Operand::Reg("p".into()));
    assert_eq!(resolve_addr(f, &writes[0].2[2].1), Operand::Reg("p".into()));

    // the read hook sits immediately in front of the load
    let r = reprs(f, f.entry());
    let read_pos = index_of(&r, "@racer_hook_mem_read");
    let load_pos = index_of(&r, "= load i32");
    assert!(read_pos < load_pos);
}

#[test]
fn two_stack_objects_push_and_pop_in_discovery_order() {
    let (m, _) = normal(
        r#"
define void @h() {
entry:
  %a = alloca [16 x i8]
  %b = alloca i64
  ret void
}
"#,
    );
    let f = &m.funcs[0];
    let r = reprs(f, f.entry());

    let pushes = hook_calls(f, "racer_hook_mem_stack_push");
    let pops = hook_calls(f, "racer_hook_mem_stack_pop");
    assert_eq!(pushes.len(), 2);
    assert_eq!(pops.len(), 2);

    // pushes sit after the second allocation, sized 16 then 8
    let second_alloca = index_of(&r, "= alloca i64");
    assert!(pushes.iter().all(|(_, pos, _)| *pos > second_alloca));
    assert_eq!(pushes[0].2[3].1, Operand::Imm(16));
    assert_eq!(pushes[1].2[3].1, Operand::Imm(8));

    // pops appear at the return in push order, same addresses and sizes
    for (push, pop) in pushes.iter().zip(&pops) {
        assert_eq!(
            resolve_addr(f, &push.2[2].1),
            resolve_addr(f, &pop.2[2].1)
        );
        assert_eq!(push.2[3].1, pop.2[3].1);
    }

    // pops run before the function-exit hook
    let first_pop = index_of(&r, "@racer_hook_mem_stack_pop");
    let exit = index_of(&r, "@racer_hook_exec_func_exit");
    assert!(first_pop < exit);
}

#[test]
fn memcpy_callsite_yields_read_then_write() {
    let (m, _) = normal(
        r#"
declare void @llvm.memcpy.p0i8.p0i8.i64(ptr, ptr, i64, i1)

define void @c(ptr %d, ptr %s) {
entry:
  call void @llvm.memcpy.p0i8.p0i8.i64(ptr %d, ptr %s, i64 32, i1 0)
  ret void
}
"#,
    );
    let f = &m.funcs[0];

    let reads = hook_calls(f, "racer_hook_mem_read");
    let writes = hook_calls(f, "racer_hook_mem_write");
    assert_eq!(reads.len(), 1);
    assert_eq!(writes.len(), 1);

    assert_eq!(resolve_addr(f, &reads[0].2[2].1), Operand::Reg("s".into()));
    assert_eq!(resolve_addr(f, &writes[0].2[2].1), Operand::Reg("d".into()));
    assert_eq!(reads[0].2[3].1, Operand::Imm(32));
    assert_eq!(writes[0].2[3].1, Operand::Imm(32));

    // read fires before write, both before the call
    let r = reprs(f, f.entry());
    let read_pos = index_of(&r, "@racer_hook_mem_read");
    let write_pos = index_of(&r, "@racer_hook_mem_write");
    let call_pos = index_of(&r, "@llvm.memcpy");
    assert!(read_pos < write_pos && write_pos < call_pos);
}

#[test]
fn memset_callsite_yields_single_write() {
    let (m, _) = normal(
        r#"
declare void @llvm.memset.p0i8.i64(ptr, i8, i64, i1)

define void @z(ptr %d) {
entry:
  call void @llvm.memset.p0i8.i64(ptr %d, i8 0, i64 64, i1 0)
  ret void
}
"#,
    );
    let f = &m.funcs[0];

    assert_eq!(hook_calls(f, "racer_hook_mem_read").len(), 0);
    let writes = hook_calls(f, "racer_hook_mem_write");
    assert_eq!(writes.len(), 1);
    assert_eq!(resolve_addr(f, &writes[0].2[2].1), Operand::Reg("d".into()));
    assert_eq!(writes[0].2[3].1, Operand::Imm(64));
}

#[test]
fn ignored_function_is_left_untouched() {
    let src = r#"
define void @h() {
entry:
  %a = alloca i64
  ret void
}

define void @k() {
entry:
  ret void
}
"#;
    let pristine = parse_module("unit.ll", src).unwrap();
    let (m, rep) = instrument(src, r#"{ "ignored": { "h": true } }"#, Mode::Normal);

    assert!(!rep.funcs.contains_key("h"));
    assert!(rep.funcs.contains_key("k"));

    // no marks, no hooks, no payload prep in the opted-out function
    let h = &m.funcs[0];
    assert_eq!(h.inst_count(), pristine.funcs[0].inst_count());
    assert_eq!(all_reprs(h), {
        let p = &pristine.funcs[0];
        p.block_ids().flat_map(|b| reprs(p, b)).collect::<Vec<_>>()
    });
}

#[test]
fn ignore_mode_only_brackets_functions() {
    let (m, _) = instrument(
        r#"
define i32 @f(i32 %x) {
entry:
  %c = icmp slt i32 %x, 0
  br i1 %c, label %neg, label %pos
neg:
  ret i32 0
pos:
  ret i32 %x
}
"#,
        "{}",
        Mode::Ignore,
    );
    let f = &m.funcs[0];

    assert_eq!(hook_calls(f, "racer_hook_exec_pause").len(), 1);
    assert_eq!(hook_calls(f, "racer_hook_exec_resume").len(), 2);
    assert_eq!(hook_calls(f, "racer_hook_cov_cfg").len(), 0);
    assert_eq!(hook_calls(f, "racer_hook_mem_read").len(), 0);

    // pause and resume carry the same function hash
    let pause = &hook_calls(f, "racer_hook_exec_pause")[0].2;
    for resume in hook_calls(f, "racer_hook_exec_resume") {
        assert_eq!(pause[1].1, resume.2[1].1);
    }
}

#[test]
fn exec_hooks_pair_on_every_path() {
    let (m, rep) = normal(
        r#"
define i32 @f(i32 %x) {
entry:
  %c = icmp slt i32 %x, 0
  br i1 %c, label %neg, label %pos
neg:
  ret i32 0
pos:
  ret i32 %x
}
"#,
    );
    let f = &m.funcs[0];

    let enters = hook_calls(f, "racer_hook_exec_func_enter");
    let exits = hook_calls(f, "racer_hook_exec_func_exit");
    assert_eq!(enters.len(), 1);
    assert_eq!(exits.len(), 2);
    assert_eq!(enters[0].0, f.entry());

    // same hash and same function pointer everywhere
    let hash = &enters[0].2[1].1;
    let fptr = resolve_addr(f, &enters[0].2[2].1);
    assert_eq!(fptr, Operand::Sym("f".to_string()));
    for exit in &exits {
        assert_eq!(&exit.2[1].1, hash);
        assert_eq!(resolve_addr(f, &exit.2[2].1), fptr);
    }

    // the reported function hash matches the emitted one
    let reported = rep.funcs["f"].meta.hash;
    assert_eq!(*hash, Operand::Imm(reported as i64));
}

#[test]
fn one_coverage_hook_per_enumerated_block() {
    let (m, rep) = normal(
        r#"
define i32 @f(i32 %x) {
entry:
  %c = icmp slt i32 %x, 0
  br i1 %c, label %neg, label %pos
neg:
  br label %pos
pos:
  ret i32 %x
}
"#,
    );
    let f = &m.funcs[0];

    let covs = hook_calls(f, "racer_hook_cov_cfg");
    assert_eq!(covs.len(), rep.funcs["f"].blocks.len());

    // each hook carries its own block hash
    let mut hashes: Vec<_> = covs.iter().map(|c| c.2[1].1.clone()).collect();
    hashes.sort();
    hashes.dedup();
    assert_eq!(hashes.len(), covs.len());
}

#[test]
fn every_block_keeps_exactly_one_mark() {
    let (m, _) = normal(
        r#"
define i32 @f(i32 %x) {
entry:
  %c = icmp slt i32 %x, 0
  br i1 %c, label %neg, label %pos
neg:
  ret i32 0
pos:
  ret i32 %x
}
"#,
    );
    let f = &m.funcs[0];
    for block in f.block_ids() {
        let marks = f
            .block(block)
            .seq
            .iter()
            .filter(|&&id| mark::is_hook_mark(&f.inst(id).op))
            .count();
        assert_eq!(marks, 1, "block {:?} should hold exactly one mark", block);
    }
}

#[test]
fn original_instructions_survive_and_are_reported() {
    let src = r#"
define i32 @g(ptr %p) {
entry:
  %x = load i32, ptr %p, !dbg "fs/inode.c:11:7"
  store i32 %x, ptr %p
  ret i32 %x
}
"#;
    let pristine = parse_module("unit.ll", src).unwrap();
    let (m, rep) = normal(src);

    let originals: Vec<String> = {
        let p = &pristine.funcs[0];
        p.block_ids().flat_map(|b| reprs(p, b)).collect()
    };
    let rewritten = all_reprs(&m.funcs[0]);
    for orig in &originals {
        assert!(rewritten.contains(orig), "missing original `{}`", orig);
    }

    let reported: Vec<&str> = rep.funcs["g"].blocks[0]
        .inst
        .iter()
        .map(|i| i.repr.as_str())
        .collect();
    assert_eq!(reported, originals.iter().map(String::as_str).collect::<Vec<_>>());

    // locations come through, missing ones render empty
    assert_eq!(rep.funcs["g"].blocks[0].inst[0].info, "fs/inode.c:11:7");
    assert_eq!(rep.funcs["g"].blocks[0].inst[1].info, "");
}

#[test]
fn sidecar_hashes_are_pairwise_distinct() {
    let (_, rep) = normal(
        r#"
define i32 @f(i32 %x) {
entry:
  %y = add i32 %x, 1
  ret i32 %y
}

define i32 @g(i32 %x) {
entry:
  %y = add i32 %x, 2
  ret i32 %y
}
"#,
    );

    let mut seen = std::collections::BTreeSet::new();
    for func in rep.funcs.values() {
        assert!(seen.insert(func.meta.hash));
        for block in &func.blocks {
            assert!(seen.insert(block.hash));
            for inst in &block.inst {
                assert!(seen.insert(inst.hash));
            }
        }
    }
}

#[test]
fn block_edges_are_reported_as_hashes() {
    let (_, rep) = normal(
        r#"
define i32 @f(i32 %x) {
entry:
  %c = icmp slt i32 %x, 0
  br i1 %c, label %neg, label %pos
neg:
  br label %pos
pos:
  ret i32 %x
}
"#,
    );
    let blocks = &rep.funcs["f"].blocks;
    let entry = &blocks[0];
    let neg = &blocks[1];
    let pos = &blocks[2];

    assert!(entry.pred.is_empty());
    assert_eq!(entry.succ, vec![neg.hash, pos.hash]);
    assert_eq!(neg.pred, vec![entry.hash]);
    assert_eq!(neg.succ, vec![pos.hash]);
    let mut pos_preds = pos.pred.clone();
    pos_preds.sort_unstable();
    let mut expected = vec![entry.hash, neg.hash];
    expected.sort_unstable();
    assert_eq!(pos_preds, expected);
    assert!(pos.succ.is_empty());
}

#[test]
fn instrumentation_is_deterministic() {
    let src = r#"
declare void @llvm.memcpy.p0i8.p0i8.i64(ptr, ptr, i64, i1)

define i32 @f(ptr %p, ptr %q) {
entry:
  %buf = alloca [32 x i8]
  %x = load i32, ptr %p, !dbg "fs/inode.c:20:3"
  call void @llvm.memcpy.p0i8.p0i8.i64(ptr %q, ptr %p, i64 32, i1 0)
  store i32 %x, ptr %q
  ret i32 %x
}
"#;
    let (m1, r1) = normal(src);
    let (m2, r2) = normal(src);

    assert_eq!(m1.to_string(), m2.to_string());
    assert_eq!(report::to_json(&r1), report::to_json(&r2));
}

#[test]
fn special_tag_skips_instrumentation_but_reports() {
    let (m, rep) = instrument(
        EMPTY_FN,
        r#"{ "special": { "unit.ll": "mystery-tag" } }"#,
        Mode::Normal,
    );
    let f = &m.funcs[0];

    // marks are placed, but no hooks are emitted
    assert_eq!(hook_calls(f, "racer_hook_exec_func_enter").len(), 0);
    assert_eq!(hook_calls(f, "racer_hook_cov_cfg").len(), 0);
    assert_eq!(rep.funcs.len(), 1);
}

#[test]
fn sidecar_lists_module_surface() {
    let (_, rep) = normal(
        r#"
%struct.pair = type { i32, i64 }

@counter = global i64 0

declare i32 @helper(i32)

define void @f() {
entry:
  ret void
}
"#,
    );

    assert!(rep.meta.apis.iter().any(|a| a == "helper"));
    // runtime hooks are declared before reporting and therefore listed
    assert!(rep
        .meta
        .apis
        .iter()
        .any(|a| a == "racer_hook_exec_func_enter"));
    assert_eq!(rep.meta.gvar, vec!["@counter = global i64 0".to_string()]);
    assert_eq!(rep.meta.structs, vec!["struct.pair".to_string()]);
}
