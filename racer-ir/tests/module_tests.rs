use racer_ir::{
    analysis,
    error::Error,
    instr::{Instr, Operand},
    module::{Inst, InstId, Module},
    name::Name,
    parser::parse_module,
    types::Ty,
};

const SAMPLE: &str = r#"
source_filename = "drivers/char/sample.c"
target datalayout = "e-p:64:64"
target triple = "x86_64-unknown-linux-gnu"

%struct.pair = type { i32, i64 }

@counter = global i64 0
@table = external global %struct.pair

declare void @llvm.memcpy.p0i8.p0i8.i64(ptr, ptr, i64, i1)
declare i32 @helper(i32)

define i32 @bump(ptr %p) {
entry:
  %x = load i32, ptr %p, !dbg "drivers/char/sample.c:10:9"
  %c = icmp slt i32 %x, 100
  br i1 %c, label %grow, label %done
grow:
  %y = add i32 %x, 1
  store i32 %y, ptr %p, !dbg "drivers/char/sample.c:12:5"
  br label %done
done:
  %r = phi i32 [ %x, %entry ], [ %y, %grow ]
  ret i32 %r
}
"#;

fn sample() -> Module {
    parse_module("sample.ll", SAMPLE).expect("sample module should parse")
}

#[test]
fn module_header_fields_are_read() {
    let m = sample();
    assert_eq!(m.name, "drivers/char/sample.c");
    assert!(m.layout.little_endian);
    assert_eq!(m.layout.pointer_bits, 64);
    assert_eq!(m.triple, "x86_64-unknown-linux-gnu");
    assert_eq!(m.structs.len(), 1);
    assert_eq!(m.globals.len(), 2);
    assert_eq!(m.decls.len(), 2);
    assert!(m.decl("llvm.memcpy.p0i8.p0i8.i64").unwrap().is_intrinsic());
    assert!(!m.decl("helper").unwrap().is_intrinsic());
}

#[test]
fn printed_module_reparses_to_equal_module() {
    let m = sample();
    let printed = m.to_string();
    let again = parse_module("sample.ll", &printed).expect("printed module should reparse");
    assert_eq!(m, again);
}

#[test]
fn debug_locations_survive_roundtrip() {
    let m = sample();
    let f = &m.funcs[0];
    let entry = f.block(f.entry());
    let load = f.inst(entry.seq[0]);
    let dloc = load.dloc.as_ref().expect("load should carry a location");
    assert_eq!(dloc.to_string(), "drivers/char/sample.c:10:9");
}

#[test]
fn value_types_cover_params_and_destinations() {
    let m = sample();
    let vt = analysis::value_types(&m.funcs[0]);
    assert_eq!(vt.get(&Name::from("p")), Some(&Ty::Ptr));
    assert_eq!(vt.get(&Name::from("x")), Some(&Ty::I32));
    assert_eq!(vt.get(&Name::from("c")), Some(&Ty::I1));
    assert_eq!(vt.get(&Name::from("r")), Some(&Ty::I32));
}

#[test]
fn successor_and_predecessor_edges_resolve() {
    let m = sample();
    let f = &m.funcs[0];
    let entry = f.entry();
    let succs = analysis::successors(f, entry);
    assert_eq!(succs.len(), 2);

    let preds = analysis::predecessors(f);
    let done = f
        .block_by_label(&racer_ir::instr::Label::new("done"))
        .unwrap();
    assert_eq!(preds[&done].len(), 2);
}

#[test]
fn splicing_preserves_instruction_identity() {
    let mut m = sample();
    let f = &mut m.funcs[0];
    let entry = f.entry();
    let first: InstId = f.block(entry).seq[0];
    let before_len = f.block(entry).seq.len();

    let fresh = f.fresh_name();
    let inserted = f.insert_before(
        entry,
        first,
        Inst::new(racer_ir::instr::int::Bin {
            dest: fresh,
            op: racer_ir::instr::int::BinOp::Add,
            ty: Ty::I64,
            lhs: Operand::Imm(1),
            rhs: Operand::Imm(2),
        }),
    );

    assert_ne!(inserted, first);
    assert_eq!(f.block(entry).seq.len(), before_len + 1);
    assert_eq!(f.block(entry).seq[0], inserted);
    assert_eq!(f.block(entry).seq[1], first);
    // the original load is still reachable under its old id
    assert!(matches!(f.inst(first).op, Instr::Load(_)));
}

#[test]
fn repeated_insertion_before_one_anchor_keeps_emission_order() {
    let mut m = sample();
    let f = &mut m.funcs[0];
    let entry = f.entry();
    let anchor = f.block(entry).seq[0];

    let mut ids = Vec::new();
    for _ in 0..3 {
        let dest = f.fresh_name();
        ids.push(f.insert_before(
            entry,
            anchor,
            Inst::new(racer_ir::instr::int::Bin {
                dest,
                op: racer_ir::instr::int::BinOp::Add,
                ty: Ty::I64,
                lhs: Operand::Imm(0),
                rhs: Operand::Imm(0),
            }),
        ));
    }

    let seq = &f.block(entry).seq;
    assert_eq!(&seq[0..3], ids.as_slice());
    assert_eq!(seq[3], anchor);
}

#[test]
fn fresh_names_do_not_collide_with_parsed_numbers() {
    let src = r#"
define void @f() {
entry:
  %7 = add i32 1, 2
  ret void
}
"#;
    let mut m = parse_module("f.ll", src).unwrap();
    assert_eq!(m.funcs[0].fresh_name(), Name::Number(8));
}

#[test]
fn terminator_in_middle_of_block_is_rejected() {
    let src = r#"
define void @f() {
entry:
  ret void
  ret void
}
"#;
    match parse_module("f.ll", src) {
        Err(Error::TerminatorMidBlock { .. }) => {}
        other => panic!("expected TerminatorMidBlock, got {:?}", other),
    }
}

#[test]
fn undefined_operand_is_rejected() {
    let src = r#"
define void @f() {
entry:
  %x = add i32 %missing, 1
  ret void
}
"#;
    match parse_module("f.ll", src) {
        Err(Error::UndefinedSsaName { undefined, .. }) => {
            assert_eq!(undefined, Name::from("missing"));
        }
        other => panic!("expected UndefinedSsaName, got {:?}", other),
    }
}

#[test]
fn invoke_and_asm_forms_parse() {
    let src = r#"
define void @f(ptr %p) {
entry:
  call void asm "mfence"()
  invoke void @g() to label %next unwind label %next
next:
  ret void
}
"#;
    let m = parse_module("f.ll", src).unwrap();
    let f = &m.funcs[0];
    let entry = f.block(f.entry());
    assert!(matches!(f.inst(entry.seq[0]).op, Instr::Call(_)));
    assert!(matches!(f.inst(entry.seq[1]).op, Instr::Invoke(_)));
}
