//! Textual printers.
//!
//! The printed form of an unmodified module re-parses to an equal module;
//! [`instr_repr`] is also the source of the `repr` strings in the sidecar
//! report, which is why it excludes the `!dbg` suffix (locations are
//! reported in their own field).

use crate::{
    instr::{misc::Callee, Instr, Operand, Terminator},
    module::{Function, Global, GlobalInit, Module},
    types::Ty,
};

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::I(bits) => write!(f, "i{}", bits),
            Ty::F32 => write!(f, "float"),
            Ty::F64 => write!(f, "double"),
            Ty::Ptr => write!(f, "ptr"),
            Ty::Array(elem, count) => write!(f, "[{} x {}]", count, elem),
            Ty::Struct(name) => write!(f, "%{}", name),
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(name) => write!(f, "%{}", name),
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Sym(name) => write!(f, "@{}", name),
            Operand::Null => write!(f, "null"),
        }
    }
}

impl std::fmt::Display for Callee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callee::Sym(name) => write!(f, "@{}", name),
            Callee::Asm(text) => write!(f, "asm \"{}\"", text),
        }
    }
}

fn ret_ty(ty: &Option<Ty>) -> String {
    match ty {
        Some(ty) => ty.to_string(),
        None => "void".to_string(),
    }
}

fn call_args(args: &[(Ty, Operand)]) -> String {
    args.iter()
        .map(|(ty, op)| format!("{} {}", ty, op))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Textual form of one instruction, without the `!dbg` suffix.
pub fn instr_repr(instr: &Instr) -> String {
    match instr {
        Instr::Bin(i) => format!(
            "%{} = {} {} {}, {}",
            i.dest,
            i.op.to_str(),
            i.ty,
            i.lhs,
            i.rhs
        ),
        Instr::Cmp(i) => format!(
            "%{} = icmp {} {} {}, {}",
            i.dest,
            i.op.to_str(),
            i.ty,
            i.lhs,
            i.rhs
        ),
        Instr::Cast(i) => format!(
            "%{} = {} {} {} to {}",
            i.dest,
            i.op.to_str(),
            i.from,
            i.value,
            i.to
        ),
        Instr::Alloca(i) => {
            let mut s = format!("%{} = alloca {}", i.dest, i.ty);
            if let Some((ty, count)) = &i.count {
                s.push_str(&format!(", {} {}", ty, count));
            }
            if let Some(align) = i.align {
                s.push_str(&format!(", align {}", align));
            }
            s
        }
        Instr::Load(i) => format!(
            "%{} = load {}{}, ptr {}",
            i.dest,
            if i.volatile { "volatile " } else { "" },
            i.ty,
            i.addr
        ),
        Instr::Store(i) => format!(
            "store {}{} {}, ptr {}",
            if i.volatile { "volatile " } else { "" },
            i.ty,
            i.value,
            i.addr
        ),
        Instr::Gep(i) => {
            let mut s = format!("%{} = getelementptr {}, ptr {}", i.dest, i.base, i.addr);
            for (ty, op) in &i.indices {
                s.push_str(&format!(", {} {}", ty, op));
            }
            s
        }
        Instr::Call(i) => {
            let callsite = format!("call {} {}({})", ret_ty(&i.ty), i.callee, call_args(&i.args));
            match &i.dest {
                Some(dest) => format!("%{} = {}", dest, callsite),
                None => callsite,
            }
        }
        Instr::Phi(i) => {
            let incoming = i
                .incoming
                .iter()
                .map(|(op, label)| format!("[ {}, %{} ]", op, label))
                .collect::<Vec<_>>()
                .join(", ");
            format!("%{} = phi {} {}", i.dest, i.ty, incoming)
        }
        Instr::Select(i) => format!(
            "%{} = select i1 {}, {} {}, {} {}",
            i.dest, i.cond, i.ty, i.if_true, i.ty, i.if_false
        ),
        Instr::Invoke(i) => {
            let callsite = format!(
                "invoke {} {}({}) to label %{} unwind label %{}",
                ret_ty(&i.ty),
                i.callee,
                call_args(&i.args),
                i.normal,
                i.unwind
            );
            match &i.dest {
                Some(dest) => format!("%{} = {}", dest, callsite),
                None => callsite,
            }
        }
        Instr::Resume(i) => format!("resume {} {}", i.ty, i.value),
        Instr::Term(t) => match t {
            Terminator::Br(br) => format!("br label %{}", br.target),
            Terminator::CondBr(cbr) => format!(
                "br i1 {}, label %{}, label %{}",
                cbr.cond, cbr.if_true, cbr.if_false
            ),
            Terminator::Ret(ret) => match &ret.value {
                Some((ty, op)) => format!("ret {} {}", ty, op),
                None => "ret void".to_string(),
            },
            Terminator::Unreachable => "unreachable".to_string(),
        },
    }
}

/// Textual form of a global, as it appears in the module and the sidecar.
pub fn global_repr(g: &Global) -> String {
    match &g.init {
        GlobalInit::Int(v) => format!("@{} = global {} {}", g.name, g.ty, v),
        GlobalInit::Zero => format!("@{} = global {} zeroinitializer", g.name, g.ty),
        GlobalInit::External => format!("@{} = external global {}", g.name, g.ty),
    }
}

fn write_function(out: &mut String, f: &Function) {
    let params = f
        .params
        .iter()
        .map(|(name, ty)| format!("{} %{}", ty, name))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "define {} @{}({}) {{\n",
        ret_ty(&f.ret),
        f.name,
        params
    ));
    for block in &f.blocks {
        out.push_str(&format!("{}:\n", block.label));
        for &id in &block.seq {
            let inst = f.inst(id);
            out.push_str("  ");
            out.push_str(&instr_repr(&inst.op));
            if let Some(dloc) = &inst.dloc {
                out.push_str(&format!(", !dbg \"{}\"", dloc));
            }
            out.push('\n');
        }
    }
    out.push_str("}\n");
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();

        out.push_str(&format!("source_filename = \"{}\"\n", self.name));
        out.push_str(&format!("target datalayout = \"{}\"\n", self.layout.raw()));
        if !self.triple.is_empty() {
            out.push_str(&format!("target triple = \"{}\"\n", self.triple));
        }
        out.push('\n');

        for (name, fields) in &self.structs {
            let fields = fields
                .iter()
                .map(|ty| ty.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("%{} = type {{ {} }}\n", name, fields));
        }
        if !self.structs.is_empty() {
            out.push('\n');
        }

        for global in &self.globals {
            out.push_str(&global_repr(global));
            out.push('\n');
        }
        if !self.globals.is_empty() {
            out.push('\n');
        }

        for decl in &self.decls {
            let params = decl
                .params
                .iter()
                .map(|ty| ty.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "declare {} @{}({})\n",
                ret_ty(&decl.ret),
                decl.name,
                params
            ));
        }
        if !self.decls.is_empty() {
            out.push('\n');
        }

        for (i, func) in self.funcs.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            write_function(&mut out, func);
        }

        f.write_str(&out)
    }
}
