//! Parser for the textual IR.
//!
//! The grammar is a compact LLVM-flavored dialect: `source_filename` /
//! `target` lines, identified struct types, globals, `declare` lines and
//! `define` bodies made of labelled blocks. Instructions may carry a
//! trailing `!dbg "file:line:col"` location whose inlined-at chain joins
//! entries with `" @ "`.

use chumsky::{prelude::*, text::digits};
use log::debug;

use crate::{
    debugloc::DebugLoc,
    error::Error,
    instr::{
        int::{Bin, BinOp, Cast, CastOp, Cmp, CmpOp},
        mem::{Alloca, Gep, Load, Store},
        misc::{Call, Callee, Invoke, Phi, Resume, Select},
        operand::{Label, Operand},
        terminator::{Br, CondBr, Ret, Terminator},
        Instr,
    },
    module::{Declaration, Function, Global, GlobalInit, Inst, Module},
    name::Name,
    types::{DataLayout, Ty},
};

type PErr<'src> = extra::Err<Rich<'src, char>>;

/// Destination written by the assigned-form wrapper after the right-hand
/// side has parsed.
fn placeholder() -> Name {
    Name::Number(usize::MAX)
}

fn pad<'src>() -> impl Parser<'src, &'src str, (), PErr<'src>> + Clone {
    let ws = any().filter(|c: &char| c.is_whitespace()).ignored();
    let comment = just(';')
        .then(none_of('\n').repeated())
        .ignored()
        .labelled("comment");
    choice((ws, comment)).repeated().ignored()
}

fn tok<'src>(s: &'static str) -> impl Parser<'src, &'src str, &'src str, PErr<'src>> + Clone {
    just(s).padded_by(pad())
}

/// Identifier characters valid in symbol names, labels and struct names
/// (letters, digits, `.`, `_`, `$`, `-`).
fn symbol<'src>() -> impl Parser<'src, &'src str, &'src str, PErr<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '$' | '-'))
        .repeated()
        .at_least(1)
        .to_slice()
        .labelled("symbol")
}

fn name<'src>() -> impl Parser<'src, &'src str, Name, PErr<'src>> + Clone {
    symbol().map(|s: &str| {
        if s.bytes().all(|b| b.is_ascii_digit()) {
            // numeric names keep their compiler-assigned value
            Name::Number(s.parse().unwrap_or(0))
        } else {
            Name::from(s)
        }
    })
}

fn string_lit<'src>() -> impl Parser<'src, &'src str, String, PErr<'src>> + Clone {
    just('"')
        .ignore_then(none_of('"').repeated().to_slice().map(str::to_string))
        .then_ignore(just('"'))
        .labelled("string literal")
}

fn int_lit<'src>() -> impl Parser<'src, &'src str, i64, PErr<'src>> + Clone {
    just('-')
        .or_not()
        .then(digits(10))
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<i64>()
                .map_err(|_| Rich::custom(span, format!("integer literal out of range: {}", s)))
        })
        .labelled("integer literal")
}

fn uint_lit<'src>() -> impl Parser<'src, &'src str, u64, PErr<'src>> + Clone {
    digits(10)
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<u64>()
                .map_err(|_| Rich::custom(span, format!("integer literal out of range: {}", s)))
        })
        .labelled("unsigned integer literal")
}

fn ty_parser<'src>() -> impl Parser<'src, &'src str, Ty, PErr<'src>> + Clone {
    recursive(|ty| {
        let int = just('i')
            .ignore_then(digits(10).to_slice())
            .try_map(|s: &str, span| {
                let bits: u32 = s
                    .parse()
                    .map_err(|_| Rich::custom(span, format!("invalid integer width: {}", s)))?;
                if bits == 0 || bits > 64 {
                    return Err(Rich::custom(
                        span,
                        format!("integer width must be within 1..=64, got {}", bits),
                    ));
                }
                Ok(Ty::I(bits))
            });

        let array = tok("[")
            .ignore_then(uint_lit())
            .then_ignore(tok("x"))
            .then(ty.clone())
            .then_ignore(tok("]"))
            .map(|(count, elem)| Ty::Array(Box::new(elem), count));

        let named = just('%')
            .ignore_then(symbol())
            .map(|s: &str| Ty::Struct(s.to_string()));

        choice((
            array,
            just("ptr").to(Ty::Ptr),
            just("double").to(Ty::F64),
            just("float").to(Ty::F32),
            int,
            named,
        ))
        .labelled("type")
    })
}

/// `void` or a first-class type, as used in return positions.
fn ret_ty_parser<'src>() -> impl Parser<'src, &'src str, Option<Ty>, PErr<'src>> + Clone {
    choice((just("void").to(None), ty_parser().map(Some))).labelled("return type")
}

fn operand_parser<'src>() -> impl Parser<'src, &'src str, Operand, PErr<'src>> + Clone {
    choice((
        just('%').ignore_then(name()).map(Operand::Reg),
        just('@')
            .ignore_then(symbol())
            .map(|s: &str| Operand::Sym(s.to_string())),
        just("null").to(Operand::Null),
        int_lit().map(Operand::Imm),
    ))
    .labelled("operand")
}

fn label_ref<'src>() -> impl Parser<'src, &'src str, Label, PErr<'src>> + Clone {
    just('%')
        .ignore_then(symbol())
        .map(|s: &str| Label::new(s))
        .labelled("label")
}

fn typed_operand<'src>() -> impl Parser<'src, &'src str, (Ty, Operand), PErr<'src>> + Clone {
    ty_parser().then(operand_parser().padded_by(pad()))
}

fn callee_parser<'src>() -> impl Parser<'src, &'src str, Callee, PErr<'src>> + Clone {
    choice((
        just('@')
            .ignore_then(symbol())
            .map(|s: &str| Callee::Sym(s.to_string())),
        just("asm")
            .ignore_then(string_lit().padded_by(pad()))
            .map(Callee::Asm),
    ))
    .labelled("callee")
}

fn call_args<'src>() -> impl Parser<'src, &'src str, Vec<(Ty, Operand)>, PErr<'src>> + Clone {
    tok("(")
        .ignore_then(
            typed_operand()
                .separated_by(tok(","))
                .collect::<Vec<_>>(),
        )
        .then_ignore(tok(")"))
}

/// Right-hand sides of `%dest = ...` forms. Every parser here produces an
/// instruction with a placeholder destination that the caller overwrites.
fn assigned_rhs<'src>() -> impl Parser<'src, &'src str, Instr, PErr<'src>> + Clone {
    let load = just("load")
        .ignore_then(tok("volatile").or_not())
        .then(ty_parser().padded_by(pad()))
        .then_ignore(tok(","))
        .then_ignore(tok("ptr"))
        .then(operand_parser())
        .map(|((volatile, ty), addr)| {
            Instr::Load(Load {
                dest: placeholder(),
                ty,
                addr,
                volatile: volatile.is_some(),
            })
        });

    let align_clause = tok(",")
        .ignore_then(tok("align"))
        .ignore_then(uint_lit());

    let alloca = just("alloca")
        .ignore_then(ty_parser().padded_by(pad()))
        .then(tok(",").ignore_then(typed_operand()).or_not())
        .then(align_clause.or_not())
        .map(|((ty, count), align)| {
            Instr::Alloca(Alloca {
                dest: placeholder(),
                ty,
                count,
                align,
            })
        });

    let gep = just("getelementptr")
        .ignore_then(ty_parser().padded_by(pad()))
        .then_ignore(tok(","))
        .then_ignore(tok("ptr"))
        .then(operand_parser())
        .then(
            tok(",")
                .ignore_then(typed_operand())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(|((base, addr), indices)| {
            Instr::Gep(Gep {
                dest: placeholder(),
                base,
                addr,
                indices: indices.into_iter().collect(),
            })
        });

    let phi_incoming = tok("[")
        .ignore_then(operand_parser())
        .then_ignore(tok(","))
        .then(label_ref())
        .then_ignore(tok("]"));
    let phi = just("phi")
        .ignore_then(ty_parser().padded_by(pad()))
        .then(
            phi_incoming
                .separated_by(tok(","))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .map(|(ty, incoming)| {
            Instr::Phi(Phi {
                dest: placeholder(),
                ty,
                incoming,
            })
        });

    let select = just("select")
        .ignore_then(tok("i1"))
        .ignore_then(operand_parser())
        .then_ignore(tok(","))
        .then(typed_operand())
        .then_ignore(tok(","))
        .then(typed_operand())
        .map(|((cond, (ty, if_true)), (_, if_false))| {
            Instr::Select(Select {
                dest: placeholder(),
                ty,
                cond,
                if_true,
                if_false,
            })
        });

    let icmp = just("icmp")
        .ignore_then(symbol().padded_by(pad()))
        .try_map(|s: &str, span| {
            CmpOp::from_str(s)
                .ok_or_else(|| Rich::custom(span, format!("unknown comparison predicate: {}", s)))
        })
        .then(ty_parser())
        .then(operand_parser().padded_by(pad()))
        .then_ignore(tok(","))
        .then(operand_parser())
        .map(|(((op, ty), lhs), rhs)| {
            Instr::Cmp(Cmp {
                dest: placeholder(),
                op,
                ty,
                lhs,
                rhs,
            })
        });

    let call = just("call")
        .ignore_then(ret_ty_parser().padded_by(pad()))
        .then(callee_parser())
        .then(call_args())
        .try_map(|((ty, callee), args), span| {
            if ty.is_none() {
                return Err(Rich::custom(span, "void call cannot define a value"));
            }
            Ok(Instr::Call(Call {
                dest: Some(placeholder()),
                ty,
                callee,
                args,
            }))
        });

    let invoke = invoke_parser().try_map(|mut instr, span| {
        if let Instr::Invoke(inv) = &mut instr {
            if inv.ty.is_none() {
                return Err(Rich::custom(span, "void invoke cannot define a value"));
            }
            inv.dest = Some(placeholder());
        }
        Ok(instr)
    });

    let cast = symbol()
        .try_map(|s: &str, span| {
            CastOp::from_str(s)
                .ok_or_else(|| Rich::custom(span, format!("unknown cast operator: {}", s)))
        })
        .then(ty_parser().padded_by(pad()))
        .then(operand_parser())
        .then_ignore(tok("to"))
        .then(ty_parser())
        .map(|(((op, from), value), to)| {
            Instr::Cast(Cast {
                dest: placeholder(),
                op,
                from,
                value,
                to,
            })
        });

    let bin = symbol()
        .try_map(|s: &str, span| {
            BinOp::from_str(s)
                .ok_or_else(|| Rich::custom(span, format!("unknown instruction: {}", s)))
        })
        .then(ty_parser().padded_by(pad()))
        .then(operand_parser())
        .then_ignore(tok(","))
        .then(operand_parser())
        .map(|(((op, ty), lhs), rhs)| {
            Instr::Bin(Bin {
                dest: placeholder(),
                op,
                ty,
                lhs,
                rhs,
            })
        });

    choice((load, alloca, gep, phi, select, icmp, call, invoke, cast, bin))
}

fn invoke_parser<'src>() -> impl Parser<'src, &'src str, Instr, PErr<'src>> + Clone {
    just("invoke")
        .ignore_then(ret_ty_parser().padded_by(pad()))
        .then(callee_parser())
        .then(call_args())
        .then_ignore(tok("to"))
        .then_ignore(tok("label"))
        .then(label_ref())
        .then_ignore(tok("unwind"))
        .then_ignore(tok("label"))
        .then(label_ref().padded_by(pad()))
        .map(|((((ty, callee), args), normal), unwind)| {
            Instr::Invoke(Invoke {
                dest: None,
                ty,
                callee,
                args,
                normal,
                unwind,
            })
        })
}

/// Instruction forms that do not define a value.
fn void_form<'src>() -> impl Parser<'src, &'src str, Instr, PErr<'src>> + Clone {
    let store = just("store")
        .ignore_then(tok("volatile").or_not())
        .then(typed_operand().padded_by(pad()))
        .then_ignore(tok(","))
        .then_ignore(tok("ptr"))
        .then(operand_parser())
        .map(|((volatile, (ty, value)), addr)| {
            Instr::Store(Store {
                ty,
                value,
                addr,
                volatile: volatile.is_some(),
            })
        });

    let call = just("call")
        .ignore_then(just("void").padded_by(pad()))
        .ignore_then(callee_parser())
        .then(call_args())
        .map(|(callee, args)| {
            Instr::Call(Call {
                dest: None,
                ty: None,
                callee,
                args,
            })
        });

    let cond_br = just("br")
        .ignore_then(tok("i1"))
        .ignore_then(operand_parser())
        .then_ignore(tok(","))
        .then_ignore(tok("label"))
        .then(label_ref())
        .then_ignore(tok(","))
        .then_ignore(tok("label"))
        .then(label_ref())
        .map(|((cond, if_true), if_false)| {
            Instr::Term(Terminator::CondBr(CondBr {
                cond,
                if_true,
                if_false,
            }))
        });

    let br = just("br")
        .ignore_then(tok("label"))
        .ignore_then(label_ref())
        .map(|target| Instr::Term(Terminator::Br(Br { target })));

    let ret = just("ret")
        .ignore_then(
            choice((
                just("void").to(None),
                typed_operand().map(Some),
            ))
            .padded_by(pad()),
        )
        .map(|value| Instr::Term(Terminator::Ret(Ret { value })));

    let resume = just("resume")
        .ignore_then(typed_operand().padded_by(pad()))
        .map(|(ty, value)| Instr::Resume(Resume { ty, value }));

    choice((
        store,
        call,
        cond_br,
        br,
        ret,
        just("unreachable").to(Instr::Term(Terminator::Unreachable)),
        resume,
        invoke_parser(),
    ))
}

fn dbg_suffix<'src>() -> impl Parser<'src, &'src str, DebugLoc, PErr<'src>> + Clone {
    tok(",")
        .ignore_then(tok("!dbg"))
        .ignore_then(string_lit())
        .try_map(|text, span| {
            DebugLoc::parse_chain(&text)
                .ok_or_else(|| Rich::custom(span, format!("malformed debug location: {}", text)))
        })
}

fn inst_parser<'src>() -> impl Parser<'src, &'src str, Inst, PErr<'src>> + Clone {
    let assigned = just('%')
        .ignore_then(name())
        .then_ignore(tok("="))
        .then(assigned_rhs())
        .map(|(dest, mut instr)| {
            instr.set_destination(dest);
            instr
        });

    choice((assigned, void_form()))
        .then(dbg_suffix().or_not())
        .map(|(op, dloc)| Inst { op, dloc })
        .padded_by(pad())
}

enum Item {
    SourceFilename(String),
    Layout(String),
    Triple(String),
    StructDef(String, Vec<Ty>),
    Global(Global),
    Declare(Declaration),
    Define {
        name: String,
        params: Vec<(Name, Ty)>,
        ret: Option<Ty>,
        blocks: Vec<(String, Vec<Inst>)>,
    },
}

fn item_parser<'src>() -> impl Parser<'src, &'src str, Item, PErr<'src>> + Clone {
    let source_filename = just("source_filename")
        .ignore_then(tok("="))
        .ignore_then(string_lit())
        .map(Item::SourceFilename);

    let target = just("target").ignore_then(pad()).ignore_then(choice((
        just("datalayout")
            .ignore_then(tok("="))
            .ignore_then(string_lit())
            .map(Item::Layout),
        just("triple")
            .ignore_then(tok("="))
            .ignore_then(string_lit())
            .map(Item::Triple),
    )));

    let struct_def = just('%')
        .ignore_then(symbol())
        .then_ignore(tok("="))
        .then_ignore(tok("type"))
        .then_ignore(tok("{"))
        .then(
            ty_parser()
                .padded_by(pad())
                .separated_by(tok(","))
                .collect::<Vec<_>>(),
        )
        .then_ignore(tok("}"))
        .map(|(name, fields): (&str, _)| Item::StructDef(name.to_string(), fields));

    let global_init = choice((
        just("zeroinitializer").to(GlobalInit::Zero),
        int_lit().map(GlobalInit::Int),
    ));
    let global = just('@')
        .ignore_then(symbol())
        .then_ignore(tok("="))
        .then(choice((
            just("external")
                .ignore_then(tok("global"))
                .ignore_then(ty_parser())
                .map(|ty| (ty, GlobalInit::External)),
            just("global")
                .ignore_then(ty_parser().padded_by(pad()))
                .then(global_init)
                .map(|(ty, init)| (ty, init)),
        )))
        .map(|(name, (ty, init)): (&str, _)| {
            Item::Global(Global {
                name: name.to_string(),
                ty,
                init,
            })
        });

    let declare = just("declare")
        .ignore_then(ret_ty_parser().padded_by(pad()))
        .then_ignore(just('@'))
        .then(symbol())
        .then_ignore(tok("("))
        .then(
            ty_parser()
                .padded_by(pad())
                .separated_by(tok(","))
                .collect::<Vec<_>>(),
        )
        .then_ignore(tok(")"))
        .map(|((ret, name), params): ((_, &str), _)| {
            Item::Declare(Declaration {
                name: name.to_string(),
                params,
                ret,
            })
        });

    let param = ty_parser()
        .then(just('%').ignore_then(name()).padded_by(pad()))
        .map(|(ty, name)| (name, ty));
    let block = symbol()
        .then_ignore(tok(":"))
        .then(inst_parser().repeated().at_least(1).collect::<Vec<_>>())
        .map(|(label, insts): (&str, _)| (label.to_string(), insts));
    let define = just("define")
        .ignore_then(ret_ty_parser().padded_by(pad()))
        .then_ignore(just('@'))
        .then(symbol())
        .then_ignore(tok("("))
        .then(param.separated_by(tok(",")).collect::<Vec<_>>())
        .then_ignore(tok(")"))
        .then_ignore(tok("{"))
        .then(block.padded_by(pad()).repeated().at_least(1).collect::<Vec<_>>())
        .then_ignore(tok("}"))
        .map(|(((ret, name), params), blocks): (((_, &str), _), _)| Item::Define {
            name: name.to_string(),
            params,
            ret,
            blocks,
        });

    choice((
        source_filename,
        target,
        struct_def,
        global,
        declare,
        define,
    ))
}

fn module_parser<'src>() -> impl Parser<'src, &'src str, Vec<Item>, PErr<'src>> + Clone {
    item_parser()
        .padded_by(pad())
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}

/// Parse a textual module. `fallback_name` names the module when the
/// source has no `source_filename` line (typically the input path).
pub fn parse_module(fallback_name: &str, src: &str) -> Result<Module, Error> {
    let items = module_parser()
        .parse(src)
        .into_result()
        .map_err(|errors| Error::Parse {
            module: fallback_name.to_string(),
            detail: errors
                .iter()
                .map(|e| format!("{} at {:?}", e, e.span()))
                .collect::<Vec<_>>()
                .join("\n"),
        })?;

    let mut module = Module::new(fallback_name);
    for item in items {
        match item {
            Item::SourceFilename(name) => module.name = name,
            Item::Layout(raw) => module.layout = DataLayout::parse(&raw)?,
            Item::Triple(triple) => module.triple = triple,
            Item::StructDef(name, fields) => {
                module.structs.insert(name, fields);
            }
            Item::Global(global) => module.globals.push(global),
            Item::Declare(decl) => module.decls.push(decl),
            Item::Define {
                name,
                params,
                ret,
                blocks,
            } => {
                let func = Function::assemble(name, params, ret, blocks)?;
                module.funcs.push(func);
            }
        }
    }

    debug!(
        "parsed module `{}`: {} function(s), {} declaration(s)",
        module.name,
        module.funcs.len(),
        module.decls.len()
    );
    Ok(module)
}
