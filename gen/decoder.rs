//! Decoder generator.
//!
//! Instructions are grouped by their fixed fields in tie-break order: opcode,
//! then funct3, then the upper function field. Groups with a single member
//! become leaves guarded by the full mask/match predicate of the instruction.

use std::collections::BTreeMap;

use isagen_core::{
    catalog::{Catalog, InstructionInfo},
    error::{EncodingError, Error, ErrorKind},
    field::{InstructionFormat, Level, RegRole},
};

use crate::{
    pad::{Pad, Source},
    Options,
};

pub(crate) fn ident(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

pub(crate) fn const_name(name: &str) -> String {
    ident(name).to_uppercase()
}

fn extract(from: u32, len: u32) -> String {
    let mask = (1u64 << len) - 1;
    if from == 0 {
        format!("(insn & {mask:#x})")
    } else {
        format!("((insn >> {from}) & {mask:#x})")
    }
}

#[derive(Debug)]
enum Node<'a> {
    Leaf(&'a InstructionInfo),
    Switch {
        from: u32,
        len: u32,
        arms: BTreeMap<u32, Node<'a>>,
    },
}

fn split<'a>(insns: Vec<&'a InstructionInfo>, levels: &[Level]) -> Result<Node<'a>, EncodingError> {
    if let [insn] = insns[..] {
        return Ok(Node::Leaf(insn));
    }

    let collision = || EncodingError::Collision(insns.iter().map(|i| i.name().to_owned()).collect());
    let Some((&level, rest)) = levels.split_first() else {
        return Err(collision());
    };

    let mut range = None;
    let mut groups: BTreeMap<u32, Vec<&InstructionInfo>> = BTreeMap::new();
    for &insn in &insns {
        let field = insn.format().fixed(level).ok_or_else(collision)?;
        let (part, value) = match (field.parts(), field.value()) {
            ([part], Some(value)) => ((part.from, part.len()), value),
            _ => return Err(collision()),
        };
        if *range.get_or_insert(part) != part {
            return Err(collision());
        }
        groups.entry(value).or_default().push(insn);
    }
    let (from, len) = range.ok_or_else(collision)?;

    let mut arms = BTreeMap::new();
    for (value, group) in groups {
        arms.insert(value, split(group, rest)?);
    }
    Ok(Node::Switch { from, len, arms })
}

struct DecoderGen<'a> {
    opts: &'a Options,
    out: Source,
}

impl<'a> DecoderGen<'a> {
    fn new(opts: &'a Options) -> Self {
        Self {
            opts,
            out: Source::new(),
        }
    }

    fn gen_opcodes(&mut self, insns: &[&InstructionInfo]) {
        let out = &mut self.out;
        let pad = Pad::default();
        out.line(pad, "#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]");
        out.line(pad, "pub struct Opcode(pub u16);");
        out.blank();
        out.line(pad, "pub mod opcode {");
        out.line(pad.shift(), "use super::Opcode;");
        out.blank();
        out.line(pad.shift(), "pub const INVALID: Opcode = Opcode(0);");
        for (i, insn) in insns.iter().enumerate() {
            out.line(
                pad.shift(),
                format_args!("pub const {}: Opcode = Opcode({});", const_name(insn.name()), i + 1),
            );
        }
        out.line(pad, "}");
        out.blank();

        out.line(pad, "pub fn mnemonic(opcode: Opcode) -> Option<&'static str> {");
        out.line(pad.shift(), "Some(match opcode {");
        for insn in insns {
            out.line(
                pad.shift().shift(),
                format_args!("opcode::{} => \"{}\",", const_name(insn.name()), insn.name()),
            );
        }
        out.line(pad.shift().shift(), "_ => return None,");
        out.line(pad.shift(), "})");
        out.line(pad, "}");
        out.blank();
    }

    fn gen_insn(&mut self) {
        let out = &mut self.out;
        let pad = Pad::default();
        out.line(pad, "#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]");
        out.line(pad, "pub struct Insn {");
        out.line(pad.shift(), "pub opcode: Opcode,");
        for role in [RegRole::Rd, RegRole::Rs1, RegRole::Rs2] {
            out.line(pad.shift(), format_args!("pub {}: u8,", role.name()));
        }
        out.line(pad.shift(), "pub imm: i32,");
        out.line(pad.shift(), format_args!("pub raw: {},", self.opts.insn_type));
        out.line(pad, "}");
        out.blank();
    }

    fn gen_imm(&mut self, format: &InstructionFormat) {
        let Some(imm) = format.imm() else {
            return;
        };
        let out = &mut self.out;
        let pad = Pad::default();
        let parts: Vec<_> = imm
            .parts()
            .iter()
            .map(|p| match p.pos {
                0 => format!("({} as u32)", extract(p.from, p.len())),
                pos => format!("(({} as u32) << {pos})", extract(p.from, p.len())),
            })
            .collect();

        out.line(pad, "#[inline]");
        out.line(
            pad,
            format_args!("fn imm_{}(insn: {}) -> i32 {{", format.name(), self.opts.insn_type),
        );
        out.line(pad.shift(), format_args!("let imm = {};", parts.join(" | ")));
        match format.sign_bit().map(|bit| 31 - bit) {
            Some(shift) if shift != 0 => {
                out.line(pad.shift(), format_args!("((imm << {shift}) as i32) >> {shift}"));
            }
            _ => out.line(pad.shift(), "imm as i32"),
        }
        out.line(pad, "}");
        out.blank();
    }

    fn gen_predicate(&mut self, insn: &InstructionInfo) {
        let out = &mut self.out;
        let pad = Pad::default();
        let format = insn.format();
        out.line(pad, "#[inline]");
        out.line(
            pad,
            format_args!("pub fn is_{}(insn: {}) -> bool {{", ident(insn.name()), self.opts.insn_type),
        );
        out.line(
            pad.shift(),
            format_args!("insn & {:#010x} == {:#010x}", format.mask(), format.bits()),
        );
        out.line(pad, "}");
        out.blank();
    }

    fn gen_leaf(&mut self, pad: Pad, insn: &InstructionInfo) {
        let out = &mut self.out;
        let format = insn.format();
        out.line(pad, format_args!("if is_{}(insn) {{", ident(insn.name())));
        let inner = pad.shift();
        out.line(inner, format_args!("out.opcode = opcode::{};", const_name(insn.name())));
        for role in [RegRole::Rd, RegRole::Rs1, RegRole::Rs2] {
            let field = format.regs().find(|(r, _)| *r == role).map(|(_, f)| f);
            match field.and_then(|f| f.parts().first()) {
                Some(p) => out.line(
                    inner,
                    format_args!("out.{} = {} as u8;", role.name(), extract(p.from, p.len())),
                ),
                None => out.line(inner, format_args!("out.{} = 0;", role.name())),
            }
        }
        match format.imm() {
            Some(_) => out.line(inner, format_args!("out.imm = imm_{}(insn);", format.name())),
            None => out.line(inner, "out.imm = 0;"),
        }
        out.line(inner, "return true;");
        out.line(pad, "}");
    }

    fn gen_node(&mut self, pad: Pad, node: &Node) {
        match node {
            Node::Leaf(insn) => self.gen_leaf(pad, insn),
            Node::Switch { from, len, arms } => {
                self.out.line(pad, format_args!("match {} {{", extract(*from, *len)));
                for (value, node) in arms {
                    self.out.line(pad.shift(), format_args!("{value:#x} => {{"));
                    self.gen_node(pad.shift().shift(), node);
                    self.out.line(pad.shift(), "}");
                }
                self.out.line(pad.shift(), "_ => {}");
                self.out.line(pad, "}");
            }
        }
    }

    fn gen_decode(&mut self, tree: Option<&Node>) {
        let pad = Pad::default();
        self.out.line(
            pad,
            format_args!("pub fn decode(insn: {}, out: &mut Insn) -> bool {{", self.opts.insn_type),
        );
        self.out.line(pad.shift(), "out.raw = insn;");
        if let Some(tree) = tree {
            self.gen_node(pad.shift(), tree);
        }
        self.out.line(pad.shift(), "out.opcode = opcode::INVALID;");
        self.out.line(pad.shift(), "false");
        self.out.line(pad, "}");
    }
}

/// Generate the decoder source for `catalog`.
pub fn generate(catalog: &Catalog, opts: &Options) -> Result<String, Error> {
    let mut insns: Vec<_> = catalog.iter().collect();
    insns.sort_by(|a, b| a.name().cmp(b.name()));

    let tree = match insns.is_empty() {
        true => None,
        false => Some(
            split(insns.clone(), &Level::ALL)
                .map_err(|e| Error::global(ErrorKind::Encoding(e)))?,
        ),
    };

    let mut layouts = BTreeMap::new();
    for insn in &insns {
        layouts.entry(insn.format().name()).or_insert(insn.format());
    }

    let mut gen = DecoderGen::new(opts);
    gen.gen_opcodes(&insns);
    gen.gen_insn();
    for format in layouts.values() {
        gen.gen_imm(format);
    }
    for insn in &insns {
        gen.gen_predicate(insn);
    }
    gen.gen_decode(tree.as_ref());

    debug!("decoder: {} instructions, {} immediate layouts", insns.len(), layouts.len());
    Ok(gen.out.into_string())
}
