//! Executer generator.
//!
//! Every statement is translated by the rule registered for its kind in a
//! [`Table`]. Wider register files start from [`Table::base`] and add the
//! rules of the truncated 32-bit operations.

use std::collections::HashMap;

use isagen_core::{
    catalog::{Catalog, InstructionInfo},
    error::{CodegenError, Error, ErrorKind},
    field::RegRole,
    scope::{OpKind, Scope, Sign, Stmt},
    value::{Type, Value},
    Xlen,
};

use crate::{
    decoder::{const_name, ident},
    pad::{Pad, Source},
    Options,
};

pub type Rule = fn(&mut Translator<'_>, Pad, &Stmt) -> Result<(), CodegenError>;

/// Operation kind to translation rule.
#[derive(Clone, Default)]
pub struct Table {
    rules: HashMap<OpKind, Rule>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rules for every operation kind except the truncated 32-bit ones.
    pub fn base() -> Self {
        use OpKind as K;

        let mut table = Self::empty();
        let rules: &[(OpKind, Rule)] = &[
            (K::NewVar, rule_new_var),
            (K::NewConst, rule_new_const),
            (K::Let, rule_let),
            (K::Add, rule_add),
            (K::Sub, rule_sub),
            (K::And, rule_and),
            (K::Or, rule_or),
            (K::Xor, rule_xor),
            (K::Shl, rule_shl),
            (K::Srl, rule_srl),
            (K::Sra, rule_sra),
            (K::Eq, rule_eq),
            (K::Ne, rule_ne),
            (K::Lt, rule_lt),
            (K::Gt, rule_gt),
            (K::Ltu, rule_ltu),
            (K::Gtu, rule_gtu),
            (K::Load, rule_load),
            (K::Store, rule_store),
            (K::ReadReg, rule_read_reg),
            (K::WriteReg, rule_write_reg),
            (K::GetPc, rule_get_pc),
            (K::SetPc, rule_set_pc),
            (K::GetImm, rule_get_imm),
            (K::If, rule_if),
            (K::Ecall, rule_ecall),
            (K::Ebreak, rule_ebreak),
        ];
        for &(kind, rule) in rules {
            table.insert(kind, rule);
        }
        table
    }

    /// Base rules plus the truncated 32-bit operations of a 64-bit register file.
    pub fn rv64() -> Self {
        let mut table = Self::base();
        table.insert(OpKind::AddW, rule_addw);
        table.insert(OpKind::SubW, rule_subw);
        table.insert(OpKind::SllW, rule_sllw);
        table.insert(OpKind::SrlW, rule_srlw);
        table.insert(OpKind::SraW, rule_sraw);
        table
    }

    pub fn for_xlen(xlen: Xlen) -> Self {
        match xlen {
            Xlen::X32 => Self::base(),
            Xlen::X64 => Self::rv64(),
        }
    }

    /// Add or replace the rule for `kind`, returning the previous one.
    pub fn insert(&mut self, kind: OpKind, rule: Rule) -> Option<Rule> {
        self.rules.insert(kind, rule)
    }

    pub fn remove(&mut self, kind: OpKind) -> Option<Rule> {
        self.rules.remove(&kind)
    }

    pub fn get(&self, kind: OpKind) -> Option<Rule> {
        self.rules.get(&kind).copied()
    }

    pub fn contains(&self, kind: OpKind) -> bool {
        self.rules.contains_key(&kind)
    }
}

/// Code emission state for one instruction.
pub struct Translator<'a> {
    table: &'a Table,
    xlen: Xlen,
    out: Source,
}

impl<'a> Translator<'a> {
    pub fn new(table: &'a Table, xlen: Xlen) -> Self {
        Self {
            table,
            xlen,
            out: Source::new(),
        }
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// Unsigned Rust type of the register file.
    pub fn reg_type(&self) -> String {
        format!("u{}", self.xlen.bits())
    }

    /// Signed Rust type of the register file.
    pub fn signed_reg_type(&self) -> String {
        format!("i{}", self.xlen.bits())
    }

    /// Width in bits of the Rust integer type for `ty`.
    pub fn bits(&self, ty: Type) -> Result<u32, CodegenError> {
        match ty {
            Type::Int(bits @ (8 | 16 | 32 | 64)) => Ok(bits),
            Type::Int(bits) => Err(CodegenError::Type(bits)),
            Type::Iconst => Ok(64),
        }
    }

    /// Render `value` as an expression of type `ty`.
    pub fn value(&self, value: &Value, ty: &str) -> String {
        match value {
            Value::Var(var) => var.name().to_owned(),
            Value::Const(c) => format!("({} as {ty})", c.name()),
        }
    }

    pub fn line(&mut self, pad: Pad, line: impl core::fmt::Display) {
        self.out.line(pad, line);
    }

    pub fn stmt(&mut self, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
        let rule = self
            .table
            .get(stmt.kind())
            .ok_or(CodegenError::NoRule(stmt.kind()))?;
        rule(self, pad, stmt)
    }

    pub fn scope(&mut self, pad: Pad, scope: &Scope) -> Result<(), CodegenError> {
        for stmt in scope.stmts() {
            self.stmt(pad, stmt)?;
        }
        Ok(())
    }

    pub fn into_source(self) -> Source {
        self.out
    }
}

/// Value operands of `stmt`, exactly `N` of them.
pub fn values<const N: usize>(stmt: &Stmt) -> Result<[&Value; N], CodegenError> {
    let values: Option<Vec<&Value>> = (0..stmt.operands().len()).map(|i| stmt.value(i)).collect();
    values
        .and_then(|v| v.try_into().ok())
        .ok_or(CodegenError::Operands(stmt.kind()))
}

fn rule_new_var(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [var] = values(stmt)?;
    let bits = t.bits(var.ty())?;
    if var.is_const() {
        return Err(CodegenError::Operands(stmt.kind()));
    }
    t.line(pad, format_args!("let mut {}: u{bits} = 0;", var.name()));
    Ok(())
}

fn rule_new_const(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    match values(stmt)? {
        [Value::Const(c)] => {
            t.line(pad, format_args!("let {}: i64 = {};", c.name(), c.value()));
            Ok(())
        }
        _ => Err(CodegenError::Operands(stmt.kind())),
    }
}

fn rule_let(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [dst, src] = values(stmt)?;
    let ty = format!("u{}", t.bits(dst.ty())?);
    let src = t.value(src, &ty);
    t.line(pad, format_args!("{} = {src};", dst.name()));
    Ok(())
}

macro_rules! binary_rules {
    ($($name:ident => |$a:ident, $b:ident, $u:ident, $s:ident| $expr:expr;)+) => {
        $(
            #[allow(unused_variables)]
            fn $name(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
                let [dst, lhs, rhs] = values(stmt)?;
                let bits = t.bits(dst.ty())?;
                let $u = format!("u{bits}");
                let $s = format!("i{bits}");
                let $a = t.value(lhs, &$u);
                let $b = t.value(rhs, &$u);
                let expr: String = $expr;
                t.line(pad, format_args!("{} = {};", dst.name(), expr));
                Ok(())
            }
        )+
    };
}

binary_rules! {
    rule_add => |a, b, u, s| format!("{}.wrapping_add({})", a, b);
    rule_sub => |a, b, u, s| format!("{}.wrapping_sub({})", a, b);
    rule_and => |a, b, u, s| format!("{} & {}", a, b);
    rule_or => |a, b, u, s| format!("{} | {}", a, b);
    rule_xor => |a, b, u, s| format!("{} ^ {}", a, b);
    rule_shl => |a, b, u, s| format!("{}.wrapping_shl({} as u32)", a, b);
    rule_srl => |a, b, u, s| format!("{}.wrapping_shr({} as u32)", a, b);
    rule_sra => |a, b, u, s| format!("({} as {}).wrapping_shr({} as u32) as {}", a, s, b, u);
    rule_eq => |a, b, u, s| format!("({} == {}) as {}", a, b, u);
    rule_ne => |a, b, u, s| format!("({} != {}) as {}", a, b, u);
    rule_lt => |a, b, u, s| format!("(({} as {}) < ({} as {})) as {}", a, s, b, s, u);
    rule_gt => |a, b, u, s| format!("(({} as {}) > ({} as {})) as {}", a, s, b, s, u);
    rule_ltu => |a, b, u, s| format!("({} < {}) as {}", a, b, u);
    rule_gtu => |a, b, u, s| format!("({} > {}) as {}", a, b, u);

    // truncate to 32 bits, operate, extend back to the register width
    rule_addw => |a, b, u, s| format!("({} as u32 as i32).wrapping_add({} as u32 as i32) as i64 as {}", a, b, u);
    rule_subw => |a, b, u, s| format!("({} as u32 as i32).wrapping_sub({} as u32 as i32) as i64 as {}", a, b, u);
    rule_sllw => |a, b, u, s| format!("({} as u32).wrapping_shl({} as u32) as {}", a, b, u);
    rule_srlw => |a, b, u, s| format!("({} as u32).wrapping_shr({} as u32) as {}", a, b, u);
    rule_sraw => |a, b, u, s| format!("({} as u32 as i32).wrapping_shr({} as u32) as i64 as {}", a, b, u);
}

fn rule_load(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [dst, addr] = values(stmt)?;
    let attrs = stmt.attrs().copied().unwrap_or_default();
    let (width, xlen) = (attrs.width().bits(), t.xlen().bits());
    let reg = t.reg_type();
    let addr = t.value(addr, &reg);

    let mut expr = format!("hart.load({addr}, {})", attrs.width().bytes());
    match attrs.sign() {
        Sign::Unsigned => {
            expr.push_str(&format!(" as u{width}"));
            if width != xlen {
                expr.push_str(&format!(" as {reg}"));
            }
        }
        Sign::Signed => {
            expr.push_str(&format!(" as i{width}"));
            if width != xlen {
                expr.push_str(&format!(" as {}", t.signed_reg_type()));
            }
            expr.push_str(&format!(" as {reg}"));
        }
    }
    t.line(pad, format_args!("{} = {expr};", dst.name()));
    Ok(())
}

fn rule_store(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [addr, src] = values(stmt)?;
    let size = stmt.attrs().copied().unwrap_or_default().width().bytes();
    let reg = t.reg_type();
    let addr = t.value(addr, &reg);
    let src = t.value(src, &reg);
    t.line(pad, format_args!("hart.store({addr}, {src}, {size});"));
    Ok(())
}

fn rule_read_reg(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    match (stmt.value(0), stmt.reg(1)) {
        (Some(Value::Var(var)), Some(role)) => {
            t.line(pad, format_args!("{} = hart.reg(insn.{});", var.name(), role.name()));
            Ok(())
        }
        _ => Err(CodegenError::Operands(stmt.kind())),
    }
}

fn rule_write_reg(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    match (stmt.reg(0), stmt.value(1)) {
        (Some(role @ RegRole::Rd), Some(value)) => {
            let value = t.value(value, &t.reg_type());
            t.line(pad, format_args!("hart.set_reg(insn.{}, {value});", role.name()));
            Ok(())
        }
        _ => Err(CodegenError::Operands(stmt.kind())),
    }
}

fn rule_get_pc(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [pc] = values(stmt)?;
    t.line(pad, format_args!("{} = hart.pc();", pc.name()));
    Ok(())
}

fn rule_set_pc(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [target] = values(stmt)?;
    let target = t.value(target, &t.reg_type());
    t.line(pad, format_args!("hart.set_pc({target});"));
    Ok(())
}

fn rule_get_imm(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let [imm] = values(stmt)?;
    // insn.imm is an i32, widening to 64 bits must sign-extend
    let conv = match t.xlen() {
        Xlen::X32 => "as u32",
        Xlen::X64 => "as i64 as u64",
    };
    t.line(pad, format_args!("{} = insn.imm {conv};", imm.name()));
    Ok(())
}

fn rule_if(t: &mut Translator<'_>, pad: Pad, stmt: &Stmt) -> Result<(), CodegenError> {
    let (Some(cond), Some(body)) = (stmt.value(0), stmt.scope(1)) else {
        return Err(CodegenError::Operands(stmt.kind()));
    };
    let cond = t.value(cond, &t.reg_type());
    t.line(pad, format_args!("if {cond} != 0 {{"));
    t.scope(pad.shift(), body)?;
    t.line(pad, "}");
    Ok(())
}

fn rule_ecall(t: &mut Translator<'_>, pad: Pad, _: &Stmt) -> Result<(), CodegenError> {
    t.line(pad, "hart.system_call();");
    Ok(())
}

fn rule_ebreak(t: &mut Translator<'_>, pad: Pad, _: &Stmt) -> Result<(), CodegenError> {
    t.line(pad, "hart.breakpoint();");
    Ok(())
}

struct ExecuterGen<'a> {
    opts: &'a Options,
    table: &'a Table,
    xlen: Xlen,
    out: Source,
}

impl<'a> ExecuterGen<'a> {
    fn gen_header(&mut self) {
        let out = &mut self.out;
        let pad = Pad::default();
        let reg = format!("u{}", self.xlen.bits());
        out.line(pad, format_args!("use {}::{{opcode, Insn}};", self.opts.decoder_module));
        out.blank();
        out.line(pad, "pub trait Hart {");
        let pad = pad.shift();
        out.line(pad, format_args!("fn reg(&self, index: u8) -> {reg};"));
        out.line(pad, format_args!("fn set_reg(&mut self, index: u8, value: {reg});"));
        out.line(pad, format_args!("fn pc(&self) -> {reg};"));
        out.blank();
        out.line(pad, "/// Set the address of the next instruction.");
        out.line(pad, format_args!("fn set_pc(&mut self, value: {reg});"));
        out.blank();
        out.line(pad, format_args!("fn load(&mut self, address: {reg}, size: usize) -> u64;"));
        out.line(pad, format_args!("fn store(&mut self, address: {reg}, value: {reg}, size: usize);"));
        out.line(pad, "fn system_call(&mut self);");
        out.line(pad, "fn breakpoint(&mut self);");
        out.line(Pad::default(), "}");
        out.blank();
    }

    fn gen_insn(&mut self, insn: &InstructionInfo) -> Result<(), CodegenError> {
        let pad = Pad::default();
        let mut t = Translator::new(self.table, self.xlen);
        t.line(pad, "#[allow(unused_mut, unused_variables, unused_assignments, unused_parens)]");
        t.line(
            pad,
            format_args!("pub fn exec_{}<H: Hart>(hart: &mut H, insn: &Insn) {{", ident(insn.name())),
        );
        t.scope(pad.shift(), insn.scope())?;
        t.line(pad, "}");
        self.out.append(t.into_source());
        self.out.blank();
        Ok(())
    }

    fn gen_execute(&mut self, insns: &[&InstructionInfo]) {
        let out = &mut self.out;
        let pad = Pad::default();
        out.line(pad, "pub fn execute<H: Hart>(hart: &mut H, insn: &Insn) -> bool {");
        out.line(pad.shift(), "match insn.opcode {");
        for insn in insns {
            out.line(
                pad.shift().shift(),
                format_args!(
                    "opcode::{} => exec_{}(hart, insn),",
                    const_name(insn.name()),
                    ident(insn.name())
                ),
            );
        }
        out.line(pad.shift().shift(), "_ => return false,");
        out.line(pad.shift(), "}");
        out.line(pad.shift(), "true");
        out.line(pad, "}");
    }
}

/// Generate the executer source for `catalog` with the rules of `table`.
pub fn generate(catalog: &Catalog, table: &Table, opts: &Options) -> Result<String, Error> {
    let mut insns: Vec<_> = catalog.iter().collect();
    insns.sort_by(|a, b| a.name().cmp(b.name()));

    let mut gen = ExecuterGen {
        opts,
        table,
        xlen: catalog.xlen(),
        out: Source::new(),
    };
    gen.gen_header();
    for insn in &insns {
        gen.gen_insn(insn)
            .map_err(|e| Error::new(insn.name(), ErrorKind::Codegen(e)))?;
    }
    gen.gen_execute(&insns);

    debug!("executer: {} instructions for {}", insns.len(), catalog.xlen());
    Ok(gen.out.into_string())
}
