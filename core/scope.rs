//! Statement tree.

use core::fmt;
use std::collections::HashMap;

use crate::{
    field::RegRole,
    value::{Constant, ScopeId, Value, Var},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    NewVar,
    NewConst,
    Let,

    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Srl,
    Sra,
    Eq,
    Ne,
    Lt,
    Gt,
    Ltu,
    Gtu,

    AddW,
    SubW,
    SllW,
    SrlW,
    SraW,

    Load,
    Store,
    ReadReg,
    WriteReg,
    GetPc,
    SetPc,
    GetImm,
    If,
    Ecall,
    Ebreak,
}

impl OpKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::NewVar => "new_var",
            Self::NewConst => "new_const",
            Self::Let => "let",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Shl => "shl",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Ltu => "ltu",
            Self::Gtu => "gtu",
            Self::AddW => "addw",
            Self::SubW => "subw",
            Self::SllW => "sllw",
            Self::SrlW => "srlw",
            Self::SraW => "sraw",
            Self::Load => "load",
            Self::Store => "store",
            Self::ReadReg => "getreg",
            Self::WriteReg => "setreg",
            Self::GetPc => "getpc",
            Self::SetPc => "setpc",
            Self::GetImm => "getimm",
            Self::If => "if",
            Self::Ecall => "ecall",
            Self::Ebreak => "ebreak",
        }
    }

    /// `dst = a op b` statements.
    pub fn is_binary(self) -> bool {
        use OpKind as K;

        matches!(
            self,
            K::Add
                | K::Sub
                | K::And
                | K::Or
                | K::Xor
                | K::Shl
                | K::Srl
                | K::Sra
                | K::Eq
                | K::Ne
                | K::Lt
                | K::Gt
                | K::Ltu
                | K::Gtu
                | K::AddW
                | K::SubW
                | K::SllW
                | K::SrlW
                | K::SraW
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemWidth {
    Byte,
    Half,
    Word,
    Double,
}

impl MemWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Signed,
    Unsigned,
}

/// Memory access attributes, absent entries fall back to word/signed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Attrs {
    pub width: Option<MemWidth>,
    pub sign: Option<Sign>,
}

impl Attrs {
    pub fn width(&self) -> MemWidth {
        self.width.unwrap_or(MemWidth::Word)
    }

    pub fn sign(&self) -> Sign {
        self.sign.unwrap_or(Sign::Signed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Value(Value),
    Reg(RegRole),
    Scope(Box<Scope>),
}

impl fmt::Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Value(value) => value.fmt(fmt),
            Self::Reg(role) => write!(fmt, "x[{}]", role.name()),
            Self::Scope(scope) => scope.id().fmt(fmt),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    kind: OpKind,
    operands: Vec<Operand>,
    attrs: Option<Attrs>,
}

impl Stmt {
    pub fn new(kind: OpKind, operands: Vec<Operand>) -> Self {
        Self {
            kind,
            operands,
            attrs: None,
        }
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        self.attrs.as_ref()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.operands.get(index) {
            Some(Operand::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn reg(&self, index: usize) -> Option<RegRole> {
        match self.operands.get(index) {
            Some(Operand::Reg(role)) => Some(*role),
            _ => None,
        }
    }

    pub fn scope(&self, index: usize) -> Option<&Scope> {
        match self.operands.get(index) {
            Some(Operand::Scope(scope)) => Some(scope),
            _ => None,
        }
    }
}

/// Ordered statements plus the names declared in them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    id: ScopeId,
    parent: Option<ScopeId>,
    tree: Vec<Stmt>,
    vars: HashMap<String, Var>,
    consts: HashMap<String, Constant>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            parent,
            tree: Vec::new(),
            vars: HashMap::new(),
            consts: HashMap::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.tree
    }

    pub fn var(&self, name: &str) -> Option<&Var> {
        self.vars.get(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(var) = self.vars.get(name) {
            return Some(Value::Var(var.clone()));
        }
        self.consts.get(name).cloned().map(Value::Const)
    }

    /// Number of statements including nested scopes.
    pub fn len(&self) -> usize {
        self.tree
            .iter()
            .map(|stmt| 1 + stmt.scope(1).map_or(0, |s| s.len()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub(crate) fn push(&mut self, stmt: Stmt) {
        self.tree.push(stmt);
    }

    pub(crate) fn bind_var(&mut self, var: Var) {
        self.vars.insert(var.name().to_owned(), var);
    }

    pub(crate) fn bind_const(&mut self, c: Constant) {
        self.consts.insert(c.name().to_owned(), c);
    }

    fn fmt_depth(&self, fmt: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        for stmt in &self.tree {
            write!(fmt, "{:width$}{}", "", stmt.kind, width = depth * 4)?;
            if let Some(attrs) = &stmt.attrs {
                write!(fmt, ".{:?}.{:?}", attrs.width(), attrs.sign())?;
            }
            for (i, operand) in stmt.operands.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                write!(fmt, "{sep}{operand}")?;
            }
            writeln!(fmt)?;
            if let Some(scope) = stmt.scope(1) {
                scope.fmt_depth(fmt, depth + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_depth(fmt, 0)
    }
}

/// Run-wide source of unique names and scope ids.
#[derive(Debug, Default)]
pub struct NameGen {
    counter: u64,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        let n = self.counter;
        self.counter += 1;
        n
    }

    pub fn tmp(&mut self) -> String {
        format!("_tmp{}", self.next())
    }

    pub fn constant(&mut self) -> String {
        format!("const_{}", self.next())
    }

    pub fn scope(&mut self) -> ScopeId {
        ScopeId(self.next())
    }
}
