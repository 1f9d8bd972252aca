//! Statement builder used by instruction semantics.
//!
//! Every construct appends exactly one statement to the current scope, plus
//! the declarations of the temporaries and constants it needs. A semantics
//! function for `add` looks like this:
//!
//! ```
//! # use isagen_core::{builder::Builder, error::SemanticsError};
//! fn add(b: &mut Builder) -> Result<(), SemanticsError> {
//!     let sum = b.add("rs1", "rs2")?;
//!     b.assign("rd", sum)
//! }
//! ```

use crate::{
    error::SemanticsError,
    field::InstructionFormat,
    scope::{Attrs, MemWidth, NameGen, OpKind, Operand, Scope, Sign, Stmt},
    value::{Arg, Constant, ScopeId, Type, Value, Var},
    Xlen,
};

pub type Semantics = fn(&mut Builder<'_>) -> Result<(), SemanticsError>;

pub struct Builder<'a> {
    names: &'a mut NameGen,
    xlen: Xlen,
    scope: Scope,
    outer: Vec<&'a Scope>,
    has_imm: bool,
}

impl<'a> Builder<'a> {
    pub fn new(names: &'a mut NameGen, xlen: Xlen) -> Self {
        let id = names.scope();
        Self {
            names,
            xlen,
            scope: Scope::new(id, None),
            outer: Vec::new(),
            has_imm: false,
        }
    }

    /// Allow `imm()`, for formats that carry an immediate field.
    pub fn with_imm(mut self, has_imm: bool) -> Self {
        self.has_imm = has_imm;
        self
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    pub fn reg_type(&self) -> Type {
        Type::Int(self.xlen.bits())
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn finish(self) -> Scope {
        self.scope
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.scope
            .lookup(name)
            .or_else(|| self.outer.iter().rev().find_map(|s| s.lookup(name)))
    }

    fn visible(&self, id: ScopeId) -> bool {
        self.scope.id() == id || self.outer.iter().any(|s| s.id() == id)
    }

    fn push(&mut self, kind: OpKind, operands: Vec<Operand>) {
        self.scope.push(Stmt::new(kind, operands));
    }

    /// Find a variable or constant by name in this scope or its parents.
    pub fn var(&self, name: &str) -> Result<Value, SemanticsError> {
        self.lookup(name)
            .ok_or_else(|| SemanticsError::Undeclared(name.to_owned()))
    }

    /// Declare a new variable in the current scope.
    ///
    /// Names already bound in this scope, and the names of the special
    /// registers `pc` and `imm`, are rejected.
    pub fn declare(&mut self, name: &str, ty: Type) -> Result<Var, SemanticsError> {
        if matches!(name, "pc" | "imm") {
            return Err(SemanticsError::Redeclared(name.to_owned()));
        }
        self.bind(name, ty)
    }

    fn bind(&mut self, name: &str, ty: Type) -> Result<Var, SemanticsError> {
        if self.scope.lookup(name).is_some() {
            return Err(SemanticsError::Redeclared(name.to_owned()));
        }
        let var = Var::new(name.to_owned(), ty, self.scope.id());
        self.scope.bind_var(var.clone());
        self.push(OpKind::NewVar, vec![Operand::Value(Value::Var(var.clone()))]);
        Ok(var)
    }

    fn tmp(&mut self, ty: Type) -> Result<Var, SemanticsError> {
        let name = self.names.tmp();
        self.bind(&name, ty)
    }

    pub fn constant(&mut self, value: i64) -> Constant {
        let c = Constant::new(self.names.constant(), value, self.scope.id());
        self.scope.bind_const(c.clone());
        self.push(OpKind::NewConst, vec![Operand::Value(Value::Const(c.clone()))]);
        c
    }

    /// Turn a builder argument into an IR value, literals become constants.
    pub fn resolve(&mut self, arg: impl Into<Arg>) -> Result<Value, SemanticsError> {
        match arg.into() {
            Arg::Name(name) => self.var(&name),
            Arg::Value(value) if self.visible(value.scope()) => Ok(value),
            Arg::Value(value) => Err(SemanticsError::OutOfScope(value.name().to_owned())),
            Arg::Literal(value) => Ok(Value::Const(self.constant(value))),
        }
    }

    pub fn assign(&mut self, dst: impl Into<Arg>, src: impl Into<Arg>) -> Result<(), SemanticsError> {
        let dst = match self.resolve(dst)? {
            Value::Var(var) => var,
            Value::Const(c) => return Err(SemanticsError::ConstAssign(c.name().to_owned())),
        };
        let src = self.resolve(src)?;
        if !dst.ty().compatible(src.ty()) {
            return Err(SemanticsError::TypeMismatch {
                op: OpKind::Let,
                lhs: Value::Var(dst).to_string(),
                rhs: src.to_string(),
            });
        }
        self.push(
            OpKind::Let,
            vec![Operand::Value(Value::Var(dst)), Operand::Value(src)],
        );
        Ok(())
    }

    /// `dst = a <kind> b` for any binary operation kind.
    pub fn binary(
        &mut self,
        kind: OpKind,
        a: impl Into<Arg>,
        b: impl Into<Arg>,
    ) -> Result<Var, SemanticsError> {
        if !kind.is_binary() {
            return Err(SemanticsError::UnknownConstruct(kind.name()));
        }
        let a = self.resolve(a)?;
        let b = self.resolve(b)?;
        if !a.ty().compatible(b.ty()) {
            return Err(SemanticsError::TypeMismatch {
                op: kind,
                lhs: a.to_string(),
                rhs: b.to_string(),
            });
        }
        let ty = match kind {
            OpKind::AddW | OpKind::SubW | OpKind::SllW | OpKind::SrlW | OpKind::SraW => {
                self.reg_type()
            }
            _ => [a.ty(), b.ty()]
                .into_iter()
                .find(|ty| !ty.is_const())
                .unwrap_or_else(|| self.reg_type()),
        };
        let dst = self.tmp(ty)?;
        self.push(
            kind,
            vec![
                Operand::Value(Value::Var(dst.clone())),
                Operand::Value(a),
                Operand::Value(b),
            ],
        );
        Ok(dst)
    }

    pub fn add(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Add, a, b)
    }

    pub fn sub(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Sub, a, b)
    }

    pub fn and(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::And, a, b)
    }

    pub fn or(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Or, a, b)
    }

    pub fn xor(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Xor, a, b)
    }

    pub fn shl(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Shl, a, b)
    }

    pub fn srl(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Srl, a, b)
    }

    pub fn sra(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Sra, a, b)
    }

    pub fn eq(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Eq, a, b)
    }

    pub fn ne(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Ne, a, b)
    }

    pub fn lt(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Lt, a, b)
    }

    pub fn gt(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Gt, a, b)
    }

    pub fn ltu(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Ltu, a, b)
    }

    pub fn gtu(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::Gtu, a, b)
    }

    /// `a >= b` as `(a < b) == 0`.
    pub fn ge(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        let lt = self.lt(a, b)?;
        self.eq(lt, 0)
    }

    /// Unsigned `a >= b` as `(a <u b) == 0`.
    pub fn geu(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        let lt = self.ltu(a, b)?;
        self.eq(lt, 0)
    }

    pub fn addw(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::AddW, a, b)
    }

    pub fn subw(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::SubW, a, b)
    }

    pub fn sllw(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::SllW, a, b)
    }

    pub fn srlw(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::SrlW, a, b)
    }

    pub fn sraw(&mut self, a: impl Into<Arg>, b: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.binary(OpKind::SraW, a, b)
    }

    fn mem_load(&mut self, addr: Arg, attrs: Option<Attrs>) -> Result<Var, SemanticsError> {
        let addr = self.resolve(addr)?;
        let dst = self.tmp(self.reg_type())?;
        let mut stmt = Stmt::new(
            OpKind::Load,
            vec![Operand::Value(Value::Var(dst.clone())), Operand::Value(addr)],
        );
        if let Some(attrs) = attrs {
            stmt = stmt.with_attrs(attrs);
        }
        self.scope.push(stmt);
        Ok(dst)
    }

    /// Load with the default word/signed access.
    pub fn load(&mut self, addr: impl Into<Arg>) -> Result<Var, SemanticsError> {
        self.mem_load(addr.into(), None)
    }

    pub fn load_as(
        &mut self,
        addr: impl Into<Arg>,
        width: MemWidth,
        sign: Sign,
    ) -> Result<Var, SemanticsError> {
        let attrs = Attrs {
            width: Some(width),
            sign: Some(sign),
        };
        self.mem_load(addr.into(), Some(attrs))
    }

    fn mem_store(&mut self, addr: Arg, src: Arg, attrs: Option<Attrs>) -> Result<(), SemanticsError> {
        let addr = self.resolve(addr)?;
        let src = self.resolve(src)?;
        let mut stmt = Stmt::new(
            OpKind::Store,
            vec![Operand::Value(addr), Operand::Value(src)],
        );
        if let Some(attrs) = attrs {
            stmt = stmt.with_attrs(attrs);
        }
        self.scope.push(stmt);
        Ok(())
    }

    /// Store with the default word access.
    pub fn store(&mut self, addr: impl Into<Arg>, src: impl Into<Arg>) -> Result<(), SemanticsError> {
        self.mem_store(addr.into(), src.into(), None)
    }

    pub fn store_as(
        &mut self,
        addr: impl Into<Arg>,
        src: impl Into<Arg>,
        width: MemWidth,
    ) -> Result<(), SemanticsError> {
        let attrs = Attrs {
            width: Some(width),
            sign: None,
        };
        self.mem_store(addr.into(), src.into(), Some(attrs))
    }

    /// Declare `name` and fetch it with `kind` unless a visible scope already did.
    fn special(&mut self, name: &str, kind: OpKind) -> Result<Var, SemanticsError> {
        if let Some(Value::Var(var)) = self.lookup(name) {
            return Ok(var);
        }
        let var = self.bind(name, self.reg_type())?;
        self.push(kind, vec![Operand::Value(Value::Var(var.clone()))]);
        Ok(var)
    }

    /// Address of the current instruction.
    pub fn pc(&mut self) -> Result<Var, SemanticsError> {
        self.special("pc", OpKind::GetPc)
    }

    /// Set the address of the next instruction.
    pub fn set_pc(&mut self, value: impl Into<Arg>) -> Result<(), SemanticsError> {
        let value = self.resolve(value)?;
        self.push(OpKind::SetPc, vec![Operand::Value(value)]);
        Ok(())
    }

    /// Decoded immediate, sign-extended to the register width.
    ///
    /// Fails with `Undeclared("imm")` if the format has no immediate field.
    pub fn imm(&mut self) -> Result<Var, SemanticsError> {
        if !self.has_imm {
            return Err(SemanticsError::Undeclared("imm".to_owned()));
        }
        self.special("imm", OpKind::GetImm)
    }

    /// Run `body` only when `cond` is non-zero.
    pub fn if_then<F>(&mut self, cond: impl Into<Arg>, body: F) -> Result<(), SemanticsError>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), SemanticsError>,
    {
        let cond = self.resolve(cond)?;
        let id = self.names.scope();
        let nested = {
            let mut outer: Vec<&Scope> = self.outer.iter().copied().collect();
            outer.push(&self.scope);
            let mut child = Builder {
                names: &mut *self.names,
                xlen: self.xlen,
                scope: Scope::new(id, Some(self.scope.id())),
                outer,
                has_imm: self.has_imm,
            };
            body(&mut child)?;
            child.scope
        };
        self.push(
            OpKind::If,
            vec![Operand::Value(cond), Operand::Scope(Box::new(nested))],
        );
        Ok(())
    }

    pub fn ecall(&mut self) {
        self.push(OpKind::Ecall, Vec::new());
    }

    pub fn ebreak(&mut self) {
        self.push(OpKind::Ebreak, Vec::new());
    }
}

/// Build the statement tree of one instruction.
pub fn build_scope<F>(
    names: &mut NameGen,
    xlen: Xlen,
    format: &InstructionFormat,
    semantics: F,
) -> Result<Scope, SemanticsError>
where
    F: FnOnce(&mut Builder<'_>) -> Result<(), SemanticsError>,
{
    let mut b = Builder::new(names, xlen).with_imm(format.imm().is_some());
    let reg = b.reg_type();

    let mut roles: Vec<_> = format.regs().map(|(role, _)| role).collect();
    roles.sort();

    for role in &roles {
        b.declare(role.name(), reg)?;
    }
    for role in roles.iter().filter(|r| r.is_source()) {
        let var = b.var(role.name())?;
        b.push(OpKind::ReadReg, vec![Operand::Value(var), Operand::Reg(*role)]);
    }

    semantics(&mut b)?;

    for role in roles.iter().filter(|r| !r.is_source()) {
        let var = b.var(role.name())?;
        b.push(OpKind::WriteReg, vec![Operand::Reg(*role), Operand::Value(var)]);
    }

    Ok(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{format_b, format_i_sys, format_r, format_s};

    fn kinds(scope: &Scope) -> Vec<OpKind> {
        scope.stmts().iter().map(|s| s.kind()).collect()
    }

    #[test]
    fn register_operands() {
        let mut names = NameGen::new();
        let scope = build_scope(&mut names, Xlen::X64, &format_r(0x33, 0, 0), |b| {
            let sum = b.add("rs1", "rs2")?;
            b.assign("rd", sum)
        })
        .unwrap();

        use OpKind as K;
        assert_eq!(
            kinds(&scope),
            [
                K::NewVar,
                K::NewVar,
                K::NewVar,
                K::ReadReg,
                K::ReadReg,
                K::NewVar,
                K::Add,
                K::Let,
                K::WriteReg,
            ]
        );
        let last = scope.stmts().last().unwrap();
        assert_eq!(last.reg(0), Some(crate::field::RegRole::Rd));
        assert_eq!(last.value(1).map(|v| v.name()), Some("rd"));
        assert_eq!(scope.var("rd").unwrap().ty(), Type::Int(64));
    }

    #[test]
    fn no_destination() {
        let mut names = NameGen::new();
        let scope = build_scope(&mut names, Xlen::X32, &format_s(0x23, 2), |b| {
            let imm = b.imm()?;
            let addr = b.add("rs1", imm)?;
            b.store_as(addr, "rs2", MemWidth::Word)
        })
        .unwrap();
        assert!(scope.stmts().iter().all(|s| s.kind() != OpKind::WriteReg));
        let store = scope.stmts().last().unwrap();
        assert_eq!(store.kind(), OpKind::Store);
        assert_eq!(store.attrs().map(|a| a.width()), Some(MemWidth::Word));
    }

    #[test]
    fn undeclared_field() {
        let mut names = NameGen::new();
        let err = build_scope(&mut names, Xlen::X64, &format_s(0x23, 0), |b| {
            b.assign("rd", "rs1")
        })
        .unwrap_err();
        assert_eq!(err, SemanticsError::Undeclared("rd".to_string()));
    }

    #[test]
    fn missing_immediate() {
        let mut names = NameGen::new();
        let err = build_scope(&mut names, Xlen::X64, &format_r(0x33, 0, 0), |b| {
            let imm = b.imm()?;
            let sum = b.add("rs1", imm)?;
            b.assign("rd", sum)
        })
        .unwrap_err();
        assert_eq!(err, SemanticsError::Undeclared("imm".to_string()));

        let err = build_scope(&mut names, Xlen::X64, &format_i_sys(0x73, 0, 0), |b| {
            b.if_then(1, |b| b.imm().map(drop))
        })
        .unwrap_err();
        assert_eq!(err, SemanticsError::Undeclared("imm".to_string()));

        let mut b = Builder::new(&mut names, Xlen::X64);
        assert!(b.imm().is_err());
        assert!(b.scope().stmts().is_empty());
    }

    #[test]
    fn redeclaration() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        b.declare("x", Type::Int(64)).unwrap();
        assert_eq!(
            b.declare("x", Type::Int(32)),
            Err(SemanticsError::Redeclared("x".to_string()))
        );
        assert_eq!(b.var("x").unwrap().ty(), Type::Int(64));
        assert_eq!(b.scope().stmts().len(), 1);

        let pc = b.pc().unwrap();
        assert!(matches!(b.declare("pc", Type::Int(64)), Err(SemanticsError::Redeclared(_))));
        assert!(matches!(b.declare("imm", Type::Int(64)), Err(SemanticsError::Redeclared(_))));
        assert_eq!(b.pc().unwrap(), pc);

        // a nested scope may shadow an outer name
        b.if_then(1, |b| b.declare("x", Type::Int(32)).map(drop))
            .unwrap();

        let err = build_scope(&mut names, Xlen::X64, &format_r(0x33, 0, 0), |b| {
            b.declare("rd", Type::Int(32)).map(drop)
        })
        .unwrap_err();
        assert_eq!(err, SemanticsError::Redeclared("rd".to_string()));
    }

    #[test]
    fn literals_become_constants() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        let x = b.declare("x", Type::Int(64)).unwrap();
        let y = b.add(&x, 4).unwrap();
        assert_eq!(y.ty(), Type::Int(64));
        let c = b.scope().stmts()[1].value(0).unwrap().clone();
        assert!(c.is_const());
        assert_eq!(b.scope().stmts()[1].kind(), OpKind::NewConst);
        let z = b.add(1, 2).unwrap();
        assert_eq!(z.ty(), Type::Int(64));
    }

    #[test]
    fn constant_assignment() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        let c = b.constant(7);
        let err = b.assign(&c, 1).unwrap_err();
        assert!(matches!(err, SemanticsError::ConstAssign(ref name) if name == c.name()));
        assert!(matches!(
            b.assign(5, 1),
            Err(SemanticsError::ConstAssign(_))
        ));
        assert!(b.scope().stmts().iter().all(|s| s.kind() != OpKind::Let));
    }

    #[test]
    fn width_mismatch() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        let wide = b.declare("wide", Type::Int(64)).unwrap();
        let narrow = b.declare("narrow", Type::Int(32)).unwrap();
        for kind in [OpKind::Add, OpKind::Sub, OpKind::Ltu, OpKind::Sra, OpKind::AddW] {
            let err = b.binary(kind, &wide, &narrow).unwrap_err();
            assert!(matches!(err, SemanticsError::TypeMismatch { op, .. } if op == kind));
        }
        assert!(b.add(&narrow, 3).is_ok());
        assert!(matches!(
            b.assign(&wide, &narrow),
            Err(SemanticsError::TypeMismatch { op: OpKind::Let, .. })
        ));
    }

    #[test]
    fn unknown_construct() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        let err = b.binary(OpKind::Load, 1, 2).unwrap_err();
        assert_eq!(err, SemanticsError::UnknownConstruct("load"));
    }

    #[test]
    fn conditional_is_nested() {
        let mut names = NameGen::new();
        let scope = build_scope(&mut names, Xlen::X64, &format_b(0x63, 0), |b| {
            let cond = b.eq("rs1", "rs2")?;
            b.if_then(cond, |b| {
                let pc = b.pc()?;
                let imm = b.imm()?;
                let target = b.add(pc, imm)?;
                b.set_pc(target)
            })
        })
        .unwrap();

        let stmt = scope.stmts().last().unwrap();
        assert_eq!(stmt.kind(), OpKind::If);
        let body = stmt.scope(1).unwrap();
        assert_eq!(body.parent(), Some(scope.id()));
        assert_eq!(body.stmts().last().unwrap().kind(), OpKind::SetPc);
        assert!(scope
            .stmts()
            .iter()
            .all(|s| !matches!(s.kind(), OpKind::SetPc | OpKind::GetPc)));
        assert!(scope.var("pc").is_none());
        assert!(body.var("pc").is_some());
    }

    #[test]
    fn nested_values_do_not_escape() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        let mut inner = None;
        b.if_then(1, |b| {
            inner = Some(b.add(1, 2)?);
            Ok(())
        })
        .unwrap();
        let err = b.add(inner.unwrap(), 1).unwrap_err();
        assert!(matches!(err, SemanticsError::OutOfScope(_)));
    }

    #[test]
    fn pc_is_fetched_once() {
        let mut names = NameGen::new();
        let mut b = Builder::new(&mut names, Xlen::X64);
        let pc = b.pc().unwrap();
        b.if_then(1, |b| {
            let again = b.pc()?;
            assert_eq!(again.scope(), pc.scope());
            Ok(())
        })
        .unwrap();
        let fetches = b
            .scope()
            .stmts()
            .iter()
            .filter(|s| s.kind() == OpKind::GetPc)
            .count();
        assert_eq!(fetches, 1);
    }
}
