use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Fixed-width integer.
    Int(u32),
    /// Immediate constant, fits any integer width.
    Iconst,
}

impl Type {
    pub fn is_const(self) -> bool {
        self == Self::Iconst
    }

    /// Width rule shared by binary operations and assignment.
    pub fn compatible(self, other: Type) -> bool {
        self == other || self.is_const() || other.is_const()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(bits) => write!(fmt, "i{bits}"),
            Self::Iconst => fmt.write_str("iconst"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

/// Mutable binding target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Var {
    name: String,
    ty: Type,
    scope: ScopeId,
}

impl Var {
    pub(crate) fn new(name: String, ty: Type, scope: ScopeId) -> Self {
        Self { name, ty, scope }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

/// Immutable literal bound to a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constant {
    name: String,
    value: i64,
    scope: ScopeId,
}

impl Constant {
    pub(crate) fn new(name: String, value: i64, scope: ScopeId) -> Self {
        Self { name, value, scope }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn ty(&self) -> Type {
        Type::Iconst
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Var(Var),
    Const(Constant),
}

impl Value {
    pub fn name(&self) -> &str {
        match self {
            Self::Var(var) => var.name(),
            Self::Const(c) => c.name(),
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            Self::Var(var) => var.ty(),
            Self::Const(c) => c.ty(),
        }
    }

    pub fn scope(&self) -> ScopeId {
        match self {
            Self::Var(var) => var.scope(),
            Self::Const(c) => c.scope(),
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Self::Const(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Var(var) => write!(fmt, "{}:{}", var.name, var.ty),
            Self::Const(c) => write!(fmt, "{}={}", c.name, c.value),
        }
    }
}

impl From<Var> for Value {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Self::Const(c)
    }
}

/// Operand as passed to a builder call.
///
/// Literals become constants and names are looked up when the statement is
/// built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Name(String),
    Value(Value),
    Literal(i64),
}

impl From<&str> for Arg {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&Value> for Arg {
    fn from(value: &Value) -> Self {
        Self::Value(value.clone())
    }
}

impl From<Var> for Arg {
    fn from(var: Var) -> Self {
        Self::Value(Value::Var(var))
    }
}

impl From<&Var> for Arg {
    fn from(var: &Var) -> Self {
        Self::Value(Value::Var(var.clone()))
    }
}

impl From<Constant> for Arg {
    fn from(c: Constant) -> Self {
        Self::Value(Value::Const(c))
    }
}

impl From<&Constant> for Arg {
    fn from(c: &Constant) -> Self {
        Self::Value(Value::Const(c.clone()))
    }
}

macro_rules! impl_literal {
    ($($ty:ty),+ $(,)?) => {
        $(impl From<$ty> for Arg {
            fn from(value: $ty) -> Self {
                Self::Literal(value as i64)
            }
        })+
    };
}

impl_literal!(i32, i64, u32);
