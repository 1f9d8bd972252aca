use core::fmt;

use crate::scope::OpKind;

/// Failure to build the IR of an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticsError {
    /// A construct that the builder does not know how to lower.
    UnknownConstruct(&'static str),
    /// Operands of different widths where neither is a constant.
    TypeMismatch {
        op: OpKind,
        lhs: String,
        rhs: String,
    },
    /// Assignment to an immutable constant.
    ConstAssign(String),
    /// Reference to a field or variable that was never declared.
    Undeclared(String),
    /// Second declaration of a name in the same scope, or of `pc`/`imm`.
    Redeclared(String),
    /// Variable owned by a scope that is not visible from the use site.
    OutOfScope(String),
}

impl fmt::Display for SemanticsError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownConstruct(name) => write!(fmt, "unknown construct `{name}`"),
            Self::TypeMismatch { op, lhs, rhs } => {
                write!(fmt, "type mismatch in `{op}`: {lhs} and {rhs}")
            }
            Self::ConstAssign(name) => write!(fmt, "assignment to constant `{name}`"),
            Self::Undeclared(name) => write!(fmt, "undeclared field `{name}`"),
            Self::Redeclared(name) => write!(fmt, "`{name}` is already declared"),
            Self::OutOfScope(name) => write!(fmt, "variable `{name}` is out of scope"),
        }
    }
}

impl std::error::Error for SemanticsError {}

/// Invalid bit layout or ambiguous instruction dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodingError {
    /// Two fields of one format share a bit.
    Overlap {
        format: &'static str,
        first: &'static str,
        second: &'static str,
    },
    /// A field reaches past the instruction width.
    OutOfRange {
        format: &'static str,
        field: &'static str,
    },
    /// Instructions that cannot be told apart by their fixed fields.
    Collision(Vec<String>),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Overlap {
                format,
                first,
                second,
            } => write!(fmt, "fields `{first}` and `{second}` overlap in format {format}"),
            Self::OutOfRange { format, field } => {
                write!(fmt, "field `{field}` exceeds instruction width in format {format}")
            }
            Self::Collision(names) => {
                write!(fmt, "unresolved dispatch collision: {}", names.join(", "))
            }
        }
    }
}

impl std::error::Error for EncodingError {}

/// Statement that the executer generator cannot translate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodegenError {
    /// No rule in the translation table.
    NoRule(OpKind),
    /// Operands do not have the shape the rule expects.
    Operands(OpKind),
    /// IR type without a target representation.
    Type(u32),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoRule(kind) => write!(fmt, "no translation rule for `{kind}`"),
            Self::Operands(kind) => write!(fmt, "malformed operands for `{kind}`"),
            Self::Type(bits) => write!(fmt, "unsupported integer width {bits}"),
        }
    }
}

impl std::error::Error for CodegenError {}

#[derive(Debug)]
pub enum ErrorKind {
    Config(String),
    Semantics(SemanticsError),
    Encoding(EncodingError),
    Codegen(CodegenError),
}

#[derive(Debug)]
pub struct Error {
    insn: Option<String>,
    kind: ErrorKind,
}

impl Error {
    pub fn new<S: Into<String>>(insn: S, kind: ErrorKind) -> Self {
        Self {
            insn: Some(insn.into()),
            kind,
        }
    }

    pub fn global(kind: ErrorKind) -> Self {
        Self { insn: None, kind }
    }

    pub fn config<S: Into<String>, M: Into<String>>(insn: S, msg: M) -> Self {
        Self::new(insn, ErrorKind::Config(msg.into()))
    }

    pub fn insn(&self) -> Option<&str> {
        self.insn.as_deref()
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use ErrorKind as E;

        if let Some(insn) = &self.insn {
            write!(fmt, "instruction `{insn}`: ")?;
        }
        match &self.kind {
            E::Config(msg) => write!(fmt, "invalid description, {msg}"),
            E::Semantics(error) => write!(fmt, "semantics error, {error}"),
            E::Encoding(error) => write!(fmt, "encoding error, {error}"),
            E::Codegen(error) => write!(fmt, "codegen error, {error}"),
        }
    }
}

impl std::error::Error for Error {}
