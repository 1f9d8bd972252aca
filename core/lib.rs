#[macro_use]
extern crate log;

pub mod builder;
pub mod catalog;
pub mod error;
pub mod field;
pub mod scope;
pub mod utils;
pub mod value;

use core::{fmt, str::FromStr};

pub use crate::{
    builder::{Builder, Semantics},
    catalog::{build_catalog, Catalog, Context, InsnDesc, InstructionInfo},
    error::{Error, ErrorKind},
};

/// Width of the integer register file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Xlen {
    X32,
    #[default]
    X64,
}

impl Xlen {
    pub fn bits(self) -> u32 {
        match self {
            Self::X32 => 32,
            Self::X64 => 64,
        }
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "rv{}", self.bits())
    }
}

impl FromStr for Xlen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "32" | "rv32" => Ok(Self::X32),
            "64" | "rv64" => Ok(Self::X64),
            _ => Err(format!("invalid register width `{s}`, expected 32 or 64")),
        }
    }
}
