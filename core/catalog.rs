//! ISA description entries and the catalog of built instructions.

use core::fmt;

use crate::{
    builder::{build_scope, Builder, Semantics},
    error::{Error, ErrorKind, SemanticsError},
    field::{self, FormatTag, InstructionFormat},
    scope::{NameGen, Scope},
    Xlen,
};

/// One instruction of an ISA description.
#[derive(Copy, Clone)]
pub struct InsnDesc {
    pub name: &'static str,
    pub format: FormatTag,
    pub opcode: u32,
    pub funct3: Option<u32>,
    pub funct7: Option<u32>,
    pub funct6: Option<u32>,
    pub funct12: Option<u32>,
    pub semantics: Semantics,
}

impl InsnDesc {
    fn check(&self, field: &str, value: Option<u32>, bits: u32) -> Result<(), Error> {
        match value {
            Some(value) if value >> bits != 0 => Err(Error::config(
                self.name,
                format!("{field} value {value:#x} does not fit in {bits} bits"),
            )),
            _ => Ok(()),
        }
    }

    /// Pick the field layout for this entry.
    pub fn layout(&self) -> Result<InstructionFormat, Error> {
        use FormatTag as F;

        self.check("opcode", Some(self.opcode), 7)?;
        self.check("funct3", self.funct3, 3)?;
        self.check("funct7", self.funct7, 7)?;
        self.check("funct6", self.funct6, 6)?;
        self.check("funct12", self.funct12, 12)?;

        let op = self.opcode;
        let format = match (self.format, self.funct3, self.funct7, self.funct6, self.funct12) {
            (F::R, Some(f3), Some(f7), None, None) => field::format_r(op, f3, f7),
            (F::I, Some(f3), None, None, None) => field::format_i(op, f3),
            (F::I, Some(f3), Some(f7), None, None) => field::format_i_shamt5(op, f3, f7),
            (F::I, Some(f3), None, Some(f6), None) => field::format_i_shamt6(op, f3, f6),
            (F::I, Some(f3), None, None, Some(f12)) => field::format_i_sys(op, f3, f12),
            (F::S, Some(f3), None, None, None) => field::format_s(op, f3),
            (F::B, Some(f3), None, None, None) => field::format_b(op, f3),
            (F::U, None, None, None, None) => field::format_u(op),
            (F::J, None, None, None, None) => field::format_j(op),
            (tag, ..) => {
                return Err(Error::config(
                    self.name,
                    format!("unsupported function fields for format {tag}"),
                ))
            }
        };
        format
            .validate()
            .map_err(|e| Error::new(self.name, ErrorKind::Encoding(e)))?;
        Ok(format)
    }
}

/// Built instruction, read-only once in the catalog.
#[derive(Clone, Debug)]
pub struct InstructionInfo {
    name: String,
    format: InstructionFormat,
    scope: Scope,
}

impl InstructionInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &InstructionFormat {
        &self.format
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl fmt::Display for InstructionInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "{} ({}):", self.name, self.format.name())?;
        self.scope.fmt(fmt)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    xlen: Xlen,
    insns: Vec<InstructionInfo>,
}

impl Catalog {
    pub fn new(xlen: Xlen) -> Self {
        Self {
            xlen,
            insns: Vec::new(),
        }
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionInfo> {
        self.insns.iter()
    }

    pub fn get(&self, name: &str) -> Option<&InstructionInfo> {
        self.insns.iter().find(|i| i.name == name)
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a InstructionInfo;
    type IntoIter = core::slice::Iter<'a, InstructionInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.insns.iter()
    }
}

/// State of one generation run: the name counter and the catalog.
#[derive(Debug, Default)]
pub struct Context {
    names: NameGen,
    catalog: Catalog,
}

impl Context {
    pub fn new(xlen: Xlen) -> Self {
        Self {
            names: NameGen::new(),
            catalog: Catalog::new(xlen),
        }
    }

    pub fn xlen(&self) -> Xlen {
        self.catalog.xlen
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    /// Build an instruction from a format and semantics and add it to the catalog.
    pub fn build<F>(
        &mut self,
        name: &str,
        format: InstructionFormat,
        semantics: F,
    ) -> Result<&InstructionInfo, Error>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), SemanticsError>,
    {
        if self.catalog.get(name).is_some() {
            return Err(Error::config(name, "duplicated instruction name"));
        }
        let xlen = self.catalog.xlen;
        let scope = build_scope(&mut self.names, xlen, &format, semantics)
            .map_err(|e| Error::new(name, ErrorKind::Semantics(e)))?;

        debug!("{name}: {} format, {} statements", format.name(), scope.len());
        trace!("{name}:\n{scope}");

        self.catalog.insns.push(InstructionInfo {
            name: name.to_owned(),
            format,
            scope,
        });
        Ok(&self.catalog.insns[self.catalog.insns.len() - 1])
    }

    pub fn add(&mut self, desc: &InsnDesc) -> Result<&InstructionInfo, Error> {
        let format = desc.layout()?;
        self.build(desc.name, format, desc.semantics)
    }

    pub fn add_all(&mut self, descs: &[InsnDesc]) -> Result<(), Error> {
        for desc in descs {
            self.add(desc)?;
        }
        Ok(())
    }
}

/// Build the catalog of a whole ISA description, stopping at the first error.
pub fn build_catalog(xlen: Xlen, descs: &[InsnDesc]) -> Result<Catalog, Error> {
    let mut cx = Context::new(xlen);
    cx.add_all(descs)?;
    debug!("built {} instructions for {xlen}", cx.catalog.len());
    Ok(cx.into_catalog())
}
