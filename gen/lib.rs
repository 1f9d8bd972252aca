#[macro_use]
extern crate log;

pub mod decoder;
pub mod executer;
mod pad;

use std::{
    fmt,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use isagen_core::{build_catalog, Catalog, InsnDesc, Xlen};

pub use crate::{
    executer::{Rule, Table, Translator},
    pad::{Pad, Source},
};

#[derive(Debug)]
pub enum ErrorKind {
    OutputDir(io::Error),
    OutputFile(io::Error),
    Generate(io::Error),
    Isa(isagen_core::Error),
}

#[derive(Debug)]
pub struct Error {
    path: PathBuf,
    kind: ErrorKind,
}

impl Error {
    fn new<S: Into<PathBuf>>(path: S, kind: ErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    fn isa(error: isagen_core::Error) -> Self {
        Self::new("", ErrorKind::Isa(error))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use ErrorKind as E;

        let path = self.path.display();
        match &self.kind {
            E::OutputDir(error) => {
                write!(fmt, "failed to create output directory \"{path}\", {error}")
            }
            E::OutputFile(error) => {
                write!(fmt, "failed to create output file \"{path}\", {error}")
            }
            E::Generate(error) => {
                write!(fmt, "failed to generate output file \"{path}\", {error}")
            }
            E::Isa(error) if self.path.as_os_str().is_empty() => error.fmt(fmt),
            E::Isa(error) => write!(fmt, "failed to generate \"{path}\", {error}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::OutputDir(error)
            | ErrorKind::OutputFile(error)
            | ErrorKind::Generate(error) => Some(error),
            ErrorKind::Isa(error) => Some(error),
        }
    }
}

fn create_file(path: &Path) -> Result<File, Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|error| Error::new(parent, ErrorKind::OutputDir(error)))?;
        }
    }
    File::create(path).map_err(|error| Error::new(path, ErrorKind::OutputFile(error)))
}

fn write_file(path: &Path, src: &str) -> Result<(), Error> {
    let mut out = create_file(path).map(BufWriter::new)?;
    out.write_all(src.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|error| Error::new(path, ErrorKind::Generate(error)))
}

#[derive(Clone)]
pub struct Options {
    /// Register width the catalog must be built for.
    pub xlen: Xlen,
    /// Path of the decoder module as seen from the executer.
    pub decoder_module: &'static str,
    /// Raw instruction word type.
    pub insn_type: &'static str,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            xlen: Xlen::default(),
            decoder_module: "super::decode",
            insn_type: "u32",
        }
    }
}

/// Writes the decoder and executer of one catalog.
pub struct Generator {
    opts: Options,
    table: Table,
    decoder: Option<PathBuf>,
    executer: Option<PathBuf>,
    rerun: Vec<PathBuf>,
}

impl Generator {
    pub fn new(opts: Options) -> Self {
        Self {
            table: Table::for_xlen(opts.xlen),
            opts,
            decoder: None,
            executer: None,
            rerun: Vec::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Replace the translation table picked from the register width.
    pub fn table(mut self, table: Table) -> Self {
        self.table = table;
        self
    }

    pub fn decoder(mut self, path: impl AsRef<Path>) -> Self {
        self.decoder = Some(path.as_ref().into());
        self
    }

    pub fn executer(mut self, path: impl AsRef<Path>) -> Self {
        self.executer = Some(path.as_ref().into());
        self
    }

    /// Ask cargo to rerun the build script when `path` changes.
    pub fn rerun_if_changed(mut self, path: impl AsRef<Path>) -> Self {
        self.rerun.push(path.as_ref().into());
        self
    }

    pub fn generate(&self, catalog: &Catalog) -> Result<(), Error> {
        for path in &self.rerun {
            println!("cargo:rerun-if-changed={}", path.display());
        }

        if catalog.xlen() != self.opts.xlen {
            let msg = format!(
                "catalog is built for {}, generator is configured for {}",
                catalog.xlen(),
                self.opts.xlen
            );
            return Err(Error::isa(isagen_core::Error::global(
                isagen_core::ErrorKind::Config(msg),
            )));
        }

        if let Some(path) = &self.decoder {
            let src = decoder::generate(catalog, &self.opts)
                .map_err(|e| Error::new(path, ErrorKind::Isa(e)))?;
            write_file(path, &src)?;
            info!("decoder written to {}", path.display());
        }

        if let Some(path) = &self.executer {
            let src = executer::generate(catalog, &self.table, &self.opts)
                .map_err(|e| Error::new(path, ErrorKind::Isa(e)))?;
            write_file(path, &src)?;
            info!("executer written to {}", path.display());
        }

        Ok(())
    }

    /// Build the catalog of `descs` and generate the configured outputs.
    pub fn generate_isa(&self, descs: &[InsnDesc]) -> Result<Catalog, Error> {
        let catalog = build_catalog(self.opts.xlen, descs).map_err(Error::isa)?;
        self.generate(&catalog)?;
        Ok(catalog)
    }
}
