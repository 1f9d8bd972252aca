use std::{path::PathBuf, str::FromStr};

use bpaf::*;
use isagen_core::Xlen;

#[derive(Debug, Clone)]
pub struct Cli {
    pub xlen: Xlen,
    pub decoder: Option<PathBuf>,
    pub executer: Option<PathBuf>,
    pub list: bool,
}

impl Cli {
    /// Whether any output was requested.
    pub fn has_output(&self) -> bool {
        self.decoder.is_some() || self.executer.is_some() || self.list
    }
}

pub fn parse_cli() -> Cli {
    let xlen = long("xlen")
        .help("Register width of the target [default: 64, valid widths: 32, 64]")
        .argument::<String>("BITS")
        .parse(|s| Xlen::from_str(&s))
        .fallback(Xlen::default());

    let decoder = long("decoder")
        .help("Write the generated decoder to PATH")
        .argument::<PathBuf>("PATH")
        .optional();

    let executer = long("executer")
        .help("Write the generated executer to PATH")
        .argument::<PathBuf>("PATH")
        .optional();

    let list = short('l')
        .long("list")
        .help("Print the instructions and their statements")
        .switch();

    construct!(Cli {
        xlen,
        decoder,
        executer,
        list,
    })
    .to_options()
    .version(env!("CARGO_PKG_VERSION"))
    .descr("Generate a RISC-V decoder and executer from the bundled instruction descriptions")
    .fallback_to_usage()
    .run()
}
