#[macro_use]
extern crate log;

mod cli;

use std::{
    io::{self, Write},
    process,
};

use isagen_core::Catalog;
use isagen_gen::{Generator, Options};

fn list(catalog: &Catalog) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for insn in catalog {
        writeln!(out, "{insn}")?;
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = cli::parse_cli();
    if !cli.has_output() {
        eprintln!("warning: nothing to do, use --decoder, --executer or --list");
    }

    let opts = Options {
        xlen: cli.xlen,
        ..Options::default()
    };
    let mut generator = Generator::new(opts);
    if let Some(path) = &cli.decoder {
        generator = generator.decoder(path);
    }
    if let Some(path) = &cli.executer {
        generator = generator.executer(path);
    }

    let catalog = match generator.generate_isa(&isagen_isa::for_xlen(cli.xlen)) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };
    debug!("{} instructions for {}", catalog.len(), catalog.xlen());

    if cli.list {
        if let Err(err) = list(&catalog) {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
