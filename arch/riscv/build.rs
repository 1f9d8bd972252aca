use std::{env, path::PathBuf, process};

use isagen_core::Xlen;
use isagen_gen::{Generator, Options};

fn main() {
    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        eprintln!("error: OUT_DIR is not set");
        process::exit(1);
    };

    for (xlen, name) in [(Xlen::X32, "rv32i"), (Xlen::X64, "rv64i")] {
        let opts = Options {
            xlen,
            ..Options::default()
        };
        let generator = Generator::new(opts)
            .decoder(out_dir.join(format!("{name}_decode.rs")))
            .executer(out_dir.join(format!("{name}_exec.rs")))
            .rerun_if_changed("build.rs");

        if let Err(err) = generator.generate_isa(&isagen_isa::for_xlen(xlen)) {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
