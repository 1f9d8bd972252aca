//! RISC-V decoders and executers generated from the bundled RV32I and RV64I
//! descriptions.
//!
//! ```
//! use isagen_riscv::rv64;
//!
//! let insn = rv64::decode_insn(0x0144_8533).unwrap();
//! assert_eq!(insn.to_string(), "add rd=10 rs1=9 rs2=20 imm=0");
//! ```

macro_rules! generated {
    ($name:ident, $decode:literal, $exec:literal) => {
        pub mod $name {
            use core::fmt;

            #[allow(unused_parens, clippy::all)]
            pub mod decode {
                include!(concat!(env!("OUT_DIR"), $decode));
            }

            #[allow(clippy::all)]
            pub mod exec {
                include!(concat!(env!("OUT_DIR"), $exec));
            }

            pub use self::{
                decode::{decode, mnemonic, opcode, Insn, Opcode},
                exec::{execute, Hart},
            };

            /// Decode one instruction word.
            pub fn decode_insn(raw: u32) -> Option<Insn> {
                let mut insn = Insn::default();
                decode(raw, &mut insn).then_some(insn)
            }

            impl fmt::Display for Insn {
                fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                    let name = mnemonic(self.opcode).unwrap_or("invalid");
                    write!(
                        fmt,
                        "{name} rd={} rs1={} rs2={} imm={}",
                        self.rd, self.rs1, self.rs2, self.imm
                    )
                }
            }
        }
    };
}

generated!(rv32, "/rv32i_decode.rs", "/rv32i_exec.rs");
generated!(rv64, "/rv64i_decode.rs", "/rv64i_exec.rs");
