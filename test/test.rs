//! Golden decode files.
//!
//! Every non-empty line holds an optional hex address, the instruction words
//! in hex and, separated by at least two spaces, the expected decoder output.
//! Text after `#` is ignored. Failures are reported with the address of the
//! instruction, which continues from the previous line when omitted:
//!
//! ```text
//! # comment
//! 1000: 01448533    add rd=10 rs1=9 rs2=20 imm=0
//!       fff00513    addi rd=10 rs1=0 rs2=0 imm=-1
//! ```

use std::{fmt, str::Lines};

use super::utils::Diff;

#[derive(Clone, Debug, PartialEq, Eq)]
struct ParserError {
    file: String,
    line: usize,
    msg: String,
}

impl fmt::Display for ParserError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "error: {}, {}:{}", self.msg, self.file, self.line)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Test<'a> {
    pub line: usize,
    pub address: u64,
    pub bytes: Vec<u8>,
    pub expect: &'a str,
}

impl Test<'_> {
    /// Instruction bytes as little-endian 32-bit words.
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.chunks(4).map(|chunk| {
            let mut word = [0; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
    }
}

pub struct Parser<'a> {
    file: String,
    lines: Lines<'a>,
    line: usize,
    address: u64,
}

impl<'a> Parser<'a> {
    pub fn new(file: &str, input: &'a str) -> Self {
        Self {
            file: file.to_owned(),
            lines: input.lines(),
            line: 0,
            address: 0,
        }
    }

    fn error<T>(&self, msg: String) -> Result<T, String> {
        let err = ParserError {
            file: self.file.clone(),
            line: self.line,
            msg,
        };
        Err(err.to_string())
    }

    /// Parse the next test, `Ok(false)` at the end of input.
    pub fn parse(&mut self, output: &mut Test<'a>) -> Result<bool, String> {
        output.bytes.clear();

        while let Some(line) = self.lines.next() {
            self.line += 1;

            let line = line.split_once('#').map_or(line, |(line, _)| line);
            let mut cur = line.trim();
            if cur.is_empty() {
                continue;
            }
            output.line = self.line;

            // address is optional and continues from the previous test
            output.address = self.address;
            if let Some((head, tail)) = cur.split_once(':') {
                match u64::from_str_radix(head.trim(), 16) {
                    Ok(address) => output.address = address,
                    Err(_) => return self.error(format!("invalid address \"{head}\"")),
                }
                cur = tail.trim_start();
            }

            // words end at the first run of two or more spaces
            let (words, expect) = match cur.find("  ") {
                Some(pos) => (&cur[..pos], cur[pos..].trim()),
                None => (cur, ""),
            };
            for word in words.split_whitespace() {
                if word.len() % 2 != 0 || word.len() > 16 {
                    return self.error(format!("invalid instruction word \"{word}\""));
                }
                match u64::from_str_radix(word, 16) {
                    Ok(raw) => {
                        output
                            .bytes
                            .extend_from_slice(&raw.to_le_bytes()[..word.len() / 2]);
                    }
                    Err(_) => return self.error(format!("invalid instruction word \"{word}\"")),
                }
            }
            if output.bytes.is_empty() {
                return self.error("no instruction bytes".to_owned());
            }
            output.expect = expect;
            self.address = output.address + output.bytes.len() as u64;
            return Ok(true);
        }

        Ok(false)
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub trait Runner {
    /// Decode the test bytes, `None` if they are not a valid instruction.
    fn decode(&mut self, test: &Test) -> Option<String>;

    fn run(&mut self, file: &str, tests: &str) -> Result<(), String> {
        let mut test = Test::default();
        let mut parser = Parser::new(file, tests);
        let mut failed = 0;
        let mut total = 0;
        while parser.parse(&mut test)? {
            total += 1;
            let expect = normalize(test.expect);
            let result = match self.decode(&test) {
                Some(result) => normalize(&result),
                None => {
                    failed += 1;
                    eprintln!(
                        "error: failed to decode {:#x}, {}:{}",
                        test.address, file, test.line
                    );
                    continue;
                }
            };
            if result != expect {
                failed += 1;
                eprintln!("error: invalid output, {}:{}", file, test.line);
                let diff = Diff::new(file, test.line, &test.bytes, &expect, &result)
                    .with_address(test.address);
                eprintln!("{diff}");
            }
        }
        if failed == 0 {
            Ok(())
        } else {
            Err(format!("failed {failed} of {total} tests"))
        }
    }
}
