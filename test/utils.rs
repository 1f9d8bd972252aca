use std::fmt::{self, Write as _};

struct Bytes<'a>(&'a [u8]);

impl fmt::Display for Bytes<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                fmt.write_char(' ')?;
            }
            write!(fmt, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Shows trailing whitespace and tabs.
struct Escape<'a>(&'a str);

impl fmt::Display for Escape<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let body = self.0.trim_end();
        for c in body.chars() {
            match c {
                '\t' => fmt.write_str("→   ")?,
                _ => fmt.write_char(c)?,
            }
        }
        for c in self.0[body.len()..].chars() {
            match c {
                '\t' => fmt.write_char('→')?,
                _ => fmt.write_char('•')?,
            }
        }
        Ok(())
    }
}

/// Line diff of the expected and actual output.
pub struct Diff<'a> {
    file: &'a str,
    line: usize,
    address: Option<u64>,
    bytes: &'a [u8],
    expect: &'a str,
    result: &'a str,
}

impl<'a> Diff<'a> {
    pub fn new(
        file: &'a str,
        line: usize,
        bytes: &'a [u8],
        expect: &'a str,
        result: &'a str,
    ) -> Self {
        Self {
            file,
            line,
            address: None,
            bytes,
            expect,
            result,
        }
    }

    /// Show the address of the instruction above its bytes.
    pub fn with_address(mut self, address: u64) -> Self {
        self.address = Some(address);
        self
    }
}

impl fmt::Display for Diff<'_> {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        use diff::Result as E;

        let w = 5;
        if !self.file.is_empty() {
            writeln!(out, "{:w$}--> {}:{}", ' ', self.file, self.line)?;
        }
        if let Some(address) = self.address {
            writeln!(out, "{:>8}{address:x}", "addr | ")?;
        }
        for (i, chunk) in self.bytes.chunks(4).enumerate() {
            let prefix = if i == 0 { "raw | " } else { "| " };
            writeln!(out, "{prefix:>8}{}", Bytes(chunk))?;
        }
        let mut ln = self.line.max(1);
        for diff in diff::lines(self.expect, self.result) {
            match diff {
                E::Left(l) => writeln!(out, "{ln:w$} - {}", Escape(l))?,
                E::Right(r) => writeln!(out, "{ln:w$} + {}", Escape(r))?,
                E::Both(l, _) => {
                    writeln!(out, "{ln:w$} | {}", Escape(l))?;
                    ln += 1;
                }
            }
        }
        Ok(())
    }
}

/// Compare generated text against the expected text, printing a diff on mismatch.
pub fn check(file: &str, line: usize, expect: &str, result: &str) -> Result<(), String> {
    if expect != result {
        let err = format!("unexpected output for {file}");
        eprintln!("error: {err}");
        eprintln!("{}", Diff::new(file, line, &[], expect, result));
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_trailing() {
        assert_eq!(Escape("a b").to_string(), "a b");
        assert_eq!(Escape("a \t").to_string(), "a•→");
        assert_eq!(Escape("\tx").to_string(), "→   x");
    }

    #[test]
    fn diff_marks_lines() {
        let diff = Diff::new("", 1, &[0x33, 0x05], "a\nb\n", "a\nc\n").to_string();
        assert!(diff.contains("raw | 33 05"));
        assert!(diff.contains("    1 | a"));
        assert!(diff.contains("    2 - b"));
        assert!(diff.contains("    2 + c"));
        assert!(!diff.contains("addr"));

        let diff = Diff::new("t", 3, &[0x13, 0, 0, 0], "x", "y")
            .with_address(0x1004)
            .to_string();
        assert!(diff.contains(" addr | 1004\n  raw | 13 00 00 00\n"), "{diff}");
    }

    #[test]
    fn check_reports_mismatch() {
        assert!(check("x", 1, "same", "same").is_ok());
        assert!(check("x", 1, "one", "two").is_err());
    }
}
