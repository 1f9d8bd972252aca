use core::fmt;

/// Indentation of generated code, four spaces per level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Pad(usize);

impl Pad {
    pub fn new(depth: usize) -> Self {
        Self(depth)
    }

    pub fn depth(self) -> usize {
        self.0
    }

    pub fn shift(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{:1$}", "", self.0 * 4)
    }
}

/// Generated source text built line by line.
#[derive(Clone, Debug, Default)]
pub struct Source {
    buf: String,
}

impl Source {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, pad: Pad, line: impl fmt::Display) {
        self.buf.push_str(&format!("{pad}{line}\n"));
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn append(&mut self, other: Source) {
        self.buf.push_str(&other.buf);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
