//! Bit layouts of the instruction formats.
//!
//! Every format is an ordered list of [`Field`]s. A field is made of one or
//! more bit ranges; split immediates are reassembled by moving each range to
//! its position in the value and OR-ing the parts together.

use core::fmt;

use crate::{
    error::EncodingError,
    utils::{deposit, mask, sign_extend, zextract},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormatTag {
    R,
    I,
    S,
    B,
    U,
    J,
}

impl fmt::Display for FormatTag {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::R => "R",
            Self::I => "I",
            Self::S => "S",
            Self::B => "B",
            Self::U => "U",
            Self::J => "J",
        };
        fmt.write_str(s)
    }
}

/// Dispatch tier of a fixed field, in tie-break order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Opcode,
    Funct3,
    /// funct7, funct6 or funct12.
    Upper,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Opcode, Level::Funct3, Level::Upper];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegRole {
    Rd,
    Rs1,
    Rs2,
}

impl RegRole {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rd => "rd",
            Self::Rs1 => "rs1",
            Self::Rs2 => "rs2",
        }
    }

    pub fn is_source(self) -> bool {
        matches!(self, Self::Rs1 | Self::Rs2)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Reg(RegRole),
    Imm,
    /// `level` is `None` for bits that must match but take no part in dispatch.
    Fixed { value: u32, level: Option<Level> },
}

/// Inclusive instruction bit range `from..=to` that lands on bit `pos` of the
/// field value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitRange {
    pub from: u32,
    pub to: u32,
    pub pos: u32,
}

impl BitRange {
    pub const fn new(from: u32, to: u32, pos: u32) -> Self {
        Self { from, to, pos }
    }

    pub fn len(&self) -> u32 {
        self.to - self.from + 1
    }

    pub fn mask(&self) -> u32 {
        mask::<u32>(self.len()) << self.from
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    parts: Vec<BitRange>,
    kind: FieldKind,
}

impl Field {
    pub fn reg(role: RegRole, from: u32, to: u32) -> Self {
        Self {
            name: role.name(),
            parts: vec![BitRange::new(from, to, 0)],
            kind: FieldKind::Reg(role),
        }
    }

    pub fn imm(parts: &[BitRange]) -> Self {
        Self {
            name: "imm",
            parts: parts.to_vec(),
            kind: FieldKind::Imm,
        }
    }

    pub fn fixed(name: &'static str, from: u32, to: u32, value: u32, level: Level) -> Self {
        Self {
            name,
            parts: vec![BitRange::new(from, to, 0)],
            kind: FieldKind::Fixed {
                value,
                level: Some(level),
            },
        }
    }

    /// Reserved bits that must be zero.
    pub fn zero(name: &'static str, from: u32, to: u32) -> Self {
        Self {
            name,
            parts: vec![BitRange::new(from, to, 0)],
            kind: FieldKind::Fixed {
                value: 0,
                level: None,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn parts(&self) -> &[BitRange] {
        &self.parts
    }

    pub fn role(&self) -> Option<RegRole> {
        match self.kind {
            FieldKind::Reg(role) => Some(role),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<u32> {
        match self.kind {
            FieldKind::Fixed { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.kind {
            FieldKind::Fixed { level, .. } => level,
            _ => None,
        }
    }

    /// Width of the assembled value.
    pub fn width(&self) -> u32 {
        self.parts.iter().map(|p| p.pos + p.len()).max().unwrap_or(0)
    }

    /// Instruction bits covered by the field.
    pub fn mask(&self) -> u32 {
        self.parts.iter().fold(0, |acc, p| acc | p.mask())
    }

    pub fn extract(&self, insn: u32) -> u32 {
        self.parts.iter().fold(0, |acc, p| {
            acc | (zextract::<u32, u32>(insn, p.from, p.len()) << p.pos)
        })
    }

    pub fn deposit(&self, insn: u32, value: u32) -> u32 {
        self.parts.iter().fold(insn, |acc, p| {
            deposit(acc, p.from, p.len(), zextract::<u32, u32>(value, p.pos, p.len()))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionFormat {
    tag: FormatTag,
    name: &'static str,
    fields: Vec<Field>,
    signed: bool,
}

impl InstructionFormat {
    /// Instruction width in bits.
    pub const WIDTH: u32 = 32;

    pub fn new(tag: FormatTag, name: &'static str, fields: Vec<Field>, signed: bool) -> Self {
        Self {
            tag,
            name,
            fields,
            signed,
        }
    }

    pub fn tag(&self) -> FormatTag {
        self.tag
    }

    /// Layout name, unique per field layout.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fixed(&self, level: Level) -> Option<&Field> {
        self.fields.iter().find(|f| f.level() == Some(level))
    }

    pub fn imm(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == FieldKind::Imm)
    }

    pub fn regs(&self) -> impl Iterator<Item = (RegRole, &Field)> {
        self.fields.iter().filter_map(|f| f.role().map(|r| (r, f)))
    }

    /// Topmost bit of the immediate, if the immediate is sign-extended.
    pub fn sign_bit(&self) -> Option<u32> {
        match self.imm() {
            Some(imm) if self.signed => Some(imm.width() - 1),
            _ => None,
        }
    }

    /// Mask of all fixed fields.
    pub fn mask(&self) -> u32 {
        self.fields
            .iter()
            .filter(|f| f.value().is_some())
            .fold(0, |acc, f| acc | f.mask())
    }

    /// Fixed field values at their instruction positions.
    pub fn bits(&self) -> u32 {
        self.fields.iter().fold(0, |acc, f| match f.value() {
            Some(value) => f.deposit(acc, value),
            None => acc,
        })
    }

    pub fn matches(&self, insn: u32) -> bool {
        insn & self.mask() == self.bits()
    }

    pub fn validate(&self) -> Result<(), EncodingError> {
        let mut used = 0u32;
        let mut owner = [""; Self::WIDTH as usize];
        for field in &self.fields {
            for part in &field.parts {
                if part.from > part.to || part.to >= Self::WIDTH {
                    return Err(EncodingError::OutOfRange {
                        format: self.name,
                        field: field.name,
                    });
                }
                let mask = part.mask();
                if used & mask != 0 {
                    let bit = (used & mask).trailing_zeros() as usize;
                    return Err(EncodingError::Overlap {
                        format: self.name,
                        first: owner[bit],
                        second: field.name,
                    });
                }
                used |= mask;
                for bit in part.from..=part.to {
                    owner[bit as usize] = field.name;
                }
            }
        }
        Ok(())
    }

    /// Reassemble the immediate and sign-extend it when the format says so.
    pub fn decode_imm(&self, insn: u32) -> Option<i64> {
        let imm = self.imm()?;
        let raw = imm.extract(insn) as u64;
        Some(match self.sign_bit() {
            Some(bit) => sign_extend(raw, bit),
            None => raw as i64,
        })
    }

    /// Build an instruction word from the fixed fields and named operands.
    ///
    /// Returns `None` if an operand names a field this format does not have or
    /// if the field cannot hold the value exactly: too wide, outside the signed
    /// immediate range, or with low bits the layout does not encode. A fixed
    /// field only accepts its own value.
    pub fn encode(&self, operands: &[(&str, i64)]) -> Option<u32> {
        let mut insn = self.bits();
        for &(name, value) in operands {
            let field = self.field(name)?;
            let raw = field.extract(field.deposit(0, value as u32)) as u64;
            let stored = match (field.kind, self.sign_bit()) {
                (FieldKind::Imm, Some(bit)) => sign_extend(raw, bit),
                _ => raw as i64,
            };
            if stored != value || field.value().map_or(false, |v| i64::from(v) != value) {
                return None;
            }
            insn = field.deposit(insn, value as u32);
        }
        Some(insn)
    }
}

const RD: (u32, u32) = (7, 11);
const RS1: (u32, u32) = (15, 19);
const RS2: (u32, u32) = (20, 24);

fn opcode(value: u32) -> Field {
    Field::fixed("opcode", 0, 6, value, Level::Opcode)
}

fn funct3(value: u32) -> Field {
    Field::fixed("funct3", 12, 14, value, Level::Funct3)
}

fn rd() -> Field {
    Field::reg(RegRole::Rd, RD.0, RD.1)
}

fn rs1() -> Field {
    Field::reg(RegRole::Rs1, RS1.0, RS1.1)
}

fn rs2() -> Field {
    Field::reg(RegRole::Rs2, RS2.0, RS2.1)
}

pub fn format_r(op: u32, f3: u32, f7: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        rd(),
        funct3(f3),
        rs1(),
        rs2(),
        Field::fixed("funct7", 25, 31, f7, Level::Upper),
    ];
    InstructionFormat::new(FormatTag::R, "r", fields, false)
}

pub fn format_i(op: u32, f3: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        rd(),
        funct3(f3),
        rs1(),
        Field::imm(&[BitRange::new(20, 31, 0)]),
    ];
    InstructionFormat::new(FormatTag::I, "i", fields, true)
}

/// I-format shift with a 5-bit shift amount and funct7.
pub fn format_i_shamt5(op: u32, f3: u32, f7: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        rd(),
        funct3(f3),
        rs1(),
        Field::imm(&[BitRange::new(20, 24, 0)]),
        Field::fixed("funct7", 25, 31, f7, Level::Upper),
    ];
    InstructionFormat::new(FormatTag::I, "i_shamt5", fields, false)
}

/// I-format shift with a 6-bit shift amount and funct6.
pub fn format_i_shamt6(op: u32, f3: u32, f6: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        rd(),
        funct3(f3),
        rs1(),
        Field::imm(&[BitRange::new(20, 25, 0)]),
        Field::fixed("funct6", 26, 31, f6, Level::Upper),
    ];
    InstructionFormat::new(FormatTag::I, "i_shamt6", fields, false)
}

/// I-format system instruction, selected by funct12 and without operands.
pub fn format_i_sys(op: u32, f3: u32, f12: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        Field::zero("rd", RD.0, RD.1),
        funct3(f3),
        Field::zero("rs1", RS1.0, RS1.1),
        Field::fixed("funct12", 20, 31, f12, Level::Upper),
    ];
    InstructionFormat::new(FormatTag::I, "i_sys", fields, false)
}

pub fn format_s(op: u32, f3: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        funct3(f3),
        rs1(),
        rs2(),
        Field::imm(&[BitRange::new(7, 11, 0), BitRange::new(25, 31, 5)]),
    ];
    InstructionFormat::new(FormatTag::S, "s", fields, true)
}

pub fn format_b(op: u32, f3: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        funct3(f3),
        rs1(),
        rs2(),
        Field::imm(&[
            BitRange::new(8, 11, 1),
            BitRange::new(25, 30, 5),
            BitRange::new(7, 7, 11),
            BitRange::new(31, 31, 12),
        ]),
    ];
    InstructionFormat::new(FormatTag::B, "b", fields, true)
}

pub fn format_u(op: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        rd(),
        Field::imm(&[BitRange::new(12, 31, 12)]),
    ];
    InstructionFormat::new(FormatTag::U, "u", fields, true)
}

pub fn format_j(op: u32) -> InstructionFormat {
    let fields = vec![
        opcode(op),
        rd(),
        Field::imm(&[
            BitRange::new(21, 30, 1),
            BitRange::new(20, 20, 11),
            BitRange::new(12, 19, 12),
            BitRange::new(31, 31, 20),
        ]),
    ];
    InstructionFormat::new(FormatTag::J, "j", fields, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<InstructionFormat> {
        vec![
            format_r(0x33, 0, 0x20),
            format_i(0x13, 0),
            format_i_shamt5(0x13, 5, 0x20),
            format_i_shamt6(0x13, 5, 0x10),
            format_i_sys(0x73, 0, 1),
            format_s(0x23, 2),
            format_b(0x63, 1),
            format_u(0x37),
            format_j(0x6f),
        ]
    }

    #[test]
    fn layouts_are_valid() {
        for format in all() {
            assert_eq!(format.validate(), Ok(()), "{}", format.name());
            for field in format.fields() {
                for part in field.parts() {
                    assert!(part.to < InstructionFormat::WIDTH);
                }
            }
        }
    }

    #[test]
    fn overlap_is_rejected() {
        let format = InstructionFormat::new(
            FormatTag::I,
            "bad",
            vec![opcode(0x13), Field::imm(&[BitRange::new(5, 11, 0)])],
            true,
        );
        assert_eq!(
            format.validate(),
            Err(EncodingError::Overlap {
                format: "bad",
                first: "opcode",
                second: "imm",
            })
        );

        let format = InstructionFormat::new(
            FormatTag::U,
            "wide",
            vec![Field::imm(&[BitRange::new(12, 32, 12)])],
            true,
        );
        assert!(matches!(
            format.validate(),
            Err(EncodingError::OutOfRange { field: "imm", .. })
        ));
    }

    #[test]
    fn mask_and_bits() {
        let add = format_r(0x33, 0, 0);
        assert_eq!(add.mask(), 0xfe00_707f);
        assert_eq!(add.bits(), 0x0000_0033);
        let sub = format_r(0x33, 0, 0x20);
        assert_eq!(sub.bits(), 0x4000_0033);
        assert!(sub.matches(0x412a_0633));
        assert!(!add.matches(0x412a_0633));
        assert_eq!(format_i_sys(0x73, 0, 1).bits(), 0x0010_0073);
    }

    #[test]
    fn system_reserved_bits() {
        let ebreak = format_i_sys(0x73, 0, 1);
        assert_eq!(ebreak.mask(), 0xffff_ffff);
        assert!(ebreak.matches(0x0010_0073));
        // rd or rs1 set
        assert!(!ebreak.matches(0x0010_00f3));
        assert!(!ebreak.matches(0x0010_8073));
        assert_eq!(ebreak.fixed(Level::Upper).map(|f| f.name()), Some("funct12"));
        assert_eq!(ebreak.regs().count(), 0);
    }

    #[test]
    fn encode_rejects_lossy_values() {
        let i = format_i(0x13, 0);
        assert_eq!(i.encode(&[("rd", 40)]), None);
        assert_eq!(i.encode(&[("rd", -1)]), None);
        assert_eq!(i.encode(&[("imm", 0x100c)]), None);
        assert_eq!(i.encode(&[("imm", 2048)]), None);
        assert_eq!(i.encode(&[("imm", -2049)]), None);
        assert_eq!(i.encode(&[("rd", 8), ("imm", 2047)]), Some(0x7ff0_0413));
        assert_eq!(i.encode(&[("imm", -2048)]), Some(0x8000_0013));
        assert_eq!(i.encode(&[("funct4", 0)]), None);
        assert_eq!(i.encode(&[("funct3", 1)]), None);
        assert_eq!(i.encode(&[("funct3", 0)]), Some(0x13));

        let b = format_b(0x63, 0);
        assert_eq!(b.encode(&[("imm", 3)]), None);
        assert_eq!(b.encode(&[("imm", 4096)]), None);
        assert_eq!(b.decode_imm(b.encode(&[("imm", -4096)]).unwrap()), Some(-4096));

        let j = format_j(0x6f);
        assert_eq!(j.encode(&[("imm", 1)]), None);
        assert_eq!(j.encode(&[("imm", 1 << 20)]), None);

        let u = format_u(0x37);
        assert_eq!(u.encode(&[("imm", 0x800)]), None);
        assert_eq!(u.encode(&[("imm", 1 << 31)]), None);
        assert!(u.encode(&[("imm", -(1 << 31))]).is_some());

        let shamt = format_i_shamt5(0x13, 1, 0);
        assert_eq!(shamt.encode(&[("imm", 32)]), None);
        assert_eq!(shamt.encode(&[("imm", -1)]), None);
        assert!(shamt.encode(&[("imm", 31)]).is_some());
    }

    #[test]
    fn round_trip() {
        let operands: &[(&str, i64)] = &[("rd", 5), ("rs1", 17), ("rs2", 30), ("imm", 0)];
        for format in all() {
            let mut used = Vec::new();
            for (name, value) in operands {
                if let Some(field) = format.field(name).filter(|f| f.value().is_none()) {
                    let value = match field.kind() {
                        FieldKind::Imm => {
                            let pos = format.imm().unwrap().parts()[0].pos;
                            match format.sign_bit() {
                                Some(_) => -2i64 << pos,
                                None => 3i64 << pos,
                            }
                        }
                        _ => *value,
                    };
                    used.push((*name, value));
                }
            }
            let insn = format.encode(&used).unwrap();
            assert!(format.matches(insn), "{}", format.name());
            for (name, value) in &used {
                let field = format.field(name).unwrap();
                match field.kind() {
                    FieldKind::Imm => {
                        assert_eq!(format.decode_imm(insn), Some(*value), "{}", format.name());
                    }
                    _ => assert_eq!(field.extract(insn) as i64, *value),
                }
            }
        }
    }

    #[test]
    fn split_immediates() {
        // beq s4,a5,+56
        let b = format_b(0x63, 0);
        assert_eq!(b.decode_imm(0x02fa_0c63), Some(56));
        // sb a3,113(sp)
        let s = format_s(0x23, 0);
        assert_eq!(s.decode_imm(0x06d1_08a3), Some(113));
        // jal ra,-0x15b56 at 0
        let j = format_j(0x6f);
        assert_eq!(j.decode_imm(0xfe5f_f0ef), Some(-28));
    }

    #[test]
    fn sign_extension() {
        let i = format_i(0x13, 0);
        assert_eq!(i.sign_bit(), Some(11));
        // xori a5,s11,-1
        assert_eq!(i.decode_imm(0xfffd_c793), Some(-1));
        assert_eq!(i.decode_imm(0x7ff0_0013), Some(0x7ff));
        let u = format_u(0x37);
        assert_eq!(u.sign_bit(), Some(31));
        assert_eq!(u.decode_imm(0xdead_b7b7), Some(0xdead_b000u32 as i32 as i64));
        assert_eq!(u.decode_imm(0x1234_5037), Some(0x1234_5000));
        let b = format_b(0x63, 0);
        assert_eq!(b.sign_bit(), Some(12));
        assert_eq!(b.decode_imm(0x8000_0063), Some(-4096));
        assert_eq!(format_i_shamt6(0x13, 1, 0).sign_bit(), None);
        assert_eq!(format_i_shamt6(0x13, 1, 0).decode_imm(0x03f9_9593), Some(63));
    }
}
