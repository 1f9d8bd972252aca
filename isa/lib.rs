//! RV32I and RV64I base integer instruction sets.

pub mod sem;

use isagen_core::{field::FormatTag, InsnDesc, Semantics, Xlen};

mod op {
    pub const LOAD: u32 = 0x03;
    pub const OP_IMM: u32 = 0x13;
    pub const AUIPC: u32 = 0x17;
    pub const OP_IMM_32: u32 = 0x1b;
    pub const STORE: u32 = 0x23;
    pub const OP: u32 = 0x33;
    pub const LUI: u32 = 0x37;
    pub const OP_32: u32 = 0x3b;
    pub const BRANCH: u32 = 0x63;
    pub const JALR: u32 = 0x67;
    pub const JAL: u32 = 0x6f;
    pub const SYSTEM: u32 = 0x73;
}

fn desc(name: &'static str, format: FormatTag, opcode: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        name,
        format,
        opcode,
        funct3: None,
        funct7: None,
        funct6: None,
        funct12: None,
        semantics,
    }
}

fn r(name: &'static str, opcode: u32, funct3: u32, funct7: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct3: Some(funct3),
        funct7: Some(funct7),
        ..desc(name, FormatTag::R, opcode, semantics)
    }
}

fn i(name: &'static str, opcode: u32, funct3: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct3: Some(funct3),
        ..desc(name, FormatTag::I, opcode, semantics)
    }
}

fn i_shamt5(name: &'static str, opcode: u32, funct3: u32, funct7: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct7: Some(funct7),
        ..i(name, opcode, funct3, semantics)
    }
}

fn i_shamt6(name: &'static str, funct3: u32, funct6: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct6: Some(funct6),
        ..i(name, op::OP_IMM, funct3, semantics)
    }
}

fn i_sys(name: &'static str, funct12: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct12: Some(funct12),
        ..i(name, op::SYSTEM, 0, semantics)
    }
}

fn s(name: &'static str, funct3: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct3: Some(funct3),
        ..desc(name, FormatTag::S, op::STORE, semantics)
    }
}

fn b(name: &'static str, funct3: u32, semantics: Semantics) -> InsnDesc {
    InsnDesc {
        funct3: Some(funct3),
        ..desc(name, FormatTag::B, op::BRANCH, semantics)
    }
}

fn u(name: &'static str, opcode: u32, semantics: Semantics) -> InsnDesc {
    desc(name, FormatTag::U, opcode, semantics)
}

fn j(name: &'static str, opcode: u32, semantics: Semantics) -> InsnDesc {
    desc(name, FormatTag::J, opcode, semantics)
}

/// Instructions shared by RV32I and RV64I.
fn common() -> Vec<InsnDesc> {
    use op::*;

    vec![
        r("add", OP, 0, 0x00, sem::add),
        r("sub", OP, 0, 0x20, sem::sub),
        r("sll", OP, 1, 0x00, sem::sll),
        r("slt", OP, 2, 0x00, sem::slt),
        r("sltu", OP, 3, 0x00, sem::sltu),
        r("xor", OP, 4, 0x00, sem::xor),
        r("srl", OP, 5, 0x00, sem::srl),
        r("sra", OP, 5, 0x20, sem::sra),
        r("or", OP, 6, 0x00, sem::or),
        r("and", OP, 7, 0x00, sem::and),
        i("addi", OP_IMM, 0, sem::addi),
        i("slti", OP_IMM, 2, sem::slti),
        i("sltiu", OP_IMM, 3, sem::sltiu),
        i("xori", OP_IMM, 4, sem::xori),
        i("ori", OP_IMM, 6, sem::ori),
        i("andi", OP_IMM, 7, sem::andi),
        i("lb", LOAD, 0, sem::lb),
        i("lh", LOAD, 1, sem::lh),
        i("lw", LOAD, 2, sem::lw),
        i("lbu", LOAD, 4, sem::lbu),
        i("lhu", LOAD, 5, sem::lhu),
        i("jalr", JALR, 0, sem::jalr),
        s("sb", 0, sem::sb),
        s("sh", 1, sem::sh),
        s("sw", 2, sem::sw),
        b("beq", 0, sem::beq),
        b("bne", 1, sem::bne),
        b("blt", 4, sem::blt),
        b("bge", 5, sem::bge),
        b("bltu", 6, sem::bltu),
        b("bgeu", 7, sem::bgeu),
        u("lui", LUI, sem::lui),
        u("auipc", AUIPC, sem::auipc),
        j("jal", JAL, sem::jal),
        i_sys("ecall", 0, sem::ecall),
        i_sys("ebreak", 1, sem::ebreak),
    ]
}

pub fn rv32i() -> Vec<InsnDesc> {
    use op::*;

    let mut insns = common();
    insns.extend([
        i_shamt5("slli", OP_IMM, 1, 0x00, sem::slli),
        i_shamt5("srli", OP_IMM, 5, 0x00, sem::srli),
        i_shamt5("srai", OP_IMM, 5, 0x20, sem::srai),
    ]);
    insns
}

pub fn rv64i() -> Vec<InsnDesc> {
    use op::*;

    let mut insns = common();
    insns.extend([
        i_shamt6("slli", 1, 0x00, sem::slli),
        i_shamt6("srli", 5, 0x00, sem::srli),
        i_shamt6("srai", 5, 0x10, sem::srai),
        i("lwu", LOAD, 6, sem::lwu),
        i("ld", LOAD, 3, sem::ld),
        s("sd", 3, sem::sd),
        i("addiw", OP_IMM_32, 0, sem::addiw),
        i_shamt5("slliw", OP_IMM_32, 1, 0x00, sem::slliw),
        i_shamt5("srliw", OP_IMM_32, 5, 0x00, sem::srliw),
        i_shamt5("sraiw", OP_IMM_32, 5, 0x20, sem::sraiw),
        r("addw", OP_32, 0, 0x00, sem::addw),
        r("subw", OP_32, 0, 0x20, sem::subw),
        r("sllw", OP_32, 1, 0x00, sem::sllw),
        r("srlw", OP_32, 5, 0x00, sem::srlw),
        r("sraw", OP_32, 5, 0x20, sem::sraw),
    ]);
    insns
}

pub fn for_xlen(xlen: Xlen) -> Vec<InsnDesc> {
    match xlen {
        Xlen::X32 => rv32i(),
        Xlen::X64 => rv64i(),
    }
}
