//! Instruction semantics.

use isagen_core::{
    error::SemanticsError,
    scope::{MemWidth, Sign},
    value::Var,
    Builder,
};

type Result = core::result::Result<(), SemanticsError>;

macro_rules! reg_reg {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(pub fn $name(b: &mut Builder) -> Result {
            let value = b.$op("rs1", "rs2")?;
            b.assign("rd", value)
        })+
    };
}

macro_rules! reg_imm {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(pub fn $name(b: &mut Builder) -> Result {
            let imm = b.imm()?;
            let value = b.$op("rs1", imm)?;
            b.assign("rd", value)
        })+
    };
}

reg_reg! {
    add => add,
    sub => sub,
    sll => shl,
    slt => lt,
    sltu => ltu,
    xor => xor,
    srl => srl,
    sra => sra,
    or => or,
    and => and,

    addw => addw,
    subw => subw,
    sllw => sllw,
    srlw => srlw,
    sraw => sraw,
}

reg_imm! {
    addi => add,
    slti => lt,
    sltiu => ltu,
    xori => xor,
    ori => or,
    andi => and,
    slli => shl,
    srli => srl,
    srai => sra,

    addiw => addw,
    slliw => sllw,
    srliw => srlw,
    sraiw => sraw,
}

fn load(b: &mut Builder, width: MemWidth, sign: Sign) -> Result {
    let imm = b.imm()?;
    let addr = b.add("rs1", imm)?;
    let value = b.load_as(addr, width, sign)?;
    b.assign("rd", value)
}

pub fn lb(b: &mut Builder) -> Result {
    load(b, MemWidth::Byte, Sign::Signed)
}

pub fn lh(b: &mut Builder) -> Result {
    load(b, MemWidth::Half, Sign::Signed)
}

pub fn lw(b: &mut Builder) -> Result {
    load(b, MemWidth::Word, Sign::Signed)
}

pub fn lbu(b: &mut Builder) -> Result {
    load(b, MemWidth::Byte, Sign::Unsigned)
}

pub fn lhu(b: &mut Builder) -> Result {
    load(b, MemWidth::Half, Sign::Unsigned)
}

pub fn lwu(b: &mut Builder) -> Result {
    load(b, MemWidth::Word, Sign::Unsigned)
}

pub fn ld(b: &mut Builder) -> Result {
    load(b, MemWidth::Double, Sign::Signed)
}

fn store(b: &mut Builder, width: MemWidth) -> Result {
    let imm = b.imm()?;
    let addr = b.add("rs1", imm)?;
    b.store_as(addr, "rs2", width)
}

pub fn sb(b: &mut Builder) -> Result {
    store(b, MemWidth::Byte)
}

pub fn sh(b: &mut Builder) -> Result {
    store(b, MemWidth::Half)
}

pub fn sw(b: &mut Builder) -> Result {
    store(b, MemWidth::Word)
}

pub fn sd(b: &mut Builder) -> Result {
    store(b, MemWidth::Double)
}

/// Jump to `pc + imm` if `cond` is set.
fn branch(b: &mut Builder, cond: Var) -> Result {
    b.if_then(cond, |b| {
        let pc = b.pc()?;
        let imm = b.imm()?;
        let target = b.add(pc, imm)?;
        b.set_pc(target)
    })
}

macro_rules! branch {
    ($($name:ident => $op:ident),+ $(,)?) => {
        $(pub fn $name(b: &mut Builder) -> Result {
            let cond = b.$op("rs1", "rs2")?;
            branch(b, cond)
        })+
    };
}

branch! {
    beq => eq,
    bne => ne,
    blt => lt,
    bge => ge,
    bltu => ltu,
    bgeu => geu,
}

pub fn jal(b: &mut Builder) -> Result {
    let pc = b.pc()?;
    let link = b.add(&pc, 4)?;
    let imm = b.imm()?;
    let target = b.add(&pc, imm)?;
    b.set_pc(target)?;
    b.assign("rd", link)
}

pub fn jalr(b: &mut Builder) -> Result {
    let pc = b.pc()?;
    let link = b.add(pc, 4)?;
    let imm = b.imm()?;
    let target = b.add("rs1", imm)?;
    let target = b.and(target, -2)?;
    b.set_pc(target)?;
    b.assign("rd", link)
}

pub fn lui(b: &mut Builder) -> Result {
    let imm = b.imm()?;
    b.assign("rd", imm)
}

pub fn auipc(b: &mut Builder) -> Result {
    let pc = b.pc()?;
    let imm = b.imm()?;
    let value = b.add(pc, imm)?;
    b.assign("rd", value)
}

pub fn ecall(b: &mut Builder) -> Result {
    b.ecall();
    Ok(())
}

pub fn ebreak(b: &mut Builder) -> Result {
    b.ebreak();
    Ok(())
}
