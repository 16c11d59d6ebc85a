//! Instruction Model - decode and operand normalization
//!
//! Architecture-neutral view of a single decoded ppc64le instruction, plus
//! the normalization pass that rewrites PC-relative operands into absolute
//! addresses before any consumer can observe them.

use thiserror::Error;

use crate::render::AssemblyFlavour;

/// Upper bound on the encoded length of one instruction, used when reading
/// ahead in a byte stream.
pub const MAX_INSTRUCTION_LENGTH: u64 = 15;

/// Decode errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid instruction at {pc:#x}")]
    InvalidInstruction { pc: u64 },

    #[error("Truncated instruction stream at {pc:#x}: need {needed} bytes, have {available}")]
    Truncated {
        pc: u64,
        needed: usize,
        available: usize,
    },
}

/// Opcodes this layer distinguishes.
///
/// Covers the call/system-call opcode, the frame-setup opcodes matched by
/// the prologue scanner, and common body instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Ld,
    Std,
    Stdu,
    Addi,
    Addis,
    Add,
    Or,
    Ori,
    Cmpld,
    Cmpldi,
    B,
    Beq,
    Blt,
    Bl,
    Blr,
    Mflr,
    Mtlr,
    Sc,
    Nop,
}

impl Opcode {
    /// GNU-syntax mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ld => "ld",
            Opcode::Std => "std",
            Opcode::Stdu => "stdu",
            Opcode::Addi => "addi",
            Opcode::Addis => "addis",
            Opcode::Add => "add",
            Opcode::Or => "or",
            Opcode::Ori => "ori",
            Opcode::Cmpld => "cmpld",
            Opcode::Cmpldi => "cmpldi",
            Opcode::B => "b",
            Opcode::Beq => "beq",
            Opcode::Blt => "blt",
            Opcode::Bl => "bl",
            Opcode::Blr => "blr",
            Opcode::Mflr => "mflr",
            Opcode::Mtlr => "mtlr",
            Opcode::Sc => "sc",
            Opcode::Nop => "nop",
        }
    }
}

/// A single instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Immediate value (also the normalized form of `PcRel`).
    Imm(i64),
    /// General-purpose register, by architectural index.
    Reg(u16),
    /// Special-purpose register (LR, CTR, ...).
    SpReg(u16),
    /// Condition register field.
    CondReg(u16),
    /// Memory reference.
    Mem(MemoryRef),
    /// Offset relative to the end of the current instruction. Never
    /// survives decoding: rewritten to `Imm` during normalization.
    PcRel(i64),
    /// Branch label.
    Label(u64),
    /// Raw displacement.
    Offset(i64),
}

/// Memory reference operand: `segment:[base + index*scale + displacement]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRef {
    /// Segment register index; 0 means no segmentation.
    pub segment: u16,
    /// Base register index.
    pub base: u16,
    /// Index register index.
    pub index: u16,
    /// Scale factor applied to the index register.
    pub scale: u8,
    /// Constant displacement.
    pub displacement: i64,
}

/// One decoded machine instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Opcode.
    pub opcode: Opcode,
    /// Operands, in encoding order.
    pub operands: Vec<Operand>,
    /// Encoded length in bytes. Always > 0 for a successful decode and
    /// at most [`MAX_INSTRUCTION_LENGTH`].
    pub len: usize,
    /// Reported width of the memory operand in bytes; 0 when the
    /// instruction has none.
    pub mem_bytes: usize,
}

impl Instruction {
    /// Encoded size of the instruction in bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Whether this instruction transfers control through the architecture's
    /// call/system-call opcode.
    pub fn is_call(&self) -> bool {
        self.opcode == Opcode::Sc
    }
}

/// Byte-level decoder and syntax renderer for the target architecture.
///
/// Supplied by the embedding debugger; this layer never interprets raw
/// encodings itself.
pub trait ArchDecoder {
    /// Decode one instruction starting at `mem[0]`, which lives at `pc` in
    /// the traced process.
    fn decode_one(&self, mem: &[u8], pc: u64) -> Result<Instruction, DecodeError>;

    /// Render a decoded instruction in the given assembly syntax.
    fn render(&self, inst: &Instruction, flavour: AssemblyFlavour) -> String;
}

/// Decodes one instruction and normalizes its PC-relative operands.
pub fn decode(decoder: &dyn ArchDecoder, mem: &[u8], pc: u64) -> Result<Instruction, DecodeError> {
    let raw = decoder.decode_one(mem, pc)?;
    Ok(normalize_pc_relative(raw, pc))
}

/// Rewrites every PC-relative operand to an absolute-address immediate.
///
/// Relative offsets are measured from the end of the encoded instruction,
/// so the encoded length participates in the rewrite. Instructions without
/// relative operands pass through unchanged.
pub fn normalize_pc_relative(mut inst: Instruction, pc: u64) -> Instruction {
    let len = inst.len as i64;
    for arg in &mut inst.operands {
        if let Operand::PcRel(offset) = *arg {
            *arg = Operand::Imm((pc as i64).wrapping_add(offset).wrapping_add(len));
        }
    }
    inst
}
