//! Collaborator Interfaces - live thread state and symbol resolution
//!
//! The analysis layer reads registers and memory of the traced process and
//! maps program counters to source locations, but owns none of that state.
//! These traits are implemented by the surrounding debugger.

use thiserror::Error;

use crate::inst::DecodeError;
use crate::render::AsmInstruction;

/// Register/memory access errors
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Failed to read register {index}: {reason}")]
    Register { index: u16, reason: String },

    #[error("Failed to read memory at {address:#x}: {reason}")]
    Memory { address: u64, reason: String },
}

/// Live register file of the thread being inspected.
pub trait RegisterFile {
    /// Value of the register with the given architectural index.
    fn get(&self, index: u16) -> Result<u64, AccessError>;
}

/// Read-only view of the traced process's memory.
pub trait ProcessMemory {
    /// Read `len` bytes starting at `address`.
    fn read(&self, address: u64, len: usize) -> Result<Vec<u8>, AccessError>;
}

/// Maps a program counter to file/line/function.
pub trait LineResolver {
    /// Location for `pc`. `function` is `None` when the address falls
    /// outside every known function; that is an expected state, not an
    /// error.
    fn resolve_pc(&self, pc: u64) -> SourceLocation;
}

/// Produces the ordered instruction stream for an address range.
pub trait DisassemblyDriver {
    /// Disassemble `[start, end)`, in address order.
    fn disassemble_range(&self, start: u64, end: u64)
        -> Result<Vec<AsmInstruction>, DecodeError>;
}

/// A function known to the symbol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Display name.
    pub name: String,
    /// Entry address.
    pub entry: u64,
    /// End address (exclusive).
    pub end: u64,
}

/// Source location resolved from a program counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The program counter this location was resolved from.
    pub pc: u64,
    /// Source file path.
    pub file: String,
    /// Source line.
    pub line: u32,
    /// Enclosing function, when the address maps to one.
    pub function: Option<Function>,
}

/// Resolved destination of a call instruction.
///
/// Only produced when the destination maps to a known function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    /// Destination program counter.
    pub pc: u64,
    /// Location of the destination.
    pub location: SourceLocation,
}

/// Live state of the thread an instruction belongs to.
///
/// Register contents are only trustworthy for the thread currently being
/// inspected. `Inactive` makes the "no usable registers" state structural
/// instead of a flag that call sites can forget to check.
#[derive(Clone, Copy)]
pub enum ThreadContext<'a> {
    /// The instruction belongs to the currently inspected thread, whose
    /// registers and memory can be read.
    Active {
        registers: &'a dyn RegisterFile,
        memory: &'a dyn ProcessMemory,
    },
    /// Any other thread; its register file must not be read on behalf of
    /// this instruction.
    Inactive,
}
