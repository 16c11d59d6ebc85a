//! Fathom - Architecture Instruction Analysis
//!
//! The architecture-specific instruction-analysis layer of a native-process
//! debugger, targeting ppc64le. Given raw machine-code bytes captured from a
//! traced process, it decodes one instruction at a time, rewrites
//! PC-relative operands into absolute addresses, classifies call
//! instructions, resolves the concrete destination of a call when the
//! inspected thread's registers and memory are live, and scans function
//! bodies for the first address past the stack-frame prologue (used to
//! place function-entry breakpoints that do not trigger before local
//! variables are live).
//!
//! The byte-level decoder, its syntax renderer, thread/process access, and
//! symbol resolution are supplied by the embedding debugger through
//! [`inst::ArchDecoder`] and the traits in [`context`].

pub mod context;
pub mod inst;
pub mod prologue;
pub mod render;
pub mod resolve;

pub use context::{
    AccessError, CallTarget, DisassemblyDriver, Function, LineResolver, ProcessMemory,
    RegisterFile, SourceLocation, ThreadContext,
};
pub use inst::{
    decode, ArchDecoder, DecodeError, Instruction, MemoryRef, Opcode, Operand,
    MAX_INSTRUCTION_LENGTH,
};
pub use prologue::first_pc_after_prologue;
pub use render::{format_listing, AsmInstruction, AssemblyFlavour};
pub use resolve::resolve_call_target;
