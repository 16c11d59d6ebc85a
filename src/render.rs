//! Text Rendering - assembly output for analyzed instructions
//!
//! Rendering of the architecture's syntax is delegated to the byte-level
//! decoder collaborator; this layer annotates call instructions with the
//! resolved callee's name and formats instruction listings for display.

use std::fmt::Write;

use crate::context::{CallTarget, SourceLocation};
use crate::inst::{ArchDecoder, Instruction};

/// Assembly output syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyFlavour {
    /// GNU as syntax, the reference flavour for ppc64le.
    #[default]
    Gnu,
}

/// One entry of a disassembled instruction stream, as the debugger sees it.
#[derive(Debug, Clone)]
pub struct AsmInstruction {
    /// Where this instruction lives.
    pub loc: SourceLocation,
    /// Resolved call destination, when known.
    pub dest: Option<CallTarget>,
    /// Decoded form; `None` when decoding failed at this address.
    pub inst: Option<Instruction>,
}

impl AsmInstruction {
    /// Encoded size in bytes; 0 when decoding failed.
    pub fn size(&self) -> usize {
        self.inst.as_ref().map_or(0, Instruction::size)
    }

    /// Whether this is a call instruction. A decode failure is never a call.
    pub fn is_call(&self) -> bool {
        self.inst.as_ref().is_some_and(Instruction::is_call)
    }

    /// Renders the instruction in the given syntax, appending the resolved
    /// callee's name when this is a call into a known function. Decode
    /// failures render as a fixed placeholder.
    pub fn text(&self, flavour: AssemblyFlavour, renderer: &dyn ArchDecoder) -> String {
        let Some(inst) = &self.inst else {
            return "?".to_string();
        };

        let mut text = match flavour {
            AssemblyFlavour::Gnu => renderer.render(inst, flavour),
        };

        if self.is_call() {
            if let Some(func) = self.dest.as_ref().and_then(|d| d.location.function.as_ref()) {
                text.push(' ');
                text.push_str(&func.name);
            }
        }

        text
    }
}

/// Format instructions as an address/text table (for display).
pub fn format_listing(
    text: &[AsmInstruction],
    flavour: AssemblyFlavour,
    renderer: &dyn ArchDecoder,
) -> String {
    let mut output = String::new();
    for inst in text {
        // writing to a String cannot fail
        let _ = writeln!(
            output,
            "{:016x}  {}",
            inst.loc.pc,
            inst.text(flavour, renderer)
        );
    }
    output
}
