//! Prologue Scanning - locating the end of a function's stack-frame setup
//!
//! Function-entry breakpoints are placed after the prologue so they do not
//! trigger before local variables are live. The scanner matches the start
//! of a function's instruction stream against known prologue signatures.

use crate::context::DisassemblyDriver;
use crate::inst::{DecodeError, Opcode};
use crate::render::AsmInstruction;

/// The frame-setup sequence emitted at function entry on ppc64le.
const UNIX_PROLOGUE: &[Opcode] = &[
    Opcode::Ld,
    Opcode::Addi,
    Opcode::Cmpld,
    Opcode::Blt,
    Opcode::Mflr,
    Opcode::Bl,
];

/// Known prologue signatures, in match priority order.
const PROLOGUES: &[&[Opcode]] = &[UNIX_PROLOGUE];

/// Returns the address of the first instruction after the prologue of the
/// function spanning `[entry, end)`.
///
/// When `same_line` is set the returned address always shares the entry
/// instruction's source line. Falls back to `entry` when the body is empty
/// or no signature matches; a decode failure inside the range propagates,
/// and the caller's documented fallback for it is also `entry`.
pub fn first_pc_after_prologue(
    driver: &dyn DisassemblyDriver,
    entry: u64,
    end: u64,
    same_line: bool,
) -> Result<u64, DecodeError> {
    let text = driver.disassemble_range(entry, end)?;

    if text.is_empty() {
        return Ok(entry);
    }

    for prologue in PROLOGUES {
        // A signature that fills the whole body leaves no instruction to
        // return and must never be compared out of bounds.
        if prologue.len() >= text.len() {
            continue;
        }
        if !check_prologue(&text, prologue) {
            continue;
        }

        let candidate = &text[prologue.len()];
        if same_line && candidate.loc.line != text[0].loc.line {
            log::debug!(
                "prologue match at {:#x} rejected: line {} differs from entry line {}",
                candidate.loc.pc,
                candidate.loc.line,
                text[0].loc.line
            );
            return Ok(entry);
        }
        return Ok(candidate.loc.pc);
    }

    Ok(entry)
}

fn check_prologue(text: &[AsmInstruction], pattern: &[Opcode]) -> bool {
    pattern.iter().enumerate().all(|(i, op)| {
        text[i]
            .inst
            .as_ref()
            .map_or(false, |inst| inst.opcode == *op)
    })
}
