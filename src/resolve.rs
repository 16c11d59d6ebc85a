//! Call Target Resolution
//!
//! Computes the absolute destination address of a call instruction,
//! following register- and memory-indirect operands through the live
//! thread context when one is available. Every failure path uniformly
//! reports "no target"; the stepping logic treats that as "cannot predict
//! the destination, fall back to single-instruction stepping".

use crate::context::{CallTarget, LineResolver, ThreadContext};
use crate::inst::{Instruction, Operand};

/// Resolves the destination address of a call instruction.
///
/// Returns `None` whenever the destination cannot currently be determined:
/// the instruction is not a call, its operand needs the registers of a
/// thread that is not the one being inspected, a register or memory read
/// fails, or the destination lies outside every known function.
pub fn resolve_call_target(
    inst: &Instruction,
    ctx: ThreadContext<'_>,
    lines: &dyn LineResolver,
) -> Option<CallTarget> {
    if !inst.is_call() {
        return None;
    }

    let pc = match inst.operands.first()? {
        Operand::Imm(value) => *value as u64,
        Operand::Reg(index) | Operand::SpReg(index) | Operand::CondReg(index) => {
            let ThreadContext::Active { registers, .. } = ctx else {
                return None;
            };
            match registers.get(*index) {
                Ok(value) => value,
                Err(err) => {
                    log::debug!("call target register read failed: {}", err);
                    return None;
                }
            }
        }
        Operand::Mem(mem) => {
            let ThreadContext::Active { registers, memory } = ctx else {
                return None;
            };
            // Segmented addressing is not supported.
            if mem.segment != 0 {
                return None;
            }
            let base = registers.get(mem.base).ok()?;
            let index = registers.get(mem.index).ok()?;
            let addr = (base as i64)
                .wrapping_add(index.wrapping_mul(mem.scale as u64) as i64)
                .wrapping_add(mem.displacement) as u64;
            // TODO: decide whether this should always read 8 bytes instead
            // of the instruction's reported operand width.
            let bytes = match memory.read(addr, inst.mem_bytes) {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::debug!("call target memory read failed: {}", err);
                    return None;
                }
            };
            read_le_u64(&bytes)
        }
        // Normalization rewrites PcRel before resolution can see it; these
        // arms are defensive, not reachable in the intended flow.
        Operand::PcRel(_) | Operand::Label(_) | Operand::Offset(_) => return None,
    };

    let location = lines.resolve_pc(pc);
    if location.function.is_none() {
        // A call into unmapped or unknown code is not a usable target.
        return None;
    }
    Some(CallTarget { pc, location })
}

/// Little-endian read of up to 8 bytes, zero-extended.
fn read_le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}
