//! End-to-end pipeline test: decode -> normalize -> classify -> resolve ->
//! render, plus the prologue scan, driven through the public API against a
//! synthetic ppc64le-like image.
//!
//! Run with: cargo test --test pipeline_test

use std::collections::HashMap;

use fathom::{
    decode, first_pc_after_prologue, format_listing, resolve_call_target, AccessError,
    ArchDecoder, AsmInstruction, AssemblyFlavour, DecodeError, DisassemblyDriver, Function,
    Instruction, LineResolver, Opcode, Operand, ProcessMemory, RegisterFile, SourceLocation,
    ThreadContext,
};

/// Fixed-width 4-byte toy encoding:
/// byte 0 = opcode tag, byte 1 = operand tag,
/// bytes 2..4 = operand payload (little-endian).
struct ToyIsa;

impl ToyIsa {
    fn opcode(tag: u8) -> Option<Opcode> {
        Some(match tag {
            0x00 => Opcode::Nop,
            0x01 => Opcode::Ld,
            0x02 => Opcode::Addi,
            0x03 => Opcode::Cmpld,
            0x04 => Opcode::Blt,
            0x05 => Opcode::Mflr,
            0x06 => Opcode::Bl,
            0x07 => Opcode::Sc,
            0x08 => Opcode::Blr,
            0x09 => Opcode::Stdu,
            _ => return None,
        })
    }

    fn operand(tag: u8, payload: i16) -> Option<Operand> {
        Some(match tag {
            0x00 => return None,
            0x01 => Operand::PcRel(payload as i64),
            0x02 => Operand::Reg(payload as u16),
            0x03 => Operand::Imm(payload as i64),
            _ => return None,
        })
    }
}

impl ArchDecoder for ToyIsa {
    fn decode_one(&self, mem: &[u8], pc: u64) -> Result<Instruction, DecodeError> {
        if mem.len() < 4 {
            return Err(DecodeError::Truncated {
                pc,
                needed: 4,
                available: mem.len(),
            });
        }
        let opcode = ToyIsa::opcode(mem[0]).ok_or(DecodeError::InvalidInstruction { pc })?;
        let payload = i16::from_le_bytes([mem[2], mem[3]]);
        let operands = ToyIsa::operand(mem[1], payload).into_iter().collect();
        Ok(Instruction {
            opcode,
            operands,
            len: 4,
            mem_bytes: 0,
        })
    }

    fn render(&self, inst: &Instruction, _flavour: AssemblyFlavour) -> String {
        let mut text = inst.opcode.mnemonic().to_string();
        for operand in &inst.operands {
            match operand {
                Operand::Imm(v) => text.push_str(&format!(" {:#x}", v)),
                Operand::Reg(n) => text.push_str(&format!(" r{}", n)),
                other => text.push_str(&format!(" {:?}", other)),
            }
        }
        text
    }
}

/// Symbol table with two functions.
struct Symbols;

const TICK_ENTRY: u64 = 0x1000;
const TICK_END: u64 = 0x1020;
const HELPER_ENTRY: u64 = 0x2000;
const HELPER_END: u64 = 0x2040;

impl LineResolver for Symbols {
    fn resolve_pc(&self, pc: u64) -> SourceLocation {
        let function = if (TICK_ENTRY..TICK_END).contains(&pc) {
            Some(Function {
                name: "main.tick".into(),
                entry: TICK_ENTRY,
                end: TICK_END,
            })
        } else if (HELPER_ENTRY..HELPER_END).contains(&pc) {
            Some(Function {
                name: "main.helper".into(),
                entry: HELPER_ENTRY,
                end: HELPER_END,
            })
        } else {
            None
        };
        SourceLocation {
            pc,
            file: "main.c".into(),
            line: 12,
            function,
        }
    }
}

struct Regs(HashMap<u16, u64>);

impl RegisterFile for Regs {
    fn get(&self, index: u16) -> Result<u64, AccessError> {
        self.0.get(&index).copied().ok_or(AccessError::Register {
            index,
            reason: "not captured".into(),
        })
    }
}

struct NoMemory;

impl ProcessMemory for NoMemory {
    fn read(&self, address: u64, _len: usize) -> Result<Vec<u8>, AccessError> {
        Err(AccessError::Memory {
            address,
            reason: "unmapped".into(),
        })
    }
}

/// In-memory code image disassembled on demand with [`ToyIsa`].
struct Image {
    base: u64,
    bytes: Vec<u8>,
}

impl Image {
    fn assemble(base: u64, units: &[[u8; 4]]) -> Self {
        Self {
            base,
            bytes: units.concat(),
        }
    }
}

impl DisassemblyDriver for Image {
    fn disassemble_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<AsmInstruction>, DecodeError> {
        let mut text = Vec::new();
        let mut pc = start;
        while pc < end {
            let offset = (pc - self.base) as usize;
            let inst = decode(&ToyIsa, &self.bytes[offset..], pc)?;
            let next = pc + inst.size() as u64;
            text.push(AsmInstruction {
                loc: Symbols.resolve_pc(pc),
                dest: resolve_call_target(&inst, ThreadContext::Inactive, &Symbols),
                inst: Some(inst),
            });
            pc = next;
        }
        Ok(text)
    }
}

/// main.tick: six-instruction frame-setup prologue, a call, a return.
fn tick_image() -> Image {
    let helper = (HELPER_ENTRY as u16).to_le_bytes();
    Image::assemble(
        TICK_ENTRY,
        &[
            [0x01, 0x02, 30, 0x00],             // ld r30
            [0x02, 0x02, 1, 0x00],              // addi r1
            [0x03, 0x00, 0x00, 0x00],           // cmpld
            [0x04, 0x01, 0x10, 0x00],           // blt +0x10
            [0x05, 0x00, 0x00, 0x00],           // mflr
            [0x06, 0x01, 0xf0, 0xff],           // bl -0x10
            [0x07, 0x03, helper[0], helper[1]], // sc 0x2000
            [0x08, 0x00, 0x00, 0x00],           // blr
        ],
    )
}

#[test]
fn decode_rewrites_relative_branches_to_absolute() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let image = tick_image();
    // The bl at entry+0x14 carries offset -0x10.
    let pc = TICK_ENTRY + 0x14;
    let inst = decode(&ToyIsa, &image.bytes[0x14..], pc)?;
    assert_eq!(inst.opcode, Opcode::Bl);
    assert_eq!(inst.operands[0], Operand::Imm((pc as i64) - 0x10 + 4));
    Ok(())
}

#[test]
fn prologue_scan_lands_on_the_call_after_frame_setup() -> anyhow::Result<()> {
    let image = tick_image();
    let pc = first_pc_after_prologue(&image, TICK_ENTRY, TICK_END, false)?;
    assert_eq!(pc, TICK_ENTRY + 6 * 4);

    // The same scan with line matching enabled still accepts the match:
    // the synthetic symbol table puts the whole body on one line.
    let pc = first_pc_after_prologue(&image, TICK_ENTRY, TICK_END, true)?;
    assert_eq!(pc, TICK_ENTRY + 6 * 4);
    Ok(())
}

#[test]
fn immediate_call_resolves_and_renders_with_callee_name() -> anyhow::Result<()> {
    let image = tick_image();
    let text = image.disassemble_range(TICK_ENTRY, TICK_END)?;

    let call = &text[6];
    assert!(call.is_call());
    let dest = call.dest.as_ref().expect("call target should resolve");
    assert_eq!(dest.pc, HELPER_ENTRY);
    assert_eq!(
        call.text(AssemblyFlavour::Gnu, &ToyIsa),
        "sc 0x2000 main.helper"
    );

    let listing = format_listing(&text, AssemblyFlavour::Gnu, &ToyIsa);
    assert!(listing.contains("0000000000001018  sc 0x2000 main.helper"));
    Ok(())
}

#[test]
fn register_indirect_call_needs_the_live_thread() {
    let inst = Instruction {
        opcode: Opcode::Sc,
        operands: vec![Operand::Reg(12)],
        len: 4,
        mem_bytes: 0,
    };

    // Suspended thread: registers must not be consulted.
    assert!(resolve_call_target(&inst, ThreadContext::Inactive, &Symbols).is_none());

    // Live thread: r12 holds the helper's entry address.
    let regs = Regs(HashMap::from([(12, HELPER_ENTRY)]));
    let mem = NoMemory;
    let ctx = ThreadContext::Active {
        registers: &regs,
        memory: &mem,
    };
    let target = resolve_call_target(&inst, ctx, &Symbols).expect("live resolution");
    assert_eq!(target.location.function.as_ref().map(|f| f.name.as_str()), Some("main.helper"));
}

#[test]
fn truncated_stream_aborts_the_range_scan() {
    let mut image = tick_image();
    image.bytes.truncate(image.bytes.len() - 2);
    let err = first_pc_after_prologue(&image, TICK_ENTRY, TICK_END, false).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }));
}
