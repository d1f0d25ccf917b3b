//! Capstone-based instruction decoder behind the registry contract.

use capstone::{Capstone, NO_EXTRA_MODE};

use crate::arch::MachineSubtype;
use crate::registry::{self, DecoderSpec};
use crate::stream::StreamBuffer;
use crate::{Address, DecodeStep, Decoder, DisasmError, MAX_INSTRUCTION_SIZE};

/// Decoder backed by a Capstone handle built for one arch/mode/endian triple.
pub struct CapstoneDecoder {
    cs: Capstone,
}

// SAFETY: Capstone's C-API handle is thread-safe if you never call
// `disasm_*` concurrently on the *same* handle; a session owns its decoder
// exclusively and serializes all calls through `&mut Session`.
unsafe impl Send for CapstoneDecoder {}
unsafe impl Sync for CapstoneDecoder {}

impl CapstoneDecoder {
    /// Build a decoder from a registry entry, letting the machine subtype
    /// refine the entry's default decoding mode.
    pub fn from_spec(spec: &DecoderSpec, machine: MachineSubtype) -> Result<Self, DisasmError> {
        let mode = registry::mode_for(machine).unwrap_or(spec.mode);
        let cs = Capstone::new_raw(spec.arch, mode, NO_EXTRA_MODE, Some(spec.endian))?;
        Ok(Self { cs })
    }
}

impl Decoder for CapstoneDecoder {
    fn decode(
        &self,
        image: &[u8],
        at: Address,
        out: &mut StreamBuffer,
    ) -> Result<DecodeStep, DisasmError> {
        if image.is_empty() {
            return Ok(DecodeStep::default());
        }

        // Only look at a small window (16 bytes max)
        let window = &image[..image.len().min(MAX_INSTRUCTION_SIZE)];
        let insns = self.cs.disasm_count(window, at, 1)?;
        let Some(insn) = insns.iter().next() else {
            // Undecodable bytes; the loop controller raises DecodeStall
            return Ok(DecodeStep::default());
        };

        // Space-joined mnemonic and operands, the textual shape the
        // classifier's prefix rules expect ("b 0x1000" vs "bne 0x1000").
        let mnemonic = insn.mnemonic().unwrap_or("");
        match insn.op_str() {
            Some(ops) if !ops.is_empty() => out.append(&format!("{} {}", mnemonic, ops))?,
            _ => out.append(mnemonic)?,
        }

        Ok(DecodeStep {
            size: insn.bytes().len(),
            // Capstone reports no delay-slot metadata without detail mode
            delay_slots: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{ArchId, Endianness};

    fn decoder_for(arch: ArchId, machine: MachineSubtype, endian: Endianness) -> CapstoneDecoder {
        let spec = registry::lookup(arch, endian).unwrap();
        CapstoneDecoder::from_spec(spec, machine).unwrap()
    }

    #[test]
    fn test_x86_decode_writes_text() {
        // mov eax, 1
        let bytes = [0xb8, 0x01, 0x00, 0x00, 0x00];
        let decoder = decoder_for(ArchId::X86, MachineSubtype::I386, Endianness::Little);
        let mut out = StreamBuffer::new();

        let step = decoder.decode(&bytes, 0, &mut out).unwrap();
        assert_eq!(step.size, 5);
        assert!(out.as_str().starts_with("mov"));
    }

    #[test]
    fn test_undecodable_bytes_report_zero() {
        // 0xff alone is not a complete x86 instruction
        let decoder = decoder_for(ArchId::X86, MachineSubtype::X86_64, Endianness::Little);
        let mut out = StreamBuffer::new();

        let step = decoder.decode(&[0xff], 0, &mut out).unwrap();
        assert_eq!(step.size, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_input_reports_zero() {
        let decoder = decoder_for(ArchId::X86, MachineSubtype::X86_64, Endianness::Little);
        let mut out = StreamBuffer::new();

        let step = decoder.decode(&[], 0x1000, &mut out).unwrap();
        assert_eq!(step.size, 0);
    }

    #[test]
    fn test_operandless_instruction_has_no_separator() {
        // ret
        let decoder = decoder_for(ArchId::X86, MachineSubtype::X86_64, Endianness::Little);
        let mut out = StreamBuffer::new();

        decoder.decode(&[0xc3], 0, &mut out).unwrap();
        assert_eq!(out.as_str(), "ret");
    }

    #[test]
    fn test_machine_subtype_selects_mode() {
        // 0x48 0x89 0xe5 is "mov rbp, rsp" in 64-bit mode; in 32-bit mode
        // 0x48 decodes alone as "dec eax".
        let bytes = [0x48, 0x89, 0xe5];
        let mut out = StreamBuffer::new();

        let d64 = decoder_for(ArchId::X86, MachineSubtype::X86_64, Endianness::Little);
        let step = d64.decode(&bytes, 0, &mut out).unwrap();
        assert_eq!(step.size, 3);

        out.reset();
        let d32 = decoder_for(ArchId::X86, MachineSubtype::I386, Endianness::Little);
        let step = d32.decode(&bytes, 0, &mut out).unwrap();
        assert_eq!(step.size, 1);
        assert!(out.as_str().starts_with("dec"));
    }
}
