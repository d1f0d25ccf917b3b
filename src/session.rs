//! Decode session: lifecycle state plus the bulk and streaming decode loops.

use crate::arch::{ArchId, Endianness, MachineSubtype, ObjectInfo};
use crate::classify::{classify, Classification};
use crate::decoder::CapstoneDecoder;
use crate::registry;
use crate::stream::StreamBuffer;
use crate::{Address, CallbackError, DecodedInstruction, Decoder, DisasmError};

/// Decision a streaming callback returns after each delivered instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep decoding
    Continue,
    /// Stop the loop; bytes consumed so far are returned
    Stop,
}

/// Input bytes owned by a session, pinned to their load address.
#[derive(Debug)]
struct InputBuffer {
    bytes: Vec<u8>,
    load_address: Address,
}

/// One disassembly task: owns the input bytes, the output stream buffer,
/// and the decoder resolved for the bound architecture.
///
/// A session is bound to one logical thread of control; share it across
/// threads only behind external serialization. Lifecycle: create, bind an
/// architecture (or copy one off an opened object), attach an input buffer,
/// then decode any number of times. Rebinding the architecture or endianness
/// clears the resolved decoder so the next decode re-resolves it.
pub struct Session {
    arch: ArchId,
    machine: MachineSubtype,
    endian: Endianness,
    input: Option<InputBuffer>,
    decoder: Option<Box<dyn Decoder>>,
    out: StreamBuffer,
}

impl Session {
    /// Create an empty, unbound session with the default output capacity.
    pub fn new() -> Self {
        Self::with_output_capacity(StreamBuffer::DEFAULT_CAPACITY)
    }

    /// Create a session with a caller-chosen output buffer capacity.
    pub fn with_output_capacity(capacity: usize) -> Self {
        Self {
            arch: ArchId::Unknown,
            machine: MachineSubtype::Default,
            endian: Endianness::Unknown,
            input: None,
            decoder: None,
            out: StreamBuffer::with_capacity(capacity),
        }
    }

    /// Bind the architecture triple, deferring decoder resolution.
    ///
    /// Any previously resolved decoder is dropped; the fields may change
    /// again before the next decode call, which is when resolution happens.
    pub fn bind_architecture(
        &mut self,
        arch: ArchId,
        machine: MachineSubtype,
        endian: Endianness,
    ) {
        self.arch = arch;
        self.machine = machine;
        self.endian = endian;
        self.decoder = None;
    }

    /// Copy the architecture triple off an opened object descriptor and
    /// resolve the decoder immediately, failing if none is registered.
    pub fn bind_from_object(&mut self, object: &ObjectInfo) -> Result<(), DisasmError> {
        self.bind_architecture(object.architecture, object.machine, object.endianness());
        self.resolve_decoder()
    }

    /// Bind a caller-supplied decoder directly, bypassing the registry.
    pub fn bind_decoder(&mut self, decoder: Box<dyn Decoder>) {
        self.decoder = Some(decoder);
    }

    /// Update the machine subtype. The resolved decoder is kept: the subtype
    /// only narrows the decoding mode within the already-selected entry.
    pub fn set_machine(&mut self, machine: MachineSubtype) {
        self.machine = machine;
    }

    /// Update the endianness and drop the resolved decoder, since the
    /// registry column it was taken from no longer applies.
    pub fn set_endian(&mut self, endian: Endianness) {
        self.endian = endian;
        self.decoder = None;
    }

    /// Take ownership of a copy of `bytes`, releasing any previous input
    /// buffer first, and record the base virtual address for
    /// offset-to-address translation.
    pub fn set_input_buffer(&mut self, bytes: &[u8], load_address: Address) {
        self.input = Some(InputBuffer {
            bytes: bytes.to_vec(),
            load_address,
        });
    }

    /// Bound architecture id.
    pub fn architecture(&self) -> ArchId {
        self.arch
    }

    /// Bound machine subtype.
    pub fn machine(&self) -> MachineSubtype {
        self.machine
    }

    /// Bound endianness.
    pub fn endian(&self) -> Endianness {
        self.endian
    }

    /// Base virtual address of the input buffer, 0 when none is bound.
    pub fn load_address(&self) -> Address {
        self.input.as_ref().map_or(0, |i| i.load_address)
    }

    /// Length of the bound input buffer, 0 when none is bound.
    pub fn input_len(&self) -> usize {
        self.input.as_ref().map_or(0, |i| i.bytes.len())
    }

    /// Release the input and output buffers and consume the session.
    pub fn teardown(self) {
        // Drop does the actual work; this method exists so teardown reads
        // as an explicit lifecycle step at call sites.
    }

    /// Resolve the decoder through the registry if none is bound. Idempotent.
    pub fn resolve_decoder(&mut self) -> Result<(), DisasmError> {
        if self.decoder.is_some() {
            return Ok(());
        }
        let spec = registry::lookup(self.arch, self.endian).ok_or(
            DisasmError::UnsupportedArchitecture {
                arch: self.arch,
                endian: self.endian,
            },
        )?;
        self.decoder = Some(Box::new(CapstoneDecoder::from_spec(spec, self.machine)?));
        Ok(())
    }

    /// Bulk mode: decode the whole input buffer into an ordered, contiguous
    /// instruction sequence.
    pub fn disassemble(&mut self) -> Result<Vec<DecodedInstruction>, DisasmError> {
        self.resolve_decoder()?;
        let Some(decoder) = self.decoder.as_deref() else {
            return Err(DisasmError::UnsupportedArchitecture {
                arch: self.arch,
                endian: self.endian,
            });
        };
        let input = self.input.as_ref().ok_or(DisasmError::NoInput)?;

        let mut insns = Vec::new();
        let mut offset = 0usize;
        while offset < input.bytes.len() {
            let insn = decode_step(decoder, self.arch, input, offset, &mut self.out)?;
            offset += insn.size;
            insns.push(insn);
        }

        log::debug!(
            "disassembled {} instructions from {} bytes at 0x{:x}",
            insns.len(),
            input.bytes.len(),
            input.load_address
        );
        Ok(insns)
    }

    /// Streaming mode: decode from `start_offset`, delivering each
    /// instruction to `callback` and honoring its continue/stop decision.
    ///
    /// Returns the cumulative byte count decoded. A failing callback aborts
    /// the loop and surfaces as [`DisasmError::Callback`]; instructions
    /// already delivered are not retracted.
    pub fn disassemble_callback<F>(
        &mut self,
        start_offset: usize,
        mut callback: F,
    ) -> Result<usize, DisasmError>
    where
        F: FnMut(&DecodedInstruction) -> Result<Control, CallbackError>,
    {
        self.resolve_decoder()?;
        let Some(decoder) = self.decoder.as_deref() else {
            return Err(DisasmError::UnsupportedArchitecture {
                arch: self.arch,
                endian: self.endian,
            });
        };
        let input = self.input.as_ref().ok_or(DisasmError::NoInput)?;

        let mut offset = start_offset;
        let mut consumed = 0usize;
        while offset < input.bytes.len() {
            let insn = decode_step(decoder, self.arch, input, offset, &mut self.out)?;
            offset += insn.size;
            consumed += insn.size;

            match callback(&insn) {
                Ok(Control::Continue) => {}
                Ok(Control::Stop) => break,
                Err(e) => return Err(DisasmError::Callback(e)),
            }
        }

        log::debug!("streaming decode consumed {} bytes", consumed);
        Ok(consumed)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Step primitive shared by both decode modes: decode one instruction at
/// `offset`, classify its text, and emit the instruction record, leaving the
/// stream buffer reset for the next step.
fn decode_step(
    decoder: &dyn Decoder,
    arch: ArchId,
    input: &InputBuffer,
    offset: usize,
    out: &mut StreamBuffer,
) -> Result<DecodedInstruction, DisasmError> {
    let address = input.load_address + offset as Address;
    let step = decoder.decode(&input.bytes[offset..], address, out)?;
    if step.size == 0 {
        out.reset();
        return Err(DisasmError::DecodeStall(address));
    }

    let text = out.snapshot();
    out.reset();
    let Classification {
        insn_type,
        target,
        target2,
    } = classify(arch, &text);

    Ok(DecodedInstruction {
        address,
        size: step.size,
        delay_slots: step.delay_slots,
        insn_type,
        target,
        target2,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecodeStep, InsnType};

    // x86-64: push rbp; mov rbp, rsp; call -0x5d(rel); ret
    const X86_64_PROLOGUE: &[u8] = &[0x55, 0x48, 0x89, 0xe5, 0xe8, 0xa3, 0xff, 0xff, 0xff, 0xc3];

    fn x86_session(bytes: &[u8], vma: Address) -> Session {
        let mut session = Session::new();
        session.bind_architecture(ArchId::X86, MachineSubtype::X86_64, Endianness::Little);
        session.set_input_buffer(bytes, vma);
        session
    }

    /// Decoder that always reports zero consumed bytes.
    struct StallDecoder;

    impl Decoder for StallDecoder {
        fn decode(
            &self,
            _image: &[u8],
            _at: Address,
            out: &mut StreamBuffer,
        ) -> Result<DecodeStep, DisasmError> {
            out.append("(bad)")?;
            Ok(DecodeStep::default())
        }
    }

    /// Decoder that consumes fixed-size words and reports one delay slot.
    struct DelaySlotDecoder;

    impl Decoder for DelaySlotDecoder {
        fn decode(
            &self,
            _image: &[u8],
            at: Address,
            out: &mut StreamBuffer,
        ) -> Result<DecodeStep, DisasmError> {
            out.append(&format!("word 0x{:x}", at))?;
            Ok(DecodeStep {
                size: 4,
                delay_slots: 1,
            })
        }
    }

    #[test]
    fn test_bulk_decode_is_contiguous() {
        let mut session = x86_session(X86_64_PROLOGUE, 0x1000);
        let insns = session.disassemble().unwrap();

        assert_eq!(insns.len(), 4);
        assert_eq!(
            insns.iter().map(|i| i.size).sum::<usize>(),
            X86_64_PROLOGUE.len()
        );

        // Addresses follow loadAddress + cumulative offset with no gaps
        let mut expected = 0x1000;
        for insn in &insns {
            assert_eq!(insn.address, expected);
            expected += insn.size as Address;
        }

        assert!(insns[0].text.starts_with("push"));
        assert_eq!(insns[2].insn_type, InsnType::SubroutineCall);
        assert_eq!(insns[3].insn_type, InsnType::Branch); // ret
    }

    #[test]
    fn test_call_target_extraction() {
        let mut session = x86_session(X86_64_PROLOGUE, 0x1000);
        let insns = session.disassemble().unwrap();

        // call at 0x1004, rel32 = -0x5d, next insn at 0x1009
        assert_eq!(insns[2].address, 0x1004);
        assert_eq!(insns[2].target, 0x1009 - 0x5d);
    }

    #[test]
    fn test_decode_twice_yields_identical_text() {
        let mut session = x86_session(X86_64_PROLOGUE, 0x1000);
        let first = session.disassemble().unwrap();
        let second = session.disassemble().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_streaming_stop_after_k_steps() {
        let mut session = x86_session(X86_64_PROLOGUE, 0x1000);
        let mut delivered = Vec::new();

        let consumed = session
            .disassemble_callback(0, |insn| {
                delivered.push(insn.clone());
                Ok(if delivered.len() == 2 {
                    Control::Stop
                } else {
                    Control::Continue
                })
            })
            .unwrap();

        assert_eq!(delivered.len(), 2);
        assert_eq!(
            consumed,
            delivered.iter().map(|i| i.size).sum::<usize>()
        );
    }

    #[test]
    fn test_streaming_start_offset() {
        let mut session = x86_session(X86_64_PROLOGUE, 0x1000);
        let mut first = None;

        // Skip the 1-byte push, start at the mov
        session
            .disassemble_callback(1, |insn| {
                first.get_or_insert_with(|| insn.clone());
                Ok(Control::Continue)
            })
            .unwrap();

        assert_eq!(first.unwrap().address, 0x1001);
    }

    #[test]
    fn test_streaming_callback_error_propagates() {
        let mut session = x86_session(X86_64_PROLOGUE, 0x1000);
        let mut calls = 0;

        let err = session
            .disassemble_callback(0, |_| {
                calls += 1;
                if calls == 2 {
                    Err("host gave up".into())
                } else {
                    Ok(Control::Continue)
                }
            })
            .unwrap_err();

        assert!(matches!(err, DisasmError::Callback(_)));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_stall_is_fatal_in_bulk_mode() {
        let mut session = Session::new();
        session.bind_decoder(Box::new(StallDecoder));
        session.set_input_buffer(&[0x00], 0x2000);

        let err = session.disassemble().unwrap_err();
        assert!(matches!(err, DisasmError::DecodeStall(0x2000)));
    }

    #[test]
    fn test_stall_is_fatal_in_streaming_mode() {
        let mut session = Session::new();
        session.bind_decoder(Box::new(StallDecoder));
        session.set_input_buffer(&[0x00], 0x2000);

        let mut calls = 0;
        let err = session
            .disassemble_callback(0, |_| {
                calls += 1;
                Ok(Control::Continue)
            })
            .unwrap_err();

        assert!(matches!(err, DisasmError::DecodeStall(_)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_delay_slots_are_reported() {
        let mut session = Session::new();
        session.bind_decoder(Box::new(DelaySlotDecoder));
        session.set_input_buffer(&[0u8; 8], 0);

        let insns = session.disassemble().unwrap();
        assert_eq!(insns.len(), 2);
        assert!(insns.iter().all(|i| i.delay_slots == 1));
    }

    #[test]
    fn test_decode_without_input_fails() {
        let mut session = Session::new();
        session.bind_decoder(Box::new(StallDecoder));
        assert!(matches!(
            session.disassemble().unwrap_err(),
            DisasmError::NoInput
        ));
    }

    #[test]
    fn test_unresolvable_architecture() {
        let mut session = Session::new();
        session.bind_architecture(
            ArchId::Xtensa,
            MachineSubtype::Default,
            Endianness::Little,
        );
        session.set_input_buffer(&[0x90], 0);

        assert!(matches!(
            session.disassemble().unwrap_err(),
            DisasmError::UnsupportedArchitecture { .. }
        ));
    }

    #[test]
    fn test_bind_from_object_resolves_eagerly() {
        let mut session = Session::new();

        let good = ObjectInfo {
            architecture: ArchId::Mips,
            machine: MachineSubtype::Mips32,
            big_endian: true,
        };
        session.bind_from_object(&good).unwrap();
        assert_eq!(session.architecture(), ArchId::Mips);
        assert_eq!(session.endian(), Endianness::Big);

        let bad = ObjectInfo {
            architecture: ArchId::Xtensa,
            machine: MachineSubtype::Default,
            big_endian: false,
        };
        assert!(session.bind_from_object(&bad).is_err());
    }

    #[test]
    fn test_rebinding_clears_resolved_decoder() {
        let mut session = x86_session(&[0x90], 0);
        session.disassemble().unwrap();
        assert!(session.decoder.is_some());

        session.bind_architecture(ArchId::Arm, MachineSubtype::Arm, Endianness::Little);
        assert!(session.decoder.is_none());
    }

    #[test]
    fn test_set_machine_keeps_decoder_set_endian_clears_it() {
        let mut session = x86_session(&[0x90], 0);
        session.disassemble().unwrap();

        session.set_machine(MachineSubtype::I386);
        assert!(session.decoder.is_some());

        session.set_endian(Endianness::Big);
        assert!(session.decoder.is_none());
    }

    #[test]
    fn test_rebinding_input_replaces_previous_buffer() {
        let mut session = x86_session(&[0x90, 0x90], 0x1000);
        session.set_input_buffer(&[0xc3], 0x4000);

        assert_eq!(session.input_len(), 1);
        assert_eq!(session.load_address(), 0x4000);

        let insns = session.disassemble().unwrap();
        assert_eq!(insns.len(), 1);
        assert_eq!(insns[0].address, 0x4000);
    }

    #[test]
    fn test_arm_bl_decode_and_classification() {
        // str lr, [sp, #-4]!; bl 0xfbc (from 0x1004)
        let bytes = [0x04, 0xe0, 0x2d, 0xe5, 0xec, 0xff, 0xff, 0xeb];
        let mut session = Session::new();
        session.bind_architecture(ArchId::Arm, MachineSubtype::Arm, Endianness::Little);
        session.set_input_buffer(&bytes, 0x1000);

        let insns = session.disassemble().unwrap();
        assert_eq!(insns.len(), 2);
        assert_eq!(insns[1].insn_type, InsnType::SubroutineCall);
        assert_eq!(insns[1].target, 0xfbc);
    }
}
