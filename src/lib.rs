//! Core types, decoder contract, and errors for the opstream disassembly engine.
//!
//! This library drives architecture-dispatched instruction decoding through a
//! stateful [`Session`]: a static registry maps an architecture/endianness pair
//! to a decoder, the decoder prints each instruction into a growable stream
//! buffer, and a per-architecture heuristic classifier derives control-flow
//! metadata (branch kind and jump targets) from the printed text.
//!
//! Object-file introspection is deliberately not part of this crate. A caller
//! that has already opened a binary hands over an architecture id, a machine
//! subtype, an endianness flag, and a byte buffer with its load address.
//!
//! # Basic Usage
//!
//! ```rust
//! use opstream::{ArchId, Endianness, MachineSubtype, Session};
//!
//! let mut session = Session::new();
//! session.bind_architecture(ArchId::X86, MachineSubtype::X86_64, Endianness::Little);
//! // push rbp; mov rbp, rsp; ret
//! session.set_input_buffer(&[0x55, 0x48, 0x89, 0xe5, 0xc3], 0x1000);
//!
//! for insn in session.disassemble().unwrap() {
//!     println!("0x{:x}: {} ({:?})", insn.address, insn.text, insn.insn_type);
//! }
//! ```

pub mod arch;
pub mod classify;
pub mod decoder;
pub mod format;
pub mod registry;
pub mod session;
pub mod stream;
#[cfg(feature = "extension-module")]
pub mod python;

pub use arch::{ArchId, Endianness, MachineSubtype, ObjectInfo};
pub use classify::{classify, Classification};
pub use decoder::CapstoneDecoder;
pub use session::{Control, Session};
pub use stream::StreamBuffer;

/// Represents an address in memory
pub type Address = u64;

/// Maximum instruction size in bytes
pub const MAX_INSTRUCTION_SIZE: usize = 16;

/// Boxed error returned by a host-supplied streaming callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

use std::fmt;

/// Control-flow class assigned to a decoded instruction.
///
/// Discriminants follow BFD's `dis_insn_type` numbering so the values survive
/// round-trips through foreign bindings unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum InsnType {
    /// Not a branch instruction
    #[default]
    NonBranch = 1,
    /// Unconditional branch
    Branch = 2,
    /// Conditional branch
    ConditionalBranch = 3,
    /// Jump to subroutine
    SubroutineCall = 4,
}

impl fmt::Display for InsnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsnType::NonBranch => write!(f, "non-branch"),
            InsnType::Branch => write!(f, "branch"),
            InsnType::ConditionalBranch => write!(f, "cond-branch"),
            InsnType::SubroutineCall => write!(f, "call"),
        }
    }
}

/// One decoded instruction.
///
/// Produced fresh per decode step and immutable once returned. The `text`
/// field owns a copy of the printed line; the session's stream buffer is
/// reset and reused immediately afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Virtual address of the instruction
    pub address: Address,
    /// Size of the instruction in bytes
    pub size: usize,
    /// Number of delay-slot instructions following a branch (0 if not applicable)
    pub delay_slots: u8,
    /// Control-flow classification derived from the printed text
    pub insn_type: InsnType,
    /// First branch/call target parsed out of the text, 0 if unknown
    pub target: Address,
    /// Second target address, 0 if unknown
    pub target2: Address,
    /// Printed instruction text (mnemonic and operands)
    pub text: String,
}

/// What a decoder reports back for a single decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeStep {
    /// Bytes consumed; 0 means the bytes could not be decoded
    pub size: usize,
    /// Delay-slot count reported by the backend, 0 when unavailable
    pub delay_slots: u8,
}

/// Decoder trait: architecture-specific disassembler.
///
/// A decoder prints exactly one formatted instruction line into `out` as a
/// side effect and reports the consumed byte count. Reporting a size of 0
/// signals undecodable input; the decode loop turns that into a fatal
/// [`DisasmError::DecodeStall`] rather than resynchronizing silently.
pub trait Decoder: Send + Sync {
    /// Decode a single instruction.
    ///
    /// # Arguments
    /// * `image` - Remaining input bytes, starting at the current offset
    /// * `at` - Absolute virtual address of `image[0]`
    /// * `out` - Stream buffer receiving the printed instruction text
    fn decode(
        &self,
        image: &[u8],
        at: Address,
        out: &mut StreamBuffer,
    ) -> Result<DecodeStep, DisasmError>;
}

/// Error type for disassembly operations
#[derive(Debug, thiserror::Error)]
pub enum DisasmError {
    /// No decoder registered for the requested architecture/endianness pair
    #[error("no disassembler registered for {arch} ({endian} endian)")]
    UnsupportedArchitecture { arch: ArchId, endian: Endianness },

    /// Output stream buffer growth failed
    #[error("output stream buffer growth failed: {0}")]
    Resource(#[from] std::collections::TryReserveError),

    /// The bound decoder consumed zero bytes, which would stall the loop forever
    #[error("decoder consumed zero bytes at 0x{0:x}")]
    DecodeStall(Address),

    /// A host-supplied streaming callback failed
    #[error("decode callback failed: {0}")]
    Callback(#[source] CallbackError),

    /// Decode was requested before an input buffer was bound
    #[error("no input buffer bound to session")]
    NoInput,

    /// Capstone error
    #[error("capstone error: {0}")]
    Capstone(#[from] capstone::Error),

    /// Output serialization error
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
