//! Static table mapping (architecture, endianness) to a decoder specification.

use capstone::{Arch, Endian, Mode};

use crate::arch::{ArchId, Endianness, MachineSubtype};

/// Capstone configuration a registry entry resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderSpec {
    /// Capstone architecture
    pub arch: Arch,
    /// Default decoding mode, refined by the machine subtype at build time
    pub mode: Mode,
    /// Byte order the handle is built with
    pub endian: Endian,
}

const fn spec(arch: Arch, mode: Mode, endian: Endian) -> DecoderSpec {
    DecoderSpec { arch, mode, endian }
}

/// One supported architecture with its little- and big-endian decoder columns.
///
/// Entries with a single byte order repeat the same spec in both columns, the
/// same shape BFD's `print_insn_*` table uses.
struct RegistryEntry {
    arch: ArchId,
    little: DecoderSpec,
    big: DecoderSpec,
}

const fn entry(arch: ArchId, little: DecoderSpec, big: DecoderSpec) -> RegistryEntry {
    RegistryEntry { arch, little, big }
}

/// Process-wide decoder table. Built at compile time, immutable thereafter,
/// safe for unsynchronized concurrent reads.
static SUPPORTED_DECODERS: &[RegistryEntry] = &[
    entry(
        ArchId::X86,
        spec(Arch::X86, Mode::Mode64, Endian::Little),
        spec(Arch::X86, Mode::Mode64, Endian::Little),
    ),
    entry(
        ArchId::Arm,
        spec(Arch::ARM, Mode::Arm, Endian::Little),
        spec(Arch::ARM, Mode::Arm, Endian::Big),
    ),
    entry(
        ArchId::AArch64,
        spec(Arch::ARM64, Mode::Arm, Endian::Little),
        spec(Arch::ARM64, Mode::Arm, Endian::Big),
    ),
    entry(
        ArchId::Mips,
        spec(Arch::MIPS, Mode::Mips32, Endian::Little),
        spec(Arch::MIPS, Mode::Mips32, Endian::Big),
    ),
    entry(
        ArchId::PowerPc,
        spec(Arch::PPC, Mode::Mode32, Endian::Little),
        spec(Arch::PPC, Mode::Mode32, Endian::Big),
    ),
    entry(
        ArchId::Sparc,
        spec(Arch::SPARC, Mode::Default, Endian::Big),
        spec(Arch::SPARC, Mode::Default, Endian::Big),
    ),
    entry(
        ArchId::SystemZ,
        spec(Arch::SYSZ, Mode::Default, Endian::Big),
        spec(Arch::SYSZ, Mode::Default, Endian::Big),
    ),
    entry(
        ArchId::M68k,
        spec(Arch::M68K, Mode::Default, Endian::Big),
        spec(Arch::M68K, Mode::Default, Endian::Big),
    ),
    entry(
        ArchId::RiscV,
        spec(Arch::RISCV, Mode::RiscV64, Endian::Little),
        spec(Arch::RISCV, Mode::RiscV64, Endian::Little),
    ),
];

/// Look up the decoder specification for an architecture/endianness pair.
///
/// Big-endian requests take the big column; anything else, including an
/// unknown byte order, falls back to the little-endian column. Unregistered
/// architectures return `None`.
pub fn lookup(arch: ArchId, endian: Endianness) -> Option<&'static DecoderSpec> {
    SUPPORTED_DECODERS
        .iter()
        .find(|e| e.arch == arch)
        .map(|e| match endian {
            Endianness::Big => &e.big,
            _ => &e.little,
        })
}

/// Architectures with a registered decoder, in table order.
pub fn supported_architectures() -> impl Iterator<Item = ArchId> {
    SUPPORTED_DECODERS.iter().map(|e| e.arch)
}

/// Mode override a machine subtype imposes on the entry's default mode.
pub(crate) fn mode_for(machine: MachineSubtype) -> Option<Mode> {
    match machine {
        MachineSubtype::Default => None,
        MachineSubtype::I386 => Some(Mode::Mode32),
        MachineSubtype::X86_64 => Some(Mode::Mode64),
        MachineSubtype::Arm => Some(Mode::Arm),
        MachineSubtype::Thumb => Some(Mode::Thumb),
        MachineSubtype::Mips32 => Some(Mode::Mips32),
        MachineSubtype::Mips64 => Some(Mode::Mips64),
        MachineSubtype::Ppc32 => Some(Mode::Mode32),
        MachineSubtype::Ppc64 => Some(Mode::Mode64),
        MachineSubtype::RiscV32 => Some(Mode::RiscV32),
        MachineSubtype::RiscV64 => Some(Mode::RiscV64),
    }
}
