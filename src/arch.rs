//! Architecture, machine subtype, and endianness identifiers.

use std::fmt;
use std::str::FromStr;

/// Supported architecture identifiers.
///
/// `Ia64` and `Xtensa` exist for instruction classification only; no decoder
/// is registered for them and resolving one fails with
/// [`DisasmError::UnsupportedArchitecture`](crate::DisasmError::UnsupportedArchitecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ArchId {
    /// x86 (32- or 64-bit, selected by machine subtype)
    X86,
    /// Intel IA-64
    Ia64,
    /// ARM (32-bit, ARM or Thumb mode)
    Arm,
    /// AArch64 (ARM 64-bit)
    AArch64,
    /// MIPS
    Mips,
    /// PowerPC
    PowerPc,
    /// SPARC
    Sparc,
    /// IBM System z
    SystemZ,
    /// Motorola 68k
    M68k,
    /// RISC-V
    RiscV,
    /// Tensilica Xtensa
    Xtensa,
    /// Unknown architecture
    Unknown,
}

impl fmt::Display for ArchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchId::X86 => write!(f, "x86"),
            ArchId::Ia64 => write!(f, "ia64"),
            ArchId::Arm => write!(f, "arm"),
            ArchId::AArch64 => write!(f, "aarch64"),
            ArchId::Mips => write!(f, "mips"),
            ArchId::PowerPc => write!(f, "powerpc"),
            ArchId::Sparc => write!(f, "sparc"),
            ArchId::SystemZ => write!(f, "s390"),
            ArchId::M68k => write!(f, "m68k"),
            ArchId::RiscV => write!(f, "riscv"),
            ArchId::Xtensa => write!(f, "xtensa"),
            ArchId::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ArchId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "i386" => Ok(ArchId::X86),
            "ia64" => Ok(ArchId::Ia64),
            "arm" => Ok(ArchId::Arm),
            "aarch64" | "arm64" => Ok(ArchId::AArch64),
            "mips" => Ok(ArchId::Mips),
            "powerpc" | "ppc" => Ok(ArchId::PowerPc),
            "sparc" => Ok(ArchId::Sparc),
            "s390" | "systemz" => Ok(ArchId::SystemZ),
            "m68k" => Ok(ArchId::M68k),
            "riscv" => Ok(ArchId::RiscV),
            "xtensa" => Ok(ArchId::Xtensa),
            _ => Err(format!("Unknown architecture: {}", s)),
        }
    }
}

/// Machine subtype refining a generic architecture id.
///
/// The subtype narrows the decoding mode the way BFD's `mach` field steers
/// its per-architecture printers: `X86` + `I386` decodes 32-bit code,
/// `Arm` + `Thumb` decodes Thumb, and so on. `Default` leaves the registry
/// entry's default mode in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum MachineSubtype {
    /// Use the architecture's default decoding mode
    #[default]
    Default,
    /// 32-bit x86
    I386,
    /// 64-bit x86
    X86_64,
    /// ARM mode
    Arm,
    /// Thumb mode
    Thumb,
    /// MIPS32
    Mips32,
    /// MIPS64
    Mips64,
    /// PowerPC 32-bit
    Ppc32,
    /// PowerPC 64-bit
    Ppc64,
    /// RISC-V 32-bit
    RiscV32,
    /// RISC-V 64-bit
    RiscV64,
}

impl fmt::Display for MachineSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineSubtype::Default => write!(f, "default"),
            MachineSubtype::I386 => write!(f, "i386"),
            MachineSubtype::X86_64 => write!(f, "x86-64"),
            MachineSubtype::Arm => write!(f, "arm"),
            MachineSubtype::Thumb => write!(f, "thumb"),
            MachineSubtype::Mips32 => write!(f, "mips32"),
            MachineSubtype::Mips64 => write!(f, "mips64"),
            MachineSubtype::Ppc32 => write!(f, "ppc32"),
            MachineSubtype::Ppc64 => write!(f, "ppc64"),
            MachineSubtype::RiscV32 => write!(f, "riscv32"),
            MachineSubtype::RiscV64 => write!(f, "riscv64"),
        }
    }
}

impl FromStr for MachineSubtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "" => Ok(MachineSubtype::Default),
            "i386" => Ok(MachineSubtype::I386),
            "x86-64" | "x86_64" => Ok(MachineSubtype::X86_64),
            "arm" => Ok(MachineSubtype::Arm),
            "thumb" => Ok(MachineSubtype::Thumb),
            "mips32" => Ok(MachineSubtype::Mips32),
            "mips64" => Ok(MachineSubtype::Mips64),
            "ppc32" => Ok(MachineSubtype::Ppc32),
            "ppc64" => Ok(MachineSubtype::Ppc64),
            "riscv32" => Ok(MachineSubtype::RiscV32),
            "riscv64" => Ok(MachineSubtype::RiscV64),
            _ => Err(format!("Unknown machine subtype: {}", s)),
        }
    }
}

/// Byte order of the code being disassembled.
///
/// `Unknown` is accepted everywhere an endianness is taken; the registry
/// falls back to its little-endian column for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    /// Most significant byte first
    Big,
    /// Least significant byte first
    Little,
    /// Byte order not specified
    #[default]
    Unknown,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Big => write!(f, "big"),
            Endianness::Little => write!(f, "little"),
            Endianness::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Endianness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "big" | "be" => Ok(Endianness::Big),
            "little" | "le" => Ok(Endianness::Little),
            "unknown" | "mono" => Ok(Endianness::Unknown),
            _ => Err(format!("Unknown endianness: {}", s)),
        }
    }
}

/// Architecture triple copied off an already-opened object file.
///
/// The object-file collaborator that parsed the container hands one of these
/// to [`Session::bind_from_object`](crate::Session::bind_from_object); this
/// crate never opens files itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Architecture reported by the object file headers
    pub architecture: ArchId,
    /// Machine subtype reported by the object file headers
    pub machine: MachineSubtype,
    /// Whether the object's code is big-endian
    pub big_endian: bool,
}

impl ObjectInfo {
    /// Endianness flag as the session-level enum.
    pub fn endianness(&self) -> Endianness {
        if self.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ArchId::X86, "x86")]
    #[case(ArchId::Arm, "arm")]
    #[case(ArchId::PowerPc, "powerpc")]
    #[case(ArchId::Xtensa, "xtensa")]
    fn test_arch_display_roundtrip(#[case] arch: ArchId, #[case] name: &str) {
        assert_eq!(arch.to_string(), name);
        assert_eq!(name.parse::<ArchId>().unwrap(), arch);
    }

    #[test]
    fn test_arch_aliases() {
        assert_eq!("i386".parse::<ArchId>().unwrap(), ArchId::X86);
        assert_eq!("arm64".parse::<ArchId>().unwrap(), ArchId::AArch64);
        assert_eq!("ppc".parse::<ArchId>().unwrap(), ArchId::PowerPc);
        assert!("z80".parse::<ArchId>().is_err());
    }

    #[test]
    fn test_object_info_endianness() {
        let obj = ObjectInfo {
            architecture: ArchId::Mips,
            machine: MachineSubtype::Mips32,
            big_endian: true,
        };
        assert_eq!(obj.endianness(), Endianness::Big);
    }
}
