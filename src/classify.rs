//! Heuristic control-flow classification of printed instruction text.
//!
//! Rules operate on the decoder's textual output, not the encoding: a small,
//! ordered, per-family table of case-insensitive prefix/substring matches
//! assigns the branch kind, and the first `0x...` literal in the text is read
//! as the branch target. Coverage is intentionally asymmetric - only the ARM,
//! PowerPC, x86/IA-64 and Xtensa families have rules; every other
//! architecture degrades to [`InsnType::NonBranch`] with zero targets.

use crate::arch::ArchId;
use crate::{Address, InsnType};

/// Classification result: branch kind plus extracted targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    /// Control-flow class; defaults to non-branch when no rule matches
    pub insn_type: InsnType,
    /// First target address parsed from the text, 0 when absent
    pub target: Address,
    /// Second target address, 0 when absent
    pub target2: Address,
}

/// How a rule matches against the lowercased instruction text.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Text starts with the literal (note: may include a trailing space,
    /// so "b " matches an unconditional branch but not "bne")
    Prefix(&'static str),
    /// Literal occurs anywhere in the text
    Contains(&'static str),
}

impl Pattern {
    fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Prefix(p) => text.starts_with(p),
            Pattern::Contains(s) => text.contains(s),
        }
    }
}

/// One ordered classification rule.
struct Rule {
    pattern: Pattern,
    insn_type: InsnType,
    extract_target: bool,
}

const fn rule(pattern: Pattern, insn_type: InsnType, extract_target: bool) -> Rule {
    Rule {
        pattern,
        insn_type,
        extract_target,
    }
}

/// Architecture families with classification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Arm,
    PowerPc,
    X86,
    Xtensa,
}

static ARM_RULES: [Rule; 5] = [
    rule(Pattern::Prefix("bx"), InsnType::Branch, false),
    rule(Pattern::Contains("lr"), InsnType::Branch, false),
    rule(Pattern::Prefix("bl"), InsnType::SubroutineCall, true),
    rule(Pattern::Prefix("b "), InsnType::Branch, true),
    rule(Pattern::Prefix("b"), InsnType::ConditionalBranch, true),
];

static POWERPC_RULES: [Rule; 4] = [
    rule(Pattern::Prefix("blr"), InsnType::Branch, false),
    rule(Pattern::Prefix("bl "), InsnType::SubroutineCall, true),
    rule(Pattern::Prefix("b "), InsnType::Branch, true),
    rule(Pattern::Prefix("b"), InsnType::ConditionalBranch, true),
];

static X86_RULES: [Rule; 4] = [
    rule(Pattern::Prefix("ret"), InsnType::Branch, false),
    rule(Pattern::Prefix("jmp"), InsnType::Branch, true),
    rule(Pattern::Prefix("call"), InsnType::SubroutineCall, true),
    // JA, JAE, JB, JBE, JE, JNE, JZ and the rest of the Jcc set
    rule(Pattern::Prefix("j"), InsnType::ConditionalBranch, true),
];

static XTENSA_RULES: [Rule; 5] = [
    rule(Pattern::Prefix("ret"), InsnType::Branch, false),
    rule(Pattern::Prefix("break"), InsnType::Branch, false),
    rule(Pattern::Prefix("j"), InsnType::Branch, true),
    rule(Pattern::Prefix("call"), InsnType::SubroutineCall, true),
    rule(Pattern::Prefix("b"), InsnType::ConditionalBranch, true),
];

impl Family {
    fn of(arch: ArchId) -> Option<Family> {
        match arch {
            ArchId::Arm => Some(Family::Arm),
            ArchId::PowerPc => Some(Family::PowerPc),
            // IA-64 shares the x86 mnemonic conventions
            ArchId::X86 | ArchId::Ia64 => Some(Family::X86),
            ArchId::Xtensa => Some(Family::Xtensa),
            _ => None,
        }
    }

    /// Ordered rule table; most specific prefixes come first so a bare "b"
    /// prefix cannot shadow "bl", "bx" or "blx".
    fn rules(self) -> &'static [Rule] {
        match self {
            Family::Arm => &ARM_RULES,
            Family::PowerPc => &POWERPC_RULES,
            Family::X86 => &X86_RULES,
            Family::Xtensa => &XTENSA_RULES,
        }
    }
}

/// Classify one printed instruction line for the given architecture.
///
/// Never fails: architectures without a rule family, and text matching no
/// rule, come back as non-branch with zero targets.
pub fn classify(arch: ArchId, text: &str) -> Classification {
    let Some(family) = Family::of(arch) else {
        return Classification::default();
    };

    let lowered = text.to_lowercase();
    for rule in family.rules() {
        if rule.pattern.matches(&lowered) {
            let target = if rule.extract_target {
                parse_hex_target(&lowered)
            } else {
                0
            };
            return Classification {
                insn_type: rule.insn_type,
                target,
                target2: 0,
            };
        }
    }

    Classification::default()
}

/// Read the substring after the first "0x" as an unsigned hex integer.
/// Absence of a literal, or an unparsable one, yields 0 without error.
fn parse_hex_target(text: &str) -> Address {
    let Some(idx) = text.find("0x") else {
        return 0;
    };
    let hex = &text[idx + 2..];
    let end = hex
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(hex.len());
    u64::from_str_radix(&hex[..end], 16).unwrap_or(0)
}
