//! Output format module implementation

mod csv;
mod json;

use std::fmt;
use std::str::FromStr;

use crate::{Address, DecodedInstruction, DisasmError};

/// Supported output formats for decoded instruction sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text output (default)
    Text,
    /// JSON format (hierarchical)
    Json,
    /// JSON Lines format (one JSON object per line)
    JsonLines,
    /// CSV format (comma-separated values)
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Get all available output formats
    pub fn available_formats() -> &'static [Self] {
        &[
            OutputFormat::Text,
            OutputFormat::Json,
            OutputFormat::JsonLines,
            OutputFormat::Csv,
        ]
    }

    /// Get a formatter for this output format
    pub fn get_formatter(&self) -> Box<dyn InstructionFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::JsonLines => Box::new(JsonLinesFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }
}

/// Formatter trait for decoded instruction sequences
pub trait InstructionFormatter {
    /// Render a decoded instruction sequence
    fn format(
        &self,
        insns: &[DecodedInstruction],
        base_addr: Address,
    ) -> Result<String, DisasmError>;
}

/// Format instructions in plain text
pub struct TextFormatter;

/// Format instructions in JSON
pub struct JsonFormatter;

/// Format instructions in JSON Lines
pub struct JsonLinesFormatter;

/// Format instructions in CSV
pub struct CsvFormatter;

impl InstructionFormatter for TextFormatter {
    fn format(
        &self,
        insns: &[DecodedInstruction],
        base_addr: Address,
    ) -> Result<String, DisasmError> {
        let mut output = String::new();
        output.push_str(&format!("Disassembly at 0x{:x}:\n\n", base_addr));

        for insn in insns {
            output.push_str(&format!(
                "0x{:08x}: {:<32} ; size={} type={}",
                insn.address, insn.text, insn.size, insn.insn_type
            ));
            if insn.target != 0 {
                output.push_str(&format!(" target=0x{:x}", insn.target));
            }
            if insn.target2 != 0 {
                output.push_str(&format!(" target2=0x{:x}", insn.target2));
            }
            if insn.delay_slots != 0 {
                output.push_str(&format!(" delay={}", insn.delay_slots));
            }
            output.push('\n');
        }

        Ok(output)
    }
}

#[cfg(test)]
pub(crate) fn sample_instructions() -> Vec<DecodedInstruction> {
    use crate::InsnType;

    vec![
        DecodedInstruction {
            address: 0x1000,
            size: 1,
            delay_slots: 0,
            insn_type: InsnType::NonBranch,
            target: 0,
            target2: 0,
            text: "push rbp".to_string(),
        },
        DecodedInstruction {
            address: 0x1001,
            size: 5,
            delay_slots: 0,
            insn_type: InsnType::SubroutineCall,
            target: 0x2000,
            target2: 0,
            text: "call 0x2000".to_string(),
        },
        DecodedInstruction {
            address: 0x1006,
            size: 1,
            delay_slots: 0,
            insn_type: InsnType::Branch,
            target: 0,
            target2: 0,
            text: "ret".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_formatter() {
        let insns = sample_instructions();
        let result = TextFormatter.format(&insns, 0x1000).unwrap();

        assert!(result.contains("Disassembly at 0x1000:"));
        assert!(result.contains("0x00001000: push rbp"));
        assert!(result.contains("type=call target=0x2000"));
        assert!(result.contains("0x00001006: ret"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("jsonl".parse::<OutputFormat>().unwrap(), OutputFormat::JsonLines);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_display_roundtrip() {
        for format in OutputFormat::available_formats() {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), *format);
        }
    }

    #[test]
    fn test_format_selection() {
        for format in OutputFormat::available_formats() {
            let _ = format.get_formatter();
        }
    }
}
