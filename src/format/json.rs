//! JSON and JSON Lines output formatters

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::InstructionFormatter;
use crate::{Address, DecodedInstruction, DisasmError};

/// Serializable instruction for JSON output
#[derive(Serialize, Deserialize)]
struct InstructionJson {
    /// Address of the instruction
    address: String,
    /// Size of the instruction in bytes
    size: usize,
    /// Delay-slot count
    delay_slots: u8,
    /// Control-flow classification
    #[serde(rename = "type")]
    insn_type: String,
    /// First branch target, "0x0" if unknown
    target: String,
    /// Second branch target, "0x0" if unknown
    target2: String,
    /// Printed instruction text
    text: String,
}

/// Serializable disassembly result for JSON output
#[derive(Serialize, Deserialize)]
struct DisassemblyJson {
    /// Base address of the decoded region
    base_address: String,
    /// Decoded instructions in address order
    instructions: Vec<InstructionJson>,
}

impl InstructionFormatter for super::JsonFormatter {
    fn format(
        &self,
        insns: &[DecodedInstruction],
        base_addr: Address,
    ) -> Result<String, DisasmError> {
        let result = DisassemblyJson {
            base_address: format!("0x{:x}", base_addr),
            instructions: insns.iter().map(instruction_to_json).collect(),
        };

        Ok(serde_json::to_string_pretty(&result)?)
    }
}

impl InstructionFormatter for super::JsonLinesFormatter {
    fn format(
        &self,
        insns: &[DecodedInstruction],
        base_addr: Address,
    ) -> Result<String, DisasmError> {
        let mut output = String::new();
        let base_addr_str = format!("0x{:x}", base_addr);

        for insn in insns {
            let line = json!({
                "base_address": base_addr_str,
                "address": format!("0x{:x}", insn.address),
                "size": insn.size,
                "delay_slots": insn.delay_slots,
                "type": insn.insn_type.to_string(),
                "target": format!("0x{:x}", insn.target),
                "target2": format!("0x{:x}", insn.target2),
                "text": insn.text,
            });

            output.push_str(&serde_json::to_string(&line)?);
            output.push('\n');
        }

        Ok(output)
    }
}

/// Convert an instruction to JSON format
fn instruction_to_json(insn: &DecodedInstruction) -> InstructionJson {
    InstructionJson {
        address: format!("0x{:x}", insn.address),
        size: insn.size,
        delay_slots: insn.delay_slots,
        insn_type: insn.insn_type.to_string(),
        target: format!("0x{:x}", insn.target),
        target2: format!("0x{:x}", insn.target2),
        text: insn.text.clone(),
    }
}
