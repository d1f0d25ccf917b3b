//! CSV output formatter

use super::InstructionFormatter;
use crate::{Address, DecodedInstruction, DisasmError};

impl InstructionFormatter for super::CsvFormatter {
    fn format(
        &self,
        insns: &[DecodedInstruction],
        base_addr: Address,
    ) -> Result<String, DisasmError> {
        let mut output = String::new();
        let base_addr_str = format!("0x{:x}", base_addr);

        // CSV header
        output.push_str("base_address,address,size,delay_slots,type,target,target2,text\n");

        for insn in insns {
            // Escape the text field, which may contain commas between operands
            let text = escape_csv_field(&insn.text);

            output.push_str(&format!(
                "{},0x{:x},{},{},{},0x{:x},0x{:x},{}\n",
                base_addr_str,
                insn.address,
                insn.size,
                insn.delay_slots,
                insn.insn_type,
                insn.target,
                insn.target2,
                text
            ));
        }

        Ok(output)
    }
}

/// Quote a field if it contains CSV metacharacters
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
