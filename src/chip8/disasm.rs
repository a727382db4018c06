use std::fmt;

use super::Opcode;

/// One decoded instruction word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisasmLine {
    pub address: u16,
    pub raw: u16,
    pub opcode: Opcode,
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:03X}   {:04X}   {}", self.address, self.raw, self.opcode)
    }
}

/// Decodes `bytes` as consecutive instruction words, the first at `base`.
///
/// A trailing odd byte is ignored.
pub fn disassemble(bytes: &[u8], base: u16) -> Vec<DisasmLine> {
    bytes
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let raw = u16::from_be_bytes([pair[0], pair[1]]);
            DisasmLine {
                address: base.wrapping_add(i as u16 * 2),
                raw,
                opcode: Opcode::decode(raw),
            }
        })
        .collect()
}

/// Disassembly listing, one line per instruction.
pub fn disassemble_to_string(bytes: &[u8], base: u16) -> String {
    disassemble(bytes, base)
        .iter()
        .map(|line| format!("{line}\n"))
        .collect()
}
