use std::fmt;

use crate::u4;

/// CHIP-8 instruction opcodes.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// 1nnn - Jump to location nnn.
    Jump { nnn: u16 },
    /// Bnnn - Jump to location nnn + V0.
    JumpWithOffset { nnn: u16 },

    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u16 },
    /// 00EE - Return from a subroutine.
    Return,

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipRegEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipRegNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipRegEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipRegNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetRegImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn.
    AddRegImm { x: u4, nn: u8 },
    /// Annn - Set I = nnn.
    SetIndexImm { nnn: u16 },
    /// Fx1E - Set I = I + Vx.
    AddIndexReg { x: u4 },

    /// 8xyN - ALU operations
    ALU { x: u4, y: u4, op: OpcodeALU },
    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// Dxyn - Display sprite.
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key with the value of Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key with the value of Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Wait for a key press, store the value of the key in Vx.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer value.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = location of sprite for digit Vx.
    FontChar { x: u4 },
    /// Fx33 - Store BCD representation of Vx in memory locations I, I+1, and I+2.
    BCD { x: u4 },

    /// Fx55 - Store registers V0 through Vx in memory starting at location I.
    StoreRegs { x: u4 },
    /// Fx65 - Read registers V0 through Vx from memory starting at location I.
    LoadRegs { x: u4 },

    /// A word matching no entry of the decode table.
    Unknown(u16),
}

/// ALU operations for the 8xyN instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeALU {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = Vx > Vy
    Sub,
    /// 8xy6 - Vx = Vx SHR 1
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = Vy > Vx
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1
    ShiftLeft,
}

impl OpcodeALU {
    fn from_nibble(n: u8) -> Option<Self> {
        Some(match n {
            0x0 => OpcodeALU::Set,
            0x1 => OpcodeALU::Or,
            0x2 => OpcodeALU::And,
            0x3 => OpcodeALU::Xor,
            0x4 => OpcodeALU::Add,
            0x5 => OpcodeALU::Sub,
            0x6 => OpcodeALU::ShiftRight,
            0x7 => OpcodeALU::SubReverse,
            0xE => OpcodeALU::ShiftLeft,
            _ => return None,
        })
    }

    fn nibble(self) -> u16 {
        match self {
            OpcodeALU::Set => 0x0,
            OpcodeALU::Or => 0x1,
            OpcodeALU::And => 0x2,
            OpcodeALU::Xor => 0x3,
            OpcodeALU::Add => 0x4,
            OpcodeALU::Sub => 0x5,
            OpcodeALU::ShiftRight => 0x6,
            OpcodeALU::SubReverse => 0x7,
            OpcodeALU::ShiftLeft => 0xE,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            OpcodeALU::Set => "LD",
            OpcodeALU::Or => "OR",
            OpcodeALU::And => "AND",
            OpcodeALU::Xor => "XOR",
            OpcodeALU::Add => "ADD",
            OpcodeALU::Sub => "SUB",
            OpcodeALU::ShiftRight => "SHR",
            OpcodeALU::SubReverse => "SUBN",
            OpcodeALU::ShiftLeft => "SHL",
        }
    }
}

impl Opcode {
    /// Decode a 16-bit raw opcode into an `Opcode` enum variant.
    pub fn decode(opcode: u16) -> Self {
        let [high, low] = opcode.to_be_bytes();
        let nibble = (
            u4::high(high).value(),
            u4::low(high).value(),
            u4::high(low).value(),
            u4::low(low).value(),
        );

        let x = u4::low(high);
        let y = u4::high(low);
        let n = u4::low(low);
        let nn = low;
        let nnn = opcode & 0x0FFF;

        match nibble {
            (0x0, 0x0, 0xE, 0x0) => Opcode::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Opcode::Return,
            (0x1, _, _, _) => Opcode::Jump { nnn },
            (0x2, _, _, _) => Opcode::Call { nnn },
            (0x3, _, _, _) => Opcode::SkipRegEqualImm { x, nn },
            (0x4, _, _, _) => Opcode::SkipRegNotEqualImm { x, nn },
            (0x5, _, _, 0x0) => Opcode::SkipRegEqualReg { x, y },
            (0x6, _, _, _) => Opcode::SetRegImm { x, nn },
            (0x7, _, _, _) => Opcode::AddRegImm { x, nn },
            (0x8, _, _, op) => match OpcodeALU::from_nibble(op) {
                Some(op) => Opcode::ALU { x, y, op },
                None => Opcode::Unknown(opcode),
            },
            (0x9, _, _, 0x0) => Opcode::SkipRegNotEqualReg { x, y },
            (0xA, _, _, _) => Opcode::SetIndexImm { nnn },
            (0xB, _, _, _) => Opcode::JumpWithOffset { nnn },
            (0xC, _, _, _) => Opcode::Random { x, nn },
            (0xD, _, _, _) => Opcode::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Opcode::SkipIfPressed { x },
            (0xE, _, 0xA, 0x1) => Opcode::SkipIfNotPressed { x },
            (0xF, _, 0x0, 0x7) => Opcode::ReadDelayTimer { x },
            (0xF, _, 0x0, 0xA) => Opcode::WaitForKey { x },
            (0xF, _, 0x1, 0x5) => Opcode::SetDelayTimer { x },
            (0xF, _, 0x1, 0x8) => Opcode::SetSoundTimer { x },
            (0xF, _, 0x1, 0xE) => Opcode::AddIndexReg { x },
            (0xF, _, 0x2, 0x9) => Opcode::FontChar { x },
            (0xF, _, 0x3, 0x3) => Opcode::BCD { x },
            (0xF, _, 0x5, 0x5) => Opcode::StoreRegs { x },
            (0xF, _, 0x6, 0x5) => Opcode::LoadRegs { x },

            _ => Opcode::Unknown(opcode),
        }
    }

    /// Re-assembles the raw 16-bit word; `decode(op.encode()) == op`.
    pub fn encode(&self) -> u16 {
        let xy = |head: u16, x: u4, y: u4, tail: u16| {
            head << 12 | u16::from(x) << 8 | u16::from(y) << 4 | tail
        };
        let xnn = |head: u16, x: u4, nn: u8| head << 12 | u16::from(x) << 8 | nn as u16;
        let fx = |x: u4, tail: u16| 0xF000 | u16::from(x) << 8 | tail;

        match *self {
            Opcode::ClearDisplay => 0x00E0,
            Opcode::Return => 0x00EE,
            Opcode::Jump { nnn } => 0x1000 | nnn & 0x0FFF,
            Opcode::Call { nnn } => 0x2000 | nnn & 0x0FFF,
            Opcode::SkipRegEqualImm { x, nn } => xnn(0x3, x, nn),
            Opcode::SkipRegNotEqualImm { x, nn } => xnn(0x4, x, nn),
            Opcode::SkipRegEqualReg { x, y } => xy(0x5, x, y, 0x0),
            Opcode::SetRegImm { x, nn } => xnn(0x6, x, nn),
            Opcode::AddRegImm { x, nn } => xnn(0x7, x, nn),
            Opcode::ALU { x, y, op } => xy(0x8, x, y, op.nibble()),
            Opcode::SkipRegNotEqualReg { x, y } => xy(0x9, x, y, 0x0),
            Opcode::SetIndexImm { nnn } => 0xA000 | nnn & 0x0FFF,
            Opcode::JumpWithOffset { nnn } => 0xB000 | nnn & 0x0FFF,
            Opcode::Random { x, nn } => xnn(0xC, x, nn),
            Opcode::Draw { x, y, n } => xy(0xD, x, y, n.into()),
            Opcode::SkipIfPressed { x } => 0xE09E | u16::from(x) << 8,
            Opcode::SkipIfNotPressed { x } => 0xE0A1 | u16::from(x) << 8,
            Opcode::ReadDelayTimer { x } => fx(x, 0x07),
            Opcode::WaitForKey { x } => fx(x, 0x0A),
            Opcode::SetDelayTimer { x } => fx(x, 0x15),
            Opcode::SetSoundTimer { x } => fx(x, 0x18),
            Opcode::AddIndexReg { x } => fx(x, 0x1E),
            Opcode::FontChar { x } => fx(x, 0x29),
            Opcode::BCD { x } => fx(x, 0x33),
            Opcode::StoreRegs { x } => fx(x, 0x55),
            Opcode::LoadRegs { x } => fx(x, 0x65),
            Opcode::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Opcode::ClearDisplay => write!(f, "CLS"),
            Opcode::Return => write!(f, "RET"),
            Opcode::Jump { nnn } => write!(f, "JP 0x{nnn:03X}"),
            Opcode::JumpWithOffset { nnn } => write!(f, "JP V0, 0x{nnn:03X}"),
            Opcode::Call { nnn } => write!(f, "CALL 0x{nnn:03X}"),
            Opcode::SkipRegEqualImm { x, nn } => write!(f, "SE V{x}, 0x{nn:02X}"),
            Opcode::SkipRegNotEqualImm { x, nn } => write!(f, "SNE V{x}, 0x{nn:02X}"),
            Opcode::SkipRegEqualReg { x, y } => write!(f, "SE V{x}, V{y}"),
            Opcode::SkipRegNotEqualReg { x, y } => write!(f, "SNE V{x}, V{y}"),
            Opcode::SetRegImm { x, nn } => write!(f, "LD V{x}, 0x{nn:02X}"),
            Opcode::AddRegImm { x, nn } => write!(f, "ADD V{x}, 0x{nn:02X}"),
            Opcode::SetIndexImm { nnn } => write!(f, "LD I, 0x{nnn:03X}"),
            Opcode::AddIndexReg { x } => write!(f, "ADD I, V{x}"),
            Opcode::ALU { x, y, op } => write!(f, "{} V{x}, V{y}", op.mnemonic()),
            Opcode::Random { x, nn } => write!(f, "RND V{x}, 0x{nn:02X}"),
            Opcode::Draw { x, y, n } => write!(f, "DRW V{x}, V{y}, 0x{n}"),
            Opcode::SkipIfPressed { x } => write!(f, "SKP V{x}"),
            Opcode::SkipIfNotPressed { x } => write!(f, "SKNP V{x}"),
            Opcode::WaitForKey { x } => write!(f, "LD V{x}, K"),
            Opcode::ReadDelayTimer { x } => write!(f, "LD V{x}, DT"),
            Opcode::SetDelayTimer { x } => write!(f, "LD DT, V{x}"),
            Opcode::SetSoundTimer { x } => write!(f, "LD ST, V{x}"),
            Opcode::FontChar { x } => write!(f, "LD F, V{x}"),
            Opcode::BCD { x } => write!(f, "LD B, V{x}"),
            Opcode::StoreRegs { x } => write!(f, "LD [I], V{x}"),
            Opcode::LoadRegs { x } => write!(f, "LD V{x}, [I]"),
            Opcode::Unknown(_) => write!(f, "???"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fixed_words() {
        assert_eq!(Opcode::decode(0x00E0), Opcode::ClearDisplay);
        assert_eq!(Opcode::decode(0x00EE), Opcode::Return);
        assert_eq!(Opcode::decode(0x1ABC), Opcode::Jump { nnn: 0xABC });
        assert_eq!(
            Opcode::decode(0xD125),
            Opcode::Draw {
                x: u4::new(1),
                y: u4::new(2),
                n: u4::new(5)
            }
        );
        assert_eq!(
            Opcode::decode(0x8AB7),
            Opcode::ALU {
                x: u4::new(0xA),
                y: u4::new(0xB),
                op: OpcodeALU::SubReverse
            }
        );
    }

    #[test]
    fn unmatched_words_are_unknown() {
        for raw in [0x0000, 0x00E1, 0x0123, 0x5121, 0x8128, 0x912F, 0xE19F, 0xF1FF] {
            assert_eq!(Opcode::decode(raw), Opcode::Unknown(raw), "{raw:#06X}");
        }
    }

    #[test]
    fn renders_mnemonics() {
        assert_eq!(Opcode::decode(0x00E0).to_string(), "CLS");
        assert_eq!(Opcode::decode(0x2300).to_string(), "CALL 0x300");
        assert_eq!(Opcode::decode(0x3A0F).to_string(), "SE VA, 0x0F");
        assert_eq!(Opcode::decode(0x8016).to_string(), "SHR V0, V1");
        assert_eq!(Opcode::decode(0xB123).to_string(), "JP V0, 0x123");
        assert_eq!(Opcode::decode(0xD01F).to_string(), "DRW V0, V1, 0xF");
        assert_eq!(Opcode::decode(0xF30A).to_string(), "LD V3, K");
        assert_eq!(Opcode::decode(0xF965).to_string(), "LD V9, [I]");
        assert_eq!(Opcode::decode(0xFFFF).to_string(), "???");
    }
}
