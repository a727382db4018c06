//! Property-based tests for instruction semantics and decoding.

use std::{sync::Arc, time::Duration};

use chip8_vm::{
    chip8::{Config, Machine, Opcode, OpcodeALU, SilentBeeper, disassemble},
    u4,
};
use proptest::prelude::*;

fn machine(program: &[u8]) -> Machine {
    let config = Config::default().with_timer_period(Duration::from_secs(3600));
    let mut machine = Machine::new(config, Arc::new(SilentBeeper)).unwrap();
    machine.load(program).unwrap();
    machine
}

const ALU_OPS: [OpcodeALU; 9] = [
    OpcodeALU::Set,
    OpcodeALU::Or,
    OpcodeALU::And,
    OpcodeALU::Xor,
    OpcodeALU::Add,
    OpcodeALU::Sub,
    OpcodeALU::ShiftRight,
    OpcodeALU::SubReverse,
    OpcodeALU::ShiftLeft,
];

/// Every known instruction, built from its operand fields.
fn known_opcode() -> impl Strategy<Value = Opcode> {
    (0usize..26, 0u8..16, 0u8..16, 0u8..16, any::<u8>(), 0u16..0x1000).prop_map(
        |(kind, x, y, n, nn, nnn)| {
            let (x, y, n) = (u4::new(x), u4::new(y), u4::new(n));
            match kind {
                0 => Opcode::ClearDisplay,
                1 => Opcode::Return,
                2 => Opcode::Jump { nnn },
                3 => Opcode::JumpWithOffset { nnn },
                4 => Opcode::Call { nnn },
                5 => Opcode::SkipRegEqualImm { x, nn },
                6 => Opcode::SkipRegNotEqualImm { x, nn },
                7 => Opcode::SkipRegEqualReg { x, y },
                8 => Opcode::SkipRegNotEqualReg { x, y },
                9 => Opcode::SetRegImm { x, nn },
                10 => Opcode::AddRegImm { x, nn },
                11 => Opcode::SetIndexImm { nnn },
                12 => Opcode::AddIndexReg { x },
                13 => Opcode::ALU {
                    x,
                    y,
                    op: ALU_OPS[n.value() as usize % ALU_OPS.len()],
                },
                14 => Opcode::Random { x, nn },
                15 => Opcode::Draw { x, y, n },
                16 => Opcode::SkipIfPressed { x },
                17 => Opcode::SkipIfNotPressed { x },
                18 => Opcode::WaitForKey { x },
                19 => Opcode::ReadDelayTimer { x },
                20 => Opcode::SetDelayTimer { x },
                21 => Opcode::SetSoundTimer { x },
                22 => Opcode::FontChar { x },
                23 => Opcode::BCD { x },
                24 => Opcode::StoreRegs { x },
                _ => Opcode::LoadRegs { x },
            }
        },
    )
}

/// Registers in the order the mnemonic prints them, and the immediate operand.
fn operand_fields(opcode: &Opcode) -> (Vec<u8>, Option<u16>) {
    match *opcode {
        Opcode::ClearDisplay | Opcode::Return | Opcode::Unknown(_) => (vec![], None),
        Opcode::Jump { nnn } | Opcode::Call { nnn } | Opcode::SetIndexImm { nnn } => {
            (vec![], Some(nnn))
        }
        Opcode::JumpWithOffset { nnn } => (vec![0], Some(nnn)),
        Opcode::SkipRegEqualImm { x, nn }
        | Opcode::SkipRegNotEqualImm { x, nn }
        | Opcode::SetRegImm { x, nn }
        | Opcode::AddRegImm { x, nn }
        | Opcode::Random { x, nn } => (vec![x.value()], Some(nn as u16)),
        Opcode::SkipRegEqualReg { x, y }
        | Opcode::SkipRegNotEqualReg { x, y }
        | Opcode::ALU { x, y, .. } => (vec![x.value(), y.value()], None),
        Opcode::Draw { x, y, n } => (vec![x.value(), y.value()], Some(n.value() as u16)),
        Opcode::AddIndexReg { x }
        | Opcode::SkipIfPressed { x }
        | Opcode::SkipIfNotPressed { x }
        | Opcode::WaitForKey { x }
        | Opcode::ReadDelayTimer { x }
        | Opcode::SetDelayTimer { x }
        | Opcode::SetSoundTimer { x }
        | Opcode::FontChar { x }
        | Opcode::BCD { x }
        | Opcode::StoreRegs { x }
        | Opcode::LoadRegs { x } => (vec![x.value()], None),
    }
}

/// Reads `Vx` registers and a `0x..` immediate back out of a mnemonic.
fn parse_operands(text: &str) -> (Vec<u8>, Option<u16>) {
    let mut registers = Vec::new();
    let mut immediate = None;

    for token in text.split([' ', ',']).filter(|t| !t.is_empty()).skip(1) {
        if let Some(hex) = token.strip_prefix("0x") {
            immediate = Some(u16::from_str_radix(hex, 16).unwrap());
        } else if let Some(reg) = token.strip_prefix('V') {
            registers.push(u8::from_str_radix(reg, 16).unwrap());
        }
    }

    (registers, immediate)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: 8xy4 stores the wrapped sum and VF is the carry out
    #[test]
    fn prop_add_sets_carry(a in any::<u8>(), b in any::<u8>()) {
        // LD V1, a; LD V2, b; ADD V1, V2
        let mut m = machine(&[0x61, a, 0x62, b, 0x81, 0x24]);
        for _ in 0..3 {
            m.step().unwrap();
        }

        let sum = a as u16 + b as u16;
        prop_assert_eq!(m.v()[1], sum as u8);
        prop_assert_eq!(m.v()[0xF], (sum > 0xFF) as u8);
    }

    /// Property: 8xy5 stores the wrapped difference and VF is set only when Vx > Vy
    #[test]
    fn prop_sub_sets_no_borrow(a in any::<u8>(), b in any::<u8>()) {
        // LD V1, a; LD V2, b; SUB V1, V2
        let mut m = machine(&[0x61, a, 0x62, b, 0x81, 0x25]);
        for _ in 0..3 {
            m.step().unwrap();
        }

        prop_assert_eq!(m.v()[1], a.wrapping_sub(b));
        prop_assert_eq!(m.v()[0xF], (a > b) as u8);
    }

    /// Property: drawing a sprite twice erases it and reports a collision iff it had pixels
    #[test]
    fn prop_draw_twice_restores_the_screen(
        x in any::<u8>(),
        y in any::<u8>(),
        sprite in proptest::collection::vec(any::<u8>(), 1..=15),
    ) {
        let n = sprite.len() as u8;
        // LD V0, x; LD V1, y; LD I, 0x300; DRW V0, V1, n; DRW V0, V1, n
        let mut program = vec![0x60, x, 0x61, y, 0xA3, 0x00, 0xD0, 0x10 | n, 0xD0, 0x10 | n];
        program.resize(0x100, 0);
        program.extend_from_slice(&sprite);
        let mut m = machine(&program);

        for _ in 0..4 {
            m.step().unwrap();
        }
        prop_assert_eq!(m.v()[0xF], 0);
        let drawn = m.frame_buffer().rows();
        let lit = drawn.iter().map(|row| row.count_ones()).sum::<u32>();
        prop_assert_eq!(lit, sprite.iter().map(|b| b.count_ones()).sum::<u32>());

        m.step().unwrap();
        prop_assert_eq!(m.v()[0xF], (lit > 0) as u8);
        prop_assert!(m.frame_buffer().rows().iter().all(|&row| row == 0));
    }

    /// Property: every word re-encodes to itself after decoding
    #[test]
    fn prop_decode_encode_round_trip(word in any::<u16>()) {
        let opcode = Opcode::decode(word);
        prop_assert_eq!(opcode.encode(), word);
        prop_assert_eq!(Opcode::decode(opcode.encode()), opcode);
    }

    /// Property: disassembly yields one decoded line per whole word, at consecutive addresses
    #[test]
    fn prop_disassembly_matches_decode(
        bytes in proptest::collection::vec(any::<u8>(), 0..64),
        base in 0u16..0x0F00,
    ) {
        let lines = disassemble(&bytes, base);
        prop_assert_eq!(lines.len(), bytes.len() / 2);

        for (k, line) in lines.iter().enumerate() {
            let word = u16::from_be_bytes([bytes[2 * k], bytes[2 * k + 1]]);
            prop_assert_eq!(line.address, base + 2 * k as u16);
            prop_assert_eq!(line.raw, word);
            prop_assert_eq!(line.opcode, Opcode::decode(word));
        }
    }

    /// Property: the disassembled mnemonic carries the same operand fields the word encodes
    #[test]
    fn prop_mnemonic_operands_decode_back(opcode in known_opcode()) {
        let word = opcode.encode();
        let lines = disassemble(&word.to_be_bytes(), 0x200);
        prop_assert_eq!(lines.len(), 1);
        prop_assert_eq!(lines[0].opcode, opcode);

        let text = lines[0].opcode.to_string();
        prop_assert_eq!(parse_operands(&text), operand_fields(&opcode), "{}", text);
    }
}
