use super::{
    Chip8Error, FONT_START_ADDRESS, GLYPH_HEIGHT, Machine, MEMORY_SIZE, Opcode, OpcodeALU,
    StepOutcome, machine::mem_index,
};
use crate::u4;

const ADDRESS_MASK: u16 = (MEMORY_SIZE - 1) as u16;

impl Machine {
    pub(crate) fn execute(
        &mut self,
        opcode: Opcode,
        address: u16,
        raw: u16,
    ) -> Result<StepOutcome, Chip8Error> {
        self.pc = self.pc.wrapping_add(2) & ADDRESS_MASK;

        match opcode {
            Opcode::ClearDisplay => {
                self.frame_buffer.clear();
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into()) & ADDRESS_MASK;
            }
            Opcode::Call { nnn } => {
                if let Some(limit) = self.config.stack_limit
                    && self.stack.len() >= limit
                {
                    return Err(Chip8Error::StackOverflow {
                        address,
                        opcode: raw,
                        limit,
                    });
                }
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self.stack.pop().ok_or(Chip8Error::StackUnderflow {
                    address,
                    opcode: raw,
                })?;
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let byte = self
                    .random
                    .random_byte()
                    .map_err(|source| Chip8Error::RandomSource {
                        address,
                        opcode: raw,
                        source,
                    })?;
                self.v[x] = byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into()) & ADDRESS_MASK;
            }
            Opcode::Draw { x, y, n } => {
                self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(self.keyboard.is_pressed(self.v[x]));
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!self.keyboard.is_pressed(self.v[x]));
            }
            Opcode::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x, address));
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer.read();
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer.set(self.v[x]);
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer.set(self.v[x]);
            }
            Opcode::FontChar { x } => {
                let digit = (self.v[x] & 0x0F) as usize;
                self.i = (FONT_START_ADDRESS + digit * GLYPH_HEIGHT) as u16;
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                self.mem_write(self.i, value / 100);
                self.mem_write(self.i.wrapping_add(1), (value / 10) % 10);
                self.mem_write(self.i.wrapping_add(2), value % 10);
            }
            Opcode::StoreRegs { x } => {
                for reg_index in 0..=usize::from(x) {
                    self.mem_write(self.i.wrapping_add(reg_index as u16), self.v[reg_index]);
                }
            }
            Opcode::LoadRegs { x } => {
                for reg_index in 0..=usize::from(x) {
                    self.v[reg_index] = self.mem_read(self.i.wrapping_add(reg_index as u16));
                }
            }
            Opcode::Unknown(opcode) => {
                return Err(Chip8Error::Decode { address, opcode });
            }
        };

        Ok(StepOutcome::Executed)
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU) {
        let (vx, vy) = (self.v[x], self.v[y]);

        // SUB, SUBN and the shifts write VF first, so with x = F the result wins.
        // ADD writes VF last.
        match op {
            OpcodeALU::Set => self.v[x] = vy,
            OpcodeALU::Or => self.v[x] = vx | vy,
            OpcodeALU::And => self.v[x] = vx & vy,
            OpcodeALU::Xor => self.v[x] = vx ^ vy,
            OpcodeALU::Add => {
                let (sum, carry) = vx.overflowing_add(vy);
                self.v[x] = sum;
                self.v[0xF] = carry as u8;
            }
            OpcodeALU::Sub => {
                self.v[0xF] = (vx > vy) as u8;
                self.v[x] = vx.wrapping_sub(vy);
            }
            OpcodeALU::SubReverse => {
                self.v[0xF] = (vy > vx) as u8;
                self.v[x] = vy.wrapping_sub(vx);
            }
            OpcodeALU::ShiftRight => {
                self.v[0xF] = vx & 1;
                self.v[x] = vx >> 1;
            }
            OpcodeALU::ShiftLeft => {
                self.v[0xF] = vx >> 7;
                self.v[x] = vx << 1;
            }
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) {
        let sprite: Vec<u8> = (0..u16::from(n))
            .map(|row| self.mem_read(self.i.wrapping_add(row)))
            .collect();

        let collision = self.frame_buffer.draw_sprite(self.v[x], self.v[y], &sprite);
        self.v[0xF] = collision as u8;
    }

    fn execute_wait_for_key(&mut self, x: u4, address: u16) -> StepOutcome {
        match self.keyboard.next_press() {
            key if key < 16 => {
                self.v[x] = key;
                StepOutcome::Executed
            }
            _ => {
                // Stay on this instruction until a key is held
                self.pc = address;
                StepOutcome::AwaitingKey
            }
        }
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2) & ADDRESS_MASK;
        }
    }

    fn mem_read(&self, addr: u16) -> u8 {
        self.memory[mem_index(addr)]
    }

    fn mem_write(&mut self, addr: u16, value: u8) {
        self.memory[mem_index(addr)] = value;
    }
}
