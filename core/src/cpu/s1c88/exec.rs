//! Base opcode table (0x00-0xFF, less the 0xCE/0xCF extension prefixes).
//!
//! The low half of the table is regular: opcode bits select an ALU function
//! or load direction plus one of eight operand forms, so those rows share a
//! single decode. The rest dispatches per opcode.

use crate::core::bus::Bus;

use super::{Cond, S1C88};

/// ALU functions packed into opcode bits 3-5 of rows 0x00-0x3F.
#[derive(Clone, Copy, PartialEq)]
enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Or,
    Cp,
    Xor,
}

const ALU_OPS: [AluOp; 8] = [
    AluOp::Add,
    AluOp::Adc,
    AluOp::Sub,
    AluOp::Sbc,
    AluOp::And,
    AluOp::Or,
    AluOp::Cp,
    AluOp::Xor,
];

impl S1C88 {
    fn alu_apply(&mut self, op: AluOp, lhs: u8, rhs: u8) -> u8 {
        match op {
            AluOp::Add => self.add_u8(lhs, rhs),
            AluOp::Adc => self.adc_u8(lhs, rhs),
            AluOp::Sub => self.sub_u8(lhs, rhs),
            AluOp::Sbc => self.sbc_u8(lhs, rhs),
            AluOp::And => self.and_u8(lhs, rhs),
            AluOp::Or => self.or_u8(lhs, rhs),
            AluOp::Xor => self.xor_u8(lhs, rhs),
            AluOp::Cp => {
                self.cp_u8(lhs, rhs);
                lhs
            }
        }
    }

    /// Operand forms of rows 0x00-0x3F, selected by opcode bits 0-2:
    /// A, B, #nn, [HL], [BR+#nn], [#nnnn], [IX], [IY].
    fn alu_operand<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: u8) -> (u8, u32) {
        match mode {
            0 => (self.a, 8),
            1 => (self.b, 8),
            2 => {
                let imm = self.fetch_u8(bus);
                (imm, 8)
            }
            3 => (bus.read_u8(self.hl_ex), 8),
            4 => {
                let addr = self.fetch_br(bus);
                (bus.read_u8(addr), 12)
            }
            5 => {
                let addr = self.fetch_abs(bus);
                (bus.read_u8(addr), 16)
            }
            6 => (bus.read_u8(self.ix_ex), 8),
            _ => (bus.read_u8(self.iy_ex), 8),
        }
    }

    /// Source forms of the LD rows 0x40-0x7F, selected by opcode bits 0-2:
    /// A, B, L, H, [BR+#nn], [HL], [IX], [IY].
    fn ld_source<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: u8) -> (u8, bool) {
        match mode {
            0 => (self.a, false),
            1 => (self.b, false),
            2 => (self.l, false),
            3 => (self.h, false),
            4 => {
                let addr = self.fetch_br(bus);
                (bus.read_u8(addr), true)
            }
            5 => (bus.read_u8(self.hl_ex), false),
            6 => (bus.read_u8(self.ix_ex), false),
            _ => (bus.read_u8(self.iy_ex), false),
        }
    }

    fn reg8(&self, index: u8) -> u8 {
        match index & 3 {
            0 => self.a,
            1 => self.b,
            2 => self.l,
            _ => self.h,
        }
    }

    fn set_reg8(&mut self, index: u8, value: u8) {
        match index & 3 {
            0 => self.a = value,
            1 => self.b = value,
            2 => self.l = value,
            _ => self.h = value,
        }
    }

    /// 16-bit register pair by index: BA, HL, IX, IY.
    pub(crate) fn reg16(&self, index: u8) -> u16 {
        match index & 3 {
            0 => self.ba(),
            1 => self.hl(),
            2 => self.ix,
            _ => self.iy,
        }
    }

    pub(crate) fn set_reg16(&mut self, index: u8, value: u16) {
        match index & 3 {
            0 => self.set_ba(value),
            1 => self.set_hl(value),
            2 => self.ix = value,
            _ => self.iy = value,
        }
    }

    /// JRS cc #ss / CARS cc #ss with a one-byte base opcode.
    fn branch_short<B: Bus + ?Sized>(&mut self, bus: &mut B, cond: Cond, call: bool) -> u32 {
        let offset = self.fetch_s8(bus) as i16;
        if !self.cond(cond) {
            return 8;
        }
        let target = self.rel_target(offset, 1);
        if call {
            self.call_to(bus, target);
            20
        } else {
            self.branch_to(target);
            8
        }
    }

    /// JRL cc #ssss / CARL cc #ssss.
    fn branch_long<B: Bus + ?Sized>(&mut self, bus: &mut B, cond: Cond, call: bool) -> u32 {
        let offset = self.fetch_u16(bus) as i16;
        if !self.cond(cond) {
            return 12;
        }
        let target = self.rel_target(offset, 2);
        if call {
            self.call_to(bus, target);
            24
        } else {
            self.branch_to(target);
            12
        }
    }
}

pub(super) fn execute<B: Bus + ?Sized>(cpu: &mut S1C88, bus: &mut B, op: u8) -> u32 {
    match op {
        // ALU A, src
        0x00..=0x3F => {
            let func = ALU_OPS[(op >> 3) as usize];
            let mode = op & 7;
            let (operand, cycles) = cpu.alu_operand(bus, mode);
            let result = cpu.alu_apply(func, cpu.a, operand);
            if func != AluOp::Cp {
                cpu.a = result;
            }
            // AND/OR/XOR via [BR+#nn] cost 8 cycles, not 12.
            if mode == 4 && matches!(func, AluOp::And | AluOp::Or | AluOp::Xor) {
                8
            } else {
                cycles
            }
        }

        // LD r, src
        0x40..=0x5F => {
            let mode = op & 7;
            let (value, br_form) = cpu.ld_source(bus, mode);
            cpu.set_reg8(op >> 3, value);
            if br_form {
                12
            } else if mode < 4 {
                4
            } else {
                8
            }
        }

        // LD [IX]/[HL]/[IY], src
        0x60..=0x77 => {
            let dest = match (op >> 3) & 3 {
                0 => cpu.ix_ex,
                1 => cpu.hl_ex,
                _ => cpu.iy_ex,
            };
            let mode = op & 7;
            let (value, br_form) = cpu.ld_source(bus, mode);
            bus.write_u8(dest, value);
            if br_form {
                16
            } else if mode < 4 {
                8
            } else {
                12
            }
        }

        // LD [BR + #nn], src (0x7C undefined)
        0x78..=0x7B | 0x7D..=0x7F => {
            let dest = cpu.fetch_br(bus);
            let mode = op & 7;
            let value = match mode {
                0 => cpu.a,
                1 => cpu.b,
                2 => cpu.l,
                3 => cpu.h,
                5 => bus.read_u8(cpu.hl_ex),
                6 => bus.read_u8(cpu.ix_ex),
                _ => bus.read_u8(cpu.iy_ex),
            };
            bus.write_u8(dest, value);
            if mode < 4 { 12 } else { 16 }
        }

        // INC r
        0x80..=0x83 => {
            let value = cpu.inc_u8(cpu.reg8(op));
            cpu.set_reg8(op, value);
            8
        }
        0x84 => {
            cpu.br = cpu.inc_u8(cpu.br);
            8
        }
        0x85 => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let value = cpu.inc_u8(value);
            bus.write_u8(addr, value);
            16
        }
        0x86 => {
            let value = bus.read_u8(cpu.hl_ex);
            let value = cpu.inc_u8(value);
            bus.write_u8(cpu.hl_ex, value);
            12
        }
        0x87 => {
            cpu.sp = cpu.inc_u16(cpu.sp);
            8
        }

        // DEC r
        0x88..=0x8B => {
            let value = cpu.dec_u8(cpu.reg8(op));
            cpu.set_reg8(op, value);
            8
        }
        0x8C => {
            cpu.br = cpu.dec_u8(cpu.br);
            8
        }
        0x8D => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let value = cpu.dec_u8(value);
            bus.write_u8(addr, value);
            16
        }
        0x8E => {
            let value = bus.read_u8(cpu.hl_ex);
            let value = cpu.dec_u8(value);
            bus.write_u8(cpu.hl_ex, value);
            12
        }
        0x8F => {
            cpu.sp = cpu.dec_u16(cpu.sp);
            8
        }

        // INC rr
        0x90..=0x93 => {
            let value = cpu.inc_u16(cpu.reg16(op));
            cpu.set_reg16(op, value);
            8
        }

        // BIT
        0x94 => {
            cpu.bit_u8(cpu.a, cpu.b);
            8
        }
        0x95 => {
            let value = bus.read_u8(cpu.hl_ex);
            let imm = cpu.fetch_u8(bus);
            cpu.bit_u8(value, imm);
            12
        }
        0x96 => {
            let imm = cpu.fetch_u8(bus);
            cpu.bit_u8(cpu.a, imm);
            8
        }
        0x97 => {
            let imm = cpu.fetch_u8(bus);
            cpu.bit_u8(cpu.b, imm);
            8
        }

        // DEC rr
        0x98..=0x9B => {
            let value = cpu.dec_u16(cpu.reg16(op));
            cpu.set_reg16(op, value);
            8
        }

        // AND/OR/XOR/LD SC, #nn
        0x9C => {
            let imm = cpu.fetch_u8(bus);
            cpu.sc = cpu.and_u8(cpu.sc, imm);
            cpu.skip_irq = true;
            12
        }
        0x9D => {
            let imm = cpu.fetch_u8(bus);
            cpu.sc = cpu.or_u8(cpu.sc, imm);
            cpu.skip_irq = true;
            12
        }
        0x9E => {
            let imm = cpu.fetch_u8(bus);
            cpu.sc = cpu.xor_u8(cpu.sc, imm);
            cpu.skip_irq = true;
            12
        }
        0x9F => {
            cpu.sc = cpu.fetch_u8(bus);
            cpu.skip_irq = true;
            12
        }

        // PUSH
        0xA0 => {
            cpu.push_u8(bus, cpu.b);
            cpu.push_u8(bus, cpu.a);
            16
        }
        0xA1 => {
            cpu.push_u8(bus, cpu.h);
            cpu.push_u8(bus, cpu.l);
            16
        }
        0xA2 => {
            cpu.push_u8(bus, (cpu.ix >> 8) as u8);
            cpu.push_u8(bus, cpu.ix as u8);
            16
        }
        0xA3 => {
            cpu.push_u8(bus, (cpu.iy >> 8) as u8);
            cpu.push_u8(bus, cpu.iy as u8);
            16
        }
        0xA4 => {
            cpu.push_u8(bus, cpu.br);
            12
        }
        0xA5 => {
            cpu.push_u8(bus, cpu.ep);
            12
        }
        0xA6 => {
            cpu.push_u8(bus, cpu.xp);
            cpu.push_u8(bus, cpu.yp);
            16
        }
        0xA7 => {
            cpu.push_u8(bus, cpu.sc);
            12
        }

        // POP
        0xA8 => {
            cpu.a = cpu.pop_u8(bus);
            cpu.b = cpu.pop_u8(bus);
            12
        }
        0xA9 => {
            cpu.l = cpu.pop_u8(bus);
            cpu.h = cpu.pop_u8(bus);
            12
        }
        0xAA => {
            let lo = cpu.pop_u8(bus) as u16;
            let hi = cpu.pop_u8(bus) as u16;
            cpu.ix = (hi << 8) | lo;
            12
        }
        0xAB => {
            let lo = cpu.pop_u8(bus) as u16;
            let hi = cpu.pop_u8(bus) as u16;
            cpu.iy = (hi << 8) | lo;
            12
        }
        0xAC => {
            cpu.br = cpu.pop_u8(bus);
            8
        }
        0xAD => {
            cpu.ep = cpu.pop_u8(bus);
            cpu.skip_irq = true;
            8
        }
        0xAE => {
            cpu.yp = cpu.pop_u8(bus);
            cpu.xp = cpu.pop_u8(bus);
            cpu.skip_irq = true;
            12
        }
        0xAF => {
            cpu.sc = cpu.pop_u8(bus);
            cpu.skip_irq = true;
            8
        }

        // LD r, #nn
        0xB0..=0xB3 => {
            let imm = cpu.fetch_u8(bus);
            cpu.set_reg8(op, imm);
            8
        }
        0xB4 => {
            cpu.br = cpu.fetch_u8(bus);
            8
        }

        // LD [HL]/[IX]/[IY], #nn
        0xB5 => {
            let imm = cpu.fetch_u8(bus);
            bus.write_u8(cpu.hl_ex, imm);
            12
        }
        0xB6 => {
            let imm = cpu.fetch_u8(bus);
            bus.write_u8(cpu.ix_ex, imm);
            12
        }
        0xB7 => {
            let imm = cpu.fetch_u8(bus);
            bus.write_u8(cpu.iy_ex, imm);
            12
        }

        // LD rr, [#nnnn]
        0xB8..=0xBB => {
            let addr = cpu.fetch_abs(bus);
            let value = bus.read_u16(addr);
            cpu.set_reg16(op, value);
            20
        }

        // LD [#nnnn], rr
        0xBC..=0xBF => {
            let addr = cpu.fetch_abs(bus);
            bus.write_u16(addr, cpu.reg16(op));
            20
        }

        // ADD rr, #nnnn
        0xC0..=0xC3 => {
            let imm = cpu.fetch_u16(bus);
            let value = cpu.add_u16(cpu.reg16(op), imm);
            cpu.set_reg16(op, value);
            12
        }

        // LD rr, #nnnn
        0xC4..=0xC7 => {
            let imm = cpu.fetch_u16(bus);
            cpu.set_reg16(op, imm);
            12
        }

        // EX BA, rr / EX BA, SP
        0xC8 => {
            let tmp = cpu.ba();
            cpu.set_ba(cpu.hl());
            cpu.set_hl(tmp);
            12
        }
        0xC9 => {
            let tmp = cpu.ba();
            cpu.set_ba(cpu.ix);
            cpu.ix = tmp;
            12
        }
        0xCA => {
            let tmp = cpu.ba();
            cpu.set_ba(cpu.iy);
            cpu.iy = tmp;
            12
        }
        0xCB => {
            let tmp = cpu.ba();
            cpu.set_ba(cpu.sp);
            cpu.sp = tmp;
            12
        }

        // EX A, B / EX A, [HL]
        0xCC => {
            std::mem::swap(&mut cpu.a, &mut cpu.b);
            8
        }
        0xCD => {
            let tmp = cpu.a;
            cpu.a = bus.read_u8(cpu.hl_ex);
            bus.write_u8(cpu.hl_ex, tmp);
            12
        }

        // 0xCE / 0xCF handled by the prefix dispatch in execute().

        // SUB rr, #nnnn
        0xD0..=0xD3 => {
            let imm = cpu.fetch_u16(bus);
            let value = cpu.sub_u16(cpu.reg16(op), imm);
            cpu.set_reg16(op, value);
            12
        }

        // CP rr, #nnnn
        0xD4..=0xD7 => {
            let imm = cpu.fetch_u16(bus);
            cpu.cp_u16(cpu.reg16(op), imm);
            12
        }

        // AND/OR/XOR [BR + #nn], #nn
        0xD8 => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let imm = cpu.fetch_u8(bus);
            let value = cpu.and_u8(value, imm);
            bus.write_u8(addr, value);
            20
        }
        0xD9 => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let imm = cpu.fetch_u8(bus);
            let value = cpu.or_u8(value, imm);
            bus.write_u8(addr, value);
            20
        }
        0xDA => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let imm = cpu.fetch_u8(bus);
            let value = cpu.xor_u8(value, imm);
            bus.write_u8(addr, value);
            20
        }

        // CP/BIT [BR + #nn], #nn
        0xDB => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let imm = cpu.fetch_u8(bus);
            cpu.cp_u8(value, imm);
            16
        }
        0xDC => {
            let addr = cpu.fetch_br(bus);
            let value = bus.read_u8(addr);
            let imm = cpu.fetch_u8(bus);
            cpu.bit_u8(value, imm);
            16
        }

        // LD [BR + #nn], #nn
        0xDD => {
            let addr = cpu.fetch_br(bus);
            let imm = cpu.fetch_u8(bus);
            bus.write_u8(addr, imm);
            16
        }

        // PCK / UPCK
        0xDE => {
            cpu.a = (cpu.a & 0xF) | ((cpu.b & 0xF) << 4);
            8
        }
        0xDF => {
            cpu.b = cpu.a >> 4;
            cpu.a &= 0xF;
            8
        }

        // CARS cc #ss
        0xE0 => cpu.branch_short(bus, Cond::Carry, true),
        0xE1 => cpu.branch_short(bus, Cond::NoCarry, true),
        0xE2 => cpu.branch_short(bus, Cond::Zero, true),
        0xE3 => cpu.branch_short(bus, Cond::NonZero, true),

        // JRS cc #ss
        0xE4 => cpu.branch_short(bus, Cond::Carry, false),
        0xE5 => cpu.branch_short(bus, Cond::NoCarry, false),
        0xE6 => cpu.branch_short(bus, Cond::Zero, false),
        0xE7 => cpu.branch_short(bus, Cond::NonZero, false),

        // CARL cc #ssss
        0xE8 => cpu.branch_long(bus, Cond::Carry, true),
        0xE9 => cpu.branch_long(bus, Cond::NoCarry, true),
        0xEA => cpu.branch_long(bus, Cond::Zero, true),
        0xEB => cpu.branch_long(bus, Cond::NonZero, true),

        // JRL cc #ssss
        0xEC => cpu.branch_long(bus, Cond::Carry, false),
        0xED => cpu.branch_long(bus, Cond::NoCarry, false),
        0xEE => cpu.branch_long(bus, Cond::Zero, false),
        0xEF => cpu.branch_long(bus, Cond::NonZero, false),

        // Unconditional branches and calls
        0xF0 => cpu.branch_short(bus, Cond::Always, true),
        0xF1 => cpu.branch_short(bus, Cond::Always, false),
        0xF2 => cpu.branch_long(bus, Cond::Always, true),
        0xF3 => cpu.branch_long(bus, Cond::Always, false),

        // JP HL
        0xF4 => {
            let target = cpu.hl();
            cpu.branch_to(target);
            8
        }

        // DJR NZ #ss
        0xF5 => {
            let offset = cpu.fetch_s8(bus) as i16;
            cpu.b = cpu.dec_u8(cpu.b);
            if cpu.sc & super::ZERO_FLAG == 0 {
                let target = cpu.rel_target(offset, 1);
                cpu.branch_to(target);
            }
            16
        }

        // SWAP A / SWAP [HL]
        0xF6 => {
            cpu.a = cpu.a.rotate_left(4);
            8
        }
        0xF7 => {
            let value = bus.read_u8(cpu.hl_ex);
            bus.write_u8(cpu.hl_ex, value.rotate_left(4));
            12
        }

        // RET
        0xF8 => {
            let pc = bus.read_u16(cpu.sp as u32);
            cpu.cb = bus.read_u8(cpu.sp.wrapping_add(2) as u32);
            cpu.sp = cpu.sp.wrapping_add(3);
            cpu.nb = cpu.cb;
            cpu.pc = pc;
            16
        }

        // RETE: SC first, then PC and CB. Dispatch is deferred for one
        // instruction so the handler's final write wins the race.
        0xF9 => {
            cpu.sc = bus.read_u8(cpu.sp as u32);
            cpu.pc = bus.read_u16(cpu.sp.wrapping_add(1) as u32);
            cpu.cb = bus.read_u8(cpu.sp.wrapping_add(3) as u32);
            cpu.sp = cpu.sp.wrapping_add(4);
            cpu.nb = cpu.cb;
            cpu.skip_irq = true;
            20
        }

        // RETS: return and skip a two-byte slot after the call site.
        0xFA => {
            let pc = bus.read_u16(cpu.sp as u32).wrapping_add(2);
            cpu.cb = bus.read_u8(cpu.sp.wrapping_add(2) as u32);
            cpu.sp = cpu.sp.wrapping_add(3);
            cpu.nb = cpu.cb;
            cpu.pc = pc;
            24
        }

        // CALL [#nnnn]
        0xFB => {
            let addr = cpu.fetch_abs(bus);
            let target = bus.read_u16(addr);
            cpu.call_to(bus, target);
            20
        }

        // INT #nn: software interrupt through an 8-bit vector address.
        0xFC => {
            let vector = cpu.fetch_u8(bus) as u32;
            cpu.push_u8(bus, cpu.cb);
            cpu.push_u8(bus, (cpu.pc >> 8) as u8);
            cpu.push_u8(bus, cpu.pc as u8);
            cpu.push_u8(bus, cpu.sc);
            let target = bus.read_u16(vector);
            cpu.branch_to(target);
            20
        }

        // JP INT #nn
        0xFD => {
            let vector = cpu.fetch_u8(bus) as u32;
            let target = bus.read_u16(vector);
            cpu.branch_to(target);
            8
        }

        // NOP
        0xFF => 8,

        _ => cpu.illegal("", op),
    }
}
