//! 0xCF extension table: 16-bit arithmetic, stack-pointer addressing,
//! single-register and bulk push/pop, and 16-bit register moves.

use crate::core::bus::Bus;

use super::S1C88;

impl S1C88 {
    /// [SP + #ss] effective address (stack lives in the 16-bit window).
    fn sp_rel<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let offset = self.fetch_s8(bus);
        self.sp.wrapping_add(offset as i16 as u16) as u32
    }
}

pub(super) fn execute<B: Bus + ?Sized>(cpu: &mut S1C88, bus: &mut B, op: u8) -> u32 {
    match op {
        // ADD/ADC/SUB/SBC BA, rr
        0x00..=0x0F => {
            let rhs = cpu.reg16(op);
            let lhs = cpu.ba();
            let result = match op >> 2 {
                0 => cpu.add_u16(lhs, rhs),
                1 => cpu.adc_u16(lhs, rhs),
                2 => cpu.sub_u16(lhs, rhs),
                _ => cpu.sbc_u16(lhs, rhs),
            };
            cpu.set_ba(result);
            16
        }

        // CP BA, rr
        0x18..=0x1B => {
            let rhs = cpu.reg16(op);
            cpu.cp_u16(cpu.ba(), rhs);
            16
        }

        // ADD/ADC/SUB/SBC HL, rr
        0x20..=0x2F => {
            let rhs = cpu.reg16(op);
            let lhs = cpu.hl();
            let result = match (op >> 2) & 3 {
                0 => cpu.add_u16(lhs, rhs),
                1 => cpu.adc_u16(lhs, rhs),
                2 => cpu.sub_u16(lhs, rhs),
                _ => cpu.sbc_u16(lhs, rhs),
            };
            cpu.set_hl(result);
            16
        }

        // CP HL, rr
        0x38..=0x3B => {
            let rhs = cpu.reg16(op);
            cpu.cp_u16(cpu.hl(), rhs);
            16
        }

        // ADD IX/IY/SP, BA or HL
        0x40..=0x45 => {
            let rhs = if op & 1 == 0 { cpu.ba() } else { cpu.hl() };
            match (op >> 1) & 3 {
                0 => cpu.ix = cpu.add_u16(cpu.ix, rhs),
                1 => cpu.iy = cpu.add_u16(cpu.iy, rhs),
                _ => cpu.sp = cpu.add_u16(cpu.sp, rhs),
            }
            16
        }

        // SUB IX/IY/SP, BA or HL
        0x48..=0x4D => {
            let rhs = if op & 1 == 0 { cpu.ba() } else { cpu.hl() };
            match (op >> 1) & 3 {
                0 => cpu.ix = cpu.sub_u16(cpu.ix, rhs),
                1 => cpu.iy = cpu.sub_u16(cpu.iy, rhs),
                _ => cpu.sp = cpu.sub_u16(cpu.sp, rhs),
            }
            16
        }

        // CP SP, BA / CP SP, HL
        0x5C => {
            cpu.cp_u16(cpu.sp, cpu.ba());
            16
        }
        0x5D => {
            cpu.cp_u16(cpu.sp, cpu.hl());
            16
        }

        // ADC/SBC BA/HL, #nnnn
        0x60 => {
            let imm = cpu.fetch_u16(bus);
            let result = cpu.adc_u16(cpu.ba(), imm);
            cpu.set_ba(result);
            12
        }
        0x61 => {
            let imm = cpu.fetch_u16(bus);
            let result = cpu.adc_u16(cpu.hl(), imm);
            cpu.set_hl(result);
            12
        }
        0x62 => {
            let imm = cpu.fetch_u16(bus);
            let result = cpu.sbc_u16(cpu.ba(), imm);
            cpu.set_ba(result);
            12
        }
        0x63 => {
            let imm = cpu.fetch_u16(bus);
            let result = cpu.sbc_u16(cpu.hl(), imm);
            cpu.set_hl(result);
            12
        }

        // SP immediate arithmetic
        0x68 => {
            let imm = cpu.fetch_u16(bus);
            cpu.sp = cpu.add_u16(cpu.sp, imm);
            12
        }
        0x6A => {
            let imm = cpu.fetch_u16(bus);
            cpu.sp = cpu.sub_u16(cpu.sp, imm);
            12
        }
        0x6C => {
            let imm = cpu.fetch_u16(bus);
            cpu.cp_u16(cpu.sp, imm);
            12
        }
        0x6E => {
            cpu.sp = cpu.fetch_u16(bus);
            16
        }

        // LD rr, [SP + #ss] / LD [SP + #ss], rr
        0x70..=0x73 => {
            let addr = cpu.sp_rel(bus);
            let value = bus.read_u16(addr);
            cpu.set_reg16(op, value);
            24
        }
        0x74..=0x77 => {
            let addr = cpu.sp_rel(bus);
            bus.write_u16(addr, cpu.reg16(op));
            24
        }

        // LD SP, [#nnnn]
        0x78 => {
            let addr = cpu.fetch_abs(bus);
            cpu.sp = bus.read_u16(addr);
            24
        }

        // PUSH/POP single registers
        0xB0 => {
            cpu.push_u8(bus, cpu.a);
            12
        }
        0xB1 => {
            cpu.push_u8(bus, cpu.b);
            12
        }
        0xB2 => {
            cpu.push_u8(bus, cpu.l);
            12
        }
        0xB3 => {
            cpu.push_u8(bus, cpu.h);
            12
        }
        0xB4 => {
            cpu.a = cpu.pop_u8(bus);
            12
        }
        0xB5 => {
            cpu.b = cpu.pop_u8(bus);
            12
        }
        0xB6 => {
            cpu.l = cpu.pop_u8(bus);
            12
        }
        0xB7 => {
            cpu.h = cpu.pop_u8(bus);
            12
        }

        // PUSH ALL: B, A, H, L, IX, IY, BR
        0xB8 => {
            cpu.push_u8(bus, cpu.b);
            cpu.push_u8(bus, cpu.a);
            cpu.push_u8(bus, cpu.h);
            cpu.push_u8(bus, cpu.l);
            cpu.push_u8(bus, (cpu.ix >> 8) as u8);
            cpu.push_u8(bus, cpu.ix as u8);
            cpu.push_u8(bus, (cpu.iy >> 8) as u8);
            cpu.push_u8(bus, cpu.iy as u8);
            cpu.push_u8(bus, cpu.br);
            48
        }

        // PUSH ALE: ALL plus EP, XP, YP
        0xB9 => {
            cpu.push_u8(bus, cpu.b);
            cpu.push_u8(bus, cpu.a);
            cpu.push_u8(bus, cpu.h);
            cpu.push_u8(bus, cpu.l);
            cpu.push_u8(bus, (cpu.ix >> 8) as u8);
            cpu.push_u8(bus, cpu.ix as u8);
            cpu.push_u8(bus, (cpu.iy >> 8) as u8);
            cpu.push_u8(bus, cpu.iy as u8);
            cpu.push_u8(bus, cpu.br);
            cpu.push_u8(bus, cpu.ep);
            cpu.push_u8(bus, cpu.xp);
            cpu.push_u8(bus, cpu.yp);
            60
        }

        // POP ALL
        0xBC => {
            cpu.br = cpu.pop_u8(bus);
            let iy_lo = cpu.pop_u8(bus) as u16;
            let iy_hi = cpu.pop_u8(bus) as u16;
            cpu.iy = (iy_hi << 8) | iy_lo;
            let ix_lo = cpu.pop_u8(bus) as u16;
            let ix_hi = cpu.pop_u8(bus) as u16;
            cpu.ix = (ix_hi << 8) | ix_lo;
            cpu.l = cpu.pop_u8(bus);
            cpu.h = cpu.pop_u8(bus);
            cpu.a = cpu.pop_u8(bus);
            cpu.b = cpu.pop_u8(bus);
            32
        }

        // POP ALE
        0xBD => {
            cpu.yp = cpu.pop_u8(bus);
            cpu.xp = cpu.pop_u8(bus);
            cpu.ep = cpu.pop_u8(bus);
            cpu.br = cpu.pop_u8(bus);
            let iy_lo = cpu.pop_u8(bus) as u16;
            let iy_hi = cpu.pop_u8(bus) as u16;
            cpu.iy = (iy_hi << 8) | iy_lo;
            let ix_lo = cpu.pop_u8(bus) as u16;
            let ix_hi = cpu.pop_u8(bus) as u16;
            cpu.ix = (ix_hi << 8) | ix_lo;
            cpu.l = cpu.pop_u8(bus);
            cpu.h = cpu.pop_u8(bus);
            cpu.a = cpu.pop_u8(bus);
            cpu.b = cpu.pop_u8(bus);
            cpu.skip_irq = true;
            40
        }

        // LD rr, [HL] / LD [HL], rr
        0xC0..=0xC3 => {
            let value = bus.read_u16(cpu.hl_ex);
            cpu.set_reg16(op, value);
            20
        }
        0xC4..=0xC7 => {
            bus.write_u16(cpu.hl_ex, cpu.reg16(op));
            20
        }

        // LD rr, [IX] / LD [IX], rr
        0xD0..=0xD3 => {
            let value = bus.read_u16(cpu.ix_ex);
            cpu.set_reg16(op, value);
            20
        }
        0xD4..=0xD7 => {
            bus.write_u16(cpu.ix_ex, cpu.reg16(op));
            20
        }

        // LD rr, [IY] / LD [IY], rr
        0xD8..=0xDB => {
            let value = bus.read_u16(cpu.iy_ex);
            cpu.set_reg16(op, value);
            20
        }
        0xDC..=0xDF => {
            bus.write_u16(cpu.iy_ex, cpu.reg16(op));
            20
        }

        // LD rr, rr
        0xE0..=0xEF => {
            let value = cpu.reg16(op);
            cpu.set_reg16(op >> 2, value);
            8
        }

        // LD SP, rr
        0xF0..=0xF3 => {
            cpu.sp = cpu.reg16(op);
            8
        }

        // LD HL/BA/IX/IY, SP or PC
        0xF4 => {
            cpu.set_hl(cpu.sp);
            8
        }
        0xF5 => {
            cpu.set_hl(cpu.pc);
            8
        }
        0xF8 => {
            cpu.set_ba(cpu.sp);
            8
        }
        0xF9 => {
            cpu.set_ba(cpu.pc);
            8
        }
        0xFA => {
            cpu.ix = cpu.sp;
            8
        }
        0xFE => {
            cpu.iy = cpu.sp;
            8
        }

        _ => cpu.illegal("0xCF ", op),
    }
}
