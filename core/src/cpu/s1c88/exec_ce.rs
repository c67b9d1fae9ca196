//! 0xCE extension table: indexed addressing, [HL]-destination ALU forms,
//! shifts and rotates, bank-register loads, MLT/DIV, and the signed branch
//! conditions.

use crate::core::bus::Bus;

use super::{Cond, S1C88};

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
    fn alu_apply_ce(&mut self, op: AluOp, lhs: u8, rhs: u8) -> u8 {
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

    /// Indexed effective address: [IX+#ss], [IY+#ss], [IX+L], [IY+L].
    /// The L forms treat L as a signed displacement.
    fn indexed_addr<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: u8) -> u32 {
        let (base, offset) = match mode & 3 {
            0 => (self.ix_ex, self.fetch_s8(bus)),
            1 => (self.iy_ex, self.fetch_s8(bus)),
            2 => (self.ix_ex, self.l as i8),
            _ => (self.iy_ex, self.l as i8),
        };
        base.wrapping_add(offset as i32 as u32)
    }
}

pub(super) fn execute<B: Bus + ?Sized>(cpu: &mut S1C88, bus: &mut B, op: u8) -> u32 {
    match op {
        // ALU rows: modes 0-3 operate on A with an indexed operand, modes
        // 4-7 operate on [HL] with A / #nn / [IX] / [IY].
        0x00..=0x3F => {
            let func = ALU_OPS[(op >> 3) as usize];
            match op & 7 {
                mode @ 0..=3 => {
                    let addr = cpu.indexed_addr(bus, mode);
                    let operand = bus.read_u8(addr);
                    let result = cpu.alu_apply_ce(func, cpu.a, operand);
                    if func != AluOp::Cp {
                        cpu.a = result;
                    }
                    16
                }
                mode => {
                    let lhs = bus.read_u8(cpu.hl_ex);
                    let (rhs, cycles) = match mode {
                        4 => (cpu.a, 16),
                        5 => (cpu.fetch_u8(bus), 20),
                        6 => (bus.read_u8(cpu.ix_ex), 20),
                        _ => (bus.read_u8(cpu.iy_ex), 20),
                    };
                    let result = cpu.alu_apply_ce(func, lhs, rhs);
                    if func != AluOp::Cp {
                        bus.write_u8(cpu.hl_ex, result);
                    }
                    cycles
                }
            }
        }

        // LD r, [indexed] / LD [indexed], r
        0x40..=0x5F => {
            let reg = (op >> 3) & 3;
            let mode = op & 7;
            if mode < 4 {
                let addr = cpu.indexed_addr(bus, mode);
                let value = bus.read_u8(addr);
                match reg {
                    0 => cpu.a = value,
                    1 => cpu.b = value,
                    2 => cpu.l = value,
                    _ => cpu.h = value,
                }
            } else {
                let addr = cpu.indexed_addr(bus, mode);
                let value = match reg {
                    0 => cpu.a,
                    1 => cpu.b,
                    2 => cpu.l,
                    _ => cpu.h,
                };
                bus.write_u8(addr, value);
            }
            16
        }

        // LD [HL]/[IX]/[IY], [indexed]
        0x60..=0x63 | 0x68..=0x6B | 0x78..=0x7B => {
            let dest = match op >> 3 {
                0x0C => cpu.hl_ex,
                0x0D => cpu.ix_ex,
                _ => cpu.iy_ex,
            };
            let addr = cpu.indexed_addr(bus, op);
            let value = bus.read_u8(addr);
            bus.write_u8(dest, value);
            20
        }

        // Shifts, rotates, CPL, NEG on A / B / [BR+#nn] / [HL]
        0x80..=0xA7 => {
            let func = (op - 0x80) >> 2;
            let apply = |cpu: &mut S1C88, value: u8| match func {
                0 => cpu.sla_u8(value),
                1 => cpu.sll_u8(value),
                2 => cpu.sra_u8(value),
                3 => cpu.srl_u8(value),
                4 => cpu.rl_u8(value),
                5 => cpu.rlc_u8(value),
                6 => cpu.rr_u8(value),
                7 => cpu.rrc_u8(value),
                8 => cpu.cpl_u8(value),
                _ => cpu.neg_u8(value),
            };
            match op & 3 {
                0 => {
                    let value = cpu.a;
                    cpu.a = apply(cpu, value);
                    12
                }
                1 => {
                    let value = cpu.b;
                    cpu.b = apply(cpu, value);
                    12
                }
                2 => {
                    let addr = cpu.fetch_br(bus);
                    let value = bus.read_u8(addr);
                    let value = apply(cpu, value);
                    bus.write_u8(addr, value);
                    20
                }
                _ => {
                    let value = bus.read_u8(cpu.hl_ex);
                    let value = apply(cpu, value);
                    bus.write_u8(cpu.hl_ex, value);
                    16
                }
            }
        }

        // SEP: sign-extend A into B.
        0xA8 => {
            cpu.b = if cpu.a & 0x80 != 0 { 0xFF } else { 0x00 };
            12
        }

        // HALT: low-power wait released by the next dispatched interrupt.
        0xAE => {
            cpu.halted = true;
            12
        }

        // AND/OR/XOR B/L/H, #nn plus CP B/L/H/BR, #nn
        0xB0..=0xB2 | 0xB4..=0xB6 | 0xB8..=0xBA | 0xBC..=0xBF => {
            let imm = cpu.fetch_u8(bus);
            let target = op & 3;
            let value = match target {
                0 => cpu.b,
                1 => cpu.l,
                2 => cpu.h,
                _ => cpu.br,
            };
            match (op >> 2) & 3 {
                0 => {
                    let value = cpu.and_u8(value, imm);
                    cpu.set_reg_blh(target, value);
                }
                1 => {
                    let value = cpu.or_u8(value, imm);
                    cpu.set_reg_blh(target, value);
                }
                2 => {
                    let value = cpu.xor_u8(value, imm);
                    cpu.set_reg_blh(target, value);
                }
                _ => cpu.cp_u8(value, imm),
            }
            12
        }

        // Bank and page register moves
        0xC0 => {
            cpu.a = cpu.br;
            8
        }
        0xC1 => {
            cpu.a = cpu.sc;
            8
        }
        0xC2 => {
            cpu.br = cpu.a;
            8
        }
        0xC3 => {
            cpu.sc = cpu.a;
            cpu.skip_irq = true;
            12
        }
        0xC4 => {
            cpu.nb = cpu.fetch_u8(bus);
            cpu.skip_irq = true;
            16
        }
        0xC5 => {
            cpu.ep = cpu.fetch_u8(bus);
            cpu.skip_irq = true;
            16
        }
        0xC6 => {
            cpu.xp = cpu.fetch_u8(bus);
            cpu.skip_irq = true;
            16
        }
        0xC7 => {
            cpu.yp = cpu.fetch_u8(bus);
            cpu.skip_irq = true;
            16
        }
        0xC8 => {
            cpu.a = cpu.nb;
            8
        }
        0xC9 => {
            cpu.a = cpu.ep;
            8
        }
        0xCA => {
            cpu.a = cpu.xp;
            8
        }
        0xCB => {
            cpu.a = cpu.yp;
            8
        }
        0xCC => {
            cpu.nb = cpu.a;
            cpu.skip_irq = true;
            12
        }
        0xCD => {
            cpu.ep = cpu.a;
            cpu.skip_irq = true;
            8
        }
        0xCE => {
            cpu.xp = cpu.a;
            cpu.skip_irq = true;
            8
        }
        0xCF => {
            cpu.yp = cpu.a;
            cpu.skip_irq = true;
            8
        }

        // LD r, [#nnnn] / LD [#nnnn], r
        0xD0..=0xD3 => {
            let addr = cpu.fetch_abs(bus);
            let value = bus.read_u8(addr);
            match op & 3 {
                0 => cpu.a = value,
                1 => cpu.b = value,
                2 => cpu.l = value,
                _ => cpu.h = value,
            }
            20
        }
        0xD4..=0xD7 => {
            let addr = cpu.fetch_abs(bus);
            let value = match op & 3 {
                0 => cpu.a,
                1 => cpu.b,
                2 => cpu.l,
                _ => cpu.h,
            };
            bus.write_u8(addr, value);
            20
        }

        // MLT L, A / DIV HL, A
        0xD8 => {
            let result = cpu.mlt_u8(cpu.l, cpu.a);
            cpu.set_hl(result);
            48
        }
        0xD9 => {
            let result = cpu.div_u16(cpu.hl(), cpu.a);
            cpu.set_hl(result);
            52
        }

        // JRS with signed conditions (two-byte base opcode)
        0xE0 => ce_branch(cpu, bus, Cond::Less, false),
        0xE1 => ce_branch(cpu, bus, Cond::LessEqual, false),
        0xE2 => ce_branch(cpu, bus, Cond::Greater, false),
        0xE3 => ce_branch(cpu, bus, Cond::GreaterEqual, false),
        0xE4 => ce_branch(cpu, bus, Cond::Overflow, false),
        0xE5 => ce_branch(cpu, bus, Cond::NoOverflow, false),
        0xE6 => ce_branch(cpu, bus, Cond::Plus, false),
        0xE7 => ce_branch(cpu, bus, Cond::Minus, false),

        // CARS with signed conditions
        0xF0 => ce_branch(cpu, bus, Cond::Less, true),
        0xF1 => ce_branch(cpu, bus, Cond::LessEqual, true),
        0xF2 => ce_branch(cpu, bus, Cond::Greater, true),
        0xF3 => ce_branch(cpu, bus, Cond::GreaterEqual, true),
        0xF4 => ce_branch(cpu, bus, Cond::Overflow, true),
        0xF5 => ce_branch(cpu, bus, Cond::NoOverflow, true),
        0xF6 => ce_branch(cpu, bus, Cond::Plus, true),
        0xF7 => ce_branch(cpu, bus, Cond::Minus, true),

        _ => cpu.illegal("0xCE ", op),
    }
}

/// Short branch behind the 0xCE prefix: the displacement is relative to the
/// two prefix+opcode bytes.
fn ce_branch<B: Bus + ?Sized>(cpu: &mut S1C88, bus: &mut B, cond: Cond, call: bool) -> u32 {
    let offset = cpu.fetch_s8(bus) as i16;
    if !cpu.cond(cond) {
        return 12;
    }
    let target = cpu.rel_target(offset, 2);
    if call {
        cpu.call_to(bus, target);
        24
    } else {
        cpu.branch_to(target);
        12
    }
}

impl S1C88 {
    /// B/L/H/BR write-back for the immediate logic row.
    fn set_reg_blh(&mut self, index: u8, value: u8) {
        match index {
            0 => self.b = value,
            1 => self.l = value,
            2 => self.h = value,
            _ => self.br = value,
        }
    }
}
