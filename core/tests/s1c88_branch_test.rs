use lumen_core::cpu::S1C88;
use lumen_core::cpu::s1c88::{CARRY_FLAG, NEGATIVE_FLAG, OVERFLOW_FLAG, ZERO_FLAG};

mod common;
use common::TestBus;

fn run_one(cpu: &mut S1C88, bus: &mut TestBus, code: &[u8]) -> u32 {
    bus.load(cpu.pc as u32, code);
    cpu.execute(bus)
}

#[test]
fn jrs_taken_is_relative_to_instruction_start() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sc = ZERO_FLAG;

    // JRS Z #0x10 at 0x100: target = 0x100 + 0x10 + 1
    run_one(&mut cpu, &mut bus, &[0xE6, 0x10]);
    assert_eq!(cpu.pc, 0x111);
}

#[test]
fn jrs_not_taken_falls_through() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;

    let cycles = run_one(&mut cpu, &mut bus, &[0xE6, 0x10]);
    assert_eq!(cpu.pc, 0x102);
    assert_eq!(cycles, 8);
}

#[test]
fn jrs_backward_loops() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x200;
    cpu.log_addr = 0x200;

    // JRS #-1: target = 0x200 - 1 + 1 = 0x200 (self loop)
    run_one(&mut cpu, &mut bus, &[0xF1, 0xFF]);
    assert_eq!(cpu.pc, 0x200);
}

#[test]
fn jrl_uses_sixteen_bit_offset() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;

    // JRL #0x0300: target = 0x100 + 0x300 + 2
    run_one(&mut cpu, &mut bus, &[0xF3, 0x00, 0x03]);
    assert_eq!(cpu.pc, 0x402);
}

#[test]
fn taken_branch_adopts_nb() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.nb = 0x03;
    cpu.cb = 0x01;

    run_one(&mut cpu, &mut bus, &[0xF1, 0x10]);
    assert_eq!(cpu.cb, 0x03);

    // Untaken leaves CB alone.
    cpu.cb = 0x01;
    cpu.pc = 0x200;
    cpu.log_addr = 0x200;
    cpu.sc = 0;
    run_one(&mut cpu, &mut bus, &[0xE6, 0x10]); // JRS Z, Z clear
    assert_eq!(cpu.cb, 0x01);
}

#[test]
fn signed_conditions_compare_v_against_n() {
    // LT is V != N.
    let cases = [
        (OVERFLOW_FLAG, true),
        (NEGATIVE_FLAG, true),
        (OVERFLOW_FLAG | NEGATIVE_FLAG, false),
        (0, false),
    ];

    for (flags, taken) in cases {
        let mut cpu = S1C88::new();
        let mut bus = TestBus::new();
        cpu.pc = 0x100;
        cpu.log_addr = 0x100;
        cpu.sc = flags;

        // JRS LT #0x10 (0xCE 0xE0): target = 0x100 + 0x10 + 2
        run_one(&mut cpu, &mut bus, &[0xCE, 0xE0, 0x10]);
        if taken {
            assert_eq!(cpu.pc, 0x112, "flags {flags:02X}");
        } else {
            assert_eq!(cpu.pc, 0x103, "flags {flags:02X}");
        }
    }
}

#[test]
fn cars_pushes_cb_and_return_address() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sp = 0x1800;
    cpu.cb = 0x02;
    cpu.nb = 0x02;
    cpu.sc = CARRY_FLAG;

    // CARS C #0x20: return address is 0x102
    let cycles = run_one(&mut cpu, &mut bus, &[0xE0, 0x20]);
    assert_eq!(cycles, 20);
    assert_eq!(cpu.pc, 0x121);
    assert_eq!(cpu.sp, 0x17FD);
    assert_eq!(bus.memory[0x17FF], 0x02); // CB
    assert_eq!(bus.memory[0x17FE], 0x01); // PC high
    assert_eq!(bus.memory[0x17FD], 0x02); // PC low
}

#[test]
fn cars_untaken_costs_less_and_pushes_nothing() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sp = 0x1800;

    let cycles = run_one(&mut cpu, &mut bus, &[0xE0, 0x20]);
    assert_eq!(cycles, 8);
    assert_eq!(cpu.pc, 0x102);
    assert_eq!(cpu.sp, 0x1800);
}

#[test]
fn ret_restores_pc_and_cb() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x17FD;
    bus.memory[0x17FD] = 0x34; // PC low
    bus.memory[0x17FE] = 0x12; // PC high
    bus.memory[0x17FF] = 0x05; // CB

    // RET
    run_one(&mut cpu, &mut bus, &[0xF8]);
    assert_eq!(cpu.pc, 0x1234);
    assert_eq!(cpu.cb, 0x05);
    assert_eq!(cpu.nb, 0x05);
    assert_eq!(cpu.sp, 0x1800);
}

#[test]
fn call_and_ret_round_trip() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sp = 0x1800;

    // CARL #0x0100: call 0x100 + 0x100 + 2 = 0x202
    run_one(&mut cpu, &mut bus, &[0xF2, 0x00, 0x01]);
    assert_eq!(cpu.pc, 0x202);

    // RET back to 0x103
    run_one(&mut cpu, &mut bus, &[0xF8]);
    assert_eq!(cpu.pc, 0x103);
    assert_eq!(cpu.sp, 0x1800);
}

#[test]
fn rete_restores_sc_before_pc_and_defers_irq() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x17FC;
    bus.memory[0x17FC] = 0xC3; // SC
    bus.memory[0x17FD] = 0x00; // PC low
    bus.memory[0x17FE] = 0x03; // PC high
    bus.memory[0x17FF] = 0x01; // CB

    // RETE
    run_one(&mut cpu, &mut bus, &[0xF9]);
    assert_eq!(cpu.sc, 0xC3);
    assert_eq!(cpu.pc, 0x0300);
    assert_eq!(cpu.cb, 0x01);
    assert_eq!(cpu.sp, 0x1800);
    assert!(cpu.skip_irq);
}

#[test]
fn rets_skips_a_two_byte_slot() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x17FD;
    bus.memory[0x17FD] = 0x00;
    bus.memory[0x17FE] = 0x02;
    bus.memory[0x17FF] = 0x00;

    // RETS: returns to 0x200 + 2
    run_one(&mut cpu, &mut bus, &[0xFA]);
    assert_eq!(cpu.pc, 0x202);
}

#[test]
fn call_through_pointer() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sp = 0x1800;
    bus.memory[0x1600] = 0x00;
    bus.memory[0x1601] = 0x04;

    // CALL [#0x1600]: jumps to the vector stored there
    run_one(&mut cpu, &mut bus, &[0xFB, 0x00, 0x16]);
    assert_eq!(cpu.pc, 0x0400);
    // Return address is past the 3-byte instruction.
    assert_eq!(bus.memory[0x17FD], 0x03);
    assert_eq!(bus.memory[0x17FE], 0x01);
}

#[test]
fn software_interrupt_pushes_sc() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sp = 0x1800;
    cpu.sc = 0x23;
    bus.memory[0x0006] = 0x50;
    bus.memory[0x0007] = 0x06;

    // INT #0x06: vector table entry 3
    run_one(&mut cpu, &mut bus, &[0xFC, 0x06]);
    assert_eq!(cpu.pc, 0x0650);
    assert_eq!(cpu.sp, 0x17FC);
    assert_eq!(bus.memory[0x17FC], 0x23); // SC on top
    assert_eq!(bus.memory[0x17FD], 0x02); // PC low
    assert_eq!(bus.memory[0x17FE], 0x01); // PC high
    assert_eq!(bus.memory[0x17FF], 0x00); // CB
}

#[test]
fn jp_int_jumps_without_pushing() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;
    cpu.sp = 0x1800;
    bus.memory[0x0008] = 0x00;
    bus.memory[0x0009] = 0x07;

    // JP INT #0x08
    run_one(&mut cpu, &mut bus, &[0xFD, 0x08]);
    assert_eq!(cpu.pc, 0x0700);
    assert_eq!(cpu.sp, 0x1800);
}

#[test]
fn djr_decrements_b_and_loops_until_zero() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.b = 3;
    cpu.pc = 0x100;
    cpu.log_addr = 0x100;

    // DJR NZ #-1: spins at 0x100 until B hits zero
    bus.load(0x100, &[0xF5, 0xFF]);
    for _ in 0..2 {
        cpu.execute(&mut bus);
        assert_eq!(cpu.pc, 0x100);
    }
    cpu.execute(&mut bus);
    assert_eq!(cpu.b, 0);
    assert_eq!(cpu.pc, 0x102);
}

#[test]
fn jp_hl_is_absolute() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x0456);
    cpu.nb = 0x02;

    // JP HL
    run_one(&mut cpu, &mut bus, &[0xF4]);
    assert_eq!(cpu.pc, 0x0456);
    assert_eq!(cpu.cb, 0x02);
}

#[test]
fn halt_idles_in_four_cycle_steps() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();

    // HALT (0xCE 0xAE)
    run_one(&mut cpu, &mut bus, &[0xCE, 0xAE]);
    assert!(cpu.halted);
    let pc = cpu.pc;

    for _ in 0..4 {
        assert_eq!(cpu.execute(&mut bus), 4);
        assert_eq!(cpu.pc, pc);
    }
}
