use lumen_core::cpu::S1C88;

mod common;
use common::TestBus;

fn run_one(cpu: &mut S1C88, bus: &mut TestBus, code: &[u8]) -> u32 {
    bus.load(cpu.pc as u32, code);
    cpu.execute(bus)
}

#[test]
fn ld_register_to_register() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.b = 0x42;

    // LD A, B
    let cycles = run_one(&mut cpu, &mut bus, &[0x41]);
    assert_eq!(cpu.a, 0x42);
    assert_eq!(cycles, 4);
    assert_eq!(cpu.pc, 1);
}

#[test]
fn ld_immediate() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();

    // LD H, #0x5A
    run_one(&mut cpu, &mut bus, &[0xB3, 0x5A]);
    assert_eq!(cpu.h, 0x5A);
    assert_eq!(cpu.pc, 2);
}

#[test]
fn ld_through_hl_uses_ep_page() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.ep = 0x02;
    cpu.set_hl(0x1234);
    bus.memory[0x21234] = 0x77;

    // LD A, [HL]
    run_one(&mut cpu, &mut bus, &[0x45]);
    assert_eq!(cpu.a, 0x77);
}

#[test]
fn ld_br_page_addressing() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.br = 0x15;
    cpu.a = 0xAB;

    // LD [BR + 0x40], A
    run_one(&mut cpu, &mut bus, &[0x78, 0x40]);
    assert_eq!(bus.memory[0x1540], 0xAB);

    // LD B, [BR + 0x40]
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0x4C, 0x40]);
    assert_eq!(cpu.b, 0xAB);
}

#[test]
fn ld_absolute_expands_into_ep_bank() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.ep = 0x01;
    cpu.a = 0x5C;

    // LD [#0x2345], A (0xCE 0xD4) lands in EP's 64 KiB bank
    run_one(&mut cpu, &mut bus, &[0xCE, 0xD4, 0x45, 0x23]);
    assert_eq!(bus.memory[0x12345], 0x5C);

    // LD B, [#0x2345] reads it back
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xCE, 0xD1, 0x45, 0x23]);
    assert_eq!(cpu.b, 0x5C);
}

#[test]
fn indexed_with_signed_displacement() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.ix = 0x2000;
    bus.memory[0x1FFE] = 0x99;

    // LD A, [IX + #-2] (0xCE 0x40)
    run_one(&mut cpu, &mut bus, &[0xCE, 0x40, 0xFE]);
    assert_eq!(cpu.a, 0x99);
}

#[test]
fn indexed_with_l_as_displacement() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.iy = 0x2000;
    cpu.l = 0x80; // -128
    cpu.a = 0x3C;

    // LD [IY + L], A (0xCE 0x47)
    run_one(&mut cpu, &mut bus, &[0xCE, 0x47]);
    assert_eq!(bus.memory[0x1F80], 0x3C);
}

#[test]
fn indexed_uses_xp_page() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.xp = 0x03;
    cpu.ix = 0x0100;
    bus.memory[0x30105] = 0x21;

    // LD A, [IX + #5]
    run_one(&mut cpu, &mut bus, &[0xCE, 0x40, 0x05]);
    assert_eq!(cpu.a, 0x21);
}

#[test]
fn ld_mem_to_mem() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x1400);
    cpu.ix = 0x1500;
    bus.memory[0x1500] = 0x6E;

    // LD [HL], [IX]
    run_one(&mut cpu, &mut bus, &[0x6E]);
    assert_eq!(bus.memory[0x1400], 0x6E);
}

#[test]
fn ld_sixteen_bit_absolute() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.set_ba(0xBEEF);

    // LD [#0x1600], BA
    run_one(&mut cpu, &mut bus, &[0xBC, 0x00, 0x16]);
    assert_eq!(bus.memory[0x1600], 0xEF);
    assert_eq!(bus.memory[0x1601], 0xBE);

    // LD IX, [#0x1600]
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xBA, 0x00, 0x16]);
    assert_eq!(cpu.ix, 0xBEEF);
}

#[test]
fn ld_sixteen_bit_through_pointer() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.iy = 0x1700;
    cpu.set_hl(0xCAFE);

    // LD [IY], HL (0xCF 0xDD)
    run_one(&mut cpu, &mut bus, &[0xCF, 0xDD]);
    assert_eq!(bus.memory[0x1700], 0xFE);
    assert_eq!(bus.memory[0x1701], 0xCA);

    // LD BA, [IY] (0xCF 0xD8)
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xCF, 0xD8]);
    assert_eq!(cpu.ba(), 0xCAFE);
}

#[test]
fn ld_sp_relative() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1800;
    cpu.set_ba(0x1234);

    // LD [SP + #-4], BA (0xCF 0x74)
    run_one(&mut cpu, &mut bus, &[0xCF, 0x74, 0xFC]);
    assert_eq!(bus.memory[0x17FC], 0x34);
    assert_eq!(bus.memory[0x17FD], 0x12);

    // LD HL, [SP + #-4] (0xCF 0x71)
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xCF, 0x71, 0xFC]);
    assert_eq!(cpu.hl(), 0x1234);
}

#[test]
fn sixteen_bit_register_moves() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.set_hl(0x4321);

    // LD BA, HL (0xCF 0xE1)
    run_one(&mut cpu, &mut bus, &[0xCF, 0xE1]);
    assert_eq!(cpu.ba(), 0x4321);

    // LD SP, HL (0xCF 0xF1)
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xCF, 0xF1]);
    assert_eq!(cpu.sp, 0x4321);

    // LD BA, PC (0xCF 0xF9): PC has advanced past the opcode
    cpu.pc = 0x20;
    run_one(&mut cpu, &mut bus, &[0xCF, 0xF9]);
    assert_eq!(cpu.ba(), 0x22);
}

#[test]
fn exchanges() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.set_ba(0x1111);
    cpu.set_hl(0x2222);

    // EX BA, HL
    run_one(&mut cpu, &mut bus, &[0xC8]);
    assert_eq!(cpu.ba(), 0x2222);
    assert_eq!(cpu.hl(), 0x1111);

    // EX A, [HL]
    cpu.set_hl(0x1450);
    bus.memory[0x1450] = 0x9A;
    cpu.a = 0x33;
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xCD]);
    assert_eq!(cpu.a, 0x9A);
    assert_eq!(bus.memory[0x1450], 0x33);
}

#[test]
fn swap_nibbles() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.a = 0xF1;

    // SWAP A
    run_one(&mut cpu, &mut bus, &[0xF6]);
    assert_eq!(cpu.a, 0x1F);

    // SWAP [HL]
    cpu.set_hl(0x1460);
    bus.memory[0x1460] = 0xABu8;
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xF7]);
    assert_eq!(bus.memory[0x1460], 0xBA);
}

#[test]
fn bank_register_loads() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();

    // LD EP, #0x05 (0xCE 0xC5)
    run_one(&mut cpu, &mut bus, &[0xCE, 0xC5, 0x05]);
    assert_eq!(cpu.ep, 0x05);
    assert!(cpu.skip_irq);

    // LD A, EP (0xCE 0xC9)
    cpu.pc = 0x10;
    run_one(&mut cpu, &mut bus, &[0xCE, 0xC9]);
    assert_eq!(cpu.a, 0x05);

    // LD XP, A (0xCE 0xCE)
    cpu.a = 0x07;
    cpu.pc = 0x20;
    run_one(&mut cpu, &mut bus, &[0xCE, 0xCE]);
    assert_eq!(cpu.xp, 0x07);
}
