use lumen_core::core::bus::IrqRequest;
use lumen_core::cpu::S1C88;

mod common;
use common::TestBus;

#[test]
fn dispatch_pushes_cb_pc_sc_and_masks() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1234;
    cpu.sp = 0x1800;
    cpu.cb = 0x05;
    cpu.sc = 0x01;
    bus.pending = Some(IrqRequest {
        source: 28,
        vector: 0x0400,
    });

    cpu.handle_interrupt(&mut bus);

    assert_eq!(cpu.pc, 0x0400);
    assert_eq!(cpu.cb, 0x00);
    assert_eq!(cpu.sc, 0x01 | 0xC0);
    assert_eq!(cpu.sp, 0x17FC);
    // Stack top to bottom: SC, PC low, PC high, CB.
    assert_eq!(bus.memory[0x17FC], 0x01);
    assert_eq!(bus.memory[0x17FD], 0x34);
    assert_eq!(bus.memory[0x17FE], 0x12);
    assert_eq!(bus.memory[0x17FF], 0x05);
}

#[test]
fn masked_interrupts_stay_pending() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1000;
    cpu.sp = 0x1800;
    cpu.sc = 0xC0; // mask = 3
    bus.pending = Some(IrqRequest {
        source: 28,
        vector: 0x0400,
    });

    cpu.handle_interrupt(&mut bus);
    assert_eq!(cpu.pc, 0x1000);
    assert_eq!(cpu.sp, 0x1800);
}

#[test]
fn skip_irq_defers_dispatch_by_one_instruction() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1800;
    bus.pending = Some(IrqRequest {
        source: 28,
        vector: 0x0400,
    });

    // LD SC, #0x00 arms the latch.
    bus.load(0, &[0x9F, 0x00, 0xFF]);
    cpu.execute(&mut bus);
    assert!(cpu.skip_irq);

    cpu.handle_interrupt(&mut bus);
    assert_ne!(cpu.pc, 0x0400);

    // The next instruction clears the latch; dispatch goes through.
    cpu.execute(&mut bus); // NOP
    cpu.handle_interrupt(&mut bus);
    assert_eq!(cpu.pc, 0x0400);
}

#[test]
fn system_reset_jumps_without_pushing() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x1234;
    cpu.sp = 0x1800;
    cpu.sc = 0x00;
    bus.pending = Some(IrqRequest {
        source: 0,
        vector: 0x0100,
    });

    cpu.handle_interrupt(&mut bus);

    assert_eq!(cpu.pc, 0x0100);
    assert_eq!(cpu.sp, 0x1800);
    assert_eq!(bus.reset_acks, 1);
    // SC is untouched on the reset path.
    assert_eq!(cpu.sc, 0x00);
}

#[test]
fn interrupt_wakes_halted_cpu() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.sp = 0x1800;

    // HALT
    bus.load(0, &[0xCE, 0xAE]);
    cpu.execute(&mut bus);
    assert!(cpu.halted);
    assert_eq!(cpu.execute(&mut bus), 4);

    bus.pending = Some(IrqRequest {
        source: 28,
        vector: 0x0400,
    });
    cpu.handle_interrupt(&mut bus);
    assert!(!cpu.halted);
    assert_eq!(cpu.pc, 0x0400);
}

#[test]
fn rete_returns_to_interrupted_flow() {
    let mut cpu = S1C88::new();
    let mut bus = TestBus::new();
    cpu.pc = 0x0500;
    cpu.sp = 0x1800;
    cpu.sc = 0x21;
    cpu.cb = 0x01;
    cpu.nb = 0x01;
    bus.pending = Some(IrqRequest {
        source: 28,
        vector: 0x0400,
    });

    cpu.handle_interrupt(&mut bus);
    bus.pending = None;
    assert_eq!(cpu.sc & 0xC0, 0xC0);

    // Handler body: RETE at the vector.
    bus.load(0x0400, &[0xF9]);
    cpu.execute(&mut bus);

    assert_eq!(cpu.pc, 0x0500);
    assert_eq!(cpu.sc, 0x21);
    assert_eq!(cpu.cb, 0x01);
    assert_eq!(cpu.sp, 0x1800);
}
