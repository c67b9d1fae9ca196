//! EEPROM protocol driven the way games do it: bit-banging the SCL/SDA
//! lines through PM_IO_DATA writes.

use lumen_core::core::bus::Bus;
use lumen_machines::pokemon_mini::*;

mod common;
use common::{machine_with, SPIN};

fn io(machine: &mut PokemonMini, clk: bool, sda: bool) {
    let value = 0x02 | ((clk as u8) << 3) | ((sda as u8) << 2);
    machine.write_u8(PM_IO_DATA, value);
}

fn sda_out(machine: &mut PokemonMini) -> bool {
    machine.read_u8(PM_IO_DATA) & 0x04 != 0
}

/// One SCL pulse carrying `bit`; returns the SDA level during the high
/// phase (the device's output when it drives the line).
fn pulse(machine: &mut PokemonMini, bit: bool) -> bool {
    io(machine, false, bit);
    io(machine, true, bit);
    sda_out(machine)
}

fn start(machine: &mut PokemonMini) {
    io(machine, true, true);
    io(machine, true, false);
    io(machine, false, false);
}

fn stop(machine: &mut PokemonMini) {
    io(machine, false, false);
    io(machine, true, false);
    io(machine, true, true);
}

fn send_byte(machine: &mut PokemonMini, byte: u8) {
    for bit in (0..8).rev() {
        pulse(machine, byte & (1 << bit) != 0);
    }
}

fn expect_ack(machine: &mut PokemonMini) {
    assert!(!pulse(machine, true), "device did not pull SDA low");
}

fn read_byte(machine: &mut PokemonMini) -> u8 {
    let mut value = 0;
    for bit in (0..8).rev() {
        if pulse(machine, true) {
            value |= 1 << bit;
        }
    }
    value
}

#[test]
fn write_then_read_back_four_bytes() {
    let mut machine = machine_with(&[0xF1, 0xFF], SPIN, MachineOptions::default());
    assert!(!machine.eeprom_dirty());

    // Write DE AD BE EF at 0x1234.
    start(&mut machine);
    send_byte(&mut machine, 0xA0);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x12);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x34);
    expect_ack(&mut machine);
    for byte in [0xDE, 0xAD, 0xBE, 0xEF] {
        send_byte(&mut machine, byte);
        expect_ack(&mut machine);
    }
    stop(&mut machine);

    assert!(machine.eeprom_dirty());

    // Seek back with an empty write, then switch to read mode.
    start(&mut machine);
    send_byte(&mut machine, 0xA0);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x12);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x34);
    expect_ack(&mut machine);

    start(&mut machine); // repeated START
    send_byte(&mut machine, 0xA1);
    expect_ack(&mut machine);

    let mut out = [0u8; 4];
    for slot in &mut out {
        *slot = read_byte(&mut machine);
        expect_ack(&mut machine);
    }
    stop(&mut machine);

    assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn read_wraps_from_last_byte_to_first() {
    let mut machine = machine_with(&[0xF1, 0xFF], SPIN, MachineOptions::default());

    // Plant markers through the serial interface itself: one byte at
    // 0x1FFF, one at 0x0000.
    for (addr, value) in [(0x1FFFu16, 0x5Au8), (0x0000, 0xC3)] {
        start(&mut machine);
        send_byte(&mut machine, 0xA0);
        expect_ack(&mut machine);
        send_byte(&mut machine, (addr >> 8) as u8);
        expect_ack(&mut machine);
        send_byte(&mut machine, addr as u8);
        expect_ack(&mut machine);
        send_byte(&mut machine, value);
        expect_ack(&mut machine);
        stop(&mut machine);
    }

    // Seek to 0x1FFF and read two bytes across the wrap.
    start(&mut machine);
    send_byte(&mut machine, 0xA0);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x1F);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0xFF);
    expect_ack(&mut machine);

    start(&mut machine);
    send_byte(&mut machine, 0xA1);
    expect_ack(&mut machine);
    assert_eq!(read_byte(&mut machine), 0x5A);
    expect_ack(&mut machine);
    assert_eq!(read_byte(&mut machine), 0xC3);
    stop(&mut machine);
}

#[test]
fn nvram_round_trips_through_the_machine_trait() {
    use lumen_core::core::machine::Machine;

    let mut options = MachineOptions::default();
    options.rtc_snapshot = false;
    let mut machine = machine_with(&[0xF1, 0xFF], SPIN, options);

    let mut image = vec![0x11u8; 0x2000];
    image[0x123] = 0x99;
    machine.load_nvram(&image);

    // Nothing dirty yet: a clean machine has nothing to flush.
    assert!(Machine::save_nvram(&machine).is_none());

    start(&mut machine);
    send_byte(&mut machine, 0xA0);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x01);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x23);
    expect_ack(&mut machine);
    send_byte(&mut machine, 0x77);
    expect_ack(&mut machine);
    stop(&mut machine);

    let saved = Machine::save_nvram(&machine).expect("dirty after a write");
    assert_eq!(saved[0x123], 0x77);
    assert_eq!(saved[0x124], 0x11);
    // RTC snapshot disabled: the tail is zeroed.
    assert!(saved[0x1FF6..=0x1FFF].iter().all(|&b| b == 0));
}
