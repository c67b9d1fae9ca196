use lumen_core::core::bus::Bus;
use lumen_core::core::machine::{Machine, StateError};
use lumen_machines::pokemon_mini::*;

mod common;
use common::{machine_with, run_cycles, SPIN};

fn scrambled_machine() -> PokemonMini {
    let boot = [
        0xCF, 0x6E, 0x00, 0x20, // LD SP, #0x2000
        0xB4, 0x20, // LD BR, #0x20
        0xDD, 0x80, 0x0E, // LD [BR+0x80], #0x0E   PRC map + obj + copy
        0xF1, 0xFF, // JRS #-1
    ];

    let mut options = MachineOptions::default();
    options.rtc_snapshot = false;
    let mut machine = machine_with(&boot, SPIN, options);

    // Scribble over RAM, GDDRAM, and some registers so the state is far
    // from the power-on image.
    for offset in 0..0x80u32 {
        machine.write_u8(0x1400 + offset, (offset * 7) as u8);
    }
    machine.write_u8(MIN_LCD_CNT, 0xB2);
    machine.write_u8(MIN_LCD_DATA, 0x3C);
    machine.write_u8(TIMER3_PRESET_LO, 0xFF);
    machine.write_u8(TIMER3_CNT_LO, 0x84);
    machine.write_u8(PM_AUDIO_VOLUME, 0x02);
    machine.write_u8(SEC_CNT, 0x01);

    run_cycles(&mut machine, 123_456);
    machine
}

#[test]
fn save_load_save_is_byte_identical() {
    let machine = scrambled_machine();
    let state = machine.save_state();

    // Diverge a second machine before restoring to prove the load does
    // the work.
    let mut restored = scrambled_machine();
    run_cycles(&mut restored, 7_000);

    restored.load_state(&state).expect("state should load");
    let second = restored.save_state();

    assert_eq!(state, second);
}

#[test]
fn loaded_machine_continues_identically() {
    let mut original = scrambled_machine();
    let state = original.save_state();

    let mut clone = scrambled_machine();
    run_cycles(&mut clone, 9_999);
    clone.load_state(&state).expect("state should load");

    // Both must now execute in lockstep.
    for _ in 0..1_000 {
        let a = original.step();
        let b = clone.step();
        assert_eq!(a, b);
        assert_eq!(original.cpu().pc, clone.cpu().pc);
    }
    assert_eq!(original.read_u8(TIMER3_COUNT_LO), clone.read_u8(TIMER3_COUNT_LO));
}

#[test]
fn header_validation() {
    let machine = scrambled_machine();
    let mut state = machine.save_state();

    let mut target = scrambled_machine();

    // Wrong version.
    state[0] ^= 0xFF;
    assert!(matches!(
        target.load_state(&state),
        Err(StateError::WrongVersion { .. })
    ));
    state[0] ^= 0xFF;

    // Wrong system byte.
    state[4] ^= 0xFF;
    assert!(matches!(
        target.load_state(&state),
        Err(StateError::WrongSystem { .. })
    ));
    state[4] ^= 0xFF;

    // Truncated blob.
    assert!(matches!(
        target.load_state(&state[..state.len() / 2]),
        Err(StateError::Truncated)
    ));

    // The pristine blob still loads.
    target.load_state(&state).expect("unmodified state loads");
}
