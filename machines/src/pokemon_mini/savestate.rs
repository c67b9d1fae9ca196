//! Save-state serialization.
//!
//! Layout: version u32, system-type u8, then the CPU, MMU, APU, and LCD
//! sections in that order. Every field is written little-endian with no
//! padding, so a state loads byte-identically on any host.

use lumen_core::core::machine::StateError;
use lumen_core::device::sed1565::Command;

use super::{PokemonMini, IRQ_ACT_1};

pub const SAVE_STATE_VERSION: u32 = 1;
/// System-type byte identifying the Pokémon Mini machine.
pub const SYSTEM_MIN: u8 = 0x40;

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::with_capacity(0x6000) }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StateError> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(StateError::Truncated);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, StateError> {
        Ok(self.take(1)?[0])
    }

    fn bool(&mut self) -> Result<bool, StateError> {
        Ok(self.u8()? != 0)
    }

    fn u16(&mut self) -> Result<u16, StateError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, StateError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, StateError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, StateError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }
}

fn encode_command(cmd: Command) -> u8 {
    match cmd {
        Command::Nop => 0,
        Command::Reset => 1,
        Command::End => 2,
        Command::ReadModifyWrite => 3,
        Command::SetContrast => 4,
        Command::DisplayLineStart => 5,
        Command::SetEntireDisplay => 6,
        Command::SetDisplayOnOff => 7,
        Command::SetPage => 8,
        Command::SetColumnHigh => 9,
        Command::SetColumnLow => 10,
    }
}

fn decode_command(value: u8) -> Command {
    match value {
        1 => Command::Reset,
        2 => Command::End,
        3 => Command::ReadModifyWrite,
        4 => Command::SetContrast,
        5 => Command::DisplayLineStart,
        6 => Command::SetEntireDisplay,
        7 => Command::SetDisplayOnOff,
        8 => Command::SetPage,
        9 => Command::SetColumnHigh,
        10 => Command::SetColumnLow,
        _ => Command::Nop,
    }
}

pub(super) fn save(machine: &PokemonMini) -> Vec<u8> {
    let mut w = Writer::new();

    w.u32(SAVE_STATE_VERSION);
    w.u8(SYSTEM_MIN);

    // --- CPU ---------------------------------------------------------------
    let cpu = &machine.cpu;
    for reg in [
        cpu.a, cpu.b, cpu.l, cpu.h, cpu.br, cpu.sc, cpu.cc, cpu.ep, cpu.xp, cpu.yp, cpu.nb,
        cpu.cb,
    ] {
        w.u8(reg);
    }
    w.u16(cpu.sp);
    w.u16(cpu.pc);
    w.u16(cpu.ix);
    w.u16(cpu.iy);
    w.u16(cpu.log_addr);
    w.u16(cpu.opcode);
    w.bool(cpu.halted);
    w.bool(cpu.running);
    w.bool(cpu.skip_irq);

    for timer in &machine.timers.timers {
        w.u32(timer.clock_lo);
        w.u32(timer.clock_hi);
        w.u32(timer.prescalar_lo);
        w.u32(timer.prescalar_hi);
        w.u16(timer.cnt);
        w.u16(timer.counter);
        w.u16(timer.reload_value);
        w.u16(timer.pivot);
        w.u8(timer.pivot_status);
        w.u8(timer.osc_lo);
        w.u8(timer.osc_hi);
        w.bool(timer.full_mode);
        w.bool(timer.enable_lo);
        w.bool(timer.enable_hi);
        w.bool(timer.enable_scalar_lo);
        w.bool(timer.enable_scalar_hi);
    }

    // --- MMU ---------------------------------------------------------------
    w.bytes(&machine.memory[0x1000..0x2100]);

    for source in 0..32 {
        w.u8(machine.irq_priority[source]);
        w.bool(machine.irq_enable[source]);
        w.u16(machine.irq_vectors[source]);
    }
    w.u32(machine.master_irq_flags);
    w.bool(machine.osc_1_enable);
    w.bool(machine.osc_2_enable);
    w.u32(machine.rtc);
    w.u32(machine.rtc_cycles);
    w.bool(machine.rtc_enabled);

    w.bytes(&machine.eeprom.data);
    let (state, addr, control, bit, data_byte, read_mode, dirty) = machine.eeprom.state_fields();
    w.u8(state);
    w.u16(addr);
    w.u8(control);
    w.u8(bit);
    w.u8(data_byte);
    w.bool(read_mode);
    w.bool(dirty);

    let sed = &machine.sed;
    w.u8(sed.cmd);
    w.u8(sed.data);
    w.u8(sed.lcd_x);
    w.u8(sed.lcd_y);
    w.u8(encode_command(sed.current_cmd));
    w.bool(sed.enabled);
    w.u8(sed.contrast);
    w.u8(sed.line_start);

    let ir = &machine.ir;
    w.u8(ir.network_id);
    w.u8(ir.signal);
    w.i32(ir.fade);
    w.u32(ir.sync_counter);
    w.u32(ir.sync_clock);
    w.i32(ir.sync_timeout);
    w.i32(ir.sync_balance);

    // --- APU ---------------------------------------------------------------
    let (freq, duty, distance, size, current, last, sound_on, volume) =
        machine.apu.state_fields();
    w.f64(freq);
    w.f64(duty);
    w.u32(distance);
    w.u16(size);
    w.u16(current);
    w.u16(last);
    w.bool(sound_on);
    w.u8(volume);

    // --- LCD (PRC + panel) -------------------------------------------------
    let prc = &machine.prc;
    w.u8(prc.counter);
    w.u32(prc.clock);
    w.u8(prc.rate);
    w.u8(prc.rate_div);
    w.u8(prc.mode);
    w.u8(prc.copy_wait);
    w.u8(prc.map_size);
    w.u32(prc.map_addr);
    w.u32(prc.obj_addr);
    w.u8(prc.scroll_x);
    w.u8(prc.scroll_y);
    w.bool(prc.invert_map);
    w.bool(prc.enable_map);
    w.bool(prc.enable_obj);
    w.bool(prc.enable_copy);
    w.bool(prc.force_update);

    w.bytes(&machine.screen);
    w.bytes(&machine.old_screen);

    w.buf
}

pub(super) fn load(machine: &mut PokemonMini, data: &[u8]) -> Result<(), StateError> {
    let mut r = Reader::new(data);

    let version = r.u32()?;
    if version != SAVE_STATE_VERSION {
        return Err(StateError::WrongVersion {
            expected: SAVE_STATE_VERSION,
            found: version,
        });
    }
    let system = r.u8()?;
    if system != SYSTEM_MIN {
        return Err(StateError::WrongSystem {
            expected: SYSTEM_MIN,
            found: system,
        });
    }

    // --- CPU ---------------------------------------------------------------
    let cpu = &mut machine.cpu;
    cpu.a = r.u8()?;
    cpu.b = r.u8()?;
    cpu.l = r.u8()?;
    cpu.h = r.u8()?;
    cpu.br = r.u8()?;
    cpu.sc = r.u8()?;
    cpu.cc = r.u8()?;
    cpu.ep = r.u8()?;
    cpu.xp = r.u8()?;
    cpu.yp = r.u8()?;
    cpu.nb = r.u8()?;
    cpu.cb = r.u8()?;
    cpu.sp = r.u16()?;
    cpu.pc = r.u16()?;
    cpu.ix = r.u16()?;
    cpu.iy = r.u16()?;
    cpu.log_addr = r.u16()?;
    cpu.opcode = r.u16()?;
    cpu.halted = r.bool()?;
    cpu.running = r.bool()?;
    cpu.skip_irq = r.bool()?;

    for timer in &mut machine.timers.timers {
        timer.clock_lo = r.u32()?;
        timer.clock_hi = r.u32()?;
        timer.prescalar_lo = r.u32()?;
        timer.prescalar_hi = r.u32()?;
        timer.cnt = r.u16()?;
        timer.counter = r.u16()?;
        timer.reload_value = r.u16()?;
        timer.pivot = r.u16()?;
        timer.pivot_status = r.u8()?;
        timer.osc_lo = r.u8()?;
        timer.osc_hi = r.u8()?;
        timer.full_mode = r.bool()?;
        timer.enable_lo = r.bool()?;
        timer.enable_hi = r.bool()?;
        timer.enable_scalar_lo = r.bool()?;
        timer.enable_scalar_hi = r.bool()?;
    }

    // --- MMU ---------------------------------------------------------------
    machine.memory[0x1000..0x2100].copy_from_slice(r.take(0x1100)?);

    for source in 0..32 {
        machine.irq_priority[source] = r.u8()?;
        machine.irq_enable[source] = r.bool()?;
        machine.irq_vectors[source] = r.u16()?;
    }
    machine.master_irq_flags = r.u32()?;
    machine.osc_1_enable = r.bool()?;
    machine.osc_2_enable = r.bool()?;
    machine.rtc = r.u32()?;
    machine.rtc_cycles = r.u32()?;
    machine.rtc_enabled = r.bool()?;

    let eeprom_data = r.take(0x2000)?.to_vec();
    machine.eeprom.data = eeprom_data;
    let state = r.u8()?;
    let addr = r.u16()?;
    let control = r.u8()?;
    let bit = r.u8()?;
    let data_byte = r.u8()?;
    let read_mode = r.bool()?;
    let dirty = r.bool()?;
    machine
        .eeprom
        .restore_state_fields(state, addr, control, bit, data_byte, read_mode, dirty);

    let sed = &mut machine.sed;
    sed.cmd = r.u8()?;
    sed.data = r.u8()?;
    sed.lcd_x = r.u8()?;
    sed.lcd_y = r.u8()?;
    sed.current_cmd = decode_command(r.u8()?);
    sed.enabled = r.bool()?;
    sed.contrast = r.u8()?;
    sed.line_start = r.u8()?;

    let ir = &mut machine.ir;
    ir.network_id = r.u8()?;
    ir.signal = r.u8()?;
    ir.fade = r.i32()?;
    ir.sync_counter = r.u32()?;
    ir.sync_clock = r.u32()?;
    ir.sync_timeout = r.i32()?;
    ir.sync_balance = r.i32()?;

    // --- APU ---------------------------------------------------------------
    let freq = r.f64()?;
    let duty = r.f64()?;
    let distance = r.u32()?;
    let size = r.u16()?;
    let current = r.u16()?;
    let last = r.u16()?;
    let sound_on = r.bool()?;
    let volume = r.u8()?;
    machine
        .apu
        .restore_state_fields(freq, duty, distance, size, current, last, sound_on, volume);

    // --- LCD (PRC + panel) -------------------------------------------------
    let prc = &mut machine.prc;
    prc.counter = r.u8()?;
    prc.clock = r.u32()?;
    prc.rate = r.u8()?;
    prc.rate_div = r.u8()?;
    prc.mode = r.u8()?;
    prc.copy_wait = r.u8()?;
    prc.map_size = r.u8()?;
    prc.map_addr = r.u32()?;
    prc.obj_addr = r.u32()?;
    prc.scroll_x = r.u8()?;
    prc.scroll_y = r.u8()?;
    prc.invert_map = r.bool()?;
    prc.enable_map = r.bool()?;
    prc.enable_obj = r.bool()?;
    prc.enable_copy = r.bool()?;
    prc.force_update = r.bool()?;

    machine.screen.copy_from_slice(r.take(96 * 64)?);
    machine.old_screen.copy_from_slice(r.take(96 * 64)?);

    // The ACT bytes travelled inside the MMIO block; nothing else to
    // reconcile, but make sure the mirror invariant still holds.
    debug_assert!({
        let mut ok = true;
        for (reg, offset) in (0..4).map(|r| (r, IRQ_ACT_1 as usize + r)) {
            let byte = machine.memory[offset];
            ok &= lumen_core::core::irq::act_clear_mask(reg, byte) & !machine.master_irq_flags
                == 0;
        }
        ok
    });

    Ok(())
}
