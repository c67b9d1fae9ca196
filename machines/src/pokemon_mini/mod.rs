//! The Pokémon Mini machine.
//!
//! One struct owns the CPU, every device, and the 2 MiB memory map; it
//! implements [`Bus`] (the MMU: live MMIO reads, register side effects on
//! write) and [`Machine`] (the frontend contract). The scheduler is
//! `step()`: netplay housekeeping, interrupt dispatch, one instruction,
//! then `clock_system` over the PRC, timers, IR fade, and RTC by the
//! cycles the instruction consumed.

mod savestate;

use std::path::Path;

use lumen_core::core::bus::{Bus, IrqRequest};
use lumen_core::core::irq::{self, *};
use lumen_core::core::machine::{
    HOTKEY_NETPLAY_NEXT, HOTKEY_REMOTE_SIGNAL, InputButton, Machine, StateError,
};
use lumen_core::cpu::S1C88;
use lumen_core::device::infrared::REMOTE_SLOT;
use lumen_core::device::keypad::{
    KEY_A, KEY_B, KEY_C, KEY_DOWN, KEY_LEFT, KEY_POWER, KEY_RIGHT, KEY_SHOCK, KEY_UP,
};
use lumen_core::device::{Apu, Eeprom, IrLink, Keypad, Prc, Sed1565, TimerBlock};

use crate::registry::{MachineConfig, MachineEntry};
use crate::rom_loader::{BiosImage, RomImage, RomLoadError};

// ---------------------------------------------------------------------------
// MMIO register map
// ---------------------------------------------------------------------------

pub const SYS_CNT1: u32 = 0x2000;
pub const SYS_CNT2: u32 = 0x2001;
pub const SYS_CNT3: u32 = 0x2002;

pub const SEC_CNT: u32 = 0x2008;
pub const RTC_SEC_LO: u32 = 0x2009;
pub const RTC_SEC_MID: u32 = 0x200A;
pub const RTC_SEC_HI: u32 = 0x200B;

pub const SYS_BATT: u32 = 0x2010;

pub const TIMER1_SCALE: u32 = 0x2018;
pub const TIMER1_OSC: u32 = 0x2019;
pub const TIMER2_SCALE: u32 = 0x201A;
pub const TIMER2_OSC: u32 = 0x201B;
pub const TIMER3_SCALE: u32 = 0x201C;
pub const TIMER3_OSC: u32 = 0x201D;

pub const IRQ_PRI_1: u32 = 0x2020;
pub const IRQ_PRI_2: u32 = 0x2021;
pub const IRQ_PRI_3: u32 = 0x2022;

pub const IRQ_ENA_1: u32 = 0x2023;
pub const IRQ_ENA_2: u32 = 0x2024;
pub const IRQ_ENA_3: u32 = 0x2025;
pub const IRQ_ENA_4: u32 = 0x2026;

pub const IRQ_ACT_1: u32 = 0x2027;
pub const IRQ_ACT_2: u32 = 0x2028;
pub const IRQ_ACT_3: u32 = 0x2029;
pub const IRQ_ACT_4: u32 = 0x202A;

pub const TIMER1_CNT_LO: u32 = 0x2030;
pub const TIMER1_CNT_HI: u32 = 0x2031;
pub const TIMER1_PRESET_LO: u32 = 0x2032;
pub const TIMER1_PRESET_HI: u32 = 0x2033;
pub const TIMER1_PIVOT_LO: u32 = 0x2034;
pub const TIMER1_PIVOT_HI: u32 = 0x2035;
pub const TIMER1_COUNT_LO: u32 = 0x2036;
pub const TIMER1_COUNT_HI: u32 = 0x2037;

pub const TIMER2_CNT_LO: u32 = 0x2038;
pub const TIMER2_CNT_HI: u32 = 0x2039;
pub const TIMER2_PRESET_LO: u32 = 0x203A;
pub const TIMER2_PRESET_HI: u32 = 0x203B;
pub const TIMER2_PIVOT_LO: u32 = 0x203C;
pub const TIMER2_PIVOT_HI: u32 = 0x203D;
pub const TIMER2_COUNT_LO: u32 = 0x203E;
pub const TIMER2_COUNT_HI: u32 = 0x203F;

pub const TIMER256_CNT: u32 = 0x2040;
pub const TIMER256_COUNT: u32 = 0x2041;

pub const TIMER3_CNT_LO: u32 = 0x2048;
pub const TIMER3_CNT_HI: u32 = 0x2049;
pub const TIMER3_PRESET_LO: u32 = 0x204A;
pub const TIMER3_PRESET_HI: u32 = 0x204B;
pub const TIMER3_PIVOT_LO: u32 = 0x204C;
pub const TIMER3_PIVOT_HI: u32 = 0x204D;
pub const TIMER3_COUNT_LO: u32 = 0x204E;
pub const TIMER3_COUNT_HI: u32 = 0x204F;

pub const PM_KEYPAD: u32 = 0x2052;

pub const PM_IO_DIR: u32 = 0x2060;
pub const PM_IO_DATA: u32 = 0x2061;

pub const PM_AUDIO_VOLUME: u32 = 0x2071;

pub const PRC_MODE: u32 = 0x2080;
pub const PRC_RATE: u32 = 0x2081;
pub const PRC_MAP_LO: u32 = 0x2082;
pub const PRC_MAP_MID: u32 = 0x2083;
pub const PRC_MAP_HI: u32 = 0x2084;
pub const PRC_SY: u32 = 0x2085;
pub const PRC_SX: u32 = 0x2086;
pub const PRC_SPR_LO: u32 = 0x2087;
pub const PRC_SPR_MID: u32 = 0x2088;
pub const PRC_SPR_HI: u32 = 0x2089;
pub const PRC_CNT: u32 = 0x208A;

pub const MIN_LCD_CNT: u32 = 0x20FE;
pub const MIN_LCD_DATA: u32 = 0x20FF;

const MEMORY_SIZE: usize = 0x200000;
const RAM_BASE: u32 = 0x1000;
const MMIO_END: u32 = 0x2100;

/// One RTC second at the 4 MHz system clock.
const RTC_SECOND_CYCLES: u32 = 4_000_000;

const SCREEN_W: usize = 96;
const SCREEN_H: usize = 64;

// Input button ids handed to the frontend.
pub const INPUT_A: u8 = KEY_A;
pub const INPUT_B: u8 = KEY_B;
pub const INPUT_C: u8 = KEY_C;
pub const INPUT_UP: u8 = KEY_UP;
pub const INPUT_DOWN: u8 = KEY_DOWN;
pub const INPUT_LEFT: u8 = KEY_LEFT;
pub const INPUT_RIGHT: u8 = KEY_RIGHT;
pub const INPUT_POWER: u8 = KEY_POWER;
pub const INPUT_SHOCK: u8 = KEY_SHOCK;

const MIN_INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_A, name: "A" },
    InputButton { id: INPUT_B, name: "B" },
    InputButton { id: INPUT_C, name: "C" },
    InputButton { id: INPUT_UP, name: "Up" },
    InputButton { id: INPUT_DOWN, name: "Down" },
    InputButton { id: INPUT_LEFT, name: "Left" },
    InputButton { id: INPUT_RIGHT, name: "Right" },
    InputButton { id: INPUT_POWER, name: "Power" },
    InputButton { id: INPUT_SHOCK, name: "Shake" },
];

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct NetplayOptions {
    pub id: u8,
    pub server_port: u16,
    pub hard_sync: bool,
    pub sync_threshold: u32,
}

#[derive(Clone, Debug)]
pub struct MachineOptions {
    pub use_bios: bool,
    /// Simulate LCD persistence with a third gray level.
    pub lcd_blend: bool,
    /// Refresh the EEPROM RTC snapshot from host time at load.
    pub rtc_snapshot: bool,
    pub ignore_illegal_ops: bool,
    pub sample_rate: u32,
    /// Host master volume 0-128.
    pub volume: u8,
    pub netplay: Option<NetplayOptions>,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            use_bios: true,
            lcd_blend: false,
            rtc_snapshot: true,
            ignore_illegal_ops: false,
            sample_rate: 44100,
            volume: 128,
            netplay: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Pokémon Mini (Nintendo/Epson, 2001)
///
/// Hardware: Epson S1C88 @ 4 MHz, 4 KiB RAM, PRC tile/sprite compositor
/// into a 96x64 1bpp SED1565 panel, one PWM sound channel, 8 KiB EEPROM,
/// IR port. The IR port doubles as the netplay transport.
pub struct PokemonMini {
    cpu: S1C88,
    memory: Vec<u8>,
    timers: TimerBlock,
    eeprom: Eeprom,
    sed: Sed1565,
    prc: Prc,
    apu: Apu,
    ir: IrLink,
    keypad: Keypad,

    // Interrupt controller
    master_irq_flags: u32,
    irq_enable: [bool; 32],
    irq_priority: [u8; 32],
    irq_vectors: [u16; 32],

    osc_1_enable: bool,
    osc_2_enable: bool,

    // Real-time clock (seconds since reset, 24 bits visible)
    rtc_enabled: bool,
    rtc: u32,
    rtc_cycles: u32,

    // Panel output: 0 = off, 1 = on, 2 = mid (persistence blending)
    screen: Vec<u8>,
    old_screen: Vec<u8>,
    lcd_blend: bool,
    frame_presented: bool,

    rumble_active: bool,
    last_cycles: u32,
    connect_poll: u32,

    options: MachineOptions,
}

impl PokemonMini {
    pub fn new(options: MachineOptions) -> Self {
        let mut machine = Self {
            cpu: S1C88::new(),
            memory: vec![0; MEMORY_SIZE],
            timers: TimerBlock::new(),
            eeprom: Eeprom::new(),
            sed: Sed1565::new(),
            prc: Prc::new(),
            apu: Apu::new(options.sample_rate),
            ir: IrLink::new(),
            keypad: Keypad::new(),
            master_irq_flags: 0,
            irq_enable: [false; 32],
            irq_priority: [0; 32],
            irq_vectors: [0; 32],
            osc_1_enable: false,
            osc_2_enable: false,
            rtc_enabled: false,
            rtc: 0,
            rtc_cycles: 0,
            screen: vec![0; SCREEN_W * SCREEN_H],
            old_screen: vec![0; SCREEN_W * SCREEN_H],
            lcd_blend: options.lcd_blend,
            frame_presented: false,
            rumble_active: false,
            last_cycles: 0,
            connect_poll: 0,
            options,
        };

        machine.cpu.ignore_illegal_ops = machine.options.ignore_illegal_ops;
        machine.apu.master_volume = machine.options.volume;
        machine.rtc_enabled = machine.options.rtc_snapshot;

        if let Some(netplay) = machine.options.netplay.clone() {
            machine.ir.enable_netplay(
                netplay.id,
                netplay.server_port,
                netplay.hard_sync,
                netplay.sync_threshold,
            );
        }

        machine.power_on();
        machine
    }

    /// Factory used by the machine registry.
    pub fn from_config(config: &MachineConfig) -> Result<Box<dyn Machine>, RomLoadError> {
        let rom = RomImage::from_file(&config.rom_path)?;
        let mut machine = PokemonMini::new(config.options.clone());
        machine.load_rom(&rom);

        if config.options.use_bios {
            let Some(bios_path) = &config.bios_path else {
                return Err(RomLoadError::MissingBios("<none given>".into()));
            };
            let bios = BiosImage::from_file(bios_path)?;
            machine.load_bios(&bios.data);
        }

        Ok(Box::new(machine))
    }

    /// Power-on state: System Reset pending, its group enabled at the
    /// top priority level so the first dispatch jumps through vector 0.
    fn power_on(&mut self) {
        self.master_irq_flags = SYSTEM_RESET_IRQ;

        self.irq_enable = [false; 32];
        self.irq_priority = [0; 32];
        for source in 0..3 {
            self.irq_enable[source] = true;
            self.irq_priority[source] = 4;
        }
    }

    /// Copy a cartridge image into the bus. Bytes past the image are the
    /// open-bus 0xFF.
    pub fn load_rom(&mut self, rom: &RomImage) {
        let len = rom.data.len().min(MEMORY_SIZE);
        self.memory[0x2100..len].copy_from_slice(&rom.data[0x2100..len]);
        for byte in &mut self.memory[len..] {
            *byte = 0xFF;
        }
    }

    /// Copy a BIOS image into the boot window and reseed the interrupt
    /// vector table from its first 64 bytes.
    pub fn load_bios(&mut self, bios: &[u8]) {
        let len = bios.len().min(0x1000);
        self.memory[..len].copy_from_slice(&bios[..len]);
        self.reseed_vectors();
    }

    fn reseed_vectors(&mut self) {
        for source in 0..32 {
            let lo = self.memory[source * 2] as u16;
            let hi = self.memory[source * 2 + 1] as u16;
            self.irq_vectors[source] = (hi << 8) | lo;
        }
    }

    /// Restore EEPROM contents from a save file and refresh (or zero) the
    /// RTC snapshot in its last 10 bytes.
    pub fn load_eeprom(&mut self, image: &[u8]) {
        if image.len() != lumen_core::device::eeprom::EEPROM_SIZE {
            log::warn!("irregular EEPROM save size ({} bytes)", image.len());
        }
        self.eeprom.load_image(image);
        self.refresh_rtc_snapshot();
    }

    fn refresh_rtc_snapshot(&mut self) {
        if self.rtc_enabled {
            use chrono::{Datelike, Local, Timelike};
            let now = Local::now();
            self.eeprom.stamp_rtc(
                (now.year() % 100) as u8,
                now.month() as u8,
                now.day() as u8,
                now.hour() as u8,
                now.minute() as u8,
                now.second().min(59) as u8,
            );
        } else {
            self.eeprom.clear_rtc();
        }
    }

    pub fn eeprom_dirty(&self) -> bool {
        self.eeprom.dirty
    }

    pub fn cpu(&self) -> &S1C88 {
        &self.cpu
    }

    pub fn ir(&self) -> &IrLink {
        &self.ir
    }

    /// Point the IR link at a peer id (0-9).
    pub fn set_netplay_peer(&mut self, id: u8) {
        self.ir.network_id = id % 10;
    }

    /// One connection-establishment attempt for the current peer.
    pub fn poll_netplay(&mut self) {
        self.ir.poll_connection();
    }

    pub fn rumble_active(&self) -> bool {
        self.rumble_active
    }

    /// Raise every source in `mask`: set the master flag and mirror it
    /// into the IRQ_ACT byte.
    fn raise_irq(&mut self, mask: u32) {
        let mut remaining = mask;
        while remaining != 0 {
            let bit = remaining & remaining.wrapping_neg();
            remaining &= !bit;

            self.master_irq_flags |= bit;
            if let Some((reg, flag)) = irq::act_flag(bit) {
                self.memory[IRQ_ACT_1 as usize + reg] |= flag;
            }
        }
    }

    /// Run one instruction and clock the system; returns cycles consumed.
    pub fn step(&mut self) -> u32 {
        self.ir_housekeeping();

        let mut cpu = std::mem::take(&mut self.cpu);
        cpu.handle_interrupt(self);
        let cycles = cpu.execute(self);
        self.cpu = cpu;

        self.clock_system(cycles);
        self.last_cycles = cycles;
        cycles
    }

    /// Pre-instruction IR work: incoming netplay traffic, hard-sync
    /// bookkeeping, or the generated remote pulse train.
    fn ir_housekeeping(&mut self) {
        if self.ir.network_id == REMOTE_SLOT {
            let cycles = self.last_cycles;
            let irqs = self
                .ir
                .process_remote_signal(cycles, &mut self.memory[PM_IO_DATA as usize]);
            self.raise_irq(irqs);
            return;
        }

        if !self.ir.is_netplay() {
            return;
        }

        if self.ir.connected[self.ir.network_id as usize] {
            if self.ir.hard_sync_enabled && self.ir.sync_timeout > 0 {
                let cycles = self.last_cycles;
                let irqs = self
                    .ir
                    .hard_sync(cycles, &mut self.memory[PM_IO_DATA as usize]);
                self.raise_irq(irqs);
            }

            let irqs = self.ir.recv_byte(&mut self.memory[PM_IO_DATA as usize]);
            self.raise_irq(irqs);
        } else {
            // Connection attempts are throttled; a blocking connect per
            // instruction would stall the core.
            self.connect_poll += 1;
            if self.connect_poll >= 4096 {
                self.connect_poll = 0;
                self.ir.poll_connection();
            }
        }
    }

    /// Advance every device by the cycles the last instruction consumed.
    fn clock_system(&mut self, cycles: u32) {
        let tick = self.prc.clock(cycles);

        if tick.copy_irq {
            self.raise_irq(PRC_COPY_IRQ);
        }
        if tick.overflow_irq {
            self.raise_irq(PRC_OVERFLOW_IRQ);
        }
        if tick.present {
            self.present(tick.new_frame);
        }
        if tick.buffer_audio {
            if self.apu.needs_fill {
                self.buffer_audio();
            }
            self.apu.needs_fill = true;
        }

        let timer_irqs = self.timers.clock(cycles);
        self.raise_irq(timer_irqs);

        self.ir
            .clock_fade(cycles, &mut self.memory[PM_IO_DATA as usize]);

        if self.rtc_enabled {
            self.rtc_cycles += cycles;
            if self.rtc_cycles >= RTC_SECOND_CYCLES {
                self.rtc_cycles -= RTC_SECOND_CYCLES;
                self.rtc = self.rtc.wrapping_add(1);
            }
        }
    }

    /// One PRC refresh: render the enabled layers into GDDRAM and, on a
    /// new frame, latch GDDRAM into the visible screen.
    fn present(&mut self, new_frame: bool) {
        self.frame_presented = true;

        if !self.sed.enabled {
            return;
        }

        if self.prc.enable_map || self.prc.force_update {
            self.prc.render_map(&mut self.memory);
        }
        if self.prc.enable_obj {
            self.prc.render_obj(&mut self.memory);
        }
        if new_frame {
            self.latch_screen();
        }
    }

    /// Unpack GDDRAM into per-pixel on/off, with optional 3-color blending
    /// of pixels that flipped since the previous frame.
    fn latch_screen(&mut self) {
        let mut px = 0usize;
        let mut py = 0usize;

        for index in 0..0x300usize {
            let byte = self.memory[0x1000 + index];

            for bit in 0..8 {
                let pos = (py + bit) * SCREEN_W + px;
                let mut pixel = (byte >> bit) & 1;

                if self.lcd_blend {
                    let old = self.old_screen[pos];
                    self.old_screen[pos] = pixel;
                    if pixel != old {
                        pixel = 2;
                    }
                }

                self.screen[pos] = pixel;
            }

            px += 1;
            if px == SCREEN_W {
                px = 0;
                py += 8;
            }
        }
    }

    /// Gate and fill one PWM quantum from Timer 3's current settings.
    fn buffer_audio(&mut self) {
        let scale = self.memory[TIMER3_SCALE as usize];
        let frequency = self.timers.timer3_output_freq(scale);

        let timer3 = &self.timers.timers[2];
        let duty = timer3.pivot as f64 / (timer3.reload_value as f64 + 1.0);

        let osc_ok = if timer3.osc_lo == 0 {
            self.osc_1_enable
        } else {
            self.osc_2_enable
        };
        let sound_on = osc_ok && timer3.enable_scalar_lo && timer3.enable_lo;

        self.apu.buffer_channel(frequency, duty, sound_on);
    }

    /// TIMERn_CNT write: decode mode/enable bits and apply resets.
    /// Re-enabling a half loads the preset into it; the reset bits clear
    /// to zero instead.
    fn timer_control_write(&mut self, index: usize, cnt_lo: u32) {
        let cnt = ((self.memory[cnt_lo as usize + 1] as u16) << 8)
            | self.memory[cnt_lo as usize] as u16;

        let was_lo = self.timers.timers[index].enable_lo;
        let was_hi = self.timers.timers[index].enable_hi;

        let timer = &mut self.timers.timers[index];
        timer.cnt = cnt;
        timer.full_mode = cnt & 0x80 != 0;
        timer.enable_hi = cnt & 0x400 != 0;
        timer.enable_lo = cnt & 0x4 != 0;

        if !was_lo && timer.enable_lo {
            if timer.full_mode {
                timer.counter = timer.reload_value;
            } else {
                timer.counter = (timer.counter & 0xFF00) | (timer.reload_value & 0xFF);
            }
        }
        if !was_hi && timer.enable_hi && !timer.full_mode {
            timer.counter = (timer.counter & 0x00FF) | (timer.reload_value & 0xFF00);
        }

        if cnt & 0x200 != 0 {
            timer.counter &= if timer.full_mode { 0x0000 } else { 0x00FF };
            timer.clock_hi = 0;
        }
        if cnt & 0x2 != 0 {
            timer.counter &= 0xFF00;
            timer.clock_lo = 0;
        }
    }

    fn timer_preset_write(&mut self, index: usize, preset_lo: u32) {
        let preset = ((self.memory[preset_lo as usize + 1] as u16) << 8)
            | self.memory[preset_lo as usize] as u16;
        self.timers.timers[index].reload_value = preset;
    }

    /// PM_IO_DATA write: EEPROM clock/data lines, IR transmit, rumble.
    fn io_data_write(&mut self, value: u8) {
        let drive = self.eeprom.update(value & 0x8 != 0, value & 0x4 != 0);
        match drive {
            lumen_core::device::eeprom::SdaDrive::Low => {
                self.memory[PM_IO_DATA as usize] &= !0x04;
            }
            lumen_core::device::eeprom::SdaDrive::High => {
                self.memory[PM_IO_DATA as usize] |= 0x04;
            }
            lumen_core::device::eeprom::SdaDrive::Float => {}
        }

        if value & 0x2 != 0 {
            self.memory[PM_IO_DATA as usize] |= 0x1;
        } else {
            self.ir.process_ir(self.memory[PM_IO_DATA as usize]);
        }

        let rumble_on = self.memory[PM_IO_DATA as usize] & 0x10 != 0
            && self.memory[PM_IO_DIR as usize] & 0x10 != 0;
        self.rumble_active = rumble_on;
    }
}

// ---------------------------------------------------------------------------
// Bus (MMU + MMIO)
// ---------------------------------------------------------------------------

impl Bus for PokemonMini {
    fn read_u8(&mut self, addr: u32) -> u8 {
        let addr = if addr >= 0x200000 {
            log::debug!("bus read above 21 bits: 0x{addr:08X}");
            addr & 0x1FFFFF
        } else {
            addr
        };

        match addr {
            SYS_CNT3 if self.rtc_enabled => self.memory[addr as usize] | 0x2,

            RTC_SEC_LO => self.rtc as u8,
            RTC_SEC_MID => (self.rtc >> 8) as u8,
            RTC_SEC_HI => (self.rtc >> 16) as u8,

            TIMER1_COUNT_LO => self.timers.timers[0].counter as u8,
            TIMER1_COUNT_HI => (self.timers.timers[0].counter >> 8) as u8,
            TIMER2_COUNT_LO => self.timers.timers[1].counter as u8,
            TIMER2_COUNT_HI => (self.timers.timers[1].counter >> 8) as u8,
            TIMER3_COUNT_LO => self.timers.timers[2].counter as u8,
            TIMER3_COUNT_HI => (self.timers.timers[2].counter >> 8) as u8,

            TIMER256_CNT => self.timers.timers[3].cnt as u8,
            TIMER256_COUNT => self.timers.timers[3].counter as u8,

            PM_KEYPAD => self.keypad.key_input,

            PRC_RATE => self.prc.rate,
            PRC_CNT => self.prc.counter,

            _ => self.memory[addr as usize],
        }
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        // Only RAM and MMIO accept writes; the IRQ_ACT bytes are not
        // stored raw (the handler masks pending flags instead).
        if (RAM_BASE..MMIO_END).contains(&addr) && !(IRQ_ACT_1..=IRQ_ACT_4).contains(&addr) {
            self.memory[addr as usize] = value;
        }

        match addr {
            SEC_CNT => {
                self.rtc_enabled = value & 0x1 != 0;
                if value & 0x2 != 0 {
                    self.rtc = 0;
                }
                self.memory[SEC_CNT as usize] = value & 0x1;
            }

            IRQ_PRI_1 => {
                for source in [3, 4] {
                    self.irq_priority[source] = (value >> 6) & 0x3;
                }
                for source in [5, 6] {
                    self.irq_priority[source] = (value >> 4) & 0x3;
                }
                for source in [7, 8] {
                    self.irq_priority[source] = (value >> 2) & 0x3;
                }
                for source in [9, 10] {
                    self.irq_priority[source] = value & 0x3;
                }
            }

            IRQ_PRI_2 => {
                for source in 11..=14 {
                    self.irq_priority[source] = (value >> 6) & 0x3;
                }
                for source in [19, 20] {
                    self.irq_priority[source] = (value >> 4) & 0x3;
                }
                for source in 21..=28 {
                    self.irq_priority[source] = (value >> 2) & 0x3;
                }
                for source in 29..=31 {
                    self.irq_priority[source] = value & 0x3;
                }
            }

            IRQ_PRI_3 => {
                for source in [15, 16] {
                    self.irq_priority[source] = value & 0x3;
                }
            }

            IRQ_ENA_1 => {
                self.irq_enable[3] = value & 0x80 != 0;
                self.irq_enable[4] = value & 0x40 != 0;
                self.irq_enable[5] = value & 0x20 != 0;
                self.irq_enable[6] = value & 0x10 != 0;
                self.irq_enable[7] = value & 0x08 != 0;
                self.irq_enable[8] = value & 0x04 != 0;
                self.irq_enable[9] = value & 0x02 != 0;
                self.irq_enable[10] = value & 0x01 != 0;
            }

            IRQ_ENA_2 => {
                self.irq_enable[11] = value & 0x20 != 0;
                self.irq_enable[12] = value & 0x10 != 0;
                self.irq_enable[13] = value & 0x08 != 0;
                self.irq_enable[14] = value & 0x04 != 0;
                self.irq_enable[19] = value & 0x02 != 0;
                self.irq_enable[20] = value & 0x01 != 0;
            }

            IRQ_ENA_3 => {
                self.irq_enable[21] = value & 0x80 != 0;
                self.irq_enable[22] = value & 0x40 != 0;
                self.irq_enable[23] = value & 0x20 != 0;
                self.irq_enable[24] = value & 0x10 != 0;
                self.irq_enable[25] = value & 0x08 != 0;
                self.irq_enable[26] = value & 0x04 != 0;
                self.irq_enable[27] = value & 0x02 != 0;
                self.irq_enable[28] = value & 0x01 != 0;
            }

            IRQ_ENA_4 => {
                self.irq_enable[15] = value & 0x80 != 0;
                self.irq_enable[16] = value & 0x40 != 0;
                self.irq_enable[29] = value & 0x04 != 0;
                self.irq_enable[30] = value & 0x02 != 0;
                self.irq_enable[31] = value & 0x01 != 0;
            }

            IRQ_ACT_1..=IRQ_ACT_4 => {
                let reg = (addr - IRQ_ACT_1) as usize;
                self.master_irq_flags &= !irq::act_clear_mask(reg, value);
                self.memory[addr as usize] &= !value;
            }

            TIMER1_SCALE | TIMER2_SCALE | TIMER3_SCALE => {
                let index = ((addr - TIMER1_SCALE) / 2) as usize;
                self.timers.update_prescalar(index, value);
                self.timers.timers[index].enable_scalar_lo = value & 0x08 != 0;
                self.timers.timers[index].enable_scalar_hi = value & 0x80 != 0;
            }

            TIMER1_OSC | TIMER2_OSC | TIMER3_OSC => {
                let index = ((addr - TIMER1_OSC) / 2) as usize;
                self.timers.timers[index].osc_lo = value & 0x1;
                self.timers.timers[index].osc_hi = (value >> 1) & 0x1;

                // The oscillator run bits live in the Timer 1 register.
                if addr == TIMER1_OSC {
                    self.osc_1_enable = value & 0x20 != 0;
                    self.osc_2_enable = value & 0x10 != 0;
                }

                let scale_addr = TIMER1_SCALE + (addr - TIMER1_OSC);
                let scale = self.memory[scale_addr as usize];
                self.timers.update_prescalar(index, scale);
            }

            TIMER1_CNT_LO | TIMER1_CNT_HI => self.timer_control_write(0, TIMER1_CNT_LO),
            TIMER2_CNT_LO | TIMER2_CNT_HI => self.timer_control_write(1, TIMER2_CNT_LO),
            TIMER3_CNT_LO | TIMER3_CNT_HI => self.timer_control_write(2, TIMER3_CNT_LO),

            TIMER1_PRESET_LO | TIMER1_PRESET_HI => self.timer_preset_write(0, TIMER1_PRESET_LO),
            TIMER2_PRESET_LO | TIMER2_PRESET_HI => self.timer_preset_write(1, TIMER2_PRESET_LO),
            TIMER3_PRESET_LO | TIMER3_PRESET_HI => self.timer_preset_write(2, TIMER3_PRESET_LO),

            TIMER3_PIVOT_LO | TIMER3_PIVOT_HI => {
                let pivot = ((self.memory[TIMER3_PIVOT_HI as usize] as u16) << 8)
                    | self.memory[TIMER3_PIVOT_LO as usize] as u16;
                self.timers.timers[2].pivot = pivot;
            }

            TIMER256_CNT => {
                self.timers.timers[3].cnt = (value & 0x3) as u16;
                self.timers.timers[3].enable_lo = value & 0x1 != 0;
                if value & 0x2 != 0 {
                    self.timers.timers[3].counter = 0;
                    self.timers.timers[3].clock_lo = 0;
                }
            }

            PM_IO_DATA => self.io_data_write(value),

            PM_AUDIO_VOLUME => {
                self.apu.main_volume = value & 0x3;
            }

            PRC_RATE => self.prc.write_rate(value),
            PRC_MODE => self.prc.write_mode(value),

            PRC_MAP_LO | PRC_MAP_MID | PRC_MAP_HI => {
                self.prc.set_map_addr(
                    self.memory[PRC_MAP_LO as usize],
                    self.memory[PRC_MAP_MID as usize],
                    self.memory[PRC_MAP_HI as usize],
                );
            }

            PRC_SY => self.prc.scroll_y = value,
            PRC_SX => self.prc.scroll_x = value,

            PRC_SPR_LO | PRC_SPR_MID | PRC_SPR_HI => {
                self.prc.set_obj_addr(
                    self.memory[PRC_SPR_LO as usize],
                    self.memory[PRC_SPR_MID as usize],
                    self.memory[PRC_SPR_HI as usize],
                );
            }

            MIN_LCD_CNT => self.sed.write_control(value, &mut self.memory),
            MIN_LCD_DATA => self.sed.write_data(value, &mut self.memory),

            _ => {}
        }
    }

    fn pending_irq(&self, mask: u8) -> Option<IrqRequest> {
        for priority in ((mask + 1)..=4).rev() {
            for source in 0..32u8 {
                if self.irq_enable[source as usize]
                    && self.master_irq_flags & (1 << source) != 0
                    && self.irq_priority[source as usize] == priority
                {
                    return Some(IrqRequest {
                        source,
                        vector: self.irq_vectors[source as usize],
                    });
                }
            }
        }
        None
    }

    fn ack_system_reset(&mut self) {
        self.master_irq_flags &= !SYSTEM_RESET_IRQ;
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

impl Machine for PokemonMini {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_W as u32, SCREEN_H as u32)
    }

    fn run_frame(&mut self) {
        self.frame_presented = false;
        while !self.frame_presented && self.cpu.running {
            self.step();
        }
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        for (index, &pixel) in self.screen.iter().enumerate() {
            let shade = match pixel {
                1 => 0x00,
                2 => 0x80,
                _ => 0xFF,
            };
            let offset = index * 3;
            buffer[offset] = shade;
            buffer[offset + 1] = shade;
            buffer[offset + 2] = shade;
        }
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        let irqs = self.keypad.set_key(button, pressed);
        self.raise_irq(irqs);
    }

    fn input_map(&self) -> &[InputButton] {
        MIN_INPUT_MAP
    }

    fn reset(&mut self) {
        self.cpu.reset();
        self.timers.reset();
        self.sed.reset();
        self.prc.reset();
        self.apu.reset();
        self.keypad.reset();

        // RAM and MMIO clear; BIOS and cartridge stay mapped.
        for byte in &mut self.memory[RAM_BASE as usize..MMIO_END as usize] {
            *byte = 0;
        }

        self.osc_1_enable = false;
        self.osc_2_enable = false;
        self.rtc = 0;
        self.rtc_cycles = 0;
        self.rtc_enabled = self.options.rtc_snapshot;

        self.screen.fill(0);
        self.old_screen.fill(0);
        self.frame_presented = false;
        self.rumble_active = false;
        self.last_cycles = 0;

        self.power_on();
        self.reseed_vectors();
    }

    fn save_nvram(&self) -> Option<Vec<u8>> {
        if self.eeprom.dirty {
            Some(self.eeprom.data.clone())
        } else {
            None
        }
    }

    fn load_nvram(&mut self, data: &[u8]) {
        self.load_eeprom(data);
    }

    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize {
        self.apu.generate(buffer)
    }

    fn audio_sample_rate(&self) -> u32 {
        self.apu.sample_rate
    }

    fn frame_rate_hz(&self) -> f64 {
        // One panel refresh per full PRC counter cycle.
        4_000_000.0 / 55634.0
    }

    fn hotkey(&mut self, id: u8) {
        match id {
            HOTKEY_NETPLAY_NEXT => {
                let peer = self.ir.next_peer();
                log::info!("IR link now targets peer {peer}");
            }
            HOTKEY_REMOTE_SIGNAL => self.ir.start_remote_signal(),
            _ => {}
        }
    }

    fn save_state(&self) -> Vec<u8> {
        savestate::save(self)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        savestate::load(self, data)
    }
}

impl Drop for PokemonMini {
    fn drop(&mut self) {
        self.ir.disconnect();
    }
}

inventory::submit! {
    MachineEntry::new(
        "min",
        "Pokemon Mini (S1C88)",
        PokemonMini::from_config,
    )
}
