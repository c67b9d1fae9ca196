//! Programmable timer block: three general-purpose down-counters plus the
//! fixed 256 Hz up-counter.
//!
//! Timers 1-3 run as two independent 8-bit halves or one 16-bit counter.
//! Each half has its own prescaler (selected from the active oscillator's
//! divider table) and clock accumulator. Underflow reloads the preset and
//! raises the matching IRQ; Timer 3 additionally tracks a pivot threshold
//! for the PWM unit. `clock()` returns the OR of all IRQ masks raised so
//! the machine can feed them to its interrupt controller.

use crate::core::irq::*;

/// Divider table for the 2 MHz system oscillator.
const OSC1_PRESCALE: [u32; 8] = [2, 8, 32, 64, 128, 256, 1024, 4096];

/// Divider table for the 32.768 kHz low-power oscillator, expressed in
/// 4 MHz CPU cycles.
const OSC2_PRESCALE: [u32; 8] = [122, 244, 488, 976, 1953, 3906, 7812, 15625];

/// One cycle of the 256 Hz timer in CPU cycles (4 MHz / 256).
const TIMER_256HZ_PRESCALE: u32 = 15625;

pub fn osc1_prescale(index: u8) -> u32 {
    OSC1_PRESCALE[(index & 7) as usize]
}

pub fn osc2_prescale(index: u8) -> u32 {
    OSC2_PRESCALE[(index & 7) as usize]
}

#[derive(Clone, Debug, Default)]
pub struct Timer {
    pub clock_lo: u32,
    pub clock_hi: u32,
    pub prescalar_lo: u32,
    pub prescalar_hi: u32,
    pub cnt: u16,
    pub counter: u16,
    pub reload_value: u16,

    pub pivot: u16,
    pub pivot_status: u8,

    pub osc_lo: u8,
    pub osc_hi: u8,

    pub full_mode: bool,

    pub enable_lo: bool,
    pub enable_hi: bool,

    pub enable_scalar_lo: bool,
    pub enable_scalar_hi: bool,
}

pub struct TimerBlock {
    pub timers: [Timer; 4],
}

impl Default for TimerBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerBlock {
    pub fn new() -> Self {
        let mut block = Self {
            timers: Default::default(),
        };
        block.reset();
        block
    }

    pub fn reset(&mut self) {
        for timer in &mut self.timers {
            *timer = Timer::default();
        }
        // The 256 Hz timer always divides the 4 MHz clock by 15625.
        self.timers[3].prescalar_lo = TIMER_256HZ_PRESCALE;
    }

    /// Recompute a timer's prescalers from its scale register value and
    /// per-half oscillator selection.
    pub fn update_prescalar(&mut self, index: usize, scale: u8) {
        let timer = &mut self.timers[index];

        timer.prescalar_lo = if timer.osc_lo != 0 {
            osc2_prescale(scale & 7)
        } else {
            osc1_prescale(scale & 7)
        };

        timer.prescalar_hi = if timer.osc_hi != 0 {
            osc2_prescale((scale >> 4) & 7)
        } else {
            osc1_prescale((scale >> 4) & 7)
        };
    }

    /// Advance all timers by `cycles` CPU cycles; returns raised IRQ masks.
    pub fn clock(&mut self, cycles: u32) -> u32 {
        let mut raised = 0;

        for index in 0..4 {
            raised |= self.clock_lo_half(index, cycles);
            raised |= self.clock_hi_half(index, cycles);
        }

        raised
    }

    fn clock_lo_half(&mut self, index: usize, cycles: u32) -> u32 {
        let timer = &mut self.timers[index];
        if !timer.enable_lo {
            return 0;
        }

        let mut raised = 0;
        timer.clock_lo += cycles;

        while timer.clock_lo >= timer.prescalar_lo && timer.prescalar_lo != 0 {
            timer.clock_lo -= timer.prescalar_lo;

            // The 256 Hz timer is an 8-bit up-counter; the rest count down
            // over the low byte or the full 16 bits.
            if index == 3 {
                timer.counter = (timer.counter + 1) & 0xFF;

                if timer.counter == 0 {
                    raised |= TIMER_1HZ_IRQ;
                }
                if timer.counter % 128 == 0 {
                    raised |= TIMER_2HZ_IRQ;
                }
                if timer.counter % 32 == 0 {
                    raised |= TIMER_8HZ_IRQ;
                }
                if timer.counter % 8 == 0 {
                    raised |= TIMER_32HZ_IRQ;
                }
                continue;
            }

            let count = if timer.full_mode {
                timer.counter = timer.counter.wrapping_sub(1);
                timer.counter
            } else {
                let lo = (timer.counter as u8).wrapping_sub(1);
                timer.counter = (timer.counter & 0xFF00) | lo as u16;
                lo as u16
            };

            match index {
                0 => {
                    if !timer.full_mode && count & 0xFF == 0xFF {
                        raised |= TIMER1_LOWER_UNDERFLOW_IRQ;
                        timer.counter =
                            (timer.counter & !0xFF) | (timer.reload_value & 0xFF);
                    } else if timer.full_mode && count == 0xFFFF {
                        raised |= TIMER1_UPPER_UNDERFLOW_IRQ;
                        timer.counter = timer.reload_value;
                    }
                }
                1 => {
                    if !timer.full_mode && count & 0xFF == 0xFF {
                        raised |= TIMER2_LOWER_UNDERFLOW_IRQ;
                        timer.counter =
                            (timer.counter & !0xFF) | (timer.reload_value & 0xFF);
                    } else if timer.full_mode && count == 0xFFFF {
                        raised |= TIMER2_UPPER_UNDERFLOW_IRQ;
                        timer.counter = timer.reload_value;
                    }
                }
                _ => {
                    let old_pivot = timer.pivot_status;

                    if timer.full_mode && count == 0xFFFF {
                        raised |= TIMER3_UPPER_UNDERFLOW_IRQ;
                        timer.counter = timer.reload_value;
                        timer.pivot_status = 0;
                    }

                    // Pivot fires once on the way down; re-armed by the
                    // upper underflow above.
                    let mask = if timer.full_mode { 0xFFFF } else { 0xFF };
                    if count & mask <= timer.pivot && old_pivot == 0 {
                        raised |= TIMER3_PIVOT_IRQ;
                        timer.pivot_status = 1;
                    }
                }
            }
        }

        raised
    }

    fn clock_hi_half(&mut self, index: usize, cycles: u32) -> u32 {
        let timer = &mut self.timers[index];
        if !timer.enable_hi || timer.full_mode || index == 3 {
            return 0;
        }

        let mut raised = 0;
        timer.clock_hi += cycles;

        while timer.clock_hi >= timer.prescalar_hi && timer.prescalar_hi != 0 {
            timer.clock_hi -= timer.prescalar_hi;

            let hi = (timer.counter >> 8) as u8;
            let hi = hi.wrapping_sub(1);
            timer.counter = (timer.counter & 0xFF) | ((hi as u16) << 8);

            if hi == 0xFF {
                match index {
                    0 => {
                        raised |= TIMER1_UPPER_UNDERFLOW_IRQ;
                        timer.counter =
                            (timer.counter & 0xFF) | (timer.reload_value & 0xFF00);
                    }
                    1 => {
                        raised |= TIMER2_UPPER_UNDERFLOW_IRQ;
                        timer.counter =
                            (timer.counter & 0xFF) | (timer.reload_value & 0xFF00);
                    }
                    _ => {}
                }
            }
        }

        raised
    }

    /// Timer 3's output frequency for the PWM channel. In 8-bit mode the
    /// high half drives the output; in 16-bit mode the low half does.
    pub fn timer3_output_freq(&self, scale: u8) -> f64 {
        let timer = &self.timers[2];

        let osc = if timer.full_mode {
            timer.osc_lo
        } else {
            timer.osc_hi
        };
        let index = if timer.full_mode {
            scale & 7
        } else {
            (scale >> 4) & 7
        };
        let preset = timer.reload_value as f64 + 1.0;

        if osc != 0 {
            // 32.768 kHz source halves per scalar step.
            let rates = [
                32768.0, 16384.0, 8192.0, 4096.0, 2048.0, 1024.0, 512.0, 256.0,
            ];
            rates[index as usize] / preset
        } else {
            let rates = [
                2_000_000.0,
                500_000.0,
                125_000.0,
                62_500.0,
                31_250.0,
                15_625.0,
                3_906.25,
                976.5625,
            ];
            rates[index as usize] / preset
        }
    }
}
