//! Single-channel PWM audio unit.
//!
//! Timer 3 supplies the output frequency and the pivot/preset ratio sets
//! the duty cycle. The PRC requests one buffer quantum per quarter-frame
//! (`sample_rate / 144` samples); the host drains the ring at the device
//! rate. The ring deliberately tolerates overruns: past 512 buffered
//! samples both indices reset and the surplus is dropped.

const BUFFER_LEN: usize = 0x10000;
const DRAIN_THRESHOLD: u16 = 512;

/// Idle line level (full negative rail).
const SILENCE: i16 = -32768;

pub struct Apu {
    pub output_frequency: f64,
    pub duty_cycle: f64,
    frequency_distance: u32,

    buffer: Vec<i16>,
    buffer_size: u16,
    current_index: u16,
    last_index: u16,

    pub needs_fill: bool,
    pub fill_rate: u32,

    pub sound_on: bool,
    /// PM_AUDIO_VOLUME level 0-3.
    pub main_volume: u8,
    pub sample_rate: u32,
    /// Host master volume 0-128, applied when draining.
    pub master_volume: u8,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(44100)
    }
}

impl Apu {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            output_frequency: 0.0,
            duty_cycle: 0.0,
            frequency_distance: 0,
            buffer: vec![SILENCE; BUFFER_LEN],
            buffer_size: 0,
            current_index: 0,
            last_index: 0,
            needs_fill: true,
            fill_rate: sample_rate / 144,
            sound_on: false,
            main_volume: 0,
            sample_rate,
            master_volume: 128,
        }
    }

    pub fn reset(&mut self) {
        let sample_rate = self.sample_rate;
        let master_volume = self.master_volume;
        *self = Self::new(sample_rate);
        self.master_volume = master_volume;
    }

    fn push(&mut self, sample: i16) {
        self.buffer[self.current_index as usize] = sample;
        self.current_index = self.current_index.wrapping_add(1);
    }

    /// Append one quantum of channel output at `frequency` Hz.
    ///
    /// The channel is audible only when the duty is a proper fraction and
    /// the caller has verified the timer/oscillator gates (`sound_on`).
    pub fn buffer_channel(&mut self, frequency: f64, duty: f64, sound_on: bool) {
        let length = self.fill_rate;
        self.buffer_size = self.buffer_size.wrapping_add(length as u16);
        self.output_frequency = frequency;
        self.duty_cycle = duty;
        self.sound_on = sound_on && duty > 0.0 && duty < 1.0;

        if !self.sound_on || frequency <= 0.0 {
            for _ in 0..length {
                self.push(SILENCE);
            }
            return;
        }

        let period = (self.sample_rate as f64 / frequency) as u32;
        let high_samples = (period as f64 * duty) as u32;

        // Amplitude by volume register: 0 silent, 1-2 half, 3 full.
        let level: i16 = match self.main_volume & 0x3 {
            0 => SILENCE,
            1 | 2 => 0,
            _ => 32767,
        };

        for _ in 0..length {
            self.frequency_distance += 1;
            if self.frequency_distance >= period {
                self.frequency_distance = 0;
            }

            if self.frequency_distance < high_samples {
                self.push(level);
            } else {
                self.push(SILENCE);
            }
        }
    }

    /// Drain into a host buffer, topping the ring up with the current
    /// channel settings if the host got ahead of the PRC.
    pub fn generate(&mut self, out: &mut [i16]) -> usize {
        while (self.buffer_size as usize) < out.len() {
            let frequency = self.output_frequency;
            let duty = self.duty_cycle;
            let sound_on = self.sound_on;
            self.buffer_channel(frequency, duty, sound_on);
            self.needs_fill = false;
        }

        let scale = self.master_volume as f64 / 128.0;
        for sample in out.iter_mut() {
            let raw = self.buffer[self.last_index as usize];
            self.last_index = self.last_index.wrapping_add(1);
            *sample = (raw as f64 * scale) as i16;
        }

        self.buffer_size -= out.len() as u16;

        if self.buffer_size >= DRAIN_THRESHOLD {
            self.buffer_size = 0;
            self.last_index = 0;
            self.current_index = 0;
        }

        out.len()
    }

    pub fn state_fields(&self) -> (f64, f64, u32, u16, u16, u16, bool, u8) {
        (
            self.output_frequency,
            self.duty_cycle,
            self.frequency_distance,
            self.buffer_size,
            self.current_index,
            self.last_index,
            self.sound_on,
            self.main_volume,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore_state_fields(
        &mut self,
        output_frequency: f64,
        duty_cycle: f64,
        frequency_distance: u32,
        buffer_size: u16,
        current_index: u16,
        last_index: u16,
        sound_on: bool,
        main_volume: u8,
    ) {
        self.output_frequency = output_frequency;
        self.duty_cycle = duty_cycle;
        self.frequency_distance = frequency_distance;
        self.buffer_size = buffer_size;
        self.current_index = current_index;
        self.last_index = last_index;
        self.sound_on = sound_on;
        self.main_volume = main_volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_wave_matches_duty_and_frequency() {
        let mut apu = Apu::new(44100);
        apu.main_volume = 3;

        // ~3906 Hz, 50% duty: period ≈ 11 samples, ~5 high.
        let freq = 3906.25;
        for _ in 0..144 {
            apu.buffer_channel(freq, 0.5, true);
        }

        let mut out = vec![0i16; 4096];
        apu.generate(&mut out);

        let high = out.iter().filter(|&&s| s == 32767).count();
        let ratio = high as f64 / out.len() as f64;
        assert!((0.35..=0.55).contains(&ratio), "duty ratio {ratio}");

        // Count rising edges to estimate frequency.
        let mut edges = 0;
        for pair in out.windows(2) {
            if pair[0] == SILENCE && pair[1] == 32767 {
                edges += 1;
            }
        }
        let estimated = edges as f64 * 44100.0 / out.len() as f64;
        assert!(
            (estimated - freq).abs() < 400.0,
            "estimated {estimated} Hz"
        );
    }

    #[test]
    fn degenerate_duty_is_silent() {
        let mut apu = Apu::new(44100);
        apu.main_volume = 3;
        apu.buffer_channel(4000.0, 0.0, true);
        apu.buffer_channel(4000.0, 1.0, true);

        let mut out = vec![0i16; 512];
        apu.generate(&mut out);
        assert!(out.iter().all(|&s| s == SILENCE));
    }

    #[test]
    fn master_volume_scales_output() {
        let mut apu = Apu::new(44100);
        apu.main_volume = 3;
        apu.master_volume = 64;
        apu.buffer_channel(4000.0, 0.5, true);

        let mut out = vec![0i16; 64];
        apu.generate(&mut out);
        assert!(out.iter().any(|&s| s == 16383));
        assert!(out.iter().all(|&s| s <= 16383));
    }

    #[test]
    fn overrun_resets_ring() {
        let mut apu = Apu::new(44100);
        for _ in 0..4 {
            apu.buffer_channel(4000.0, 0.5, false);
        }
        // 4 * 306 buffered; drain 64, leaving > 512 -> reset.
        let mut out = vec![0i16; 64];
        apu.generate(&mut out);
        let (_, _, _, buffer_size, current, last, _, _) = apu.state_fields();
        assert_eq!(buffer_size, 0);
        assert_eq!(current, 0);
        assert_eq!(last, 0);
    }
}
