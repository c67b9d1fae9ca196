//! Host playback for the single PWM channel.
//!
//! The APU hands over mono i16 samples whose silent level sits at the
//! negative rail, not at zero. An underrun therefore cannot just play
//! zeroes: the jump from rail to zero would click on every hiccup and
//! again at shutdown. Instead the callback remembers the last level it
//! played and bleeds it toward zero whenever the ring runs dry (or the
//! shutdown flag is raised), which turns gaps into a short fade of the
//! PWM line rather than a pop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

/// Ring capacity in samples (~93 ms at 44.1 kHz). The emulator thread
/// drops surplus past this instead of letting latency grow.
const RING_CAP: usize = 4096;

/// Bleed rate per sample while the ring is dry: rail to zero in 64
/// samples, fast enough to be inaudible as tone, slow enough not to pop.
const BLEED_STEP: i32 = 512;

/// Samples the emulator thread pushes in; the SDL callback thread pops
/// them out at the device rate.
pub type SampleRing = Arc<Mutex<VecDeque<i16>>>;

/// Raised before pausing the device so the callback can bleed the PWM
/// line down first.
pub type Shutdown = Arc<AtomicBool>;

pub(crate) struct PwmPlayer {
    ring: SampleRing,
    shutting_down: Shutdown,
    /// Last level put on the line, bled toward zero across gaps.
    level: i32,
}

impl AudioCallback for PwmPlayer {
    type Channel = i16;

    fn callback(&mut self, out: &mut [i16]) {
        let mut ring = self.ring.lock().unwrap();

        for sample in out.iter_mut() {
            let next = if self.shutting_down.load(Ordering::Relaxed) {
                None
            } else {
                ring.pop_front()
            };

            self.level = match next {
                Some(value) => value as i32,
                None if self.level > 0 => (self.level - BLEED_STEP).max(0),
                None => (self.level + BLEED_STEP).min(0),
            };

            *sample = self.level as i16;
        }
    }
}

/// Open mono i16 playback at the machine's sample rate.
///
/// Returns the device (must be kept alive), the shared sample ring, and
/// the shutdown flag. `None` when `sample_rate` is 0 (machine is silent).
pub fn init(
    sdl_audio: &sdl2::AudioSubsystem,
    sample_rate: u32,
) -> Option<(AudioDevice<PwmPlayer>, SampleRing, Shutdown)> {
    if sample_rate == 0 {
        return None;
    }

    let ring: SampleRing = Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAP)));
    let shutting_down: Shutdown = Arc::new(AtomicBool::new(false));

    // One channel: the hardware has a single speaker behind one PWM line.
    let desired_spec = AudioSpecDesired {
        freq: Some(sample_rate as i32),
        channels: Some(1),
        samples: Some(512),
    };

    let device = sdl_audio
        .open_playback(None, &desired_spec, |_spec| PwmPlayer {
            ring: Arc::clone(&ring),
            shutting_down: Arc::clone(&shutting_down),
            level: 0,
        })
        .expect("Failed to open SDL audio device");

    Some((device, ring, shutting_down))
}

/// Queue a frame's worth of samples, dropping the surplus when the host
/// has fallen behind the emulation.
pub fn queue(ring: &SampleRing, samples: &[i16]) {
    let mut ring = ring.lock().unwrap();
    let room = RING_CAP.saturating_sub(ring.len());
    ring.extend(samples[..samples.len().min(room)].iter().copied());
}

/// Time for the callback to bleed the line down before the device pauses.
pub fn drain_duration() -> Duration {
    Duration::from_millis(15)
}
