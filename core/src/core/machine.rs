/// Machine-specific hotkey: cycle to the next netplay peer.
pub const HOTKEY_NETPLAY_NEXT: u8 = 0;
/// Machine-specific hotkey: inject a generated IR pulse burst.
pub const HOTKEY_REMOTE_SIGNAL: u8 = 1;

/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "A", "Power").
    pub name: &'static str,
}

/// Errors surfaced when restoring a serialized machine state.
#[derive(Debug)]
pub enum StateError {
    /// The state blob is for a different machine type.
    WrongSystem { expected: u8, found: u8 },
    /// The state blob uses an unsupported format version.
    WrongVersion { expected: u32, found: u32 },
    /// The blob ended before all sections were read.
    Truncated,
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongSystem { expected, found } => {
                write!(f, "save state system type 0x{found:02X}, expected 0x{expected:02X}")
            }
            Self::WrongVersion { expected, found } => {
                write!(f, "save state version {found}, expected {expected}")
            }
            Self::Truncated => write!(f, "save state truncated"),
        }
    }
}

impl std::error::Error for StateError {}

/// Machine-agnostic interface for emulated systems.
///
/// The frontend is a pure host shell: it pushes input events in, pulls
/// frames and audio out, and persists whatever NVRAM and save-state bytes
/// the machine hands it. It does not know about the hardware behind them.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Run one frame of emulation.
    fn run_frame(&mut self);

    /// Render the current video state into an RGB24 pixel buffer of at
    /// least `width * height * 3` bytes, left-to-right, top-to-bottom.
    fn render_frame(&self, buffer: &mut [u8]);

    /// Handle an input event. `button` is a machine-defined ID from
    /// `input_map()`; `pressed` is true for key-down. Called per-event, not
    /// per-frame; each call latches state that `run_frame()` observes.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// The list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Battery-backed storage to persist on exit, if any.
    fn save_nvram(&self) -> Option<Vec<u8>> {
        None
    }

    /// Restore battery-backed storage read from disk.
    fn load_nvram(&mut self, _data: &[u8]) {}

    /// Fill `buffer` with signed 16-bit mono samples; returns the number of
    /// samples produced.
    fn fill_audio(&mut self, _buffer: &mut [i16]) -> usize {
        0
    }

    /// Host audio sample rate, or 0 when the machine is silent.
    fn audio_sample_rate(&self) -> u32 {
        0
    }

    /// Native frame rate used by the frontend for pacing.
    fn frame_rate_hz(&self) -> f64;

    /// Machine-specific hotkey hook (netplay peer cycling, IR bursts).
    fn hotkey(&mut self, _id: u8) {}

    /// Serialize the complete machine state.
    fn save_state(&self) -> Vec<u8>;

    /// Restore a state produced by `save_state`.
    fn load_state(&mut self, data: &[u8]) -> Result<(), StateError>;
}
