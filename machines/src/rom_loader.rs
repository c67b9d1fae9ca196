//! ROM and BIOS image loading for the Pokémon Mini.
//!
//! Cartridge images are single flat `.min` files laid out to mirror the
//! bus: the first 0x2100 bytes cover the BIOS/RAM window and cartridge
//! data starts at file offset 0x2100. The BIOS is a separate image of up
//! to 4 KiB whose first 64 bytes hold the interrupt vector table.

use std::path::Path;

// ---------------------------------------------------------------------------
// CRC-32 (private)
// ---------------------------------------------------------------------------

/// CRC-32 lookup table (reflected polynomial 0xEDB88320).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// Compute the CRC-32 checksum of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

/// Checksum of the stock Pokémon Mini BIOS. Other images load with a
/// warning only.
pub const KNOWN_BIOS_CRC32: u32 = 0xAED3_C14D;

/// Largest BIOS image the boot window can hold.
pub const BIOS_MAX_SIZE: usize = 0x1000;

/// File offsets of the cartridge header fields.
const GAME_CODE_OFFSET: usize = 0x21AC;
const GAME_TITLE_OFFSET: usize = 0x21B0;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading ROM or BIOS images.
#[derive(Debug)]
pub enum RomLoadError {
    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),

    /// The cartridge image is too small to contain a header.
    TooSmall { file: String, size: usize },

    /// A BIOS was requested but none could be read.
    MissingBios(String),
}

impl std::fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TooSmall { file, size } => {
                write!(f, "ROM {file}: {size} bytes is smaller than the 0x2100-byte header")
            }
            Self::MissingBios(path) => write!(f, "BIOS image {path} could not be read"),
        }
    }
}

impl std::error::Error for RomLoadError {}

impl From<std::io::Error> for RomLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Cartridge image
// ---------------------------------------------------------------------------

/// A loaded cartridge image plus the header fields games identify
/// themselves with.
pub struct RomImage {
    /// Raw file contents, bus-aligned (offset 0x2100 = bus 0x2100).
    pub data: Vec<u8>,
    pub title: String,
    pub game_code: String,
    pub crc32: u32,
}

impl RomImage {
    pub fn from_file(path: &Path) -> Result<Self, RomLoadError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data, &path.to_string_lossy())
    }

    pub fn from_bytes(data: Vec<u8>, name: &str) -> Result<Self, RomLoadError> {
        if data.len() <= 0x2100 {
            return Err(RomLoadError::TooSmall {
                file: name.to_string(),
                size: data.len(),
            });
        }

        let title = ascii_field(&data, GAME_TITLE_OFFSET, 12);
        let game_code = ascii_field(&data, GAME_CODE_OFFSET, 4);
        let crc = crc32(&data[0x2100..]);

        log::info!(
            "loaded ROM {name}: \"{title}\" [{game_code}], {} KiB, CRC32 {crc:08X}",
            (data.len() - 0x2100) / 1024
        );

        Ok(Self {
            data,
            title,
            game_code,
            crc32: crc,
        })
    }
}

/// A BIOS image, truncated to the 4 KiB boot window.
pub struct BiosImage {
    pub data: Vec<u8>,
    pub crc32: u32,
}

impl BiosImage {
    pub fn from_file(path: &Path) -> Result<Self, RomLoadError> {
        let data = std::fs::read(path)
            .map_err(|_| RomLoadError::MissingBios(path.to_string_lossy().into_owned()))?;
        Ok(Self::from_bytes(data))
    }

    pub fn from_bytes(mut data: Vec<u8>) -> Self {
        if data.len() > BIOS_MAX_SIZE {
            log::warn!("BIOS larger than 4 KiB; truncating");
            data.truncate(BIOS_MAX_SIZE);
        }

        let crc = crc32(&data);
        if crc != KNOWN_BIOS_CRC32 {
            log::warn!("BIOS CRC32 {crc:08X} does not match the known image");
        }

        Self { data, crc32: crc }
    }
}

fn ascii_field(data: &[u8], offset: usize, len: usize) -> String {
    data.get(offset..offset + len)
        .map(|bytes| {
            bytes
                .iter()
                .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { '.' })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
