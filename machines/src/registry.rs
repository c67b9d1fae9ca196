//! Machine registry for automatic front-end discovery.
//!
//! Each front-end-capable machine self-registers via [`inventory::submit!`]
//! with a [`MachineEntry`] containing its CLI name and a factory function.
//! The front-end discovers available machines at runtime without any
//! central list.

use std::path::PathBuf;

use lumen_core::core::machine::Machine;

use crate::pokemon_mini::MachineOptions;
use crate::rom_loader::RomLoadError;

/// Everything a factory needs to bring a machine up.
pub struct MachineConfig {
    pub rom_path: PathBuf,
    pub bios_path: Option<PathBuf>,
    pub options: MachineOptions,
}

/// Describes a front-end-capable machine.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "min").
    pub name: &'static str,
    /// Human-readable description for listings.
    pub description: &'static str,
    /// Factory: construct a Machine from a configuration.
    pub create: fn(&MachineConfig) -> Result<Box<dyn Machine>, RomLoadError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn(&MachineConfig) -> Result<Box<dyn Machine>, RomLoadError>,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
