pub mod pokemon_mini;
pub mod registry;
pub mod rom_loader;

pub use pokemon_mini::{MachineOptions, NetplayOptions, PokemonMini};
pub use registry::{MachineConfig, MachineEntry};
