use std::path::PathBuf;

use clap::Parser;
use lumen_core::core::machine::Machine;
use lumen_machines::pokemon_mini::{MachineOptions, NetplayOptions};
use lumen_machines::registry;
use lumen_machines::registry::MachineConfig;

mod audio;
mod config;
mod emulator;
mod input;
mod video;

#[derive(Parser)]
#[command(name = "lumen", about = "Pokemon Mini emulator")]
struct Cli {
    /// Cartridge image (.min)
    rom: PathBuf,

    /// Machine to emulate
    #[arg(long, default_value = "min")]
    machine: String,

    /// BIOS image path (overrides the configuration file)
    #[arg(long)]
    bios: Option<PathBuf>,

    /// Run without a BIOS image
    #[arg(long)]
    no_bios: bool,

    /// Window scale factor
    #[arg(long)]
    scale: Option<u32>,

    /// Enable netplay with this local id (0-9)
    #[arg(long)]
    netplay_id: Option<u8>,

    /// Netplay base TCP port
    #[arg(long)]
    server_port: Option<u16>,

    /// Disable netplay hard sync
    #[arg(long)]
    no_hard_sync: bool,

    /// List registered machines and exit
    #[arg(long)]
    list_machines: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_machines {
        for entry in registry::all() {
            println!("{:<8} {}", entry.name, entry.description);
        }
        return;
    }

    let mut cfg = config::load();
    if config::config_path().map(|p| !p.exists()).unwrap_or(false) {
        config::save(&cfg);
    }

    if let Some(bios) = cli.bios {
        cfg.bios_path = Some(bios);
    }
    if cli.no_bios {
        cfg.use_bios = false;
    }
    if let Some(scale) = cli.scale {
        cfg.scale = scale;
    }
    if let Some(id) = cli.netplay_id {
        cfg.netplay.enabled = true;
        cfg.netplay.id = id % 10;
    }
    if let Some(port) = cli.server_port {
        cfg.netplay.server_port = port;
    }
    if cli.no_hard_sync {
        cfg.netplay.hard_sync = false;
    }

    let options = MachineOptions {
        use_bios: cfg.use_bios,
        lcd_blend: cfg.lcd_blend,
        rtc_snapshot: cfg.rtc_snapshot,
        ignore_illegal_ops: cfg.ignore_illegal_opcodes,
        sample_rate: cfg.sample_rate,
        volume: cfg.volume.min(128),
        netplay: cfg.netplay.enabled.then(|| NetplayOptions {
            id: cfg.netplay.id,
            server_port: cfg.netplay.server_port,
            hard_sync: cfg.netplay.hard_sync,
            sync_threshold: cfg.netplay.sync_threshold,
        }),
    };

    let entry = registry::find(&cli.machine).unwrap_or_else(|| {
        eprintln!("Unknown machine: {}", cli.machine);
        eprintln!("Available:");
        for entry in registry::all() {
            eprintln!("  {:<8} {}", entry.name, entry.description);
        }
        std::process::exit(1);
    });

    let machine_config = MachineConfig {
        rom_path: cli.rom.clone(),
        bios_path: cfg.bios_path.clone(),
        options,
    };

    let mut machine = (entry.create)(&machine_config).unwrap_or_else(|err| {
        eprintln!("Failed to start {}: {err}", entry.name);
        std::process::exit(1);
    });

    // EEPROM image: per-ROM next to the cartridge, or a shared file in the
    // data directory.
    let nvram_path = nvram_path_for(&cli.rom, cfg.per_rom_eeprom);
    if let Ok(data) = std::fs::read(&nvram_path) {
        machine.load_nvram(&data);
    } else {
        log::warn!(
            "no EEPROM save at {}; starting from an erased image",
            nvram_path.display()
        );
    }

    let key_map = input::default_key_map(machine.input_map());
    let state_path = cli.rom.with_extension("ss");
    emulator::run(machine.as_mut(), &key_map, cfg.scale.max(1), &state_path);

    // Flush the EEPROM when anything was written.
    if let Some(data) = machine.save_nvram() {
        if let Some(parent) = nvram_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(err) = std::fs::write(&nvram_path, data) {
            log::warn!("failed to save EEPROM: {err}");
        }
    }
}

fn nvram_path_for(rom_path: &std::path::Path, per_rom: bool) -> PathBuf {
    if per_rom {
        rom_path.with_extension("sav")
    } else {
        config::data_dir().join("min_shared.sav")
    }
}
