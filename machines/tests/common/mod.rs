use lumen_machines::pokemon_mini::{MachineOptions, PokemonMini};
use lumen_machines::rom_loader::RomImage;

/// Build a machine with a synthetic BIOS (vector table + boot code) and a
/// synthetic cartridge image.
///
/// The BIOS gets a vector table pointing every source at `0x0F00` except
/// System Reset, which jumps to `boot` at 0x0100. `cart` lands at bus
/// 0x2100.
pub fn machine_with(boot: &[u8], cart: &[u8], options: MachineOptions) -> PokemonMini {
    let mut bios = vec![0u8; 0x1000];

    // Vector table: 32 little-endian entries.
    for source in 0..32usize {
        let vector: u16 = if source == 0 { 0x0100 } else { 0x0F00 };
        bios[source * 2] = vector as u8;
        bios[source * 2 + 1] = (vector >> 8) as u8;
    }

    bios[0x100..0x100 + boot.len()].copy_from_slice(boot);
    // Default handler: NOP, then park (relative branches must not be the
    // first instruction after dispatch).
    bios[0xF00] = 0xFF;
    bios[0xF01] = 0xF1;
    bios[0xF02] = 0xFF;

    let mut rom_bytes = vec![0u8; 0x2100 + cart.len().max(0x100)];
    rom_bytes[0x2100..0x2100 + cart.len()].copy_from_slice(cart);

    let rom = RomImage::from_bytes(rom_bytes, "synthetic.min").unwrap();

    let mut machine = PokemonMini::new(options);
    machine.load_rom(&rom);
    machine.load_bios(&bios);
    machine
}

/// Run until at least `cycles` CPU cycles have elapsed.
pub fn run_cycles(machine: &mut PokemonMini, cycles: u64) {
    let mut elapsed = 0u64;
    while elapsed < cycles {
        elapsed += machine.step() as u64;
    }
}

/// Self-loop instruction: JRS #-1 parks the CPU wherever it sits.
pub const SPIN: &[u8] = &[0xF1, 0xFF];
