pub mod apu;
pub mod eeprom;
pub mod infrared;
pub mod keypad;
pub mod prc;
pub mod sed1565;
pub mod timers;

pub use apu::Apu;
pub use eeprom::Eeprom;
pub use infrared::IrLink;
pub use keypad::Keypad;
pub use prc::Prc;
pub use sed1565::Sed1565;
pub use timers::TimerBlock;
