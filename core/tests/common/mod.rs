use lumen_core::core::bus::{Bus, IrqRequest};

/// Minimal bus for CPU testing: the flat 21-bit space with no MMIO, plus a
/// single programmable pending interrupt.
pub struct TestBus {
    pub memory: Vec<u8>,
    pub pending: Option<IrqRequest>,
    pub reset_acks: u32,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x200000],
            pending: None,
            reset_acks: 0,
        }
    }

    pub fn load(&mut self, addr: u32, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn read_u8(&mut self, addr: u32) -> u8 {
        self.memory[(addr & 0x1FFFFF) as usize]
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.memory[(addr & 0x1FFFFF) as usize] = value;
    }

    fn pending_irq(&self, mask: u8) -> Option<IrqRequest> {
        // The machine filters by priority; the test bus hands over
        // whatever the test staged unless fully masked.
        if mask >= 3 { None } else { self.pending }
    }

    fn ack_system_reset(&mut self) {
        self.reset_acks += 1;
        self.pending = None;
    }
}
