use crate::peripherals::loopback::LoopbackRegister;
use crate::{DiagError, DiagResult, Peripheral, Register32};

use anyhow::{bail, Result};
use axiprobe_config::{parse_size, BoardDescriptor};

/// Default window size for peripherals that do not specify one.
const DEFAULT_WINDOW: u64 = 0x10;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub dev: Box<dyn Peripheral>,
}

/// Routes 32-bit accesses to peripheral windows by address.
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
}

impl SystemBus {
    /// Default board map: one loopback register at the conventional AXI
    /// GP0 base.
    pub fn new() -> Self {
        let mut bus = Self {
            peripherals: Vec::new(),
        };
        bus.attach(
            "loopback",
            0x4000_0000,
            DEFAULT_WINDOW,
            Box::new(LoopbackRegister::new()),
        );
        bus
    }

    /// Build the bus from a board descriptor instead of the default map.
    pub fn from_board(board: &BoardDescriptor) -> Result<Self> {
        let mut bus = Self {
            peripherals: Vec::new(),
        };

        for p in &board.peripherals {
            let size = match &p.size {
                Some(s) => parse_size(s)?,
                None => DEFAULT_WINDOW,
            };
            let dev: Box<dyn Peripheral> = match p.r#type.as_str() {
                "loopback" => Box::new(LoopbackRegister::new()),
                other => bail!("Unknown peripheral type '{}' for '{}'", other, p.id),
            };
            bus.attach(&p.id, p.base_address, size, dev);
        }

        if bus.loopback_base().is_none() {
            bail!("Board '{}' defines no loopback peripheral", board.name);
        }

        Ok(bus)
    }

    pub fn attach(&mut self, name: &str, base: u64, size: u64, dev: Box<dyn Peripheral>) {
        self.peripherals.push(PeripheralEntry {
            name: name.to_string(),
            base,
            size,
            dev,
        });
    }

    /// Base address of the first loopback device on the bus.
    pub fn loopback_base(&self) -> Option<u64> {
        self.peripherals
            .iter()
            .find(|p| p.dev.as_any().is_some_and(|a| a.is::<LoopbackRegister>()))
            .map(|p| p.base)
    }

    /// Mutable handle to the first loopback device, for fault injection.
    pub fn loopback_mut(&mut self) -> Option<&mut LoopbackRegister> {
        self.peripherals
            .iter_mut()
            .find_map(|p| p.dev.as_any_mut()?.downcast_mut::<LoopbackRegister>())
    }

    fn resolve(&self, addr: u64) -> DiagResult<(usize, u64)> {
        if addr % 4 != 0 {
            return Err(DiagError::Misaligned(addr));
        }
        self.peripherals
            .iter()
            .position(|p| addr >= p.base && addr < p.base + p.size)
            .map(|idx| (idx, addr - self.peripherals[idx].base))
            .ok_or(DiagError::Unmapped(addr))
    }
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Register32 for SystemBus {
    fn write32(&mut self, addr: u64, value: u32) -> DiagResult<()> {
        let (idx, offset) = self.resolve(addr)?;
        self.peripherals[idx].dev.write32(offset, value)
    }

    fn read32(&mut self, addr: u64) -> DiagResult<u32> {
        let (idx, offset) = self.resolve(addr)?;
        self.peripherals[idx].dev.read32(offset)
    }
}
