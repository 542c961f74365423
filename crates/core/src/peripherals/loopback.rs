use crate::DiagResult;
use std::any::Any;

/// Fault injected on the readback path, for exercising mismatch counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFault {
    #[default]
    None,
    /// Readback is XORed with this mask.
    XorMask(u32),
    /// Readback always returns this value.
    Stuck(u32),
}

/// Simulated AXI loopback register.
/// A one-word latch: reads at offset 0x0 return the last value written,
/// unless a fault is injected.
#[derive(Debug, Default)]
pub struct LoopbackRegister {
    latch: u32,
    fault: ReadFault,
}

impl LoopbackRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(fault: ReadFault) -> Self {
        Self { latch: 0, fault }
    }

    pub fn set_fault(&mut self, fault: ReadFault) {
        self.fault = fault;
    }

    fn read_reg(&self, offset: u64) -> u32 {
        match offset {
            0x00 => match self.fault {
                ReadFault::None => self.latch,
                ReadFault::XorMask(mask) => self.latch ^ mask,
                ReadFault::Stuck(value) => value,
            },
            _ => 0,
        }
    }
}

impl crate::Peripheral for LoopbackRegister {
    fn read32(&self, offset: u64) -> DiagResult<u32> {
        Ok(self.read_reg(offset))
    }

    fn write32(&mut self, offset: u64, value: u32) -> DiagResult<()> {
        if offset == 0x00 {
            self.latch = value;
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
