pub mod bus;
pub mod peripherals;
pub mod tester;

use std::any::Any;


#[derive(Debug, thiserror::Error)]
pub enum DiagError {
    #[error("No peripheral mapped at {0:#010x}")]
    Unmapped(u64),
    #[error("Misaligned 32-bit access at {0:#010x}")]
    Misaligned(u64),
}

pub type DiagResult<T> = Result<T, DiagError>;

/// The write/read seam the loopback loop runs against.
///
/// On hardware these are volatile 32-bit loads and stores; on the host they
/// are routed through the simulated bus. Accesses are uncached and ordered:
/// a `read32` issued after a `write32` observes that write.
pub trait Register32 {
    fn write32(&mut self, addr: u64, value: u32) -> DiagResult<()>;
    fn read32(&mut self, addr: u64) -> DiagResult<u32>;
}

/// Trait representing a memory-mapped peripheral.
///
/// Registers are word-oriented: all access is 32-bit, aligned, at a byte
/// offset from the peripheral's base. Alignment is enforced by the bus
/// before the peripheral is reached.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read32(&self, offset: u64) -> DiagResult<u32>;
    fn write32(&mut self, offset: u64, value: u32) -> DiagResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}
