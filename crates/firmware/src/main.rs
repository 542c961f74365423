//! Register loopback smoke test.
//!
//! Writes an incrementing word to the AXI loopback register, reads it
//! straight back and counts mismatches. Runs until reset; produces no
//! output of its own. Watch `MISMATCHES` from a debugger.

#![no_main]
#![no_std]

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m_rt::entry;
use panic_halt as _;

mod mmio;
mod platform;

/// AXI GP0 loopback register under test.
const LOOPBACK_ADDR: u32 = 0x4000_0000;

/// Readback mismatch count. Never consumed here; it exists so a debugger
/// watch can see the test failing.
static MISMATCHES: AtomicU32 = AtomicU32::new(0);

#[entry]
fn main() -> ! {
    platform::init();

    let mut data: u32 = 0;

    loop {
        mmio::write32(LOOPBACK_ADDR, data);
        let data_read = mmio::read32(LOOPBACK_ADDR);

        if data != data_read {
            let count = MISMATCHES.load(Ordering::Relaxed);
            MISMATCHES.store(count.wrapping_add(1), Ordering::Relaxed);
        }

        data = data.wrapping_add(1);
    }

    // Only reachable if the loop above is broken out of with a debugger.
    #[allow(unreachable_code)]
    {
        platform::cleanup();
        loop {
            cortex_m::asm::wfi();
        }
    }
}
