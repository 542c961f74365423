//! Volatile 32-bit MMIO access primitives.
//!
//! Every access is a real bus transaction: volatile so the compiler never
//! caches or elides it, with a compiler fence so the write/read pair of one
//! loop iteration stays in program order.

use core::sync::atomic::{compiler_fence, Ordering};

/// Uncached, ordered 32-bit store.
#[inline]
pub fn write32(addr: u32, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) };
    compiler_fence(Ordering::SeqCst);
}

/// Uncached, ordered 32-bit load.
#[inline]
pub fn read32(addr: u32) -> u32 {
    let value = unsafe { core::ptr::read_volatile(addr as *const u32) };
    compiler_fence(Ordering::SeqCst);
    value
}
