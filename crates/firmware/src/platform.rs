//! Board bring-up for the loopback test.
//!
//! Configures the 16550-compatible console UART to 9600 baud, 8N1. The
//! on-chip boot UART is left alone; the boot ROM already set it up at
//! 115200. Must run before anything touches the AXI window.

use crate::mmio;

const UART_BASE: u32 = 0x4001_0000;
const UART_THR_DLL: u32 = UART_BASE + 0x00;
const UART_IER_DLM: u32 = UART_BASE + 0x04;
const UART_FCR: u32 = UART_BASE + 0x08;
const UART_LCR: u32 = UART_BASE + 0x0C;
const UART_LSR: u32 = UART_BASE + 0x14;

const LCR_8N1: u32 = 0x03;
const LCR_DLAB: u32 = 0x80;
const FCR_ENABLE_RESET: u32 = 0x07;
const LSR_TX_EMPTY: u32 = 0x40;

/// Divisor for 9600 baud: 100 MHz reference / 16 / 9600.
const BAUD_DIVISOR: u32 = 651;

pub fn init() {
    // Latch the divisor, then drop back to data mode.
    mmio::write32(UART_LCR, LCR_DLAB);
    mmio::write32(UART_THR_DLL, BAUD_DIVISOR & 0xFF);
    mmio::write32(UART_IER_DLM, (BAUD_DIVISOR >> 8) & 0xFF);
    mmio::write32(UART_LCR, LCR_8N1);
    mmio::write32(UART_FCR, FCR_ENABLE_RESET);
}

/// Drains the transmitter before handing the console back.
pub fn cleanup() {
    while mmio::read32(UART_LSR) & LSR_TX_EMPTY == 0 {}
}
