use crate::{DiagResult, Register32};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for observing tester progress in a modular way.
/// The default path consumes nothing; hooks are opt-in.
pub trait TesterObserver: std::fmt::Debug + Send + Sync {
    fn on_iteration(&self, _index: u64, _value: u32) {}
    fn on_mismatch(&self, _wrote: u32, _read: u32) {}
}

/// Injectable stop condition for host-side runs.
///
/// The default is unbounded: on hardware the loop only ends at reset, and
/// `run` preserves that by never returning unless a limit is supplied.
#[derive(Debug, Clone, Default)]
pub struct RunLimit {
    pub max_iterations: Option<u64>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl RunLimit {
    pub fn iterations(n: u64) -> Self {
        Self {
            max_iterations: Some(n),
            stop_flag: None,
        }
    }

    fn check(&self, done: u64) -> Option<StopReason> {
        if let Some(flag) = &self.stop_flag {
            if flag.load(Ordering::Relaxed) {
                return Some(StopReason::StopRequested);
            }
        }
        if let Some(max) = self.max_iterations {
            if done >= max {
                return Some(StopReason::IterationLimit);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    StopRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestReport {
    pub iterations: u64,
    pub mismatches: u32,
    pub stop_reason: StopReason,
}

/// The register loopback loop: write an incrementing word, read it back,
/// count mismatches, repeat.
pub struct LoopbackTester {
    pub addr: u64,
    /// Value written next; wraps at 2^32.
    pub data: u32,
    /// Readback mismatch count; wraps like `data`, never clamped.
    pub mismatches: u32,
    pub observers: Vec<Arc<dyn TesterObserver>>,
}

impl LoopbackTester {
    pub fn new(addr: u64) -> Self {
        Self {
            addr,
            data: 0,
            mismatches: 0,
            observers: Vec::new(),
        }
    }

    /// One iteration: ordered write, readback, compare, increment.
    pub fn step(&mut self, bus: &mut dyn Register32) -> DiagResult<()> {
        let wrote = self.data;
        bus.write32(self.addr, wrote)?;
        let read = bus.read32(self.addr)?;

        if wrote != read {
            self.mismatches = self.mismatches.wrapping_add(1);
            tracing::debug!(
                "readback mismatch at {:#010x}: wrote {:#010x}, read {:#010x}",
                self.addr,
                wrote,
                read
            );
            for observer in &self.observers {
                observer.on_mismatch(wrote, read);
            }
        }

        self.data = self.data.wrapping_add(1);
        Ok(())
    }

    /// Run the loop until the limit is hit or the bus faults.
    ///
    /// With `RunLimit::default()` this diverges, matching the on-target
    /// behavior; it only returns `Ok` when a limit or stop flag fires.
    pub fn run(&mut self, bus: &mut dyn Register32, limit: &RunLimit) -> DiagResult<TestReport> {
        let mut done: u64 = 0;
        loop {
            if let Some(stop_reason) = limit.check(done) {
                return Ok(TestReport {
                    iterations: done,
                    mismatches: self.mismatches,
                    stop_reason,
                });
            }

            for observer in &self.observers {
                observer.on_iteration(done, self.data);
            }
            self.step(bus)?;
            done += 1;
        }
    }
}
