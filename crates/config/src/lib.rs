use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on scripted iterations, so a typo in a plan file cannot
/// wedge a CI job.
pub const MAX_ALLOWED_ITERATIONS: u64 = 50_000_000;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "loopback" is the only type the bus knows today
    pub base_address: u64,
    #[serde(default)]
    pub size: Option<String>,
}

/// Describes the board under bring-up: which registers live where.
/// The loopback target address comes from here rather than being a
/// literal baked into the runner.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardDescriptor {
    pub name: String,
    pub arch: String, // e.g. "cortex-m3"
    pub peripherals: Vec<PeripheralConfig>,
}

impl BoardDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board descriptor at {:?}", path.as_ref()))?;
        serde_yaml::from_reader(f).context("Failed to parse Board Descriptor")
    }
}

/// Fault injected on the simulated readback path.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadFaultConfig {
    #[default]
    None,
    /// Every readback is XORed with this mask.
    XorMask(u32),
    /// Every readback returns this value regardless of what was written.
    Stuck(u32),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MismatchExpectation {
    /// Any count passes; the run only reports.
    Any,
    Exactly(u32),
}

impl Default for MismatchExpectation {
    fn default() -> Self {
        MismatchExpectation::Exactly(0)
    }
}

/// A scripted diagnostic run: how long to hammer the register, what fault
/// to inject into the simulated device, and what mismatch count to expect.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DiagPlan {
    pub schema_version: String,
    /// Board descriptor path, resolved relative to the plan file.
    #[serde(default)]
    pub board: Option<String>,
    pub iterations: u64,
    #[serde(default)]
    pub read_fault: ReadFaultConfig,
    #[serde(default)]
    pub expected_mismatches: MismatchExpectation,
}

impl DiagPlan {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open diagnostic plan at {:?}", path.as_ref()))?;
        let plan: Self = serde_yaml::from_reader(f).context("Failed to parse Diagnostic Plan YAML")?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.iterations == 0 {
            anyhow::bail!("'iterations' must be greater than zero");
        }

        if self.iterations > MAX_ALLOWED_ITERATIONS {
            anyhow::bail!(
                "'iterations' exceeds the allowed maximum of {}",
                MAX_ALLOWED_ITERATIONS
            );
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
