use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use axiprobe_config::{DiagPlan, MismatchExpectation, ReadFaultConfig};
use axiprobe_core::bus::SystemBus;
use axiprobe_core::peripherals::loopback::ReadFault;
use axiprobe_core::tester::{LoopbackTester, RunLimit, StopReason, TestReport};

const EXIT_MISMATCH: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "AxiProbe register loopback diagnostics", long_about = None)]
struct Args {
    /// Enable per-iteration execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the loopback loop against the simulated board
    Run {
        /// Path to a board descriptor (YAML)
        #[arg(short, long)]
        board: Option<PathBuf>,

        /// Number of write/read iterations (the on-target loop is
        /// unbounded; host runs are always bounded)
        #[arg(long, default_value = "20000")]
        iterations: u64,

        /// XOR this mask into every readback (fault injection)
        #[arg(long, value_parser = parse_u32)]
        xor_mask: Option<u32>,
    },
    /// Execute a scripted diagnostic plan and emit a result artifact
    Check {
        /// Path to the plan file (YAML)
        #[arg(short, long)]
        plan: PathBuf,

        /// Directory to write result.json into
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid 32-bit value '{}': {}", s, e))
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: &'static str,
    iterations: u64,
    mismatches: u32,
    stop_reason: &'static str,
    plan: DiagPlan,
}

fn stop_reason_str(reason: StopReason) -> &'static str {
    match reason {
        StopReason::IterationLimit => "iteration_limit",
        StopReason::StopRequested => "stop_requested",
    }
}

fn build_bus(board: Option<&Path>) -> Result<(SystemBus, u64)> {
    let bus = match board {
        Some(path) => {
            info!("Loading board descriptor: {:?}", path);
            let board = axiprobe_config::BoardDescriptor::from_file(path)?;
            SystemBus::from_board(&board)?
        }
        None => {
            info!("Using default board configuration");
            SystemBus::new()
        }
    };
    let base = bus
        .loopback_base()
        .context("Bus has no loopback peripheral")?;
    Ok((bus, base))
}

fn fault_from_config(fault: ReadFaultConfig) -> ReadFault {
    match fault {
        ReadFaultConfig::None => ReadFault::None,
        ReadFaultConfig::XorMask(mask) => ReadFault::XorMask(mask),
        ReadFaultConfig::Stuck(value) => ReadFault::Stuck(value),
    }
}

fn cmd_run(board: Option<PathBuf>, iterations: u64, xor_mask: Option<u32>) -> Result<i32> {
    let (mut bus, base) = build_bus(board.as_deref())?;

    if let Some(mask) = xor_mask {
        info!("Injecting readback fault: xor {:#010x}", mask);
        bus.loopback_mut()
            .context("Bus has no loopback peripheral")?
            .set_fault(ReadFault::XorMask(mask));
    }

    info!("Loopback register at {:#010x}", base);
    info!("Running {} write/read iterations...", iterations);

    let mut tester = LoopbackTester::new(base);
    let report = tester.run(&mut bus, &RunLimit::iterations(iterations))?;

    info!(
        "Done: {} iterations, {} mismatches",
        report.iterations, report.mismatches
    );

    Ok(if report.mismatches == 0 {
        0
    } else {
        EXIT_MISMATCH
    })
}

fn evaluate(plan: &DiagPlan, report: &TestReport) -> bool {
    match plan.expected_mismatches {
        MismatchExpectation::Any => true,
        MismatchExpectation::Exactly(n) => report.mismatches == n,
    }
}

fn cmd_check(plan_path: PathBuf, output_dir: Option<PathBuf>) -> Result<i32> {
    let plan = DiagPlan::from_file(&plan_path)?;

    // Board path resolves relative to the plan file.
    let board_path = plan.board.as_ref().map(|b| {
        plan_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(b)
    });

    let (mut bus, base) = build_bus(board_path.as_deref())?;
    bus.loopback_mut()
        .context("Bus has no loopback peripheral")?
        .set_fault(fault_from_config(plan.read_fault));

    info!(
        "Checking loopback at {:#010x} for {} iterations",
        base, plan.iterations
    );

    let mut tester = LoopbackTester::new(base);
    let report = tester.run(&mut bus, &RunLimit::iterations(plan.iterations))?;

    let passed = evaluate(&plan, &report);
    let result = CheckResult {
        status: if passed { "pass" } else { "fail" },
        iterations: report.iterations,
        mismatches: report.mismatches,
        stop_reason: stop_reason_str(report.stop_reason),
        plan: plan.clone(),
    };

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output dir {:?}", dir))?;
        let path = dir.join("result.json");
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("Result written to {:?}", path);
    }

    if passed {
        info!(
            "PASS: {} iterations, {} mismatches",
            report.iterations, report.mismatches
        );
        Ok(0)
    } else {
        error!(
            "FAIL: {} mismatches over {} iterations (expected {:?})",
            report.mismatches, report.iterations, plan.expected_mismatches
        );
        Ok(EXIT_MISMATCH)
    }
}

fn main() {
    let args = Args::parse();

    if args.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let outcome = match args.command {
        Command::Run {
            board,
            iterations,
            xor_mask,
        } => cmd_run(board, iterations, xor_mask),
        Command::Check { plan, output_dir } => cmd_check(plan, output_dir),
    };

    match outcome {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    }
}
