//! Thread yield benchmark
//!
//! Measures yield latency with and without a context switch on the
//! simulated kernel and prints one line per scenario.
//!
//! Usage:
//!   thread_yield [--iterations N] [--idle-ms MS] [--cpu CPU]

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use yieldbench::{BenchConfig, BenchmarkRunner};
use yieldbench_common::{config, ScenarioKind};
use yieldbench_kernel::{affinity, Builder, HostClock, Kernel};

#[derive(Parser, Debug)]
#[command(name = "thread_yield")]
#[command(about = "Measure cooperative yield latency with and without a context switch")]
struct Args {
    /// Samples in the no-switch phase (the context-switch phase takes one fewer)
    #[arg(short, long, default_value_t = config::ITERATIONS)]
    iterations: u32,

    /// Settle delay after each phase, in milliseconds
    #[arg(long, default_value_t = config::IDLE_TIME_MS)]
    idle_ms: u64,

    /// Pin the benchmark to this CPU
    #[arg(long)]
    cpu: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(cpu) = args.cpu {
        affinity::pin_current_thread(cpu).context("failed to pin benchmark thread")?;
        info!(cpu, "pinned benchmark thread");
    }

    let kernel = Builder::new()
        .main_name("bench_thread_yield")
        .build()
        .context("failed to build kernel")?;
    let clock = Arc::new(HostClock::new());
    info!(frequency_hz = clock.frequency_hz(), "host clock ready");
    let bench_config = BenchConfig::default()
        .iterations(args.iterations)
        .idle_time(Duration::from_millis(args.idle_ms));

    let mut runner = BenchmarkRunner::new(kernel.clone(), clock, bench_config);
    let outcome = drive(&kernel, &mut runner);

    // Release helper slots whether or not the run completed
    kernel.shutdown().context("failed to shut down kernel")?;
    outcome?;

    let stats = kernel.stats();
    info!(
        yields = stats.yields.load(Ordering::Relaxed),
        context_switches = stats.context_switches.load(Ordering::Relaxed),
        threads_created = stats.threads_created.load(Ordering::Relaxed),
        "benchmark complete"
    );

    Ok(())
}

/// Step the runner to DONE, printing each report line
fn drive(kernel: &Kernel, runner: &mut BenchmarkRunner<Kernel, HostClock>) -> Result<()> {
    while !runner.state().is_terminal() {
        let state = runner.state();
        let switches_before = kernel.stats().context_switches.load(Ordering::Relaxed);

        let report = runner
            .step()
            .with_context(|| format!("benchmark failed in {state:?}"))?;

        if state.is_running() {
            let switches =
                kernel.stats().context_switches.load(Ordering::Relaxed) - switches_before;
            debug!(?state, switches, "phase complete");
            if state.scenario() == Some(ScenarioKind::NoSwitch) && switches > 0 {
                warn!(switches, "no-switch phase performed context switches");
            }
        }
        if let Some(report) = report {
            println!("{report}");
        }
    }
    Ok(())
}
