//! Per-stage wall-clock timing of a conductivity calculation, compiled in
//! with the `timing` feature. Without it every function is a pass-through.

#![allow(unused)]
use std::cell::RefCell;
use std::time::Duration;

/// Assembly stages of the transport system, in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Elements,
    Scattering,
    DerivativeTerm,
    Operator,
}

impl Stage {
    const ALL: [Stage; 4] = [
        Stage::Elements,
        Stage::Scattering,
        Stage::DerivativeTerm,
        Stage::Operator,
    ];

    fn label(self) -> &'static str {
        match self {
            Stage::Elements => "Elements",
            Stage::Scattering => "Out-scattering",
            Stage::DerivativeTerm => "Derivative term",
            Stage::Operator => "Operator",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default, Clone)]
pub struct TimingStats {
    pub stage_times: [Vec<Duration>; 4],
    /// One entry per banded solve: columns solved together and the time taken.
    pub solves: Vec<(usize, Duration)>,
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self, stage: Stage) -> &[Duration] {
        &self.stage_times[stage.index()]
    }

    pub fn solved_columns(&self) -> usize {
        self.solves.iter().map(|(columns, _)| columns).sum()
    }

    #[cfg(feature = "timing")]
    pub fn print_summary(&self) {
        if self.stage_times.iter().all(Vec::is_empty) && self.solves.is_empty() {
            return;
        }

        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let total_assembly: Duration = self.stage_times.iter().flatten().sum();
        let total_solve: Duration = self.solves.iter().map(|(_, d)| *d).sum();
        let overhead = self.total_time.saturating_sub(total_assembly + total_solve);

        println!("\n{}", "=".repeat(60));
        println!("{:^60}", "CONDUCTIVITY TIMING SUMMARY");
        println!("{}", "=".repeat(60));
        println!(
            "Total time:                    {:.3}s",
            self.total_time.as_secs_f64()
        );
        println!("{}", "-".repeat(60));
        println!("Assembly:");
        for stage in Stage::ALL {
            let times = self.stage(stage);
            println!(
                "  {:<26}{:>9.3}ms  ({} builds)",
                stage.label(),
                ms(times.iter().sum()),
                times.len()
            );
        }
        println!("Banded solves:");
        println!(
            "  {:<26}{:>9.3}ms  ({} solves)",
            "Total",
            ms(total_solve),
            self.solves.len()
        );
        let columns = self.solved_columns();
        if columns > 0 {
            println!(
                "  {:<26}{:>9.3}ms  ({} columns)",
                "Per column",
                ms(total_solve) / columns as f64,
                columns
            );
        }
        println!("{}", "=".repeat(60));
        println!(
            "Overhead/Other:                {:>9.3}ms\n",
            ms(overhead)
        );
    }

    #[cfg(not(feature = "timing"))]
    pub fn print_summary(&self) {}
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    TIMING_STATS.with(|stats| {
        *stats.borrow_mut() = TimingStats::new();
    });
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn record_stage<F, R>(stage: Stage, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().stage_times[stage.index()].push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_stage<F, R>(_stage: Stage, f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

/// Time one banded solve of `columns` right-hand sides.
#[cfg(feature = "timing")]
pub fn record_solve<F, R>(columns: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().solves.push((columns, elapsed));
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_solve<F, R>(_columns: usize, f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.total_time = total_time;
        s.clone()
    })
}

#[cfg(not(feature = "timing"))]
pub fn finalize_timing(_total_time: Duration) -> TimingStats {
    TimingStats::new()
}

pub fn finalize_and_print(total_time: Duration) {
    finalize_timing(total_time).print_summary();
}
