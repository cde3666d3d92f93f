use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use super::executor::{ExecutionStats, ExecutorSignal, TaskExecutor};
use super::generator::ExecEnv;

/// Shared "application is still running" flag, checked by the executor
/// once per outer iteration.
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl RunFlag {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub ticks_per_second: u32,
    pub max_ticks: Option<u64>,
    pub realtime: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            max_ticks: None,
            realtime: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    PlanFinished,
    Cancelled,
    TickLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub ticks: u64,
    pub stats: ExecutionStats,
}

/// Drives `executor` on a fixed step until it asks to stop, the flag is
/// cleared, or the tick limit elapses.
pub fn run_exploration(
    executor: &mut TaskExecutor,
    env: &mut ExecEnv<'_>,
    run_flag: &RunFlag,
    options: RunOptions,
) -> RunSummary {
    let ticks_per_second = options.ticks_per_second.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / ticks_per_second as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    info!(
        ticks_per_second,
        max_ticks = ?options.max_ticks,
        realtime = options.realtime,
        task_count = executor.task_count(),
        "exploration_started"
    );

    let mut ticks = 0_u64;
    let outcome = loop {
        if options.max_ticks.is_some_and(|limit| ticks >= limit) {
            break RunOutcome::TickLimitReached;
        }

        let tick_start = Instant::now();
        let signal = executor.tick(env, run_flag, fixed_dt_seconds);
        ticks += 1;
        match signal {
            ExecutorSignal::Continue => {}
            ExecutorSignal::StopRequested => break RunOutcome::PlanFinished,
            ExecutorSignal::Cancelled => break RunOutcome::Cancelled,
        }

        if options.realtime {
            let sleep = compute_tick_sleep(tick_start.elapsed(), fixed_dt);
            if !sleep.is_zero() {
                thread::sleep(sleep);
            }
        }
    };

    let summary = RunSummary {
        outcome,
        ticks,
        stats: executor.stats(),
    };
    info!(
        outcome = ?summary.outcome,
        ticks = summary.ticks,
        tasks_started = summary.stats.tasks_started,
        actions_completed = summary.stats.actions_completed,
        actions_failed = summary.stats.actions_failed,
        cycles_completed = summary.stats.cycles_completed,
        "exploration_stopped"
    );
    summary
}

fn compute_tick_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}
