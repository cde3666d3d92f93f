use std::collections::VecDeque;
use std::fmt;

use tracing::{error, info, warn};

use super::actions::{ActionPoll, ExecContext, ExecutableAction};
use super::generator::{ExecEnv, TaskGenerator};
use super::loop_runner::RunFlag;
use crate::plan::TaskList;

pub const DEFAULT_IDLE_TICKS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationState {
    Running,
    Finished,
    Resetting,
}

impl fmt::Display for ExplorationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplorationState::Running => f.write_str("RUNNING"),
            ExplorationState::Finished => f.write_str("FINISHED"),
            ExplorationState::Resetting => f.write_str("RESETTING"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FinishPolicy {
    ExitAfterTesting,
    #[default]
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorSignal {
    Continue,
    StopRequested,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub ticks: u64,
    pub tasks_started: u64,
    pub actions_completed: u64,
    pub actions_failed: u64,
    pub cycles_completed: u64,
}

enum Phase {
    BeginIteration,
    Executing {
        task_index: usize,
        queue: VecDeque<Box<dyn ExecutableAction>>,
    },
    Yielding {
        remaining: u32,
    },
    CheckFinish,
}

/// Walks the plan task by task, one executable poll per tick. Failures are
/// logged and skipped; only plan completion under
/// [`FinishPolicy::ExitAfterTesting`] or a cleared [`RunFlag`] stops it.
pub struct TaskExecutor {
    plan: TaskList,
    generator: Box<dyn TaskGenerator>,
    finish_policy: FinishPolicy,
    idle_ticks: u32,
    cursor: usize,
    state: ExplorationState,
    phase: Phase,
    stats: ExecutionStats,
}

impl TaskExecutor {
    pub fn new(
        plan: TaskList,
        generator: Box<dyn TaskGenerator>,
        finish_policy: FinishPolicy,
        idle_ticks: u32,
    ) -> Self {
        let state = if plan.tasks.is_empty() {
            ExplorationState::Finished
        } else {
            ExplorationState::Running
        };
        Self {
            plan,
            generator,
            finish_policy,
            idle_ticks: idle_ticks.max(1),
            cursor: 0,
            state,
            phase: Phase::BeginIteration,
            stats: ExecutionStats::default(),
        }
    }

    pub fn state(&self) -> ExplorationState {
        self.state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn task_count(&self) -> usize {
        self.plan.tasks.len()
    }

    pub fn stats(&self) -> ExecutionStats {
        self.stats
    }

    pub fn plan(&self) -> &TaskList {
        &self.plan
    }

    pub fn tick(
        &mut self,
        env: &mut ExecEnv<'_>,
        run_flag: &RunFlag,
        dt_seconds: f32,
    ) -> ExecutorSignal {
        self.stats.ticks += 1;
        loop {
            match &mut self.phase {
                Phase::BeginIteration => {
                    if !run_flag.is_running() {
                        info!(cursor = self.cursor, "exploration_cancelled");
                        return ExecutorSignal::Cancelled;
                    }
                    if self.state == ExplorationState::Resetting {
                        self.cursor = 0;
                        self.stats.cycles_completed += 1;
                        self.state = ExplorationState::Running;
                        info!(cycles_completed = self.stats.cycles_completed, "exploration_reset");
                    }
                    self.phase = self.begin_task(env);
                }
                Phase::Executing { task_index, queue } => {
                    let task_index = *task_index;
                    let Some(action) = queue.front_mut() else {
                        info!(task = task_index, "task_completed");
                        self.phase = Phase::Yielding {
                            remaining: self.idle_ticks,
                        };
                        continue;
                    };

                    let mut ctx = ExecContext {
                        host: &mut *env.host,
                        dt_seconds,
                    };
                    match action.tick(&mut ctx) {
                        Ok(ActionPoll::Pending) => {}
                        Ok(ActionPoll::Complete) => {
                            self.stats.actions_completed += 1;
                            info!(task = task_index, action = %action.label(), "action_completed");
                            queue.pop_front();
                        }
                        Err(action_error) => {
                            self.stats.actions_failed += 1;
                            error!(
                                task = task_index,
                                action = %action.label(),
                                error = %action_error,
                                "action_failed"
                            );
                            queue.pop_front();
                        }
                    }
                    return ExecutorSignal::Continue;
                }
                Phase::Yielding { remaining } => {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        self.phase = Phase::CheckFinish;
                    }
                    return ExecutorSignal::Continue;
                }
                Phase::CheckFinish => {
                    if self.cursor < self.plan.tasks.len() {
                        self.phase = Phase::BeginIteration;
                        continue;
                    }
                    self.state = ExplorationState::Finished;
                    match self.finish_policy {
                        FinishPolicy::ExitAfterTesting => {
                            info!(
                                task_count = self.plan.tasks.len(),
                                stats = ?self.stats,
                                "exploration_finished"
                            );
                            return ExecutorSignal::StopRequested;
                        }
                        FinishPolicy::Loop => {
                            self.state = ExplorationState::Resetting;
                            self.phase = Phase::BeginIteration;
                        }
                    }
                }
            }
        }
    }

    fn begin_task(&mut self, env: &mut ExecEnv<'_>) -> Phase {
        let Some(task) = self.plan.tasks.get(self.cursor) else {
            warn!(cursor = self.cursor, "no_task_to_execute");
            return Phase::Yielding {
                remaining: self.idle_ticks,
            };
        };

        let task_index = self.cursor;
        self.cursor += 1;
        self.stats.tasks_started += 1;
        info!(
            task = task_index,
            action_count = task.actions.len(),
            "task_started"
        );
        match self.generator.generate(task_index, task, env) {
            Some(queue) => Phase::Executing {
                task_index,
                queue: queue.into(),
            },
            None => Phase::Yielding {
                remaining: self.idle_ticks,
            },
        }
    }
}
