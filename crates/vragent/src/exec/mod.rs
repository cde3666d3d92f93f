mod actions;
mod executor;
mod generator;
mod loop_runner;

pub use actions::{
    ActionError, ActionPoll, ExecContext, ExecutableAction, GrabExecutable, MoveApproach,
    MoveSettle, MoveTarget, TransformExecutable, TriggerExecutable,
};
pub use executor::{
    ExecutionStats, ExecutorSignal, ExplorationState, FinishPolicy, TaskExecutor,
    DEFAULT_IDLE_TICKS,
};
pub use generator::{ActionQueue, ExecEnv, PlanTaskGenerator, TaskGenerator};
pub use loop_runner::{run_exploration, RunFlag, RunOptions, RunOutcome, RunSummary};
