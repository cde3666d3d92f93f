mod agent;
mod atomic_io;
pub mod behavior;
mod config;
pub mod exec;
mod import;
mod log_collector;
pub mod plan;
pub mod resolve;
pub mod scene;

pub use agent::{AgentError, VrAgent};
pub use behavior::{
    Behavior, BehaviorKind, BoundEvent, CallbackBinder, CallbackError, CallbackRegistry,
    DEFAULT_TRIGGERING_TIME_SECONDS,
};
pub use config::{
    parse_flag, AgentConfig, ConfigError, DEFAULT_TEST_PLAN_PATH, EXIT_AFTER_TESTING_ENV_VAR,
    ID_KIND_ENV_VAR, IDLE_TICKS_ENV_VAR, TEST_PLAN_ENV_VAR,
};
pub use exec::{
    run_exploration, ActionError, ExecEnv, ExecutionStats, ExecutorSignal, ExplorationState,
    FinishPolicy, PlanTaskGenerator, RunFlag, RunOptions, RunOutcome, RunSummary, TaskExecutor,
    TaskGenerator,
};
pub use import::{
    import_plan, place_target_marker, remove_import, target_marker_name, ImportReport,
    RemovalReport, TEMP_TARGET_TAG,
};
pub use log_collector::{
    export_html, render_html, CollectorLayer, LogCollector, LogExportError, LogExportFilter,
    LogLevel, LogRecord,
};
pub use plan::{load_task_list, Action, PlanConfigError, PlanLoadError, Task, TaskList};
pub use resolve::{IdKind, IdentifierResolver, ResolutionCache};
pub use scene::{
    load_scene_world, ComponentId, ObjectId, SceneFixtureError, SceneHost, SceneWorld, Vec3,
};
