use thiserror::Error;
use tracing::info;

use crate::behavior::CallbackRegistry;
use crate::config::AgentConfig;
use crate::exec::{
    run_exploration, ExecEnv, ExecutionStats, ExecutorSignal, ExplorationState,
    PlanTaskGenerator, RunFlag, RunOptions, RunSummary, TaskExecutor,
};
use crate::import::{import_plan, remove_import, ImportReport, RemovalReport};
use crate::plan::{load_task_list, PlanLoadError, TaskList};
use crate::resolve::ResolutionCache;
use crate::scene::SceneHost;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    PlanLoad(#[from] PlanLoadError),
    #[error("no test plan has been imported")]
    NoPlanImported,
    #[error("exploration has not been started")]
    NotStarted,
}

/// One agent session: the imported plan, its resolution cache, the callback
/// registry and, once started, the executor driving the plan.
pub struct VrAgent {
    config: AgentConfig,
    generator: PlanTaskGenerator,
    cache: ResolutionCache,
    callbacks: CallbackRegistry,
    plan: Option<TaskList>,
    executor: Option<TaskExecutor>,
    run_flag: RunFlag,
}

impl VrAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            generator: PlanTaskGenerator::default(),
            cache: ResolutionCache::new(),
            callbacks: CallbackRegistry::new(),
            plan: None,
            executor: None,
            run_flag: RunFlag::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    pub fn plan(&self) -> Option<&TaskList> {
        self.plan.as_ref()
    }

    pub fn run_flag(&self) -> RunFlag {
        self.run_flag.clone()
    }

    pub fn state(&self) -> Option<ExplorationState> {
        self.executor.as_ref().map(TaskExecutor::state)
    }

    pub fn stats(&self) -> Option<ExecutionStats> {
        self.executor.as_ref().map(TaskExecutor::stats)
    }

    /// Loads the configured plan file and imports it. A plan that fails to
    /// load leaves the previous import untouched.
    pub fn import_test_plan(
        &mut self,
        host: &mut dyn SceneHost,
    ) -> Result<ImportReport, AgentError> {
        let plan = load_task_list(&self.config.test_plan_path)?;
        Ok(self.import_parsed_plan(host, plan))
    }

    pub fn import_parsed_plan(
        &mut self,
        host: &mut dyn SceneHost,
        plan: TaskList,
    ) -> ImportReport {
        let report = import_plan(host, &mut self.cache, &plan, self.config.id_kind);
        self.plan = Some(plan);
        self.executor = None;
        report
    }

    /// Removes what the imported plan attached, loading the plan file when
    /// nothing was imported in this session.
    pub fn remove_test_plan(
        &mut self,
        host: &mut dyn SceneHost,
    ) -> Result<RemovalReport, AgentError> {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => load_task_list(&self.config.test_plan_path)?,
        };
        self.executor = None;
        Ok(remove_import(host, &mut self.cache, &plan, self.config.id_kind))
    }

    pub fn start(&mut self) -> Result<(), AgentError> {
        let plan = self.plan.clone().ok_or(AgentError::NoPlanImported)?;
        info!(
            task_count = plan.tasks.len(),
            finish_policy = ?self.config.finish_policy,
            idle_ticks = self.config.idle_ticks,
            "exploration_configured"
        );
        self.executor = Some(TaskExecutor::new(
            plan,
            Box::new(self.generator),
            self.config.finish_policy,
            self.config.idle_ticks,
        ));
        Ok(())
    }

    pub fn tick(
        &mut self,
        host: &mut dyn SceneHost,
        dt_seconds: f32,
    ) -> Result<ExecutorSignal, AgentError> {
        let executor = self.executor.as_mut().ok_or(AgentError::NotStarted)?;
        let mut env = ExecEnv {
            host,
            cache: &self.cache,
            callbacks: &self.callbacks,
        };
        Ok(executor.tick(&mut env, &self.run_flag, dt_seconds))
    }

    pub fn run(
        &mut self,
        host: &mut dyn SceneHost,
        options: RunOptions,
    ) -> Result<RunSummary, AgentError> {
        let executor = self.executor.as_mut().ok_or(AgentError::NotStarted)?;
        let mut env = ExecEnv {
            host,
            cache: &self.cache,
            callbacks: &self.callbacks,
        };
        Ok(run_exploration(executor, &mut env, &self.run_flag, options))
    }
}
