use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vragent::{
    load_scene_world, AgentConfig, FinishPolicy, LogCollector, LogExportFilter, RunOptions,
    SceneWorld,
};

use super::cli_args::{CliCommand, CommandKind};

pub(crate) struct LogExport {
    pub(crate) collector: LogCollector,
    pub(crate) out_dir: PathBuf,
    pub(crate) filter: LogExportFilter,
}

pub(crate) struct AppWiring {
    pub(crate) kind: CommandKind,
    pub(crate) config: AgentConfig,
    pub(crate) world: SceneWorld,
    pub(crate) run_options: RunOptions,
    pub(crate) log_export: Option<LogExport>,
}

pub(crate) fn build_app(command: CliCommand) -> Result<AppWiring, String> {
    let options = command.options;
    let log_export = options.export_log.map(|out_dir| LogExport {
        collector: LogCollector::new(),
        out_dir,
        filter: LogExportFilter {
            include_info: !options.errors_only,
            include_warnings: !options.errors_only,
            include_errors: true,
            message_prefix: options.log_prefix,
        },
    });
    init_tracing(log_export.as_ref().map(|export| &export.collector));
    info!("=== VR Agent Startup ===");

    let mut config = AgentConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(plan) = options.plan {
        config.test_plan_path = plan;
    }
    if let Some(id_kind) = options.id_kind {
        config.id_kind = id_kind;
    }
    if options.exit_after_testing {
        config.finish_policy = FinishPolicy::ExitAfterTesting;
    }

    let run_options = RunOptions {
        ticks_per_second: config.ticks_per_second,
        max_ticks: options.max_ticks,
        realtime: options.realtime,
    };
    if command.kind == CommandKind::Run
        && config.finish_policy == FinishPolicy::Loop
        && run_options.max_ticks.is_none()
    {
        warn!("exploration loops until interrupted with Ctrl-C");
    }

    let scene_path = options
        .scene
        .ok_or_else(|| "--scene <path> is required".to_string())?;
    let world = load_scene_world(&scene_path).map_err(|err| err.to_string())?;

    info!(
        command = ?command.kind,
        test_plan = %config.test_plan_path.display(),
        id_kind = %config.id_kind,
        finish_policy = ?config.finish_policy,
        "agent_configured"
    );

    Ok(AppWiring {
        kind: command.kind,
        config,
        world,
        run_options,
        log_export,
    })
}

fn init_tracing(collector: Option<&LogCollector>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_names(true)
                .compact(),
        )
        .with(collector.map(LogCollector::layer))
        .init();
}
