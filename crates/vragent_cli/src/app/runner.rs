use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info, warn};
use vragent::{
    export_html, ImportReport, RemovalReport, RunFlag, RunOptions, RunOutcome, RunSummary,
    SceneHost, VrAgent, TEMP_TARGET_TAG,
};

use super::bootstrap::{AppWiring, LogExport};
use super::cli_args::CommandKind;
use super::script_stubs::register_plan_script_stubs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandOutcome {
    Passed,
    Failed,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match execute(app, install_interrupt_handler) {
        CommandOutcome::Passed => ExitCode::SUCCESS,
        CommandOutcome::Failed => ExitCode::FAILURE,
    }
}

/// Ctrl-C clears the run flag; the executor notices at its next iteration,
/// so the run winds down and the log export is still written.
fn install_interrupt_handler(run_flag: RunFlag) {
    if let Err(err) = ctrlc::set_handler(move || run_flag.stop()) {
        warn!(error = %err, "interrupt_handler_unavailable");
    }
}

pub(crate) fn execute(app: AppWiring, watch_run_flag: impl FnOnce(RunFlag)) -> CommandOutcome {
    let AppWiring {
        kind,
        config,
        mut world,
        run_options,
        log_export,
    } = app;
    let mut agent = VrAgent::new(config);

    let result = match kind {
        CommandKind::Check => check(&mut agent, &mut world),
        CommandKind::Remove => remove(&mut agent, &mut world),
        CommandKind::Run => {
            watch_run_flag(agent.run_flag());
            run_plan(&mut agent, &mut world, run_options)
        }
    };
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "startup_failed");
            CommandOutcome::Failed
        }
    };

    if let Some(export) = log_export {
        write_log_export(&export);
    }
    outcome
}

pub(crate) fn check(
    agent: &mut VrAgent,
    world: &mut dyn SceneHost,
) -> Result<CommandOutcome, String> {
    let report = agent.import_test_plan(world).map_err(|err| err.to_string())?;
    println!("{}", format_import_report(&report));
    Ok(if import_is_clean(&report) {
        CommandOutcome::Passed
    } else {
        CommandOutcome::Failed
    })
}

/// Imports then removes the plan and confirms the scene is back to its
/// starting behavior count with no target markers left behind.
pub(crate) fn remove(
    agent: &mut VrAgent,
    world: &mut dyn SceneHost,
) -> Result<CommandOutcome, String> {
    let behaviors_before = total_behaviors(world);
    let import = agent.import_test_plan(world).map_err(|err| err.to_string())?;
    let removal = agent.remove_test_plan(world).map_err(|err| err.to_string())?;
    println!("{}", format_import_report(&import));
    println!("{}", format_removal_report(&removal));

    let behaviors_after = total_behaviors(world);
    let markers_left = world.find_tagged(TEMP_TARGET_TAG).len();
    if behaviors_after != behaviors_before || markers_left > 0 {
        warn!(
            behaviors_before,
            behaviors_after,
            markers_left,
            "test_plan_removal_incomplete"
        );
        return Ok(CommandOutcome::Failed);
    }
    Ok(CommandOutcome::Passed)
}

pub(crate) fn run_plan(
    agent: &mut VrAgent,
    world: &mut dyn SceneHost,
    options: RunOptions,
) -> Result<CommandOutcome, String> {
    let report = agent.import_test_plan(world).map_err(|err| err.to_string())?;
    if let Some(plan) = agent.plan().cloned() {
        let cache = agent.cache().clone();
        register_plan_script_stubs(agent.callbacks_mut(), &*world, &cache, &plan);
    }
    if !import_is_clean(&report) {
        warn!(
            missed_objects = report.missed_object_count(),
            missed_components = report.missed_component_count(),
            config_errors = report.config_error_count,
            "test_plan_partially_resolved"
        );
    }

    agent.start().map_err(|err| err.to_string())?;
    let summary = agent.run(world, options).map_err(|err| err.to_string())?;
    println!("{}", format_run_summary(&summary));

    Ok(match summary.outcome {
        RunOutcome::Cancelled => CommandOutcome::Failed,
        _ if summary.stats.actions_failed > 0 => CommandOutcome::Failed,
        RunOutcome::PlanFinished | RunOutcome::TickLimitReached => CommandOutcome::Passed,
    })
}

fn import_is_clean(report: &ImportReport) -> bool {
    report.missed_object_count() == 0
        && report.missed_component_count() == 0
        && report.config_error_count == 0
}

fn total_behaviors(host: &dyn SceneHost) -> usize {
    host.scene_objects()
        .into_iter()
        .chain(host.prefab_assets())
        .map(|object| host.behavior_count(object))
        .sum()
}

fn write_log_export(export: &LogExport) {
    let records = export.collector.snapshot();
    match export_html(&records, &export.filter, &export.out_dir, Local::now()) {
        Ok((path, count)) => {
            info!(path = %path.display(), count, "log_exported");
            println!("log exported: {} ({count} entries)", path.display());
        }
        Err(err) => warn!(error = %err, "log_export_failed"),
    }
}

fn format_import_report(report: &ImportReport) -> String {
    [
        format!(
            "tasks={} actions={} (grab={} trigger={} transform={} move={})",
            report.task_count,
            report.action_count,
            report.grab_count,
            report.trigger_count,
            report.transform_count,
            report.move_count
        ),
        format!(
            "objects {}/{} resolved, components {}/{} resolved, config_errors={}",
            report.hit_object_count,
            report.object_count,
            report.hit_component_count,
            report.component_count,
            report.config_error_count
        ),
        format!(
            "behaviors_attached={} markers_placed={}",
            report.behaviors_attached, report.markers_placed
        ),
    ]
    .join("\n")
}

fn format_removal_report(report: &RemovalReport) -> String {
    format!(
        "removed behaviors={} markers={} (visited={} unresolved={} dirty_assets={})",
        report.behaviors_removed,
        report.markers_destroyed,
        report.objects_visited,
        report.unresolved,
        report.assets_marked_dirty
    )
}

fn format_run_summary(summary: &RunSummary) -> String {
    format!(
        "outcome={:?} ticks={} tasks_started={} actions_completed={} actions_failed={} cycles={}",
        summary.outcome,
        summary.ticks,
        summary.stats.tasks_started,
        summary.stats.actions_completed,
        summary.stats.actions_failed,
        summary.stats.cycles_completed
    )
}
