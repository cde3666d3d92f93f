use tracing::{debug, error, info, warn};

use crate::behavior::{BehaviorKind, DEFAULT_TRIGGERING_TIME_SECONDS};
use crate::plan::{Action, EventUnit, TaskList};
use crate::resolve::{IdKind, IdentifierResolver, ResolutionCache};
use crate::scene::{ObjectId, SceneHost, Transform, Vec3};

pub const TEMP_TARGET_TAG: &str = "TempTarget";

/// One marker per literal grab position, so two grabs of the same object
/// each keep their own destination.
pub fn target_marker_name(owner_name: &str, task_index: usize, action_index: usize) -> String {
    format!("{owner_name}_TargetPosition_{task_index}_{action_index}_{TEMP_TARGET_TAG}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub task_count: usize,
    pub action_count: usize,
    pub grab_count: usize,
    pub trigger_count: usize,
    pub transform_count: usize,
    pub move_count: usize,
    pub object_count: usize,
    pub hit_object_count: usize,
    pub component_count: usize,
    pub hit_component_count: usize,
    pub config_error_count: usize,
    pub behaviors_attached: usize,
    pub markers_placed: usize,
}

impl ImportReport {
    pub fn missed_object_count(&self) -> usize {
        self.object_count.saturating_sub(self.hit_object_count)
    }

    pub fn missed_component_count(&self) -> usize {
        self.component_count.saturating_sub(self.hit_component_count)
    }

    pub fn log(&self) {
        info!(
            task_count = self.task_count,
            action_count = self.action_count,
            grab_count = self.grab_count,
            trigger_count = self.trigger_count,
            transform_count = self.transform_count,
            move_count = self.move_count,
            "test_plan_metrics"
        );
        info!(
            object_count = self.object_count,
            hit_object_count = self.hit_object_count,
            component_count = self.component_count,
            hit_component_count = self.hit_component_count,
            config_error_count = self.config_error_count,
            behaviors_attached = self.behaviors_attached,
            markers_placed = self.markers_placed,
            "test_plan_resolution"
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalReport {
    pub objects_visited: usize,
    pub unresolved: usize,
    pub behaviors_removed: usize,
    pub markers_destroyed: usize,
    pub assets_marked_dirty: usize,
}

/// Resolves every identifier in `plan` into a freshly cleared `cache` and
/// attaches the behavior component each action needs. Misses and invalid
/// actions are counted and skipped; import never aborts part way.
pub fn import_plan(
    host: &mut dyn SceneHost,
    cache: &mut ResolutionCache,
    plan: &TaskList,
    id_kind: IdKind,
) -> ImportReport {
    cache.clear();
    let mut report = ImportReport {
        task_count: plan.tasks.len(),
        ..ImportReport::default()
    };

    for (task_index, task) in plan.tasks.iter().enumerate() {
        for (action_index, action) in task.actions.iter().enumerate() {
            report.action_count += 1;
            match action {
                Action::Grab(_) => report.grab_count += 1,
                Action::Trigger(_) => report.trigger_count += 1,
                Action::Transform(_) => report.transform_count += 1,
                Action::Move(_) => report.move_count += 1,
            }

            if let Err(config_error) = action.validate() {
                report.config_error_count += 1;
                error!(
                    task = task_index,
                    action = action_index,
                    error = %config_error,
                    "action_config_invalid"
                );
                continue;
            }

            import_action(
                host,
                cache,
                action,
                (task_index, action_index),
                id_kind,
                &mut report,
            );
        }
    }

    report.log();
    report
}

fn import_action(
    host: &mut dyn SceneHost,
    cache: &mut ResolutionCache,
    action: &Action,
    (task_index, action_index): (usize, usize),
    id_kind: IdKind,
    report: &mut ImportReport,
) {
    let source = resolve_object(&*host, cache, action.object_a(), id_kind, report);
    let object_b = action
        .object_b()
        .and_then(|id| resolve_object(&*host, cache, id, id_kind, report));
    if let Action::Trigger(trigger) = action {
        resolve_components(&*host, cache, &trigger.triggering_events, report);
        resolve_components(&*host, cache, &trigger.triggered_events, report);
    }

    let Some(source) = source else {
        return;
    };

    match action {
        Action::Grab(grab) => {
            let destination = match (object_b, grab.target_position) {
                (Some(object_b), _) => Some(object_b),
                (None, Some(position)) if action.object_b().is_none() => {
                    let (marker, created) = place_target_marker(host, source, task_index, action_index, position);
                    if created {
                        report.markers_placed += 1;
                    }
                    Some(marker)
                }
                _ => None,
            };
            attach(host, source, BehaviorKind::Grabbable, report);
            if let Some(grabbable) = host
                .behavior_mut(source, BehaviorKind::Grabbable)
                .and_then(|behavior| behavior.as_grabbable_mut())
            {
                grabbable.destination = destination;
            }
        }
        Action::Trigger(trigger) => {
            attach(host, source, BehaviorKind::Triggerable, report);
            if let Some(triggerable) = host
                .behavior_mut(source, BehaviorKind::Triggerable)
                .and_then(|behavior| behavior.as_triggerable_mut())
            {
                triggerable.triggering_time = trigger
                    .triggering_time
                    .unwrap_or(DEFAULT_TRIGGERING_TIME_SECONDS);
            }
        }
        Action::Transform(transform) => {
            attach(host, source, BehaviorKind::Transformable, report);
            if let Some(transformable) = host
                .behavior_mut(source, BehaviorKind::Transformable)
                .and_then(|behavior| behavior.as_transformable_mut())
            {
                transformable.triggering_time = transform
                    .triggering_time
                    .unwrap_or(DEFAULT_TRIGGERING_TIME_SECONDS);
                transformable.delta_position = transform.delta_position;
                transformable.delta_rotation = transform.delta_rotation;
                transformable.delta_scale = transform.delta_scale;
            }
        }
        Action::Move(_) => {}
    }
}

fn resolve_object(
    host: &dyn SceneHost,
    cache: &mut ResolutionCache,
    id: &str,
    id_kind: IdKind,
    report: &mut ImportReport,
) -> Option<ObjectId> {
    report.object_count += 1;
    let handle = if cache.contains_object(id) {
        cache.object(id)
    } else {
        let resolved = IdentifierResolver::new(host).find_object(id, id_kind);
        if let Some(handle) = resolved {
            cache.add_object(id, handle);
        }
        resolved
    };
    if handle.is_some() {
        report.hit_object_count += 1;
    }
    handle
}

fn resolve_components(
    host: &dyn SceneHost,
    cache: &mut ResolutionCache,
    events: &[EventUnit],
    report: &mut ImportReport,
) {
    for call in events.iter().flat_map(|event| event.method_call_units.iter()) {
        if call.script.is_empty() {
            continue;
        }
        report.component_count += 1;
        if cache.contains_component(&call.script) {
            report.hit_component_count += 1;
            continue;
        }
        if let Some(component) = IdentifierResolver::new(host).find_component(&call.script) {
            cache.add_component(&call.script, component);
            report.hit_component_count += 1;
        }
    }
}

fn attach(host: &mut dyn SceneHost, id: ObjectId, kind: BehaviorKind, report: &mut ImportReport) {
    let existed = host.behavior(id, kind).is_some();
    if host.attach_behavior(id, kind).is_none() {
        warn!(object = %id, kind = %kind, "behavior_attach_failed");
        return;
    }
    if !existed {
        report.behaviors_attached += 1;
        debug!(object = %host.display_name(id), kind = %kind, "behavior_attached");
    }
    if host.is_prefab_asset(id) {
        host.mark_asset_dirty(id);
    }
}

/// Places (or moves) the marker standing in for a literal grab position.
/// Returns the marker and whether it was newly spawned.
pub fn place_target_marker(
    host: &mut dyn SceneHost,
    owner: ObjectId,
    task_index: usize,
    action_index: usize,
    position: Vec3,
) -> (ObjectId, bool) {
    let name = target_marker_name(&host.display_name(owner), task_index, action_index);
    let existing = host
        .find_by_name(&name)
        .filter(|marker| host.object_tag(*marker) == Some(TEMP_TARGET_TAG));
    match existing {
        Some(marker) => {
            let transform = host
                .transform(marker)
                .map(|current| Transform {
                    position,
                    ..current
                })
                .unwrap_or_else(|| Transform::at(position));
            host.set_transform(marker, transform);
            (marker, false)
        }
        None => {
            let marker = host.spawn_marker(&name, position, TEMP_TARGET_TAG);
            debug!(marker = %name, position = %position, "target_marker_placed");
            (marker, true)
        }
    }
}

/// Best-effort inverse of [`import_plan`]: detaches the components the plan
/// attached and destroys every temporary target marker.
pub fn remove_import(
    host: &mut dyn SceneHost,
    cache: &mut ResolutionCache,
    plan: &TaskList,
    id_kind: IdKind,
) -> RemovalReport {
    let mut report = RemovalReport::default();

    for action in plan.actions() {
        let kind = match action {
            Action::Grab(_) => BehaviorKind::Grabbable,
            Action::Trigger(_) => BehaviorKind::Triggerable,
            Action::Transform(_) => BehaviorKind::Transformable,
            Action::Move(_) => continue,
        };
        if action.object_a().is_empty() {
            continue;
        }

        report.objects_visited += 1;
        let Some(object) = IdentifierResolver::new(&*host).find_object(action.object_a(), id_kind)
        else {
            report.unresolved += 1;
            continue;
        };

        if let Some(triggerable) = host
            .behavior_mut(object, kind)
            .and_then(|behavior| behavior.as_triggerable_mut())
        {
            triggerable.clear_events();
        }
        if host.detach_behavior(object, kind).is_some() {
            report.behaviors_removed += 1;
            if host.is_prefab_asset(object) {
                host.mark_asset_dirty(object);
                report.assets_marked_dirty += 1;
            }
        }
    }

    for marker in host.find_tagged(TEMP_TARGET_TAG) {
        if host.destroy_immediate(marker) {
            report.markers_destroyed += 1;
        }
    }
    cache.clear();

    info!(
        objects_visited = report.objects_visited,
        unresolved = report.unresolved,
        behaviors_removed = report.behaviors_removed,
        markers_destroyed = report.markers_destroyed,
        "test_plan_removed"
    );
    report
}
