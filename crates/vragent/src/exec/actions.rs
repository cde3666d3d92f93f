use thiserror::Error;
use tracing::debug;

use crate::behavior::{BehaviorKind, BoundEvent, CallbackError, Transformable};
use crate::scene::{ObjectId, SceneHost, Transform, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPoll {
    Pending,
    Complete,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{object} no longer exists in the scene")]
    TargetMissing { object: ObjectId },
    #[error("{object} has no {kind} component")]
    BehaviorMissing { object: ObjectId, kind: BehaviorKind },
    #[error("{object} has no destination to travel to")]
    NoDestination { object: ObjectId },
    #[error("{object} made no progress toward {target}")]
    Stalled { object: ObjectId, target: Vec3 },
    #[error(transparent)]
    Callback(#[from] CallbackError),
}

pub struct ExecContext<'a> {
    pub host: &'a mut dyn SceneHost,
    pub dt_seconds: f32,
}

/// One step of a task, polled once per executor tick until it completes or
/// fails. Each executable owns the configuration of the action it came from.
pub trait ExecutableAction {
    fn label(&self) -> String;
    fn tick(&mut self, ctx: &mut ExecContext<'_>) -> Result<ActionPoll, ActionError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
    Object(ObjectId),
    Position(Vec3),
}

impl MoveTarget {
    fn position(self, host: &dyn SceneHost) -> Option<Vec3> {
        match self {
            MoveTarget::Object(id) => host.transform(id).map(|transform| transform.position),
            MoveTarget::Position(position) => Some(position),
        }
    }
}

fn current_transform(host: &dyn SceneHost, object: ObjectId) -> Result<Transform, ActionError> {
    host.transform(object)
        .ok_or(ActionError::TargetMissing { object })
}

fn ensure_attached(
    host: &dyn SceneHost,
    object: ObjectId,
    kind: BehaviorKind,
) -> Result<(), ActionError> {
    match host.behavior(object, kind) {
        Some(_) => Ok(()),
        None => Err(ActionError::BehaviorMissing { object, kind }),
    }
}

/// Moves `object` at most `max_delta` toward `target`. A step that leaves the
/// object where it was without reaching the target is an error.
fn step_towards(
    host: &mut dyn SceneHost,
    object: ObjectId,
    target: Vec3,
    max_delta: f32,
) -> Result<Vec3, ActionError> {
    let transform = current_transform(&*host, object)?;
    if transform.position == target {
        return Ok(target);
    }
    if !(max_delta > 0.0) {
        return Err(ActionError::Stalled { object, target });
    }
    let (position, _) = transform.position.move_towards(target, max_delta);
    let finite = [position.x, position.y, position.z]
        .iter()
        .all(|value| value.is_finite());
    if !finite || position == transform.position {
        return Err(ActionError::Stalled { object, target });
    }
    host.set_transform(
        object,
        Transform {
            position,
            ..transform
        },
    );
    Ok(position)
}

/// Carries the object to the destination chosen for this grab.
pub struct GrabExecutable {
    object: ObjectId,
    destination: ObjectId,
    speed: f32,
}

impl GrabExecutable {
    pub fn new(object: ObjectId, destination: ObjectId, speed: f32) -> Self {
        Self {
            object,
            destination,
            speed,
        }
    }
}

impl ExecutableAction for GrabExecutable {
    fn label(&self) -> String {
        format!("grab {}", self.object)
    }

    fn tick(&mut self, ctx: &mut ExecContext<'_>) -> Result<ActionPoll, ActionError> {
        let object = self.object;
        ensure_attached(&*ctx.host, object, BehaviorKind::Grabbable)?;
        let target = current_transform(&*ctx.host, self.destination)?.position;

        let position = step_towards(ctx.host, object, target, self.speed * ctx.dt_seconds)?;
        if position == target {
            debug!(object = %ctx.host.display_name(object), "grab_released");
            return Ok(ActionPoll::Complete);
        }
        Ok(ActionPoll::Pending)
    }
}

enum TriggerStage {
    Press,
    Hold { elapsed: f32 },
}

/// Invokes the pre-trigger events, holds for the triggering time, then
/// invokes the post-trigger events.
pub struct TriggerExecutable {
    object: ObjectId,
    triggering_time: f32,
    triggering_events: Vec<BoundEvent>,
    triggered_events: Vec<BoundEvent>,
    stage: TriggerStage,
}

impl TriggerExecutable {
    pub fn new(
        object: ObjectId,
        triggering_time: f32,
        triggering_events: Vec<BoundEvent>,
        triggered_events: Vec<BoundEvent>,
    ) -> Self {
        Self {
            object,
            triggering_time,
            triggering_events,
            triggered_events,
            stage: TriggerStage::Press,
        }
    }
}

impl ExecutableAction for TriggerExecutable {
    fn label(&self) -> String {
        format!("trigger {}", self.object)
    }

    fn tick(&mut self, ctx: &mut ExecContext<'_>) -> Result<ActionPoll, ActionError> {
        ensure_attached(&*ctx.host, self.object, BehaviorKind::Triggerable)?;
        match self.stage {
            TriggerStage::Press => {
                for event in &self.triggering_events {
                    event.invoke(ctx.host)?;
                }
                self.stage = TriggerStage::Hold { elapsed: 0.0 };
                Ok(ActionPoll::Pending)
            }
            TriggerStage::Hold { elapsed } => {
                let elapsed = elapsed + ctx.dt_seconds;
                if elapsed < self.triggering_time {
                    self.stage = TriggerStage::Hold { elapsed };
                    return Ok(ActionPoll::Pending);
                }
                for event in &self.triggered_events {
                    event.invoke(ctx.host)?;
                }
                Ok(ActionPoll::Complete)
            }
        }
    }
}

/// Applies the deltas linearly over the triggering time.
pub struct TransformExecutable {
    object: ObjectId,
    settings: Transformable,
    start: Option<Transform>,
    elapsed: f32,
}

impl TransformExecutable {
    pub fn new(object: ObjectId, settings: Transformable) -> Self {
        Self {
            object,
            settings,
            start: None,
            elapsed: 0.0,
        }
    }
}

impl ExecutableAction for TransformExecutable {
    fn label(&self) -> String {
        format!("transform {}", self.object)
    }

    fn tick(&mut self, ctx: &mut ExecContext<'_>) -> Result<ActionPoll, ActionError> {
        let object = self.object;
        ensure_attached(&*ctx.host, object, BehaviorKind::Transformable)?;
        let start = match self.start {
            Some(start) => start,
            None => {
                let start = current_transform(&*ctx.host, object)?;
                self.start = Some(start);
                start
            }
        };

        let settings = &self.settings;
        self.elapsed += ctx.dt_seconds;
        let progress = if settings.triggering_time <= 0.0 {
            1.0
        } else {
            (self.elapsed / settings.triggering_time).min(1.0)
        };
        let next = Transform {
            position: start.position.add(settings.delta_position.scale(progress)),
            rotation: start.rotation.add(settings.delta_rotation.scale(progress)),
            scale: start.scale.add(settings.delta_scale.scale(progress)),
        };
        if !ctx.host.set_transform(object, next) {
            return Err(ActionError::TargetMissing { object });
        }

        if progress >= 1.0 {
            Ok(ActionPoll::Complete)
        } else {
            Ok(ActionPoll::Pending)
        }
    }
}

/// Travels toward the destination until within the stopping distance.
pub struct MoveApproach {
    object: ObjectId,
    target: MoveTarget,
    speed: f32,
    stopping_distance: f32,
}

impl MoveApproach {
    pub fn new(object: ObjectId, target: MoveTarget, speed: f32, stopping_distance: f32) -> Self {
        Self {
            object,
            target,
            speed,
            stopping_distance,
        }
    }
}

impl ExecutableAction for MoveApproach {
    fn label(&self) -> String {
        format!("move {} (approach)", self.object)
    }

    fn tick(&mut self, ctx: &mut ExecContext<'_>) -> Result<ActionPoll, ActionError> {
        let object = self.object;
        let target = self
            .target
            .position(&*ctx.host)
            .ok_or(ActionError::NoDestination { object })?;
        let current = current_transform(&*ctx.host, object)?.position;
        if current.distance(target) <= self.stopping_distance {
            return Ok(ActionPoll::Complete);
        }

        let position = step_towards(ctx.host, object, target, self.speed * ctx.dt_seconds)?;
        if position.distance(target) <= self.stopping_distance {
            Ok(ActionPoll::Complete)
        } else {
            Ok(ActionPoll::Pending)
        }
    }
}

/// Places the object exactly on the destination.
pub struct MoveSettle {
    object: ObjectId,
    target: MoveTarget,
}

impl MoveSettle {
    pub fn new(object: ObjectId, target: MoveTarget) -> Self {
        Self { object, target }
    }
}

impl ExecutableAction for MoveSettle {
    fn label(&self) -> String {
        format!("move {} (settle)", self.object)
    }

    fn tick(&mut self, ctx: &mut ExecContext<'_>) -> Result<ActionPoll, ActionError> {
        let object = self.object;
        let target = self
            .target
            .position(&*ctx.host)
            .ok_or(ActionError::NoDestination { object })?;
        let transform = current_transform(&*ctx.host, object)?;
        ctx.host.set_transform(
            object,
            Transform {
                position: target,
                ..transform
            },
        );
        debug!(object = %ctx.host.display_name(object), position = %target, "move_arrived");
        Ok(ActionPoll::Complete)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::behavior::{CallbackBinder, CallbackRegistry};
    use crate::plan::{EventUnit, MethodCallUnit};
    use crate::resolve::ResolutionCache;
    use crate::scene::SceneWorld;

    fn run_to_completion(
        action: &mut dyn ExecutableAction,
        host: &mut dyn SceneHost,
        dt_seconds: f32,
        max_ticks: usize,
    ) -> Result<usize, ActionError> {
        for tick in 1..=max_ticks {
            let mut ctx = ExecContext {
                host: &mut *host,
                dt_seconds,
            };
            if action.tick(&mut ctx)? == ActionPoll::Complete {
                return Ok(tick);
            }
        }
        panic!("{} did not complete in {max_ticks} ticks", action.label());
    }

    #[test]
    fn grab_carries_object_to_destination() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_scene_object("Cup", 1);
        let table = world.spawn_scene_object("Table", 2);
        world.set_position(table, Vec3::new(2.0, 0.0, 0.0));
        world
            .attach_behavior(cup, BehaviorKind::Grabbable)
            .expect("grabbable");

        let mut grab = GrabExecutable::new(cup, table, 1.0);
        let ticks = run_to_completion(&mut grab, &mut world, 0.5, 10).expect("grab");
        assert_eq!(ticks, 4);
        assert_eq!(world.position(cup), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn grab_without_component_fails() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_scene_object("Cup", 1);
        let table = world.spawn_scene_object("Table", 2);
        let mut grab = GrabExecutable::new(cup, table, 1.0);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.1,
        };
        assert!(matches!(
            grab.tick(&mut ctx),
            Err(ActionError::BehaviorMissing { .. })
        ));
    }

    #[test]
    fn grab_without_speed_fails_instead_of_waiting() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_scene_object("Cup", 1);
        let table = world.spawn_scene_object("Table", 2);
        world.set_position(table, Vec3::new(2.0, 0.0, 0.0));
        world
            .attach_behavior(cup, BehaviorKind::Grabbable)
            .expect("grabbable");

        let mut grab = GrabExecutable::new(cup, table, 0.0);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.5,
        };
        assert!(matches!(
            grab.tick(&mut ctx),
            Err(ActionError::Stalled { .. })
        ));
        assert_eq!(world.position(cup), Some(Vec3::ZERO));
    }

    #[test]
    fn move_with_zero_step_fails_instead_of_waiting() {
        let mut world = SceneWorld::new("scene");
        let avatar = world.spawn_scene_object("Avatar", 1);
        let target = MoveTarget::Position(Vec3::new(4.0, 0.0, 0.0));

        let mut approach = MoveApproach::new(avatar, target, 2.0, 0.5);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.0,
        };
        assert!(matches!(
            approach.tick(&mut ctx),
            Err(ActionError::Stalled { .. })
        ));
    }

    #[test]
    fn unreachable_destination_fails_instead_of_waiting() {
        let mut world = SceneWorld::new("scene");
        let avatar = world.spawn_scene_object("Avatar", 1);
        let target = MoveTarget::Position(Vec3::new(f32::MAX, f32::MAX, 0.0));

        let mut approach = MoveApproach::new(avatar, target, 2.0, 0.5);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.5,
        };
        assert!(matches!(
            approach.tick(&mut ctx),
            Err(ActionError::Stalled { .. })
        ));
        assert_eq!(world.position(avatar), Some(Vec3::ZERO));
    }

    #[test]
    fn grab_already_at_destination_completes() {
        let mut world = SceneWorld::new("scene");
        let cup = world.spawn_scene_object("Cup", 1);
        let table = world.spawn_scene_object("Table", 2);
        world
            .attach_behavior(cup, BehaviorKind::Grabbable)
            .expect("grabbable");

        let mut grab = GrabExecutable::new(cup, table, 0.0);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.5,
        };
        assert_eq!(grab.tick(&mut ctx).expect("grab"), ActionPoll::Complete);
    }

    #[test]
    fn trigger_runs_events_around_the_hold() {
        let mut world = SceneWorld::new("scene");
        let button = world.spawn_scene_object("Button", 1);
        let script = world.add_script_component(button, "ButtonController", 2);
        let mut cache = ResolutionCache::new();
        cache.add_component("2", script);

        let presses = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let mut registry = CallbackRegistry::new();
        let press_counter = presses.clone();
        registry.register("ButtonController", "Press", move |_, _| {
            press_counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });
        let release_counter = releases.clone();
        registry.register("ButtonController", "Release", move |_, _| {
            release_counter.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });

        let unit = |method: &str| EventUnit {
            method_call_units: vec![MethodCallUnit {
                script: "2".to_string(),
                method_name: method.to_string(),
            }],
        };
        let binder = CallbackBinder {
            host: &world,
            cache: &cache,
            registry: &registry,
        };
        let before = binder.bind_events(&[unit("Press")]);
        let after = binder.bind_events(&[unit("Release")]);
        world
            .attach_behavior(button, BehaviorKind::Triggerable)
            .expect("triggerable");

        let mut trigger = TriggerExecutable::new(button, 1.0, before, after);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.5,
        };
        assert_eq!(trigger.tick(&mut ctx).expect("press"), ActionPoll::Pending);
        assert_eq!(presses.load(Ordering::SeqCst), 1);
        assert_eq!(trigger.tick(&mut ctx).expect("hold"), ActionPoll::Pending);
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        assert_eq!(trigger.tick(&mut ctx).expect("release"), ActionPoll::Complete);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transform_interpolates_deltas() {
        let mut world = SceneWorld::new("scene");
        let lid = world.spawn_scene_object("Lid", 1);
        world
            .attach_behavior(lid, BehaviorKind::Transformable)
            .expect("transformable");
        let settings = Transformable {
            triggering_time: 1.0,
            delta_position: Vec3::new(0.0, 2.0, 0.0),
            delta_rotation: Vec3::new(0.0, 90.0, 0.0),
            ..Transformable::default()
        };

        let mut transform = TransformExecutable::new(lid, settings);
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.5,
        };
        assert_eq!(transform.tick(&mut ctx).expect("half"), ActionPoll::Pending);
        assert_eq!(
            ctx.host.transform(lid).expect("lid").position,
            Vec3::new(0.0, 1.0, 0.0)
        );
        assert_eq!(transform.tick(&mut ctx).expect("full"), ActionPoll::Complete);
        let end = ctx.host.transform(lid).expect("lid");
        assert_eq!(end.position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(end.rotation, Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(end.scale, Vec3::ONE);
    }

    #[test]
    fn move_approaches_then_settles() {
        let mut world = SceneWorld::new("scene");
        let avatar = world.spawn_scene_object("Avatar", 1);
        let target = MoveTarget::Position(Vec3::new(4.0, 0.0, 0.0));

        let mut approach = MoveApproach::new(avatar, target, 2.0, 0.5);
        let ticks = run_to_completion(&mut approach, &mut world, 0.5, 10).expect("approach");
        assert_eq!(ticks, 4);
        let stopped = world.position(avatar).expect("avatar");
        assert!(stopped.distance(Vec3::new(4.0, 0.0, 0.0)) <= 0.5);

        let mut settle = MoveSettle::new(avatar, target);
        run_to_completion(&mut settle, &mut world, 0.5, 1).expect("settle");
        assert_eq!(world.position(avatar), Some(Vec3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn destroyed_target_is_reported() {
        let mut world = SceneWorld::new("scene");
        let avatar = world.spawn_scene_object("Avatar", 1);
        world.destroy_immediate(avatar);

        let mut settle = MoveSettle::new(avatar, MoveTarget::Position(Vec3::ONE));
        let mut ctx = ExecContext {
            host: &mut world,
            dt_seconds: 0.1,
        };
        assert!(matches!(
            settle.tick(&mut ctx),
            Err(ActionError::TargetMissing { .. })
        ));
    }
}
