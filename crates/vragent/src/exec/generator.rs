use tracing::{error, info, warn};

use super::actions::{
    ExecutableAction, GrabExecutable, MoveApproach, MoveSettle, MoveTarget, TransformExecutable,
    TriggerExecutable,
};
use crate::behavior::{
    BehaviorKind, BoundEvent, CallbackBinder, CallbackRegistry, DEFAULT_TRIGGERING_TIME_SECONDS,
};
use crate::import::place_target_marker;
use crate::plan::{Action, Destination, Task};
use crate::resolve::ResolutionCache;
use crate::scene::{ObjectId, SceneHost};

pub type ActionQueue = Vec<Box<dyn ExecutableAction>>;

/// What generation and execution need from the running session.
pub struct ExecEnv<'a> {
    pub host: &'a mut dyn SceneHost,
    pub cache: &'a ResolutionCache,
    pub callbacks: &'a CallbackRegistry,
}

pub trait TaskGenerator {
    /// Expands one task into its executables, in action order. `None` means
    /// there is nothing to execute for this task.
    fn generate(
        &mut self,
        task_index: usize,
        task: &Task,
        env: &mut ExecEnv<'_>,
    ) -> Option<ActionQueue>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanTaskGenerator {
    pub grab_speed: f32,
    pub move_speed: f32,
    pub stopping_distance: f32,
}

impl Default for PlanTaskGenerator {
    fn default() -> Self {
        Self {
            grab_speed: 2.0,
            move_speed: 1.5,
            stopping_distance: 0.1,
        }
    }
}

impl TaskGenerator for PlanTaskGenerator {
    fn generate(
        &mut self,
        task_index: usize,
        task: &Task,
        env: &mut ExecEnv<'_>,
    ) -> Option<ActionQueue> {
        if task.actions.is_empty() {
            error!(task = task_index, "task_has_no_actions");
            return None;
        }

        let mut queue = ActionQueue::new();
        for (action_index, action) in task.actions.iter().enumerate() {
            if let Err(config_error) = action.validate() {
                error!(
                    task = task_index,
                    action = action_index,
                    error = %config_error,
                    "action_config_invalid"
                );
                continue;
            }
            let Some(object) = env.cache.object(action.object_a()) else {
                warn!(
                    task = task_index,
                    action = action_index,
                    action_type = %action.action_type(),
                    object_a = action.object_a(),
                    "action_skipped_unresolved"
                );
                continue;
            };

            match self.expand(object, (task_index, action_index), action, env) {
                Some((executables, detail)) => {
                    info!(
                        task = task_index,
                        action = action_index,
                        action_type = %action.action_type(),
                        source = %env.host.display_name(object),
                        detail = %detail,
                        "action_generated"
                    );
                    queue.extend(executables);
                }
                None => warn!(
                    task = task_index,
                    action = action_index,
                    action_type = %action.action_type(),
                    object_a = action.object_a(),
                    "action_skipped_no_destination"
                ),
            }
        }
        Some(queue)
    }
}

fn boxed<A: ExecutableAction + 'static>(action: A) -> Box<dyn ExecutableAction> {
    Box::new(action)
}

impl PlanTaskGenerator {
    /// Attaches the component the action needs, mirrors the action's settings
    /// onto it, and hands the executables their own copy of those settings.
    fn expand(
        &self,
        object: ObjectId,
        (task_index, action_index): (usize, usize),
        action: &Action,
        env: &mut ExecEnv<'_>,
    ) -> Option<(ActionQueue, String)> {
        match action {
            Action::Grab(_) => {
                let destination = match action.destination()? {
                    Destination::Object(id) => env.cache.object(id)?,
                    Destination::Position(position) => {
                        place_target_marker(env.host, object, task_index, action_index, position)
                            .0
                    }
                };
                let grabbable = env
                    .host
                    .attach_behavior(object, BehaviorKind::Grabbable)
                    .and_then(|behavior| behavior.as_grabbable_mut())?;
                grabbable.destination = Some(destination);
                let detail = format!("to {}", env.host.display_name(destination));
                let executables = vec![boxed(GrabExecutable::new(
                    object,
                    destination,
                    self.grab_speed,
                ))];
                Some((executables, detail))
            }
            Action::Trigger(trigger) => {
                let binder = CallbackBinder {
                    host: &*env.host,
                    cache: env.cache,
                    registry: env.callbacks,
                };
                let mut before = Vec::<BoundEvent>::new();
                let mut after = Vec::<BoundEvent>::new();
                binder.bind_event_list(&trigger.triggering_events, &mut before);
                binder.bind_event_list(&trigger.triggered_events, &mut after);
                let listeners = |events: &[BoundEvent]| {
                    events.iter().map(BoundEvent::listener_count).sum::<usize>()
                };
                let triggering_time = trigger
                    .triggering_time
                    .unwrap_or(DEFAULT_TRIGGERING_TIME_SECONDS);
                let detail = format!(
                    "hold {triggering_time:.2}s, {} pre-trigger and {} post-trigger callbacks",
                    listeners(&before),
                    listeners(&after)
                );

                let triggerable = env
                    .host
                    .attach_behavior(object, BehaviorKind::Triggerable)
                    .and_then(|behavior| behavior.as_triggerable_mut())?;
                triggerable.triggering_time = triggering_time;
                triggerable.triggering_events = before.clone();
                triggerable.triggered_events = after.clone();
                let executables = vec![boxed(TriggerExecutable::new(
                    object,
                    triggering_time,
                    before,
                    after,
                ))];
                Some((executables, detail))
            }
            Action::Transform(transform) => {
                let transformable = env
                    .host
                    .attach_behavior(object, BehaviorKind::Transformable)
                    .and_then(|behavior| behavior.as_transformable_mut())?;
                transformable.triggering_time = transform
                    .triggering_time
                    .unwrap_or(DEFAULT_TRIGGERING_TIME_SECONDS);
                transformable.delta_position = transform.delta_position;
                transformable.delta_rotation = transform.delta_rotation;
                transformable.delta_scale = transform.delta_scale;
                let detail = format!(
                    "position {} rotation {} scale {} over {:.2}s",
                    transform.delta_position,
                    transform.delta_rotation,
                    transform.delta_scale,
                    transformable.triggering_time
                );
                let executables = vec![boxed(TransformExecutable::new(
                    object,
                    transformable.clone(),
                ))];
                Some((executables, detail))
            }
            Action::Move(_) => {
                let target = match action.destination()? {
                    Destination::Object(id) => MoveTarget::Object(env.cache.object(id)?),
                    Destination::Position(position) => MoveTarget::Position(position),
                };
                let detail = match target {
                    MoveTarget::Object(id) => format!("to {}", env.host.display_name(id)),
                    MoveTarget::Position(position) => format!("to {position}"),
                };
                let executables = vec![
                    boxed(MoveApproach::new(
                        object,
                        target,
                        self.move_speed,
                        self.stopping_distance,
                    )),
                    boxed(MoveSettle::new(object, target)),
                ];
                Some((executables, detail))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::exec::{ActionPoll, ExecContext};
    use crate::import::{import_plan, TEMP_TARGET_TAG};
    use crate::plan::TaskList;
    use crate::resolve::IdKind;
    use crate::scene::{SceneWorld, Vec3};

    fn setup(plan: serde_json::Value) -> (SceneWorld, ResolutionCache, TaskList) {
        let mut world = SceneWorld::new("scene");
        world.spawn_scene_object("Cup", 100);
        world.spawn_scene_object("Table", 200);
        let door = world.spawn_scene_object("Door", 300);
        world.add_script_component(door, "DoorController", 301);
        let plan: TaskList = serde_json::from_value(plan).expect("plan");
        let mut cache = ResolutionCache::new();
        import_plan(&mut world, &mut cache, &plan, IdKind::FileId);
        (world, cache, plan)
    }

    /// Runs each executable to completion in order and records where
    /// `object` stood after each one.
    fn run_queue(
        queue: &mut ActionQueue,
        host: &mut dyn SceneHost,
        object: ObjectId,
    ) -> Vec<Vec3> {
        let mut positions = Vec::new();
        for action in queue.iter_mut() {
            let mut completed = false;
            for _ in 0..100 {
                let mut ctx = ExecContext {
                    host: &mut *host,
                    dt_seconds: 0.5,
                };
                if action.tick(&mut ctx).expect("tick") == ActionPoll::Complete {
                    completed = true;
                    break;
                }
            }
            assert!(completed, "{} did not complete", action.label());
            positions.push(host.transform(object).expect("object").position);
        }
        positions
    }

    #[test]
    fn expands_actions_in_order_and_splits_moves() {
        let (mut world, cache, plan) = setup(json!({ "taskUnits": [ { "actionUnits": [
            { "type": "Grab", "objectA": "100", "objectB": "200" },
            { "type": "Move", "objectA": "200", "targetPosition": [3, 0, 0] },
            { "type": "Transform", "objectA": "300", "deltaPosition": [0, 1, 0] }
        ] } ] }));
        let registry = CallbackRegistry::new();
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        let queue = PlanTaskGenerator::default()
            .generate(0, &plan.tasks[0], &mut env)
            .expect("queue");
        let labels = queue.iter().map(|action| action.label()).collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec![
                "grab object#1",
                "move object#2 (approach)",
                "move object#2 (settle)",
                "transform object#3",
            ]
        );
    }

    #[test]
    fn cache_miss_skips_only_that_action() {
        let (mut world, cache, plan) = setup(json!({ "taskUnits": [ { "actionUnits": [
            { "type": "Transform", "objectA": "999" },
            { "type": "Grab", "objectA": "100", "objectB": "888" },
            { "type": "Transform", "objectA": "100" }
        ] } ] }));
        let registry = CallbackRegistry::new();
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        let queue = PlanTaskGenerator::default()
            .generate(0, &plan.tasks[0], &mut env)
            .expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].label(), "transform object#1");
    }

    #[test]
    fn empty_task_generates_nothing() {
        let (mut world, cache, _) = setup(json!({ "taskUnits": [] }));
        let registry = CallbackRegistry::new();
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        assert!(PlanTaskGenerator::default()
            .generate(0, &Task::default(), &mut env)
            .is_none());
    }

    #[test]
    fn trigger_binds_callbacks_onto_component() {
        let (mut world, cache, plan) = setup(json!({ "taskUnits": [ { "actionUnits": [
            { "type": "Trigger", "objectA": "300", "trigerringTime": 0.25,
              "triggerringEvents": [ { "methodCallUnits": [ { "script": "301", "methodName": "Open" } ] } ],
              "triggerredEvents": [ { "methodCallUnits": [ { "script": "301", "methodName": "Close" } ] },
                                    { "methodCallUnits": [] } ] }
        ] } ] }));
        let mut registry = CallbackRegistry::new();
        registry.register("DoorController", "Open", |_, _| Ok(None));
        registry.register("DoorController", "Close", |_, _| Ok(None));
        let door = cache.object("300").expect("door");
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        let queue = PlanTaskGenerator::default()
            .generate(0, &plan.tasks[0], &mut env)
            .expect("queue");
        assert_eq!(queue.len(), 1);

        let triggerable = world
            .behavior(door, BehaviorKind::Triggerable)
            .and_then(|behavior| behavior.as_triggerable())
            .expect("triggerable");
        assert_eq!(triggerable.triggering_time, 0.25);
        assert_eq!(triggerable.triggering_events.len(), 1);
        assert_eq!(triggerable.triggered_events.len(), 2);
        assert_eq!(triggerable.triggered_events[0].listener_count(), 1);
        assert_eq!(triggerable.triggered_events[1].listener_count(), 0);
    }

    #[test]
    fn literal_grab_target_reuses_imported_marker() {
        let (mut world, cache, plan) = setup(json!({ "taskUnits": [ { "actionUnits": [
            { "type": "Grab", "objectA": "100", "targetPosition": [1, 2, 3] }
        ] } ] }));
        let registry = CallbackRegistry::new();
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        PlanTaskGenerator::default()
            .generate(0, &plan.tasks[0], &mut env)
            .expect("queue");
        let markers = world.find_tagged(TEMP_TARGET_TAG);
        assert_eq!(markers.len(), 1);
        assert_eq!(world.position(markers[0]), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn repeated_actions_on_one_object_keep_their_own_settings() {
        let (mut world, cache, plan) = setup(json!({ "taskUnits": [ { "actionUnits": [
            { "type": "Transform", "objectA": "100", "trigerringTime": 0.0,
              "deltaPosition": [1, 0, 0] },
            { "type": "Transform", "objectA": "100", "trigerringTime": 0.0,
              "deltaPosition": [0, 0, 10] },
            { "type": "Grab", "objectA": "100", "targetPosition": [5, 0, 0] },
            { "type": "Grab", "objectA": "100", "targetPosition": [0, 3, 0] }
        ] } ] }));
        let cup = cache.object("100").expect("cup");
        let registry = CallbackRegistry::new();
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        let mut queue = PlanTaskGenerator::default()
            .generate(0, &plan.tasks[0], &mut env)
            .expect("queue");
        let positions = run_queue(&mut queue, &mut world, cup);

        assert_eq!(
            positions,
            vec![
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 10.0),
                Vec3::new(5.0, 0.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
            ]
        );
        assert_eq!(world.find_tagged(TEMP_TARGET_TAG).len(), 2);
        assert_eq!(world.behavior_count(cup), 2);
    }

    #[test]
    fn repeated_triggers_fire_their_own_callbacks() {
        let (mut world, cache, plan) = setup(json!({ "taskUnits": [ { "actionUnits": [
            { "type": "Trigger", "objectA": "300", "trigerringTime": 0.0,
              "triggerringEvents": [ { "methodCallUnits": [ { "script": "301", "methodName": "Open" } ] } ] },
            { "type": "Trigger", "objectA": "300", "trigerringTime": 0.0,
              "triggerringEvents": [ { "methodCallUnits": [ { "script": "301", "methodName": "Close" } ] } ] }
        ] } ] }));
        let calls = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let mut registry = CallbackRegistry::new();
        let opened = calls.clone();
        registry.register("DoorController", "Open", move |_, _| {
            opened.lock().expect("calls").push("Open");
            Ok(None)
        });
        let closed = calls.clone();
        registry.register("DoorController", "Close", move |_, _| {
            closed.lock().expect("calls").push("Close");
            Ok(None)
        });
        let door = cache.object("300").expect("door");
        let mut env = ExecEnv {
            host: &mut world,
            cache: &cache,
            callbacks: &registry,
        };

        let mut queue = PlanTaskGenerator::default()
            .generate(0, &plan.tasks[0], &mut env)
            .expect("queue");
        run_queue(&mut queue, &mut world, door);

        assert_eq!(*calls.lock().expect("calls"), vec!["Open", "Close"]);
    }
}
