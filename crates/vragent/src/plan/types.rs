use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::Vec3;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TaskList {
    #[serde(rename = "taskUnits", default)]
    pub tasks: Vec<Task>,
}

impl TaskList {
    pub fn action_count(&self) -> usize {
        self.tasks.iter().map(|task| task.actions.len()).sum()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.tasks.iter().flat_map(|task| task.actions.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Task {
    #[serde(rename = "actionUnits", default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Action {
    Grab(GrabAction),
    Trigger(TriggerAction),
    Transform(TransformAction),
    Move(MoveAction),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GrabAction {
    #[serde(rename = "objectA", default)]
    pub object_a: String,
    #[serde(rename = "objectB", default, skip_serializing_if = "Option::is_none")]
    pub object_b: Option<String>,
    #[serde(
        rename = "targetPosition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_position: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggerAction {
    #[serde(rename = "objectA", default)]
    pub object_a: String,
    #[serde(
        rename = "trigerringTime",
        alias = "triggeringTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub triggering_time: Option<f32>,
    #[serde(rename = "triggerringEvents", alias = "triggeringEvents", default)]
    pub triggering_events: Vec<EventUnit>,
    #[serde(rename = "triggerredEvents", alias = "triggeredEvents", default)]
    pub triggered_events: Vec<EventUnit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransformAction {
    #[serde(rename = "objectA", default)]
    pub object_a: String,
    #[serde(
        rename = "trigerringTime",
        alias = "triggeringTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub triggering_time: Option<f32>,
    #[serde(rename = "deltaPosition", default)]
    pub delta_position: Vec3,
    #[serde(rename = "deltaRotation", default)]
    pub delta_rotation: Vec3,
    #[serde(rename = "deltaScale", default)]
    pub delta_scale: Vec3,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MoveAction {
    #[serde(rename = "objectA", default)]
    pub object_a: String,
    #[serde(rename = "objectB", default, skip_serializing_if = "Option::is_none")]
    pub object_b: Option<String>,
    #[serde(
        rename = "targetPosition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_position: Option<Vec3>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EventUnit {
    #[serde(rename = "methodCallUnits", default)]
    pub method_call_units: Vec<MethodCallUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MethodCallUnit {
    #[serde(default)]
    pub script: String,
    #[serde(rename = "methodName", default)]
    pub method_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Grab,
    Trigger,
    Transform,
    Move,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionType::Grab => "Grab",
            ActionType::Trigger => "Trigger",
            ActionType::Transform => "Transform",
            ActionType::Move => "Move",
        };
        f.write_str(label)
    }
}

/// Where a grab or move should end up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Destination<'a> {
    Object(&'a str),
    Position(Vec3),
}

impl fmt::Display for Destination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Object(id) => write!(f, "object {id}"),
            Destination::Position(position) => write!(f, "position {position}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanConfigError {
    #[error("{action_type} action has no objectA")]
    MissingSource { action_type: ActionType },
    #[error("{action_type} action on {object_a} is lacking a destination (objectB or targetPosition)")]
    MissingDestination {
        action_type: ActionType,
        object_a: String,
    },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Grab(_) => ActionType::Grab,
            Action::Trigger(_) => ActionType::Trigger,
            Action::Transform(_) => ActionType::Transform,
            Action::Move(_) => ActionType::Move,
        }
    }

    pub fn object_a(&self) -> &str {
        match self {
            Action::Grab(action) => &action.object_a,
            Action::Trigger(action) => &action.object_a,
            Action::Transform(action) => &action.object_a,
            Action::Move(action) => &action.object_a,
        }
    }

    /// Secondary object identifier, treating an empty string as absent.
    pub fn object_b(&self) -> Option<&str> {
        let object_b = match self {
            Action::Grab(action) => action.object_b.as_deref(),
            Action::Move(action) => action.object_b.as_deref(),
            Action::Trigger(_) | Action::Transform(_) => None,
        };
        object_b.filter(|id| !id.is_empty())
    }

    /// `objectB` takes precedence over a literal position.
    pub fn destination(&self) -> Option<Destination<'_>> {
        let target_position = match self {
            Action::Grab(action) => action.target_position,
            Action::Move(action) => action.target_position,
            Action::Trigger(_) | Action::Transform(_) => None,
        };
        match (self.object_b(), target_position) {
            (Some(id), _) => Some(Destination::Object(id)),
            (None, Some(position)) => Some(Destination::Position(position)),
            (None, None) => None,
        }
    }

    pub fn validate(&self) -> Result<(), PlanConfigError> {
        let action_type = self.action_type();
        if self.object_a().is_empty() {
            return Err(PlanConfigError::MissingSource { action_type });
        }
        let needs_destination = matches!(action_type, ActionType::Grab | ActionType::Move);
        if needs_destination && self.destination().is_none() {
            return Err(PlanConfigError::MissingDestination {
                action_type,
                object_a: self.object_a().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_every_variant_from_original_field_names() {
        let raw = json!({
            "taskUnits": [{
                "actionUnits": [
                    { "type": "Grab", "objectA": "100", "targetPosition": [1, 2, 3] },
                    { "type": "Trigger", "objectA": "200", "trigerringTime": 1.5,
                      "triggerringEvents": [ { "methodCallUnits": [ { "script": "11", "methodName": "Open" } ] } ],
                      "triggerredEvents": [] },
                    { "type": "Transform", "objectA": "300",
                      "deltaPosition": { "x": 0, "y": 1, "z": 0 }, "deltaScale": [1, 1, 1] },
                    { "type": "Move", "objectA": "400", "objectB": "500" }
                ]
            }]
        });

        let plan: TaskList = serde_json::from_value(raw).expect("plan");
        let actions = &plan.tasks[0].actions;
        assert_eq!(actions.len(), 4);
        assert_eq!(
            actions.iter().map(Action::action_type).collect::<Vec<_>>(),
            vec![
                ActionType::Grab,
                ActionType::Trigger,
                ActionType::Transform,
                ActionType::Move
            ]
        );
        match &actions[1] {
            Action::Trigger(trigger) => {
                assert_eq!(trigger.triggering_time, Some(1.5));
                assert_eq!(trigger.triggering_events[0].method_call_units[0].method_name, "Open");
            }
            other => panic!("expected trigger, got {other:?}"),
        }
        match &actions[2] {
            Action::Transform(transform) => {
                assert_eq!(transform.delta_position, Vec3::new(0.0, 1.0, 0.0));
                assert_eq!(transform.delta_rotation, Vec3::ZERO);
            }
            other => panic!("expected transform, got {other:?}"),
        }
    }

    #[test]
    fn accepts_corrected_spellings() {
        let raw = json!({ "type": "Trigger", "objectA": "1", "triggeringTime": 2.0,
                          "triggeringEvents": [ {} ] });
        let action: Action = serde_json::from_value(raw).expect("action");
        match action {
            Action::Trigger(trigger) => {
                assert_eq!(trigger.triggering_time, Some(2.0));
                assert_eq!(trigger.triggering_events.len(), 1);
            }
            other => panic!("expected trigger, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let raw = json!({ "type": "Teleport", "objectA": "1" });
        assert!(serde_json::from_value::<Action>(raw).is_err());
    }

    #[test]
    fn object_b_wins_over_target_position() {
        let action = Action::Grab(GrabAction {
            object_a: "1".to_string(),
            object_b: Some("2".to_string()),
            target_position: Some(Vec3::ONE),
        });
        assert_eq!(action.destination(), Some(Destination::Object("2")));
    }

    #[test]
    fn validate_reports_configuration_errors() {
        let no_source = Action::Transform(TransformAction {
            object_a: String::new(),
            triggering_time: None,
            delta_position: Vec3::ZERO,
            delta_rotation: Vec3::ZERO,
            delta_scale: Vec3::ZERO,
        });
        assert_eq!(
            no_source.validate(),
            Err(PlanConfigError::MissingSource {
                action_type: ActionType::Transform
            })
        );

        let no_destination = Action::Move(MoveAction {
            object_a: "7".to_string(),
            object_b: Some(String::new()),
            target_position: None,
        });
        assert!(matches!(
            no_destination.validate(),
            Err(PlanConfigError::MissingDestination { .. })
        ));

        let trigger = Action::Trigger(TriggerAction {
            object_a: "7".to_string(),
            triggering_time: None,
            triggering_events: Vec::new(),
            triggered_events: Vec::new(),
        });
        assert_eq!(trigger.validate(), Ok(()));
    }
}
