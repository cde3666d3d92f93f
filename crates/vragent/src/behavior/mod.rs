mod callbacks;

use std::fmt;

use crate::scene::{ObjectId, Vec3};

pub use callbacks::{
    BoundCallback, BoundEvent, CallbackBinder, CallbackError, CallbackFn, CallbackRegistry,
};

pub const DEFAULT_TRIGGERING_TIME_SECONDS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    Grabbable,
    Triggerable,
    Transformable,
}

impl BehaviorKind {
    pub fn label(self) -> &'static str {
        match self {
            BehaviorKind::Grabbable => "Grabbable",
            BehaviorKind::Triggerable => "Triggerable",
            BehaviorKind::Transformable => "Transformable",
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grabbable {
    pub destination: Option<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct Triggerable {
    pub triggering_time: f32,
    pub triggering_events: Vec<BoundEvent>,
    pub triggered_events: Vec<BoundEvent>,
}

impl Default for Triggerable {
    fn default() -> Self {
        Self {
            triggering_time: DEFAULT_TRIGGERING_TIME_SECONDS,
            triggering_events: Vec::new(),
            triggered_events: Vec::new(),
        }
    }
}

impl Triggerable {
    pub fn clear_events(&mut self) {
        self.triggering_events.clear();
        self.triggered_events.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transformable {
    pub triggering_time: f32,
    pub delta_position: Vec3,
    pub delta_rotation: Vec3,
    pub delta_scale: Vec3,
}

impl Default for Transformable {
    fn default() -> Self {
        Self {
            triggering_time: DEFAULT_TRIGGERING_TIME_SECONDS,
            delta_position: Vec3::ZERO,
            delta_rotation: Vec3::ZERO,
            delta_scale: Vec3::ZERO,
        }
    }
}

/// A capability attached to a scene object. An object carries at most one
/// component per kind; different kinds coexist.
#[derive(Debug, Clone)]
pub enum Behavior {
    Grabbable(Grabbable),
    Triggerable(Triggerable),
    Transformable(Transformable),
}

impl Behavior {
    pub fn new(kind: BehaviorKind) -> Self {
        match kind {
            BehaviorKind::Grabbable => Behavior::Grabbable(Grabbable::default()),
            BehaviorKind::Triggerable => Behavior::Triggerable(Triggerable::default()),
            BehaviorKind::Transformable => Behavior::Transformable(Transformable::default()),
        }
    }

    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::Grabbable(_) => BehaviorKind::Grabbable,
            Behavior::Triggerable(_) => BehaviorKind::Triggerable,
            Behavior::Transformable(_) => BehaviorKind::Transformable,
        }
    }

    pub fn as_grabbable(&self) -> Option<&Grabbable> {
        match self {
            Behavior::Grabbable(grabbable) => Some(grabbable),
            _ => None,
        }
    }

    pub fn as_grabbable_mut(&mut self) -> Option<&mut Grabbable> {
        match self {
            Behavior::Grabbable(grabbable) => Some(grabbable),
            _ => None,
        }
    }

    pub fn as_triggerable(&self) -> Option<&Triggerable> {
        match self {
            Behavior::Triggerable(triggerable) => Some(triggerable),
            _ => None,
        }
    }

    pub fn as_triggerable_mut(&mut self) -> Option<&mut Triggerable> {
        match self {
            Behavior::Triggerable(triggerable) => Some(triggerable),
            _ => None,
        }
    }

    pub fn as_transformable(&self) -> Option<&Transformable> {
        match self {
            Behavior::Transformable(transformable) => Some(transformable),
            _ => None,
        }
    }

    pub fn as_transformable_mut(&mut self) -> Option<&mut Transformable> {
        match self {
            Behavior::Transformable(transformable) => Some(transformable),
            _ => None,
        }
    }
}
