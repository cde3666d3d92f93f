mod loader;
mod types;

pub use loader::{load_task_list, parse_task_list, PlanLoadError};
pub use types::{
    Action, ActionType, Destination, EventUnit, GrabAction, MethodCallUnit, MoveAction,
    PlanConfigError, Task, TaskList, TransformAction, TriggerAction,
};
