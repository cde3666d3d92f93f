use std::collections::BTreeSet;

use tracing::{debug, info};
use vragent::plan::{Action, EventUnit};
use vragent::{CallbackRegistry, ResolutionCache, SceneHost, TaskList};

/// A headless scene has no script runtime, so every method a plan's trigger
/// events name gets a handler that records the call. Pairs that already have
/// a handler are left alone. Returns how many handlers were added.
pub(crate) fn register_plan_script_stubs(
    registry: &mut CallbackRegistry,
    host: &dyn SceneHost,
    cache: &ResolutionCache,
    plan: &TaskList,
) -> usize {
    let mut pairs = BTreeSet::new();
    for action in plan.actions() {
        let Action::Trigger(trigger) = action else {
            continue;
        };
        let units = trigger
            .triggering_events
            .iter()
            .chain(trigger.triggered_events.iter())
            .flat_map(|event: &EventUnit| event.method_call_units.iter());
        for unit in units {
            let Some(component) = cache.component(&unit.script) else {
                continue;
            };
            if let Some(component_type) = host.component_type(component) {
                pairs.insert((component_type.to_string(), unit.method_name.clone()));
            }
        }
    }

    let mut added = 0usize;
    for (component_type, method_name) in pairs {
        if method_name.is_empty() || registry.lookup(&component_type, &method_name).is_some() {
            continue;
        }
        let logged_type = component_type.clone();
        let logged_method = method_name.clone();
        registry.register(&component_type, &method_name, move |_host, component| {
            info!(
                component = %component,
                component_type = logged_type.as_str(),
                method = logged_method.as_str(),
                "script_method_invoked"
            );
            Ok(None)
        });
        added += 1;
    }
    debug!(added, "script_stubs_registered");
    added
}
