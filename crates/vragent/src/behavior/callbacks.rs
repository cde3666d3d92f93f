use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::plan::EventUnit;
use crate::resolve::ResolutionCache;
use crate::scene::{ComponentId, SceneHost};

/// Handler for one symbolic operation on a script component. `Ok(Some(_))`
/// carries a return value worth logging.
pub type CallbackFn =
    Arc<dyn Fn(&mut dyn SceneHost, ComponentId) -> Result<Option<String>, String> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("callback {component_type}.{operation} on {component} failed: {message}")]
pub struct CallbackError {
    pub component: ComponentId,
    pub component_type: String,
    pub operation: String,
    pub message: String,
}

#[derive(Default, Clone)]
pub struct CallbackRegistry {
    handlers: HashMap<(String, String), CallbackFn>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.handlers.keys().collect::<Vec<_>>();
        keys.sort();
        f.debug_struct("CallbackRegistry")
            .field("operations", &keys)
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `operation` for components of `component_type`. A later
    /// registration for the same pair replaces the earlier one.
    pub fn register<F>(&mut self, component_type: &str, operation: &str, handler: F)
    where
        F: Fn(&mut dyn SceneHost, ComponentId) -> Result<Option<String>, String>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(
            (component_type.to_string(), operation.to_string()),
            Arc::new(handler),
        );
    }

    pub fn lookup(&self, component_type: &str, operation: &str) -> Option<CallbackFn> {
        self.handlers
            .get(&(component_type.to_string(), operation.to_string()))
            .cloned()
    }

    pub fn operations_for(&self, component_type: &str) -> Vec<&str> {
        let mut operations = self
            .handlers
            .keys()
            .filter(|(ty, _)| ty == component_type)
            .map(|(_, op)| op.as_str())
            .collect::<Vec<_>>();
        operations.sort_unstable();
        operations
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[derive(Clone)]
pub struct BoundCallback {
    pub component: ComponentId,
    pub component_type: String,
    pub operation: String,
    handler: CallbackFn,
}

impl fmt::Debug for BoundCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCallback")
            .field("component", &self.component)
            .field("component_type", &self.component_type)
            .field("operation", &self.operation)
            .finish()
    }
}

impl BoundCallback {
    pub fn invoke(&self, host: &mut dyn SceneHost) -> Result<(), CallbackError> {
        match (self.handler)(host, self.component) {
            Ok(Some(value)) => {
                info!(
                    component = %self.component,
                    component_type = %self.component_type,
                    operation = %self.operation,
                    value = %value,
                    "callback_returned"
                );
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(message) => Err(CallbackError {
                component: self.component,
                component_type: self.component_type.clone(),
                operation: self.operation.clone(),
                message,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoundEvent {
    pub listeners: Vec<BoundCallback>,
}

impl BoundEvent {
    /// Runs listeners in order; the first failure aborts the rest.
    pub fn invoke(&self, host: &mut dyn SceneHost) -> Result<(), CallbackError> {
        for listener in &self.listeners {
            listener.invoke(host)?;
        }
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

pub struct CallbackBinder<'a> {
    pub host: &'a dyn SceneHost,
    pub cache: &'a ResolutionCache,
    pub registry: &'a CallbackRegistry,
}

impl CallbackBinder<'_> {
    pub fn bind_event(&self, unit: &EventUnit) -> BoundEvent {
        let mut event = BoundEvent::default();
        for call in &unit.method_call_units {
            if call.script.is_empty() || call.method_name.is_empty() {
                warn!(
                    script = %call.script,
                    method = %call.method_name,
                    "callback_descriptor_incomplete"
                );
                continue;
            }

            let Some(component) = self.cache.component(&call.script) else {
                warn!(script = %call.script, "callback_component_not_found");
                continue;
            };
            let Some(component_type) = self.host.component_type(component) else {
                warn!(script = %call.script, component = %component, "callback_component_gone");
                continue;
            };
            let Some(handler) = self.registry.lookup(component_type, &call.method_name) else {
                error!(
                    component_type,
                    method = %call.method_name,
                    known = ?self.registry.operations_for(component_type),
                    "callback_operation_unregistered"
                );
                continue;
            };

            debug!(
                component = %component,
                component_type,
                method = %call.method_name,
                "callback_bound"
            );
            event.listeners.push(BoundCallback {
                component,
                component_type: component_type.to_string(),
                operation: call.method_name.clone(),
                handler,
            });
        }
        event
    }

    pub fn bind_events(&self, units: &[EventUnit]) -> Vec<BoundEvent> {
        units.iter().map(|unit| self.bind_event(unit)).collect()
    }

    /// Replaces the contents of `target` with one bound event per descriptor.
    pub fn bind_event_list(&self, units: &[EventUnit], target: &mut Vec<BoundEvent>) {
        target.clear();
        target.extend(self.bind_events(units));
    }
}
