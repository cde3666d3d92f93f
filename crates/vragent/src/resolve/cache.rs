use std::collections::HashMap;

use tracing::warn;

use crate::scene::{ComponentId, ObjectId};

#[derive(Debug, Clone)]
struct IdTable<H> {
    entries: HashMap<String, H>,
}

impl<H> Default for IdTable<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<H: Copy> IdTable<H> {
    fn add(&mut self, id: &str, handle: H) -> bool {
        if id.is_empty() || self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.to_string(), handle);
        true
    }

    fn get(&self, id: &str) -> Option<H> {
        self.entries.get(id).copied()
    }
}

/// Identifier to live-handle bindings produced by an import. Objects and
/// script components live in separate namespaces. First writer wins.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    objects: IdTable<ObjectId>,
    components: IdTable<ComponentId>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `id` is empty or already bound.
    pub fn add_object(&mut self, id: &str, handle: ObjectId) -> bool {
        self.objects.add(id, handle)
    }

    pub fn add_component(&mut self, id: &str, handle: ComponentId) -> bool {
        self.components.add(id, handle)
    }

    pub fn object(&self, id: &str) -> Option<ObjectId> {
        let handle = self.objects.get(id);
        if handle.is_none() {
            warn!(id, namespace = "object", "resolution_cache_miss");
        }
        handle
    }

    pub fn component(&self, id: &str) -> Option<ComponentId> {
        let handle = self.components.get(id);
        if handle.is_none() {
            warn!(id, namespace = "component", "resolution_cache_miss");
        }
        handle
    }

    pub fn contains_object(&self, id: &str) -> bool {
        self.objects.get(id).is_some()
    }

    pub fn contains_component(&self, id: &str) -> bool {
        self.components.get(id).is_some()
    }

    pub fn object_count(&self) -> usize {
        self.objects.entries.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_count() == 0 && self.component_count() == 0
    }

    pub fn clear(&mut self) {
        self.objects.entries.clear();
        self.components.entries.clear();
    }
}
