//! Thread-safe in-memory schema cache
//!
//! The lock is never held across a caller-supplied callback; every method
//! clones what it needs and releases the lock before returning.

use std::collections::HashMap;
use std::sync::Mutex;

use super::types::EntitySchema;

#[derive(Default)]
pub struct SchemaCache {
    entries: Mutex<HashMap<String, EntitySchema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, schema: EntitySchema) {
        let mut guard = self.entries.lock().expect("schema cache poisoned");
        guard.insert(schema.name.clone(), schema);
    }

    pub fn get(&self, name: &str) -> Option<EntitySchema> {
        let guard = self.entries.lock().expect("schema cache poisoned");
        guard.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let guard = self.entries.lock().expect("schema cache poisoned");
        guard.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<EntitySchema> {
        let mut guard = self.entries.lock().expect("schema cache poisoned");
        guard.remove(name)
    }

    pub fn clear(&self) {
        let mut guard = self.entries.lock().expect("schema cache poisoned");
        guard.clear();
    }

    pub fn all(&self) -> Vec<EntitySchema> {
        let guard = self.entries.lock().expect("schema cache poisoned");
        guard.values().cloned().collect()
    }

    pub fn entity_names(&self) -> Vec<String> {
        let guard = self.entries.lock().expect("schema cache poisoned");
        guard.keys().cloned().collect()
    }

    pub fn size(&self) -> usize {
        let guard = self.entries.lock().expect("schema cache poisoned");
        guard.len()
    }
}
