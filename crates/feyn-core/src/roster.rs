//! Persisted roster position.
//!
//! The index of the last model that answered successfully is kept in a
//! small key-value store so the next call starts from a known-good model
//! instead of re-walking the whole roster. The value is a resumption hint,
//! not a correctness invariant: anything missing, unparsable or out of
//! range silently falls back to the first model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::error::FeynResult;
use crate::models::{ModelConfig, MODEL_LIST};

const MODEL_INDEX_KEY: &str = "qianfan_model_index";

/// Key-value persistence port for the roster position.
pub trait IndexStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> FeynResult<()>;
    fn remove(&self, key: &str) -> FeynResult<()>;
}

/// In-memory store used in tests and when no database is available.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    values: Mutex<HashMap<String, String>>,
}

impl IndexStore for MemoryIndexStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> FeynResult<()> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> FeynResult<()> {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
        Ok(())
    }
}

/// Snapshot of the roster position, for display.
#[derive(Debug, Clone)]
pub struct RosterStatus {
    pub name: &'static str,
    pub description: Option<&'static str>,
    /// 1-based position, for "3/13"-style output.
    pub position: usize,
    pub total: usize,
    /// False once the last roster entry is current.
    pub can_switch: bool,
}

/// The model roster plus its persisted position.
pub struct ModelRoster {
    store: Arc<dyn IndexStore>,
    models: &'static [ModelConfig],
}

impl ModelRoster {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self::with_models(store, MODEL_LIST)
    }

    /// Roster over a custom model list. Used by tests.
    pub fn with_models(store: Arc<dyn IndexStore>, models: &'static [ModelConfig]) -> Self {
        Self { store, models }
    }

    pub fn models(&self) -> &'static [ModelConfig] {
        self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Last known-good position. Never fails.
    pub fn current_index(&self) -> usize {
        match self
            .store
            .get(MODEL_INDEX_KEY)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
        {
            Some(index) if index < self.models.len() => index,
            _ => 0,
        }
    }

    /// Best-effort persist. A storage failure is logged, never propagated.
    pub fn save_index(&self, index: usize) {
        if let Err(e) = self.store.set(MODEL_INDEX_KEY, &index.to_string()) {
            warn!("failed to persist model index {index}: {e}");
        }
    }

    /// Clear the persisted position back to the first model.
    pub fn reset(&self) {
        if let Err(e) = self.store.remove(MODEL_INDEX_KEY) {
            warn!("failed to reset model index: {e}");
        }
    }

    pub fn current_model(&self) -> &'static ModelConfig {
        &self.models[self.current_index()]
    }

    pub fn status(&self) -> RosterStatus {
        let index = self.current_index();
        let model = &self.models[index];
        RosterStatus {
            name: model.name,
            description: model.description,
            position: index + 1,
            total: self.models.len(),
            can_switch: index + 1 < self.models.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> ModelRoster {
        ModelRoster::new(Arc::new(MemoryIndexStore::default()))
    }

    #[test]
    fn test_defaults_to_first_model() {
        let roster = roster();
        assert_eq!(roster.current_index(), 0);
        assert_eq!(roster.current_model().model, MODEL_LIST[0].model);
    }

    #[test]
    fn test_save_then_read() {
        let roster = roster();
        roster.save_index(2);
        assert_eq!(roster.current_index(), 2);
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let roster = roster();
        roster.save_index(3);
        roster.reset();
        assert_eq!(roster.current_index(), 0);
    }

    #[test]
    fn test_out_of_range_value_reads_as_zero() {
        let store = Arc::new(MemoryIndexStore::default());
        store.set(MODEL_INDEX_KEY, "99").unwrap();
        let roster = ModelRoster::new(store);
        assert_eq!(roster.current_index(), 0);
    }

    #[test]
    fn test_garbage_value_reads_as_zero() {
        let store = Arc::new(MemoryIndexStore::default());
        store.set(MODEL_INDEX_KEY, "not-a-number").unwrap();
        let roster = ModelRoster::new(store);
        assert_eq!(roster.current_index(), 0);
    }

    #[test]
    fn test_status_tracks_position() {
        let roster = roster();
        let status = roster.status();
        assert_eq!(status.position, 1);
        assert_eq!(status.total, MODEL_LIST.len());
        assert!(status.can_switch);

        roster.save_index(MODEL_LIST.len() - 1);
        let status = roster.status();
        assert_eq!(status.position, MODEL_LIST.len());
        assert!(!status.can_switch);
    }
}
