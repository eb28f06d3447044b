//! Load-on-demand module registry (spec §6 "Persisted state layout": the
//! registry itself is process memory, reconstructed at startup by
//! `register`ing every known `ModuleConfig`).

use super::{GenericModule, Module, ModuleConfig};
use crate::error::{FedMemError, Result};
use crate::storage::sqlite::SqliteVectorStore;
use dashmap::DashMap;
use std::sync::Arc;

/// Registers `ModuleConfig`s at startup and hands out shared `Module`
/// handles, creating the backing table on first use. Domain services (C6)
/// register their own modules (`projects`, `people`) through the same
/// entry point as the six built-in domains — no new Rust types required.
pub struct ModuleRegistry {
    store: SqliteVectorStore,
    modules: DashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new(store: SqliteVectorStore) -> Self {
        Self {
            store,
            modules: DashMap::new(),
        }
    }

    /// Registers `config`, creating its backing table immediately. Safe to
    /// call multiple times for the same id (last registration wins).
    pub fn register(&self, config: ModuleConfig) -> Result<()> {
        let table = self.store.module_table(&config.id)?;
        let id = config.id.clone();
        self.modules.insert(id, Arc::new(GenericModule::new(config, Arc::new(table))));
        Ok(())
    }

    /// Registers the six built-in domain modules.
    pub fn register_builtins(&self) -> Result<()> {
        self.register(super::technical_config())?;
        self.register(super::personal_config())?;
        self.register(super::work_config())?;
        self.register(super::learning_config())?;
        self.register(super::communication_config())?;
        self.register(super::creative_config())?;
        Ok(())
    }

    pub fn get(&self, module_id: &str) -> Result<Arc<dyn Module>> {
        self.modules
            .get(module_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FedMemError::NotFound(format!("module '{}'", module_id)))
    }

    pub fn module_ids(&self) -> Vec<String> {
        self.modules.iter().map(|e| e.key().clone()).collect()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.modules.contains_key(module_id)
    }
}
