// src/runner/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::config::ConfigFile;
use crate::exec::{Check, CommandCheck};

/// Name → check lookup shared by the orchestrator and the guard.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: BTreeMap<String, Arc<dyn Check>>,
}

impl fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckRegistry")
            .field("checks", &self.checks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry of [`CommandCheck`]s from a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::new();
        for (name, check) in cfg.checks().iter() {
            registry.register(Arc::new(CommandCheck::from_config(name, check)?));
        }
        Ok(registry)
    }

    /// Register a check under its definition's name, replacing any previous
    /// check with that name.
    pub fn register(&mut self, check: Arc<dyn Check>) {
        let name = check.definition().name.clone();
        self.checks.insert(name, check);
    }

    pub fn with_check(mut self, check: Arc<dyn Check>) -> Self {
        self.register(check);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Check>> {
        self.checks.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
