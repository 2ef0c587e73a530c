//! Copy-on-write holder for the live registry.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::{ActionRegistry, RegistryDeps, RegistryError};
use crate::domain::actions::{ConfigurationFile, Mode};

/// Shares the current [`ActionRegistry`] and swaps it atomically on reload.
///
/// Readers take an `Arc` snapshot and keep using it for the whole turn, so an
/// in-flight invocation is never affected by a concurrent swap.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    current: Arc<RwLock<Arc<ActionRegistry>>>,
}

impl RegistryHandle {
    pub fn new(registry: ActionRegistry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// The registry as of now.
    pub fn snapshot(&self) -> Arc<ActionRegistry> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `registry`, returning the one it replaced.
    pub fn replace(&self, registry: ActionRegistry) -> Arc<ActionRegistry> {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(registry))
    }
}

/// One [`RegistryHandle`] per mode, rebuilt together from one configuration.
#[derive(Debug, Clone)]
pub struct ModeRegistries {
    handles: BTreeMap<Mode, RegistryHandle>,
}

impl ModeRegistries {
    pub const MODES: [Mode; 2] = [Mode::B2c, Mode::B2b];

    /// Builds a registry for every mode.
    pub fn build(config: &ConfigurationFile, deps: &RegistryDeps) -> Result<Self, RegistryError> {
        let mut handles = BTreeMap::new();
        for mode in Self::MODES {
            let registry = ActionRegistry::build(config, mode, deps)?;
            handles.insert(mode, RegistryHandle::new(registry));
        }
        Ok(Self { handles })
    }

    /// Wraps a single handle; other modes are unavailable.
    pub fn single(handle: RegistryHandle) -> Self {
        let mode = handle.snapshot().mode();
        Self {
            handles: BTreeMap::from([(mode, handle)]),
        }
    }

    pub fn get(&self, mode: Mode) -> Option<Arc<ActionRegistry>> {
        self.handles.get(&mode).map(RegistryHandle::snapshot)
    }

    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.handles.keys().copied()
    }

    /// Builds every mode from `config`, then swaps them all in.
    ///
    /// Nothing is replaced unless every mode builds.
    pub fn rebuild(&self, config: &ConfigurationFile, deps: &RegistryDeps) -> Result<(), RegistryError> {
        let mut built = Vec::with_capacity(self.handles.len());
        for mode in self.handles.keys() {
            built.push(ActionRegistry::build(config, *mode, deps)?);
        }
        for (handle, registry) in self.handles.values().zip(built) {
            handle.replace(registry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::RegistryDeps;
    use crate::domain::actions::{ConfigurationFile, Mode};
    use serde_json::json;

    fn registry(version: &str) -> ActionRegistry {
        let config = ConfigurationFile::from_value(json!({ "version": version, "actions": [] })).unwrap();
        ActionRegistry::build(&config, Mode::B2c, &RegistryDeps::default()).unwrap()
    }

    #[test]
    fn snapshots_survive_replacement() {
        let handle = RegistryHandle::new(registry("1"));
        let before = handle.snapshot();

        let old = handle.replace(registry("2"));

        assert_eq!(before.version(), "1");
        assert_eq!(old.version(), "1");
        assert_eq!(handle.snapshot().version(), "2");
    }

    #[test]
    fn clones_share_the_same_slot() {
        let handle = RegistryHandle::new(registry("1"));
        let other = handle.clone();
        handle.replace(registry("2"));
        assert_eq!(other.snapshot().version(), "2");
    }

    #[test]
    fn mode_registries_rebuild_all_or_nothing() {
        let config = ConfigurationFile::from_value(json!({ "version": "1", "actions": [] })).unwrap();
        let registries = ModeRegistries::build(&config, &RegistryDeps::default()).unwrap();
        assert_eq!(registries.get(Mode::B2b).unwrap().mode(), Mode::B2b);

        let broken = ConfigurationFile::from_value(json!({
            "version": "2",
            "actions": [{
                "id": "search",
                "name": "Search",
                "description": "Search",
                "category": "search",
                "implementation": { "type": "function", "handler": "missing" }
            }]
        }))
        .unwrap();
        assert!(registries.rebuild(&broken, &RegistryDeps::default()).is_err());
        assert_eq!(registries.get(Mode::B2c).unwrap().version(), "1");
        assert_eq!(registries.get(Mode::B2b).unwrap().version(), "1");
    }

    #[test]
    fn single_exposes_only_its_mode() {
        let registries = ModeRegistries::single(RegistryHandle::new(registry("1")));
        assert!(registries.get(Mode::B2c).is_some());
        assert!(registries.get(Mode::B2b).is_none());
    }
}
