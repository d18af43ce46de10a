// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store fake for testing without filesystem I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mapstyle_reconciler::config::{ConfigError, ConfigStore, ReconcilerConfig};

/// In-memory implementation of [`ConfigStore`] for testing.
///
/// Clones share one backing map, so a test can hand one clone to a
/// [`ConfigService`](mapstyle_reconciler::config::ConfigService) and inspect
/// the other.
///
/// # Example
///
/// ```
/// use mapstyle_dry_tests::InMemoryConfigStore;
/// use mapstyle_reconciler::config::{ConfigService, ReconcilerConfig};
///
/// let store = InMemoryConfigStore::new();
/// let service = ConfigService::new(store.clone());
///
/// ReconcilerConfig::default().save(&service).unwrap();
/// assert!(store.contains_key(ReconcilerConfig::KEY));
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryConfigStore {
    /// Create a new empty in-memory config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `config` under [`ReconcilerConfig::KEY`].
    pub fn with_config(config: &ReconcilerConfig) -> Result<Self, ConfigError> {
        let store = Self::new();
        store.with_inner(|inner| -> Result<(), ConfigError> {
            inner
                .data
                .insert(ReconcilerConfig::KEY.to_string(), serde_json::to_vec(config)?);
            Ok(())
        })?;
        Ok(store)
    }

    /// Store a raw blob without counting it as a save.
    pub fn put_raw(&self, key: &str, data: &[u8]) {
        self.with_inner(|inner| inner.data.insert(key.to_string(), data.to_vec()));
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.with_inner(|inner| inner.fail_on_load = fail);
    }

    /// Configure the store to fail on save operations.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.with_inner(|inner| inner.fail_on_save = fail);
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.with_inner(|inner| inner.load_count)
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.with_inner(|inner| inner.save_count)
    }

    /// Check if a key exists in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.with_inner(|inner| inner.data.contains_key(key))
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.with_inner(|inner| {
            inner.load_count += 1;
            if inner.fail_on_load {
                return Err(ConfigError::Other("simulated load failure".into()));
            }
            inner.data.get(key).cloned().ok_or(ConfigError::NotFound)
        })
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.with_inner(|inner| {
            inner.save_count += 1;
            if inner.fail_on_save {
                return Err(ConfigError::Other("simulated save failure".into()));
            }
            inner.data.insert(key.to_string(), data.to_vec());
            Ok(())
        })
    }
}
