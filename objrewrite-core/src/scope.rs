//! The per-call bundle handed to every plugin callback.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A plugin's scratch map for one rewrite call.
///
/// Every callback of the same plugin within one call sees the same cache, so
/// values derived once (in the activation hook or on first use) can be reused
/// across tree locations. A new call always starts with an empty cache.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    inner: Arc<Mutex<Map<String, Value>>>,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.lock().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the cached value for `key`, computing and storing it first if
    /// absent.
    pub fn get_or_insert_with(&self, key: &str, make: impl FnOnce() -> Value) -> Value {
        let mut map = self.lock();
        if let Some(existing) = map.get(key) {
            return existing.clone();
        }
        let value = make();
        map.insert(key.to_string(), value.clone());
        value
    }

    /// Runs `f` with exclusive access to the underlying map.
    ///
    /// Do not hold across an `.await`.
    pub fn with<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.lock())
    }
}

/// What a plugin callback sees besides the value it processes: the plugin's
/// projected context and its scratch cache for the current call.
///
/// Cloning is cheap and clones share the same cache.
#[derive(Debug, Clone)]
pub struct Scope {
    context: Arc<Value>,
    cache: Cache,
}

impl Scope {
    pub(crate) fn new(context: Value, cache: Cache) -> Self {
        Self {
            context: Arc::new(context),
            cache,
        }
    }

    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }

    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}
