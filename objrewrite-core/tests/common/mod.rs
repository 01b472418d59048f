//! Shared helpers for the rewriter integration tests.

#![allow(dead_code)]

use objrewrite_core::{CompiledRewriter, Logger, Plugin, Registry, Rewriter, Schema};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Logger that keeps every warning for later inspection.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    messages: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn warn(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn is_integer() -> Schema {
    Schema::predicate(|v| v.is_i64() || v.is_u64())
}

pub fn int(value: &Value, key: &str) -> i64 {
    value[key].as_i64().unwrap_or_default()
}

/// Builds a rewriter from `(prefix, plugins)` pairs and compiles `desired`.
pub fn compile(
    entries: Vec<(&str, Vec<Arc<Plugin>>)>,
    store: &[&str],
    desired: &[&str],
) -> CompiledRewriter {
    init_tracing();
    let mut registry = Registry::new();
    for (prefix, plugins) in entries {
        registry.register(prefix, plugins).unwrap();
    }
    Rewriter::new(registry, store.iter().copied())
        .unwrap()
        .compile(desired.iter().copied())
        .unwrap()
}
