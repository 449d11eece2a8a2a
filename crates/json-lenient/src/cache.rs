//! Read-through memoization of proxy schemas.
//!
//! Building a proxy schema walks the whole shape; a cache keeps one
//! [`ProxySchema`] per `(shape, options)` pair. Entries are published once:
//! when two callers race on a miss, both build and the first insert wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::options::Options;
use crate::proxy::{ProxyBuilder, ProxySchema};
use crate::shape::TypeShape;

type Key = (TypeShape, Options);

#[derive(Default)]
pub struct SchemaCache {
    sink: Option<Arc<dyn DiagnosticSink>>,
    entries: RwLock<HashMap<Key, Arc<ProxySchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose schemas report to `sink` instead of `tracing`.
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink: Some(sink),
            entries: RwLock::default(),
        }
    }

    /// The process-wide cache.
    pub fn global() -> &'static SchemaCache {
        static GLOBAL: OnceLock<SchemaCache> = OnceLock::new();
        GLOBAL.get_or_init(SchemaCache::new)
    }

    pub fn get(&self, shape: &TypeShape, options: Options) -> Arc<ProxySchema> {
        let key = (shape.clone(), options);
        if let Some(found) = self.read().get(&key) {
            return Arc::clone(found);
        }

        let diag = Diagnostics::new(options, self.sink.clone());
        let built = Arc::new(ProxyBuilder::from_diagnostics(diag).build(shape));
        Arc::clone(self.write().entry(key).or_insert(built))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Key, Arc<ProxySchema>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Key, Arc<ProxySchema>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
