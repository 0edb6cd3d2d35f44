use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cmdbx_core::ops::{DefinitionCatalog, InstanceStorage};
use cmdbx_core::query::Page;
use cmdbx_core::{
    Condition, ExError, ExErrorKind, InstanceService, MapStr, MemoryStore, ObjectDefinition,
    Result,
};
use cmdbx_core_types::RequestContext;

/// Service over a fresh in-memory store, returning both
#[allow(dead_code)]
pub fn memory_service() -> (Arc<MemoryStore>, InstanceService) {
    let store = Arc::new(MemoryStore::new());
    let service = InstanceService::new(store.clone(), store.clone());
    (store, service)
}

/// Two tenants with overlapping object types
///
/// acme: host, switch, router; globex: host
#[allow(dead_code)]
pub fn seeded_service() -> (Arc<MemoryStore>, InstanceService) {
    let (store, service) = memory_service();
    store.add_definition("acme", "host");
    store.add_definition("acme", "switch");
    store.add_definition("acme", "router");
    store.add_definition("globex", "host");
    (store, service)
}

#[allow(dead_code)]
pub fn fields(json: serde_json::Value) -> MapStr {
    MapStr::from_json(json).unwrap()
}

/// Storage wrapper counting every call that reaches the backend
#[allow(dead_code)]
pub struct CountingStorage {
    pub inner: Arc<MemoryStore>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStorage {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl InstanceStorage for CountingStorage {
    fn next_inst_id(&self, ctx: &RequestContext) -> Result<i64> {
        self.tick();
        self.inner.next_inst_id(ctx)
    }

    fn insert(&self, ctx: &RequestContext, collection: &str, doc: &MapStr) -> Result<()> {
        self.tick();
        self.inner.insert(ctx, collection, doc)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        data: &MapStr,
    ) -> Result<u64> {
        self.tick();
        self.inner.update(ctx, collection, cond, data)
    }

    fn delete(&self, ctx: &RequestContext, collection: &str, cond: &Condition) -> Result<u64> {
        self.tick();
        self.inner.delete(ctx, collection, cond)
    }

    fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        page: &Page,
    ) -> Result<(u64, Vec<MapStr>)> {
        self.tick();
        self.inner.find(ctx, collection, cond, page)
    }
}

/// Storage whose `find` fails for documents of one object type
#[allow(dead_code)]
pub struct FailingFind {
    pub inner: Arc<MemoryStore>,
    pub failing_obj_id: &'static str,
}

impl InstanceStorage for FailingFind {
    fn next_inst_id(&self, ctx: &RequestContext) -> Result<i64> {
        self.inner.next_inst_id(ctx)
    }

    fn insert(&self, ctx: &RequestContext, collection: &str, doc: &MapStr) -> Result<()> {
        self.inner.insert(ctx, collection, doc)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        data: &MapStr,
    ) -> Result<u64> {
        self.inner.update(ctx, collection, cond, data)
    }

    fn delete(&self, ctx: &RequestContext, collection: &str, cond: &Condition) -> Result<u64> {
        self.inner.delete(ctx, collection, cond)
    }

    fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        page: &Page,
    ) -> Result<(u64, Vec<MapStr>)> {
        if cond.eq_value("obj_id").and_then(|v| v.as_str()) == Some(self.failing_obj_id) {
            return Err(ExError::new(ExErrorKind::Persistence).with_message("connection reset"));
        }
        self.inner.find(ctx, collection, cond, page)
    }
}

/// Catalog that cannot be reached
#[allow(dead_code)]
pub struct UnreachableCatalog;

impl DefinitionCatalog for UnreachableCatalog {
    fn find_definitions(
        &self,
        _ctx: &RequestContext,
        _filter: &Condition,
    ) -> Result<Vec<ObjectDefinition>> {
        Err(ExError::new(ExErrorKind::Persistence).with_message("catalog connection refused"))
    }
}
