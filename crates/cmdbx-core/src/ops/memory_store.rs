use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock};

use cmdbx_core_types::RequestContext;

use super::{DefinitionCatalog, InstanceStorage};
use crate::condition::Condition;
use crate::errors::{CoreError, ExError, Result};
use crate::model::{FieldValue, MapStr, ObjectDefinition, IDENTITY_FIELDS};
use crate::query::{Page, SortKey};

/// In-memory catalog and instance storage
///
/// Backs tests and single-process use. Collections hold documents in
/// insertion order, which is also `inst_id` order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    definitions: RwLock<Vec<ObjectDefinition>>,
    collections: RwLock<HashMap<String, Vec<MapStr>>>,
    next_definition_id: AtomicI64,
    next_inst_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, returning it with its assigned id
    pub fn add_definition(&self, owner_id: &str, obj_id: &str) -> ObjectDefinition {
        let id = self.next_definition_id.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let def = ObjectDefinition::new(id, owner_id, obj_id);
        self.register_definition(def.clone());
        def
    }

    /// Register a fully built definition as-is
    pub fn register_definition(&self, def: ObjectDefinition) {
        self.definitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(def);
    }

    /// Number of documents currently held in `collection`
    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, Vec::len)
    }
}

fn lock_failed<T>(_: PoisonError<T>) -> ExError {
    CoreError::Persistence {
        reason: "memory store lock poisoned".to_string(),
    }
    .into()
}

/// Collect matching indices; evaluation errors surface before any mutation
fn matching(docs: &[MapStr], cond: &Condition) -> Result<Vec<usize>> {
    let mut hits = Vec::new();
    for (idx, doc) in docs.iter().enumerate() {
        if cond.matches(doc)? {
            hits.push(idx);
        }
    }
    Ok(hits)
}

fn compare_docs(a: &MapStr, b: &MapStr, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.get(&key.field).unwrap_or(&FieldValue::Null);
        let right = b.get(&key.field).unwrap_or(&FieldValue::Null);
        let ord = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => left.compare(right).unwrap_or(Ordering::Equal),
        };
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn project(doc: &MapStr, fields: &[String]) -> MapStr {
    if fields.is_empty() {
        return doc.clone();
    }
    doc.iter()
        .filter(|(k, _)| fields.contains(k) || IDENTITY_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl DefinitionCatalog for MemoryStore {
    fn find_definitions(
        &self,
        _ctx: &RequestContext,
        filter: &Condition,
    ) -> Result<Vec<ObjectDefinition>> {
        let defs = self.definitions.read().map_err(|_| {
            ExError::from(CoreError::CatalogUnavailable {
                reason: "catalog lock poisoned".to_string(),
            })
        })?;
        let mut found = Vec::new();
        for def in defs.iter() {
            if filter.matches(&def.attributes())? {
                found.push(def.clone());
            }
        }
        Ok(found)
    }
}

impl InstanceStorage for MemoryStore {
    fn next_inst_id(&self, _ctx: &RequestContext) -> Result<i64> {
        Ok(self.next_inst_id.fetch_add(1, AtomicOrdering::SeqCst) + 1)
    }

    fn insert(&self, _ctx: &RequestContext, collection: &str, doc: &MapStr) -> Result<()> {
        self.collections
            .write()
            .map_err(lock_failed)?
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(())
    }

    fn update(
        &self,
        _ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        data: &MapStr,
    ) -> Result<u64> {
        let mut collections = self.collections.write().map_err(lock_failed)?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let hits = matching(docs, cond)?;
        for idx in &hits {
            docs[*idx].merge(data);
        }
        Ok(hits.len() as u64)
    }

    fn delete(&self, _ctx: &RequestContext, collection: &str, cond: &Condition) -> Result<u64> {
        let mut collections = self.collections.write().map_err(lock_failed)?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let hits = matching(docs, cond)?;
        let mut idx = 0;
        docs.retain(|_| {
            let keep = !hits.contains(&idx);
            idx += 1;
            keep
        });
        Ok(hits.len() as u64)
    }

    fn find(
        &self,
        _ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        page: &Page,
    ) -> Result<(u64, Vec<MapStr>)> {
        let collections = self.collections.read().map_err(lock_failed)?;
        let Some(docs) = collections.get(collection) else {
            return Ok((0, Vec::new()));
        };

        let mut hits: Vec<&MapStr> = matching(docs, cond)?
            .into_iter()
            .map(|idx| &docs[idx])
            .collect();
        let total = hits.len() as u64;

        if !page.sort.is_empty() {
            hits.sort_by(|a, b| compare_docs(a, b, &page.sort));
        }

        let start = usize::try_from(page.start).unwrap_or(usize::MAX);
        let limit = page
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let info = hits
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|doc| project(doc, &page.fields))
            .collect();

        Ok((total, info))
    }
}
