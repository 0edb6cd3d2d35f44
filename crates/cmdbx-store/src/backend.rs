//! SQLite-backed catalog and instance storage
//!
//! One connection behind a mutex; every trait call takes the lock for the
//! duration of its statements, and multi-statement writes run in a
//! transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use cmdbx_core::errors::CoreError;
use cmdbx_core::model::{is_identity_field, INST_ID_FIELD, OBJ_ID_FIELD, OWNER_ID_FIELD};
use cmdbx_core::ops::{DefinitionCatalog, InstanceStorage};
use cmdbx_core::query::Page;
use cmdbx_core::{Condition, Instance, MapStr, ObjectDefinition};
use cmdbx_core_types::RequestContext;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

use crate::db;
use crate::errors::{catalog_error, corrupt_document, from_rusqlite, lock_poisoned, Result};
use crate::migrations::apply_migrations;
use crate::sql::{order_by, where_clause, DEFINITION_COLUMNS, INSTANCE_COLUMNS};

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path` and migrate it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = db::open(path)?;
        db::configure(&conn)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Wrap an existing connection, applying pending migrations
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| lock_poisoned())
    }

    /// Register a definition for `owner_id`, returning it with its id
    pub fn add_definition(
        &self,
        owner_id: &str,
        obj_id: &str,
        name: Option<&str>,
        metadata: &MapStr,
    ) -> Result<ObjectDefinition> {
        let name = name.unwrap_or(obj_id);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO object_definitions (owner_id, obj_id, name, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                owner_id,
                obj_id,
                name,
                metadata.to_json().to_string(),
                chrono::Utc::now().timestamp(),
            ],
        )
        .map_err(from_rusqlite)?;
        let id = conn.last_insert_rowid();

        tracing::debug!(owner_id, obj_id, id, "definition registered");
        Ok(ObjectDefinition::new(id, owner_id, obj_id)
            .with_name(name)
            .with_metadata(metadata.clone()))
    }

    /// Increment and return the instance id counter
    fn bump_inst_id(conn: &Connection) -> Result<i64> {
        conn.query_row(
            "UPDATE id_sequences SET value = value + 1 WHERE name = 'inst_id' RETURNING value",
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)
    }
}

fn check_live(ctx: &RequestContext, op: &str) -> Result<()> {
    if ctx.is_cancelled() {
        return Err(CoreError::Cancelled { op: op.to_string() }.into());
    }
    Ok(())
}

fn parse_map(raw: &str, table: &str) -> Result<MapStr> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| corrupt_document(table, e))?;
    Ok(MapStr::from_json(value)?)
}

fn definition_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn instance_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

/// Storage document: stored user fields with the identity columns laid over
fn to_document(inst_id: i64, owner_id: String, obj_id: String, raw: &str) -> Result<MapStr> {
    let mut doc = parse_map(raw, "instances")?;
    doc.set(INST_ID_FIELD, inst_id)
        .set(OWNER_ID_FIELD, owner_id)
        .set(OBJ_ID_FIELD, obj_id);
    Ok(doc)
}

fn project(doc: MapStr, fields: &[String]) -> MapStr {
    if fields.is_empty() {
        return doc;
    }
    doc.into_iter()
        .filter(|(k, _)| fields.contains(k) || is_identity_field(k))
        .collect()
}

fn page_bounds(page: &Page) -> (i64, i64) {
    let limit = page
        .limit
        .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = i64::try_from(page.start).unwrap_or(i64::MAX);
    (limit, offset)
}

impl DefinitionCatalog for SqliteBackend {
    fn find_definitions(
        &self,
        ctx: &RequestContext,
        filter: &Condition,
    ) -> Result<Vec<ObjectDefinition>> {
        check_live(ctx, "find_definitions")?;
        let clause = where_clause(filter, DEFINITION_COLUMNS)?;
        let sql = format!(
            "SELECT id, owner_id, obj_id, name, metadata FROM object_definitions
             WHERE {} ORDER BY id",
            clause.sql
        );

        let rows = {
            let conn = self.lock().map_err(catalog_error)?;
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| catalog_error(from_rusqlite(e)))?;
            let rows = stmt
                .query_map(params_from_iter(clause.params.iter()), definition_from_row)
                .map_err(|e| catalog_error(from_rusqlite(e)))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| catalog_error(from_rusqlite(e)))?;
            rows
        };

        rows.into_iter()
            .map(|(id, owner_id, obj_id, name, metadata)| {
                let metadata = parse_map(&metadata, "object_definitions")?;
                Ok(ObjectDefinition::new(id, owner_id, obj_id)
                    .with_name(name)
                    .with_metadata(metadata))
            })
            .collect()
    }
}

impl InstanceStorage for SqliteBackend {
    fn next_inst_id(&self, ctx: &RequestContext) -> Result<i64> {
        check_live(ctx, "next_inst_id")?;
        let conn = self.lock()?;
        Self::bump_inst_id(&conn)
    }

    fn insert(&self, ctx: &RequestContext, collection: &str, doc: &MapStr) -> Result<()> {
        check_live(ctx, "insert")?;
        let instance = Instance::from_document(doc.clone())?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO instances (inst_id, collection, owner_id, obj_id, document)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                instance.inst_id,
                collection,
                instance.owner_id,
                instance.obj_id,
                instance.fields.to_json().to_string(),
            ],
        )
        .map_err(from_rusqlite)?;

        tracing::debug!(collection, inst_id = instance.inst_id, "instance inserted");
        Ok(())
    }

    fn update(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        data: &MapStr,
    ) -> Result<u64> {
        check_live(ctx, "update")?;
        let clause = where_clause(cond, INSTANCE_COLUMNS)?;
        let sql = format!(
            "SELECT inst_id, document FROM instances WHERE collection = ? AND ({})",
            clause.sql
        );
        let mut params = vec![Value::Text(collection.to_string())];
        params.extend(clause.params);

        let overlay: MapStr = data
            .iter()
            .filter(|(k, _)| !is_identity_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(from_rusqlite)?;
        let matched: Vec<(i64, String)> = {
            let mut stmt = tx.prepare(&sql).map_err(from_rusqlite)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .map_err(from_rusqlite)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(from_rusqlite)?;
            rows
        };

        for (inst_id, raw) in &matched {
            let mut doc = parse_map(raw, "instances")?;
            doc.merge(&overlay);
            tx.execute(
                "UPDATE instances SET document = ?1 WHERE inst_id = ?2",
                rusqlite::params![doc.to_json().to_string(), inst_id],
            )
            .map_err(from_rusqlite)?;
        }
        tx.commit().map_err(from_rusqlite)?;

        tracing::debug!(collection, count = matched.len(), "instances updated");
        Ok(matched.len() as u64)
    }

    fn delete(&self, ctx: &RequestContext, collection: &str, cond: &Condition) -> Result<u64> {
        check_live(ctx, "delete")?;
        let clause = where_clause(cond, INSTANCE_COLUMNS)?;
        let sql = format!(
            "DELETE FROM instances WHERE collection = ? AND ({})",
            clause.sql
        );
        let mut params = vec![Value::Text(collection.to_string())];
        params.extend(clause.params);

        let conn = self.lock()?;
        let count = conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;

        tracing::debug!(collection, count, "instances deleted");
        Ok(count as u64)
    }

    fn find(
        &self,
        ctx: &RequestContext,
        collection: &str,
        cond: &Condition,
        page: &Page,
    ) -> Result<(u64, Vec<MapStr>)> {
        check_live(ctx, "find")?;
        let clause = where_clause(cond, INSTANCE_COLUMNS)?;
        let order = order_by(&page.sort, INSTANCE_COLUMNS)?;
        let (limit, offset) = page_bounds(page);

        let mut filter_params = vec![Value::Text(collection.to_string())];
        filter_params.extend(clause.params);

        let count_sql = format!(
            "SELECT COUNT(*) FROM instances WHERE collection = ? AND ({})",
            clause.sql
        );
        let page_sql = format!(
            "SELECT inst_id, owner_id, obj_id, document FROM instances
             WHERE collection = ? AND ({}) ORDER BY {} LIMIT ? OFFSET ?",
            clause.sql, order.sql
        );
        let mut page_params = filter_params.clone();
        page_params.extend(order.params);
        page_params.push(Value::Integer(limit));
        page_params.push(Value::Integer(offset));

        let (total, rows) = {
            let conn = self.lock()?;
            let total: i64 = conn
                .query_row(&count_sql, params_from_iter(filter_params.iter()), |row| {
                    row.get(0)
                })
                .map_err(from_rusqlite)?;
            let mut stmt = conn.prepare(&page_sql).map_err(from_rusqlite)?;
            let rows = stmt
                .query_map(params_from_iter(page_params.iter()), instance_from_row)
                .map_err(from_rusqlite)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(from_rusqlite)?;
            (total, rows)
        };

        let info = rows
            .into_iter()
            .map(|(inst_id, owner_id, obj_id, raw)| {
                to_document(inst_id, owner_id, obj_id, &raw).map(|d| project(d, &page.fields))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((u64::try_from(total).unwrap_or(0), info))
    }
}
