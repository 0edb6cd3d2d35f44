//! `Condition` to SQL translation
//!
//! Identity fields map to real columns; every other field is read from the
//! JSON column with `json_extract`. All values and JSON paths are bound as
//! parameters. The generated SQL follows the in-memory evaluation rules:
//! a missing field reads as NULL, `$ne`/`$nin` match missing fields, and
//! both equality and ordering only hold between values of the same kind
//! (booleans are never numbers).

use cmdbx_core::errors::{ExError, ExErrorKind};
use cmdbx_core::query::SortKey;
use cmdbx_core::{CompareOp, Condition, FieldValue, Predicate};
use rusqlite::types::Value;

use crate::errors::Result;

/// Column layout of one table
#[derive(Debug, Clone, Copy)]
pub struct Columns {
    pub columns: &'static [&'static str],
    pub json_column: &'static str,
    /// Final sort key, so paging is stable
    pub tiebreak: &'static str,
}

pub const INSTANCE_COLUMNS: Columns = Columns {
    columns: &["inst_id", "owner_id", "obj_id"],
    json_column: "document",
    tiebreak: "inst_id",
};

pub const DEFINITION_COLUMNS: Columns = Columns {
    columns: &["id", "owner_id", "obj_id", "name"],
    json_column: "metadata",
    tiebreak: "id",
};

/// A SQL fragment plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Bind value for a field value; lists and maps compare as JSON text
pub fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Int(i) => Value::Integer(*i),
        FieldValue::Float(f) => Value::Real(*f),
        FieldValue::String(s) => Value::Text(s.clone()),
        FieldValue::List(_) | FieldValue::Map(_) => Value::Text(value.to_json().to_string()),
    }
}

fn malformed(message: String) -> ExError {
    ExError::new(ExErrorKind::MalformedFilter)
        .with_op("sql_translate")
        .with_message(message)
}

struct Builder {
    cols: Columns,
    params: Vec<Value>,
}

impl Builder {
    fn is_column(&self, field: &str) -> bool {
        self.cols.columns.contains(&field)
    }

    /// JSON path of a document field, pushed as a parameter
    fn path(&mut self, field: &str) -> Result<&'static str> {
        if field.contains('"') {
            return Err(malformed(format!(
                "field name '{}' cannot be addressed in a document",
                field
            )));
        }
        self.params.push(Value::Text(format!("$.\"{}\"", field)));
        Ok("?")
    }

    /// SQL expression reading `field`
    fn expr(&mut self, field: &str) -> Result<String> {
        if self.is_column(field) {
            return Ok(field.to_string());
        }
        let path = self.path(field)?;
        Ok(format!("json_extract({}, {})", self.cols.json_column, path))
    }

    fn bind(&mut self, value: &FieldValue) -> &'static str {
        self.params.push(to_sql_value(value));
        "?"
    }

    /// Test that `field` holds a value of the same kind as `value`
    ///
    /// `None` when the field can never hold that kind. Document fields are
    /// checked with `json_type`, so JSON booleans never pass for numbers.
    fn kind_test(&mut self, field: &str, value: &FieldValue) -> Result<Option<String>> {
        if self.is_column(field) {
            let kinds = match value {
                FieldValue::Int(_) | FieldValue::Float(_) => "('integer', 'real')",
                FieldValue::String(_) => "('text')",
                _ => return Ok(None),
            };
            return Ok(Some(format!("typeof({}) IN {}", field, kinds)));
        }
        let kinds = match value {
            FieldValue::Null => return Ok(None),
            FieldValue::Bool(_) => "('true', 'false')",
            FieldValue::Int(_) | FieldValue::Float(_) => "('integer', 'real')",
            FieldValue::String(_) => "('text')",
            FieldValue::List(_) => "('array')",
            FieldValue::Map(_) => "('object')",
        };
        let path = self.path(field)?;
        Ok(Some(format!(
            "json_type({}, {}) IN {}",
            self.cols.json_column, path, kinds
        )))
    }

    /// Same kind and `op` holds; never NULL
    fn compare(&mut self, field: &str, op: &str, value: &FieldValue) -> Result<String> {
        let Some(kind) = self.kind_test(field, value)? else {
            return Ok("0".to_string());
        };
        let e = self.expr(field)?;
        Ok(format!(
            "COALESCE(({} AND {} {} {}), 0)",
            kind,
            e,
            op,
            self.bind(value)
        ))
    }

    fn equals(&mut self, field: &str, value: &FieldValue) -> Result<String> {
        if value.is_null() {
            return Ok(format!("{} IS NULL", self.expr(field)?));
        }
        self.compare(field, "=", value)
    }

    fn predicate(&mut self, p: &Predicate) -> Result<String> {
        let sql = match &p.op {
            CompareOp::Eq => self.equals(&p.field, &p.value)?,
            CompareOp::Ne => format!("NOT ({})", self.equals(&p.field, &p.value)?),
            CompareOp::Lt => self.ordered(p, "<")?,
            CompareOp::Lte => self.ordered(p, "<=")?,
            CompareOp::Gt => self.ordered(p, ">")?,
            CompareOp::Gte => self.ordered(p, ">=")?,
            CompareOp::In => self.membership(p)?,
            CompareOp::NotIn => format!("NOT ({})", self.membership(p)?),
            CompareOp::Other(name) => {
                return Err(malformed(format!(
                    "operator '{}' on '{}' is not supported by the SQLite backend",
                    name, p.field
                )))
            }
        };
        Ok(sql)
    }

    /// Ordering comparison; only scalars of the same kind are ordered
    fn ordered(&mut self, p: &Predicate, op: &str) -> Result<String> {
        match &p.value {
            FieldValue::Null | FieldValue::List(_) | FieldValue::Map(_) => Ok("0".to_string()),
            value => self.compare(&p.field, op, value),
        }
    }

    /// Any element of the list equals the field
    fn membership(&mut self, p: &Predicate) -> Result<String> {
        let list = p
            .value
            .as_list()
            .ok_or_else(|| malformed(format!("'{}' on '{}' needs a list", p.op, p.field)))?;
        if list.is_empty() {
            return Ok("0".to_string());
        }
        let mut alternatives = Vec::with_capacity(list.len());
        for value in list {
            alternatives.push(self.equals(&p.field, value)?);
        }
        Ok(format!("({})", alternatives.join(" OR ")))
    }
}

/// WHERE body for `cond`; an empty condition is `1`
///
/// # Errors
///
/// `MalformedFilter` for opaque operators or unaddressable field names.
pub fn where_clause(cond: &Condition, cols: Columns) -> Result<SqlFragment> {
    let mut builder = Builder {
        cols,
        params: Vec::new(),
    };
    let mut parts = Vec::with_capacity(cond.len());
    for p in cond.predicates() {
        parts.push(builder.predicate(p)?);
    }
    let sql = if parts.is_empty() {
        "1".to_string()
    } else {
        parts.join(" AND ")
    };
    Ok(SqlFragment {
        sql,
        params: builder.params,
    })
}

/// ORDER BY body for `sort`, always ending with the tiebreak column
///
/// # Errors
///
/// `MalformedFilter` for unaddressable field names.
pub fn order_by(sort: &[SortKey], cols: Columns) -> Result<SqlFragment> {
    let mut builder = Builder {
        cols,
        params: Vec::new(),
    };
    let mut keys = Vec::with_capacity(sort.len() + 1);
    for key in sort {
        let e = builder.expr(&key.field)?;
        keys.push(format!("{} {}", e, if key.descending { "DESC" } else { "ASC" }));
    }
    keys.push(cols.tiebreak.to_string());
    Ok(SqlFragment {
        sql: keys.join(", "),
        params: builder.params,
    })
}
