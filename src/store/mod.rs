use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::error::StoreError;
use crate::models::Record;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgRowStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Lte,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Timestamp(NaiveDateTime),
}

/// Single-column predicate applied by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn lte(column: impl Into<String>, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Lte,
            value,
        }
    }

    pub fn equals(column: impl Into<String>, value: FilterValue) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value,
        }
    }
}

/// Many-to-one expansion: the row of `table` whose `id` matches
/// `record[foreign_key]` is nested under `record[table]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub table: String,
    pub foreign_key: String,
    /// Empty means every column.
    pub columns: Vec<String>,
}

impl Relation {
    pub fn new(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            foreign_key: foreign_key.into(),
            columns: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|column| column.to_string()).collect();
        self
    }

    fn project(&self, row: &Record) -> Record {
        if self.columns.is_empty() {
            return row.clone();
        }
        self.columns
            .iter()
            .filter_map(|column| row.get(column).map(|value| (column.clone(), value.clone())))
            .collect()
    }
}

/// Read side of the hosted row store.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn fetch(
        &self,
        table: &str,
        filter: Option<&Filter>,
        expand: &[Relation],
    ) -> Result<Vec<Record>, StoreError>;
}

/// Row ids arrive as numbers or strings depending on the column type.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

pub fn validate_identifier(name: &str) -> Result<&str, StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Nest the matching related row into each record, or `null` when the
/// foreign key is empty or dangling.
pub(crate) fn attach_relation(records: &mut [Record], relation: &Relation, related: &[Record]) {
    let by_id: HashMap<String, &Record> = related
        .iter()
        .filter_map(|row| row.get("id").and_then(id_key).map(|key| (key, row)))
        .collect();

    for record in records.iter_mut() {
        let nested = record
            .get(&relation.foreign_key)
            .and_then(id_key)
            .and_then(|key| by_id.get(&key))
            .map(|row| Value::Object(relation.project(row)))
            .unwrap_or(Value::Null);
        record.insert(relation.table.clone(), nested);
    }
}
