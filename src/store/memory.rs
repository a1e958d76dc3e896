use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::{attach_relation, Filter, FilterOp, FilterValue, Relation, RowStore};
use crate::error::StoreError;
use crate::models::Record;

/// Table-per-vector store for tests, with injectable failures.
#[derive(Default)]
pub struct MemoryStore {
    tables: HashMap<String, Vec<Record>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, rows: Vec<Value>) -> Self {
        let records = rows
            .into_iter()
            .map(|row| match row {
                Value::Object(record) => record,
                other => panic!("rows must be objects, got {other}"),
            })
            .collect();
        self.tables.insert(table.to_string(), records);
        self
    }

    /// Every fetch of `table` fails.
    pub fn failing(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    /// `(table, filtered)` for each fetch, in call order.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn fetch(
        &self,
        table: &str,
        filter: Option<&Filter>,
        expand: &[Relation],
    ) -> Result<Vec<Record>, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push((table.to_string(), filter.is_some()));

        if self.failing.contains(table) {
            return Err(StoreError::query(table, sqlx::Error::PoolTimedOut));
        }

        let rows = self.tables.get(table).cloned().unwrap_or_default();
        let mut records = match filter {
            Some(filter) => {
                let mut kept = Vec::new();
                for row in rows {
                    let value = row
                        .get(&filter.column)
                        .ok_or_else(|| StoreError::missing_column(table, &filter.column))?;
                    if row_matches(value, filter) {
                        kept.push(row);
                    }
                }
                kept
            }
            None => rows,
        };

        for relation in expand {
            let related = self.tables.get(&relation.table).cloned().unwrap_or_default();
            attach_relation(&mut records, relation, &related);
        }

        Ok(records)
    }
}

fn row_matches(value: &Value, filter: &Filter) -> bool {
    let ordering = match (&filter.value, value) {
        (FilterValue::Text(expected), Value::String(actual)) => Some(actual.as_str().cmp(expected.as_str())),
        (FilterValue::Timestamp(expected), Value::String(actual)) => {
            parse_timestamp(actual).map(|ts| ts.cmp(expected))
        }
        _ => None,
    };

    match (filter.op, ordering) {
        (FilterOp::Eq, Some(Ordering::Equal)) => true,
        (FilterOp::Lte, Some(Ordering::Less | Ordering::Equal)) => true,
        _ => false,
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn lte_keeps_rows_up_to_the_bound() {
        let store = MemoryStore::new().with_table(
            "students",
            vec![
                json!({"id": 1, "created_at": "2026-03-01T10:00:00+00:00"}),
                json!({"id": 2, "created_at": "2026-03-01T23:59:59"}),
                json!({"id": 3, "created_at": "2026-03-02T00:00:01+00:00"}),
                json!({"id": 4, "created_at": null}),
            ],
        );
        let bound = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let filter = Filter::lte("created_at", FilterValue::Timestamp(bound));

        let rows = store.fetch("students", Some(&filter), &[]).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|row| row["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn absent_filter_column_is_an_error() {
        let store = MemoryStore::new().with_table("students", vec![json!({"id": 1})]);
        let filter = Filter::equals("created_at", FilterValue::Text("x".to_string()));

        let err = store.fetch("students", Some(&filter), &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn { .. }));
        assert_eq!(store.calls(), vec![("students".to_string(), true)]);
    }
}
