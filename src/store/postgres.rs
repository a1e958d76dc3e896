use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;

use super::{attach_relation, validate_identifier, Filter, FilterOp, FilterValue, Relation, RowStore};
use crate::error::StoreError;
use crate::models::Record;

const UNDEFINED_COLUMN: &str = "42703";

/// Row store backed by the Postgres database behind the hosted backend.
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn expand(&self, records: &mut [Record], relation: &Relation) -> Result<(), StoreError> {
        let table = validate_identifier(&relation.table)?;
        let ids: Vec<i64> = records
            .iter()
            .filter_map(|record| record.get(&relation.foreign_key).and_then(Value::as_i64))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let related = if ids.is_empty() {
            Vec::new()
        } else {
            let sql = format!("SELECT to_jsonb(r) AS row FROM {table} r WHERE r.id = ANY($1)");
            let rows = sqlx::query(&sql)
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|source| classify(table, None, source))?;
            rows.iter()
                .map(|row| decode_row(table, row))
                .collect::<Result<Vec<_>, _>>()?
        };

        attach_relation(records, relation, &related);
        Ok(())
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn fetch(
        &self,
        table: &str,
        filter: Option<&Filter>,
        expand: &[Relation],
    ) -> Result<Vec<Record>, StoreError> {
        let table = validate_identifier(table)?;
        let mut sql = format!("SELECT to_jsonb(t) AS row FROM {table} t");
        if let Some(filter) = filter {
            let column = validate_identifier(&filter.column)?;
            let op = match filter.op {
                FilterOp::Lte => "<=",
                FilterOp::Eq => "=",
            };
            sql.push_str(&format!(" WHERE t.{column} {op} $1"));
        }
        debug!(%sql, "fetching rows");

        let mut query = sqlx::query(&sql);
        if let Some(filter) = filter {
            query = match &filter.value {
                FilterValue::Text(value) => query.bind(value.clone()),
                FilterValue::Timestamp(value) => query.bind(*value),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|source| classify(table, filter, source))?;
        let mut records = rows
            .iter()
            .map(|row| decode_row(table, row))
            .collect::<Result<Vec<_>, _>>()?;

        for relation in expand {
            self.expand(&mut records, relation).await?;
        }

        Ok(records)
    }
}

fn decode_row(table: &str, row: &PgRow) -> Result<Record, StoreError> {
    let value: Value = row
        .try_get("row")
        .map_err(|err| StoreError::decode(table, err.to_string()))?;
    match value {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::decode(
            table,
            format!("expected a JSON object, got {other}"),
        )),
    }
}

fn classify(table: &str, filter: Option<&Filter>, source: sqlx::Error) -> StoreError {
    let undefined_column = match &source {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_COLUMN),
        _ => false,
    };
    match filter {
        Some(filter) if undefined_column => StoreError::missing_column(table, &filter.column),
        _ => StoreError::query(table, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_stay_query_errors() {
        let filter = Filter::lte("created_at", FilterValue::Text("2026-01-01".to_string()));
        let err = classify("students", Some(&filter), sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Query { .. }));
    }
}
