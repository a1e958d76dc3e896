use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::age::AgeBracket;

/// A row as handed back by the store, keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub birth_date: NaiveDate,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub birth_date: NaiveDate,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub class_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessorTally {
    #[serde(rename = "professor")]
    pub name: String,
    #[serde(rename = "instrumento")]
    pub instrument: String,
    #[serde(rename = "total_alunos")]
    pub total_students: usize,
}

/// Snapshot handed to the dashboard view. Built per request, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    #[serde(rename = "faixa_etaria")]
    pub age_brackets: BTreeMap<AgeBracket, usize>,
    #[serde(rename = "alunos_por_professor", skip_serializing_if = "Option::is_none")]
    pub by_professor: Option<Vec<ProfessorTally>>,
    #[serde(rename = "data_referencia")]
    pub reference_date: NaiveDate,
    #[serde(rename = "total_alunos", skip_serializing_if = "Option::is_none")]
    pub total_students: Option<usize>,
    #[serde(rename = "aviso", skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}
