use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::age::{age_from_birthdate, bracket_from_age, AgeBracket};
use crate::clock::Clock;
use crate::error::{DashboardError, StoreError};
use crate::models::{DashboardReport, ProfessorTally, Record};
use crate::store::{id_key, Filter, FilterValue, Relation, RowStore};

pub const CREATED_AT: &str = "created_at";
pub const FAILURE_NOTICE: &str = "Erro ao processar dados.";
pub const FALLBACK_NOTICE: &str =
    "Filtro por data indisponível; o relatório inclui todos os registros.";
pub const ROSTER_NOTICE: &str = "Não foi possível carregar a lista de professores.";

/// Which record set feeds the age brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportSource {
    /// Registered students
    #[default]
    Students,
    /// Enrollments joined to their students
    Enrollments,
    /// Enrollments plus a per-professor rollup
    EnrollmentsByProfessor,
}

impl ReportSource {
    fn table(self) -> &'static str {
        match self {
            ReportSource::Students => "students",
            ReportSource::Enrollments | ReportSource::EnrollmentsByProfessor => "enrollments",
        }
    }

    fn relations(self) -> Vec<Relation> {
        match self {
            ReportSource::Students => Vec::new(),
            ReportSource::Enrollments | ReportSource::EnrollmentsByProfessor => vec![
                Relation::new("students", "student_id"),
                Relation::new("classes", "class_id").columns(&["professor_id"]),
            ],
        }
    }

    fn birth_date(self, record: &Record) -> Option<&Value> {
        match self {
            ReportSource::Students => record.get("birth_date"),
            ReportSource::Enrollments | ReportSource::EnrollmentsByProfessor => record
                .get("students")
                .and_then(Value::as_object)
                .and_then(|student| student.get("birth_date")),
        }
    }
}

/// A report together with how much of it could be trusted.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// Filtered fetch succeeded and every requested part is present
    Complete(DashboardReport),
    /// Counts are present but a fallback was taken; `aviso` says which
    Partial(DashboardReport),
    /// Nothing could be fetched; brackets are empty
    Degraded(DashboardReport),
}

impl ReportOutcome {
    pub fn report(&self) -> &DashboardReport {
        match self {
            ReportOutcome::Complete(report)
            | ReportOutcome::Partial(report)
            | ReportOutcome::Degraded(report) => report,
        }
    }

    pub fn into_report(self) -> DashboardReport {
        match self {
            ReportOutcome::Complete(report)
            | ReportOutcome::Partial(report)
            | ReportOutcome::Degraded(report) => report,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ReportOutcome::Complete(_) => "complete",
            ReportOutcome::Partial(_) => "partial",
            ReportOutcome::Degraded(_) => "degraded",
        }
    }
}

/// Counts gathered in one pass over the fetched records.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub brackets: BTreeMap<AgeBracket, usize>,
    pub per_professor: HashMap<String, usize>,
    pub total: usize,
}

pub fn tally_records(records: &[Record], source: ReportSource, today: NaiveDate) -> Tally {
    let mut brackets = AgeBracket::zeroed();
    let mut per_professor: HashMap<String, usize> = HashMap::new();

    for record in records {
        if let Some(professor) = record
            .get("classes")
            .and_then(Value::as_object)
            .and_then(|class| class.get("professor_id"))
            .and_then(id_key)
        {
            *per_professor.entry(professor).or_insert(0) += 1;
        }

        let age = match source.birth_date(record) {
            None | Some(Value::Null) => continue,
            Some(Value::String(raw)) if raw.is_empty() => continue,
            Some(Value::String(raw)) => age_from_birthdate(Some(raw.as_str()), today),
            Some(_) => age_from_birthdate(None, today),
        };
        *brackets.entry(bracket_from_age(age)).or_insert(0) += 1;
    }

    Tally {
        brackets,
        per_professor,
        total: records.len(),
    }
}

/// Last second of `date`, so rows created on the cutoff day still count.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::seconds(86_399)
}

struct Fetched {
    records: Vec<Record>,
    filtered: bool,
}

async fn fetch_with_fallback(
    store: &dyn RowStore,
    table: &str,
    filter: &Filter,
    relations: &[Relation],
) -> Result<Fetched, StoreError> {
    match store.fetch(table, Some(filter), relations).await {
        Ok(records) => Ok(Fetched {
            records,
            filtered: true,
        }),
        Err(err) => {
            warn!(table, error = %err, "date filter failed, fetching every row instead");
            let records = store.fetch(table, None, relations).await?;
            Ok(Fetched {
                records,
                filtered: false,
            })
        }
    }
}

/// Builds dashboard snapshots from the row store.
pub struct Dashboard<'a> {
    store: Option<&'a dyn RowStore>,
    clock: &'a dyn Clock,
}

impl<'a> Dashboard<'a> {
    pub fn new(store: Option<&'a dyn RowStore>, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub async fn build_report(
        &self,
        cutoff: Option<NaiveDate>,
        source: ReportSource,
    ) -> Result<ReportOutcome, DashboardError> {
        let Some(store) = self.store else {
            error!("dashboard requested without a store connection");
            return Err(DashboardError::StoreUnavailable);
        };

        let today = self.clock.today();
        let reference_date = cutoff.unwrap_or(today);
        let filter = Filter::lte(
            CREATED_AT,
            FilterValue::Timestamp(end_of_day(reference_date)),
        );
        let relations = source.relations();

        let records = fetch_with_fallback(store, source.table(), &filter, &relations);
        let (fetched, roster) = if source == ReportSource::EnrollmentsByProfessor {
            let (fetched, roster) = tokio::join!(records, store.fetch("professors", None, &[]));
            (fetched, Some(roster))
        } else {
            (records.await, None)
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                error!(table = source.table(), error = %err, "dashboard fetch failed");
                return Ok(ReportOutcome::Degraded(DashboardReport {
                    age_brackets: BTreeMap::new(),
                    by_professor: None,
                    reference_date,
                    total_students: None,
                    notice: Some(FAILURE_NOTICE.to_string()),
                }));
            }
        };

        let tally = tally_records(&fetched.records, source, today);
        let mut notices = Vec::new();
        if !fetched.filtered {
            notices.push(FALLBACK_NOTICE);
        }

        let by_professor = match roster {
            Some(Ok(professors)) => Some(professor_tallies(&professors, &tally.per_professor)),
            Some(Err(err)) => {
                warn!(error = %err, "professor roster unavailable");
                notices.push(ROSTER_NOTICE);
                None
            }
            None => None,
        };

        info!(
            %reference_date,
            total = tally.total,
            filtered = fetched.filtered,
            "dashboard report built"
        );

        let report = DashboardReport {
            age_brackets: tally.brackets,
            by_professor,
            reference_date,
            total_students: Some(tally.total),
            notice: (!notices.is_empty()).then(|| notices.join(" ")),
        };

        Ok(if notices.is_empty() {
            ReportOutcome::Complete(report)
        } else {
            ReportOutcome::Partial(report)
        })
    }
}

/// One entry per professor in roster order, including those with no students.
fn professor_tallies(
    professors: &[Record],
    per_professor: &HashMap<String, usize>,
) -> Vec<ProfessorTally> {
    professors
        .iter()
        .map(|professor| ProfessorTally {
            name: text_field(professor, "name"),
            instrument: text_field(professor, "instrument"),
            total_students: professor
                .get("id")
                .and_then(id_key)
                .and_then(|id| per_professor.get(&id).copied())
                .unwrap_or(0),
        })
        .collect()
}

fn text_field(record: &Record, column: &str) -> String {
    record
        .get(column)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
