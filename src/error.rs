use thiserror::Error;

/// Failure of a single fetch against the row store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or could not run the query
    #[error("query against '{table}' failed: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// A filter named a column the rows do not carry
    #[error("column '{column}' does not exist on '{table}'")]
    MissingColumn { table: String, column: String },

    /// Table or column names must be plain identifiers
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// A row could not be turned into a record
    #[error("could not decode row from '{table}': {reason}")]
    Decode { table: String, reason: String },
}

impl StoreError {
    pub fn query(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Query {
            table: table.into(),
            source,
        }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn decode(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

/// The only dashboard failure that reaches the caller.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("no store connection is configured")]
    StoreUnavailable,
}
