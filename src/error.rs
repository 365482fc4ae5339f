use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Fetch of {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Table {table} is missing required column {column:?}")]
    MissingColumn { table: String, column: String },

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Rule {rule:?} produced {actual} values for {expected} rows")]
    RuleLength {
        rule: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid KPI spec: {0}")]
    InvalidKpi(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
