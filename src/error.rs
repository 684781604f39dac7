use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinmapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("No data found in {0}")]
    EmptyFile(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Duplicate category id in taxonomy: {0}")]
    DuplicateCategory(String),

    #[error("Invalid assignment '{0}' (expected COLUMN=CATEGORY_ID)")]
    InvalidAssignment(String),

    #[error("Not available in the {actual} step (requires {expected})")]
    WrongStage {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FinmapError>;
