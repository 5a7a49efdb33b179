use crate::schema::SourceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllingError {
    #[error("{kind} export does not contain the expected content '{expected}' but '{actual}'")]
    ContentMismatch {
        kind: SourceKind,
        expected: String,
        actual: String,
    },

    #[error("More than one IKZ found in the {kind} export: {units:?}")]
    AmbiguousUnit { kind: SourceKind, units: Vec<String> },

    #[error("The IKZ values of the four exports do not match: {units:?}")]
    UnitMismatch { units: Vec<(SourceKind, String)> },

    #[error("The {kind} export contains no data rows")]
    EmptySource { kind: SourceKind },

    #[error("Too few years in the aggregated {kind} data: found {years:?}, need at least 2")]
    InsufficientYears { kind: SourceKind, years: Vec<i32> },

    #[error("Cannot parse project end date '{value}' of project {psp}")]
    DateParse { psp: String, value: String },

    #[error("{kind} export, row {row}: cannot parse amount '{value}'")]
    AmountParse {
        kind: SourceKind,
        row: usize,
        value: String,
    },

    #[error("{kind} export, row {row}: cannot parse year '{value}'")]
    YearParse {
        kind: SourceKind,
        row: usize,
        value: String,
    },

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Required export {path} is missing or unreadable")]
    MissingSourceFile { path: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ControllingError>;
