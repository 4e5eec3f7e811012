//! Error taxonomy for the scoring pipeline. Ingestion problems are fatal with
//! row/field context; recoverable conditions (oversampling fallback, empty
//! candidate sets) are logged where they occur, not raised.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' is missing from the header")]
    MissingColumn(&'static str),

    #[error("line {line}: malformed row: {source}")]
    MalformedRow {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: field '{field}' is not numeric: '{value}'")]
    BadNumber {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: team code '{team}' is not in the league map")]
    UnknownTeam { line: u64, team: String },

    #[error("no eligible player-seasons to train on")]
    EmptyDataset,

    #[error("training labels contain a single class; cannot fit a classifier")]
    DegenerateLabels,
}
