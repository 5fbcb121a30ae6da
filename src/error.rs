//! Failures arising while loading the tabular inputs of a pipeline stage.

use std::path::PathBuf;

use thiserror::Error;

use crate::team::UnrecognizedTeam;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("missing input file {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    UnrecognizedTeam(#[from] UnrecognizedTeam),

    #[error("{0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("{table}: missing column {column}")]
    MissingColumn { table: String, column: String },

    #[error("{table}: invalid {column} value '{value}' in row {row}")]
    InvalidValue {
        table: String,
        column: String,
        value: String,
        row: usize,
    },

    #[error("{table}: more than one row for team {team}")]
    DuplicateTeam { table: String, team: String },
}
