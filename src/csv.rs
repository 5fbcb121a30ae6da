//! Utilities for working with CSV files.

use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord, Trim, Writer};

use crate::error::{InputError, SchemaError};

/// A fully-read CSV table with normalised header names.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}
impl Table {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(InputError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(::csv::Error::from)?;
        Self::from_reader(path.display().to_string(), file)
    }

    pub fn from_reader(name: impl Into<String>, reader: impl Read) -> Result<Self, InputError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.iter().map(normalise_header).collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.into(),
            headers,
            records,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require(&self, name: &str) -> Result<usize, SchemaError> {
        self.column(name).ok_or_else(|| SchemaError::MissingColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Renames the `from` column to `to`, unless a `to` column is already present.
    pub fn alias(&mut self, from: &str, to: &str) {
        if self.column(to).is_some() {
            return;
        }
        if let Some(index) = self.column(from) {
            self.headers[index] = to.to_string();
        }
    }

    /// Iterates over `(row_number, record)` pairs, where row numbers are 1-based and exclude the header.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &StringRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (index + 1, record))
    }

    pub fn invalid(&self, column: &str, value: &str, row: usize) -> SchemaError {
        SchemaError::InvalidValue {
            table: self.name.clone(),
            column: column.to_string(),
            value: value.to_string(),
            row,
        }
    }
}

/// Reads a cell, treating a short record as blank.
pub fn cell(record: &StringRecord, column: usize) -> &str {
    record.get(column).unwrap_or("")
}

/// Strips any byte-order mark and surrounding whitespace, and replaces inner spaces with underscores.
pub fn normalise_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .replace(' ', "_")
}

pub struct CsvWriter<W: io::Write> {
    writer: Writer<W>,
}
impl CsvWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ::csv::Error> {
        Ok(Self {
            writer: Writer::from_path(path)?,
        })
    }
}
impl<W: io::Write> CsvWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Writer::from_writer(writer),
        }
    }

    pub fn append<R>(&mut self, record: R) -> Result<(), ::csv::Error>
    where
        R: IntoIterator,
        R::Item: AsRef<[u8]>,
    {
        self.writer.write_record(record)
    }

    pub fn flush(&mut self) -> Result<(), io::Error> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> Result<W, io::Error> {
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}
