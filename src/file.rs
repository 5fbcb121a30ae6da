//! File and directory manipulation utilities.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::{fs, io};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{from_reader, to_writer_pretty};

/// Reads a JSON-encoded type from a given file `path`.
pub fn read_json<D: DeserializeOwned>(path: impl AsRef<Path>) -> Result<D, io::Error> {
    let file = File::open(path)?;
    Ok(from_reader(BufReader::new(file))?)
}

/// Writes `value` as pretty-printed JSON to `path`, replacing any existing file and creating missing
/// parent directories.
pub fn write_json<S: Serialize>(path: impl AsRef<Path>, value: &S) -> Result<(), io::Error> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

pub fn ensure_parent_dir(path: impl AsRef<Path>) -> Result<(), io::Error> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

pub trait FromJsonFile<D> {
    fn from_json_file(path: impl AsRef<Path>) -> Result<D, io::Error>;
}

impl<D: DeserializeOwned> FromJsonFile<D> for D {
    fn from_json_file(path: impl AsRef<Path>) -> Result<D, io::Error> {
        read_json(path)
    }
}
