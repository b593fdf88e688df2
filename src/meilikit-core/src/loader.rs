//! Reading documents from local files.
//!
//! Three formats are understood: a JSON array, newline-delimited JSON and
//! CSV with a header row. Everything here is synchronous file I/O; async
//! callers run it on a blocking thread.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Ndjson,
    Csv,
}

impl DocumentFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        match extension {
            "json" => Ok(DocumentFormat::Json),
            "ndjson" => Ok(DocumentFormat::Ndjson),
            "csv" => Ok(DocumentFormat::Csv),
            other => Err(ValidationError::UnsupportedFileType(if other.is_empty() {
                path.display().to_string()
            } else {
                format!(".{other}")
            })),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Ndjson => "ndjson",
            DocumentFormat::Csv => "csv",
        }
    }

    /// Content type used when the file is uploaded unparsed
    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Json => "application/json",
            DocumentFormat::Ndjson => "application/x-ndjson",
            DocumentFormat::Csv => "text/csv",
        }
    }
}

/// Check a CSV delimiter and turn it into the byte the CSV reader expects
pub fn validate_csv_delimiter(delimiter: &str) -> Result<u8, ValidationError> {
    match delimiter.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ValidationError::InvalidCsvDelimiter(delimiter.to_string())),
    }
}

/// Load every document of a JSON, NDJSON or CSV file
pub fn load_documents_from_file(
    path: &Path,
    csv_delimiter: Option<&str>,
) -> Result<Vec<Value>, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::FileNotFound(path.to_path_buf()));
    }

    let format = DocumentFormat::from_path(path)?;
    let delimiter = match csv_delimiter {
        Some(_) if format != DocumentFormat::Csv => {
            return Err(ValidationError::CsvDelimiterNotAllowed)
        }
        Some(delimiter) => validate_csv_delimiter(delimiter)?,
        None => b',',
    };

    match format {
        DocumentFormat::Json => load_json(path),
        DocumentFormat::Ndjson => load_ndjson(path),
        DocumentFormat::Csv => load_csv(path, delimiter),
    }
}

fn load_json(path: &Path) -> Result<Vec<Value>, ValidationError> {
    let reader = BufReader::new(File::open(path)?);
    match serde_json::from_reader(reader)? {
        Value::Array(documents) => Ok(documents),
        _ => Err(ValidationError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "documents must be in a list".to_string(),
        }),
    }
}

fn load_ndjson(path: &Path) -> Result<Vec<Value>, ValidationError> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str(&line)?);
    }

    Ok(documents)
}

fn load_csv(path: &Path, delimiter: u8) -> Result<Vec<Value>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut documents = Vec::new();

    for record in reader.records() {
        let record = record?;
        let document: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
            .collect();
        documents.push(Value::Object(document));
    }

    Ok(documents)
}

/// List the files of `dir` with the extension of `format`, sorted by file name
pub fn documents_in_directory(
    dir: &Path,
    format: DocumentFormat,
) -> Result<Vec<PathBuf>, ValidationError> {
    let mut paths = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(format.extension())
        {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(ValidationError::NoDocuments {
            dir: dir.to_path_buf(),
            extension: format.extension().to_string(),
        });
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// A file sent to the server as-is, without parsing
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub content_type: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

/// Validate and read a CSV or NDJSON file for a raw upload
pub fn prepare_raw_upload(
    path: &Path,
    primary_key: Option<&str>,
    csv_delimiter: Option<&str>,
) -> Result<RawUpload, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::FileNotFound(path.to_path_buf()));
    }

    let format = match DocumentFormat::from_path(path) {
        Ok(format @ (DocumentFormat::Csv | DocumentFormat::Ndjson)) => format,
        Ok(DocumentFormat::Json) => {
            return Err(ValidationError::UnsupportedFileType(
                "only csv and ndjson files can be sent as raw files".to_string(),
            ))
        }
        Err(e) => return Err(e),
    };

    let mut query = Vec::new();
    if let Some(primary_key) = primary_key {
        query.push(("primaryKey", primary_key.to_string()));
    }
    if let Some(delimiter) = csv_delimiter {
        if format != DocumentFormat::Csv {
            return Err(ValidationError::CsvDelimiterNotAllowed);
        }
        validate_csv_delimiter(delimiter)?;
        query.push(("csvDelimiter", delimiter.to_string()));
    }

    Ok(RawUpload {
        content_type: format.content_type(),
        query,
        body: std::fs::read(path)?,
    })
}
