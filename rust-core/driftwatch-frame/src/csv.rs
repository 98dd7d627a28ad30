// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! CSV data source.
//!
//! Reads a delimited text file into a [`Frame`] typed by a [`Schema`]. Only
//! schema columns are materialised; anything else in the file (such as a
//! leading index column) is ignored. Feature columns are required, while the
//! timestamp, prediction and target columns are loaded when present.
//!
//! Fields may be wrapped in double quotes, which lets them hold the delimiter;
//! a doubled quote inside a quoted field is a literal quote. Records end at
//! the line break, so quoted fields cannot span lines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::{Column, ColumnKind, Frame, FrameError, Schema};

/// Cell spellings read as a missing value
const MISSING_TOKENS: &[&str] = &["", "nan", "na", "n/a", "null", "none"];

/// CSV file data source
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    /// Comma-delimited source at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: ',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read and parse the whole file
    pub async fn load(&self, schema: &Schema) -> Result<Frame, FrameError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let frame = parse(&content, self.delimiter, schema)?;
        debug!(
            path = %self.path.display(),
            rows = frame.len(),
            "loaded csv"
        );
        Ok(frame)
    }
}

/// Parse CSV text into a frame
pub fn parse(content: &str, delimiter: char, schema: &Schema) -> Result<Frame, FrameError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines
        .next()
        .ok_or_else(|| FrameError::EmptyInput("csv has no header row".to_string()))?;
    let header = split_record(header, delimiter).map_err(|message| FrameError::Parse {
        line: header_line,
        column: String::new(),
        message,
    })?;

    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (i, name) in header.iter().enumerate() {
        positions.entry(name.as_str()).or_insert(i);
    }

    // (name, kind, position) for every schema column present in the file
    let mut wanted: Vec<(&str, ColumnKind, usize)> = Vec::new();
    for name in schema.features() {
        let position = *positions
            .get(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))?;
        let kind = schema.kind_of(name).unwrap_or(ColumnKind::Numeric);
        wanted.push((name, kind, position));
    }
    for name in [schema.prediction.as_str(), schema.target.as_str()] {
        if let Some(&position) = positions.get(name) {
            wanted.push((name, ColumnKind::Numeric, position));
        }
    }
    let timestamp_position = positions.get(schema.timestamp.as_str()).copied();

    let mut numeric: HashMap<&str, Vec<Option<f64>>> = HashMap::new();
    let mut categorical: HashMap<&str, Vec<Option<String>>> = HashMap::new();
    let mut timestamps = Vec::new();
    let mut rows = 0;

    for (line_no, line) in lines {
        let cells = split_record(line, delimiter).map_err(|message| FrameError::Parse {
            line: line_no,
            column: String::new(),
            message,
        })?;
        if cells.len() != header.len() {
            return Err(FrameError::Parse {
                line: line_no,
                column: String::new(),
                message: format!("expected {} cells, found {}", header.len(), cells.len()),
            });
        }

        for &(name, kind, position) in &wanted {
            let cell = cells[position].as_str();
            match kind {
                ColumnKind::Numeric => {
                    let value = parse_numeric(cell).map_err(|message| FrameError::Parse {
                        line: line_no,
                        column: name.to_string(),
                        message,
                    })?;
                    numeric.entry(name).or_default().push(value);
                }
                ColumnKind::Categorical => {
                    let value = (!is_missing(cell)).then(|| cell.to_string());
                    categorical.entry(name).or_default().push(value);
                }
            }
        }

        if let Some(position) = timestamp_position {
            let time = parse_timestamp(&cells[position]).ok_or_else(|| FrameError::Parse {
                line: line_no,
                column: schema.timestamp.clone(),
                message: format!("unrecognised timestamp '{}'", cells[position]),
            })?;
            timestamps.push(time);
        }

        rows += 1;
    }

    let mut frame = match timestamp_position {
        Some(_) => Frame::with_timestamps(timestamps),
        None => Frame::new(rows),
    };
    for (name, kind, _) in wanted {
        let column = match kind {
            ColumnKind::Numeric => Column::Numeric(numeric.remove(name).unwrap_or_default()),
            ColumnKind::Categorical => {
                Column::Categorical(categorical.remove(name).unwrap_or_default())
            }
        };
        frame.insert(name, column)?;
    }
    Ok(frame)
}

/// Parse a timestamp cell as UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS+HH:MM`, naive date-times (taken
/// as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(cell) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(cell, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Split one record into trimmed cells, honouring double-quoted fields
fn split_record(line: &str, delimiter: char) -> Result<Vec<String>, String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => quoted = false,
                _ => cell.push(c),
            }
        } else if c == '"' && cell.trim().is_empty() {
            cell.clear();
            quoted = true;
        } else if c == delimiter {
            cells.push(cell.trim().to_string());
            cell.clear();
        } else {
            cell.push(c);
        }
    }

    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    cells.push(cell.trim().to_string());
    Ok(cells)
}

fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t))
}

fn parse_numeric(cell: &str) -> Result<Option<f64>, String> {
    if is_missing(cell) {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|e| format!("'{}' is not a number: {}", cell, e))
}
