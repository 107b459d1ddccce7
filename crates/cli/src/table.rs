//! CSV input and output for the mapping commands.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use gmde_core::{Code, StateDate};
use gmde_recon::{Observation, StampedCode};

use crate::CliError;

/// A headed CSV file held in memory. Rows are padded to the header width.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path, delimiter: char) -> Result<Self, CliError> {
        let file = File::open(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_reader(file, delimiter)
    }

    pub fn from_reader(reader: impl io::Read, delimiter: char) -> Result<Self, CliError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter_byte(delimiter)?)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| CliError::parse(format!("cannot read CSV header: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| CliError::parse(format!("row {}: {e}", i + 2)))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len().max(row.len()), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Index of column `name`.
    pub fn column(&self, name: &str) -> Result<usize, CliError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                CliError::parse(format!("column '{name}' not found"))
                    .with_hint(format!("available columns: {}", self.headers.join(", ")))
            })
    }

    /// One observation per row. Every code cell must be a number.
    pub fn observations(
        &self,
        code_column: &str,
        name_column: Option<&str>,
    ) -> Result<Vec<Observation>, CliError> {
        let code_idx = self.column(code_column)?;
        let name_idx = name_column.map(|n| self.column(n)).transpose()?;

        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let code = parse_code(&row[code_idx]).ok_or_else(|| {
                    CliError::parse(format!(
                        "row {}: '{}' is not a BFS code",
                        i + 2,
                        row[code_idx]
                    ))
                })?;
                let name = name_idx
                    .map(|n| row[n].trim().to_string())
                    .filter(|n| !n.is_empty());
                Ok(Observation { code, name })
            })
            .collect()
    }

    /// One stamped code per row. Empty cells become `None`; anything else
    /// must parse.
    pub fn stamped_codes(
        &self,
        code_column: &str,
        as_of_column: &str,
    ) -> Result<Vec<StampedCode>, CliError> {
        let code_idx = self.column(code_column)?;
        let as_of_idx = self.column(as_of_column)?;

        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let code_cell = row[code_idx].trim();
                let code = if code_cell.is_empty() {
                    None
                } else {
                    Some(parse_code(code_cell).ok_or_else(|| {
                        CliError::parse(format!("row {}: '{code_cell}' is not a BFS code", i + 2))
                    })?)
                };

                let date_cell = row[as_of_idx].trim();
                let as_of = if date_cell.is_empty() {
                    None
                } else {
                    Some(date_cell.parse::<StateDate>().map_err(|e| {
                        CliError::parse(format!("row {}: {e}", i + 2))
                    })?)
                };

                Ok(StampedCode { code, as_of })
            })
            .collect()
    }
}

/// The csv crate splits on single bytes, so only ASCII delimiters work.
pub fn delimiter_byte(delimiter: char) -> Result<u8, CliError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            CliError::args(format!("delimiter '{delimiter}' is not a single ASCII character"))
                .with_hint("use e.g. --delimiter ';' or --delimiter '|'")
        })
}

/// Accepts `261` as well as `261.0`, which spreadsheet exports produce.
pub fn parse_code(cell: &str) -> Option<Code> {
    let cell = cell.trim();
    cell.parse::<Code>()
        .ok()
        .or_else(|| cell.strip_suffix(".0").and_then(|c| c.parse().ok()))
}

/// Writes to `output`, or stdout when `None`.
pub fn write_csv(
    output: Option<&PathBuf>,
    headers: &[String],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<(), CliError> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path)
                .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let mut wtr = csv::Writer::from_writer(sink);
    wtr.write_record(headers)
        .map_err(|e| CliError::io(e.to_string()))?;
    for row in rows {
        wtr.write_record(&row)
            .map_err(|e| CliError::io(e.to_string()))?;
    }
    wtr.flush().map_err(|e| CliError::io(e.to_string()))
}
