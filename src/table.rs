// Row-oriented tables read from delimited text or spreadsheets.
//
// Both file kinds end up as a header `StringRecord` plus one `StringRecord`
// per data row, so the typed rows in `types.rs` deserialize the same way
// regardless of where they came from.
use crate::error::LoadError;
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, StringRecord};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A typed row that can be decoded from a [`RawTable`].
pub trait SourceRow: DeserializeOwned {
    /// Headers that must be present for the table to be usable.
    const REQUIRED: &'static [&'static str];
    /// Every header the row knows about, in canonical spelling.
    const KNOWN: &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    Trimmed,
    Lowercase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Delimited(u8),
    Spreadsheet,
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "csv" | "txt" => Some(SourceKind::Delimited(b',')),
        "tsv" => Some(SourceKind::Delimited(b'\t')),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceKind::Spreadsheet),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
    /// Rows the reader could not decode at all (bad UTF-8 and the like).
    pub unreadable: usize,
}

impl RawTable {
    /// Read the first sheet (or the whole delimited file) at `path`.
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let table = match source_kind(path) {
            Some(SourceKind::Delimited(delimiter)) => read_delimited(path, delimiter)?,
            Some(SourceKind::Spreadsheet) => read_spreadsheet(path)?,
            None => {
                return Err(LoadError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        if table.headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::EmptySource {
                path: path.to_path_buf(),
            });
        }
        debug!(
            path = %path.display(),
            columns = table.headers.len(),
            rows = table.records.len(),
            "read raw table"
        );
        Ok(table)
    }

    pub fn normalize_headers(&mut self, style: HeaderStyle) {
        self.headers = self
            .headers
            .iter()
            .map(|h| {
                let h = h.trim_start_matches('\u{feff}').trim();
                match style {
                    HeaderStyle::Trimmed => h.to_string(),
                    HeaderStyle::Lowercase => h.to_lowercase(),
                }
            })
            .collect();
    }

    /// Rewrite headers that match a known name case-insensitively to the
    /// known spelling, so `"campaign name"` still lands on `"Campaign Name"`.
    pub fn align_headers(&mut self, known: &[&str]) {
        self.headers = self
            .headers
            .iter()
            .map(|h| {
                known
                    .iter()
                    .find(|k| k.eq_ignore_ascii_case(h))
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| h.to_string())
            })
            .collect();
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn columns(&self) -> Vec<String> {
        self.headers.iter().map(str::to_string).collect()
    }

    pub fn require(&self, columns: &[&str]) -> Result<(), LoadError> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(LoadError::MissingColumn {
                path: self.path.clone(),
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Decode every record into `R`. Records that fail to decode are
    /// skipped; the second element counts them.
    pub fn deserialize<R: SourceRow>(&self) -> (Vec<R>, usize) {
        let mut rows = Vec::with_capacity(self.records.len());
        let mut skipped = self.unreadable;
        for record in &self.records {
            match record.deserialize::<R>(Some(&self.headers)) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    debug!(path = %self.path.display(), error = %e, "skipping undecodable row");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "rows skipped while decoding");
        }
        (rows, skipped)
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let mut records = Vec::new();
    let mut unreadable = 0usize;
    for result in rdr.records() {
        match result {
            Ok(r) if r.iter().all(|f| f.trim().is_empty()) => {}
            Ok(r) => records.push(r),
            Err(_) => unreadable += 1,
        }
    }
    Ok(RawTable {
        path: path.to_path_buf(),
        headers,
        records,
        unreadable,
    })
}

fn read_spreadsheet(path: &Path) -> Result<RawTable, LoadError> {
    let sheet_err = |source| LoadError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(sheet_err)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(sheet_err)?,
        None => {
            return Err(LoadError::EmptySource {
                path: path.to_path_buf(),
            })
        }
    };
    let mut rows = range.rows();
    let headers: StringRecord = match rows.next() {
        Some(cells) => cells.iter().map(cell_to_text).collect(),
        None => {
            return Err(LoadError::EmptySource {
                path: path.to_path_buf(),
            })
        }
    };
    let records = rows
        .map(|cells| cells.iter().map(cell_to_text).collect::<StringRecord>())
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .collect();
    Ok(RawTable {
        path: path.to_path_buf(),
        headers,
        records,
        unreadable: 0,
    })
}

/// Render a spreadsheet cell the way a CSV export would have written it.
fn cell_to_text(v: &Data) -> String {
    match v {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Int(i) => i.to_string(),
        // Excel stores counts as floats; keep `12` rather than `12.0`.
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        Data::Float(f) => f.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        other => other.to_string().trim().to_string(),
    }
}

/// A decoded source: its typed rows plus which columns it carried.
#[derive(Debug, Clone)]
pub struct Table<R> {
    pub source: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Same source and columns, new rows.
    pub fn with_rows<T>(&self, rows: Vec<T>) -> Table<T> {
        Table {
            source: self.source.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
