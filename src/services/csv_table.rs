//! Plain CSV table helpers
//!
//! Input files come from different tools and may carry extra or missing
//! columns, so they are read as a header plus string rows and columns are
//! looked up by name.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Header row plus string records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file; short records are padded with empty cells
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!("File not found: {}", path.display())));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::Io(format!("Failed to read headers from {}: {}", path.display(), e)))?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let width = headers.len();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result
                .map_err(|e| Error::Io(format!("CSV parse error in {}: {}", path.display(), e)))?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Fail with the names of any missing columns
    pub fn require_columns(&self, names: &[&str], path: &Path) -> Result<()> {
        let missing: Vec<&str> = names.iter().copied().filter(|n| !self.has_column(n)).collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::InvalidInput(format!(
            "CSV {} must contain {} column(s); missing: {}",
            path.display(),
            names.iter().map(|n| format!("'{}'", n)).collect::<Vec<_>>().join(", "),
            missing.join(", ")
        )))
    }

    /// Keep only `columns`, in the given order
    pub fn project(&self, columns: &[String]) -> Self {
        let indices: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            headers: columns.to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write header and rows, creating the parent directory if needed
    pub fn write(&self, path: &Path) -> Result<()> {
        write_locked(path, |wtr| {
            wtr.write_record(&self.headers)?;
            for row in &self.rows {
                wtr.write_record(row)?;
            }
            Ok(())
        })
    }
}

/// Write serializable records under a fixed header
pub fn write_records<T: Serialize>(path: &Path, headers: &[&str], records: &[T]) -> Result<()> {
    write_locked(path, |wtr| {
        wtr.write_record(headers)?;
        for record in records {
            wtr.serialize(record)?;
        }
        Ok(())
    })
}

/// Open `path` truncated under an exclusive lock and hand a headerless writer to `f`
fn write_locked<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> std::result::Result<(), csv::Error>,
{
    use fs2::FileExt;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
    }

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::Io(format!("Failed to open {} for writing: {}", path.display(), e)))?;

    file.lock_exclusive()
        .map_err(|e| Error::Io(format!("Failed to acquire lock on {}: {}", path.display(), e)))?;

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    f(&mut wtr).map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))?;

    wtr.flush()
        .map_err(|e| Error::Io(format!("Failed to flush {}: {}", path.display(), e)))?;

    // Lock is released when file goes out of scope
    Ok(())
}
