//! Organizer manifest: the CSV listing every paper of the volume in order
//!
//! The first row names the columns. Column names are matched
//! case-insensitively and may appear in any order:
//!
//! | column                  | meaning                                     |
//! |-------------------------|---------------------------------------------|
//! | `index`                 | organizer's own label for the row           |
//! | `authors`               | full author list (table of contents)        |
//! | `paper title`           | full title (table of contents)              |
//! | `authors in header`     | running-header authors, blank = `authors`   |
//! | `paper title in header` | running-header title, blank = `paper title` |
//! | `paper filename`        | PDF filename in the papers directory        |

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::debug;

use crate::error::{Error, Result};

pub const COL_INDEX: &str = "index";
pub const COL_AUTHORS: &str = "authors";
pub const COL_TITLE: &str = "paper title";
pub const COL_AUTHORS_HEADER: &str = "authors in header";
pub const COL_TITLE_HEADER: &str = "paper title in header";
pub const COL_FILENAME: &str = "paper filename";

const REQUIRED_COLUMNS: [&str; 6] = [
    COL_INDEX,
    COL_AUTHORS,
    COL_TITLE,
    COL_AUTHORS_HEADER,
    COL_TITLE_HEADER,
    COL_FILENAME,
];

/// Delimiters tried in order when reading the organizer
const DELIMITERS: [u8; 5] = [b',', b';', b'\t', b'|', b' '];

/// One organizer row, before the paper's PDF has been opened
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    /// 1-based position in the organizer
    pub index: usize,
    /// Value of the organizer's `index` column
    pub label: String,
    pub authors: String,
    pub title: String,
    /// Running-header authors, already defaulted to `authors` when blank
    pub authors_header: String,
    /// Running-header title, already defaulted to `title` when blank
    pub title_header: String,
    pub filename: String,
}

/// A paper of the volume with its page count
#[derive(Debug, Clone, PartialEq)]
pub struct PaperEntry {
    /// 1-based position in the organizer
    pub index: usize,
    pub authors: String,
    pub title: String,
    pub authors_header: String,
    pub title_header: String,
    pub source_filename: String,
    pub page_count: usize,
}

impl PaperEntry {
    pub fn from_row(row: ManifestRow, page_count: usize) -> Self {
        Self {
            index: row.index,
            authors: row.authors,
            title: row.title,
            authors_header: row.authors_header,
            title_header: row.title_header,
            source_filename: row.filename,
            page_count,
        }
    }
}

/// Read the organizer file at `path`
pub fn load(path: &Path) -> Result<Vec<ManifestRow>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parse organizer text, detecting the delimiter from the header row
pub fn parse(text: &str) -> Result<Vec<ManifestRow>> {
    let text = text.trim_start_matches('\u{feff}');

    // Missing columns under the delimiter that matched the most of them
    let mut closest: Option<Vec<&'static str>> = None;

    for &delimiter in DELIMITERS.iter() {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let Some(columns) = ColumnMap::resolve(&headers) else {
            let missing = missing_columns(&headers);
            if closest.as_ref().map_or(true, |best| missing.len() < best.len()) {
                closest = Some(missing);
            }
            continue;
        };
        debug!("Organizer delimiter: {:?}", delimiter as char);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(columns.row(&record, rows.len() + 1)?);
        }
        return Ok(rows);
    }

    let column = closest
        .and_then(|missing| missing.first().copied())
        .unwrap_or(REQUIRED_COLUMNS[0]);
    Err(Error::MissingColumn(column.to_string()))
}

/// Check every running header against `max_len` characters
pub fn validate_headers(rows: &[ManifestRow], max_len: usize) -> Result<()> {
    for row in rows {
        for text in [&row.authors_header, &row.title_header] {
            if text.chars().count() > max_len {
                return Err(Error::HeaderTooLong {
                    paper: row.index,
                    text: text.clone(),
                    limit: max_len,
                });
            }
        }
    }
    Ok(())
}

/// Positions of the required columns within a record
struct ColumnMap {
    label: usize,
    authors: usize,
    title: usize,
    authors_header: usize,
    title_header: usize,
    filename: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Option<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().to_lowercase() == name)
        };
        Some(Self {
            label: find(COL_INDEX)?,
            authors: find(COL_AUTHORS)?,
            title: find(COL_TITLE)?,
            authors_header: find(COL_AUTHORS_HEADER)?,
            title_header: find(COL_TITLE_HEADER)?,
            filename: find(COL_FILENAME)?,
        })
    }

    fn row(&self, record: &StringRecord, index: usize) -> Result<ManifestRow> {
        let field = |pos: usize, column: &str| {
            record
                .get(pos)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| Error::MalformedRow {
                    row: index,
                    column: column.to_string(),
                })
        };

        let authors = field(self.authors, COL_AUTHORS)?;
        let title = field(self.title, COL_TITLE)?;
        let mut authors_header = field(self.authors_header, COL_AUTHORS_HEADER)?;
        let mut title_header = field(self.title_header, COL_TITLE_HEADER)?;

        if authors_header.is_empty() {
            authors_header = authors.clone();
        }
        if title_header.is_empty() {
            title_header = title.clone();
        }

        Ok(ManifestRow {
            index,
            label: field(self.label, COL_INDEX)?,
            authors,
            title,
            authors_header,
            title_header,
            filename: field(self.filename, COL_FILENAME)?,
        })
    }
}

/// Required columns absent from a header row, in canonical order
fn missing_columns(headers: &StringRecord) -> Vec<&'static str> {
    let present: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !present.iter().any(|p| p == col))
        .collect()
}
