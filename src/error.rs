//! Error types for the proceedings builder

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad inputs or configuration, detected before any PDF is written
    Validation,
    /// Two documents (or two page computations) that must agree do not
    Mismatch,
    /// The typesetting step failed to produce its PDF
    Render,
    /// Filesystem failure
    Io,
    /// PDF or CSV could not be read or written
    Format,
}

/// Main error type for the proceedings builder
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Organizer CSV could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] glob::PatternError),

    /// Required directory is missing
    #[error("The directory {} does not exist.", .0.display())]
    MissingDirectory(PathBuf),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A paper listed in the organizer has no matching PDF
    #[error(
        "The file \"{filename}\" for paper {paper} is not found in {}. \
         Check if actual filenames match those in the organizer.",
        .dir.display()
    )]
    PaperNotFound {
        paper: usize,
        filename: String,
        dir: PathBuf,
    },

    /// A section directory that must hold exactly one PDF holds some other number
    #[error("Expected exactly 1 {section} pdf in {}, found {found}", .dir.display())]
    SectionMultiplicity {
        section: &'static str,
        dir: PathBuf,
        found: usize,
    },

    /// Organizer is missing a required column
    #[error("The column \"{0}\" is not found in the organizer CSV file.")]
    MissingColumn(String),

    /// Organizer row lacks a value for a column
    #[error("Row {row} of the organizer has no value for column \"{column}\"")]
    MalformedRow { row: usize, column: String },

    /// Running header text exceeds the configured limit
    #[error("The header \"{text}\" for paper {paper} is longer than {limit} characters.")]
    HeaderTooLong {
        paper: usize,
        text: String,
        limit: usize,
    },

    /// A paper reports no pages
    #[error("Paper {paper} has a page count of 0")]
    ZeroPageCount { paper: usize },

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Content and overlay page counts differ
    #[error(
        "Page count mismatch for {document}: content has {content} pages, overlay has {overlay} pages"
    )]
    PageCountMismatch {
        document: String,
        content: usize,
        overlay: usize,
    },

    /// The assembled volume does not place a paper where the plan expected it
    #[error(
        "Paper {paper} lands on volume offset {actual} but was planned at offset {expected}"
    )]
    ParityDisagreement {
        paper: usize,
        expected: u32,
        actual: u32,
    },

    /// Blank filler document does not have exactly one page
    #[error("Blank page template {} must have exactly 1 page, found {found}", .path.display())]
    BlankPage { path: PathBuf, found: usize },

    /// External renderer finished without producing the expected PDF
    #[error("Rendering {job} produced no output (expected {})", .expected.display())]
    RenderFailure { job: String, expected: PathBuf },

    /// External renderer exceeded its time budget and was killed
    #[error("Rendering {job} did not finish within {}s", .timeout.as_secs())]
    RenderTimeout { job: String, timeout: Duration },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingDirectory(_)
            | Error::FileNotFound(_)
            | Error::PaperNotFound { .. }
            | Error::SectionMultiplicity { .. }
            | Error::MissingColumn(_)
            | Error::MalformedRow { .. }
            | Error::HeaderTooLong { .. }
            | Error::ZeroPageCount { .. }
            | Error::EmptyPdf(_)
            | Error::InvalidConfig(_)
            | Error::InvalidGlob(_) => ErrorKind::Validation,
            Error::PageCountMismatch { .. }
            | Error::ParityDisagreement { .. }
            | Error::BlankPage { .. } => ErrorKind::Mismatch,
            Error::RenderFailure { .. } | Error::RenderTimeout { .. } => ErrorKind::Render,
            Error::Io(_) => ErrorKind::Io,
            Error::Pdf(_) | Error::Csv(_) | Error::General(_) => ErrorKind::Format,
        }
    }
}
