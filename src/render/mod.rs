//! Turning header overlays and table-of-contents entries into PDFs
//!
//! Two renderers are provided: [`LatexRenderer`] fills the organizer's LaTeX
//! templates and runs an external typesetting program, and
//! [`BuiltinRenderer`] draws the pages directly.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::overlay::{HeaderOverlay, TocEntry};

pub mod builtin;
pub mod latex;

pub use builtin::BuiltinRenderer;
pub use latex::LatexRenderer;

/// Stem of the table-of-contents output files
pub const TOC_STEM: &str = "table-of-contents";

/// Produces the PDFs that get composed into the volume
pub trait Renderer {
    /// Render the overlay for one paper into `out_dir`, returning the PDF path.
    /// The PDF must have exactly `overlay.page_count()` pages.
    fn render_header(&self, overlay: &HeaderOverlay, out_dir: &Path) -> Result<PathBuf>;

    /// Render the table of contents into `out_dir`, returning the PDF path
    fn render_toc(&self, entries: &[TocEntry], out_dir: &Path) -> Result<PathBuf>;
}

/// File stem for a paper's overlay: `headers0` for the first paper
pub fn header_stem(overlay: &HeaderOverlay) -> String {
    format!("headers{}", overlay.paper.saturating_sub(1))
}
