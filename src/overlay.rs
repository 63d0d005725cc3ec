//! What to stamp on each paper and what to list in the table of contents
//!
//! This module only computes values; turning them into PDF pages is the
//! job of a [`Renderer`](crate::render::Renderer).

use crate::manifest::PaperEntry;
use crate::pagination::{PageRange, Placement};
use crate::template::{self, Substitutions};

/// LaTeX for one empty continuation page of a header overlay
const CONTINUATION_PAGE: &str = "\\newpage\n\n\\mbox{}\n";

/// Header overlay for one paper
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderOverlay {
    /// 1-based organizer position of the paper
    pub paper: usize,
    pub start_page_label: String,
    pub page_range_label: String,
    /// Upper-cased running-header authors
    pub authors_text: String,
    /// Upper-cased running-header title
    pub title_text: String,
    /// Empty pages following the first, stamped page
    pub continuation_pages: usize,
}

impl HeaderOverlay {
    /// Total overlay pages; equals the paper's page count
    pub fn page_count(&self) -> usize {
        self.continuation_pages + 1
    }

    /// Values for the header template's tokens
    pub fn substitutions(&self) -> Substitutions {
        let mut subs = Substitutions::new();
        subs.set(template::START_PAGE, self.start_page_label.as_str())
            .set(template::AUTHORS, self.authors_text.as_str())
            .set(template::TITLE, self.title_text.as_str())
            .set(template::PAGE_RANGE, self.page_range_label.as_str())
            .set(
                template::INSERT_PAGES,
                CONTINUATION_PAGE.repeat(self.continuation_pages),
            );
        subs
    }
}

/// Compute the header overlay for `entry` occupying `range`
pub fn generate(entry: &PaperEntry, range: &PageRange) -> HeaderOverlay {
    HeaderOverlay {
        paper: entry.index,
        start_page_label: range.start_page.to_string(),
        page_range_label: range.label(),
        authors_text: entry.authors_header.to_uppercase(),
        title_text: entry.title_header.to_uppercase(),
        continuation_pages: entry.page_count.saturating_sub(1),
    }
}

/// One line of the table of contents
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub authors: String,
    pub title: String,
    pub start_page: u32,
}

impl TocEntry {
    /// The entry as a `\TocEntry{authors}{title}{page}` LaTeX macro call
    pub fn to_latex(&self) -> String {
        format!(
            "\\TocEntry{{{}}}{{{}}}{{{}}}\n\n",
            self.authors, self.title, self.start_page
        )
    }
}

/// Table of contents entries, in volume order, using the full author and
/// title strings
pub fn toc_entries(entries: &[PaperEntry], placements: &[Placement]) -> Vec<TocEntry> {
    entries
        .iter()
        .zip(placements)
        .map(|(entry, placement)| TocEntry {
            authors: entry.authors.clone(),
            title: entry.title.clone(),
            start_page: placement.range.start_page,
        })
        .collect()
}

/// Values for the table-of-contents template
pub fn toc_substitutions(entries: &[TocEntry]) -> Substitutions {
    let body: String = entries.iter().map(TocEntry::to_latex).collect();
    let mut subs = Substitutions::new();
    subs.set(template::INSERT_TOC_ENTRIES, body);
    subs
}
