//! Page-number planning for the papers of a volume
//!
//! Printed volumes start every paper on a right-hand page, which carries an
//! odd page number. Given the page count of each paper and the printed number
//! of the first page, [`plan`] assigns each paper its page range and decides
//! whether a blank page has to follow it.

use crate::error::{Error, Result};

/// Inclusive range of printed page numbers occupied by one paper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start_page: u32,
    pub end_page: u32,
}

impl PageRange {
    /// Number of pages in the range
    pub fn page_count(&self) -> u32 {
        self.end_page - self.start_page + 1
    }

    /// Label used in headers and logs, e.g. `5-8`
    pub fn label(&self) -> String {
        format!("{}-{}", self.start_page, self.end_page)
    }
}

/// Where one paper lands in the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub range: PageRange,
    /// A blank page is printed right after this paper
    pub blank_after: bool,
}

/// Whether a filler page is needed so that the document starting at
/// `next_page` (1-based) does not begin on an even, left-hand page.
///
/// Shared by the planner (printed numbers) and the volume assembler
/// (physical positions) so both enforce the same rule.
pub fn needs_filler(next_page: u32) -> bool {
    next_page % 2 == 0
}

/// Assign page ranges to papers with the given page counts.
///
/// The first paper starts at `start_page`. Each following paper starts on
/// the next odd page; when the previous paper ends on an odd page a blank
/// page is inserted after it.
///
/// # Errors
///
/// Returns [`Error::ZeroPageCount`] (1-based paper position) for a paper
/// with no pages, and [`Error::InvalidConfig`] when `start_page` is 0 or the
/// page numbers would run past `u32::MAX`.
pub fn plan(page_counts: &[usize], start_page: u32) -> Result<Vec<Placement>> {
    if start_page == 0 {
        return Err(Error::InvalidConfig(
            "starting page number must be at least 1".to_string(),
        ));
    }

    let mut placements = Vec::with_capacity(page_counts.len());
    let mut cursor = start_page;

    for (i, &count) in page_counts.iter().enumerate() {
        if count == 0 {
            return Err(Error::ZeroPageCount { paper: i + 1 });
        }

        let overflow = || {
            Error::InvalidConfig(format!(
                "paper {} runs past the last representable page number",
                i + 1
            ))
        };
        let start = cursor;
        let end = u32::try_from(count - 1)
            .ok()
            .and_then(|extra| start.checked_add(extra))
            .ok_or_else(overflow)?;
        let blank_after = needs_filler(end.wrapping_add(1));
        let next = end
            .checked_add(if blank_after { 2 } else { 1 })
            .ok_or_else(overflow)?;

        placements.push(Placement {
            range: PageRange {
                start_page: start,
                end_page: end,
            },
            blank_after,
        });
        cursor = next;
    }

    Ok(placements)
}

/// Number of blank pages the plan inserts
pub fn blank_pages(placements: &[Placement]) -> usize {
    placements.iter().filter(|p| p.blank_after).count()
}

/// Last printed page number occupied by a paper, if any
pub fn last_page(placements: &[Placement]) -> Option<u32> {
    placements.last().map(|p| p.range.end_page)
}
