//! Renderer that draws overlay and table-of-contents pages directly
//!
//! Pages are US Letter and use the standard Type1 Times fonts with
//! WinAnsiEncoding, so nothing needs to be embedded.

use std::path::{Path, PathBuf};

use log::debug;
use lopdf::{Dictionary, Document, Object, Stream};

use super::{header_stem, Renderer, TOC_STEM};
use crate::error::Result;
use crate::layout::PageDimensions;
use crate::overlay::{HeaderOverlay, TocEntry};
use crate::pdf::document::fmt_num;
use crate::pdf::PageDocument;

/// Regular text font resource name
const ROMAN: &str = "F1";
/// Italic text font resource name
const ITALIC: &str = "F2";

/// Draws pages with lopdf, no external programs involved
#[derive(Debug, Clone)]
pub struct BuiltinRenderer {
    page: PageDimensions,
    /// Running header font size in points
    pub header_font_size: f64,
    /// Table of contents entry font size in points
    pub toc_font_size: f64,
}

impl Default for BuiltinRenderer {
    fn default() -> Self {
        Self {
            page: PageDimensions::letter(),
            header_font_size: 9.0,
            toc_font_size: 11.0,
        }
    }
}

impl BuiltinRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn width(&self) -> f64 {
        self.page.width.pt()
    }

    fn height(&self) -> f64 {
        self.page.height.pt()
    }

    /// Content of the first overlay page of a paper
    fn header_content(&self, overlay: &HeaderOverlay) -> Vec<u8> {
        let size = self.header_font_size;
        let mut content = Vec::new();
        content.extend_from_slice(b"0 g\n");

        // Running header, centred in the top margin
        let top = self.height() - 54.0;
        for (i, line) in [&overlay.authors_text, &overlay.title_text].iter().enumerate() {
            let x = (self.width() - estimate_text_width(line, size)) / 2.0;
            let y = top - i as f64 * size * 1.4;
            show_text(&mut content, ROMAN, size, x, y, line);
        }

        // Footer: page range on the right, start page in the centre
        let footer_y = 90.0;
        let range = format!("pp. {}", overlay.page_range_label);
        let range_x = self.width() - 90.0 - estimate_text_width(&range, size);
        show_text(&mut content, ROMAN, size, range_x, footer_y, &range);

        let start = &overlay.start_page_label;
        let start_x = (self.width() - estimate_text_width(start, size)) / 2.0;
        show_text(&mut content, ROMAN, size, start_x, footer_y, start);

        content
    }

    /// Content of every table-of-contents page, at least one
    fn toc_contents(&self, entries: &[TocEntry]) -> Vec<Vec<u8>> {
        let size = self.toc_font_size;
        let line_height = size * 1.3;
        let left = 108.0;
        let right = self.width() - 108.0;
        // Room reserved for the page number column
        let title_width = right - left - 36.0;
        let top = self.height() - 108.0;
        let bottom = 108.0;

        let mut pages = Vec::new();
        let mut content = Vec::new();
        content.extend_from_slice(b"0 g\n");

        let heading = "CONTENTS";
        let heading_size = size + 3.0;
        let heading_x = (self.width() - estimate_text_width(heading, heading_size)) / 2.0;
        show_text(&mut content, ROMAN, heading_size, heading_x, top, heading);
        let mut y = top - heading_size * 3.0;

        for entry in entries {
            let title_lines = wrap_words(&entry.title, size, title_width);
            let author_lines = wrap_words(&entry.authors, size - 1.0, title_width);
            let needed = (title_lines.len() + author_lines.len()) as f64 * line_height;

            if y - needed < bottom {
                pages.push(std::mem::take(&mut content));
                content.extend_from_slice(b"0 g\n");
                y = top;
            }

            let page = entry.start_page.to_string();
            let page_x = right - estimate_text_width(&page, size);
            show_text(&mut content, ROMAN, size, page_x, y, &page);

            for line in &title_lines {
                show_text(&mut content, ROMAN, size, left, y, line);
                y -= line_height;
            }
            for line in &author_lines {
                show_text(&mut content, ITALIC, size - 1.0, left + 12.0, y, line);
                y -= line_height;
            }
            y -= line_height * 0.6;
        }

        pages.push(content);
        pages
    }

    /// Write pages with the given contents to `<out_dir>/<stem>.pdf`
    fn write_pages(&self, contents: Vec<Vec<u8>>, stem: &str, out_dir: &Path) -> Result<PathBuf> {
        let path = out_dir.join(format!("{stem}.pdf"));
        let page_count = contents.len();
        let doc = build_document(contents, self.width(), self.height());

        let mut document = PageDocument::from_document(doc, stem);
        document.save(&path)?;
        debug!("Wrote {} ({} pages)", path.display(), page_count);
        Ok(path)
    }
}

impl Renderer for BuiltinRenderer {
    fn render_header(&self, overlay: &HeaderOverlay, out_dir: &Path) -> Result<PathBuf> {
        let mut contents = Vec::with_capacity(overlay.page_count());
        contents.push(self.header_content(overlay));
        contents.extend((0..overlay.continuation_pages).map(|_| Vec::new()));
        self.write_pages(contents, &header_stem(overlay), out_dir)
    }

    fn render_toc(&self, entries: &[TocEntry], out_dir: &Path) -> Result<PathBuf> {
        self.write_pages(self.toc_contents(entries), TOC_STEM, out_dir)
    }
}

/// A document with one page per content stream. Fonts and MediaBox are
/// inherited from the Pages node.
fn build_document(contents: Vec<Vec<u8>>, width: f64, height: f64) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    fonts.set(ROMAN, Object::Reference(doc.add_object(type1_font("Times-Roman"))));
    fonts.set(ITALIC, Object::Reference(doc.add_object(type1_font("Times-Italic"))));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let count = contents.len();
    let kids: Vec<Object> = contents
        .into_iter()
        .map(|content| {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            Object::Reference(doc.add_object(page))
        })
        .collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(count as i64));
    pages.set("Kids", Object::Array(kids));
    pages.set("Resources", Object::Dictionary(resources));
    pages.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width as f32),
            Object::Real(height as f32),
        ]),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}

/// One of the 14 standard PDF fonts
fn type1_font(base_font: &str) -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

/// Append a single line of text at (x, y)
fn show_text(content: &mut Vec<u8>, font: &str, size: f64, x: f64, y: f64, text: &str) {
    content.extend_from_slice(b"BT\n");
    content.extend_from_slice(format!("/{} {} Tf\n", font, fmt_num(size)).as_bytes());
    content.extend_from_slice(format!("1 0 0 1 {} {} Tm\n", fmt_num(x), fmt_num(y)).as_bytes());
    content.push(b'(');
    content.extend(escape_pdf_bytes(&encode_win_ansi(text)));
    content.extend_from_slice(b") Tj\nET\n");
}

/// Encode text as WinAnsi bytes; characters outside the encoding become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7e | 0xa0..=0xff => c as u8,
            _ => win_ansi_special(c).unwrap_or(b'?'),
        })
        .collect()
}

/// WinAnsi codes in 0x80..0x9f
fn win_ansi_special(c: char) -> Option<u8> {
    let code = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(code)
}

/// Escape special characters in PDF literal strings
fn escape_pdf_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        if matches!(b, b'\\' | b'(' | b')') {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

/// Estimate text width for Times; average glyph width is about 0.48 em
fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.48
}

/// Greedy word wrap against the estimated text width. A single word wider
/// than `max_width` gets a line of its own.
fn wrap_words(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && estimate_text_width(&candidate, font_size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
