//! Owned PDF documents and page-tree helpers shared by the compositor,
//! the assembler and the trim transform

use std::path::Path;

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::layout::Rect;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A PDF held in memory together with a label used in diagnostics
///
/// Consumers take documents by value: once a document is handed to the
/// compositor or assembler it is no longer reachable by the caller.
#[derive(Debug, Clone)]
pub struct PageDocument {
    doc: Document,
    label: String,
}

impl PageDocument {
    /// Load a PDF from disk
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let document = Self { doc, label };
        if document.page_count() == 0 {
            return Err(Error::EmptyPdf(path.to_path_buf()));
        }

        if let Ok(declared) = declared_page_count(&document.doc) {
            if declared != document.page_count() {
                debug!(
                    "{}: page tree declares {} pages, {} reachable",
                    document.label,
                    declared,
                    document.page_count()
                );
            }
        }

        Ok(document)
    }

    /// Wrap an in-memory document
    pub fn from_document(doc: Document, label: impl Into<String>) -> Self {
        Self {
            doc,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object IDs in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    pub fn inner(&self) -> &Document {
        &self.doc
    }

    pub fn into_inner(self) -> Document {
        self.doc
    }

    /// Compress streams and write the document to `path`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.doc.compress();
        self.doc.save(path)?;
        Ok(())
    }
}

/// Count the pages of the PDF at `path`
pub fn count_pages(path: &Path) -> Result<usize> {
    Ok(PageDocument::open(path)?.page_count())
}

/// Read the Count field from the root Pages dictionary
fn declared_page_count(doc: &Document) -> Result<usize> {
    let pages_id = doc.catalog()?.get(b"Pages")?.as_reference()?;
    let count = doc.get_dictionary(pages_id)?.get(b"Count")?.as_i64()?;
    Ok(count.max(0) as usize)
}

/// Look up `key` on a page, walking up the page tree if it is inherited
pub(crate) fn inherited_attribute(
    doc: &Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut node_id = page_id;
    // Bounded walk so a malformed Parent cycle cannot loop forever
    for _ in 0..64 {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        node_id = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Follow a reference to the dictionary it points at
pub(crate) fn resolve_dictionary(doc: &Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        _ => None,
    }
}

/// The effective Resources dictionary of a page, as a direct dictionary
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited_attribute(doc, page_id, b"Resources")
        .and_then(|res| resolve_dictionary(doc, &res))
        .unwrap_or_else(Dictionary::new)
}

/// The effective MediaBox of a page
pub(crate) fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<Rect> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox").ok_or_else(|| {
        Error::General(format!("Page {:?} has no MediaBox", page_id))
    })?;
    let media_box = match media_box {
        Object::Reference(id) => doc.get_object(id)?.clone(),
        other => other,
    };
    let values = media_box
        .as_array()?
        .iter()
        .map(|v| v.as_float().map(f64::from))
        .collect::<std::result::Result<Vec<f64>, _>>()?;

    match values.as_slice() {
        [a, b, c, d] => Ok(Rect::new(a.min(*c), b.min(*d), a.max(*c), b.max(*d))),
        _ => Err(Error::General(format!(
            "Page {:?} has a malformed MediaBox",
            page_id
        ))),
    }
}

/// Copy inherited page attributes onto every page so pages keep them when
/// re-parented into another page tree
pub(crate) fn materialize_inherited_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| {
                doc.get_dictionary(page_id)
                    .map(|page| page.get(key).is_err())
                    .unwrap_or(false)
            })
            .filter_map(|key| inherited_attribute(doc, page_id, key).map(|v| (*key, v)))
            .collect();

        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
}

/// Content stream references of a page, in drawing order
pub(crate) fn page_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            // A reference to an array of streams
            Object::Array(arr) => arr.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(arr)) => arr.clone(),
        Ok(other) => vec![other.clone()],
        Err(_) => Vec::new(),
    };
    Ok(contents)
}

/// Bracket a page's drawing with `before` and `after` content streams
pub(crate) fn wrap_page_contents(
    doc: &mut Document,
    page_id: ObjectId,
    before: Vec<u8>,
    after: Vec<u8>,
) -> Result<()> {
    let existing = page_contents(doc, page_id)?;

    let before_id = doc.add_object(Stream::new(Dictionary::new(), before));
    let after_id = doc.add_object(Stream::new(Dictionary::new(), after));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(before_id));
    contents.extend(existing);
    contents.push(Object::Reference(after_id));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Append one content stream to a page's Contents
pub(crate) fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content_id: ObjectId,
) -> Result<()> {
    let mut contents = page_contents(doc, page_id)?;
    contents.push(Object::Reference(content_id));
    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Format a number for a content stream without float noise
pub(crate) fn fmt_num(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

pub(crate) fn rect_object(rect: &Rect) -> Object {
    Object::Array(vec![
        Object::Real(rect.llx as f32),
        Object::Real(rect.lly as f32),
        Object::Real(rect.urx as f32),
        Object::Real(rect.ury as f32),
    ])
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for small in-memory PDFs used across the unit tests

    use lopdf::{Dictionary, Document, Object, Stream};

    /// A document with `pages` pages of `width` × `height` points. Each page
    /// draws its 1-based number with font /F1; MediaBox and Resources live on
    /// the Pages node so they are inherited.
    pub fn make_document(pages: usize, width: i64, height: i64) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        let font_id = doc.add_object(font);

        let mut kids = Vec::new();
        for n in 1..=pages {
            let content = format!("BT /F1 12 Tf 72 72 Td (page {}) Tj ET", n);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(pages as i64));
        pages_dict.set("Kids", Object::Array(kids));
        pages_dict.set("Resources", Object::Dictionary(resources));
        pages_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(height),
            ]),
        );
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc
    }

    pub fn letter(pages: usize) -> super::PageDocument {
        super::PageDocument::from_document(make_document(pages, 612, 792), format!("{pages}p"))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::make_document;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_open_and_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("three.pdf");
        let mut doc = PageDocument::from_document(make_document(3, 612, 792), "three");
        doc.save(&path).unwrap();

        assert_eq!(count_pages(&path).unwrap(), 3);
        let reopened = PageDocument::open(&path).unwrap();
        assert_eq!(reopened.label(), "three.pdf");
        assert_eq!(declared_page_count(reopened.inner()).unwrap(), 3);
    }

    #[test]
    fn test_inherited_media_box() {
        let doc = make_document(2, 612, 792);
        let page_id = *doc.get_pages().values().next().unwrap();
        let rect = page_media_box(&doc, page_id).unwrap();
        assert_eq!(rect, Rect::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn test_materialize_inherited_attributes() {
        let mut doc = make_document(2, 400, 500);
        materialize_inherited_attributes(&mut doc);

        for page_id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(page_id).unwrap();
            assert!(page.get(b"MediaBox").is_ok());
            assert!(page.get(b"Resources").is_ok());
            assert!(page.get(b"Rotate").is_err());
        }
    }

    #[test]
    fn test_wrap_page_contents() {
        let mut doc = make_document(1, 612, 792);
        let page_id = *doc.get_pages().values().next().unwrap();
        wrap_page_contents(&mut doc, page_id, b"q\n".to_vec(), b"Q\n".to_vec()).unwrap();

        let contents = page_contents(&doc, page_id).unwrap();
        assert_eq!(contents.len(), 3);
        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.trim_start().starts_with('q'));
        assert!(text.trim_end().ends_with('Q'));
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(1.0), "1");
        assert_eq!(fmt_num(0.95), "0.95");
        assert_eq!(fmt_num(74.70000001), "74.7");
    }
}
