//! Page compositor: stamps header overlay pages onto paper pages

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::document::{
    append_page_content, page_media_box, page_resources, rect_object, wrap_page_contents,
    PageDocument,
};
use crate::error::{Error, Result};

/// Resource name prefix for imported overlay pages
const OVERLAY_NAME: &str = "ProcOverlay";

/// Overlay each page of `overlay` onto the page at the same position in
/// `content`.
///
/// Each overlay page becomes a Form XObject painted after the content page's
/// own drawing, in the same coordinate space and without rescaling. The
/// content page's streams are wrapped in `q`/`Q` first so that any
/// transformation they leave behind does not shift the overlay.
///
/// # Errors
///
/// Returns [`Error::PageCountMismatch`] when the two documents do not have
/// the same number of pages.
///
/// # Example
///
/// ```no_run
/// use proceedings::pdf::{compose, PageDocument};
/// use std::path::Path;
///
/// let paper = PageDocument::open(Path::new("paper.pdf")).unwrap();
/// let headers = PageDocument::open(Path::new("headers0.pdf")).unwrap();
/// let mut stamped = compose(paper, headers).unwrap();
/// stamped.save(Path::new("paper-with-headers.pdf")).unwrap();
/// ```
pub fn compose(content: PageDocument, overlay: PageDocument) -> Result<PageDocument> {
    let content_pages = content.page_count();
    let overlay_pages = overlay.page_count();

    if content_pages != overlay_pages {
        return Err(Error::PageCountMismatch {
            document: content.label().to_string(),
            content: content_pages,
            overlay: overlay_pages,
        });
    }

    let label = content.label().to_string();
    let content_ids = content.page_ids();
    let mut doc = content.into_inner();

    // Move every overlay object into the content document under fresh IDs
    let mut overlay_doc = overlay.into_inner();
    overlay_doc.renumber_objects_with(doc.max_id + 1);
    let overlay_ids: Vec<ObjectId> = overlay_doc.get_pages().into_values().collect();
    doc.max_id = doc.max_id.max(overlay_doc.max_id);
    doc.objects.extend(overlay_doc.objects);

    for (content_id, overlay_id) in content_ids.into_iter().zip(overlay_ids) {
        let form_id = overlay_page_as_form(&mut doc, overlay_id)?;
        stamp_page(&mut doc, content_id, form_id)?;
    }

    // Overlay catalog and page tree are now unreachable
    let pruned = doc.prune_objects();
    debug!(
        "Composed {} pages onto {} ({} unused objects pruned)",
        content_pages,
        label,
        pruned.len()
    );

    Ok(PageDocument::from_document(doc, label))
}

/// Turn an overlay page into a Form XObject carrying its drawing and resources
fn overlay_page_as_form(doc: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
    let bbox = page_media_box(doc, page_id)?;
    let resources = page_resources(doc, page_id);
    let content = doc.get_page_content(page_id)?;

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set("FormType", Object::Integer(1));
    form.set("BBox", rect_object(&bbox));
    form.set(
        "Matrix",
        Object::Array(vec![
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(1),
            Object::Integer(0),
            Object::Integer(0),
        ]),
    );
    form.set("Resources", Object::Dictionary(resources));

    Ok(doc.add_object(Stream::new(form, content)))
}

/// Paint the form on top of a content page
fn stamp_page(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<()> {
    wrap_page_contents(doc, page_id, b"q\n".to_vec(), b"\nQ\n".to_vec())?;

    let mut resources = page_resources(doc, page_id);
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|xo| super::document::resolve_dictionary(doc, xo))
        .unwrap_or_else(Dictionary::new);

    let name = unused_name(&xobjects);
    xobjects.set(name.clone(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    // The page gets its own copy so shared or inherited resources stay intact
    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));

    let invoke = format!("q\n/{} Do\nQ\n", name);
    let invoke_id = doc.add_object(Stream::new(Dictionary::new(), invoke.into_bytes()));
    append_page_content(doc, page_id, invoke_id)
}

/// First `ProcOverlayN` name not already present in the XObject dictionary
fn unused_name(xobjects: &Dictionary) -> String {
    (0..)
        .map(|n| format!("{}{}", OVERLAY_NAME, n))
        .find(|name| xobjects.get(name.as_bytes()).is_err())
        .unwrap_or_else(|| OVERLAY_NAME.to_string())
}
