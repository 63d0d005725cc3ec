//! Volume assembler: concatenates the sections of the volume, padding with
//! blank pages so every document begins on an odd page

use std::collections::BTreeMap;

use log::{debug, info};
use lopdf::{Dictionary, Document, Object, ObjectId};

use super::document::{materialize_inherited_attributes, PageDocument};
use crate::error::{Error, Result};
use crate::pagination::needs_filler;

/// An ordered, named group of documents
#[derive(Debug, Clone)]
pub struct VolumeSection {
    pub name: String,
    pub documents: Vec<PageDocument>,
}

impl VolumeSection {
    pub fn new(name: impl Into<String>, documents: Vec<PageDocument>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }
}

/// Position of one document within the page sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// 1-based position of the document's first page
    pub first_page: u32,
    pub page_count: u32,
    pub blank_after: bool,
}

/// Lay documents with the given page counts end to end, starting from an
/// empty volume. A blank page follows each document that leaves the running
/// total odd.
pub fn layout_documents<I>(page_counts: I) -> Vec<Slot>
where
    I: IntoIterator<Item = usize>,
{
    let mut total: u32 = 0;
    page_counts
        .into_iter()
        .map(|count| {
            let first_page = total + 1;
            total += count as u32;
            let blank_after = needs_filler(total + 1);
            if blank_after {
                total += 1;
            }
            Slot {
                first_page,
                page_count: count as u32,
                blank_after,
            }
        })
        .collect()
}

/// Where one input document ended up in the assembled volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedDocument {
    pub section: String,
    pub label: String,
    pub slot: Slot,
}

/// The assembled volume and the position of every document in it
#[derive(Debug)]
pub struct AssembledVolume {
    pub document: PageDocument,
    pub placements: Vec<PlacedDocument>,
}

impl AssembledVolume {
    /// Placements belonging to the named section, in order
    pub fn section<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PlacedDocument> {
        self.placements.iter().filter(move |p| p.section == name)
    }
}

/// Concatenate `sections` in order into one document.
///
/// `blank_page` must be a single-page document; a fresh copy of it is
/// appended after every document whose pages leave the volume's running
/// page count odd.
pub fn assemble(sections: Vec<VolumeSection>, blank_page: &PageDocument) -> Result<AssembledVolume> {
    if blank_page.page_count() != 1 {
        return Err(Error::BlankPage {
            path: blank_page.label().into(),
            found: blank_page.page_count(),
        });
    }

    let counts: Vec<usize> = sections
        .iter()
        .flat_map(|s| s.documents.iter().map(PageDocument::page_count))
        .collect();
    if counts.is_empty() {
        return Err(Error::General("No documents to assemble".to_string()));
    }
    let mut slots = layout_documents(counts).into_iter();

    let mut builder = VolumeBuilder::new();
    let mut placements = Vec::new();

    for section in sections {
        info!("(For {})", section.name);
        for document in section.documents {
            let label = document.label().to_string();
            let slot = slots
                .next()
                .ok_or_else(|| Error::General("Document count changed during assembly".to_string()))?;

            debug!(
                "\t{} pages {}-{}{}",
                label,
                slot.first_page,
                slot.first_page + slot.page_count - 1,
                if slot.blank_after { " + blank" } else { "" }
            );

            builder.push(document.into_inner());
            if slot.blank_after {
                builder.push(blank_page.inner().clone());
            }

            placements.push(PlacedDocument {
                section: section.name.clone(),
                label,
                slot,
            });
        }
    }

    let document = PageDocument::from_document(builder.finish()?, "volume");
    Ok(AssembledVolume {
        document,
        placements,
    })
}

/// Collects pages and objects of many documents under non-colliding IDs
struct VolumeBuilder {
    max_id: u32,
    page_ids: Vec<ObjectId>,
    objects: BTreeMap<ObjectId, Object>,
}

impl VolumeBuilder {
    fn new() -> Self {
        Self {
            max_id: 1,
            page_ids: Vec::new(),
            objects: BTreeMap::new(),
        }
    }

    fn push(&mut self, mut doc: Document) {
        materialize_inherited_attributes(&mut doc);

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(self.max_id);
        self.max_id = doc.max_id + 1;

        self.page_ids.extend(doc.get_pages().into_values());
        self.objects.extend(doc.objects);
    }

    fn finish(self) -> Result<Document> {
        let mut merged = Document::with_version("1.5");
        merged.objects.extend(self.objects);

        // new_object_id() must hand out IDs above everything just added
        merged.max_id = self.max_id - 1;

        let pages_id = merged.new_object_id();
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.page_ids.len() as i64));
        pages.set("Kids", Object::Array(kids));

        let catalog_id = merged.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));

        merged.objects.insert(catalog_id, Object::Dictionary(catalog));
        merged.objects.insert(pages_id, Object::Dictionary(pages));
        merged.trailer.set("Root", Object::Reference(catalog_id));

        for &page_id in &self.page_ids {
            merged
                .get_dictionary_mut(page_id)?
                .set("Parent", Object::Reference(pages_id));
        }

        // Source catalogs and page trees are left unreferenced
        merged.prune_objects();

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::super::document::test_support::letter;
    use super::*;

    #[test]
    fn test_layout_inserts_blanks_after_odd_totals() {
        let slots = layout_documents([1, 2, 1]);
        assert_eq!(
            slots,
            vec![
                Slot { first_page: 1, page_count: 1, blank_after: true },
                Slot { first_page: 3, page_count: 2, blank_after: false },
                Slot { first_page: 5, page_count: 1, blank_after: true },
            ]
        );
        let last = slots.last().unwrap();
        let total = last.first_page + last.page_count - 1 + u32::from(last.blank_after);
        assert_eq!(total, 6);
    }

    #[test]
    fn test_layout_every_document_starts_odd() {
        for slot in layout_documents([3, 1, 4, 1, 5, 9, 2, 6]) {
            assert_eq!(slot.first_page % 2, 1, "{slot:?}");
        }
    }

    #[test]
    fn test_assemble_counts_and_placements() {
        let sections = vec![
            VolumeSection::new("front matter", vec![letter(1)]),
            VolumeSection::new("acknowledgments", vec![letter(2)]),
            VolumeSection::new("papers", vec![letter(1), letter(3)]),
        ];
        let volume = assemble(sections, &letter(1)).unwrap();

        // 1 + blank, 2, 1 + blank, 3 + blank
        assert_eq!(volume.document.page_count(), 10);

        let papers: Vec<u32> = volume.section("papers").map(|p| p.slot.first_page).collect();
        assert_eq!(papers, vec![5, 7]);
        assert_eq!(volume.placements.len(), 4);
    }

    #[test]
    fn test_assembled_pages_keep_order_and_attributes() {
        let sections = vec![VolumeSection::new("papers", vec![letter(2), letter(3)])];
        let volume = assemble(sections, &letter(1)).unwrap();
        let doc = volume.document.inner();

        let texts: Vec<String> = volume
            .document
            .page_ids()
            .into_iter()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
            .collect();
        assert!(texts[0].contains("(page 1)"));
        assert!(texts[1].contains("(page 2)"));
        assert!(texts[2].contains("(page 1)"));
        assert!(texts[4].contains("(page 3)"));
        // Trailing filler after the 3-page document
        assert_eq!(texts.len(), 6);

        for id in volume.document.page_ids() {
            let page = doc.get_dictionary(id).unwrap();
            assert!(page.get(b"MediaBox").is_ok());
            assert!(page.get(b"Resources").is_ok());
        }
    }

    #[test]
    fn test_blank_page_must_be_single_page() {
        let sections = vec![VolumeSection::new("papers", vec![letter(1)])];
        let err = assemble(sections, &letter(2)).unwrap_err();
        assert!(matches!(err, Error::BlankPage { found: 2, .. }));
    }

    #[test]
    fn test_assemble_nothing() {
        assert!(assemble(Vec::new(), &letter(1)).is_err());
    }
}
