//! Trim-size variant of the volume: every page scaled down and cropped

use log::info;
use lopdf::Object;

use super::document::{fmt_num, page_media_box, rect_object, wrap_page_contents, PageDocument};
use crate::error::{Error, Result};
use crate::layout::TrimGeometry;

/// Page boxes that would describe the untrimmed page after scaling
const STALE_BOXES: [&str; 3] = ["BleedBox", "TrimBox", "ArtBox"];

/// Scale every page of `volume` by `scale` and crop it to the trim rectangle.
///
/// The rectangle is computed once from the first page's MediaBox and applied
/// to all pages, whatever their own size.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] unless `0 < scale <= 1`.
pub fn trim(volume: PageDocument, scale: f64) -> Result<PageDocument> {
    if !(scale > 0.0 && scale <= 1.0) {
        return Err(Error::InvalidConfig(format!(
            "scale factor must be in (0, 1], got {}",
            scale
        )));
    }

    let page_ids = volume.page_ids();
    let first = *page_ids
        .first()
        .ok_or_else(|| Error::General(format!("{} has no pages to trim", volume.label())))?;

    let label = volume.label().to_string();
    let mut doc = volume.into_inner();

    let media_box = page_media_box(&doc, first)?;
    let geometry = TrimGeometry::compute(media_box.width(), media_box.height(), scale);
    info!(
        "Trimming {} pages: scale {}, visible area {:.1} x {:.1} pt",
        page_ids.len(),
        geometry.scale,
        geometry.visible.width(),
        geometry.visible.height()
    );

    let s = fmt_num(geometry.scale);
    let before = format!("q\n{} 0 0 {} 0 0 cm\n", s, s).into_bytes();
    let visible = rect_object(&geometry.visible);

    for page_id in page_ids {
        wrap_page_contents(&mut doc, page_id, before.clone(), b"\nQ\n".to_vec())?;

        let page = doc.get_dictionary_mut(page_id)?;
        page.set("MediaBox", visible.clone());
        page.set("CropBox", visible.clone());
        for key in STALE_BOXES {
            page.remove(key.as_bytes());
        }
    }

    Ok(PageDocument::from_document(doc, label))
}

#[cfg(test)]
mod tests {
    use super::super::document::test_support::letter;
    use super::*;
    use crate::layout::Rect;

    #[test]
    fn test_trim_sets_boxes_on_every_page() {
        let trimmed = trim(letter(3), 0.95).unwrap();
        assert_eq!(trimmed.page_count(), 3);

        let doc = trimmed.inner();
        for page_id in trimmed.page_ids() {
            let rect = page_media_box(doc, page_id).unwrap();
            assert!((rect.llx - 74.7).abs() < 0.01);
            assert!((rect.lly - 75.96).abs() < 0.01);
            assert!((rect.width() - 432.0).abs() < 0.01);
            assert!((rect.height() - 648.0).abs() < 0.01);

            let page = doc.get_dictionary(page_id).unwrap();
            assert!(page.get(b"CropBox").is_ok());
        }
    }

    #[test]
    fn test_trim_scales_content() {
        let trimmed = trim(letter(1), 0.95).unwrap();
        let doc = trimmed.inner();
        let page_id = trimmed.page_ids()[0];
        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.starts_with("q\n0.95 0 0 0.95 0 0 cm"));
        assert!(text.trim_end().ends_with('Q'));
    }

    #[test]
    fn test_trim_identity_scale_keeps_scaled_page() {
        let trimmed = trim(letter(1), 1.0).unwrap();
        let doc = trimmed.inner();
        let content = doc.get_page_content(trimmed.page_ids()[0]).unwrap();
        assert!(String::from_utf8_lossy(&content).starts_with("q\n1 0 0 1 0 0 cm"));

        let geometry = TrimGeometry::compute(612.0, 792.0, 1.0);
        assert_eq!(geometry.scaled, Rect::new(0.0, 0.0, 612.0, 792.0));
    }

    #[test]
    fn test_trim_rejects_bad_scale() {
        assert!(matches!(trim(letter(1), 0.0).unwrap_err(), Error::InvalidConfig(_)));
        assert!(matches!(trim(letter(1), 1.5).unwrap_err(), Error::InvalidConfig(_)));
        assert!(matches!(trim(letter(1), f64::NAN).unwrap_err(), Error::InvalidConfig(_)));
    }
}
