//! PDF manipulation module

pub mod assemble;
pub mod compose;
pub mod document;
pub mod trim;

// Re-export commonly used items
pub use assemble::{assemble, layout_documents, AssembledVolume, PlacedDocument, Slot, VolumeSection};
pub use compose::compose;
pub use document::{count_pages, PageDocument};
pub use trim::trim;
