pub mod document_source;
pub mod roster_store;
pub mod text_extractor;

pub use document_source::DocumentSource;
pub use roster_store::RosterStore;
pub use text_extractor::{read_export_rows, ExportRow, ExtractionInput, TextExtractor};
