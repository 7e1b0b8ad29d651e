//! Invoice XML parsing and per-company indexing.

mod indexer;
mod record;

pub use indexer::{build_index, CompanyIndex, IndexerContext};
pub use record::{normalize_emitter_name, parse_invoice_xml, XmlRecord};
