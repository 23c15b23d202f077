// Catalog ingestion: fetching, normalization and registration

mod fetcher;
mod normalizer;
mod service;

pub use fetcher::{StructureFetcher, tools_url};
pub use normalizer::RawCatalog;
pub use service::{CatalogService, ComposeCatalog, ComposeTool, RegisterCatalog};
