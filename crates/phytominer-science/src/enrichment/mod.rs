pub mod extraction;
pub mod pipeline;

pub use extraction::{RunOptions, TaxaExtractor, run_extraction};
pub use pipeline::{EnrichmentOrchestrator, EnrichmentReport, add_accepted_info};
