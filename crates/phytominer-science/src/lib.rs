//! Phytominer Science: compound name resolution, caching and enrichment.

pub mod error;
pub mod http;
pub mod identifiers;
pub mod backoff;
pub mod cache;
pub mod sources;
pub mod resolver;
pub mod taxonomy;
pub mod enrichment;

pub use backoff::Backoff;
pub use cache::ResolutionCache;
pub use enrichment::{
    EnrichmentOrchestrator, EnrichmentReport, RunOptions, TaxaExtractor, run_extraction,
};
pub use error::{Result, ScienceError};
pub use identifiers::{InchiKey, is_probably_valid_organic_smiles, is_valid_inchikey};
pub use resolver::{Resolution, ResolutionService};
pub use sources::{CompoundLookup, LookupKind};
pub use taxonomy::{AcceptedName, AcceptedNameLookup, TaxonomyTable};
