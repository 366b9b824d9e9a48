//! phytominer core: taxon records, name normalization, deduplication and
//! configuration.

pub mod config;
pub mod dedup;
pub mod error;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod storage;

pub use config::{AppConfig, CacheConfig, ExtractionConfig, ResolverConfig};
pub use dedup::deduplicate;
pub use error::{CoreError, Result};
pub use models::*;
pub use normalize::{compound_lookup_key, normalize_compound_name, normalize_taxon_name};
