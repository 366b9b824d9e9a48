use std::path::PathBuf;

use async_trait::async_trait;
use phytominer_core::storage::documents::{load_taxa_data, save_taxa_data};
use phytominer_core::{ExtractedTaxon, TaxaData, deduplicate};
use tracing::{info, warn};

use crate::enrichment::pipeline::EnrichmentOrchestrator;
use crate::error::{Result, ScienceError};
use crate::taxonomy::AcceptedNameLookup;

/// Structured extraction over one chunk of source text.
///
/// `Ok(None)` when the model produced no taxa for the chunk. Output that
/// can't be parsed into records must be reported as
/// [`ScienceError::ExtractionParse`].
#[async_trait]
pub trait TaxaExtractor: Send + Sync {
    async fn extract(&self, chunk: &str) -> Result<Option<Vec<ExtractedTaxon>>>;
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Where the enriched document is written, and read back from when not
    /// re-running.
    pub json_dump: Option<PathBuf>,
    pub single_chunk: bool,
    /// Ignore an existing dump and extract again.
    pub rerun: bool,
    /// When reusing a dump, resolve its compounds again before returning it.
    pub rerun_inchi_resolution: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            json_dump: None,
            single_chunk: true,
            rerun: true,
            rerun_inchi_resolution: true,
        }
    }
}

/// Extract, deduplicate and enrich one source document.
///
/// Chunks are sent to the extractor one at a time. Splitting chunks further
/// when the model output is unparseable is not supported and fails the run.
pub async fn run_extraction(
    extractor: &dyn TaxaExtractor,
    orchestrator: &mut EnrichmentOrchestrator,
    taxonomy: &dyn AcceptedNameLookup,
    chunks: &[String],
    text: &str,
    options: &RunOptions,
) -> Result<TaxaData> {
    if !options.rerun
        && let Some(dump) = &options.json_dump
        && dump.exists()
    {
        let mut data = load_taxa_data(dump)?;
        info!(path = %dump.display(), taxa = data.taxa.len(), "reusing extraction dump");
        if options.rerun_inchi_resolution {
            orchestrator.add_inchi_keys(&mut data).await?;
            save_taxa_data(dump, &data)?;
        }
        return Ok(data);
    }

    if !options.single_chunk {
        return Err(ScienceError::Unsupported(
            "multi-chunk extraction".to_string(),
        ));
    }
    if chunks.len() != 1 {
        warn!(chunks = chunks.len(), "expected a single chunk");
    }

    let mut raw = Vec::new();
    for (index, chunk) in chunks.iter().enumerate() {
        match extractor.extract(chunk).await {
            Ok(Some(taxa)) => raw.extend(taxa),
            Ok(None) => {}
            Err(ScienceError::ExtractionParse(reason)) => {
                return Err(ScienceError::Unsupported(format!(
                    "splitting chunk {index} after unparseable output ({reason})"
                )));
            }
            Err(e) => return Err(e),
        }
    }
    info!(records = raw.len(), chunks = chunks.len(), "extraction finished");

    let mut data = deduplicate(&raw);
    orchestrator.enrich(&mut data, taxonomy).await?;
    let data = data.with_text(text);

    if let Some(dump) = &options.json_dump {
        let path = save_taxa_data(dump, &data)?;
        info!(path = %path.display(), "wrote extraction dump");
    }
    Ok(data)
}
