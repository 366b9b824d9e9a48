use std::collections::BTreeMap;

use phytominer_core::TaxaData;
use phytominer_core::matching::genus_from_full_name;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::identifiers::InchiKey;
use crate::resolver::{Resolution, ResolutionService};
use crate::sources::LookupKind;
use crate::taxonomy::AcceptedNameLookup;

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub steps: Vec<String>,
    pub taxa: usize,
    pub accepted: usize,
    pub mentions: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// Mentions that hit a transient service failure; retried on the next run.
    pub transient_failures: Vec<String>,
}

impl EnrichmentReport {
    fn add_step(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    fn record(&mut self, mention: &str, outcome: &Resolution) {
        self.mentions += 1;
        match outcome {
            Resolution::Resolved(_) => self.resolved += 1,
            Resolution::Unresolved => self.unresolved += 1,
            Resolution::TransientFailure => self.transient_failures.push(mention.to_string()),
        }
    }
}

/// Annotates deduplicated taxa with accepted names and InChIKeys.
///
/// Records are mutated in place and never re-deduplicated.
pub struct EnrichmentOrchestrator {
    resolver: ResolutionService,
}

impl EnrichmentOrchestrator {
    pub fn new(resolver: ResolutionService) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ResolutionService {
        &self.resolver
    }

    /// Accepted names first, then identifiers.
    pub async fn enrich(
        &mut self,
        data: &mut TaxaData,
        taxonomy: &dyn AcceptedNameLookup,
    ) -> Result<EnrichmentReport> {
        let mut report = EnrichmentReport {
            taxa: data.taxa.len(),
            ..Default::default()
        };
        report.accepted = add_accepted_info(data, taxonomy)?;
        report.add_step("accepted_names");
        self.resolve_into(data, &mut report).await?;
        report.add_step("inchi_keys");

        info!(
            taxa = report.taxa,
            accepted = report.accepted,
            mentions = report.mentions,
            resolved = report.resolved,
            transient = report.transient_failures.len(),
            "enrichment finished"
        );
        Ok(report)
    }

    /// Resolve every compound mention to an InChIKey and its connectivity
    /// block. Both maps are keyed by the mention as written in the record and
    /// replace whatever the record held before.
    pub async fn add_inchi_keys(&mut self, data: &mut TaxaData) -> Result<EnrichmentReport> {
        let mut report = EnrichmentReport {
            taxa: data.taxa.len(),
            ..Default::default()
        };
        self.resolve_into(data, &mut report).await?;
        report.add_step("inchi_keys");
        Ok(report)
    }

    async fn resolve_into(&mut self, data: &mut TaxaData, report: &mut EnrichmentReport) -> Result<()> {
        for taxon in &mut data.taxa {
            let mut keys = BTreeMap::new();
            let mut simplified = BTreeMap::new();
            for compound in taxon.compounds.iter().flatten() {
                let outcome = self
                    .resolver
                    .resolve(Some(compound), LookupKind::InchiKey)
                    .await?;
                report.record(compound, &outcome);
                if let Resolution::Resolved(value) = outcome {
                    let key = InchiKey::parse(&value)?;
                    simplified.insert(compound.clone(), key.simplified().to_string());
                    keys.insert(compound.clone(), value);
                }
            }
            debug!(
                taxon = taxon.scientific_name.as_deref().unwrap_or_default(),
                resolved = keys.len(),
                "resolved compounds"
            );
            taxon.inchi_keys = Some(keys);
            taxon.inchi_key_simps = Some(simplified);
        }
        Ok(())
    }
}

/// Fill `accepted_name`, `accepted_species` and `accepted_genus` from one
/// batched query. Taxa the reference doesn't know get all three cleared.
/// Returns how many taxa were matched.
pub fn add_accepted_info(data: &mut TaxaData, taxonomy: &dyn AcceptedNameLookup) -> Result<usize> {
    let mut names: Vec<String> = Vec::new();
    for name in data.taxa.iter().filter_map(|t| t.scientific_name.as_ref()) {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    let accepted = taxonomy.accepted_names(&names)?;

    let mut matched = 0;
    for taxon in &mut data.taxa {
        let found = taxon
            .scientific_name
            .as_ref()
            .and_then(|name| accepted.get(name))
            .cloned()
            .unwrap_or_default();
        if found.accepted_name.is_some() || found.accepted_species.is_some() {
            matched += 1;
        }
        taxon.accepted_genus = found
            .accepted_species
            .as_deref()
            .and_then(genus_from_full_name);
        taxon.accepted_name = found.accepted_name;
        taxon.accepted_species = found.accepted_species;
    }
    Ok(matched)
}
