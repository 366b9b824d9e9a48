use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::models::{ExtractedTaxon, TaxaData, Taxon};
use crate::normalize::{normalize_compound_name, normalize_taxon_name};

/// Literal the extractor emits when it has nothing to report.
const NULL_MENTION: &str = "null";

/// Collapse raw extraction records into one canonical [`Taxon`] per
/// taxon-normalized scientific name.
///
/// Records without a scientific name are dropped. Output order follows the
/// first appearance of each normalized name. Compound mentions are cleaned
/// with the compound profile, missing and `"null"` mentions are removed, and
/// the survivors are unioned as a set (returned sorted). A name whose
/// mentions are all filtered out gets `compounds: None`.
pub fn deduplicate(raw_taxa: &[ExtractedTaxon]) -> TaxaData {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&ExtractedTaxon>> = HashMap::new();

    for raw in raw_taxa {
        let Some(name) = raw.scientific_name.as_deref() else {
            continue;
        };
        let key = normalize_taxon_name(name);
        match buckets.get_mut(&key) {
            Some(bucket) => bucket.push(raw),
            None => {
                order.push(key.clone());
                buckets.insert(key, vec![raw]);
            }
        }
    }

    let mut taxa = Vec::with_capacity(order.len());
    for key in order {
        let members = buckets.remove(&key).unwrap_or_default();
        let compounds = merge_compounds(&members);
        debug!(
            name = %key,
            records = members.len(),
            compounds = compounds.as_ref().map_or(0, Vec::len),
            "merged taxon records"
        );
        taxa.push(Taxon::new(key, compounds));
    }

    TaxaData::new(taxa)
}

fn merge_compounds(members: &[&ExtractedTaxon]) -> Option<Vec<String>> {
    let merged: BTreeSet<String> = members
        .iter()
        .flat_map(|raw| raw.compounds.iter().flatten())
        .flatten()
        .map(|mention| normalize_compound_name(mention))
        .filter(|mention| mention != NULL_MENTION)
        .collect();

    if merged.is_empty() {
        None
    } else {
        Some(merged.into_iter().collect())
    }
}
