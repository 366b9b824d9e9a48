use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

// ─── Taxon ──────────────────────────────────────────────────

/// Canonical record for one organism and the compounds reported in it.
///
/// Produced by deduplication and then filled in by enrichment. After
/// deduplication `scientific_name` is already in taxon-normalized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxon {
    #[serde(default)]
    pub scientific_name: Option<String>,

    /// `None` means no usable mention survived cleaning, which downstream
    /// code treats differently from an empty list.
    #[serde(default)]
    pub compounds: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_species: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_genus: Option<String>,

    /// Compound mention -> InChIKey, only for resolved mentions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inchi_keys: Option<BTreeMap<String, String>>,

    /// Compound mention -> simplified InChIKey (connectivity block).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inchi_key_simps: Option<BTreeMap<String, String>>,

    /// Fields this schema doesn't know about, kept so documents round-trip.
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Taxon {
    pub fn new(scientific_name: impl Into<String>, compounds: Option<Vec<String>>) -> Self {
        Self {
            scientific_name: Some(scientific_name.into()),
            compounds,
            ..Default::default()
        }
    }
}

// ─── ExtractedTaxon ─────────────────────────────────────────

/// A raw record as produced by upstream extraction, one per text chunk and
/// organism mention. Any field may be missing, including individual
/// compound mentions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTaxon {
    #[serde(default)]
    pub scientific_name: Option<String>,

    #[serde(default)]
    pub compounds: Option<Vec<Option<String>>>,
}

impl ExtractedTaxon {
    pub fn new<I, S>(scientific_name: Option<&str>, compounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scientific_name: scientific_name.map(ToOwned::to_owned),
            compounds: Some(compounds.into_iter().map(|c| Some(c.into())).collect()),
        }
    }
}

// ─── TaxaData ───────────────────────────────────────────────

/// A document of taxon records plus the text they were extracted from.
/// Unit of persistence for extraction runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxaData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub taxa: Vec<Taxon>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl TaxaData {
    pub fn new(taxa: Vec<Taxon>) -> Self {
        Self { taxa, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Taxon>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Taxon>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_compounds_survive_serialization() {
        let taxon = Taxon::new("ficus religiosa", None);
        let json = serde_json::to_value(&taxon).unwrap();
        assert!(json.get("compounds").unwrap().is_null());
        assert!(json.get("inchi_keys").is_none());
    }

    #[test]
    fn null_taxa_loads_as_empty() {
        let data: TaxaData = serde_json::from_str(r#"{"taxa": null}"#).unwrap();
        assert!(data.taxa.is_empty());
        assert!(data.text.is_none());
    }

    #[test]
    fn unknown_fields_are_kept_in_extra() {
        let data: TaxaData = serde_json::from_str(
            r#"{"taxa": [{"scientific_name": "A b", "compounds": ["x"], "source_page": 4}]}"#,
        )
        .unwrap();
        let taxon = &data.taxa[0];
        assert_eq!(taxon.extra.get("source_page"), Some(&serde_json::json!(4)));

        let back = serde_json::to_value(taxon).unwrap();
        assert_eq!(back["source_page"], 4);
    }

    #[test]
    fn extracted_taxon_accepts_null_mentions() {
        let raw: ExtractedTaxon =
            serde_json::from_str(r#"{"scientific_name": "A b", "compounds": ["x", null]}"#)
                .unwrap();
        assert_eq!(raw.compounds, Some(vec![Some("x".to_string()), None]));
    }
}
