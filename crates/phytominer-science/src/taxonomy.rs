use std::collections::HashMap;
use std::path::Path;

use phytominer_core::normalize_taxon_name;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScienceError};

/// Accepted botanical name for one scientific name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedName {
    #[serde(default)]
    pub accepted_name: Option<String>,
    #[serde(default)]
    pub accepted_species: Option<String>,
}

/// Taxonomic acceptance reference.
///
/// Batched: one call covers every name of a document. Names the reference
/// does not know are left out of the returned map, keyed by the name exactly
/// as queried.
pub trait AcceptedNameLookup: Send + Sync {
    fn accepted_names(&self, names: &[String]) -> Result<HashMap<String, AcceptedName>>;
}

// ─── TaxonomyTable ────────────────────────────────────────────────────────────

/// In-memory acceptance table keyed by normalized taxon name.
///
/// On disk it is a JSON object:
/// `{"ficus religiosa": {"accepted_name": "Ficus religiosa L.", "accepted_species": "Ficus religiosa"}}`.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTable {
    entries: HashMap<String, AcceptedName>,
}

impl TaxonomyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ScienceError::Taxonomy(format!("{}: {e}", path.display())))?;
        let raw: HashMap<String, AcceptedName> = serde_json::from_str(&contents)
            .map_err(|e| ScienceError::Taxonomy(format!("{}: {e}", path.display())))?;
        let table: Self = raw.into_iter().collect();
        debug!(path = %path.display(), entries = table.len(), "loaded taxonomy table");
        Ok(table)
    }

    pub fn insert(&mut self, name: &str, accepted: AcceptedName) {
        self.entries.insert(normalize_taxon_name(name), accepted);
    }

    pub fn get(&self, name: &str) -> Option<&AcceptedName> {
        self.entries.get(&normalize_taxon_name(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, AcceptedName)> for TaxonomyTable {
    fn from_iter<I: IntoIterator<Item = (String, AcceptedName)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, accepted) in iter {
            table.insert(&name, accepted);
        }
        table
    }
}

impl AcceptedNameLookup for TaxonomyTable {
    fn accepted_names(&self, names: &[String]) -> Result<HashMap<String, AcceptedName>> {
        Ok(names
            .iter()
            .filter_map(|name| self.get(name).map(|found| (name.clone(), found.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ficus() -> AcceptedName {
        AcceptedName {
            accepted_name: Some("Ficus religiosa L.".into()),
            accepted_species: Some("Ficus religiosa".into()),
        }
    }

    #[test]
    fn lookups_ignore_case_and_punctuation() {
        let mut table = TaxonomyTable::new();
        table.insert("Ficus religiosa", ficus());

        assert_eq!(table.get("ficus religiosa"), Some(&ficus()));
        assert_eq!(table.get(" FICUS  religiosa. "), Some(&ficus()));
        assert_eq!(table.get("Ficus elastica"), None);
    }

    #[test]
    fn batch_lookup_omits_unknown_names() {
        let table: TaxonomyTable = [("Ficus religiosa".to_string(), ficus())]
            .into_iter()
            .collect();
        let names = vec!["ficus religiosa".to_string(), "mangifera indica".to_string()];

        let found = table.accepted_names(&names).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["ficus religiosa"], ficus());
    }

    #[test]
    fn loads_json_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taxonomy.json");
        std::fs::write(
            &path,
            r#"{
                "Ficus religiosa": {"accepted_name": "Ficus religiosa L.", "accepted_species": "Ficus religiosa"},
                "Mangifera indica": {"accepted_name": null}
            }"#,
        )
        .unwrap();

        let table = TaxonomyTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("mangifera indica"), Some(&AcceptedName::default()));
    }

    #[test]
    fn missing_table_is_an_error() {
        let err = TaxonomyTable::load(Path::new("/nonexistent/taxonomy.json")).unwrap_err();
        assert!(matches!(err, ScienceError::Taxonomy(_)));
    }
}
