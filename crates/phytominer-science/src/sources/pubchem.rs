use std::time::Duration;

use async_trait::async_trait;
use phytominer_core::ResolverConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::LookupClient;
use crate::sources::{CompoundLookup, LookupKind};

const SERVICE: &str = "PubChem";

/// Primary lookup: PubChem PUG-REST name search.
pub struct PubChemSource {
    client: LookupClient,
    base_url: String,
}

/// One candidate compound from a name search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubChemCompound {
    #[serde(rename = "CID")]
    pub cid: u64,

    #[serde(rename = "InChIKey", default)]
    pub inchikey: Option<String>,

    #[serde(rename = "SMILES", alias = "IsomericSMILES", default)]
    pub smiles: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyResponse {
    #[serde(rename = "PropertyTable")]
    property_table: PropertyTable,
}

#[derive(Debug, Deserialize)]
struct PropertyTable {
    #[serde(rename = "Properties", default)]
    properties: Vec<PubChemCompound>,
}

impl PubChemSource {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Self::with_params(
            &config.pubchem_url,
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_params(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: LookupClient::new(SERVICE, user_agent, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// All compounds PubChem matches to `name`, best match first. Empty when
    /// the name is unknown.
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<PubChemCompound>> {
        let url = format!(
            "{}/compound/name/{}/property/InChIKey,SMILES/JSON",
            self.base_url,
            urlencoding::encode(name)
        );
        let resp: Option<PropertyResponse> = self.client.get_json(&url).await?;
        Ok(resp
            .map(|r| r.property_table.properties)
            .unwrap_or_default())
    }
}

#[async_trait]
impl CompoundLookup for PubChemSource {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn lookup(&self, compound: &str, kind: LookupKind) -> Result<Option<String>> {
        let candidates = self.search_by_name(compound).await?;
        let Some(first) = candidates.into_iter().next() else {
            return Ok(None);
        };
        Ok(match kind {
            LookupKind::InchiKey => first.inchikey,
            LookupKind::Smiles => first.smiles,
        })
    }
}
