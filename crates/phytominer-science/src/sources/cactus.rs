use std::time::Duration;

use async_trait::async_trait;
use phytominer_core::ResolverConfig;

use crate::error::Result;
use crate::http::LookupClient;
use crate::sources::{CompoundLookup, LookupKind};

const SERVICE: &str = "CACTUS";
const INCHIKEY_PREFIX: &str = "InChIKey=";

/// Fallback lookup: NCI/CADD Chemical Identifier Resolver.
pub struct CactusSource {
    client: LookupClient,
    base_url: String,
}

impl CactusSource {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Self::with_params(
            &config.cactus_url,
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

    /// Resolve `name` to a single representation. The resolver answers with
    /// one value per line when a name is ambiguous; the first line is taken.
    pub async fn resolve(&self, name: &str, kind: LookupKind) -> Result<Option<String>> {
        let representation = match kind {
            LookupKind::InchiKey => "stdinchikey",
            LookupKind::Smiles => "smiles",
        };
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(name),
            representation
        );
        let Some(body) = self.client.get_text(&url).await? else {
            return Ok(None);
        };

        let first = body.lines().map(str::trim).find(|line| !line.is_empty());
        Ok(first.map(|line| {
            line.strip_prefix(INCHIKEY_PREFIX)
                .unwrap_or(line)
                .to_string()
        }))
    }
}

#[async_trait]
impl CompoundLookup for CactusSource {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn lookup(&self, compound: &str, kind: LookupKind) -> Result<Option<String>> {
        self.resolve(compound, kind).await
    }
}
