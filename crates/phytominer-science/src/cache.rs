use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, ScienceError};
use crate::resolver::Resolution;
use crate::sources::LookupKind;

// ─── ResolutionCache ──────────────────────────────────────────────────────────

/// Durable memo of name lookups: normalized name -> identifier, or `None`
/// when the services were asked and had no answer.
///
/// The whole map is rewritten after every new entry. Writes go to a sibling
/// temp file which is then renamed over the store, so a reader never sees a
/// half-written map.
#[derive(Debug)]
pub struct ResolutionCache {
    path: PathBuf,
    kind: LookupKind,
    entries: BTreeMap<String, Option<String>>,
}

impl ResolutionCache {
    /// Load the store at `path`. A missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>, kind: LookupKind) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, Option<String>> = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| ScienceError::Cache(path.display().to_string(), e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(ScienceError::Cache(
                    path.display().to_string(),
                    e.to_string(),
                ));
            }
        };
        debug!(
            path = %path.display(),
            entries = entries.len(),
            kind = kind.label(),
            "loaded resolution cache"
        );
        Ok(Self {
            path,
            kind,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> LookupKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cached negative results.
    pub fn negative_count(&self) -> usize {
        self.entries.values().filter(|v| v.is_none()).count()
    }

    /// `None` when the key was never resolved; `Some(None)` for a stored
    /// negative result.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries.get(key).map(Option::as_deref)
    }

    /// Store a completed lookup and rewrite the store.
    pub async fn insert(&mut self, key: &str, value: Option<String>) -> Result<()> {
        if let Some(v) = &value
            && !self.kind.is_valid(v)
        {
            return Err(self.invalid(v));
        }
        self.entries.insert(key.to_string(), value);
        self.persist().await
    }

    /// Return the memoized outcome for `key`, or run `resolver` and memoize
    /// what it finds. Transient failures are passed through without being
    /// stored, so the next call asks again.
    pub async fn get_or_resolve<F, Fut>(&mut self, key: &str, resolver: F) -> Result<Resolution>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Resolution>>,
    {
        if let Some(hit) = self.get(key) {
            debug!(key, "resolution cache hit");
            return match hit {
                Some(v) if !self.kind.is_valid(v) => Err(self.invalid(v)),
                Some(v) => Ok(Resolution::Resolved(v.to_string())),
                None => Ok(Resolution::Unresolved),
            };
        }

        let outcome = resolver().await?;
        match &outcome {
            Resolution::Resolved(v) => self.insert(key, Some(v.clone())).await?,
            Resolution::Unresolved => self.insert(key, None).await?,
            Resolution::TransientFailure => {}
        }
        Ok(outcome)
    }

    /// Entries whose stored value fails the format check for this cache.
    pub fn invalid_entries(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
            .filter(|(_, v)| !self.kind.is_valid(v))
            .collect()
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.store_error(e))?;
        }
        let data = serde_json::to_vec(&self.entries).map_err(|e| self.store_error(e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| self.store_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.store_error(e))
    }

    fn store_error(&self, e: impl std::fmt::Display) -> ScienceError {
        ScienceError::Cache(self.path.display().to_string(), e.to_string())
    }

    fn invalid(&self, value: &str) -> ScienceError {
        match self.kind {
            LookupKind::InchiKey => ScienceError::InvalidInchiKey(value.to_string()),
            LookupKind::Smiles => ScienceError::InvalidSmiles(value.to_string()),
        }
    }
}
