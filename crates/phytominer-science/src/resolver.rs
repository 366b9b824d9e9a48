use phytominer_core::{AppConfig, compound_lookup_key};
use tracing::{debug, warn};

use crate::backoff::Backoff;
use crate::cache::ResolutionCache;
use crate::error::{Result, ScienceError};
use crate::sources::cactus::CactusSource;
use crate::sources::pubchem::PubChemSource;
use crate::sources::{CompoundLookup, LookupKind};

/// Outcome of resolving one compound name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A validated identifier.
    Resolved(String),
    /// The services were asked and know nothing about the name. Memoized.
    Unresolved,
    /// A service could not be reached or answered badly. Not memoized.
    TransientFailure,
}

impl Resolution {
    pub fn into_option(self) -> Option<String> {
        match self {
            Resolution::Resolved(v) => Some(v),
            Resolution::Unresolved | Resolution::TransientFailure => None,
        }
    }
}

/// Compound name -> identifier resolution with memoization and backoff.
///
/// Owns both translation caches and the shared backoff state. Methods take
/// `&mut self`, so lookups are strictly sequential: at most one request is
/// in flight per service.
pub struct ResolutionService {
    primary: Box<dyn CompoundLookup>,
    fallback: Box<dyn CompoundLookup>,
    inchi_cache: ResolutionCache,
    smiles_cache: ResolutionCache,
    backoff: Backoff,
}

impl ResolutionService {
    pub fn new(
        primary: Box<dyn CompoundLookup>,
        fallback: Box<dyn CompoundLookup>,
        inchi_cache: ResolutionCache,
        smiles_cache: ResolutionCache,
        backoff: Backoff,
    ) -> Self {
        Self {
            primary,
            fallback,
            inchi_cache,
            smiles_cache,
            backoff,
        }
    }

    /// PubChem first, CACTUS as fallback, caches from the configured paths.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Box::new(PubChemSource::new(&config.resolver)?),
            Box::new(CactusSource::new(&config.resolver)?),
            ResolutionCache::load(config.inchi_cache_path(), LookupKind::InchiKey)?,
            ResolutionCache::load(config.smiles_cache_path(), LookupKind::Smiles)?,
            Backoff::from_config(&config.resolver),
        ))
    }

    pub fn cache(&self, kind: LookupKind) -> &ResolutionCache {
        match kind {
            LookupKind::InchiKey => &self.inchi_cache,
            LookupKind::Smiles => &self.smiles_cache,
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Resolve a raw compound mention to a validated InChIKey.
    ///
    /// `Ok(None)` covers blank input, names no service recognizes, and
    /// transient failures (which are retried on the next call). A malformed
    /// key from a service or the cache is an error.
    pub async fn resolve_to_inchikey(&mut self, raw: Option<&str>) -> Result<Option<String>> {
        Ok(self.resolve(raw, LookupKind::InchiKey).await?.into_option())
    }

    /// Resolve a raw compound mention to a SMILES string.
    pub async fn resolve_to_smiles(&mut self, raw: Option<&str>) -> Result<Option<String>> {
        Ok(self.resolve(raw, LookupKind::Smiles).await?.into_option())
    }

    /// Resolve a raw compound mention and report how the answer was reached.
    pub async fn resolve(&mut self, raw: Option<&str>, kind: LookupKind) -> Result<Resolution> {
        let Some(raw) = raw else {
            return Ok(Resolution::Unresolved);
        };
        let key = compound_lookup_key(raw);
        if key.is_empty() {
            return Ok(Resolution::Unresolved);
        }

        let Self {
            primary,
            fallback,
            inchi_cache,
            smiles_cache,
            backoff,
        } = self;
        let cache = match kind {
            LookupKind::InchiKey => inchi_cache,
            LookupKind::Smiles => smiles_cache,
        };

        // Futures are lazy: nothing is sent unless the cache misses.
        let query = query_services(&**primary, &**fallback, backoff, &key, raw, kind);
        cache.get_or_resolve(&key, move || query).await
    }
}

/// One uncached lookup: primary service, then fallback when the primary has
/// no match. Updates the backoff according to how the round went.
async fn query_services(
    primary: &dyn CompoundLookup,
    fallback: &dyn CompoundLookup,
    backoff: &mut Backoff,
    key: &str,
    raw: &str,
    kind: LookupKind,
) -> Result<Resolution> {
    backoff.wait().await;

    let found = match primary.lookup(key, kind).await {
        Ok(Some(found)) => Ok(Some(found)),
        Ok(None) => {
            debug!(
                key,
                primary = primary.name(),
                fallback = fallback.name(),
                "no primary match, trying fallback"
            );
            fallback.lookup(key, kind).await
        }
        Err(e) => Err(e),
    };

    match found {
        Ok(candidate) => {
            backoff.reset();
            accept(candidate, kind)
        }
        Err(e) if e.is_transient() => {
            backoff.escalate();
            warn!(
                compound = raw,
                kind = kind.label(),
                error = %e,
                next_delay_ms = delay_ms(backoff.current()),
                "not resolved"
            );
            Ok(Resolution::TransientFailure)
        }
        Err(e) => Err(e),
    }
}

/// Milliseconds for logging; a saturated delay reports `u64::MAX`.
fn delay_ms(delay: std::time::Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

fn accept(candidate: Option<String>, kind: LookupKind) -> Result<Resolution> {
    let Some(value) = candidate else {
        return Ok(Resolution::Unresolved);
    };
    if kind.is_valid(&value) {
        return Ok(Resolution::Resolved(value));
    }
    match kind {
        LookupKind::InchiKey => Err(ScienceError::InvalidInchiKey(value)),
        LookupKind::Smiles => {
            debug!(smiles = %value, "discarding implausible SMILES");
            Ok(Resolution::Unresolved)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use mockito::Server;
    use phytominer_core::ResolverConfig;
    use tempfile::TempDir;

    use super::*;

    const RESERPINE: &str = "QEVHRUUCFGRFIF-MDEJGZGSSA-N";
    const GLUCOSE: &str = "WQZGKKKJIJFFOK-GASJEMHNSA-N";

    /// Scripted lookup: answers from a queue, counting calls.
    #[derive(Clone, Default)]
    struct FixtureLookup {
        calls: Arc<AtomicUsize>,
        answers: Arc<Mutex<Vec<Result<Option<String>>>>>,
        queried: Arc<Mutex<Vec<String>>>,
    }

    impl FixtureLookup {
        fn answering(answers: Vec<Result<Option<String>>>) -> Self {
            let mut answers = answers;
            answers.reverse();
            Self {
                answers: Arc::new(Mutex::new(answers)),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompoundLookup for FixtureLookup {
        fn name(&self) -> &str {
            "fixture"
        }

        async fn lookup(&self, compound: &str, _kind: LookupKind) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queried.lock().unwrap().push(compound.to_string());
            self.answers.lock().unwrap().pop().unwrap_or(Ok(None))
        }
    }

    fn transient() -> ScienceError {
        ScienceError::Status {
            service: "fixture".into(),
            status: 503,
        }
    }

    fn service(
        dir: &TempDir,
        primary: &FixtureLookup,
        fallback: &FixtureLookup,
        backoff: Backoff,
    ) -> ResolutionService {
        ResolutionService::new(
            Box::new(primary.clone()),
            Box::new(fallback.clone()),
            ResolutionCache::load(dir.path().join("inchi.json"), LookupKind::InchiKey).unwrap(),
            ResolutionCache::load(dir.path().join("smiles.json"), LookupKind::Smiles).unwrap(),
            backoff,
        )
    }

    fn quick_backoff() -> Backoff {
        Backoff::new(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn saturated_delay_logs_without_truncation() {
        assert_eq!(delay_ms(Duration::from_millis(340)), 340);
        assert_eq!(delay_ms(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn blank_and_missing_names_short_circuit() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::default();
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        assert_eq!(svc.resolve_to_inchikey(None).await.unwrap(), None);
        assert_eq!(svc.resolve_to_inchikey(Some("")).await.unwrap(), None);
        assert_eq!(svc.resolve_to_inchikey(Some("  \n ")).await.unwrap(), None);

        assert_eq!(primary.calls(), 0);
        assert_eq!(fallback.calls(), 0);
        assert!(svc.cache(LookupKind::InchiKey).is_empty());
        assert!(!dir.path().join("inchi.json").exists());
    }

    #[tokio::test]
    async fn name_variants_share_one_lookup() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![Ok(Some(RESERPINE.into()))]);
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        for raw in ["  Reserpine", "reserpine", "Reserpine"] {
            assert_eq!(
                svc.resolve_to_inchikey(Some(raw)).await.unwrap().as_deref(),
                Some(RESERPINE)
            );
        }
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
        assert_eq!(primary.queried.lock().unwrap().as_slice(), ["reserpine"]);
    }

    #[tokio::test]
    async fn greek_letters_are_spelled_out_for_lookup() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::default();
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        svc.resolve_to_inchikey(Some("β-Sitosterol")).await.unwrap();
        assert_eq!(primary.queried.lock().unwrap().as_slice(), ["beta-sitosterol"]);
    }

    #[tokio::test]
    async fn fallback_used_only_without_primary_match() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![Ok(None)]);
        let fallback = FixtureLookup::answering(vec![Ok(Some(GLUCOSE.into()))]);
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        let key = svc.resolve_to_inchikey(Some("Glucose")).await.unwrap();
        assert_eq!(key.as_deref(), Some(GLUCOSE));
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_names_are_memoized_as_negative() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::default();
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        let name = Some("surelythiscantbeacompound");
        assert_eq!(
            svc.resolve(name, LookupKind::InchiKey).await.unwrap(),
            Resolution::Unresolved
        );
        assert_eq!(svc.resolve_to_inchikey(name).await.unwrap(), None);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
        assert_eq!(
            svc.cache(LookupKind::InchiKey).get("surelythiscantbeacompound"),
            Some(None)
        );
    }

    #[tokio::test]
    async fn transient_failure_backs_off_and_is_retried() {
        let dir = TempDir::new().unwrap();
        let primary =
            FixtureLookup::answering(vec![Err(transient()), Ok(Some(RESERPINE.into()))]);
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        let before = svc.backoff().current();
        assert_eq!(
            svc.resolve(Some("reserpine"), LookupKind::InchiKey)
                .await
                .unwrap(),
            Resolution::TransientFailure
        );
        assert!(svc.backoff().current() > before);
        assert_eq!(svc.cache(LookupKind::InchiKey).get("reserpine"), None);
        assert_eq!(fallback.calls(), 0);

        let key = svc.resolve_to_inchikey(Some("reserpine")).await.unwrap();
        assert_eq!(key.as_deref(), Some(RESERPINE));
        assert_eq!(svc.backoff().current(), svc.backoff().baseline());
        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn fallback_transient_failure_is_not_memoized() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![Ok(None)]);
        let fallback = FixtureLookup::answering(vec![Err(transient())]);
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        assert_eq!(svc.resolve_to_inchikey(Some("glucose")).await.unwrap(), None);
        assert_eq!(svc.cache(LookupKind::InchiKey).get("glucose"), None);
        assert_eq!(svc.backoff().current(), Duration::from_millis(2));
    }

    #[tokio::test]
    async fn malformed_inchikey_is_fatal() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![Ok(Some("NOT-A-KEY".into()))]);
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        let err = svc.resolve_to_inchikey(Some("x")).await.unwrap_err();
        assert!(matches!(err, ScienceError::InvalidInchiKey(_)));
        assert!(svc.cache(LookupKind::InchiKey).is_empty());
    }

    #[tokio::test]
    async fn implausible_smiles_counts_as_unresolved() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![Ok(Some("O".into()))]);
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        assert_eq!(svc.resolve_to_smiles(Some("water")).await.unwrap(), None);
        assert_eq!(svc.cache(LookupKind::Smiles).get("water"), Some(None));
    }

    #[tokio::test]
    async fn caches_are_independent_per_kind() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![
            Ok(Some(GLUCOSE.into())),
            Ok(Some("C(C1C(C(C(C(O1)O)O)O)O)O".into())),
        ]);
        let fallback = FixtureLookup::default();
        let mut svc = service(&dir, &primary, &fallback, quick_backoff());

        assert_eq!(
            svc.resolve_to_inchikey(Some("glucose")).await.unwrap().as_deref(),
            Some(GLUCOSE)
        );
        assert_eq!(
            svc.resolve_to_smiles(Some("glucose")).await.unwrap().as_deref(),
            Some("C(C1C(C(C(C(O1)O)O)O)O)O")
        );
        assert_eq!(primary.calls(), 2);
        assert_eq!(svc.cache(LookupKind::InchiKey).len(), 1);
        assert_eq!(svc.cache(LookupKind::Smiles).len(), 1);
    }

    #[tokio::test]
    async fn reloaded_cache_answers_without_lookups() {
        let dir = TempDir::new().unwrap();
        let primary = FixtureLookup::answering(vec![Ok(Some(RESERPINE.into()))]);
        let fallback = FixtureLookup::default();
        {
            let mut svc = service(&dir, &primary, &fallback, quick_backoff());
            svc.resolve_to_inchikey(Some("Reserpine")).await.unwrap();
        }

        let mut reloaded = service(&dir, &primary, &fallback, quick_backoff());
        let key = reloaded.resolve_to_inchikey(Some("reserpine ")).await.unwrap();
        assert_eq!(key.as_deref(), Some(RESERPINE));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn resolves_against_http_services() {
        let mut server = Server::new_async().await;
        let pubchem_miss = server
            .mock("GET", "/rest/pug/compound/name/glucose/property/InChIKey,SMILES/JSON")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let cactus_hit = server
            .mock("GET", "/chemical/structure/glucose/stdinchikey")
            .with_status(200)
            .with_body(format!("InChIKey={GLUCOSE}"))
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.set_cache_directory(dir.path().to_path_buf());
        config.resolver = ResolverConfig {
            pubchem_url: format!("{}/rest/pug", server.url()),
            cactus_url: format!("{}/chemical/structure", server.url()),
            initial_delay_ms: 0,
            baseline_delay_ms: 0,
            ..ResolverConfig::default()
        };

        let mut svc = ResolutionService::from_config(&config).unwrap();
        for raw in ["glucose", "Glucose"] {
            assert_eq!(
                svc.resolve_to_inchikey(Some(raw)).await.unwrap().as_deref(),
                Some(GLUCOSE)
            );
        }

        pubchem_miss.assert_async().await;
        cactus_hit.assert_async().await;
        assert!(config.inchi_cache_path().exists());
    }
}
