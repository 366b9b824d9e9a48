use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phytominer_core::error::ExitCode;
use phytominer_core::matching::{compound_names_match, organism_names_match};
use phytominer_core::storage::documents::{
    load_extracted_taxa, load_taxa_data, read_source_text, save_taxa_data,
};
use phytominer_core::{AppConfig, CoreError, TaxaData, deduplicate};
use phytominer_science::{
    EnrichmentOrchestrator, LookupKind, ResolutionCache, ResolutionService, ScienceError,
    TaxonomyTable,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "phytominer",
    about = "Deduplicate and enrich organism/compound records extracted from literature",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting PHYTOMINER_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge raw extraction records by organism name.
    Dedup {
        /// Raw records: a JSON array or a `{"taxa": [...]}` document.
        input: PathBuf,
        /// Where to write the deduplicated document (stdout if omitted).
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Source text to attach to the document.
        #[arg(long)]
        text: Option<PathBuf>,
    },

    /// Add accepted names and InChIKeys to a deduplicated document.
    Enrich {
        input: PathBuf,
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Taxonomy table (JSON object keyed by scientific name).
        #[arg(long)]
        taxonomy: Option<PathBuf>,
    },

    /// Resolve compound names to InChIKeys (or SMILES).
    Resolve {
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long)]
        smiles: bool,
    },

    /// Inspect the translation caches.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Compare two names.
    Match {
        #[command(subcommand)]
        action: MatchAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache file locations.
    Path,
    /// Count cached entries.
    Stats,
    /// Check every cached value against its format validator.
    Verify,
}

#[derive(Subcommand)]
enum MatchAction {
    /// Same species, allowing abbreviated genera.
    Organism { name1: String, name2: String },
    /// Same compound, ignoring case and whitespace.
    Compound { name1: String, name2: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Show the config file path.
    Path,
}

/// Raised by `cache verify` after its report is printed.
#[derive(Debug, Error)]
#[error("{invalid} cached values failed validation")]
struct CorruptCache {
    invalid: usize,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("PHYTOMINER_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli, json_output).await {
        let code = exit_code_for(&err);
        if !json_output {
            eprintln!("Error: {err:#}");
        } else if !err.is::<CorruptCache>() {
            // verify prints its own envelope with the report
            let _ = print_json(&serde_json::json!({
                "status": "error",
                "message": err.to_string(),
            }));
        }
        std::process::exit(code as i32);
    }
}

async fn run(cli: Cli, json_output: bool) -> Result<()> {
    let start = Instant::now();
    let timing = std::env::var("PHYTOMINER_TIMING").as_deref() == Ok("1");

    // Honors PHYTOMINER_CONFIG and PHYTOMINER_CACHE_DIR.
    let config = AppConfig::load()?;
    tracing::debug!(cache_dir = %config.cache_dir().display(), "config loaded");

    if timing {
        eprintln!("[timing] config loaded in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    }

    let mut failure: Option<anyhow::Error> = None;

    match cli.command {
        // ── Dedup ──────────────────────────────────────────────────────────

        Commands::Dedup { input, output, text } => {
            let raw = load_extracted_taxa(&input)?;
            let mut data = deduplicate(&raw);
            if let Some(text_path) = text {
                data = data.with_text(read_source_text(&text_path)?);
            }
            let dur = start.elapsed().as_millis();

            let summary = serde_json::json!({"records": raw.len(), "taxa": data.taxa.len()});
            write_document(&data, output.as_deref(), json_output, summary, dur)?;
        }

        // ── Enrich ─────────────────────────────────────────────────────────

        Commands::Enrich { input, output, taxonomy } => {
            let mut data = load_taxa_data(&input)?;
            let mut orchestrator = EnrichmentOrchestrator::new(ResolutionService::from_config(&config)?);

            let report = match taxonomy {
                Some(table_path) => {
                    let table = TaxonomyTable::load(&table_path)?;
                    orchestrator.enrich(&mut data, &table).await?
                }
                None => orchestrator.add_inchi_keys(&mut data).await?,
            };
            let dur = start.elapsed().as_millis();

            write_document(&data, output.as_deref(), json_output, serde_json::to_value(&report)?, dur)?;
            if !json_output && output.is_some() {
                println!(
                    "{} taxa, {}/{} compound mentions resolved",
                    report.taxa, report.resolved, report.mentions
                );
                if !report.transient_failures.is_empty() {
                    println!(
                        "{} lookups failed transiently; rerun to retry them",
                        report.transient_failures.len()
                    );
                }
            }
        }

        // ── Resolve ────────────────────────────────────────────────────────

        Commands::Resolve { names, smiles } => {
            let kind = if smiles { LookupKind::Smiles } else { LookupKind::InchiKey };
            let mut service = ResolutionService::from_config(&config)?;

            let mut results = Vec::with_capacity(names.len());
            for name in &names {
                let value = match kind {
                    LookupKind::InchiKey => service.resolve_to_inchikey(Some(name.as_str())).await?,
                    LookupKind::Smiles => service.resolve_to_smiles(Some(name.as_str())).await?,
                };
                results.push((name.as_str(), value));
            }
            let dur = start.elapsed().as_millis();

            if json_output {
                let items: Vec<_> = results
                    .iter()
                    .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
                    .collect();
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "kind": kind.label(), "items": items },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for (name, value) in &results {
                    println!("{name}\t{}", value.as_deref().unwrap_or("-"));
                }
            }
        }

        // ── Cache ──────────────────────────────────────────────────────────

        Commands::Cache { action } => match action {
            CacheAction::Path => {
                let dur = start.elapsed().as_millis();
                let inchi = config.inchi_cache_path();
                let smiles = config.smiles_cache_path();
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "inchi": inchi, "smiles": smiles },
                        "meta": { "duration_ms": dur }
                    }))?;
                } else {
                    println!("{}", inchi.display());
                    println!("{}", smiles.display());
                }
            }

            CacheAction::Stats => {
                let caches = load_caches(&config)?;
                let dur = start.elapsed().as_millis();
                if json_output {
                    let data: Vec<_> = caches
                        .iter()
                        .map(|c| {
                            serde_json::json!({
                                "kind": c.kind().label(),
                                "path": c.path(),
                                "entries": c.len(),
                                "negative": c.negative_count(),
                            })
                        })
                        .collect();
                    print_json(&serde_json::json!({"status":"ok","data":data,"meta":{"duration_ms":dur}}))?;
                } else {
                    for cache in &caches {
                        println!(
                            "{:<9} {:>6} entries ({} unresolvable)  {}",
                            cache.kind().label(),
                            cache.len(),
                            cache.negative_count(),
                            cache.path().display()
                        );
                    }
                }
            }

            CacheAction::Verify => {
                let caches = load_caches(&config)?;
                let dur = start.elapsed().as_millis();
                let (report, verified) = verify_caches(&caches);
                if json_output {
                    print_json(&serde_json::json!({
                        "status": if verified.is_ok() { "ok" } else { "error" },
                        "data": report,
                        "meta": { "duration_ms": dur }
                    }))?;
                } else {
                    for cache in &caches {
                        let invalid = cache.invalid_entries();
                        if invalid.is_empty() {
                            println!("✓ {}: {} entries", cache.kind().label(), cache.len());
                        } else {
                            println!("✗ {}: {} invalid values", cache.kind().label(), invalid.len());
                            for (name, value) in &invalid {
                                println!("    {name} -> {value}");
                            }
                        }
                    }
                }
                failure = verified.err().map(anyhow::Error::from);
            }
        },

        // ── Match ──────────────────────────────────────────────────────────

        Commands::Match { action } => {
            let (kind, name1, name2, same) = match action {
                MatchAction::Organism { name1, name2 } => {
                    let same = organism_names_match(&name1, &name2);
                    ("organism", name1, name2, same)
                }
                MatchAction::Compound { name1, name2 } => {
                    let same = compound_names_match(&name1, &name2);
                    ("compound", name1, name2, same)
                }
            };
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "kind": kind, "name1": name1, "name2": name2, "match": same },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("{}", if same { "match" } else { "no match" });
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::List => {
                    let kv = config_key_values(&config);
                    if json_output {
                        print_json(&serde_json::json!({"status":"ok","data":kv,"meta":{"duration_ms":dur}}))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Path => {
                    let path = AppConfig::config_path();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "path": path, "exists": path.exists() },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else if path.exists() {
                        println!("{}", path.display());
                    } else {
                        println!("{} (not found, using defaults)", path.display());
                    }
                }
            }
        }

        // ── Version ────────────────────────────────────────────────────────

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"version":version},"meta":{"duration_ms":dur}}))?;
            } else {
                println!("phytominer v{version}");
            }
        }
    }

    if timing {
        eprintln!("[timing] total {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

/// Save to `output`, or print the document when no output path is given.
fn write_document(
    data: &TaxaData,
    output: Option<&Path>,
    json_output: bool,
    summary: serde_json::Value,
    dur: u128,
) -> Result<()> {
    match output {
        Some(path) => {
            let path = save_taxa_data(path, data)?;
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "path": path, "summary": summary },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Wrote {}", path.display());
            }
        }
        None => println!("{}", serde_json::to_string_pretty(data)?),
    }
    Ok(())
}

fn load_caches(config: &AppConfig) -> Result<[ResolutionCache; 2]> {
    Ok([
        ResolutionCache::load(config.inchi_cache_path(), LookupKind::InchiKey)?,
        ResolutionCache::load(config.smiles_cache_path(), LookupKind::Smiles)?,
    ])
}

/// Per-cache report of values that fail their format check.
fn verify_caches(
    caches: &[ResolutionCache],
) -> (Vec<serde_json::Value>, std::result::Result<(), CorruptCache>) {
    let mut invalid_total = 0;
    let report = caches
        .iter()
        .map(|cache| {
            let invalid = cache.invalid_entries();
            invalid_total += invalid.len();
            serde_json::json!({
                "kind": cache.kind().label(),
                "entries": cache.len(),
                "invalid": invalid
                    .iter()
                    .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    if invalid_total == 0 {
        (report, Ok(()))
    } else {
        (report, Err(CorruptCache { invalid: invalid_total }))
    }
}

fn config_key_values(config: &AppConfig) -> std::collections::BTreeMap<&'static str, String> {
    let mut map = std::collections::BTreeMap::new();
    map.insert("cache.directory", config.cache_dir().to_string_lossy().to_string());
    map.insert("cache.inchi", config.inchi_cache_path().to_string_lossy().to_string());
    map.insert("cache.smiles", config.smiles_cache_path().to_string_lossy().to_string());
    map.insert("resolver.pubchem_url", config.resolver.pubchem_url.clone());
    map.insert("resolver.cactus_url", config.resolver.cactus_url.clone());
    map.insert("resolver.user_agent", config.resolver.user_agent.clone());
    map.insert("resolver.initial_delay_ms", config.resolver.initial_delay_ms.to_string());
    map.insert("resolver.baseline_delay_ms", config.resolver.baseline_delay_ms.to_string());
    map.insert(
        "resolver.request_timeout_secs",
        config.resolver.request_timeout_secs.to_string(),
    );
    map.insert(
        "extraction.context_window_k",
        config.extraction.context_window_k.to_string(),
    );
    map.insert(
        "extraction.input_size_limit",
        config.extraction.input_size_limit().to_string(),
    );
    map.insert("extraction.chunk_overlap", config.extraction.chunk_overlap.to_string());
    map
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if err.is::<CorruptCache>() {
        return ExitCode::CorruptCache;
    }
    let core = err.downcast_ref::<CoreError>().or_else(|| {
        match err.downcast_ref::<ScienceError>() {
            Some(ScienceError::Core(core)) => Some(core),
            _ => None,
        }
    });
    if let Some(core) = core {
        return match core {
            CoreError::DocumentNotFound(_) => ExitCode::NotFound,
            CoreError::ValidationError(_) | CoreError::Json(_) => ExitCode::InvalidArgs,
            CoreError::Io(_) => ExitCode::FileSystemError,
            _ => ExitCode::GeneralError,
        };
    }
    match err.downcast_ref::<ScienceError>() {
        Some(ScienceError::InvalidInchiKey(_) | ScienceError::InvalidSmiles(_)) => {
            ExitCode::CorruptCache
        }
        Some(ScienceError::Cache(..)) => ExitCode::CorruptCache,
        Some(e) if e.is_transient() => ExitCode::NetworkError,
        Some(ScienceError::Taxonomy(_)) => ExitCode::NotFound,
        _ => ExitCode::GeneralError,
    }
}
