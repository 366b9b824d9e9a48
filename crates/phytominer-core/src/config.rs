use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/phytominer/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub resolver: ResolverConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the identifier translation caches.
    pub directory: String,
    pub inchi_file: String,
    pub smiles_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub pubchem_url: String,
    pub cactus_url: String,
    pub user_agent: String,
    /// Delay before the very first lookup.
    pub initial_delay_ms: u64,
    /// Delay restored after every successful lookup.
    pub baseline_delay_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Model context window, in thousands of tokens.
    pub context_window_k: u32,
    /// Share of the context window reserved for model output.
    pub output_fraction: f64,
    /// Characters shared by consecutive chunks. Read by the text splitter
    /// that feeds a `TaxaExtractor`; shown by `config list`.
    pub chunk_overlap: u32,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CacheConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Self {
            directory: home
                .join(".phytominer_cache")
                .to_string_lossy()
                .to_string(),
            inchi_file: "inchi_translation_cache.json".to_string(),
            smiles_file: "smiles_translation_cache.json".to_string(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pubchem_url: "https://pubchem.ncbi.nlm.nih.gov/rest/pug".to_string(),
            cactus_url: "https://cactus.nci.nih.gov/chemical/structure".to_string(),
            user_agent: concat!("phytominer/", env!("CARGO_PKG_VERSION")).to_string(),
            initial_delay_ms: 300,
            baseline_delay_ms: 340,
            request_timeout_secs: 60,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window_k: 128,
            output_fraction: 0.05,
            chunk_overlap: 500,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/phytominer/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PHYTOMINER_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("phytominer")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    /// `PHYTOMINER_CACHE_DIR` overrides the cache directory.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = Self::load_from(&path)?;
        if let Ok(dir) = std::env::var("PHYTOMINER_CACHE_DIR") {
            config.set_cache_directory(dir.into());
        }
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn set_cache_directory(&mut self, dir: PathBuf) {
        self.cache.directory = dir.to_string_lossy().to_string();
    }

    // ─── Derived paths ─────────────────────────────────────

    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache.directory)
    }

    /// Path to the name -> InChIKey cache file.
    pub fn inchi_cache_path(&self) -> PathBuf {
        self.cache_dir().join(&self.cache.inchi_file)
    }

    /// Path to the name -> SMILES cache file.
    pub fn smiles_cache_path(&self) -> PathBuf {
        self.cache_dir().join(&self.cache.smiles_file)
    }
}

impl ExtractionConfig {
    /// Token budget left for input text once output is reserved.
    pub fn input_size_limit(&self) -> usize {
        let total = f64::from(self.context_window_k) * 1000.0;
        (total * (1.0 - self.output_fraction)) as usize
    }
}
