//! Application configuration.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - `.pagewise/config.yaml` (or the file named by `PAGEWISE_CONFIG`)
//! - environment variables
//! - command-line flags (`with_overrides`)
//!
//! Retrieval and answer tuning lives in the knowledge crate's `rag.yaml`; this
//! file only wires collaborators (generation, embedding, vector store) and
//! logging.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const DATA_DIR: &str = ".pagewise";

const LLM_PROVIDERS: &[&str] = &["ollama", "mock"];
const EMBEDDING_PROVIDERS: &[&str] = &["ollama", "mock"];
const STORE_BACKENDS: &[&str] = &["file", "memory", "lancedb"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root (contains `.pagewise/`)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log filter override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Generation collaborator
    pub llm: LlmSettings,

    /// Embedding collaborator
    pub embedding: EmbeddingSettings,

    /// Vector store collaborator
    pub store: StoreSettings,
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            timeout_secs: 120,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    #[serde(rename = "batchSize")]
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
            batch_size: 32,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// One of `file`, `memory`, `lancedb`
    pub backend: String,
    /// Storage directory; defaults to `.pagewise/store`
    pub path: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            path: None,
        }
    }
}

/// On-disk layout of `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    store: Option<StoreSettings>,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment.
    ///
    /// Environment variables:
    /// - `PAGEWISE_WORKSPACE`, `PAGEWISE_CONFIG`
    /// - `PAGEWISE_LLM_PROVIDER`, `PAGEWISE_MODEL`
    /// - `PAGEWISE_EMBEDDING_PROVIDER`, `PAGEWISE_STORE`
    /// - `OLLAMA_URL` (endpoint for both Ollama collaborators)
    /// - `RUST_LOG`, `NO_COLOR`
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with an explicit workspace or config file
    /// taking precedence over `PAGEWISE_WORKSPACE` and `PAGEWISE_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        config.workspace = workspace
            .or_else(|| std::env::var_os("PAGEWISE_WORKSPACE").map(PathBuf::from))
            .unwrap_or(config.workspace);

        config.config_file = config_file
            .or_else(|| std::env::var_os("PAGEWISE_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.data_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("PAGEWISE_LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("PAGEWISE_MODEL") {
            self.llm.model = model;
        }

        if let Ok(provider) = std::env::var("PAGEWISE_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Ok(backend) = std::env::var("PAGEWISE_STORE") {
            self.store.backend = backend;
        }

        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.llm.endpoint.get_or_insert_with(|| url.clone());
            self.embedding.endpoint.get_or_insert(url);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level.get_or_insert(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into a copy of this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(store) = file.store {
            result.store = store;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides; flags win over file and environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        self.no_color |= no_color;
        self.json_logs |= json_logs;

        self
    }

    /// Path to the `.pagewise` directory.
    pub fn data_dir(&self) -> PathBuf {
        self.workspace.join(DATA_DIR)
    }

    /// Directory holding persisted vectors.
    pub fn store_dir(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("store"))
    }

    /// Ensure the `.pagewise` directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        let dir = self.data_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {:?}: {}", dir, e))
            })?;
        }
        Ok(())
    }

    /// Reject unknown providers and impossible values.
    pub fn validate(&self) -> AppResult<()> {
        check_known("LLM provider", &self.llm.provider, LLM_PROVIDERS)?;
        check_known(
            "embedding provider",
            &self.embedding.provider,
            EMBEDDING_PROVIDERS,
        )?;
        check_known("store backend", &self.store.backend, STORE_BACKENDS)?;

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.batchSize must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}
