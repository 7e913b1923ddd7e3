//! Configuration management for Grounded.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - `.env` file in the working directory
//! - Config file (`.grounded/config.yaml` or `GROUNDED_CONFIG`)
//! - Environment variables (`GROUNDED_*`)
//! - Command-line flags
//!
//! The configuration is workspace-centric, with local state stored in `.grounded/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// LLM providers the answer generator can talk to.
pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "groq"];

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the workspace root (contains .grounded/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider used for answer generation
    pub provider: String,

    /// Model identifier for answer generation
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Knowledge base routing settings
    pub retrieval: RetrievalConfig,

    /// Web search fallback settings
    pub web_search: WebSearchConfig,

    /// Guardrail settings
    pub guardrails: GuardrailConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// OpenAI-compatible chat completion APIs (OpenAI, Groq)
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::OpenAI { timeout, .. } | Self::Ollama { timeout, .. } => *timeout,
        }
    }
}

/// Knowledge base routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Minimum top score to trust knowledge base results over web search
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Number of passages requested from the knowledge base
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Knowledge base name under `.grounded/knowledge/`
    #[serde(default = "default_base")]
    pub base: String,

    /// Upper bound for one knowledge base lookup
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_top_k() -> usize {
    3
}

fn default_base() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            base: default_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Web search fallback settings.
///
/// Defaults are unrestricted: every domain is searched and the query is sent
/// as typed. `config.example.yaml` at the repository root shows a
/// math-focused setup with `includeDomains` and `queryPrefix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the provider credential
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    /// Restrict results to these domains (empty = no restriction)
    #[serde(default)]
    pub include_domains: Vec<String>,

    /// Text prepended to every web query, e.g. "mathematics problem solution: "
    #[serde(default)]
    pub query_prefix: Option<String>,
}

fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_search_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_search_depth() -> String {
    "advanced".to_string()
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_key_env(),
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
            search_depth: default_search_depth(),
            include_domains: Vec::new(),
            query_prefix: None,
        }
    }
}

/// Guardrail settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Replaces the built-in unsafe pattern set when present
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    retrieval: Option<RetrievalConfig>,
    web_search: Option<WebSearchConfig>,
    guardrails: Option<GuardrailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub knowledge_base: Option<String>,
    pub similarity_threshold: Option<f32>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            llm: None,
            retrieval: RetrievalConfig::default(),
            web_search: WebSearchConfig::default(),
            guardrails: GuardrailConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `GROUNDED_WORKSPACE`: Override workspace path
    /// - `GROUNDED_CONFIG`: Path to config file
    /// - `GROUNDED_PROVIDER`: LLM provider
    /// - `GROUNDED_MODEL`: Model identifier
    /// - `GROUNDED_API_KEY`: LLM API key
    /// - `GROUNDED_KNOWLEDGE_BASE`: Knowledge base name
    /// - `GROUNDED_SIMILARITY_THRESHOLD`: Routing threshold
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use grounded_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Threshold: {}", config.retrieval.similarity_threshold);
    /// ```
    pub fn load() -> AppResult<Self> {
        // A missing .env file is normal
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        let workspace = match std::env::var("GROUNDED_WORKSPACE") {
            Ok(workspace) => PathBuf::from(workspace),
            Err(_) => Self::default().workspace,
        };
        let config_file = std::env::var("GROUNDED_CONFIG").ok().map(PathBuf::from);

        Self::from_sources(workspace, config_file)
    }

    /// Build defaults, then the YAML file, then environment variables for a
    /// given workspace and optional explicit config file.
    fn from_sources(workspace: PathBuf, config_file: Option<PathBuf>) -> AppResult<Self> {
        if !workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                workspace
            )));
        }

        let mut config = Self {
            workspace,
            config_file,
            ..Self::default()
        };

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.grounded_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("GROUNDED_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("GROUNDED_MODEL") {
            self.model = model;
        }

        if let Ok(base) = std::env::var("GROUNDED_KNOWLEDGE_BASE") {
            self.retrieval.base = base;
        }

        if let Ok(threshold) = std::env::var("GROUNDED_SIMILARITY_THRESHOLD") {
            self.retrieval.similarity_threshold = threshold.parse().map_err(|e| {
                AppError::Config(format!(
                    "Invalid GROUNDED_SIMILARITY_THRESHOLD '{}': {}",
                    threshold, e
                ))
            })?;
        }

        self.api_key = std::env::var("GROUNDED_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(mut self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            self.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                self.model = provider_config.model().to_string();
            }
            self.llm = Some(llm);
        }

        if let Some(retrieval) = config_file.retrieval {
            self.retrieval = retrieval;
        }

        if let Some(web_search) = config_file.web_search {
            self.web_search = web_search;
        }

        if let Some(guardrails) = config_file.guardrails {
            self.guardrails = guardrails;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(self)
    }

    /// Apply CLI overrides, giving precedence to flags over everything else.
    ///
    /// A `--workspace` or `--config` flag changes which YAML file applies, so
    /// the file and environment layers are rebuilt from that location first.
    pub fn with_overrides(self, overrides: ConfigOverrides) -> AppResult<Self> {
        let mut config = if overrides.workspace.is_some() || overrides.config_file.is_some() {
            let workspace = overrides.workspace.clone().unwrap_or(self.workspace);
            let config_file = overrides.config_file.or(self.config_file);
            Self::from_sources(workspace, config_file)?
        } else {
            self
        };

        if let Some(workspace) = overrides.workspace {
            config.workspace = workspace;
        }

        if let Some(provider) = overrides.provider {
            config.provider = provider;
        }

        if let Some(model) = overrides.model {
            config.model = model;
        }

        if let Some(log_level) = overrides.log_level {
            config.log_level = Some(log_level);
        }

        if let Some(log_format) = overrides.log_format {
            config.log_format = log_format;
        }

        if let Some(base) = overrides.knowledge_base {
            config.retrieval.base = base;
        }

        if let Some(threshold) = overrides.similarity_threshold {
            config.retrieval.similarity_threshold = threshold;
        }

        if overrides.verbose {
            config.verbose = true;
            // Verbose mode implies debug logging
            if config.log_level.is_none() {
                config.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Get the path to the .grounded directory.
    pub fn grounded_dir(&self) -> PathBuf {
        self.workspace.join(".grounded")
    }

    /// Ensure the .grounded directory exists.
    pub fn ensure_grounded_dir(&self) -> AppResult<()> {
        let dir = self.grounded_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .grounded directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Path of the append-only feedback log.
    pub fn feedback_path(&self) -> PathBuf {
        self.grounded_dir().join("feedback.jsonl")
    }

    /// Get the configuration of a provider, if the config file declares one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the LLM API key.
    ///
    /// `GROUNDED_API_KEY` wins, then the provider's `apiKeyEnv`, then the
    /// conventional variable for the provider (`OPENAI_API_KEY`, `GROQ_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => Some(api_key_env.clone()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None => match provider {
                "openai" => Some("OPENAI_API_KEY".to_string()),
                "groq" => Some("GROQ_API_KEY".to_string()),
                _ => None,
            },
        };

        env_var
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolve the web search credential.
    ///
    /// Absence is recoverable: the web adapter degrades to a failure item.
    pub fn web_search_api_key(&self) -> Option<String> {
        std::env::var(&self.web_search.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let threshold = self.retrieval.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::Config(format!(
                "Similarity threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        if self.web_search.max_results == 0 {
            return Err(AppError::Config(
                "webSearch.maxResults must be at least 1".to_string(),
            ));
        }

        if self.retrieval.timeout_secs == 0 || self.web_search.timeout_secs == 0 {
            return Err(AppError::Config("Timeouts must be at least 1 second".to_string()));
        }

        if LogFormat::parse(&self.log_format).is_none() {
            return Err(AppError::Config(format!(
                "Unknown log format: {}. Supported: pretty, json",
                self.log_format
            )));
        }

        Ok(())
    }
}
