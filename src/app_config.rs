use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO) or "auto"
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation engine selected by configuration string
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TranslationProvider {
    // @provider: Google web endpoint, one joined request per batch
    #[serde(rename = "google_v1")]
    GoogleBatch,
    // @provider: Google web endpoint, one request per line
    #[default]
    #[serde(rename = "google_free")]
    GoogleFree,
    // @provider: MyMemory dictionary-style API
    #[serde(rename = "mymemory")]
    MyMemory,
    // @provider: Self-hosted LibreTranslate server
    #[serde(rename = "libretranslate")]
    LibreTranslate,
}

impl TranslationProvider {
    /// All engines, in the order they are offered to users
    pub const ALL: [TranslationProvider; 4] = [
        Self::GoogleBatch,
        Self::GoogleFree,
        Self::MyMemory,
        Self::LibreTranslate,
    ];

    // @returns: Human readable provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::GoogleBatch => "Google (batched)",
            Self::GoogleFree => "Google (per line)",
            Self::MyMemory => "MyMemory",
            Self::LibreTranslate => "LibreTranslate",
        }
    }

    // @returns: Configuration identifier
    pub fn as_config_str(&self) -> &'static str {
        match self {
            Self::GoogleBatch => "google_v1",
            Self::GoogleFree => "google_free",
            Self::MyMemory => "mymemory",
            Self::LibreTranslate => "libretranslate",
        }
    }

    /// Whether the backend accepts "auto" as a source language
    pub fn accepts_auto_source(&self) -> bool {
        !matches!(self, Self::MyMemory)
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_config_str())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google_v1" | "google-v1" | "google_batch" => Ok(Self::GoogleBatch),
            "google_free" | "google-free" | "google" => Ok(Self::GoogleFree),
            "mymemory" => Ok(Self::MyMemory),
            "libretranslate" | "libre" => Ok(Self::LibreTranslate),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Per-provider tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: TranslationProvider,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: API key (LibreTranslate instances may require one)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Max concurrent requests for per-line fan-out
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Max lines per orchestrator batch
    #[serde(default = "default_max_lines_per_batch")]
    pub max_lines_per_batch: usize,

    // @field: Max characters per orchestrator batch
    #[serde(default = "default_max_chars_per_batch")]
    pub max_chars_per_batch: usize,

    // @field: Max characters in a single joined request
    #[serde(default = "default_max_request_chars")]
    pub max_request_chars: usize,

    // @field: Timeout seconds per network call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Minimum interval between outbound calls
    #[serde(default)]
    pub min_request_interval_ms: u64,

    // @field: Pause after each orchestrator batch
    #[serde(default)]
    pub pause_after_batch_ms: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::GoogleBatch => Self {
                provider_type,
                endpoint: default_google_endpoint(),
                api_key: String::new(),
                concurrent_requests: 1,
                max_lines_per_batch: 60,
                max_chars_per_batch: 1400,
                max_request_chars: default_max_request_chars(),
                timeout_secs: default_timeout_secs(),
                min_request_interval_ms: 100,
                pause_after_batch_ms: 20,
            },
            TranslationProvider::GoogleFree => Self {
                provider_type,
                endpoint: default_google_endpoint(),
                api_key: String::new(),
                concurrent_requests: default_concurrent_requests(),
                max_lines_per_batch: 20,
                max_chars_per_batch: 900,
                max_request_chars: default_max_request_chars(),
                timeout_secs: default_timeout_secs(),
                min_request_interval_ms: 50,
                pause_after_batch_ms: 50,
            },
            TranslationProvider::MyMemory => Self {
                provider_type,
                endpoint: default_mymemory_endpoint(),
                api_key: String::new(),
                concurrent_requests: 2,
                max_lines_per_batch: 40,
                max_chars_per_batch: 4000,
                max_request_chars: 500,
                timeout_secs: default_timeout_secs(),
                min_request_interval_ms: 250,
                pause_after_batch_ms: 0,
            },
            TranslationProvider::LibreTranslate => Self {
                provider_type,
                endpoint: default_libretranslate_endpoint(),
                api_key: String::new(),
                concurrent_requests: default_concurrent_requests(),
                max_lines_per_batch: 20,
                max_chars_per_batch: 2500,
                max_request_chars: default_max_request_chars(),
                timeout_secs: default_timeout_secs(),
                min_request_interval_ms: 0,
                pause_after_batch_ms: 20,
            },
        }
    }

    /// Per-call timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fan-out width, never above the hard cap
    pub fn effective_concurrency(&self) -> usize {
        self.concurrent_requests.clamp(1, MAX_FAN_OUT)
    }
}

/// Upper bound for per-line fan-out regardless of configuration
pub const MAX_FAN_OUT: usize = 6;

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff sleep
    #[serde(default = "default_retry_backoff_cap_ms")]
    pub retry_backoff_cap_ms: u64,

    /// Maximum number of cached translations per cache instance
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Number of files translated at the same time
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,

    /// Languages accepted as detection results
    #[serde(default = "default_allowed_languages")]
    pub allowed_languages: Vec<String>,

    /// Source language used when detection fails
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_backoff_cap_ms: default_retry_backoff_cap_ms(),
            cache_capacity: default_cache_capacity(),
            max_concurrent_files: default_max_concurrent_files(),
            allowed_languages: default_allowed_languages(),
            fallback_language: default_fallback_language(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map to the `log` crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_max_lines_per_batch() -> usize {
    20
}

fn default_max_chars_per_batch() -> usize {
    2500
}

fn default_max_request_chars() -> usize {
    4500
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200 // doubled on each retry
}

fn default_retry_backoff_cap_ms() -> u64 {
    2000
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_max_concurrent_files() -> usize {
    1
}

fn default_allowed_languages() -> Vec<String> {
    ["en", "es", "fr", "de", "it", "pt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback_language() -> String {
    "en".to_string()
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com".to_string()
}

fn default_mymemory_endpoint() -> String {
    "https://api.mymemory.translated.net".to_string()
}

fn default_libretranslate_endpoint() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !is_auto(&self.source_language) {
            crate::language_utils::get_language_name(&self.source_language)?;
        }
        crate::language_utils::get_language_name(&self.target_language)?;

        let provider_config = self.translation.get_active_provider_config();
        if provider_config.max_lines_per_batch == 0 {
            return Err(anyhow!("max_lines_per_batch must be at least 1"));
        }
        if provider_config.max_chars_per_batch == 0 {
            return Err(anyhow!("max_chars_per_batch must be at least 1"));
        }
        if provider_config.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be at least 1"));
        }
        url::Url::parse(&provider_config.endpoint).map_err(|e| {
            anyhow!(
                "Invalid endpoint '{}' for {}: {}",
                provider_config.endpoint,
                provider_config.provider_type,
                e
            )
        })?;

        if self.translation.common.max_concurrent_files == 0 {
            return Err(anyhow!("max_concurrent_files must be at least 1"));
        }
        if self.translation.common.cache_capacity == 0 {
            return Err(anyhow!("cache_capacity must be at least 1"));
        }

        Ok(())
    }
}

/// Whether a source language string asks for detection
pub fn is_auto(language: &str) -> bool {
    let trimmed = language.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto")
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "auto".to_string(),
            target_language: "es".to_string(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration, falling back to built-in defaults
    pub fn get_active_provider_config(&self) -> ProviderConfig {
        self.get_provider_config(self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: TranslationProvider) -> ProviderConfig {
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_type)
            .cloned()
            .unwrap_or_else(|| ProviderConfig::new(provider_type))
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        let provider_config = self.get_active_provider_config();
        if provider_config.endpoint.is_empty() {
            ProviderConfig::new(self.provider).endpoint
        } else {
            provider_config.endpoint
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL
                .iter()
                .map(|p| ProviderConfig::new(*p))
                .collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}
