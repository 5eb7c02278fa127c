//! Engine configuration
//!
//! Defaults, `EXEC_*` environment overrides, and `.toml` / `.yaml` / `.json`
//! config files carrying engine settings, the fabric and the roster.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::convergence::{ConvergencePolicy, DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_MAX_ROUNDS};
use crate::fabric::TopologySpec;
use crate::generator::{GenerationOptions, HttpGeneratorConfig, DEFAULT_FALLBACK_CONFIDENCE};
use crate::roster::{StaticDirectory, Workload};
use crate::session::{SessionSettings, DEFAULT_BASE_RATE, DEFAULT_PER_HOP_LATENCY_MS};
use crate::synthesis::{DEFAULT_EXCERPT_CHARS, DEFAULT_PLAN_LIMIT, DEFAULT_REFERENCE_BANDWIDTH};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported config format: {0} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-participant bandwidth before the complexity multiplier (GB/s)
    pub base_rate: f64,
    /// Bandwidth that counts as full utilization in results (GB/s)
    pub reference_bandwidth: f64,
    pub per_hop_latency_ms: f64,
    pub convergence_threshold: f64,
    pub max_rounds: u32,
    pub excerpt_chars: usize,
    pub plan_limit: usize,
    /// Confidence assumed when a response has no marker
    pub confidence_fallback: f64,
    pub participant: GenerationOptions,
    pub synthesis: GenerationOptions,
    pub participant_timeout_secs: Option<u64>,
    pub max_active_sessions: Option<usize>,
    pub router_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let http = HttpGeneratorConfig::default();
        Self {
            base_rate: DEFAULT_BASE_RATE,
            reference_bandwidth: DEFAULT_REFERENCE_BANDWIDTH,
            per_hop_latency_ms: DEFAULT_PER_HOP_LATENCY_MS,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_rounds: DEFAULT_MAX_ROUNDS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            plan_limit: DEFAULT_PLAN_LIMIT,
            confidence_fallback: DEFAULT_FALLBACK_CONFIDENCE,
            participant: GenerationOptions::default(),
            synthesis: GenerationOptions::synthesis(),
            participant_timeout_secs: None,
            max_active_sessions: None,
            router_url: http.router_url,
            model: http.model,
            request_timeout_secs: http.request_timeout_secs,
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }
        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;

        if let Some(v) = parsed(lookup, "EXEC_BASE_RATE") {
            self.base_rate = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_REFERENCE_BANDWIDTH") {
            self.reference_bandwidth = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_PER_HOP_LATENCY_MS") {
            self.per_hop_latency_ms = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_CONVERGENCE_THRESHOLD") {
            self.convergence_threshold = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_MAX_ROUNDS") {
            self.max_rounds = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_MAX_TOKENS") {
            self.participant.max_tokens = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_TEMPERATURE") {
            self.participant.temperature = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_TOP_P") {
            self.participant.top_p = v;
        }
        if let Some(v) = parsed(lookup, "EXEC_PARTICIPANT_TIMEOUT_SECS") {
            self.participant_timeout_secs = Some(v);
        }
        if let Some(v) = parsed(lookup, "EXEC_MAX_ACTIVE_SESSIONS") {
            self.max_active_sessions = Some(v);
        }
        if let Some(v) = parsed(lookup, "EXEC_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = v;
        }
        if let Some(url) = lookup("ROUTER_URL") {
            self.router_url = url;
        }
        if let Some(model) = lookup("EXEC_MODEL") {
            self.model = model;
        }

        self
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        fn positive(key: &'static str, value: f64) -> ConfigResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    key,
                    message: format!("expected a positive number, got {}", value),
                })
            }
        }

        positive("base_rate", self.base_rate)?;
        positive("reference_bandwidth", self.reference_bandwidth)?;
        if !self.per_hop_latency_ms.is_finite() || self.per_hop_latency_ms < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "per_hop_latency_ms",
                message: format!("expected a non-negative number, got {}", self.per_hop_latency_ms),
            });
        }
        if !self.convergence_threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "convergence_threshold",
                message: "must be finite".to_string(),
            });
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_rounds",
                message: "at least one round is required".to_string(),
            });
        }
        if self.max_active_sessions == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "max_active_sessions",
                message: "limit must allow at least one session".to_string(),
            });
        }
        Ok(())
    }

    pub fn convergence_policy(&self) -> ConvergencePolicy {
        ConvergencePolicy::new(self.convergence_threshold, self.max_rounds)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            base_rate: self.base_rate,
            per_hop_latency_ms: self.per_hop_latency_ms,
            max_active_sessions: self.max_active_sessions,
        }
    }

    pub fn participant_timeout(&self) -> Option<Duration> {
        self.participant_timeout_secs.map(Duration::from_secs)
    }

    pub fn http_generator(&self) -> HttpGeneratorConfig {
        HttpGeneratorConfig {
            router_url: self.router_url.clone(),
            model: self.model.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

/// On-disk configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub engine: EngineConfig,
    pub topology: TopologySpec,
    /// Roster; the standard executive team when empty
    pub executives: Vec<Workload>,
}

impl ConfigFile {
    /// Load by file extension
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let config: Self = match extension.as_deref() {
            Some("toml") => toml::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        config.engine.validate()?;
        Ok(config)
    }

    pub fn directory(&self) -> StaticDirectory {
        if self.executives.is_empty() {
            StaticDirectory::executive_team()
        } else {
            StaticDirectory::new(self.executives.clone())
        }
    }
}
