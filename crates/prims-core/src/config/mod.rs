//! Configuration system for PRIMs models.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::activation::{DeclarativeConfig, LearningMode, SpreadingMode};
use crate::error::{PrimsError, PrimsResult};
use crate::operator::{OperatorStrategy, ProceduralConfig};
use crate::trace::TraceConfig;

/// Complete model configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Declarative memory parameters.
    pub declarative: DeclarativeConfig,
    /// Operator cycle parameters.
    pub procedural: ProceduralConfig,
    /// Model trace verbosity.
    pub trace: TraceConfig,
}

impl ModelConfig {
    /// `~/.prims/config.toml`, or `.prims/config.toml` without a home directory.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".prims"))
            .unwrap_or_else(|| PathBuf::from(".prims"))
            .join("config.toml")
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> PrimsResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| PrimsError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| PrimsError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| PrimsError::Configuration(e.to_string()))?,
            _ => {
                return Err(PrimsError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load the file at [`ModelConfig::default_path`] if it exists, else defaults.
    pub fn load_default() -> PrimsResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `PRIMS_DECAY`
    /// - `PRIMS_NOISE` (`off` disables noise)
    /// - `PRIMS_OPTIMIZED_LEARNING` (set to enable)
    /// - `PRIMS_SPREADING` (`standard`, `goal_by_activation`, `associative`)
    /// - `PRIMS_RETRIEVAL_THRESHOLD`
    /// - `PRIMS_GOAL_OPERATOR_LEARNING` (set to enable)
    /// - `PRIMS_BETA`
    /// - `PRIMS_SEED`
    /// - `PRIMS_STRATEGY` (`match_score`, `activation`)
    /// - `PRIMS_TRACE_LEVEL`
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `PRIMS_*` variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        let decl = &mut self.declarative;

        if let Some(decay) = env_parse("PRIMS_DECAY") {
            decl.decay = decay;
        }
        if let Ok(noise) = std::env::var("PRIMS_NOISE") {
            if noise.eq_ignore_ascii_case("off") {
                decl.activation_noise = None;
            } else if let Ok(s) = noise.parse() {
                decl.activation_noise = Some(s);
            }
        }
        if std::env::var("PRIMS_OPTIMIZED_LEARNING").is_ok() {
            decl.learning = LearningMode::Optimized;
        }
        if let Ok(spreading) = std::env::var("PRIMS_SPREADING") {
            decl.spreading = match spreading.to_lowercase().as_str() {
                "goal_by_activation" => SpreadingMode::GoalByActivation,
                "associative" => SpreadingMode::Associative,
                _ => SpreadingMode::Standard,
            };
        }
        if let Some(threshold) = env_parse("PRIMS_RETRIEVAL_THRESHOLD") {
            decl.retrieval_threshold = threshold;
        }
        if std::env::var("PRIMS_GOAL_OPERATOR_LEARNING").is_ok() {
            decl.goal_operator_learning = true;
        }
        if let Some(beta) = env_parse("PRIMS_BETA") {
            decl.beta = beta;
        }
        if let Some(seed) = env_parse("PRIMS_SEED") {
            decl.seed = Some(seed);
        }
        if let Some(strategy) = env_parse::<OperatorStrategy>("PRIMS_STRATEGY") {
            self.procedural.strategy = strategy;
        }
        if let Some(level) = env_parse("PRIMS_TRACE_LEVEL") {
            self.trace.level = level;
        }

        self
    }

    /// Check every section's ranges.
    pub fn validate(&self) -> PrimsResult<()> {
        self.declarative
            .validate()
            .and_then(|_| self.procedural.validate())
            .map_err(|e| PrimsError::Configuration(e.to_string()))
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ModelConfigBuilder {
        ModelConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Builder for ModelConfig.
#[derive(Default)]
pub struct ModelConfigBuilder {
    config: ModelConfig,
}

impl ModelConfigBuilder {
    /// Set declarative memory parameters.
    pub fn declarative(mut self, config: DeclarativeConfig) -> Self {
        self.config.declarative = config;
        self
    }

    /// Set operator cycle parameters.
    pub fn procedural(mut self, config: ProceduralConfig) -> Self {
        self.config.procedural = config;
        self
    }

    /// Set trace verbosity.
    pub fn trace(mut self, config: TraceConfig) -> Self {
        self.config.trace = config;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ModelConfig {
        self.config
    }
}
