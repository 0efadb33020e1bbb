//! Declarative memory parameters.
//!
//! One `DeclarativeConfig` is owned by a memory store. Every chunk activation,
//! association and retrieval reads from it, so switching a learning or
//! spreading mode is a store-wide decision and never a per-chunk one.

use serde::{Deserialize, Serialize};

use crate::types::BufferName;

/// How base-level learning is tracked.
///
/// Chosen once per store and copied into each chunk the store creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    /// Keep every reference time and sum the decayed traces.
    #[default]
    ReferenceHistory,
    /// Keep only a reference count and use the closed-form approximation.
    Optimized,
}

/// How spreading activation is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadingMode {
    /// Classic ACT-R: weighted average of Sji from each source buffer.
    #[default]
    Standard,
    /// Goal sources are additionally weighted by their own base-level activation.
    GoalByActivation,
    /// ACT-R 4 posterior strengths from the associative source buffer.
    Associative,
}

/// Parameters of declarative memory.
///
/// Base-level activation:
/// ```text
/// B_i = ln(sum((t - t_j + 0.05)^(-d)))
/// ```
///
/// Spreading activation (standard):
/// ```text
/// S_i = sum_buffers(W_b / n_b * sum_j(Sji))
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarativeConfig {
    /// Decay parameter (d). ACT-R default is 0.5.
    pub decay: f64,

    /// Logistic noise scale (s). `None` disables activation noise; config
    /// files spell it `"off"` (or `null` where the format has one).
    #[serde(with = "noise_scale")]
    pub activation_noise: Option<f64>,

    /// Spreading weight (W) of the goal buffer.
    pub goal_activation: f64,

    /// Spreading weight of the input buffer.
    pub input_activation: f64,

    /// Spreading weight of the retrieval buffer.
    pub retrieval_activation: f64,

    /// Spreading weight of the imaginal (working memory) buffer.
    pub imaginal_activation: f64,

    /// Maximum associative strength (S) in `Sji = S - ln(fan_j)`.
    pub max_associative_strength: f64,

    /// Scales exploration noise on learned goal-operator associations.
    pub exploration_exploitation_factor: f64,

    /// Reference bookkeeping for base-level learning.
    pub learning: LearningMode,

    /// Spreading activation variant.
    pub spreading: SpreadingMode,

    /// Source buffer for associative-learning spreading.
    pub associative_source: BufferName,

    /// Prior weight (assoc) of the posterior strength equation.
    pub assoc: f64,

    /// Learn goal-operator associations from reward.
    pub goal_operator_learning: bool,

    /// Reward scale, also the noise scale of learned associations.
    pub default_operator_assoc: f64,

    /// Learning rate of the goal-operator moving average.
    pub beta: f64,

    /// Retrieval threshold (tau).
    pub retrieval_threshold: f64,

    /// Latency factor (F) in `latency = F * exp(-A)`.
    pub latency_factor: f64,

    /// Number of declarative finsts.
    pub max_finsts: usize,

    /// Seed for the store's random number generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for DeclarativeConfig {
    fn default() -> Self {
        Self {
            decay: 0.5,
            activation_noise: Some(0.25),
            goal_activation: 1.0,
            input_activation: 0.0,
            retrieval_activation: 0.0,
            imaginal_activation: 0.0,
            max_associative_strength: 3.0,
            exploration_exploitation_factor: 0.0,
            learning: LearningMode::ReferenceHistory,
            spreading: SpreadingMode::Standard,
            associative_source: BufferName::Input,
            assoc: 1.0,
            goal_operator_learning: false,
            default_operator_assoc: 4.0,
            beta: 0.1,
            retrieval_threshold: -2.0,
            latency_factor: 0.2,
            max_finsts: 4,
            seed: None,
        }
    }
}

impl DeclarativeConfig {
    /// Create a new DeclarativeConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults without any noise source.
    pub fn deterministic() -> Self {
        Self {
            activation_noise: None,
            exploration_exploitation_factor: 0.0,
            ..Default::default()
        }
    }

    /// Defaults with optimized (reference-count) learning.
    pub fn optimized() -> Self {
        Self {
            learning: LearningMode::Optimized,
            ..Default::default()
        }
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_activation_noise(mut self, noise: Option<f64>) -> Self {
        self.activation_noise = noise;
        self
    }

    pub fn with_learning(mut self, learning: LearningMode) -> Self {
        self.learning = learning;
        self
    }

    pub fn with_spreading(mut self, spreading: SpreadingMode) -> Self {
        self.spreading = spreading;
        self
    }

    pub fn with_goal_activation(mut self, weight: f64) -> Self {
        self.goal_activation = weight;
        self
    }

    pub fn with_input_activation(mut self, weight: f64) -> Self {
        self.input_activation = weight;
        self
    }

    pub fn with_retrieval_activation(mut self, weight: f64) -> Self {
        self.retrieval_activation = weight;
        self
    }

    pub fn with_imaginal_activation(mut self, weight: f64) -> Self {
        self.imaginal_activation = weight;
        self
    }

    pub fn with_max_associative_strength(mut self, strength: f64) -> Self {
        self.max_associative_strength = strength;
        self
    }

    pub fn with_exploration(mut self, factor: f64) -> Self {
        self.exploration_exploitation_factor = factor;
        self
    }

    /// Enable goal-operator learning with the given moving-average rate.
    pub fn with_goal_operator_learning(mut self, beta: f64) -> Self {
        self.goal_operator_learning = true;
        self.beta = beta;
        self
    }

    pub fn with_default_operator_assoc(mut self, value: f64) -> Self {
        self.default_operator_assoc = value;
        self
    }

    pub fn with_assoc(mut self, assoc: f64) -> Self {
        self.assoc = assoc;
        self
    }

    pub fn with_retrieval_threshold(mut self, threshold: f64) -> Self {
        self.retrieval_threshold = threshold;
        self
    }

    pub fn with_latency_factor(mut self, factor: f64) -> Self {
        self.latency_factor = factor;
        self
    }

    pub fn with_max_finsts(mut self, max_finsts: usize) -> Self {
        self.max_finsts = max_finsts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spreading weight configured for a buffer. Buffers that never spread return 0.
    pub fn spreading_weight(&self, buffer: BufferName) -> f64 {
        match buffer {
            BufferName::Goal => self.goal_activation,
            BufferName::Input => self.input_activation,
            BufferName::Retrieval => self.retrieval_activation,
            BufferName::Imaginal => self.imaginal_activation,
            BufferName::Operator => 0.0,
        }
    }

    /// Retrieval latency for an activation value: `F * exp(-A)`.
    pub fn latency(&self, activation: f64) -> f64 {
        self.latency_factor * (-activation).exp()
    }

    /// Validate configuration values are in valid ranges.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0.0..1.0).contains(&self.decay) {
            return Err("decay must be in [0.0, 1.0)");
        }
        if matches!(self.activation_noise, Some(s) if s <= 0.0) {
            return Err("activation_noise must be positive when set");
        }
        if !(0.0..=1.0).contains(&self.beta) {
            return Err("beta must be between 0.0 and 1.0");
        }
        if self.assoc < 0.0 {
            return Err("assoc must be non-negative");
        }
        if self.latency_factor < 0.0 {
            return Err("latency_factor must be non-negative");
        }
        Ok(())
    }
}

/// `activation_noise` as a number, `null` or `"off"`.
mod noise_scale {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Setting {
        Scale(f64),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(scale) => serializer.serialize_f64(*scale),
            None => serializer.serialize_str("off"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Setting>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Setting::Scale(scale)) => Ok(Some(scale)),
            Some(Setting::Word(word)) if word.eq_ignore_ascii_case("off") => Ok(None),
            Some(Setting::Word(word)) => Err(D::Error::custom(format!(
                "activation_noise must be a number or \"off\", got \"{}\"",
                word
            ))),
        }
    }
}
