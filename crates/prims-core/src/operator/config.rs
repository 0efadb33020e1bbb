//! Procedural timing and operator selection parameters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the next operator is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperatorStrategy {
    /// Best structural match of the operator conditions against the state.
    #[default]
    MatchScore,
    /// ACT-R retrieval of the most active operator chunk.
    Activation,
}

/// Parameters of the operator cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralConfig {
    /// Time to fire the first production of an operator.
    pub production_action_latency: f64,
    /// Time to fire each following production.
    pub production_and_prim_latency: f64,
    /// Latency of a successful match-score selection.
    pub success_latency: f64,
    pub strategy: OperatorStrategy,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        Self {
            production_action_latency: 0.05,
            production_and_prim_latency: 0.025,
            success_latency: 0.05,
            strategy: OperatorStrategy::MatchScore,
        }
    }
}

impl ProceduralConfig {
    pub fn with_strategy(mut self, strategy: OperatorStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_latencies(mut self, action: f64, prim: f64) -> Self {
        self.production_action_latency = action;
        self.production_and_prim_latency = prim;
        self
    }

    /// Check that every latency is non-negative.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.production_action_latency < 0.0
            || self.production_and_prim_latency < 0.0
            || self.success_latency < 0.0
        {
            return Err("latencies must be non-negative");
        }
        Ok(())
    }
}
