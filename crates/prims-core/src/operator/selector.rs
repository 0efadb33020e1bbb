//! Operator selection, reward learning and the operator cycle.

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use super::config::{OperatorStrategy, ProceduralConfig};
use super::matching::{build_state_snapshot, match_score};
use crate::chunk::Chunk;
use crate::declarative::{DeclarativeMemory, RetrievalOutcome};
use crate::error::PrimsResult;
use crate::trace::TraceSink;
use crate::types::{BufferName, Buffers, Value};

/// The production system that carries out an operator's actions.
#[cfg_attr(test, mockall::automock)]
pub trait ProceduralLayer {
    /// Name of the production that matches the current buffers, if any.
    fn find_matching_production(&mut self, buffers: &Buffers, now: f64) -> Option<String>;

    /// Fire a production. Returns whether its PRIMs matched.
    fn fire_production(&mut self, production: &str, buffers: &mut Buffers, now: f64) -> bool;
}

/// Result of choosing an operator.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    Selected {
        operator: String,
        score: f64,
        latency: f64,
    },
    /// No operator could be chosen.
    Failure { latency: f64 },
}

impl SelectionOutcome {
    pub fn latency(&self) -> f64 {
        match self {
            Self::Selected { latency, .. } | Self::Failure { latency } => *latency,
        }
    }

    pub fn operator(&self) -> Option<&str> {
        match self {
            Self::Selected { operator, .. } => Some(operator),
            Self::Failure { .. } => None,
        }
    }
}

/// Scored candidates, best first, with the selection they lead to.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictSet {
    pub ranked: Vec<(String, f64)>,
    pub outcome: SelectionOutcome,
}

/// Chooses operators and learns which ones pay off for which goal.
pub struct OperatorSelector {
    config: ProceduralConfig,
    trace: Box<dyn TraceSink>,
    previous_operators: Vec<(String, f64)>,
}

impl OperatorSelector {
    pub fn new(config: ProceduralConfig, trace: Box<dyn TraceSink>) -> Self {
        Self {
            config,
            trace,
            previous_operators: Vec::new(),
        }
    }

    pub fn config(&self) -> &ProceduralConfig {
        &self.config
    }

    /// Operators chosen since the last reset, with the time each was chosen.
    pub fn previous_operators(&self) -> &[(String, f64)] {
        &self.previous_operators
    }

    /// Forget the chosen operators.
    pub fn reset(&mut self) {
        self.previous_operators.clear();
    }

    /// Score every eligible operator against `snapshot`.
    ///
    /// Eligible operators are chunks of type `operator` that are not
    /// inhibited and whose `condition` slot names a chunk in memory. Scoring
    /// follows the store's name order; the first operator with the strictly
    /// highest score wins. The scores become the store's conflict set.
    pub fn rank_conflict_set(&self, memory: &mut DeclarativeMemory, snapshot: &Chunk) -> ConflictSet {
        let mut scored: Vec<(String, f64)> = Vec::new();
        let mut best: Option<(String, f64)> = None;

        for op in memory.chunks() {
            if op.chunk_type() != "operator" || memory.is_inhibited(op.name()) {
                continue;
            }
            let condition = op
                .slot("condition")
                .and_then(Value::as_symbol)
                .and_then(|name| memory.chunk(name));
            let Some(condition) = condition else {
                warn!(operator = op.name(), "Operator has no condition chunk, skipping");
                continue;
            };
            let score = match_score(condition, snapshot);
            if best.as_ref().map_or(true, |(_, b)| score > *b) {
                best = Some((op.name().to_string(), score));
            }
            scored.push((op.name().to_string(), score));
        }

        memory.set_conflict_set(scored.clone());
        scored.sort_by_key(|(_, score)| std::cmp::Reverse(OrderedFloat(*score)));

        let outcome = match best {
            Some((operator, score)) => SelectionOutcome::Selected {
                operator,
                score,
                latency: self.config.success_latency,
            },
            None => SelectionOutcome::Failure {
                latency: memory.latency(memory.config().retrieval_threshold),
            },
        };
        ConflictSet {
            ranked: scored,
            outcome,
        }
    }

    /// Choose the next operator and make it current.
    ///
    /// The clock advances by the selection latency. On success the operator
    /// is inhibited, recorded in the goal's `last-operator` slot and copied
    /// into the operator buffer; the operator itself becomes the buffer's
    /// former content. Returns whether an operator was found.
    pub fn find_operator(
        &mut self,
        memory: &mut DeclarativeMemory,
        buffers: &mut Buffers,
        clock: &mut f64,
    ) -> PrimsResult<bool> {
        let outcome = match self.config.strategy {
            OperatorStrategy::MatchScore => {
                let name = memory.generate_name("instance");
                let snapshot = build_state_snapshot(buffers, name);
                self.rank_conflict_set(memory, &snapshot).outcome
            }
            OperatorStrategy::Activation => {
                let isa = memory.resolve_value("operator");
                let request = memory.new_chunk("operator").with_slot(crate::chunk::ISA, isa);
                match memory.retrieve(&request, *clock, buffers) {
                    RetrievalOutcome::Retrieved {
                        chunk,
                        activation,
                        latency,
                    } => SelectionOutcome::Selected {
                        operator: chunk,
                        score: activation,
                        latency,
                    },
                    RetrievalOutcome::Failure { latency } => SelectionOutcome::Failure { latency },
                }
            }
        };

        self.trace.add_to_trace("Conflict Set", 5);
        for (name, score) in memory.conflict_set() {
            self.trace.add_to_trace(&format!("  {} A = {:.3}", name, score), 5);
        }

        let latency = outcome.latency();
        *clock += latency;
        let SelectionOutcome::Selected { operator, .. } = outcome else {
            self.trace.add_to_trace("   No matching operator found", 2);
            return Ok(false);
        };

        if memory.config().goal_operator_learning {
            self.previous_operators.push((operator.clone(), *clock - latency));
        }
        let spread = memory.spreading_activation(&operator, *clock, buffers)?.total;
        self.trace.add_to_trace(
            &format!("*** Retrieved operator {} with spread {:.3}", operator, spread),
            1,
        );

        memory.add_to_finsts(&operator);
        if let Some(goal) = buffers.get_mut(BufferName::Goal) {
            goal.set_slot("last-operator", Value::Symbol(operator.clone()));
        }
        let copy = memory.copy_chunk(&operator)?;
        buffers.set(BufferName::Operator, copy);
        buffers.set_former(BufferName::Operator, memory.require(&operator)?.clone());
        debug!(operator = %operator, time = *clock, "Selected operator");
        Ok(true)
    }

    /// Fire productions until a PRIM fails or the operator buffer runs out
    /// of actions. Returns whether the last match succeeded.
    ///
    /// The first firing costs `production_action_latency`, every following
    /// one `production_and_prim_latency`.
    pub fn run_operator_cycle(
        &mut self,
        procedural: &mut dyn ProceduralLayer,
        buffers: &mut Buffers,
        clock: &mut f64,
    ) -> bool {
        let mut matched = true;
        let mut first = true;
        while matched
            && buffers
                .get(BufferName::Operator)
                .is_some_and(|op| op.has_slot("action"))
        {
            let Some(production) = procedural.find_matching_production(buffers, *clock) else {
                matched = false;
                break;
            };
            let shown = production.strip_prefix('t').unwrap_or(&production);
            self.trace.add_to_trace(&format!("Firing {}", shown), 3);
            matched = procedural.fire_production(&production, buffers, *clock);
            *clock += if first {
                self.config.production_action_latency
            } else {
                self.config.production_and_prim_latency
            };
            first = false;
        }
        matched
    }

    /// Move each chosen operator's association with `goal` toward its
    /// shaped reward.
    ///
    /// Does nothing unless goal-operator learning is on and `reward` is
    /// non-zero. An operator whose shaped reward is positive also gets a
    /// reference at `now`.
    pub fn update_associations_on_reward(
        &mut self,
        memory: &mut DeclarativeMemory,
        goal: &str,
        payoff: f64,
        now: f64,
        reward: f64,
    ) {
        let config = memory.config().clone();
        if !config.goal_operator_learning || reward == 0.0 {
            return;
        }
        for (operator, chosen_at) in &self.previous_operators {
            let Some(op) = memory.chunk_mut(operator) else {
                continue;
            };
            let delta = config.default_operator_assoc * (payoff - (now - chosen_at)) / reward;
            let assoc = op.assoc_entry(goal);
            assoc.learn(delta, config.beta);
            let (sji, count) = (assoc.sji, assoc.learning_count);
            if delta > 0.0 {
                op.add_reference(now);
            }
            self.trace.add_to_trace(
                &format!(
                    "Updating assoc between {} and {} to ({:.3}, {})",
                    goal, operator, sji, count
                ),
                5,
            );
        }
    }

    /// Reward learning for the goal that was current before the last goal
    /// change, taken from the `slot1` symbol of the former goal buffer.
    pub fn reward_from_buffers(
        &mut self,
        memory: &mut DeclarativeMemory,
        buffers: &Buffers,
        payoff: f64,
        now: f64,
        reward: f64,
    ) {
        let goal = buffers
            .former(BufferName::Goal)
            .and_then(|g| g.slot("slot1"))
            .and_then(Value::as_symbol)
            .map(str::to_string);
        if let Some(goal) = goal {
            self.update_associations_on_reward(memory, &goal, payoff, now, reward);
        }
    }
}
