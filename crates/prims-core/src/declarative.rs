//! Declarative memory store.
//!
//! Owns every committed chunk and the state shared between them: the
//! finsts, the operator-template registry, the last conflict set and the
//! random number generator behind activation noise.
//!
//! Time and buffer contents are never ambient; every operation that needs
//! them takes them as arguments.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::io::{BufRead, Write};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::activation::{DeclarativeConfig, LearningMode, SpreadingMode};
use crate::chunk::{association_strength, structural_strength, Chunk};
use crate::error::{PrimsError, PrimsResult};
use crate::persist::{export_jsonl, import_jsonl, ChunkRecord, ExportStats, ImportStats};
use crate::types::{Association, BufferName, Buffers, Value};

/// Components of one activation computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationBreakdown {
    pub base_level: f64,
    pub spreading: f64,
    pub noise: f64,
    pub total: f64,
}

/// A posterior strength to be stored on `receiver.assocs[source]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorUpdate {
    pub receiver: String,
    pub source: String,
    pub posterior_sji: f64,
}

/// Result of a spreading computation.
///
/// Associative-learning spreading also yields posterior strengths. They are
/// only written back by [`DeclarativeMemory::apply_posteriors`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spreading {
    pub total: f64,
    pub posteriors: Vec<PosteriorUpdate>,
}

/// Outcome of a declarative retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Retrieved {
        chunk: String,
        activation: f64,
        latency: f64,
    },
    /// Nothing reached the retrieval threshold.
    Failure { latency: f64 },
}

impl RetrievalOutcome {
    /// Time the retrieval took.
    pub fn latency(&self) -> f64 {
        match self {
            Self::Retrieved { latency, .. } | Self::Failure { latency } => *latency,
        }
    }

    /// The retrieved chunk's name on success.
    pub fn chunk(&self) -> Option<&str> {
        match self {
            Self::Retrieved { chunk, .. } => Some(chunk),
            Self::Failure { .. } => None,
        }
    }
}

/// The declarative memory of a model.
pub struct DeclarativeMemory {
    config: DeclarativeConfig,
    chunks: BTreeMap<String, Chunk>,
    finsts: VecDeque<String>,
    operator_templates: Vec<(String, Vec<String>)>,
    conflict_set: Vec<(String, f64)>,
    name_counter: u64,
    rng: StdRng,
}

impl DeclarativeMemory {
    /// Create an empty store. A configured seed makes all noise reproducible.
    pub fn new(config: DeclarativeConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            chunks: BTreeMap::new(),
            finsts: VecDeque::new(),
            operator_templates: Vec::new(),
            conflict_set: Vec::new(),
            name_counter: 0,
            rng,
        }
    }

    /// Parameters of this store.
    pub fn config(&self) -> &DeclarativeConfig {
        &self.config
    }

    /// Learning mode every chunk of this store uses.
    pub fn learning(&self) -> LearningMode {
        self.config.learning
    }

    /// An empty chunk in this store's learning mode. It is not added to the store.
    pub fn new_chunk(&self, name: impl Into<String>) -> Chunk {
        Chunk::new(name, self.config.learning)
    }

    /// A name starting with `prefix` that no chunk in the store uses.
    pub fn generate_name(&mut self, prefix: &str) -> String {
        loop {
            self.name_counter += 1;
            let candidate = format!("{}{}", prefix, self.name_counter);
            if !self.chunks.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Copy of a chunk's slots under a freshly generated name.
    pub fn copy_chunk(&mut self, name: &str) -> PrimsResult<Chunk> {
        let new_name = self.generate_name(name);
        Ok(self.require(name)?.copy_as(new_name))
    }

    /// Look up a chunk by name.
    pub fn chunk(&self, name: &str) -> Option<&Chunk> {
        self.chunks.get(name)
    }

    /// Mutable lookup by name.
    pub fn chunk_mut(&mut self, name: &str) -> Option<&mut Chunk> {
        self.chunks.get_mut(name)
    }

    /// Like [`DeclarativeMemory::chunk`], failing with `NotFound`.
    pub fn require(&self, name: &str) -> PrimsResult<&Chunk> {
        self.chunks.get(name).ok_or_else(|| PrimsError::not_found(name))
    }

    /// Whether a chunk with this name is stored.
    pub fn contains(&self, name: &str) -> bool {
        self.chunks.contains_key(name)
    }

    /// All chunks, in name order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Resolve raw text against this store: number, then chunk name, then text.
    pub fn resolve_value(&self, text: &str) -> Value {
        Value::resolve(text, |name| self.chunks.contains_key(name))
    }

    /// Assign a slot of a stored chunk from raw text.
    pub fn set_slot_text(&mut self, chunk: &str, slot: &str, text: &str) -> PrimsResult<()> {
        let value = self.resolve_value(text);
        self.chunks
            .get_mut(chunk)
            .ok_or_else(|| PrimsError::not_found(chunk))?
            .set_slot(slot, value);
        Ok(())
    }

    /// Insert a chunk as-is, replacing any chunk with the same name.
    ///
    /// # Panics
    ///
    /// Panics when the chunk tracks references in a different learning mode.
    pub fn insert(&mut self, chunk: Chunk) {
        self.assert_mode(&chunk);
        self.chunks.insert(chunk.name().to_string(), chunk);
    }

    /// Add a chunk to memory at `now` and return the name it is stored under.
    ///
    /// A chunk equal in content to a stored one reinforces it instead: the
    /// stored chunk gets a reference and absorbs the new chunk's associations.
    /// A new chunk is committed (unless already backdated) and raises the fan of
    /// every stored chunk it refers to.
    ///
    /// # Panics
    ///
    /// Panics when the chunk tracks references in a different learning mode.
    pub fn add_to_memory(&mut self, mut chunk: Chunk, now: f64) -> PrimsResult<String> {
        self.assert_mode(&chunk);

        let duplicate = self
            .chunks
            .values()
            .find(|existing| **existing == chunk)
            .map(|existing| existing.name().to_string());
        if let Some(name) = duplicate {
            if let Some(existing) = self.chunks.get_mut(&name) {
                existing.add_reference(now);
                existing.merge_associations(&chunk);
            }
            debug!(chunk = %name, "Reinforced existing chunk");
            return Ok(name);
        }

        if self.chunks.contains_key(chunk.name()) {
            return Err(PrimsError::validation(format!(
                "A different chunk named '{}' is already in memory",
                chunk.name()
            )));
        }

        if !chunk.is_committed() {
            chunk.commit(now);
        }
        // A chunk referenced from several slots still counts once.
        let referenced: BTreeSet<String> =
            chunk.slots.values().filter_map(|v| v.as_symbol().map(str::to_string)).collect();
        for name in referenced {
            if let Some(target) = self.chunks.get_mut(&name) {
                target.increment_fan();
            }
        }
        let name = chunk.name().to_string();
        debug!(chunk = %name, time = now, "Added chunk to memory");
        self.chunks.insert(name.clone(), chunk);
        Ok(name)
    }

    /// Remove a chunk from memory.
    pub fn remove(&mut self, name: &str) -> Option<Chunk> {
        self.chunks.remove(name)
    }

    fn assert_mode(&self, chunk: &Chunk) {
        assert_eq!(
            chunk.learning(),
            self.config.learning,
            "chunk '{}' uses a different learning mode than its store",
            chunk.name()
        );
    }

    // Finsts

    /// Inhibit a chunk from being selected again. The oldest finst drops out
    /// when more than `max_finsts` are held.
    pub fn add_to_finsts(&mut self, name: &str) {
        self.finsts.retain(|f| f != name);
        self.finsts.push_back(name.to_string());
        while self.finsts.len() > self.config.max_finsts {
            self.finsts.pop_front();
        }
    }

    /// Whether `name` holds a finst.
    pub fn is_inhibited(&self, name: &str) -> bool {
        self.finsts.iter().any(|f| f == name)
    }

    /// Inhibited chunks, oldest first.
    pub fn finsts(&self) -> impl Iterator<Item = &str> {
        self.finsts.iter().map(String::as_str)
    }

    /// Release every finst.
    pub fn clear_finsts(&mut self) {
        self.finsts.clear();
    }

    // Operator templates

    /// Registered operators with their ordered action lists.
    pub fn operator_templates(&self) -> &[(String, Vec<String>)] {
        &self.operator_templates
    }

    /// Remember an operator with its ordered actions.
    pub fn register_template(&mut self, operator: impl Into<String>, actions: Vec<String>) {
        self.operator_templates.push((operator.into(), actions));
    }

    /// The last conflict set, best first.
    pub fn conflict_set(&self) -> &[(String, f64)] {
        &self.conflict_set
    }

    pub(crate) fn set_conflict_set(&mut self, mut conflict_set: Vec<(String, f64)>) {
        conflict_set.sort_by_key(|(_, score)| std::cmp::Reverse(OrderedFloat(*score)));
        self.conflict_set = conflict_set;
    }

    // Activation

    /// Base-level activation of a stored chunk; 0 for unknown or uncommitted chunks.
    pub fn base_level_activation(&self, name: &str, now: f64) -> f64 {
        self.chunks
            .get(name)
            .map_or(0.0, |c| c.base_level_activation(now, self.config.decay))
    }

    /// Spreading activation into a stored chunk, without writing posteriors back.
    pub fn spreading_activation(
        &mut self,
        name: &str,
        now: f64,
        buffers: &Buffers,
    ) -> PrimsResult<Spreading> {
        let target = self.chunks.get(name).ok_or_else(|| PrimsError::not_found(name))?;
        if !target.is_committed() {
            return Ok(Spreading::default());
        }
        Ok(spreading(&self.chunks, &self.config, &mut self.rng, target, buffers, now))
    }

    /// Store posterior strengths computed by associative spreading.
    pub fn apply_posteriors(&mut self, updates: &[PosteriorUpdate]) {
        for update in updates {
            if let Some(assoc) = self
                .chunks
                .get_mut(&update.receiver)
                .and_then(|c| c.assocs.get_mut(&update.source))
            {
                assoc.posterior_sji = update.posterior_sji;
            }
        }
    }

    /// Full activation of a stored chunk with its components.
    ///
    /// Posterior strengths from associative spreading are written back.
    pub fn activation_breakdown(
        &mut self,
        name: &str,
        now: f64,
        buffers: &Buffers,
    ) -> PrimsResult<ActivationBreakdown> {
        let target = self.chunks.get(name).ok_or_else(|| PrimsError::not_found(name))?;
        if !target.is_committed() {
            return Ok(ActivationBreakdown::default());
        }
        let base_level = target.base_level_activation(now, self.config.decay);
        let spread = spreading(&self.chunks, &self.config, &mut self.rng, target, buffers, now);
        self.apply_posteriors(&spread.posteriors);

        let noise = match self.chunks.get_mut(name) {
            Some(chunk) => chunk.current_noise(now, self.config.activation_noise, &mut self.rng),
            None => 0.0,
        };
        let breakdown = ActivationBreakdown {
            base_level,
            spreading: spread.total,
            noise,
            total: base_level + spread.total + noise,
        };
        trace!(chunk = name, ?breakdown, "Computed activation");
        Ok(breakdown)
    }

    /// Full activation; 0 for unknown or uncommitted chunks.
    pub fn activation(&mut self, name: &str, now: f64, buffers: &Buffers) -> f64 {
        self.activation_breakdown(name, now, buffers)
            .map_or(0.0, |b| b.total)
    }

    /// Latency of a retrieval at the given activation.
    pub fn latency(&self, activation: f64) -> f64 {
        self.config.latency(activation)
    }

    // Retrieval

    /// Retrieve the most active chunk matching every slot of `request`.
    ///
    /// Inhibited chunks are skipped, and the winner must exceed the retrieval
    /// threshold. The candidates and their activations become the conflict set.
    pub fn retrieve(&mut self, request: &Chunk, now: f64, buffers: &Buffers) -> RetrievalOutcome {
        let candidates: Vec<String> = self
            .chunks
            .values()
            .filter(|c| !self.is_inhibited(c.name()))
            .filter(|c| {
                request
                    .slots()
                    .all(|(slot, value)| c.slot(slot).is_some_and(|v| v.is_equal(value)))
            })
            .map(|c| c.name().to_string())
            .collect();

        let mut best: Option<(String, f64)> = None;
        let mut threshold = self.config.retrieval_threshold;
        let mut conflict_set = Vec::with_capacity(candidates.len());
        for name in candidates {
            let activation = self.activation(&name, now, buffers);
            if activation > threshold {
                threshold = activation;
                best = Some((name.clone(), activation));
            }
            conflict_set.push((name, activation));
        }
        self.set_conflict_set(conflict_set);

        match best {
            Some((chunk, activation)) => {
                if self.config.spreading == SpreadingMode::Associative {
                    self.update_frequencies(&chunk, buffers);
                }
                let latency = self.latency(activation);
                debug!(chunk = %chunk, activation, latency, "Retrieved chunk");
                RetrievalOutcome::Retrieved {
                    chunk,
                    activation,
                    latency,
                }
            }
            None => {
                let latency = self.latency(self.config.retrieval_threshold);
                debug!(latency, "Retrieval failure");
                RetrievalOutcome::Failure { latency }
            }
        }
    }

    /// Count one co-occurrence of `retrieved` with each chunk in the
    /// associative source buffer.
    ///
    /// A record created here starts from the structural strength
    /// `S - ln(fan)` of the source into `retrieved`.
    pub fn update_frequencies(&mut self, retrieved: &str, buffers: &Buffers) {
        let Some(context) = buffers.get(self.config.associative_source) else {
            return;
        };
        for source in context.symbols() {
            let prior = match (self.chunks.get(source), self.chunks.get(retrieved)) {
                (Some(source_chunk), Some(target)) => {
                    structural_strength(source, source_chunk.fan(), target, &self.config)
                }
                _ => 0.0,
            };
            if let Some(chunk) = self.chunks.get_mut(source) {
                chunk
                    .assocs
                    .entry(retrieved.to_string())
                    .or_insert_with(|| Association::with_strength(retrieved, prior, 0))
                    .frequency += 1;
            }
        }
    }

    // Persistence

    /// Encode every chunk.
    pub fn records(&self) -> Vec<ChunkRecord> {
        self.chunks.values().map(ChunkRecord::from).collect()
    }

    /// Insert decoded records, then turn text values naming stored chunks
    /// back into symbols and numeric text back into numbers.
    pub fn restore(&mut self, records: Vec<ChunkRecord>) -> PrimsResult<usize> {
        let count = records.len();
        for record in records {
            let chunk = record.into_chunk(self.config.learning)?;
            self.insert(chunk);
        }
        self.relink();
        Ok(count)
    }

    fn relink(&mut self) {
        let names: HashSet<String> = self.chunks.keys().cloned().collect();
        for chunk in self.chunks.values_mut() {
            for value in chunk.slots.values_mut() {
                if let Value::Text(text) = value {
                    *value = Value::resolve(text, |n| names.contains(n));
                }
            }
        }
    }

    /// Write every chunk as JSON Lines.
    pub fn export_to<W: Write>(&self, writer: W) -> PrimsResult<ExportStats> {
        export_jsonl(self.chunks.values().map(ChunkRecord::from), writer)
    }

    /// Read chunks from JSON Lines; malformed lines are reported in the stats.
    pub fn import_from<R: BufRead>(&mut self, reader: R) -> PrimsResult<ImportStats> {
        let learning = self.config.learning;
        let mut chunks = Vec::new();
        let stats = import_jsonl(reader, |record| {
            chunks.push(record.into_chunk(learning)?);
            Ok(())
        })?;
        for chunk in chunks {
            self.insert(chunk);
        }
        self.relink();
        Ok(stats)
    }
}

/// Spreading activation into `target` under the configured mode.
fn spreading(
    chunks: &BTreeMap<String, Chunk>,
    config: &DeclarativeConfig,
    rng: &mut StdRng,
    target: &Chunk,
    buffers: &Buffers,
    now: f64,
) -> Spreading {
    let associative =
        config.spreading == SpreadingMode::Associative && target.chunk_type() != "operator";
    if associative {
        return associative_spreading(chunks, config, rng, target, buffers);
    }

    let mut total = 0.0;
    for buffer in BufferName::SPREADING_SOURCES {
        let by_activation =
            buffer == BufferName::Goal && config.spreading == SpreadingMode::GoalByActivation;
        total += spreading_from_buffer(chunks, config, rng, target, buffers, buffer, |source| {
            if by_activation {
                chunks
                    .get(source)
                    .map_or(0.0, |c| c.base_level_activation(now, config.decay).max(0.0))
            } else {
                1.0
            }
        });
    }
    Spreading {
        total,
        posteriors: Vec::new(),
    }
}

/// `W / n * sum_j(Sji * scale(j))` over the symbols of one buffer.
fn spreading_from_buffer(
    chunks: &BTreeMap<String, Chunk>,
    config: &DeclarativeConfig,
    rng: &mut StdRng,
    target: &Chunk,
    buffers: &Buffers,
    buffer: BufferName,
    scale: impl Fn(&str) -> f64,
) -> f64 {
    let weight = config.spreading_weight(buffer);
    if weight == 0.0 {
        return 0.0;
    }
    let Some(source_chunk) = buffers.get(buffer) else {
        return 0.0;
    };
    let mut total_sji = 0.0;
    let mut slots = 0usize;
    for source in source_chunk.symbols() {
        let fan = chunks.get(source).map_or(0, Chunk::fan);
        total_sji += association_strength(source, fan, target, config, rng) * scale(source);
        slots += 1;
    }
    if slots == 0 {
        0.0
    } else {
        total_sji * weight / slots as f64
    }
}

/// Posterior-strength spreading from the associative source buffer:
/// `ln((assoc + F * Sji) / (assoc + F))` per source chunk.
fn associative_spreading(
    chunks: &BTreeMap<String, Chunk>,
    config: &DeclarativeConfig,
    rng: &mut StdRng,
    target: &Chunk,
    buffers: &Buffers,
) -> Spreading {
    let mut result = Spreading::default();
    if config.assoc == 0.0 {
        return result;
    }
    let Some(context) = buffers.get(config.associative_source) else {
        return result;
    };
    for source in context.symbols() {
        let Some(source_chunk) = chunks.get(source) else {
            continue;
        };
        let frequency = f64::from(target.frequency_with(source_chunk));
        let sji = target.association_strength(source_chunk, config, rng);
        let ratio = (config.assoc + frequency * sji) / (config.assoc + frequency);
        if ratio <= 0.0 {
            continue;
        }
        let posterior = ratio.ln();
        result.total += posterior;
        if source_chunk.assoc(target.name()).is_some() {
            result.posteriors.push(PosteriorUpdate {
                receiver: source.to_string(),
                source: target.name().to_string(),
                posterior_sji: posterior,
            });
        }
    }
    result
}
