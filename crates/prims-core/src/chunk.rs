//! Chunks: the units of declarative memory.
//!
//! A chunk is a named set of slot/value pairs plus the bookkeeping that
//! drives its base-level activation. A chunk without a creation time is not a
//! memory yet (a buffer's contents, a retrieval request, a state snapshot) and
//! has activation 0.
//!
//! Chunks never own each other. Slot symbols and association records refer to
//! other chunks by name, and the [`DeclarativeMemory`](crate::DeclarativeMemory)
//! owns every chunk.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;

use crate::activation::{
    actr_noise, backdated_references, base_level_from_history, base_level_optimized,
    DeclarativeConfig, LearningMode,
};
use crate::types::{Association, Value};

/// Slot that holds a chunk's type.
pub const ISA: &str = "isa";

/// A declarative memory item.
#[derive(Debug, Clone)]
pub struct Chunk {
    name: String,
    learning: LearningMode,
    pub(crate) slots: HashMap<String, Value>,
    pub(crate) print_order: Vec<String>,
    pub(crate) creation_time: Option<f64>,
    pub(crate) references: u32,
    pub(crate) reference_list: Vec<f64>,
    pub(crate) fan: u32,
    pub(crate) fixed_activation: Option<f64>,
    noise_value: f64,
    noise_time: f64,
    pub(crate) assocs: HashMap<String, Association>,
}

impl Chunk {
    /// Create an empty, uncommitted chunk.
    ///
    /// A chunk counts one reference from the moment it is created.
    pub fn new(name: impl Into<String>, learning: LearningMode) -> Self {
        Self {
            name: name.into(),
            learning,
            slots: HashMap::new(),
            print_order: Vec::new(),
            creation_time: None,
            references: 1,
            reference_list: Vec::new(),
            fan: 0,
            fixed_activation: None,
            noise_value: 0.0,
            noise_time: -1.0,
            assocs: HashMap::new(),
        }
    }

    /// Builder-style [`Chunk::set_slot`].
    pub fn with_slot(mut self, slot: impl Into<String>, value: Value) -> Self {
        self.set_slot(slot, value);
        self
    }

    /// Builder-style [`Chunk::set_fixed_activation`].
    pub fn with_fixed_activation(mut self, activation: f64) -> Self {
        self.fixed_activation = Some(activation);
        self
    }

    /// The chunk's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How this chunk tracks its references.
    pub fn learning(&self) -> LearningMode {
        self.learning
    }

    /// The `isa` slot's text, or an empty string.
    pub fn chunk_type(&self) -> String {
        self.slots
            .get(ISA)
            .map(Value::description)
            .unwrap_or_default()
    }

    /// Assign a slot. The first assignment fixes the slot's display position.
    pub fn set_slot(&mut self, slot: impl Into<String>, value: Value) {
        let slot = slot.into();
        if !self.slots.contains_key(&slot) {
            self.print_order.push(slot.clone());
        }
        self.slots.insert(slot, value);
    }

    /// Raw slot access.
    pub fn slot(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    /// Slot access where an unset `slot0` refers to the chunk itself.
    pub fn slot_value(&self, slot: &str) -> Option<Value> {
        match self.slots.get(slot) {
            Some(value) => Some(value.clone()),
            None if slot == "slot0" => Some(Value::Symbol(self.name.clone())),
            None => None,
        }
    }

    /// Whether `slot` is set.
    pub fn has_slot(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Number of set slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slots in display order.
    pub fn slots(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.print_order
            .iter()
            .filter_map(move |slot| self.slots.get(slot).map(|v| (slot.as_str(), v)))
    }

    /// Chunk names referenced by this chunk's slots, in display order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.slots().filter_map(|(_, value)| value.as_symbol())
    }

    /// Slot names in display order.
    pub fn print_order(&self) -> &[String] {
        &self.print_order
    }

    /// Whether the chunk is in declarative memory.
    pub fn is_committed(&self) -> bool {
        self.creation_time.is_some()
    }

    /// When the chunk entered memory.
    pub fn creation_time(&self) -> Option<f64> {
        self.creation_time
    }

    /// Reference count used by optimized learning.
    pub fn references(&self) -> u32 {
        self.references
    }

    /// Reference times used by history-based learning.
    pub fn reference_list(&self) -> &[f64] {
        &self.reference_list
    }

    /// Number of memory chunks whose slots refer to this chunk.
    pub fn fan(&self) -> u32 {
        self.fan
    }

    pub(crate) fn increment_fan(&mut self) {
        self.fan += 1;
    }

    /// Base-level override, if any.
    pub fn fixed_activation(&self) -> Option<f64> {
        self.fixed_activation
    }

    /// Replace or clear the base-level override.
    pub fn set_fixed_activation(&mut self, activation: Option<f64>) {
        self.fixed_activation = activation;
    }

    /// Enter declarative memory at `now`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk is already committed; a second creation time would
    /// silently corrupt its base-level activation.
    pub fn commit(&mut self, now: f64) {
        assert!(
            self.creation_time.is_none(),
            "chunk '{}' committed twice",
            self.name
        );
        self.creation_time = Some(now);
        if self.learning == LearningMode::ReferenceHistory {
            self.reference_list.push(now);
        }
    }

    /// Enter memory with a simulated history of `references` uses that began
    /// `-time_offset` seconds before `now`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk is already committed.
    pub fn backdate_commit(&mut self, now: f64, time_offset: f64, references: u32) {
        assert!(
            self.creation_time.is_none(),
            "chunk '{}' committed twice",
            self.name
        );
        self.creation_time = Some(now + time_offset);
        match self.learning {
            LearningMode::Optimized => self.references = references,
            LearningMode::ReferenceHistory => self
                .reference_list
                .extend(backdated_references(now, time_offset, references)),
        }
    }

    /// Record a use at `now`. Uncommitted chunks ignore it.
    pub fn add_reference(&mut self, now: f64) {
        if self.creation_time.is_none() {
            return;
        }
        match self.learning {
            LearningMode::Optimized => self.references += 1,
            LearningMode::ReferenceHistory => self.reference_list.push(now),
        }
    }

    /// Base-level activation at `now`; 0 when uncommitted.
    pub fn base_level_activation(&self, now: f64, decay: f64) -> f64 {
        let Some(creation) = self.creation_time else {
            return 0.0;
        };
        match self.learning {
            LearningMode::Optimized => {
                base_level_optimized(self.references, creation, now, decay, self.fixed_activation)
            }
            LearningMode::ReferenceHistory => {
                base_level_from_history(&self.reference_list, now, decay, self.fixed_activation)
            }
        }
    }

    /// Whether this chunk is a symbol in one of `other`'s slots.
    pub fn appears_in_slot_of(&self, other: &Chunk) -> bool {
        other.slots.values().any(|v| v.as_symbol() == Some(self.name.as_str()))
    }

    /// How many of `other`'s slots hold this chunk.
    pub fn frequency_in_slot_of(&self, other: &Chunk) -> usize {
        other
            .slots
            .values()
            .filter(|v| v.as_symbol() == Some(self.name.as_str()))
            .count()
    }

    /// Strength of association from this chunk into `toward`.
    pub fn association_strength<R: Rng + ?Sized>(
        &self,
        toward: &Chunk,
        config: &DeclarativeConfig,
        rng: &mut R,
    ) -> f64 {
        association_strength(&self.name, self.fan, toward, config, rng)
    }

    /// Frequency F(N_self & C_other) stored on `other`.
    pub fn frequency_with(&self, other: &Chunk) -> u32 {
        other.assocs.get(&self.name).map_or(0, |a| a.frequency)
    }

    /// Noise for the current clock tick.
    ///
    /// A new sample is drawn only when `now` differs from the tick of the last
    /// sample; within a tick every caller sees the same value.
    pub fn current_noise<R: Rng + ?Sized>(&mut self, now: f64, noise: Option<f64>, rng: &mut R) -> f64 {
        if now != self.noise_time {
            self.noise_value = noise.map_or(0.0, |s| actr_noise(rng, s));
            self.noise_time = now;
        }
        self.noise_value
    }

    /// The association record for `source`, if any.
    pub fn assoc(&self, source: &str) -> Option<&Association> {
        self.assocs.get(source)
    }

    /// The record for `source`, created empty if missing.
    pub fn assoc_entry(&mut self, source: &str) -> &mut Association {
        self.assocs
            .entry(source.to_string())
            .or_insert_with(|| Association::new(source))
    }

    /// Store a record, replacing any record for the same source.
    pub fn insert_assoc(&mut self, association: Association) {
        self.assocs.insert(association.name.clone(), association);
    }

    /// All association records, in no particular order.
    pub fn assocs(&self) -> impl Iterator<Item = &Association> {
        self.assocs.values()
    }

    /// Fold another chunk's association records into this one.
    ///
    /// Missing records are adopted; shared ones keep the larger strength and
    /// the summed counts.
    pub fn merge_associations(&mut self, from: &Chunk) {
        for (name, incoming) in &from.assocs {
            match self.assocs.get_mut(name) {
                Some(existing) => existing.merge(incoming),
                None => {
                    self.assocs.insert(name.clone(), incoming.clone());
                }
            }
        }
    }

    /// Copy of the slot contents under the same name, not committed.
    pub fn copy_literal(&self) -> Chunk {
        self.copy_as(self.name.clone())
    }

    /// Copy of the slot contents under a new name, not committed.
    pub fn copy_as(&self, name: impl Into<String>) -> Chunk {
        let mut copy = Chunk::new(name, self.learning);
        copy.slots = self.slots.clone();
        copy.print_order = self.print_order.clone();
        copy
    }
}

/// `S(source -> toward)` for a source known only by name and fan.
///
/// A record on `toward` keyed by the source wins; its strength gets
/// exploration noise shrinking with `1/sqrt(learning_count)`. Without a record,
/// a source appearing in `toward`'s slots gets `S - ln(fan)`. Everything else,
/// including a zero fan, is 0.
pub fn association_strength<R: Rng + ?Sized>(
    source: &str,
    source_fan: u32,
    toward: &Chunk,
    config: &DeclarativeConfig,
    rng: &mut R,
) -> f64 {
    if let Some(assoc) = toward.assocs.get(source) {
        if assoc.learning_count == 0 {
            return assoc.sji;
        }
        let exploration = if config.exploration_exploitation_factor == 0.0 {
            0.0
        } else {
            config.exploration_exploitation_factor * actr_noise(rng, config.default_operator_assoc)
        };
        return assoc.sji + exploration / f64::from(assoc.learning_count).sqrt();
    }
    structural_strength(source, source_fan, toward, config)
}

/// `S - ln(fan)` when `source` sits in one of `toward`'s slots, else 0.
/// Learned records are ignored.
pub fn structural_strength(
    source: &str,
    source_fan: u32,
    toward: &Chunk,
    config: &DeclarativeConfig,
) -> f64 {
    let appears = toward.slots.values().any(|v| v.as_symbol() == Some(source));
    if appears && source_fan > 0 {
        config.max_associative_strength - f64::from(source_fan).ln()
    } else {
        0.0
    }
}

/// Chunks are equal when their slots hold the same values, by description.
impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.slots.len() == other.slots.len()
            && self.slots.iter().all(|(slot, value)| {
                other
                    .slots
                    .get(slot)
                    .is_some_and(|v| v.description() == value.description())
            })
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for (slot, value) in self.slots() {
            writeln!(f, "  {}  {}", slot, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn history(name: &str) -> Chunk {
        Chunk::new(name, LearningMode::ReferenceHistory)
    }

    fn optimized(name: &str) -> Chunk {
        Chunk::new(name, LearningMode::Optimized)
    }

    #[test]
    fn test_uncommitted_activation_is_zero() {
        let chunk = history("c").with_slot("isa", Value::Text("fact".into()));
        assert_eq!(chunk.base_level_activation(10.0, 0.5), 0.0);
    }

    #[test]
    #[should_panic(expected = "committed twice")]
    fn test_double_commit_panics() {
        let mut chunk = history("c");
        chunk.commit(0.0);
        chunk.commit(1.0);
    }

    #[test]
    fn test_commit_records_reference_in_history_mode() {
        let mut h = history("h");
        h.commit(2.0);
        assert_eq!(h.reference_list(), &[2.0]);

        let mut o = optimized("o");
        o.commit(2.0);
        assert!(o.reference_list().is_empty());
        assert_eq!(o.references(), 1);
    }

    #[test]
    fn test_add_reference_ignored_before_commit() {
        let mut chunk = optimized("c");
        chunk.add_reference(1.0);
        assert_eq!(chunk.references(), 1);
        chunk.commit(1.0);
        chunk.add_reference(2.0);
        assert_eq!(chunk.references(), 2);
    }

    #[test]
    fn test_base_level_decreases_with_time() {
        let mut chunk = history("c");
        chunk.commit(0.0);
        chunk.add_reference(1.0);
        let mut previous = chunk.base_level_activation(1.5, 0.5);
        for t in [2.0, 5.0, 10.0, 100.0, 1000.0] {
            let b = chunk.base_level_activation(t, 0.5);
            assert!(b < previous, "{} should be below {}", b, previous);
            previous = b;
        }
    }

    #[test]
    fn test_optimized_decreases_with_time() {
        let mut chunk = optimized("c");
        chunk.commit(0.0);
        assert!(chunk.base_level_activation(1.0, 0.5) > chunk.base_level_activation(2.0, 0.5));
    }

    #[test]
    fn test_modes_agree_on_backdated_history() {
        let mut h = history("h");
        h.backdate_commit(1000.0, -1000.0, 1000);
        let mut o = optimized("o");
        o.backdate_commit(1000.0, -1000.0, 1000);

        assert_eq!(h.creation_time(), Some(0.0));
        assert_eq!(o.references(), 1000);
        assert_eq!(h.reference_list().len(), 1000);

        let bh = h.base_level_activation(1000.0, 0.5);
        let bo = o.base_level_activation(1000.0, 0.5);
        assert!((bh - bo).abs() < 0.05, "{} vs {}", bh, bo);
    }

    #[test]
    fn test_fixed_activation_raises_base_level() {
        let mut plain = history("a");
        plain.commit(0.0);
        let mut fixed = history("b").with_fixed_activation(2.0);
        fixed.commit(0.0);
        let expected = (2f64.exp() + 10.05f64.powf(-0.5)).ln();
        assert!((fixed.base_level_activation(10.0, 0.5) - expected).abs() < 1e-12);
        assert!(fixed.base_level_activation(10.0, 0.5) > plain.base_level_activation(10.0, 0.5));
    }

    #[test]
    fn test_association_from_slot_membership() {
        let config = DeclarativeConfig::deterministic();
        let mut source = history("seven");
        source.fan = 2;
        let receiver = history("fact").with_slot("slot1", Value::Symbol("seven".into()));
        let sji = source.association_strength(&receiver, &config, &mut rng());
        assert!((sji - (3.0 - 2f64.ln())).abs() < 1e-12);

        let unrelated = history("other");
        assert_eq!(source.association_strength(&unrelated, &config, &mut rng()), 0.0);
    }

    #[test]
    fn test_association_zero_fan_is_neutral() {
        let config = DeclarativeConfig::deterministic();
        let source = history("seven");
        let receiver = history("fact").with_slot("slot1", Value::Symbol("seven".into()));
        assert_eq!(source.association_strength(&receiver, &config, &mut rng()), 0.0);
    }

    #[test]
    fn test_learned_record_takes_precedence() {
        let config = DeclarativeConfig::deterministic().with_exploration(1.0);
        let goal = history("goal");
        let mut op = history("op");
        op.insert_assoc(Association::with_strength("goal", 1.25, 0));
        // No learning yet: no exploration noise.
        assert_eq!(goal.association_strength(&op, &config, &mut rng()), 1.25);

        op.assoc_entry("goal").learning_count = 4;
        let noisy = goal.association_strength(&op, &config, &mut rng());
        assert_ne!(noisy, 1.25);
        assert!(noisy.is_finite());
    }

    #[test]
    fn test_noise_cached_per_tick() {
        let mut chunk = history("c");
        let mut r = rng();
        let a = chunk.current_noise(1.0, Some(0.5), &mut r);
        let b = chunk.current_noise(1.0, Some(0.5), &mut r);
        assert_eq!(a, b);
        let c = chunk.current_noise(2.0, Some(0.5), &mut r);
        assert_ne!(a, c);
        assert_eq!(chunk.current_noise(3.0, None, &mut r), 0.0);
    }

    #[test]
    fn test_merge_associations() {
        let mut a = history("a");
        a.insert_assoc(Association::with_strength("g", 1.0, 2));
        let mut b = history("b");
        b.insert_assoc(Association::with_strength("g", 0.5, 3));
        b.insert_assoc(Association::with_strength("h", -0.5, 1));

        a.merge_associations(&b);
        assert_eq!(a.assoc("g").unwrap().sji, 1.0);
        assert_eq!(a.assoc("g").unwrap().learning_count, 5);
        assert_eq!(a.assoc("h").unwrap().sji, -0.5);
    }

    #[test]
    fn test_equality_by_slot_content() {
        let mut a = history("a")
            .with_slot("isa", Value::Text("fact".into()))
            .with_slot("slot1", Value::Number(3.0));
        let b = optimized("b")
            .with_slot("slot1", Value::Text("3".into()))
            .with_slot("isa", Value::Text("fact".into()));
        a.commit(5.0);
        assert_eq!(a, b);
        assert_eq!(b, a);

        let c = history("c").with_slot("isa", Value::Text("fact".into()));
        assert_ne!(a, c);
        assert_ne!(c, a);
    }

    #[test]
    fn test_set_slot_keeps_first_position() {
        let mut chunk = history("c");
        chunk.set_slot("isa", Value::Text("fact".into()));
        chunk.set_slot("slot1", Value::Number(1.0));
        chunk.set_slot("isa", Value::Text("goal".into()));
        assert_eq!(chunk.print_order(), &["isa".to_string(), "slot1".to_string()]);
        assert_eq!(chunk.chunk_type(), "goal");
        assert_eq!(chunk.to_string(), "c\n  isa  goal\n  slot1  1\n");
    }

    #[test]
    fn test_slot0_defaults_to_self() {
        let chunk = history("me");
        assert_eq!(chunk.slot_value("slot0"), Some(Value::Symbol("me".into())));
        assert_eq!(chunk.slot_value("slot1"), None);
    }

    #[test]
    fn test_copies_are_shallow_and_uncommitted() {
        let mut original = history("c").with_slot("slot1", Value::Text("x".into()));
        original.commit(1.0);
        original.insert_assoc(Association::new("g"));

        let mut literal = original.copy_literal();
        assert_eq!(literal.name(), "c");
        assert!(!literal.is_committed());
        assert!(literal.assoc("g").is_none());

        literal.set_slot("slot1", Value::Text("y".into()));
        assert_eq!(original.slot("slot1"), Some(&Value::Text("x".into())));

        let renamed = original.copy_as("c1");
        assert_eq!(renamed.name(), "c1");
        assert_eq!(renamed, original);
    }

    #[test]
    fn test_frequency_in_slot_of() {
        let x = history("x");
        let holder = history("h")
            .with_slot("slot1", Value::Symbol("x".into()))
            .with_slot("slot2", Value::Symbol("x".into()))
            .with_slot("slot3", Value::Text("x".into()));
        assert!(x.appears_in_slot_of(&holder));
        assert_eq!(x.frequency_in_slot_of(&holder), 2);
    }
}
