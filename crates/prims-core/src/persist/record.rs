//! Lossless chunk records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::activation::LearningMode;
use crate::chunk::Chunk;
use crate::error::{PrimsError, PrimsResult};
use crate::types::{Association, Value};

/// Stored in place of a missing creation time.
///
/// A chunk really created at this time is marked with
/// [`ChunkRecord::committed_at_sentinel`].
pub const NO_CREATION_TIME: f64 = -1.0;
/// Stored in place of a missing fixed activation.
pub const NO_FIXED_ACTIVATION: f64 = -1000.0;

/// A chunk in its external form.
///
/// Slot values are stored as text and come back as [`Value::Text`]; the
/// store turns them into numbers and symbols again once every chunk is
/// loaded. Activation noise is not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub name: String,
    pub slot_values: BTreeMap<String, String>,
    pub print_order: Vec<String>,
    pub fan: u32,
    pub references: u32,
    pub creation_time: f64,
    /// `creation_time` is a real time that happens to equal [`NO_CREATION_TIME`].
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub committed_at_sentinel: bool,
    pub reference_list: Vec<f64>,
    pub fixed_activation: f64,
    pub assoc_strengths: BTreeMap<String, f64>,
    pub assoc_counts: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assoc_frequencies: BTreeMap<String, u32>,
}

impl From<&Chunk> for ChunkRecord {
    fn from(chunk: &Chunk) -> Self {
        let mut assoc_strengths = BTreeMap::new();
        let mut assoc_counts = BTreeMap::new();
        let mut assoc_frequencies = BTreeMap::new();
        for assoc in chunk.assocs.values() {
            assoc_strengths.insert(assoc.name.clone(), assoc.sji);
            assoc_counts.insert(assoc.name.clone(), assoc.learning_count);
            if assoc.frequency > 0 {
                assoc_frequencies.insert(assoc.name.clone(), assoc.frequency);
            }
        }
        Self {
            name: chunk.name().to_string(),
            slot_values: chunk
                .slots
                .iter()
                .map(|(slot, value)| (slot.clone(), value.description()))
                .collect(),
            print_order: chunk.print_order.clone(),
            fan: chunk.fan,
            references: chunk.references,
            creation_time: chunk.creation_time.unwrap_or(NO_CREATION_TIME),
            committed_at_sentinel: chunk.creation_time == Some(NO_CREATION_TIME),
            reference_list: chunk.reference_list.clone(),
            fixed_activation: chunk.fixed_activation.unwrap_or(NO_FIXED_ACTIVATION),
            assoc_strengths,
            assoc_counts,
            assoc_frequencies,
        }
    }
}

impl ChunkRecord {
    /// Rebuild the chunk in the given learning mode.
    pub fn into_chunk(self, learning: LearningMode) -> PrimsResult<Chunk> {
        if let Some(slot) = self.print_order.iter().find(|s| !self.slot_values.contains_key(*s)) {
            return Err(PrimsError::missing_field(format!(
                "Chunk '{}' lists slot '{}' without a value",
                self.name, slot
            )));
        }

        let mut assocs = HashMap::with_capacity(self.assoc_strengths.len());
        for (source, sji) in &self.assoc_strengths {
            let count = self.assoc_counts.get(source).ok_or_else(|| {
                PrimsError::missing_field(format!(
                    "Chunk '{}' has a strength but no learning count for '{}'",
                    self.name, source
                ))
            })?;
            let mut assoc = Association::with_strength(source.clone(), *sji, *count);
            assoc.frequency = self.assoc_frequencies.get(source).copied().unwrap_or(0);
            assocs.insert(source.clone(), assoc);
        }

        let mut chunk = Chunk::new(self.name, learning);
        chunk.slots = self
            .slot_values
            .into_iter()
            .map(|(slot, text)| (slot, Value::Text(text)))
            .collect();
        chunk.print_order = self.print_order;
        chunk.fan = self.fan;
        chunk.references = self.references;
        chunk.creation_time = (self.committed_at_sentinel || self.creation_time != NO_CREATION_TIME)
            .then_some(self.creation_time);
        chunk.reference_list = self.reference_list;
        chunk.fixed_activation =
            (self.fixed_activation != NO_FIXED_ACTIVATION).then_some(self.fixed_activation);
        chunk.assocs = assocs;
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn sample() -> Chunk {
        let mut chunk = Chunk::new("fact1", LearningMode::ReferenceHistory)
            .with_slot("isa", Value::Text("fact".into()))
            .with_slot("slot1", Value::Symbol("seven".into()))
            .with_slot("slot2", Value::Number(3.0))
            .with_fixed_activation(1.5);
        chunk.commit(2.0);
        chunk.add_reference(4.0);
        chunk.fan = 2;
        chunk.insert_assoc(Association::with_strength("goal1", -0.75, 3));
        chunk
    }

    #[test]
    fn test_round_trip_fields() {
        let original = sample();
        let record = ChunkRecord::from(&original);
        assert_eq!(record.slot_values.get("slot2").map(String::as_str), Some("3"));
        assert_eq!(record.creation_time, 2.0);

        let decoded = record.clone().into_chunk(LearningMode::ReferenceHistory).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.print_order(), original.print_order());
        assert_eq!(decoded.fan(), 2);
        assert_eq!(decoded.references(), original.references());
        assert_eq!(decoded.creation_time(), Some(2.0));
        assert_eq!(decoded.reference_list(), &[2.0, 4.0]);
        assert_eq!(decoded.fixed_activation(), Some(1.5));
        let assoc = decoded.assoc("goal1").unwrap();
        assert_eq!((assoc.sji, assoc.learning_count), (-0.75, 3));
        assert_eq!(ChunkRecord::from(&decoded), record);
    }

    #[test]
    fn test_sentinels_for_absent_values() {
        let chunk = Chunk::new("loose", LearningMode::Optimized);
        let record = ChunkRecord::from(&chunk);
        assert_eq!(record.creation_time, NO_CREATION_TIME);
        assert_eq!(record.fixed_activation, NO_FIXED_ACTIVATION);

        let decoded = record.into_chunk(LearningMode::Optimized).unwrap();
        assert!(!decoded.is_committed());
        assert_eq!(decoded.fixed_activation(), None);
    }

    #[test]
    fn test_backdated_to_sentinel_time_stays_committed() {
        let mut chunk = Chunk::new("old", LearningMode::Optimized);
        chunk.backdate_commit(0.0, -1.0, 5);
        assert_eq!(chunk.creation_time(), Some(NO_CREATION_TIME));

        let record = ChunkRecord::from(&chunk);
        assert!(record.committed_at_sentinel);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["committed_at_sentinel"], true);

        let decoded = record.into_chunk(LearningMode::Optimized).unwrap();
        assert_eq!(decoded.creation_time(), Some(-1.0));
        assert_eq!(decoded.references(), 5);
    }

    #[test]
    fn test_missing_count_is_an_error() {
        let mut record = ChunkRecord::from(&sample());
        record.assoc_counts.clear();
        let err = record.into_chunk(LearningMode::ReferenceHistory).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseMissingField);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(ChunkRecord::from(&sample())).unwrap();
        assert_eq!(json["assoc_counts"]["goal1"], 3);
        assert_eq!(json["fixed_activation"], 1.5);
        assert!(json.get("assoc_frequencies").is_none());
        assert!(json.get("committed_at_sentinel").is_none());
    }
}
