//! Structural matching of operator conditions against the current state.

use std::collections::HashMap;

use crate::activation::LearningMode;
use crate::chunk::Chunk;
use crate::types::{BufferName, Buffers, Value};

/// Bonus for a repeated-variable pattern that the state satisfies.
pub const PATTERN_BONUS: f64 = 5.0;
/// Penalty for a repeated-variable pattern that the state breaks.
pub const PATTERN_PENALTY: f64 = -1.0;
/// Reward for a slot holding equal values on both sides.
pub const SLOT_MATCH: f64 = 1.0;
/// Penalty for a slot whose values differ in type or exist on one side only.
pub const SLOT_MISMATCH: f64 = -3.0;

/// Merge the numbered slots of the goal, retrieval, imaginal and input
/// buffers into one uncommitted chunk.
///
/// `slot3` of the goal becomes `G3`, of the retrieval buffer `RT3`, of the
/// imaginal buffer `WM3` and of the input buffer `V3`. Other slots are left out.
pub fn build_state_snapshot(buffers: &Buffers, name: impl Into<String>) -> Chunk {
    let mut snapshot = Chunk::new(name, LearningMode::default());
    for buffer in BufferName::SNAPSHOT_SOURCES {
        let (Some(tag), Some(chunk)) = (buffer.snapshot_tag(), buffers.get(buffer)) else {
            continue;
        };
        for (slot, value) in chunk.slots() {
            if let Some(index) = slot.strip_prefix("slot").filter(|i| !i.is_empty()) {
                snapshot.set_slot(format!("{}{}", tag, index), value.clone());
            }
        }
    }
    snapshot
}

/// How well an operator's condition chunk fits a state snapshot.
///
/// Every slot of either chunk is compared, a missing slot reading as `nil`.
/// Slots that are `nil` on both sides are skipped. Equal values add
/// [`SLOT_MATCH`]; a type difference or a `nil` on one side adds
/// [`SLOT_MISMATCH`].
///
/// A symbol that the condition holds in two or more slots is a repeated
/// variable. The state satisfies it when those slots hold one and the same
/// symbol and no other slot holds it ([`PATTERN_BONUS`]); otherwise the
/// pattern scores [`PATTERN_PENALTY`].
pub fn match_score(condition: &Chunk, snapshot: &Chunk) -> f64 {
    let nil = Value::nil();
    let mut score = 0.0;

    let slots = condition
        .print_order()
        .iter()
        .chain(snapshot.print_order().iter().filter(|s| !condition.has_slot(s)));
    for slot in slots {
        let state = snapshot.slot(slot).unwrap_or(&nil);
        let wanted = condition.slot(slot).unwrap_or(&nil);
        if state.is_nil() && wanted.is_nil() {
            continue;
        }
        if state.is_equal(wanted) {
            score += SLOT_MATCH;
        }
        if state.type_name() != wanted.type_name() || state.is_nil() || wanted.is_nil() {
            score += SLOT_MISMATCH;
        }
    }

    for group in repeated_variables(condition) {
        score += if pattern_holds(&group, snapshot) {
            PATTERN_BONUS
        } else {
            PATTERN_PENALTY
        };
    }
    score
}

/// Slots of `condition` grouped by the symbol they hold, for symbols held
/// in more than one slot. Groups follow the condition's slot order.
fn repeated_variables(condition: &Chunk) -> Vec<Vec<&str>> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (slot, value) in condition.slots() {
        let Some(symbol) = value.as_symbol() else {
            continue;
        };
        match index.get(symbol) {
            Some(&i) => groups[i].1.push(slot),
            None => {
                index.insert(symbol, groups.len());
                groups.push((symbol, vec![slot]));
            }
        }
    }
    groups
        .into_iter()
        .filter(|(_, slots)| slots.len() > 1)
        .map(|(_, slots)| slots)
        .collect()
}

fn pattern_holds(group: &[&str], snapshot: &Chunk) -> bool {
    let bound: Option<Vec<&str>> = group
        .iter()
        .map(|slot| snapshot.slot(slot).and_then(Value::as_symbol))
        .collect();
    let Some(bound) = bound else {
        return false;
    };
    let id = bound[0];
    snapshot.slots().all(|(slot, value)| {
        if group.contains(&slot) {
            value.as_symbol() == Some(id)
        } else {
            value.as_symbol() != Some(id)
        }
    })
}
