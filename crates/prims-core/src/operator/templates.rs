//! Operator action templates.
//!
//! New operators reuse the action order of the registered operator they
//! share the longest prefix with, so that operators built from the same
//! PRIMs keep them in the same order.

use tracing::debug;

use crate::chunk::Chunk;
use crate::declarative::DeclarativeMemory;
use crate::error::{PrimsError, PrimsResult};
use crate::types::Value;

/// Separator of the textual action list.
pub const ACTION_SEPARATOR: &str = ";";

/// Length of the longest common prefix of two action lists.
pub fn determine_overlap(old: &[String], new: &[String]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

/// An action list in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedList {
    /// Actions joined by [`ACTION_SEPARATOR`].
    pub text: String,
    pub actions: Vec<String>,
}

/// The first `overlap` actions of `template`, followed by every action of
/// `source` that is neither in the template nor already in the list.
pub fn construct_merged_list(template: &[String], source: &[String], overlap: usize) -> MergedList {
    let mut actions: Vec<String> = template.iter().take(overlap).cloned().collect();
    for action in source {
        if !template.contains(action) && !actions.contains(action) {
            actions.push(action.clone());
        }
    }
    MergedList {
        text: actions.join(ACTION_SEPARATOR),
        actions,
    }
}

/// Give `op` its condition and an action list ordered after the best
/// registered template, then register `op` as a template itself.
///
/// The best template shares the longest prefix with `actions`; ties go to
/// the template whose operator has the higher base-level activation at
/// `now`. Templates whose operator is no longer in memory are skipped.
pub fn add_operator(
    memory: &mut DeclarativeMemory,
    op: &mut Chunk,
    condition: &str,
    actions: &[String],
    now: f64,
) -> PrimsResult<MergedList> {
    if op.chunk_type() != "operator" {
        return Err(PrimsError::not_operator(op.name()));
    }

    let mut best: Option<(&[String], usize, f64)> = None;
    for (name, template) in memory.operator_templates() {
        let Some(chunk) = memory.chunk(name) else {
            continue;
        };
        let activation = chunk.base_level_activation(now, memory.config().decay);
        let overlap = determine_overlap(template, actions);
        let better = match best {
            None => true,
            Some((_, best_overlap, best_activation)) => {
                overlap > best_overlap || (overlap == best_overlap && activation > best_activation)
            }
        };
        if better {
            best = Some((template, overlap, activation));
        }
    }

    let merged = match best {
        Some((template, overlap, _)) => construct_merged_list(template, actions, overlap),
        None => construct_merged_list(&[], actions, 0),
    };
    debug!(operator = op.name(), actions = %merged.text, "Built operator actions");

    op.set_slot("condition", Value::Symbol(condition.to_string()));
    op.set_slot("action", Value::Text(merged.text.clone()));
    memory.register_template(op.name(), merged.actions.clone());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::DeclarativeConfig;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn operator(memory: &DeclarativeMemory, name: &str) -> Chunk {
        memory.new_chunk(name).with_slot("isa", Value::Text("operator".into()))
    }

    #[test]
    fn test_determine_overlap() {
        assert_eq!(determine_overlap(&list(&["a", "b", "c"]), &list(&["a", "b", "x"])), 2);
        assert_eq!(determine_overlap(&list(&["a"]), &list(&["b"])), 0);
        assert_eq!(determine_overlap(&list(&["a", "b"]), &list(&["a", "b", "c"])), 2);
        assert_eq!(determine_overlap(&[], &list(&["a"])), 0);
    }

    #[test]
    fn test_construct_merged_list() {
        let merged = construct_merged_list(&list(&["a", "b"]), &list(&["b", "c"]), 1);
        assert_eq!(merged.actions, list(&["a", "c"]));
        assert_eq!(merged.text, "a;c");
    }

    #[test]
    fn test_construct_without_template_dedupes_source() {
        let merged = construct_merged_list(&[], &list(&["x", "y", "x"]), 0);
        assert_eq!(merged.actions, list(&["x", "y"]));
        assert_eq!(merged.text, "x;y");
    }

    #[test]
    fn test_add_operator_reuses_best_template() {
        let mut memory = DeclarativeMemory::new(DeclarativeConfig::deterministic());
        let old = operator(&memory, "op-old");
        memory.add_to_memory(old, 0.0).unwrap();
        memory.register_template("op-old", list(&["a", "b", "c"]));

        let mut op = operator(&memory, "op-new");
        let merged = add_operator(&mut memory, &mut op, "cond1", &list(&["a", "b", "d"]), 1.0).unwrap();
        assert_eq!(merged.actions, list(&["a", "b", "d"]));
        assert_eq!(op.slot("action"), Some(&Value::Text("a;b;d".into())));
        assert_eq!(op.slot("condition"), Some(&Value::Symbol("cond1".into())));
        assert_eq!(memory.operator_templates().last().unwrap().0, "op-new");
    }

    #[test]
    fn test_add_operator_breaks_ties_by_activation() {
        let mut memory = DeclarativeMemory::new(DeclarativeConfig::deterministic());
        let weak = operator(&memory, "weak");
        let strong = operator(&memory, "strong");
        memory.add_to_memory(weak, 0.0).unwrap();
        memory.add_to_memory(strong.with_slot("slot1", Value::Text("s".into())), 0.0).unwrap();
        for t in [1.0, 2.0, 3.0] {
            memory.chunk_mut("strong").unwrap().add_reference(t);
        }
        memory.register_template("weak", list(&["a", "x"]));
        memory.register_template("strong", list(&["a", "y"]));
        memory.register_template("gone", list(&["a", "b", "z", "x"]));

        let mut op = operator(&memory, "op");
        let merged = add_operator(&mut memory, &mut op, "cond", &list(&["a", "b", "x"]), 4.0).unwrap();
        // "gone" has the longest overlap but is not in memory; "strong" wins the tie.
        assert_eq!(merged.actions, list(&["a", "b", "x"]));
    }

    #[test]
    fn test_add_operator_rejects_non_operator() {
        let mut memory = DeclarativeMemory::new(DeclarativeConfig::deterministic());
        let mut fact = memory.new_chunk("fact");
        let err = add_operator(&mut memory, &mut fact, "c", &list(&["a"]), 0.0).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ChunkNotOperator);
    }
}
