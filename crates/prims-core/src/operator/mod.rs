//! Operator selection.
//!
//! An operator is a chunk of type `operator` whose `condition` slot names a
//! condition chunk and whose `action` slot lists its PRIMs. Selection either
//! matches every condition structurally against a snapshot of the buffers
//! or retrieves the most active operator; the chosen one is then carried out
//! by the production layer.

pub mod config;
pub mod matching;
pub mod selector;
pub mod templates;

pub use config::{OperatorStrategy, ProceduralConfig};
pub use matching::{build_state_snapshot, match_score};
pub use selector::{ConflictSet, OperatorSelector, ProceduralLayer, SelectionOutcome};
pub use templates::{add_operator, construct_merged_list, determine_overlap, MergedList};
