//! prims-core - Core library for PRIMs.
//!
//! This crate provides the declarative memory and operator selection core of
//! the PRIMs cognitive architecture: ACT-R base-level learning, spreading
//! activation, activation noise, goal-operator reinforcement learning and
//! structural operator matching.
//!
//! # Example
//!
//! ```ignore
//! use prims_core::{Buffers, BufferName, DeclarativeConfig, DeclarativeMemory, Value};
//!
//! let mut memory = DeclarativeMemory::new(DeclarativeConfig::default());
//! let fact = memory.new_chunk("fact1").with_slot("isa", Value::Text("fact".into()));
//! memory.add_to_memory(fact, 0.0)?;
//!
//! let activation = memory.activation("fact1", 1.0, &Buffers::new());
//! ```

pub mod activation;
pub mod chunk;
pub mod config;
pub mod declarative;
pub mod error;
pub mod operator;
pub mod persist;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use activation::{DeclarativeConfig, LearningMode, SpreadingMode};
pub use chunk::{Chunk, ISA};
pub use config::ModelConfig;
pub use declarative::{
    ActivationBreakdown, DeclarativeMemory, PosteriorUpdate, RetrievalOutcome, Spreading,
};
pub use error::{ErrorCode, PrimsError, PrimsResult};
pub use operator::{
    ConflictSet, OperatorSelector, OperatorStrategy, ProceduralConfig, ProceduralLayer,
    SelectionOutcome,
};
pub use persist::{ChunkRecord, ExportStats, ImportStats};
pub use trace::{MemoryTrace, TraceConfig, TraceSink, TracingSink};
pub use types::{Association, BufferName, Buffers, Value};
