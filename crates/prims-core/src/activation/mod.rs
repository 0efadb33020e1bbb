//! ACT-R activation equations used by declarative memory.
//!
//! The total activation of a committed chunk `i` at time `t` is:
//!
//! ```text
//! A_i = B_i + S_i + noise
//! ```
//!
//! - `B_i` is base-level activation (recency and frequency of use)
//! - `S_i` is spreading activation from the attended buffers
//! - `noise` is a logistic sample, redrawn once per clock tick
//!
//! This module holds the parameters and the pure equations. Chunks and the
//! memory store combine them; see [`crate::chunk`] and [`crate::declarative`].

pub mod base_level;
pub mod config;
pub mod noise;

pub use base_level::{
    backdated_references, base_level_from_history, base_level_optimized, fixed_component,
    TRACE_OFFSET,
};
pub use config::{DeclarativeConfig, LearningMode, SpreadingMode};
pub use noise::{activation_noise, actr_noise, logistic_std_dev, logistic_variance};
