//! ACT-R base-level activation.
//!
//! Reference-history form:
//!
//! ```text
//! B_i = ln(e^fixed + sum((t - t_j + 0.05)^(-d)))
//! ```
//!
//! Optimized-learning form, with `n` references since creation at `t_c`:
//!
//! ```text
//! B_i = ln(e^fixed + n * (t - t_c + 0.05)^(-d) / (1 - d))
//! ```
//!
//! The fixed component is only present when a chunk has a fixed activation.

/// Offset added to every trace age so a reference at `now` stays finite.
pub const TRACE_OFFSET: f64 = 0.05;

/// Contribution of a fixed activation to the trace sum.
pub fn fixed_component(fixed_activation: Option<f64>) -> f64 {
    fixed_activation.map_or(0.0, f64::exp)
}

/// Base-level activation from a full reference history.
///
/// # Example
///
/// ```
/// use prims_core::activation::base_level_from_history;
///
/// let recent = base_level_from_history(&[9.0], 10.0, 0.5, None);
/// let old = base_level_from_history(&[1.0], 10.0, 0.5, None);
/// assert!(recent > old);
/// ```
pub fn base_level_from_history(
    reference_times: &[f64],
    now: f64,
    decay: f64,
    fixed_activation: Option<f64>,
) -> f64 {
    let traces: f64 = reference_times
        .iter()
        .map(|t| (now - t + TRACE_OFFSET).powf(-decay))
        .sum();
    (fixed_component(fixed_activation) + traces).ln()
}

/// Base-level activation from a reference count (optimized learning).
pub fn base_level_optimized(
    references: u32,
    creation_time: f64,
    now: f64,
    decay: f64,
    fixed_activation: Option<f64>,
) -> f64 {
    let lifetime = now - creation_time + TRACE_OFFSET;
    let traces = f64::from(references) * lifetime.powf(-decay) / (1.0 - decay);
    (fixed_component(fixed_activation) + traces).ln()
}

/// Evenly spaced reference times reproducing `references` uses that started
/// `-time_offset` seconds before `now`.
///
/// The first reference falls on `now + time_offset`; the last one falls one
/// step before `now`.
pub fn backdated_references(now: f64, time_offset: f64, references: u32) -> Vec<f64> {
    if references == 0 {
        return Vec::new();
    }
    let creation = now + time_offset;
    let increment = -time_offset / f64::from(references);
    (0..references)
        .map(|i| creation + f64::from(i) * increment)
        .collect()
}
