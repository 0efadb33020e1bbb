//! Association records (Sji).

use serde::{Deserialize, Serialize};

/// A learned association into the chunk that owns the record.
///
/// Records live on the receiving chunk and name the source chunk, so
/// `receiver.assocs[source]` holds `S(source -> receiver)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    /// Name of the source chunk.
    pub name: String,
    /// Association strength. May be negative.
    pub sji: f64,
    /// Posterior strength from the last associative-learning pass.
    #[serde(default)]
    pub posterior_sji: f64,
    /// Number of learning updates applied to `sji`.
    pub learning_count: u32,
    /// F(Ni & Cj): co-occurrences of the source in context with the receiver retrieved.
    #[serde(default)]
    pub frequency: u32,
}

impl Association {
    /// An empty record for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_strength(name, 0.0, 0)
    }

    pub fn with_strength(name: impl Into<String>, sji: f64, learning_count: u32) -> Self {
        Self {
            name: name.into(),
            sji,
            posterior_sji: 0.0,
            learning_count,
            frequency: 0,
        }
    }

    /// Moving-average step toward `target`, counting one learning event.
    pub fn learn(&mut self, target: f64, beta: f64) {
        self.sji += beta * (target - self.sji);
        self.learning_count += 1;
    }

    /// Combine with an independently learned record for the same pair.
    ///
    /// Keeps the stronger strength and pools the evidence counters.
    pub fn merge(&mut self, other: &Association) {
        debug_assert_eq!(self.name, other.name);
        self.sji = self.sji.max(other.sji);
        self.learning_count += other.learning_count;
        self.frequency += other.frequency;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_max_and_sums() {
        let mut a = Association::with_strength("goal", 1.0, 3);
        let b = Association::with_strength("goal", 2.5, 4);
        a.merge(&b);
        assert_eq!(a.sji, 2.5);
        assert_eq!(a.learning_count, 7);

        let mut c = Association::with_strength("goal", 4.0, 1);
        c.merge(&Association::with_strength("goal", -1.0, 2));
        assert_eq!(c.sji, 4.0);
        assert_eq!(c.learning_count, 3);
    }

    #[test]
    fn test_learn_moves_toward_target() {
        let mut a = Association::new("goal");
        a.learn(2.0, 0.5);
        assert_eq!(a.sji, 1.0);
        a.learn(2.0, 0.5);
        assert_eq!(a.sji, 1.5);
        assert_eq!(a.learning_count, 2);
    }
}
