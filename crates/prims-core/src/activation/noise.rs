//! Logistic noise for ACT-R activation.
//!
//! ACT-R perturbs activations with samples from a logistic distribution with
//! mean 0 and scale `s`:
//!
//! ```text
//! noise = s * ln(u / (1 - u)),   u ~ Uniform(0, 1)
//! ```
//!
//! The same sampler drives exploration noise on learned goal-operator
//! associations, where the scale is the default operator association.

use rand::Rng;
use std::f64::consts::PI;

/// Draw one logistic noise sample with scale `s`.
///
/// `u` is kept away from 0 and 1 so the sample is always finite.
pub fn actr_noise<R: Rng + ?Sized>(rng: &mut R, s: f64) -> f64 {
    let u: f64 = rng.gen_range(0.00001..0.99999);
    s * (u / (1.0 - u)).ln()
}

/// Activation noise for a store whose noise parameter may be disabled.
pub fn activation_noise<R: Rng + ?Sized>(rng: &mut R, s: Option<f64>) -> f64 {
    s.map_or(0.0, |s| actr_noise(rng, s))
}

/// Variance of the logistic distribution: `(s * pi)^2 / 3`.
pub fn logistic_variance(scale: f64) -> f64 {
    (scale * PI).powi(2) / 3.0
}

/// Standard deviation of the logistic distribution.
pub fn logistic_std_dev(scale: f64) -> f64 {
    logistic_variance(scale).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_noise_distribution() {
        let mut rng = seeded_rng();
        let scale = 0.4;

        let samples: Vec<f64> = (0..10000).map(|_| actr_noise(&mut rng, scale)).collect();

        let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.1, "Mean {} should be close to 0", mean);

        let variance: f64 =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        let std_dev = variance.sqrt();
        let expected_std = logistic_std_dev(scale);
        assert!(
            (std_dev - expected_std).abs() < 0.1,
            "Std dev {} should be close to theoretical {}",
            std_dev,
            expected_std
        );
    }

    #[test]
    fn test_disabled_noise_is_zero() {
        let mut rng = seeded_rng();
        assert_eq!(activation_noise(&mut rng, None), 0.0);
    }

    #[test]
    fn test_noise_scale_effect() {
        let mut rng = seeded_rng();

        let small: f64 = (0..1000).map(|_| actr_noise(&mut rng, 0.1).abs()).sum::<f64>() / 1000.0;
        let large: f64 = (0..1000).map(|_| actr_noise(&mut rng, 1.0).abs()).sum::<f64>() / 1000.0;

        assert!(
            large > small * 5.0,
            "Larger scale should produce larger noise: {} vs {}",
            large,
            small
        );
    }

    #[test]
    fn test_samples_are_finite() {
        let mut rng = seeded_rng();
        assert!((0..10000).all(|_| actr_noise(&mut rng, 4.0).is_finite()));
    }

    #[test]
    fn test_logistic_statistics() {
        let variance = logistic_variance(0.4);
        assert!((logistic_std_dev(0.4).powi(2) - variance).abs() < 0.0001);
        // (0.4 * pi)^2 / 3 ≈ 0.526
        assert!((variance - 0.526).abs() < 0.01);
    }
}
