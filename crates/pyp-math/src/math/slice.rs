//! Univariate slice sampling (stepping out + shrinkage).
//!
//! Used to resample Pitman-Yor hyperparameters, where the target is an
//! unnormalized log density over a bounded or half-bounded interval.

use rand::Rng;

use super::sampling::{uniform_open, uniform_range};

/// Stepping-out slice sampler for a single real parameter.
#[derive(Debug, Clone, Copy)]
pub struct SliceSampler {
    /// Initial bracket width.
    pub width: f64,
    /// Maximum number of step-out expansions on each side.
    pub max_steps: usize,
    /// Lower support bound (exclusive).
    pub lower: f64,
    /// Upper support bound (exclusive).
    pub upper: f64,
}

impl Default for SliceSampler {
    fn default() -> Self {
        SliceSampler {
            width: 1.0,
            max_steps: 32,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }
}

impl SliceSampler {
    pub fn new(width: f64, lower: f64, upper: f64) -> Self {
        SliceSampler {
            width,
            lower,
            upper,
            ..Default::default()
        }
    }

    /// One slice-sampling transition from `x0`.
    ///
    /// If `x0` has no density (or lies outside the bounds), it is returned
    /// unchanged.
    pub fn step<R, F>(&self, x0: f64, log_density: F, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
        F: Fn(f64) -> f64,
    {
        let in_support = |x: f64| x > self.lower && x < self.upper;
        if !in_support(x0) {
            return x0;
        }
        let f0 = log_density(x0);
        if !f0.is_finite() {
            return x0;
        }
        let level = f0 + uniform_open(rng).ln();
        let above = |x: f64| in_support(x) && log_density(x) > level;

        let mut left = x0 - self.width * uniform_open(rng);
        let mut right = left + self.width;
        let mut steps_left = (uniform_open(rng) * self.max_steps as f64) as usize;
        let mut steps_right = self.max_steps.saturating_sub(1 + steps_left);
        while steps_left > 0 && above(left) {
            left -= self.width;
            steps_left -= 1;
        }
        while steps_right > 0 && above(right) {
            right += self.width;
            steps_right -= 1;
        }
        left = left.max(self.lower);
        right = right.min(self.upper);

        // Shrink toward x0 until a point on the slice is found. x0 itself is
        // on the slice, so the bracket cannot collapse past it.
        loop {
            let x = uniform_range(rng, left, right);
            if above(x) {
                return x;
            }
            if x < x0 {
                left = x;
            } else {
                right = x;
            }
            if right - left < 1e-12 {
                return x0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn stays_inside_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let sampler = SliceSampler::new(0.5, 0.0, 1.0);
        let mut x = 0.5;
        for _ in 0..2_000 {
            x = sampler.step(x, |_| 0.0, &mut rng);
            assert!(x > 0.0 && x < 1.0);
        }
    }

    #[test]
    fn recovers_gaussian_mean() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let sampler = SliceSampler::default();
        let mut x = 0.0;
        let mut sum = 0.0;
        let n = 20_000;
        for _ in 0..n {
            x = sampler.step(x, |v| -0.5 * (v - 3.0) * (v - 3.0), &mut rng);
            sum += x;
        }
        let mean = sum / n as f64;
        assert!((mean - 3.0).abs() < 0.1, "mean={mean}");
    }

    #[test]
    fn zero_density_start_is_fixed_point() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let sampler = SliceSampler::new(1.0, 0.0, 10.0);
        assert_eq!(sampler.step(20.0, |_| 0.0, &mut rng), 20.0);
        assert_eq!(
            sampler.step(2.0, |_| f64::NEG_INFINITY, &mut rng),
            2.0
        );
    }
}
