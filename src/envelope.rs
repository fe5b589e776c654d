use crate::iir::{Filter, Float};
use crate::smoothing::LagFilter;

/// Rectifying peak follower with separate attack and release speeds.
///
/// The cutoffs are stored as frequencies, `fc = 1 / (2*pi*T)`, so the per
/// sample work is one comparison and one lag update. A freshly constructed
/// follower has both cutoffs at zero and holds its value until the time
/// constants are set.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeFollower<T: Float> {
    lag: LagFilter<T>,
    attack_fc: T,
    release_fc: T,
}

#[inline]
fn fc_from_time_constant<T: Float>(tc: T) -> T {
    T::one() / (T::TAU() * tc.max(T::one()))
}

/// Same thing under the name the level meters use.
pub type EnvelopeDetector<T> = EnvelopeFollower<T>;

impl<T: Float> EnvelopeFollower<T> {
    /// Time constants in samples.
    pub fn new(attack_tc: T, release_tc: T) -> Self {
        let mut env = Self::default();
        env.set_attack_tc(attack_tc);
        env.set_release_tc(release_tc);
        env
    }

    /// Clamped to at least one sample.
    pub fn set_attack_tc(&mut self, tc: T) {
        self.attack_fc = fc_from_time_constant(tc);
    }

    pub fn set_release_tc(&mut self, tc: T) {
        self.release_fc = fc_from_time_constant(tc);
    }

    pub fn value(&self) -> T {
        self.lag.last_value()
    }

    /// Runs the follower over a block without keeping the output.
    pub fn track(&mut self, input: &[T]) {
        for &x in input {
            self.process(x);
        }
    }
}

impl<T: Float> Filter<T> for EnvelopeFollower<T> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        let v = x.abs();
        let fc = if v > self.lag.last_value() { self.attack_fc } else { self.release_fc };
        self.lag.set_freq(fc);
        self.lag.process(v)
    }

    fn reset(&mut self) {
        self.lag.reset();
    }
}

pub type EnvelopeFollowerF = EnvelopeFollower<f32>;
pub type EnvelopeFollowerD = EnvelopeFollower<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rises_on_attack_and_falls_on_release() {
        let mut env = EnvelopeFollowerD::new(10.0, 1000.0);
        let mut prev = 0.0;
        for _ in 0..200 {
            let y = env.process(-1.0);
            assert!(y >= prev);
            prev = y;
        }
        assert!(prev > 0.99);

        for _ in 0..200 {
            let y = env.process(0.0);
            assert!(y <= prev);
            prev = y;
        }
        // slow release keeps most of the level
        assert!(prev > 0.8);
    }

    #[test]
    fn attack_time_constant() {
        let tc = 100.0;
        let mut env = EnvelopeFollowerD::new(tc, 10_000.0);
        let mut y = 0.0;
        for _ in 0..100 {
            y = env.process(0.5);
        }
        assert_relative_eq!(y / 0.5, 1.0 - (-1.0f64).exp(), epsilon = 5e-3);
    }

    #[test]
    fn release_time_constant() {
        let tc = 200.0;
        let mut env = EnvelopeFollowerD::new(1.0, tc);
        assert_relative_eq!(env.process(1.0), 1.0, epsilon = 1e-12);
        let mut y = 1.0;
        for _ in 0..200 {
            y = env.process(0.0);
        }
        assert_relative_eq!(y, (-1.0f64).exp(), epsilon = 2e-3);
    }

    #[test]
    fn reset_is_exact() {
        let mut env = EnvelopeFollowerF::new(5.0, 50.0);
        env.track(&[0.3, -0.9, 0.4, 0.2]);
        assert!(env.value() > 0.0);
        env.reset();
        assert_eq!(env.value(), 0.0);
        assert_eq!(env.process(0.0), 0.0);
    }

    #[test]
    fn zero_time_constants_track_without_blowing_up() {
        let mut env = EnvelopeFollowerD::new(0.0, 0.0);
        for n in 0..50 {
            let x = if n % 2 == 0 { 1.0 } else { 0.25 };
            let y = env.process(x);
            assert_relative_eq!(y, x, epsilon = 1e-9);
        }
    }

    #[test]
    fn unconfigured_follower_holds() {
        let mut env = EnvelopeFollowerF::default();
        assert_eq!(env.process(1.0), 0.0);
    }
}
