//! One-pole smoothers modelled on an RC network.
//!
//! Cutoff `fc = 1 / (2*pi*T)` where `T` is the time constant in samples. After
//! `T` samples a step response has covered `1 - e^-1` of the distance. A time
//! constant of 1 gives an immediate step and shorter ones are clamped to it.

use crate::iir::{Filter, Float};

#[inline]
fn k_from_freq<T: Float>(freq: T) -> T {
    T::TAU() * freq.max(T::zero()).min(T::from_f64(0.5))
}

#[inline]
fn k_from_time_constant<T: Float>(tc: T) -> T {
    T::one() / tc.max(T::one())
}

/// `y += (x - y) * k`
#[derive(Debug, Clone, Default)]
pub struct LagFilter<T: Float> {
    k: T,
    s: T,
}

impl<T: Float> LagFilter<T> {
    pub fn new(freq: T) -> Self {
        LagFilter { k: k_from_freq(freq), s: T::zero() }
    }

    pub fn with_time_constant(tc: T) -> Self {
        LagFilter { k: k_from_time_constant(tc), s: T::zero() }
    }

    pub fn freq(&self) -> T {
        self.k / T::TAU()
    }

    pub fn set_freq(&mut self, freq: T) {
        self.k = k_from_freq(freq);
    }

    pub fn set_time_constant(&mut self, tc: T) {
        self.k = k_from_time_constant(tc);
    }

    pub fn last_value(&self) -> T {
        self.s
    }

    /// Jumps straight to `v` without a transient.
    pub fn reset_to(&mut self, v: T) {
        self.s = v;
    }
}

impl<T: Float> Filter<T> for LagFilter<T> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.s = self.s + (x - self.s) * self.k;
        self.s
    }

    fn reset(&mut self) {
        self.reset_to(T::zero());
    }
}

/// High-pass complement of [`LagFilter`]: `y = x - s; s += (x - s) * k`.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter<T: Float> {
    k: T,
    s: T,
    out: T,
}

impl<T: Float> LeadFilter<T> {
    pub fn new(freq: T) -> Self {
        LeadFilter { k: k_from_freq(freq), s: T::zero(), out: T::zero() }
    }

    pub fn freq(&self) -> T {
        self.k / T::TAU()
    }

    pub fn set_freq(&mut self, freq: T) {
        self.k = k_from_freq(freq);
    }

    pub fn set_time_constant(&mut self, tc: T) {
        self.k = k_from_time_constant(tc);
    }

    pub fn last_value(&self) -> T {
        self.out
    }

    pub fn reset_to(&mut self, v: T) {
        self.s = v;
        self.out = v;
    }
}

impl<T: Float> Filter<T> for LeadFilter<T> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.out = x - self.s;
        self.s = self.s + (x - self.s) * self.k;
        self.out
    }

    fn reset(&mut self) {
        self.reset_to(T::zero());
    }
}

/// `y += x - y * k`. Like a lag but with a constant gain-bandwidth product, so
/// the DC gain is `1/k`.
#[derive(Debug, Clone, Default)]
pub struct LeakyIntegrator<T: Float> {
    k: T,
    s: T,
}

impl<T: Float> LeakyIntegrator<T> {
    pub fn new(freq: T) -> Self {
        LeakyIntegrator { k: k_from_freq(freq), s: T::zero() }
    }

    pub fn freq(&self) -> T {
        self.k / T::TAU()
    }

    pub fn set_freq(&mut self, freq: T) {
        self.k = k_from_freq(freq);
    }

    pub fn last_value(&self) -> T {
        self.s
    }

    pub fn reset_to(&mut self, v: T) {
        self.s = v;
    }
}

impl<T: Float> Filter<T> for LeakyIntegrator<T> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.s = self.s + x - self.s * self.k;
        self.s
    }

    fn reset(&mut self) {
        self.reset_to(T::zero());
    }
}

pub type LagFilterF = LagFilter<f32>;
pub type LagFilterD = LagFilter<f64>;
pub type LeadFilterF = LeadFilter<f32>;
pub type LeadFilterD = LeadFilter<f64>;
pub type LeakyIntegratorF = LeakyIntegrator<f32>;
pub type LeakyIntegratorD = LeakyIntegrator<f64>;
