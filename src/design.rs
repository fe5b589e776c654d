//! Coefficient design for the IIR sections in [`crate::iir`].
//!
//! All frequencies are normalized (cycles per sample, i.e. Hz / sample rate).
//! Every designer recomputes the full coefficient set whenever one of its
//! parameters changes. Second order shapes follow the RBJ audio EQ cookbook.

use crate::iir::{Coefs1, Coefs2, Filter, FirstOrder, Float, Iir1, Iir2, SecondOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Analog1Type {
    #[default]
    LowPass,
    HighPass,
    AllPass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rbj2Type {
    #[default]
    LowPass,
    HighPass,
    /// Constant 0 dB peak gain.
    BandPass,
    BandReject,
    AllPass,
    Peaking,
    LowShelf,
    HighShelf,
}

pub const DEFAULT_DC_RADIUS: f64 = 0.995;

/// `(1 - z^-1) / (1 - r*z^-1)`
pub fn dc_blocker_coefs<T: Float>(r: T) -> Coefs1<T> {
    Coefs1 { a1: -r, b0: T::one(), b1: -T::one() }
}

/// One pole responses placed straight in the z plane, no prewarping and no Q.
pub fn analog1_coefs<T: Float>(kind: Analog1Type, freq: T) -> Coefs1<T> {
    let w = T::TAU() * freq;
    let (s, c) = w.sin_cos();
    let one = T::one();
    let rcp_a0 = one / (s - c + one);
    let a1 = (-s - c + one) * rcp_a0;

    match kind {
        Analog1Type::LowPass => {
            let b0 = (one - c) * rcp_a0;
            Coefs1 { a1, b0, b1: b0 }
        }
        Analog1Type::HighPass => {
            let b0 = s * rcp_a0;
            Coefs1 { a1, b0, b1: -b0 }
        }
        Analog1Type::AllPass => Coefs1 { a1, b0: a1, b1: one },
    }
}

/// RBJ cookbook biquad. `gain` is the linear gain ratio used by the peaking
/// and shelving shapes; the others ignore it. Shelves use a fixed slope of 1
/// and ignore `q`.
pub fn rbj2_coefs<T: Float>(kind: Rbj2Type, freq: T, q: T, gain: T) -> Coefs2<T> {
    let one = T::one();
    let two = one + one;
    let half = one / two;
    let w = T::TAU() * freq;
    let (s, c) = w.sin_cos();
    let alpha = s / (two * q);

    // (b0, b1, b2, a0, a1, a2) before normalization
    let (b0, b1, b2, a0, a1, a2) = match kind {
        Rbj2Type::LowPass => {
            let b = one - c;
            (b * half, b, b * half, one + alpha, -two * c, one - alpha)
        }
        Rbj2Type::HighPass => {
            let b = one + c;
            (b * half, -b, b * half, one + alpha, -two * c, one - alpha)
        }
        Rbj2Type::BandPass => (alpha, T::zero(), -alpha, one + alpha, -two * c, one - alpha),
        Rbj2Type::BandReject => (one, -two * c, one, one + alpha, -two * c, one - alpha),
        Rbj2Type::AllPass => (one - alpha, -two * c, one + alpha, one + alpha, -two * c, one - alpha),
        Rbj2Type::Peaking => {
            let a = gain.sqrt();
            (
                one + alpha * a,
                -two * c,
                one - alpha * a,
                one + alpha / a,
                -two * c,
                one - alpha / a,
            )
        }
        Rbj2Type::LowShelf => {
            let a = gain.sqrt();
            let beta = (two * a).sqrt() * s;
            (
                a * ((a + one) - (a - one) * c + beta),
                two * a * ((a - one) - (a + one) * c),
                a * ((a + one) - (a - one) * c - beta),
                (a + one) + (a - one) * c + beta,
                -two * ((a - one) + (a + one) * c),
                (a + one) + (a - one) * c - beta,
            )
        }
        Rbj2Type::HighShelf => {
            let a = gain.sqrt();
            let beta = (two * a).sqrt() * s;
            (
                a * ((a + one) + (a - one) * c + beta),
                -two * a * ((a - one) + (a + one) * c),
                a * ((a + one) + (a - one) * c - beta),
                (a + one) - (a - one) * c + beta,
                two * ((a - one) - (a + one) * c),
                (a + one) - (a - one) * c - beta,
            )
        }
    };

    let rcp_a0 = one / a0;
    Coefs2 {
        a1: a1 * rcp_a0,
        a2: a2 * rcp_a0,
        b0: b0 * rcp_a0,
        b1: b1 * rcp_a0,
        b2: b2 * rcp_a0,
    }
}

/// Removes DC while leaving content just above it mostly intact.
#[derive(Debug, Clone)]
pub struct DcBlocker<T: Float, F = Iir1<T>> {
    filter: F,
    radius: T,
}

impl<T: Float, F: FirstOrder<T>> DcBlocker<T, F> {
    pub fn new(radius: T) -> Self {
        let mut filter = F::default();
        filter.set_coefficients(dc_blocker_coefs(radius));
        DcBlocker { filter, radius }
    }

    pub fn radius(&self) -> T {
        self.radius
    }

    pub fn set_radius(&mut self, radius: T) {
        self.radius = radius;
        self.filter.set_coefficients(dc_blocker_coefs(radius));
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }
}

impl<T: Float, F: FirstOrder<T>> Default for DcBlocker<T, F> {
    fn default() -> Self {
        Self::new(T::from_f64(DEFAULT_DC_RADIUS))
    }
}

impl<T: Float, F: FirstOrder<T>> Filter<T> for DcBlocker<T, F> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.filter.process(x)
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[derive(Debug, Clone)]
pub struct Analog1Filter<T: Float, F = Iir1<T>> {
    filter: F,
    kind: Analog1Type,
    freq: T,
}

impl<T: Float, F: FirstOrder<T>> Analog1Filter<T, F> {
    pub fn new(kind: Analog1Type, freq: T) -> Self {
        let mut f = Analog1Filter { filter: F::default(), kind, freq };
        f.update();
        f
    }

    fn update(&mut self) {
        self.filter.set_coefficients(analog1_coefs(self.kind, self.freq));
    }

    pub fn kind(&self) -> Analog1Type {
        self.kind
    }

    pub fn set_kind(&mut self, kind: Analog1Type) {
        self.kind = kind;
        self.update();
    }

    pub fn freq(&self) -> T {
        self.freq
    }

    pub fn set_freq(&mut self, freq: T) {
        self.freq = freq;
        self.update();
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }
}

impl<T: Float, F: FirstOrder<T>> Default for Analog1Filter<T, F> {
    fn default() -> Self {
        Self::new(Analog1Type::LowPass, T::from_f64(0.25))
    }
}

impl<T: Float, F: FirstOrder<T>> Filter<T> for Analog1Filter<T, F> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.filter.process(x)
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[derive(Debug, Clone)]
pub struct Rbj2Filter<T: Float, F = Iir2<T>> {
    filter: F,
    kind: Rbj2Type,
    freq: T,
    q: T,
    gain: T,
}

impl<T: Float, F: SecondOrder<T>> Rbj2Filter<T, F> {
    pub fn new(kind: Rbj2Type, freq: T, q: T, gain: T) -> Self {
        let mut f = Rbj2Filter { filter: F::default(), kind, freq, q, gain };
        f.update();
        f
    }

    fn update(&mut self) {
        self.filter.set_coefficients(rbj2_coefs(self.kind, self.freq, self.q, self.gain));
    }

    pub fn kind(&self) -> Rbj2Type {
        self.kind
    }

    pub fn set_kind(&mut self, kind: Rbj2Type) {
        self.kind = kind;
        self.update();
    }

    pub fn freq(&self) -> T {
        self.freq
    }

    pub fn set_freq(&mut self, freq: T) {
        self.freq = freq;
        self.update();
    }

    pub fn q(&self) -> T {
        self.q
    }

    pub fn set_q(&mut self, q: T) {
        self.q = q;
        self.update();
    }

    pub fn gain(&self) -> T {
        self.gain
    }

    pub fn set_gain(&mut self, gain: T) {
        self.gain = gain;
        self.update();
    }

    /// Frequency, Q and gain in one coefficient update.
    pub fn set_fqa(&mut self, freq: T, q: T, gain: T) {
        self.freq = freq;
        self.q = q;
        self.gain = gain;
        self.update();
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }
}

impl<T: Float, F: SecondOrder<T>> Default for Rbj2Filter<T, F> {
    fn default() -> Self {
        Self::new(Rbj2Type::LowPass, T::from_f64(0.25), T::FRAC_1_SQRT_2(), T::one())
    }
}

impl<T: Float, F: SecondOrder<T>> Filter<T> for Rbj2Filter<T, F> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.filter.process(x)
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

pub type DcBlockerF = DcBlocker<f32>;
pub type DcBlockerD = DcBlocker<f64>;
pub type Analog1FilterF = Analog1Filter<f32>;
pub type Analog1FilterD = Analog1Filter<f64>;
pub type Rbj2FilterF = Rbj2Filter<f32>;
pub type Rbj2FilterD = Rbj2Filter<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iir::{Iir, direct};
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    fn mag2(c: &Coefs2<f64>, freq: f64) -> f64 {
        let w = TAU * freq;
        let (re_n, im_n) = (
            c.b0 + c.b1 * w.cos() + c.b2 * (2.0 * w).cos(),
            -(c.b1 * w.sin() + c.b2 * (2.0 * w).sin()),
        );
        let (re_d, im_d) = (
            1.0 + c.a1 * w.cos() + c.a2 * (2.0 * w).cos(),
            -(c.a1 * w.sin() + c.a2 * (2.0 * w).sin()),
        );
        ((re_n * re_n + im_n * im_n) / (re_d * re_d + im_d * im_d)).sqrt()
    }

    fn mag1(c: &Coefs1<f64>, freq: f64) -> f64 {
        let w = TAU * freq;
        let (re_n, im_n) = (c.b0 + c.b1 * w.cos(), -c.b1 * w.sin());
        let (re_d, im_d) = (1.0 + c.a1 * w.cos(), -c.a1 * w.sin());
        ((re_n * re_n + im_n * im_n) / (re_d * re_d + im_d * im_d)).sqrt()
    }

    #[test]
    fn cookbook_pass_shapes() {
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let lp = rbj2_coefs(Rbj2Type::LowPass, 0.1, q, 1.0);
        assert_relative_eq!(mag2(&lp, 0.0), 1.0, epsilon = 1e-12);
        assert!(mag2(&lp, 0.5) < 1e-9);
        // Butterworth Q puts -3 dB at the corner
        assert_relative_eq!(mag2(&lp, 0.1), q, epsilon = 1e-9);

        let hp = rbj2_coefs(Rbj2Type::HighPass, 0.1, q, 1.0);
        assert!(mag2(&hp, 0.0) < 1e-9);
        assert_relative_eq!(mag2(&hp, 0.5), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cookbook_band_shapes() {
        let bp = rbj2_coefs(Rbj2Type::BandPass, 0.05, 8.0, 1.0);
        assert_relative_eq!(mag2(&bp, 0.05), 1.0, epsilon = 1e-9);
        assert!(mag2(&bp, 0.0) < 1e-9);
        assert!(mag2(&bp, 0.1) < 0.2);

        let br = rbj2_coefs(Rbj2Type::BandReject, 0.05, 8.0, 1.0);
        assert!(mag2(&br, 0.05) < 1e-9);
        assert_relative_eq!(mag2(&br, 0.0), 1.0, epsilon = 1e-12);

        let ap = rbj2_coefs(Rbj2Type::AllPass, 0.05, 2.0, 1.0);
        for f in [0.0, 0.01, 0.05, 0.2, 0.45] {
            assert_relative_eq!(mag2(&ap, f), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn gain_shapes_reach_the_linear_ratio() {
        let pe = rbj2_coefs(Rbj2Type::Peaking, 0.1, 1.0, 4.0);
        assert_relative_eq!(mag2(&pe, 0.1), 4.0, epsilon = 1e-9);
        assert_relative_eq!(mag2(&pe, 0.0), 1.0, epsilon = 1e-9);

        let ls = rbj2_coefs(Rbj2Type::LowShelf, 0.05, 1.0, 4.0);
        assert_relative_eq!(mag2(&ls, 0.0), 4.0, epsilon = 1e-9);
        assert_relative_eq!(mag2(&ls, 0.5), 1.0, epsilon = 1e-9);

        let hs = rbj2_coefs(Rbj2Type::HighShelf, 0.05, 1.0, 0.25);
        assert_relative_eq!(mag2(&hs, 0.5), 0.25, epsilon = 1e-9);
        assert_relative_eq!(mag2(&hs, 0.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn single_pole_shapes() {
        let lp = analog1_coefs(Analog1Type::LowPass, 0.05);
        assert_relative_eq!(mag1(&lp, 0.0), 1.0, epsilon = 1e-12);
        assert!(mag1(&lp, 0.5) < 1e-9);

        let hp = analog1_coefs(Analog1Type::HighPass, 0.05);
        assert!(mag1(&hp, 0.0) < 1e-12);

        let ap = analog1_coefs(Analog1Type::AllPass, 0.05);
        for f in [0.0, 0.05, 0.3] {
            assert_relative_eq!(mag1(&ap, f), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn dc_blocker_kills_dc() {
        let mut dc: DcBlocker<f64> = DcBlocker::default();
        assert_relative_eq!(dc.radius(), 0.995);
        let mut y = 1.0;
        for _ in 0..5000 {
            y = dc.process(1.0);
        }
        assert!(y.abs() < 1e-6);
        let c = dc_blocker_coefs(0.995);
        assert_relative_eq!(mag1(&c, 0.5), 2.0 / 1.995, epsilon = 1e-12);
    }

    #[test]
    fn designer_runs_on_either_topology() {
        let mut a: Rbj2Filter<f64> = Rbj2Filter::new(Rbj2Type::BandPass, 0.02, 4.0, 1.0);
        let mut b: Rbj2Filter<f64, direct::Iir2<f64>> = Rbj2Filter::new(Rbj2Type::BandPass, 0.02, 4.0, 1.0);
        assert_eq!(a.filter().coefficients(), b.filter().coefficients());
        for n in 0..200 {
            let x = if n % 37 == 0 { 1.0 } else { 0.0 };
            assert_relative_eq!(a.process(x), b.process(x), epsilon = 1e-12);
        }
    }

    #[test]
    fn setters_recompute_everything() {
        let mut f: Rbj2Filter<f32> = Rbj2Filter::default();
        assert_eq!(f.kind(), Rbj2Type::LowPass);
        f.set_kind(Rbj2Type::Peaking);
        f.set_fqa(0.1, 2.0, 2.0);
        let expected = rbj2_coefs(Rbj2Type::Peaking, 0.1f32, 2.0, 2.0);
        assert_eq!(f.filter().coefficients(), expected);
    }
}
