//! Range maps between a control domain `[al, ah]` and a value domain `[bl, bh]`.
//!
//! Neither map clamps; values outside the control range extrapolate.

use crate::iir::Float;

pub trait CurveMap<T: Float> {
    fn setup(&mut self, al: T, ah: T, bl: T, bh: T);

    fn map(&self, v: T) -> T;

    fn unmap(&self, v: T) -> T;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveMapLinear<T> {
    a_origin: T,
    a_range: T,
    b_origin: T,
    b_range: T,
}

impl<T: Float> CurveMapLinear<T> {
    pub fn new(al: T, ah: T, bl: T, bh: T) -> Self {
        CurveMapLinear { a_origin: al, a_range: ah - al, b_origin: bl, b_range: bh - bl }
    }
}

impl<T: Float> Default for CurveMapLinear<T> {
    fn default() -> Self {
        Self::new(T::zero(), T::one(), T::zero(), T::one())
    }
}

impl<T: Float> CurveMap<T> for CurveMapLinear<T> {
    fn setup(&mut self, al: T, ah: T, bl: T, bh: T) {
        *self = Self::new(al, ah, bl, bh);
    }

    #[inline]
    fn map(&self, v: T) -> T {
        self.b_origin + (v - self.a_origin) * self.b_range / self.a_range
    }

    #[inline]
    fn unmap(&self, v: T) -> T {
        self.a_origin + (v - self.b_origin) * self.a_range / self.b_range
    }
}

/// `map(v) = bl * (bh/bl)^((v - al) / (ah - al))`. Both `bl` and `bh` must be positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveMapExponential<T> {
    a_origin: T,
    a_range: T,
    log_ratio: T,
    scale: T,
}

impl<T: Float> CurveMapExponential<T> {
    pub fn new(al: T, ah: T, bl: T, bh: T) -> Self {
        CurveMapExponential {
            a_origin: al,
            a_range: ah - al,
            log_ratio: bh.ln() - bl.ln(),
            scale: bl,
        }
    }
}

impl<T: Float> Default for CurveMapExponential<T> {
    fn default() -> Self {
        Self::new(T::zero(), T::one(), T::from_f64(0.001), T::one())
    }
}

impl<T: Float> CurveMap<T> for CurveMapExponential<T> {
    fn setup(&mut self, al: T, ah: T, bl: T, bh: T) {
        *self = Self::new(al, ah, bl, bh);
    }

    #[inline]
    fn map(&self, v: T) -> T {
        ((v - self.a_origin) / self.a_range * self.log_ratio).exp() * self.scale
    }

    #[inline]
    fn unmap(&self, v: T) -> T {
        self.a_origin + self.a_range * (v / self.scale).ln() / self.log_ratio
    }
}

pub type CurveMapLinearF = CurveMapLinear<f32>;
pub type CurveMapLinearD = CurveMapLinear<f64>;
pub type CurveMapExponentialF = CurveMapExponential<f32>;
pub type CurveMapExponentialD = CurveMapExponential<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_endpoints_and_inverse() {
        let m = CurveMapLinearD::new(0.0, 1.0, -4.0, 4.0);
        assert_relative_eq!(m.map(0.0), -4.0);
        assert_relative_eq!(m.map(1.0), 4.0);
        assert_relative_eq!(m.map(0.5), 0.0);
        assert_relative_eq!(m.unmap(2.0), 0.75);
        // extrapolates
        assert_relative_eq!(m.map(1.5), 8.0);
    }

    #[test]
    fn exponential_pitch_map() {
        let sr = 48000.0;
        let m = CurveMapExponentialD::new(21.0, 117.0, 27.5 / sr, 7040.0 / sr);
        assert_relative_eq!(m.map(21.0) * sr, 27.5, epsilon = 1e-9);
        assert_relative_eq!(m.map(69.0) * sr, 440.0, epsilon = 1e-9);
        assert_relative_eq!(m.map(81.0) * sr, 880.0, epsilon = 1e-9);
        assert_relative_eq!(m.unmap(440.0 / sr), 69.0, epsilon = 1e-9);
    }

    #[test]
    fn setup_replaces_the_mapping() {
        let mut m = CurveMapExponentialF::default();
        assert_relative_eq!(m.map(0.0), 0.001, epsilon = 1e-7);
        m.setup(0.0, 1.0, 0.1, 10.0);
        assert_relative_eq!(m.map(0.5), 1.0, epsilon = 1e-6);
    }
}
