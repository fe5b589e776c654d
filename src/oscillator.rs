//! Free-running oscillators. Frequencies are normalized (cycles per sample).

use crate::iir::Float;

pub trait Oscillator<T: Float> {
    fn set_freq(&mut self, freq: T);

    fn process(&mut self) -> T;

    /// Phase back to zero. Frequency is kept.
    fn reset(&mut self);

    fn render(&mut self, out: &mut [T]) {
        for s in out.iter_mut() {
            *s = self.process();
        }
    }
}

/// Band-limited impulse train.
///
/// ```text
/// blit(x) = sin(pi*M*x) / (M * sin(pi*x)),  M = 2*floor(P/2) + 1,  P = 1/freq
/// ```
///
/// `x` runs over `[0, 2)` and the train peaks at `x = 0` and `x = 1`, so one
/// pulse every `P` samples with all harmonics below Nyquist at equal weight.
#[derive(Debug, Clone)]
pub struct BlitOscillator<T: Float> {
    freq: T,
    m: T,
    x: T,
}

impl<T: Float> BlitOscillator<T> {
    pub fn new(freq: T) -> Self {
        let mut osc = BlitOscillator { freq: T::zero(), m: T::one(), x: T::zero() };
        osc.set_freq(freq);
        osc
    }

    pub fn freq(&self) -> T {
        self.freq
    }

    /// Number of harmonics summed, always odd.
    pub fn harmonics(&self) -> T {
        self.m
    }
}

impl<T: Float> Default for BlitOscillator<T> {
    fn default() -> Self {
        Self::new(T::from_f64(0.001))
    }
}

impl<T: Float> Oscillator<T> for BlitOscillator<T> {
    fn set_freq(&mut self, freq: T) {
        self.freq = freq;
        let two = T::one() + T::one();
        self.m = if freq > T::zero() {
            two * (freq.recip() / two).floor() + T::one()
        } else {
            T::one()
        };
    }

    #[inline]
    fn process(&mut self) -> T {
        let den = (T::PI() * self.x).sin();
        let v = if den.abs() <= T::epsilon() {
            T::one()
        } else {
            (T::PI() * self.m * self.x).sin() / (self.m * den)
        };

        let two = T::one() + T::one();
        self.x = self.x + self.freq;
        if self.x >= two {
            self.x = self.x - two;
        } else if self.x < T::zero() {
            self.x = self.x + two;
        }
        v
    }

    fn reset(&mut self) {
        self.x = T::zero();
    }
}

#[derive(Debug, Clone)]
pub struct SineOscillator<T: Float> {
    freq: T,
    phase: T,
}

impl<T: Float> SineOscillator<T> {
    pub fn new(freq: T) -> Self {
        SineOscillator { freq, phase: T::zero() }
    }

    pub fn freq(&self) -> T {
        self.freq
    }

    pub fn phase(&self) -> T {
        self.phase
    }
}

impl<T: Float> Default for SineOscillator<T> {
    fn default() -> Self {
        Self::new(T::from_f64(0.0001))
    }
}

impl<T: Float> Oscillator<T> for SineOscillator<T> {
    fn set_freq(&mut self, freq: T) {
        self.freq = freq;
    }

    #[inline]
    fn process(&mut self) -> T {
        let v = (self.phase * T::TAU()).sin();
        let p = self.phase + self.freq;
        self.phase = p - p.floor();
        v
    }

    fn reset(&mut self) {
        self.phase = T::zero();
    }
}

pub type BlitOscillatorF = BlitOscillator<f32>;
pub type BlitOscillatorD = BlitOscillator<f64>;
pub type SineOscillatorF = SineOscillator<f32>;
pub type SineOscillatorD = SineOscillator<f64>;
