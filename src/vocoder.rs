//! 16 band channel vocoder.
//!
//! Band centers sit a third of an octave apart around 500 Hz:
//! `fo(i) = 500 * 2^((i - 5) / 3)`, roughly 157 Hz to 5 kHz. Each band has a
//! carrier filter, a modulator filter and an envelope follower on the
//! modulator side. The carrier band `i` is scaled by the envelope of the
//! modulator band `i - band_shift`.

use crate::design::{Rbj2Filter, Rbj2Type};
use crate::envelope::EnvelopeFollower;
use crate::iir::{Filter, Float};
use crate::noise::NoiseGenerator;

pub const BAND_COUNT: usize = 16;

/// Broadband excitation only goes into the top three bands, standing in for
/// fricatives the carrier usually lacks.
const NOISE_BANDS: [f32; BAND_COUNT] = [0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 0., 1., 1., 1.];

pub fn band_center_hz(band: usize) -> f32 {
    500.0 * 2.0f32.powf((band as f32 - 5.0) / 3.0)
}

/// Two bandpass sections tuned slightly below and above the center, in
/// series. Flatter top and steeper skirts than a single section.
#[derive(Debug, Clone)]
pub struct CascadedBandpass<T: Float> {
    low: Rbj2Filter<T>,
    high: Rbj2Filter<T>,
    stagger: T,
    gain: T,
}

impl<T: Float> CascadedBandpass<T> {
    pub const DEFAULT_Q: f64 = 8.0;
    pub const DEFAULT_STAGGER: f64 = 0.94;
    pub const DEFAULT_GAIN: f64 = 2.0;

    pub fn new() -> Self {
        Self::with_tuning(
            T::from_f64(Self::DEFAULT_Q),
            T::from_f64(Self::DEFAULT_STAGGER),
            T::from_f64(Self::DEFAULT_GAIN),
        )
    }

    /// `q` for both sections, sections at `fo * stagger` and `fo / stagger`,
    /// output multiplied by `gain`.
    pub fn with_tuning(q: T, stagger: T, gain: T) -> Self {
        let section = Rbj2Filter::new(Rbj2Type::BandPass, T::from_f64(0.25), q, T::one());
        CascadedBandpass { low: section.clone(), high: section, stagger, gain }
    }

    /// Normalized center frequency.
    pub fn set_freq(&mut self, fo: T) {
        self.low.set_freq(fo * self.stagger);
        self.high.set_freq(fo / self.stagger);
    }
}

impl<T: Float> Default for CascadedBandpass<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Filter<T> for CascadedBandpass<T> {
    #[inline]
    fn process(&mut self, x: T) -> T {
        self.high.process(self.low.process(x)) * self.gain
    }

    fn reset(&mut self) {
        self.low.reset();
        self.high.reset();
    }
}

#[derive(Debug, Clone)]
pub struct ChannelVocoder {
    carrier_bands: [CascadedBandpass<f32>; BAND_COUNT],
    modulator_bands: [CascadedBandpass<f32>; BAND_COUNT],
    followers: [EnvelopeFollower<f32>; BAND_COUNT],
    noise: NoiseGenerator,
    noise_gain: f32,
    band_shift: i32,
}

impl Default for ChannelVocoder {
    fn default() -> Self {
        ChannelVocoder {
            carrier_bands: std::array::from_fn(|_| CascadedBandpass::new()),
            modulator_bands: std::array::from_fn(|_| CascadedBandpass::new()),
            followers: std::array::from_fn(|_| EnvelopeFollower::default()),
            noise: NoiseGenerator::default(),
            noise_gain: 0.0,
            band_shift: 0,
        }
    }
}

impl ChannelVocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        for band in 0..BAND_COUNT {
            let fo = band_center_hz(band) / sample_rate;
            self.carrier_bands[band].set_freq(fo);
            self.modulator_bands[band].set_freq(fo);
            self.followers[band].set_attack_tc(0.01 * sample_rate);
            self.followers[band].set_release_tc(0.1 * sample_rate);
        }
        self.reset();
    }

    pub fn unprepare(&mut self) {}

    /// Clears every filter and follower. The noise sequence keeps running.
    pub fn reset(&mut self) {
        for band in 0..BAND_COUNT {
            self.carrier_bands[band].reset();
            self.modulator_bands[band].reset();
            self.followers[band].reset();
        }
    }

    pub fn noise_gain(&self) -> f32 {
        self.noise_gain
    }

    pub fn set_noise_gain(&mut self, gain: f32) {
        self.noise_gain = gain;
    }

    pub fn band_shift(&self) -> i32 {
        self.band_shift
    }

    /// Also resets, a shifted mapping would otherwise start from stale envelopes.
    /// Shifts beyond `±BAND_COUNT` silence every band and are stored clamped.
    pub fn set_band_shift(&mut self, shift: i32) {
        self.band_shift = shift.clamp(-(BAND_COUNT as i32), BAND_COUNT as i32);
        self.reset();
    }

    #[inline]
    fn source_band(&self, band: usize) -> Option<usize> {
        let im = band as i64 - self.band_shift as i64;
        (0..BAND_COUNT as i64).contains(&im).then_some(im as usize)
    }

    #[inline]
    pub fn process(&mut self, carrier: f32, modulator: f32) -> f32 {
        let noise = self.noise.process() * self.noise_gain;
        let mut out = 0.0;
        for band in 0..BAND_COUNT {
            let amplitude = match self.source_band(band) {
                Some(im) => {
                    let m = self.modulator_bands[im].process(modulator);
                    self.followers[im].process(m)
                }
                None => 0.0,
            };
            let c = self.carrier_bands[band].process(carrier + noise * NOISE_BANDS[band]);
            out += amplitude * c;
        }
        out
    }

    pub fn process_block(&mut self, carrier: &[f32], modulator: &[f32], output: &mut [f32]) {
        for ((o, &c), &m) in output.iter_mut().zip(carrier).zip(modulator) {
            *o = self.process(c, m);
        }
    }

    /// Per carrier band envelope after the shift, zero where nothing maps in.
    pub fn mod_levels(&self) -> [f32; BAND_COUNT] {
        std::array::from_fn(|band| match self.source_band(band) {
            Some(im) => self.followers[im].value(),
            None => 0.0,
        })
    }
}
