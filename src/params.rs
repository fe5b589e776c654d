//! Parameter set and the numeric control/native converters.
//!
//! A control value is the normalized `0..=1` position a host or knob works
//! in. A native value is what the DSP consumes: seconds, Hz, semitones, linear
//! gain, a band count or an enum index.

use serde::{Deserialize, Serialize};

use crate::curve::{CurveMap, CurveMapExponential, CurveMapLinear};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamId {
    PortamentoTime,
    AttackTime,
    ReleaseTime,
    LfoRate,
    ModRange,
    BendRange,
    MonoMode,
    CarrierGain,
    ModulatorGain,
    OutputGain,
    NoiseGain,
    BandShift,
}

impl ParamId {
    pub const COUNT: usize = 12;

    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::PortamentoTime,
        ParamId::AttackTime,
        ParamId::ReleaseTime,
        ParamId::LfoRate,
        ParamId::ModRange,
        ParamId::BendRange,
        ParamId::MonoMode,
        ParamId::CarrierGain,
        ParamId::ModulatorGain,
        ParamId::OutputGain,
        ParamId::NoiseGain,
        ParamId::BandShift,
    ];

    /// Short stable identifier, also used as the automation key.
    pub fn key(self) -> &'static str {
        self.converter().key
    }

    pub fn from_key(key: &str) -> Option<ParamId> {
        Self::ALL.into_iter().find(|id| id.key().eq_ignore_ascii_case(key))
    }

    pub fn converter(self) -> &'static ParamConverter {
        &PROFILE[self as usize]
    }
}

/// One piece of a control to native mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// A single control position pinned to a single native value.
    Point { control: f32, native: f32 },
    /// Control range split evenly over a list of integer natives.
    Enumerated { control_low: f32, control_high: f32, values: &'static [i32] },
    Linear { control_low: f32, control_high: f32, native_low: f32, native_high: f32 },
    Exponential { control_low: f32, control_high: f32, native_low: f32, native_high: f32 },
}

impl Segment {
    /// `None` when the control value is not this segment's to handle. A
    /// permissive segment handles everything.
    pub fn to_native(&self, control: f32, permissive: bool) -> Option<f32> {
        match *self {
            Segment::Point { control: c, native } => (permissive || control == c).then_some(native),
            Segment::Enumerated { control_low, control_high, values } => {
                let control = if permissive { control.max(control_low).min(control_high) } else { control };
                let map = CurveMapLinear::new(control_low, control_high, 0.0, (values.len() - 1) as f32);
                let pos = map.map(control) + 0.5;
                if pos < 0.0 {
                    return None;
                }
                values.get(pos as usize).map(|&v| v as f32)
            }
            Segment::Linear { control_low, control_high, native_low, native_high } => {
                let in_range = (control_low..=control_high).contains(&control);
                (permissive || in_range)
                    .then(|| CurveMapLinear::new(control_low, control_high, native_low, native_high).map(control))
            }
            Segment::Exponential { control_low, control_high, native_low, native_high } => {
                let in_range = (control_low..=control_high).contains(&control);
                (permissive || in_range).then(|| {
                    CurveMapExponential::new(control_low, control_high, native_low, native_high).map(control)
                })
            }
        }
    }

    pub fn to_control(&self, native: f32, permissive: bool) -> Option<f32> {
        match *self {
            Segment::Point { control, native: n } => (permissive || native == n).then_some(control),
            Segment::Enumerated { control_low, control_high, values } => {
                let map = CurveMapLinear::new(control_low, control_high, 0.0, (values.len() - 1) as f32);
                let index = match values.iter().position(|&v| v == native as i32) {
                    Some(i) => i,
                    None if permissive => values.len() - 1,
                    None => return None,
                };
                Some(map.unmap(index as f32))
            }
            Segment::Linear { control_low, control_high, native_low, native_high } => {
                let in_range = native_low.min(native_high) <= native && native <= native_low.max(native_high);
                (permissive || in_range)
                    .then(|| CurveMapLinear::new(control_low, control_high, native_low, native_high).unmap(native))
            }
            Segment::Exponential { control_low, control_high, native_low, native_high } => {
                let in_range = native_low.min(native_high) <= native && native <= native_low.max(native_high);
                (permissive || in_range).then(|| {
                    CurveMapExponential::new(control_low, control_high, native_low, native_high).unmap(native)
                })
            }
        }
    }
}

/// Range and mapping for one parameter. Segments are tried in order and the
/// last one is permissive.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamConverter {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub segments: &'static [Segment],
    pub native_default: f32,
    pub integer: bool,
}

impl ParamConverter {
    pub const CONTROL_MIN: f32 = 0.0;
    pub const CONTROL_MAX: f32 = 1.0;

    pub fn is_enum(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Enumerated { .. }))
    }

    pub fn is_integer(&self) -> bool {
        self.integer || self.is_enum()
    }

    pub fn limit_control(&self, control: f32) -> f32 {
        control.max(Self::CONTROL_MIN).min(Self::CONTROL_MAX)
    }

    pub fn control_to_native(&self, control: f32) -> f32 {
        let control = self.limit_control(control);
        let last = self.segments.len().saturating_sub(1);
        self.segments
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.to_native(control, i == last))
            .unwrap_or(0.0)
    }

    /// Rounds half away from zero.
    pub fn control_to_native_int(&self, control: f32) -> i32 {
        self.control_to_native(control).round() as i32
    }

    pub fn native_to_control(&self, native: f32) -> f32 {
        let last = self.segments.len().saturating_sub(1);
        self.segments
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.to_control(native, i == last))
            .map(|c| self.limit_control(c))
            .unwrap_or_else(|| self.control_default())
    }

    pub fn control_default(&self) -> f32 {
        let last = self.segments.len().saturating_sub(1);
        self.segments
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.to_control(self.native_default, i == last))
            .map(|c| self.limit_control(c))
            .unwrap_or(Self::CONTROL_MIN)
    }

    pub fn native_min(&self) -> f32 {
        self.control_to_native(Self::CONTROL_MIN)
    }

    pub fn native_max(&self) -> f32 {
        self.control_to_native(Self::CONTROL_MAX)
    }

    /// Clamps into the native range, whichever way round it runs.
    pub fn limit_native(&self, native: f32) -> f32 {
        let (a, b) = (self.native_min(), self.native_max());
        let limited = native.max(a.min(b)).min(a.max(b));
        if self.is_integer() { limited.round() } else { limited }
    }
}

const TIME_SEGMENTS: &[Segment] = &[Segment::Exponential {
    control_low: 0.0,
    control_high: 1.0,
    native_low: 0.001,
    native_high: 1.0,
}];

const SEMITONE_SEGMENTS: &[Segment] = &[Segment::Linear {
    control_low: 0.0,
    control_high: 1.0,
    native_low: 0.0,
    native_high: 12.0,
}];

const GAIN_SEGMENTS: &[Segment] = &[
    Segment::Point { control: 0.0, native: 0.0 },
    Segment::Exponential { control_low: 0.0, control_high: 1.0, native_low: 0.1, native_high: 10.0 },
];

static PROFILE: [ParamConverter; ParamId::COUNT] = [
    ParamConverter {
        key: "IPT",
        name: "Portamento",
        unit: "sec.",
        segments: TIME_SEGMENTS,
        native_default: 0.01,
        integer: false,
    },
    ParamConverter {
        key: "IAT",
        name: "Attack",
        unit: "sec.",
        segments: TIME_SEGMENTS,
        native_default: 0.01,
        integer: false,
    },
    ParamConverter {
        key: "IRT",
        name: "Release",
        unit: "sec.",
        segments: TIME_SEGMENTS,
        native_default: 0.01,
        integer: false,
    },
    ParamConverter {
        key: "ILR",
        name: "LFORate",
        unit: "Hz",
        segments: &[Segment::Exponential {
            control_low: 0.0,
            control_high: 1.0,
            native_low: 0.1,
            native_high: 100.0,
        }],
        native_default: 5.0,
        integer: false,
    },
    ParamConverter {
        key: "IMR",
        name: "ModRange",
        unit: "semitones",
        segments: SEMITONE_SEGMENTS,
        native_default: 2.0,
        integer: false,
    },
    ParamConverter {
        key: "IBR",
        name: "BendRange",
        unit: "semitones",
        segments: SEMITONE_SEGMENTS,
        native_default: 2.0,
        integer: false,
    },
    ParamConverter {
        key: "IMM",
        name: "Mode",
        unit: "",
        segments: &[Segment::Enumerated { control_low: 0.0, control_high: 1.0, values: &[0, 1] }],
        native_default: 1.0,
        integer: true,
    },
    ParamConverter {
        key: "CG",
        name: "Carrier",
        unit: "gain",
        segments: GAIN_SEGMENTS,
        native_default: 2.0,
        integer: false,
    },
    ParamConverter {
        key: "MG",
        name: "Modulator",
        unit: "gain",
        segments: GAIN_SEGMENTS,
        native_default: 2.0,
        integer: false,
    },
    ParamConverter {
        key: "OG",
        name: "Output",
        unit: "gain",
        segments: GAIN_SEGMENTS,
        native_default: 2.0,
        integer: false,
    },
    ParamConverter {
        key: "NG",
        name: "Noise",
        unit: "gain",
        segments: GAIN_SEGMENTS,
        native_default: 0.5,
        integer: false,
    },
    ParamConverter {
        key: "BS",
        name: "Band Shift",
        unit: "bands",
        segments: &[Segment::Linear {
            control_low: 0.0,
            control_high: 1.0,
            native_low: -4.0,
            native_high: 4.0,
        }],
        native_default: 0.0,
        integer: true,
    },
];

/// Every parameter as a native value. Missing fields fall back to the
/// defaults when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub portamento_time: f32,
    pub attack_time: f32,
    pub release_time: f32,
    pub lfo_rate: f32,
    pub mod_range: f32,
    pub bend_range: f32,
    pub mono: bool,
    pub carrier_gain: f32,
    pub modulator_gain: f32,
    pub output_gain: f32,
    pub noise_gain: f32,
    pub band_shift: i32,
}

impl Default for Parameters {
    fn default() -> Self {
        let mut params = Parameters {
            portamento_time: 0.0,
            attack_time: 0.0,
            release_time: 0.0,
            lfo_rate: 0.0,
            mod_range: 0.0,
            bend_range: 0.0,
            mono: false,
            carrier_gain: 0.0,
            modulator_gain: 0.0,
            output_gain: 0.0,
            noise_gain: 0.0,
            band_shift: 0,
        };
        for id in ParamId::ALL {
            params.set(id, id.converter().native_default);
        }
        params
    }
}

impl Parameters {
    /// Mono mode reads as enum index 0, poly as 1.
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::PortamentoTime => self.portamento_time,
            ParamId::AttackTime => self.attack_time,
            ParamId::ReleaseTime => self.release_time,
            ParamId::LfoRate => self.lfo_rate,
            ParamId::ModRange => self.mod_range,
            ParamId::BendRange => self.bend_range,
            ParamId::MonoMode => {
                if self.mono {
                    0.0
                } else {
                    1.0
                }
            }
            ParamId::CarrierGain => self.carrier_gain,
            ParamId::ModulatorGain => self.modulator_gain,
            ParamId::OutputGain => self.output_gain,
            ParamId::NoiseGain => self.noise_gain,
            ParamId::BandShift => self.band_shift as f32,
        }
    }

    /// Stores `native` clamped to the parameter's range.
    pub fn set(&mut self, id: ParamId, native: f32) {
        let v = id.converter().limit_native(native);
        match id {
            ParamId::PortamentoTime => self.portamento_time = v,
            ParamId::AttackTime => self.attack_time = v,
            ParamId::ReleaseTime => self.release_time = v,
            ParamId::LfoRate => self.lfo_rate = v,
            ParamId::ModRange => self.mod_range = v,
            ParamId::BendRange => self.bend_range = v,
            ParamId::MonoMode => self.mono = v < 0.5,
            ParamId::CarrierGain => self.carrier_gain = v,
            ParamId::ModulatorGain => self.modulator_gain = v,
            ParamId::OutputGain => self.output_gain = v,
            ParamId::NoiseGain => self.noise_gain = v,
            ParamId::BandShift => self.band_shift = v as i32,
        }
    }

    pub fn control(&self, id: ParamId) -> f32 {
        id.converter().native_to_control(self.get(id))
    }

    pub fn set_control(&mut self, id: ParamId, control: f32) {
        let conv = id.converter();
        let native = if conv.is_integer() {
            conv.control_to_native_int(control) as f32
        } else {
            conv.control_to_native(control)
        };
        self.set(id, native);
    }
}
