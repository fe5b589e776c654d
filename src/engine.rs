use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::envelope::EnvelopeDetector;
use crate::event::{NoteEvent, NoteEventKind};
use crate::iir::Filter;
use crate::instrument::PulseInstrument;
use crate::params::{ParamId, Parameters};
use crate::vocoder::{BAND_COUNT, ChannelVocoder};

pub const METER_CARRIER: usize = 0;
pub const METER_MODULATOR: usize = 1;
pub const METER_OUTPUT: usize = 2;

/// Snapshot for metering: carrier, modulator and output levels after their
/// gains, plus the per band modulation envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Levels {
    pub io: [f32; 3],
    pub bands: [f32; BAND_COUNT],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    pub carrier: usize,
    pub modulator: usize,
    pub output: usize,
}

impl ChannelLayout {
    pub fn is_valid(&self) -> bool {
        self.carrier >= 1 && self.modulator >= 1 && self.output >= 1
    }
}

struct EngineCore {
    instrument: PulseInstrument,
    vocoder: ChannelVocoder,
    meters: [EnvelopeDetector<f32>; 3],
    params: Parameters,
    sample_rate: f32,
    layout: ChannelLayout,
}

impl EngineCore {
    /// Every value in `params` is clamped into its range on the way in.
    fn new(params: Parameters) -> Self {
        let mut clamped = Parameters::default();
        for id in ParamId::ALL {
            clamped.set(id, params.get(id));
        }
        let mut core = EngineCore {
            instrument: PulseInstrument::new(),
            vocoder: ChannelVocoder::new(),
            meters: std::array::from_fn(|_| EnvelopeDetector::default()),
            params: clamped,
            sample_rate: 44100.0,
            layout: ChannelLayout::default(),
        };
        for id in ParamId::ALL {
            core.push_param(id);
        }
        core
    }

    fn prepare(&mut self, sample_rate: f32, layout: ChannelLayout) {
        self.sample_rate = sample_rate;
        self.layout = layout;
        self.instrument.prepare(sample_rate);
        self.vocoder.prepare(sample_rate);
        for meter in self.meters.iter_mut() {
            meter.set_attack_tc(0.01 * sample_rate);
            meter.set_release_tc(0.1 * sample_rate);
            meter.reset();
        }
    }

    fn unprepare(&mut self) {
        self.instrument.unprepare();
        self.vocoder.unprepare();
        self.layout = ChannelLayout::default();
    }

    fn set_param(&mut self, id: ParamId, native: f32) {
        self.params.set(id, native);
        self.push_param(id);
    }

    /// Hands the stored value of `id` to whichever component consumes it.
    /// The three IO gains are read straight from `params` while rendering.
    fn push_param(&mut self, id: ParamId) {
        let p = &self.params;
        match id {
            ParamId::PortamentoTime => self.instrument.set_portamento_time(p.portamento_time),
            ParamId::AttackTime => self.instrument.set_attack_time(p.attack_time),
            ParamId::ReleaseTime => self.instrument.set_release_time(p.release_time),
            ParamId::LfoRate => self.instrument.set_lfo_rate(p.lfo_rate),
            ParamId::ModRange => self.instrument.set_mod_range(p.mod_range),
            ParamId::BendRange => self.instrument.set_bend_range(p.bend_range),
            ParamId::MonoMode => self.instrument.set_mono_mode(p.mono),
            ParamId::NoiseGain => self.vocoder.set_noise_gain(p.noise_gain),
            ParamId::BandShift => self.vocoder.set_band_shift(p.band_shift),
            ParamId::CarrierGain | ParamId::ModulatorGain | ParamId::OutputGain => {}
        }
    }

    fn apply_event(&mut self, kind: NoteEventKind) {
        match kind {
            NoteEventKind::NoteOn(note) => self.instrument.note_on(note),
            NoteEventKind::NoteOff(note) => self.instrument.note_off(note),
            NoteEventKind::SetModWheel(v) => self.instrument.set_mod_wheel(v),
            NoteEventKind::SetPitchBend(v) => self.instrument.set_pitch_bend(v),
        }
    }

    /// Inputs are already trimmed to the configured channel counts.
    fn render(&mut self, carrier: &[&[f32]], modulator: &[&[f32]], output: &mut [&mut [f32]], range: Range<usize>) {
        let carrier_gain = self.params.carrier_gain;
        let modulator_gain = self.params.modulator_gain;
        let output_gain = self.params.output_gain;

        for i in range {
            let mut c = self.instrument.process();
            for ch in carrier {
                c += ch[i];
            }
            c *= carrier_gain;
            self.meters[METER_CARRIER].process(c);

            let mut m = 0.0;
            for ch in modulator {
                m += ch[i];
            }
            m *= modulator_gain;
            self.meters[METER_MODULATOR].process(m);

            let o = self.vocoder.process(c, m) * output_gain;
            for ch in output.iter_mut() {
                ch[i] = o;
            }
            self.meters[METER_OUTPUT].process(o);
        }
    }

    fn levels(&self) -> Levels {
        Levels {
            io: std::array::from_fn(|i| self.meters[i].value()),
            bands: self.vocoder.mod_levels(),
        }
    }
}

/// The whole vocoder behind one lock: pulse instrument into carrier, channel
/// vocoder, IO gains and meters.
///
/// Cloning is cheap and every clone drives the same engine, so a control
/// thread can hold one while the audio callback holds another. Parameter
/// writes and `process` serialize on the lock; nothing inside `process`
/// allocates or blocks beyond it.
#[derive(Clone)]
pub struct VocoderEngine {
    core: Arc<Mutex<EngineCore>>,
}

impl Default for VocoderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VocoderEngine {
    pub fn new() -> Self {
        Self::with_parameters(Parameters::default())
    }

    pub fn with_parameters(params: Parameters) -> Self {
        VocoderEngine { core: Arc::new(Mutex::new(EngineCore::new(params))) }
    }

    /// Sizes everything for `sample_rate` and the given channel counts. Any
    /// count below one leaves the engine silent until the next `prepare`.
    pub fn prepare(&self, sample_rate: f32, carrier_channels: usize, modulator_channels: usize, output_channels: usize) {
        let layout = ChannelLayout {
            carrier: carrier_channels,
            modulator: modulator_channels,
            output: output_channels,
        };
        if !layout.is_valid() {
            warn!(
                carrier = carrier_channels,
                modulator = modulator_channels,
                output = output_channels,
                "unusable channel layout, engine will output nothing"
            );
        }
        self.core.lock().prepare(sample_rate, layout);
        debug!(sample_rate, ?layout, "vocoder prepared");
    }

    /// Safe to call repeatedly.
    pub fn unprepare(&self) {
        self.core.lock().unprepare();
        debug!("vocoder unprepared");
    }

    pub fn is_prepared(&self) -> bool {
        self.core.lock().layout.is_valid()
    }

    pub fn layout(&self) -> ChannelLayout {
        self.core.lock().layout
    }

    pub fn sample_rate(&self) -> f32 {
        self.core.lock().sample_rate
    }

    /// Runs one block.
    ///
    /// Carrier channels are summed and the instrument is mixed on top, the
    /// modulator channels are summed, and the vocoded result is written to
    /// every configured output channel. `events` must be ordered by offset.
    /// An offset past the block end fires at the end, one behind the current
    /// position fires immediately.
    ///
    /// Does nothing when the engine is not prepared or when fewer channels
    /// are supplied than were configured.
    pub fn process<I>(&self, carrier: &[&[f32]], modulator: &[&[f32]], output: &mut [&mut [f32]], events: I)
    where
        I: IntoIterator<Item = NoteEvent>,
    {
        let mut core = self.core.lock();
        let layout = core.layout;
        if !layout.is_valid()
            || carrier.len() < layout.carrier
            || modulator.len() < layout.modulator
            || output.len() < layout.output
        {
            return;
        }

        let carrier = &carrier[..layout.carrier];
        let modulator = &modulator[..layout.modulator];
        let output = &mut output[..layout.output];
        let len = carrier
            .iter()
            .chain(modulator)
            .map(|ch| ch.len())
            .chain(output.iter().map(|ch| ch.len()))
            .min()
            .unwrap_or(0);

        let mut pos = 0;
        for event in events {
            let at = event.offset.min(len).max(pos);
            core.render(carrier, modulator, output, pos..at);
            pos = at;
            core.apply_event(event.kind);
        }
        core.render(carrier, modulator, output, pos..len);
    }

    pub fn levels(&self) -> Levels {
        self.core.lock().levels()
    }

    pub fn parameters(&self) -> Parameters {
        self.core.lock().params
    }

    pub fn param(&self, id: ParamId) -> f32 {
        self.core.lock().params.get(id)
    }

    /// Native value, clamped to the parameter's range.
    pub fn set_param(&self, id: ParamId, native: f32) {
        self.core.lock().set_param(id, native);
    }

    /// Normalized `0..=1` control value.
    pub fn set_control(&self, id: ParamId, control: f32) {
        let mut core = self.core.lock();
        core.params.set_control(id, control);
        core.push_param(id);
    }

    /// Commits a whole parameter set under one lock. Only values that differ
    /// from the current ones are pushed, so an unchanged mode or band shift
    /// does not reset anything.
    pub fn apply_parameters(&self, params: &Parameters) {
        let mut core = self.core.lock();
        for id in ParamId::ALL {
            let native = params.get(id);
            if core.params.get(id) != native {
                core.set_param(id, native);
            }
        }
    }

    pub fn set_portamento_time(&self, seconds: f32) {
        self.set_param(ParamId::PortamentoTime, seconds);
    }

    pub fn set_attack_time(&self, seconds: f32) {
        self.set_param(ParamId::AttackTime, seconds);
    }

    pub fn set_release_time(&self, seconds: f32) {
        self.set_param(ParamId::ReleaseTime, seconds);
    }

    pub fn set_lfo_rate(&self, hz: f32) {
        self.set_param(ParamId::LfoRate, hz);
    }

    pub fn set_mod_range(&self, semitones: f32) {
        self.set_param(ParamId::ModRange, semitones);
    }

    pub fn set_bend_range(&self, semitones: f32) {
        self.set_param(ParamId::BendRange, semitones);
    }

    /// Resets the instrument.
    pub fn set_mono_mode(&self, mono: bool) {
        self.set_param(ParamId::MonoMode, if mono { 0.0 } else { 1.0 });
    }

    pub fn set_carrier_gain(&self, gain: f32) {
        self.set_param(ParamId::CarrierGain, gain);
    }

    pub fn set_modulator_gain(&self, gain: f32) {
        self.set_param(ParamId::ModulatorGain, gain);
    }

    pub fn set_output_gain(&self, gain: f32) {
        self.set_param(ParamId::OutputGain, gain);
    }

    pub fn set_noise_gain(&self, gain: f32) {
        self.set_param(ParamId::NoiseGain, gain);
    }

    /// Resets the vocoder.
    pub fn set_band_shift(&self, bands: i32) {
        self.set_param(ParamId::BandShift, bands as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SR: f32 = 44100.0;

    fn tone(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| 0.5 * (std::f32::consts::TAU * freq * n as f32 / SR).sin())
            .collect()
    }

    /// Prepared for mono in and out, with the noise injection off so that
    /// only the instrument excites the carrier.
    fn quiet_engine() -> VocoderEngine {
        let engine = VocoderEngine::new();
        engine.prepare(SR, 1, 1, 1);
        engine.set_noise_gain(0.0);
        engine
    }

    /// Mono carrier, mono modulator, one output. Events are `(frame, kind)`
    /// in absolute frames and get split over blocks of `block`.
    fn run_blocks(engine: &VocoderEngine, modulator: &[f32], events: &[(usize, NoteEventKind)], block: usize) -> Vec<f32> {
        let silence = vec![0.0; modulator.len()];
        let mut out = vec![0.0; modulator.len()];
        for (start, chunk) in out.chunks_mut(block).enumerate().map(|(i, c)| (i * block, c)) {
            let len = chunk.len();
            let evs = events
                .iter()
                .filter(|(f, _)| *f >= start && *f < start + len)
                .map(|&(f, kind)| NoteEvent::new(f - start, kind));
            let c: &[f32] = &silence[start..start + len];
            let m: &[f32] = &modulator[start..start + len];
            engine.process(&[c], &[m], &mut [chunk], evs);
        }
        out
    }

    #[test]
    fn unprepared_engine_leaves_output_alone() {
        let engine = VocoderEngine::new();
        let input = [0.5f32; 64];
        let mut out = [7.0f32; 64];
        engine.process(&[&input], &[&input], &mut [&mut out], [NoteEvent::note_on(0, 60)]);
        assert!(out.iter().all(|&v| v == 7.0));
        assert!(!engine.is_prepared());
    }

    #[test]
    fn too_few_channels_is_a_no_op() {
        let engine = VocoderEngine::new();
        engine.prepare(SR, 1, 1, 2);
        let input = [0.5f32; 64];
        let mut out = [7.0f32; 64];
        engine.process(&[&input], &[&input], &mut [&mut out], []);
        assert!(out.iter().all(|&v| v == 7.0));

        engine.prepare(SR, 0, 1, 1);
        engine.process(&[&input], &[&input], &mut [&mut out], []);
        assert!(out.iter().all(|&v| v == 7.0));
    }

    #[test]
    fn silence_in_silence_out() {
        let engine = VocoderEngine::new();
        engine.prepare(SR, 2, 1, 2);
        let zeros = [0.0f32; 256];
        let mut l = [1.0f32; 256];
        let mut r = [1.0f32; 256];
        engine.process(&[&zeros, &zeros], &[&zeros], &mut [&mut l, &mut r], []);
        assert!(l.iter().chain(&r).all(|&v| v == 0.0));
        assert_eq!(engine.levels(), Levels::default());
    }

    #[test]
    fn note_and_voice_make_sound_on_every_output() {
        let engine = VocoderEngine::new();
        engine.prepare(SR, 1, 1, 2);
        let zeros = vec![0.0f32; 4096];
        let voice = tone(440.0, 4096);
        let mut l = vec![0.0f32; 4096];
        let mut r = vec![0.0f32; 4096];
        engine.process(&[&zeros], &[&voice], &mut [&mut l, &mut r], [NoteEvent::note_on(0, 57)]);
        assert!(l.iter().any(|&v| v.abs() > 1e-3));
        assert_eq!(l, r);

        let levels = engine.levels();
        assert!(levels.io.iter().all(|&v| v > 0.0));
        assert!(levels.bands.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn events_land_on_the_same_sample_whatever_the_block_size() {
        let voice = tone(330.0, 2048);
        let events = [
            (300, NoteEventKind::NoteOn(60)),
            (301, NoteEventKind::SetPitchBend(0.5)),
            (700, NoteEventKind::NoteOn(67)),
            (1500, NoteEventKind::NoteOff(60)),
        ];

        let whole = run_blocks(&quiet_engine(), &voice, &events, 2048);
        let split = run_blocks(&quiet_engine(), &voice, &events, 64);

        assert_eq!(whole, split);
        assert!(whole[..300].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn late_and_backward_offsets() {
        let voice = tone(330.0, 512);
        let zeros = vec![0.0f32; 512];

        // past the end fires at the end of the block
        let a = quiet_engine();
        let mut first = vec![0.0f32; 256];
        a.process(&[&zeros[..256]], &[&voice[..256]], &mut [&mut first], [NoteEvent::note_on(10_000, 60)]);
        assert!(first.iter().all(|&v| v == 0.0));
        let mut second = vec![0.0f32; 256];
        a.process(&[&zeros[256..]], &[&voice[256..]], &mut [&mut second], []);

        let b = quiet_engine();
        let mut reference = vec![0.0f32; 512];
        b.process(&[&zeros], &[&voice], &mut [&mut reference], [NoteEvent::note_on(256, 60)]);
        assert_eq!(&reference[256..], &second[..]);
        assert!(second.iter().any(|&v| v != 0.0));

        // an earlier offset after a later one fires at the later one
        let c = quiet_engine();
        let mut out_c = vec![0.0f32; 256];
        c.process(
            &[&zeros[..256]],
            &[&voice[..256]],
            &mut [&mut out_c],
            [NoteEvent::note_on(200, 60), NoteEvent::note_on(50, 64)],
        );
        let d = quiet_engine();
        let mut out_d = vec![0.0f32; 256];
        d.process(
            &[&zeros[..256]],
            &[&voice[..256]],
            &mut [&mut out_d],
            [NoteEvent::note_on(200, 60), NoteEvent::note_on(200, 64)],
        );
        assert_eq!(out_c, out_d);
        assert!(out_c[..200].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn parameters_reach_the_engine() {
        let engine = VocoderEngine::new();
        assert_relative_eq!(engine.param(ParamId::OutputGain), 2.0);

        engine.set_output_gain(50.0);
        assert_relative_eq!(engine.param(ParamId::OutputGain), 10.0, epsilon = 1e-4);

        engine.set_control(ParamId::BandShift, 1.0);
        assert_eq!(engine.parameters().band_shift, 4);

        engine.set_mono_mode(true);
        assert!(engine.parameters().mono);

        let mut p = Parameters::default();
        p.noise_gain = 0.0;
        p.attack_time = 0.1;
        engine.apply_parameters(&p);
        assert_eq!(engine.parameters(), p);
    }

    #[test]
    fn loaded_parameters_are_clamped() {
        let loaded: Parameters =
            serde_json::from_str(r#"{ "band_shift": -2147483648, "output_gain": 1000.0 }"#).unwrap();
        let engine = VocoderEngine::with_parameters(loaded);
        assert_eq!(engine.parameters().band_shift, -4);
        assert_relative_eq!(engine.param(ParamId::OutputGain), 10.0, epsilon = 1e-4);

        engine.prepare(SR, 1, 1, 1);
        let voice = tone(440.0, 512);
        let mut out = vec![0.0f32; 512];
        engine.process(&[&voice], &[&voice], &mut [&mut out], [NoteEvent::note_on(0, 60)]);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_output_gain_mutes_but_meters_keep_running() {
        let engine = VocoderEngine::new();
        engine.prepare(SR, 1, 1, 1);
        engine.set_output_gain(0.0);
        let zeros = vec![0.0f32; 2048];
        let voice = tone(500.0, 2048);
        let mut out = vec![1.0f32; 2048];
        engine.process(&[&zeros], &[&voice], &mut [&mut out], [NoteEvent::note_on(0, 60)]);
        assert!(out.iter().all(|&v| v == 0.0));
        let levels = engine.levels();
        assert!(levels.io[METER_CARRIER] > 0.0);
        assert!(levels.io[METER_MODULATOR] > 0.0);
        assert_eq!(levels.io[METER_OUTPUT], 0.0);
    }

    #[test]
    fn clones_share_one_engine() {
        let engine = VocoderEngine::new();
        let control = engine.clone();
        control.set_lfo_rate(20.0);
        assert_relative_eq!(engine.param(ParamId::LfoRate), 20.0, epsilon = 1e-4);
        control.prepare(48000.0, 1, 1, 1);
        assert!(engine.is_prepared());
        assert_eq!(engine.sample_rate(), 48000.0);
        engine.unprepare();
        engine.unprepare();
        assert_eq!(control.layout(), ChannelLayout::default());
    }
}
