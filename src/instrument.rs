use crate::curve::{CurveMap, CurveMapExponential};
use crate::iir::Filter;
use crate::oscillator::{BlitOscillator, Oscillator, SineOscillator};
use crate::smoothing::LagFilter;

pub const NUM_VOICES: usize = 8;
pub const MONO_MAX_STACK: usize = 3;

const SOUNDING_THRESHOLD: f32 = 0.001;
// one slot per distinct `u8` note, the stack is deduplicated
const NOTE_STACK_CAPACITY: usize = 256;

// A0 and A8 in scientific pitch notation
const PITCH_MAP_LOW_NOTE: f32 = 21.0;
const PITCH_MAP_HIGH_NOTE: f32 = 117.0;
const PITCH_MAP_LOW_HZ: f32 = 27.5;
const PITCH_MAP_HIGH_HZ: f32 = 7040.0;

/// Attack/release envelope: a lag running toward the gate value.
#[derive(Debug, Clone)]
pub struct EnvelopeAr {
    lag: LagFilter<f32>,
    attack_tc: f32,
    release_tc: f32,
    gate: f32,
}

impl Default for EnvelopeAr {
    fn default() -> Self {
        EnvelopeAr {
            lag: LagFilter::default(),
            attack_tc: 1.0,
            release_tc: 1.0,
            gate: 0.0,
        }
    }
}

impl EnvelopeAr {
    /// Samples.
    pub fn set_attack_tc(&mut self, tc: f32) {
        self.attack_tc = tc;
    }

    pub fn set_release_tc(&mut self, tc: f32) {
        self.release_tc = tc;
    }

    pub fn reset(&mut self) {
        self.gate = 0.0;
        self.lag.reset();
    }

    pub fn gate_on(&mut self) {
        self.gate = 1.0;
        self.lag.set_time_constant(self.attack_tc.max(1.0));
    }

    pub fn gate_off(&mut self) {
        self.gate = 0.0;
        self.lag.set_time_constant(self.release_tc.max(1.0));
    }

    pub fn is_gated(&self) -> bool {
        self.gate > 0.0
    }

    pub fn is_sounding(&self) -> bool {
        self.is_gated() || self.lag.last_value() >= SOUNDING_THRESHOLD
    }

    pub fn value(&self) -> f32 {
        self.lag.last_value()
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        self.lag.process(self.gate)
    }
}

/// One pulse voice. Lifecycle: unbound, sounding, releasing, unbound again
/// once the envelope drops under the threshold.
#[derive(Debug, Clone)]
pub struct PulseVoice {
    osc: BlitOscillator<f32>,
    env: EnvelopeAr,
    porta: LagFilter<f32>,
    note: Option<u8>,
    pitch_mod: f32,
}

impl Default for PulseVoice {
    fn default() -> Self {
        PulseVoice {
            osc: BlitOscillator::default(),
            env: EnvelopeAr::default(),
            porta: LagFilter::with_time_constant(1.0),
            note: None,
            pitch_mod: 0.0,
        }
    }
}

impl PulseVoice {
    pub fn set_portamento_tc(&mut self, tc: f32) {
        self.porta.set_time_constant(tc.max(1.0));
    }

    pub fn set_attack_tc(&mut self, tc: f32) {
        self.env.set_attack_tc(tc);
    }

    pub fn set_release_tc(&mut self, tc: f32) {
        self.env.set_release_tc(tc);
    }

    pub fn set_pitch_mod(&mut self, semitones: f32) {
        self.pitch_mod = semitones;
    }

    pub fn reset(&mut self) {
        self.osc.reset();
        self.env.reset();
        self.note = None;
    }

    /// Binds `note` and gates on. With `glide_from` the portamento restarts at
    /// that pitch, otherwise it continues from wherever it is.
    pub fn note_on(&mut self, note: u8, glide_from: Option<u8>, pitch_map: &CurveMapExponential<f32>) {
        self.note = Some(note);
        if let Some(from) = glide_from {
            self.porta.reset_to(pitch_map.map(from as f32 + self.pitch_mod));
        }
        self.env.gate_on();
    }

    /// Rebinds without touching the gate or the portamento.
    pub fn retune(&mut self, note: u8) {
        self.note = Some(note);
    }

    pub fn note_off(&mut self) {
        self.env.gate_off();
    }

    pub fn note(&self) -> Option<u8> {
        self.note
    }

    pub fn is_sounding(&self) -> bool {
        self.env.is_sounding()
    }

    pub fn is_gated(&self) -> bool {
        self.env.is_gated()
    }

    pub fn level(&self) -> f32 {
        self.env.value()
    }

    /// Current oscillator frequency, normalized.
    pub fn freq(&self) -> f32 {
        self.osc.freq()
    }

    #[inline]
    pub fn process(&mut self, pitch_map: &CurveMapExponential<f32>) -> f32 {
        let Some(note) = self.note else {
            return 0.0;
        };
        let target = pitch_map.map(note as f32 + self.pitch_mod);
        self.osc.set_freq(self.porta.process(target));
        let v = self.env.process() * self.osc.process();
        if !self.env.is_sounding() {
            self.note = None;
        }
        v
    }
}

/// Polyphonic (or mono with legato glide) band-limited pulse synth.
///
/// Voices live in a fixed arena. Their indices are split between an idle list
/// and an active list; the active list is ordered oldest first and that order
/// decides who gets stolen.
#[derive(Debug, Clone)]
pub struct PulseInstrument {
    pitch_map: CurveMapExponential<f32>,
    lfo: SineOscillator<f32>,
    voices: [PulseVoice; NUM_VOICES],
    idle: Vec<usize>,
    active: Vec<usize>,
    note_stack: Vec<u8>,
    portamento_time: f32,
    attack_time: f32,
    release_time: f32,
    lfo_rate: f32,
    mod_range: f32,
    bend_range: f32,
    mod_wheel: f32,
    pitch_bend: f32,
    sample_rate: f32,
    mono: bool,
}

impl Default for PulseInstrument {
    fn default() -> Self {
        let mut inst = PulseInstrument {
            pitch_map: CurveMapExponential::default(),
            lfo: SineOscillator::default(),
            voices: std::array::from_fn(|_| PulseVoice::default()),
            idle: Vec::with_capacity(NUM_VOICES),
            active: Vec::with_capacity(NUM_VOICES),
            note_stack: Vec::with_capacity(NOTE_STACK_CAPACITY),
            portamento_time: 0.01,
            attack_time: 0.01,
            release_time: 0.01,
            lfo_rate: 1.0,
            mod_range: 2.0,
            bend_range: 2.0,
            mod_wheel: 0.0,
            pitch_bend: 0.0,
            sample_rate: 44100.0,
            mono: false,
        };
        inst.prepare(44100.0);
        inst
    }
}

impl PulseInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.pitch_map.setup(
            PITCH_MAP_LOW_NOTE,
            PITCH_MAP_HIGH_NOTE,
            PITCH_MAP_LOW_HZ / sample_rate,
            PITCH_MAP_HIGH_HZ / sample_rate,
        );
        self.lfo.set_freq(self.lfo_rate / sample_rate);
        for voice in self.voices.iter_mut() {
            voice.set_portamento_tc(self.portamento_time * sample_rate);
            voice.set_attack_tc(self.attack_time * sample_rate);
            voice.set_release_tc(self.release_time * sample_rate);
        }
        self.reset();
    }

    pub fn unprepare(&mut self) {}

    /// Silences every voice and forgets all held notes.
    pub fn reset(&mut self) {
        self.lfo.reset();
        for voice in self.voices.iter_mut() {
            voice.reset();
        }
        self.active.clear();
        self.idle.clear();
        self.idle.extend(0..NUM_VOICES);
        self.note_stack.clear();
    }

    /// Seconds.
    pub fn set_portamento_time(&mut self, seconds: f32) {
        self.portamento_time = seconds;
        let tc = seconds * self.sample_rate;
        for voice in self.voices.iter_mut() {
            voice.set_portamento_tc(tc);
        }
    }

    pub fn set_attack_time(&mut self, seconds: f32) {
        self.attack_time = seconds;
        let tc = seconds * self.sample_rate;
        for voice in self.voices.iter_mut() {
            voice.set_attack_tc(tc);
        }
    }

    pub fn set_release_time(&mut self, seconds: f32) {
        self.release_time = seconds;
        let tc = seconds * self.sample_rate;
        for voice in self.voices.iter_mut() {
            voice.set_release_tc(tc);
        }
    }

    /// Hz.
    pub fn set_lfo_rate(&mut self, hz: f32) {
        self.lfo_rate = hz;
        self.lfo.set_freq(hz / self.sample_rate);
    }

    /// Semitones of vibrato at full mod wheel.
    pub fn set_mod_range(&mut self, semitones: f32) {
        self.mod_range = semitones;
    }

    /// Semitones at full pitch bend.
    pub fn set_bend_range(&mut self, semitones: f32) {
        self.bend_range = semitones;
    }

    /// `0..=1`
    pub fn set_mod_wheel(&mut self, v: f32) {
        self.mod_wheel = v;
    }

    /// `-1..=1`
    pub fn set_pitch_bend(&mut self, v: f32) {
        self.pitch_bend = v;
    }

    pub fn set_mono_mode(&mut self, mono: bool) {
        self.mono = mono;
        self.reset();
    }

    pub fn is_mono(&self) -> bool {
        self.mono
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn pitch_map(&self) -> &CurveMapExponential<f32> {
        &self.pitch_map
    }

    /// Held notes, most recent last.
    pub fn held_notes(&self) -> &[u8] {
        &self.note_stack
    }

    /// Active voices, oldest first.
    pub fn active_voices(&self) -> impl Iterator<Item = &PulseVoice> + '_ {
        self.active.iter().map(|&i| &self.voices[i])
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    fn take_idle(&mut self) -> Option<usize> {
        if self.idle.is_empty() {
            None
        } else {
            Some(self.idle.remove(0))
        }
    }

    fn active_position(&self, note: u8) -> Option<usize> {
        self.active.iter().position(|&i| self.voices[i].note() == Some(note))
    }

    pub fn note_on(&mut self, note: u8) {
        self.note_stack.retain(|&n| n != note);
        let glide_from = self.note_stack.last().copied().unwrap_or(note);
        self.note_stack.push(note);

        if self.mono {
            let voice = match self.active.first() {
                Some(&v) => v,
                None => match self.take_idle() {
                    Some(v) => {
                        self.active.push(v);
                        v
                    }
                    None => return,
                },
            };
            self.voices[voice].note_on(note, Some(glide_from), &self.pitch_map);
            if self.note_stack.len() > MONO_MAX_STACK {
                self.note_stack.remove(0);
            }
        } else {
            // a voice already on `note` retunes in place instead of gliding
            let (voice, glide_from) = if let Some(pos) = self.active_position(note) {
                (self.active.remove(pos), note)
            } else if let Some(v) = self.take_idle() {
                (v, glide_from)
            } else if !self.active.is_empty() {
                // oldest first, whatever its level
                (self.active.remove(0), glide_from)
            } else {
                return;
            };
            self.active.push(voice);
            self.voices[voice].note_on(note, Some(glide_from), &self.pitch_map);
        }
    }

    pub fn note_off(&mut self, note: u8) {
        self.note_stack.retain(|&n| n != note);

        if self.mono {
            if let Some(&v) = self.active.first() {
                match self.note_stack.last() {
                    Some(&top) => self.voices[v].retune(top),
                    None => self.voices[v].note_off(),
                }
            }
        } else if let Some(pos) = self.active_position(note) {
            let v = self.active[pos];
            self.voices[v].note_off();
        }
    }

    /// Renders one sample and hands finished voices back to the idle list.
    #[inline]
    pub fn process(&mut self) -> f32 {
        let pitch_mod = self.lfo.process() * self.mod_range * self.mod_wheel + self.bend_range * self.pitch_bend;
        let mut out = 0.0;
        for &i in &self.active {
            let voice = &mut self.voices[i];
            voice.set_pitch_mod(pitch_mod);
            out += voice.process(&self.pitch_map);
        }

        let mut k = 0;
        while k < self.active.len() {
            let i = self.active[k];
            if self.voices[i].is_sounding() {
                k += 1;
            } else {
                self.active.remove(k);
                self.idle.push(i);
            }
        }
        out
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.process();
        }
    }

    pub fn render_add(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s += self.process();
        }
    }
}
