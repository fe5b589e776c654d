//            _______  _______  _______  ______  _________ _______
// |\     /|(  ___  )(  ____ \(  ___  )(  __  \ \__   __/(  ____ \
// | )   ( || (   ) || (    \/| (   ) || (  \  )   ) (   | (    \/
// | |   | || |   | || |      | |   | || |   ) |   | |   | (__
// ( (   ) )| |   | || |      | |   | || |   | |   | |   |  __)
//  \ \_/ / | |   | || |      | |   | || |   ) |   | |   | (
//   \   /  | (___) || (____/\| (___) || (__/  )___) (___| (____/\
//    \_/   (_______)(_______/(_______)(______/ \_______/(_______/

pub mod error;
pub mod iir;
pub mod design;
pub mod curve;
pub mod smoothing;
pub mod envelope;
pub mod oscillator;
pub mod noise;
pub mod vocoder;
pub mod instrument;
pub mod params;
pub mod event;
pub mod engine;
pub mod render;
pub mod utils;
#[cfg(feature = "live")]
pub mod live;

pub use error::{Result, VocoderError};
pub use iir::{Filter, Float, Iir, Iir1, Iir2};
pub use design::{Analog1Filter, Analog1Type, DcBlocker, Rbj2Filter, Rbj2Type};
pub use curve::{CurveMap, CurveMapExponential, CurveMapLinear};
pub use smoothing::{LagFilter, LeadFilter, LeakyIntegrator};
pub use envelope::{EnvelopeDetector, EnvelopeFollower};
pub use oscillator::{BlitOscillator, Oscillator, SineOscillator};
pub use noise::NoiseGenerator;
pub use vocoder::{BAND_COUNT, CascadedBandpass, ChannelVocoder};
pub use instrument::PulseInstrument;
pub use params::{ParamConverter, ParamId, Parameters};
pub use event::{NoteEvent, NoteEventKind};
pub use engine::{ChannelLayout, Levels, VocoderEngine};
pub use render::{Score, ScoreEvent, read_wav_mono, render_offline, write_wav};
#[cfg(feature = "live")]
pub use live::LiveSession;
