//! Real time playback on the default output device.
//!
//! The modulator is a prerecorded buffer played in a loop, the carrier is the
//! pulse instrument alone. Note events come in through a channel and land at
//! the start of the next device callback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use tracing::{error, info};

use crate::engine::VocoderEngine;
use crate::error::{Result, VocoderError};
use crate::event::{NoteEvent, NoteEventKind};

/// Frames rendered per engine call inside the callback.
const MAX_BLOCK: usize = 1024;
/// Events taken from the channel per callback; the rest wait for the next one.
const MAX_EVENTS_PER_CALLBACK: usize = 256;

/// Plays a buffer endlessly.
#[derive(Debug, Clone)]
pub struct ModulatorLoop {
    samples: Vec<f32>,
    pos: usize,
}

impl ModulatorLoop {
    pub fn new(samples: Vec<f32>) -> Self {
        ModulatorLoop { samples, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// An empty loop yields silence.
    pub fn fill(&mut self, out: &mut [f32]) {
        if self.samples.is_empty() {
            out.fill(0.0);
            return;
        }
        let mut written = 0;
        while written < out.len() {
            let n = (self.samples.len() - self.pos).min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.samples[self.pos..self.pos + n]);
            written += n;
            self.pos = (self.pos + n) % self.samples.len();
        }
    }
}

/// Copies `mono` into every channel of the interleaved `data`.
fn spread(mono: &[f32], data: &mut [f32], channels: usize) {
    for (frame, &s) in data.chunks_mut(channels).zip(mono) {
        frame.fill(s);
    }
}

/// Callback side state. Every buffer is sized up front.
struct Renderer {
    engine: VocoderEngine,
    modulator: ModulatorLoop,
    events: Receiver<NoteEventKind>,
    pending: Vec<NoteEvent>,
    carrier: Vec<f32>,
    modulator_buf: Vec<f32>,
    mono: Vec<f32>,
    channels: usize,
}

impl Renderer {
    fn new(engine: VocoderEngine, modulator: ModulatorLoop, events: Receiver<NoteEventKind>, channels: usize) -> Self {
        Renderer {
            engine,
            modulator,
            events,
            pending: Vec::with_capacity(MAX_EVENTS_PER_CALLBACK),
            carrier: vec![0.0; MAX_BLOCK],
            modulator_buf: vec![0.0; MAX_BLOCK],
            mono: vec![0.0; MAX_BLOCK],
            channels: channels.max(1),
        }
    }

    fn drain_events(&mut self) {
        self.pending.clear();
        while self.pending.len() < MAX_EVENTS_PER_CALLBACK {
            match self.events.try_recv() {
                Ok(kind) => self.pending.push(NoteEvent::new(0, kind)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn render(&mut self, data: &mut [f32]) {
        self.drain_events();
        for chunk in data.chunks_mut(MAX_BLOCK * self.channels) {
            let frames = chunk.len() / self.channels;
            self.modulator.fill(&mut self.modulator_buf[..frames]);
            self.mono[..frames].fill(0.0);
            self.engine.process(
                &[&self.carrier[..frames]],
                &[&self.modulator_buf[..frames]],
                &mut [&mut self.mono[..frames]],
                self.pending.drain(..),
            );
            spread(&self.mono[..frames], chunk, self.channels);
        }
    }
}

/// A running output stream. Dropping it, or calling [`LiveSession::stop`],
/// stops playback and unprepares the engine.
pub struct LiveSession {
    stream: Stream,
    engine: VocoderEngine,
    events: Sender<NoteEventKind>,
    sample_rate: u32,
    channels: u16,
}

impl LiveSession {
    /// Opens the default output device and starts playing. The engine is
    /// prepared for the device's rate with one carrier, one modulator and
    /// one output channel; that output is copied to every device channel.
    /// `modulator_loop` is played as is, without resampling.
    pub fn start(engine: VocoderEngine, modulator_loop: Vec<f32>) -> Result<LiveSession> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VocoderError::Audio("No output device found".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| VocoderError::Audio(e.to_string()))?;
        let config: StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        engine.prepare(sample_rate as f32, 1, 1, 1);

        let (tx, rx) = unbounded();
        let mut renderer = Renderer::new(engine.clone(), ModulatorLoop::new(modulator_loop), rx, channels as usize);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.render(data),
                |err| error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| VocoderError::Audio(e.to_string()))?;
        stream.play().map_err(|e| VocoderError::Audio(e.to_string()))?;

        info!(sample_rate, channels, "live session started");
        Ok(LiveSession { stream, engine, events: tx, sample_rate, channels })
    }

    /// For handing to a MIDI or UI thread.
    pub fn sender(&self) -> Sender<NoteEventKind> {
        self.events.clone()
    }

    pub fn send(&self, kind: NoteEventKind) -> Result<()> {
        self.events
            .send(kind)
            .map_err(|_| VocoderError::Audio("live session is no longer running".to_string()))
    }

    pub fn note_on(&self, note: u8) -> Result<()> {
        self.send(NoteEventKind::NoteOn(note))
    }

    pub fn note_off(&self, note: u8) -> Result<()> {
        self.send(NoteEventKind::NoteOff(note))
    }

    pub fn engine(&self) -> &VocoderEngine {
        &self.engine
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        if let Err(err) = self.stream.pause() {
            error!(%err, "could not pause output stream");
        }
        self.engine.unprepare();
        info!("live session stopped");
    }
}
