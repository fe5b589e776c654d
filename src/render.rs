//! Offline rendering: WAV files in and out, and a score of timed events
//! driven through the engine block by block.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::VocoderEngine;
use crate::error::{Result, VocoderError};
use crate::event::{NoteEvent, NoteEventKind};

/// Loads a WAV file and averages its channels down to one. Returns the
/// samples and the file's sample rate.
pub fn read_wav_mono(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path.as_ref())?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=16) => {
            let scale = (1i32 << (bits - 1)) as f32;
            reader
                .samples::<i16>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
        (SampleFormat::Int, bits @ 17..=32) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
        (format, bits) => {
            return Err(VocoderError::InvalidConfig(format!(
                "unsupported WAV sample format {format:?} at {bits} bits"
            )));
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect::<Vec<_>>();

    debug!(
        path = %path.as_ref().display(),
        sample_rate = spec.sample_rate,
        channels,
        frames = samples.len(),
        "loaded WAV"
    );
    Ok((samples, spec.sample_rate))
}

/// Writes 32-bit float mono.
pub fn write_wav(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub frame: usize,
    pub kind: NoteEventKind,
}

/// Timed events in absolute frames, always sorted by frame. Events sharing a
/// frame keep the order they were added in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    events: Vec<ScoreEvent>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: usize, kind: NoteEventKind) -> &mut Self {
        let at = self.events.partition_point(|e| e.frame <= frame);
        self.events.insert(at, ScoreEvent { frame, kind });
        self
    }

    /// Note on at `start`, note off `length` frames later.
    pub fn note(&mut self, note: u8, start: usize, length: usize) -> &mut Self {
        self.push(start, NoteEventKind::NoteOn(note));
        self.push(start + length, NoteEventKind::NoteOff(note))
    }

    pub fn events(&self) -> &[ScoreEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Frame of the last event, zero for an empty score.
    pub fn end_frame(&self) -> usize {
        self.events.last().map_or(0, |e| e.frame)
    }
}

/// Runs `modulator` through the engine with mono in and out and returns as
/// many output samples as there are modulator samples.
///
/// The engine is prepared at its current sample rate, which resets it. A
/// missing or short carrier is padded with silence so the instrument alone
/// excites the vocoder. Score events past the end are dropped.
pub fn render_offline(
    engine: &VocoderEngine,
    carrier: Option<&[f32]>,
    modulator: &[f32],
    score: &Score,
    block_size: usize,
) -> Vec<f32> {
    let len = modulator.len();
    let block_size = block_size.max(1);

    let mut carrier_buf = vec![0.0; len];
    if let Some(carrier) = carrier {
        let n = carrier.len().min(len);
        carrier_buf[..n].copy_from_slice(&carrier[..n]);
    }

    engine.prepare(engine.sample_rate(), 1, 1, 1);

    let mut output = vec![0.0; len];
    let events = score.events();
    let mut next = 0;
    let mut start = 0;
    while start < len {
        let end = (start + block_size).min(len);
        let first = next;
        while next < events.len() && events[next].frame < end {
            next += 1;
        }
        let block_events = events[first..next]
            .iter()
            .map(|e| NoteEvent::new(e.frame.saturating_sub(start), e.kind));
        engine.process(
            &[&carrier_buf[start..end]],
            &[&modulator[start..end]],
            &mut [&mut output[start..end]],
            block_events,
        );
        start = end;
    }

    debug!(frames = len, events = next, "offline render finished");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn voice(len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| 0.4 * (std::f32::consts::TAU * 220.0 * n as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn float_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        let samples = voice(1000);
        write_wav(&path, &samples, 22050).unwrap();

        let (back, sr) = read_wav_mono(&path).unwrap();
        assert_eq!(sr, 22050);
        assert_eq!(back, samples);
    }

    #[test]
    fn stereo_int_files_are_mixed_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..4 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let (mono, sr) = read_wav_mono(&path).unwrap();
        assert_eq!(sr, 48000);
        assert_eq!(mono.len(), 4);
        for s in mono {
            assert_relative_eq!(s, 0.25);
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_wav_mono(dir.path().join("nope.wav")).is_err());
    }

    #[test]
    fn score_stays_sorted() {
        let mut score = Score::new();
        score.note(60, 100, 50).note(64, 20, 10);
        score.push(100, NoteEventKind::SetModWheel(0.5));

        let frames: Vec<usize> = score.events().iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![20, 30, 100, 100, 150]);
        // same frame keeps insertion order
        assert_eq!(score.events()[2].kind, NoteEventKind::NoteOn(60));
        assert_eq!(score.events()[3].kind, NoteEventKind::SetModWheel(0.5));
        assert_eq!(score.end_frame(), 150);
        assert_eq!(Score::new().end_frame(), 0);
    }

    #[test]
    fn block_size_does_not_change_the_render() {
        let modulator = voice(3000);
        let mut score = Score::new();
        score.note(57, 250, 1200).note(64, 900, 1500);

        let big = render_offline(&VocoderEngine::new(), None, &modulator, &score, 4096);
        let small = render_offline(&VocoderEngine::new(), None, &modulator, &score, 100);
        assert_eq!(big.len(), 3000);
        assert_eq!(big, small);
        assert!(big.iter().any(|&v| v.abs() > 1e-4));
    }

    #[test]
    fn missing_carrier_is_silence() {
        let modulator = voice(1024);
        let mut score = Score::new();
        score.note(60, 0, 512);

        let engine = VocoderEngine::new();
        let none = render_offline(&engine, None, &modulator, &score, 256);
        // rendering prepares again, so the same engine starts from scratch,
        // apart from the noise sequence
        engine.set_noise_gain(0.0);
        let silent = render_offline(&engine, Some(&[0.0f32; 10][..]), &modulator, &score, 256);
        let other = VocoderEngine::new();
        other.set_noise_gain(0.0);
        let reference = render_offline(&other, None, &modulator, &score, 256);
        assert_eq!(none.len(), silent.len());
        assert_eq!(silent, reference);
    }
}
