use crate::error::{Result, VocoderError};

/// Scientific pitch name to MIDI note number, `C4 = 60`. Accepts `#` or `s`
/// for sharp and `b` for flat, case insensitive, and octaves from -1 to 9.
pub fn parse_note(note_str: &str) -> Result<u8> {
    let trimmed = note_str.trim();
    let mut chars = trimmed.chars();
    let pitch_class = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(VocoderError::Parse(format!("Invalid note: {note_str:?}"))),
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') | Some('s') | Some('S') => (1, &rest[1..]),
        Some('b') | Some('B') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_str
        .trim()
        .parse()
        .map_err(|_| VocoderError::Parse(format!("Invalid octave in note: {note_str:?}")))?;

    let number = (octave + 1) * 12 + pitch_class + accidental;
    u8::try_from(number)
        .ok()
        .filter(|n| *n <= 127)
        .ok_or_else(|| VocoderError::Parse(format!("Note out of MIDI range: {note_str:?}")))
}

/// Equal tempered, A4 = 440 Hz.
pub fn note_to_hz(note: f32) -> f32 {
    440.0 * 2.0f32.powf((note - 69.0) / 12.0)
}

/// Zero gain gives negative infinity.
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.abs().log10()
}

pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn note_names() {
        assert_eq!(parse_note("C4").unwrap(), 60);
        assert_eq!(parse_note("a4").unwrap(), 69);
        assert_eq!(parse_note("C#4").unwrap(), 61);
        assert_eq!(parse_note("Cs4").unwrap(), 61);
        assert_eq!(parse_note("Db4").unwrap(), 61);
        assert_eq!(parse_note("Bb3").unwrap(), 58);
        assert_eq!(parse_note("C-1").unwrap(), 0);
        assert_eq!(parse_note("G9").unwrap(), 127);
        assert_eq!(parse_note(" E2 ").unwrap(), 40);
    }

    #[test]
    fn bad_notes() {
        assert!(parse_note("").is_err());
        assert!(parse_note("H4").is_err());
        assert!(parse_note("C").is_err());
        assert!(parse_note("Cb-1").is_err());
        assert!(parse_note("G#9").is_err());
        assert!(matches!(parse_note("X1"), Err(VocoderError::Parse(_))));
    }

    #[test]
    fn pitches_and_gains() {
        assert_relative_eq!(note_to_hz(69.0), 440.0);
        assert_relative_eq!(note_to_hz(57.0), 220.0, epsilon = 1e-3);
        assert_relative_eq!(note_to_hz(60.0), 261.6256, epsilon = 1e-3);
        assert_relative_eq!(gain_to_db(1.0), 0.0);
        assert_relative_eq!(gain_to_db(0.5), -6.0206, epsilon = 1e-3);
        assert!(gain_to_db(0.0).is_infinite());
        assert_relative_eq!(db_to_gain(-6.0206), 0.5, epsilon = 1e-4);
        assert_relative_eq!(db_to_gain(gain_to_db(2.0)), 2.0, epsilon = 1e-5);
    }
}
