use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NoteEventKind {
    NoteOn(u8),
    NoteOff(u8),
    /// `0..=1`
    SetModWheel(f32),
    /// `-1..=1`
    SetPitchBend(f32),
}

/// Something for the instrument to do at `offset` samples into the block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub offset: usize,
    pub kind: NoteEventKind,
}

impl NoteEvent {
    pub fn new(offset: usize, kind: NoteEventKind) -> Self {
        NoteEvent { offset, kind }
    }

    pub fn note_on(offset: usize, note: u8) -> Self {
        Self::new(offset, NoteEventKind::NoteOn(note))
    }

    pub fn note_off(offset: usize, note: u8) -> Self {
        Self::new(offset, NoteEventKind::NoteOff(note))
    }

    /// Decodes a MIDI channel voice message. The channel nibble is ignored and
    /// anything the instrument has no use for yields `None`.
    pub fn from_midi(offset: usize, bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        let data1 = bytes.get(1).copied();
        let data2 = bytes.get(2).copied();

        let kind = match status & 0xF0 {
            0x80 => NoteEventKind::NoteOff(data1? & 0x7F),
            0x90 => {
                let note = data1? & 0x7F;
                if data2? & 0x7F > 0 {
                    NoteEventKind::NoteOn(note)
                } else {
                    NoteEventKind::NoteOff(note)
                }
            }
            0xB0 if data1? == 1 => NoteEventKind::SetModWheel((data2? & 0x7F) as f32 / 127.0),
            0xE0 => {
                let lsb = (data1? & 0x7F) as i32;
                let msb = (data2? & 0x7F) as i32;
                NoteEventKind::SetPitchBend((((msb << 7) | lsb) - 8192) as f32 / 8192.0)
            }
            _ => return None,
        };
        Some(NoteEvent::new(offset, kind))
    }
}
