use thiserror::Error;

pub type Result<T> = std::result::Result<T, VocoderError>;

// Nothing in the audio path returns these; they come from device setup and file I/O.
#[derive(Debug, Error)]
pub enum VocoderError {
    #[error("Audio Error: {0}")]
    Audio(String),

    #[error("WAV Error: {0}")]
    Wav(#[from] hound::Error),

    #[error("File Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Configuration: {0}")]
    InvalidConfig(String),

    #[error("Parsing Error: {0}")]
    Parse(String),
}
