//! Error taxonomy shared across the crate.
//!
//! Every variant is recoverable: the render and analysis loops keep running
//! and the owning subsystem returns to its idle/ready state after reporting.

/// Result alias carrying the crate error type.
pub type Result<T> = std::result::Result<T, VizError>;

#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// Microphone access refused or no capture device present. The user has
    /// to change device permissions; nothing is retried automatically.
    #[error("microphone access was denied or no input device is available")]
    PermissionDenied,

    /// The selected file could not be decoded into samples.
    #[error("failed to decode the audio file: {0}")]
    DecodeFailed(String),

    /// No container/codec combination was accepted by the encoder backend.
    #[error("no supported container/codec combination for {container}/{codec}")]
    UnsupportedFormat { container: String, codec: String },

    /// A recording finished with zero bytes of output; no file is written.
    #[error("recording produced an empty file")]
    EmptyRecording,

    /// The capture path (audio device, render surface or encoder) is not
    /// ready or failed mid-stream.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
