pub mod analyzer;
pub mod source;

pub use analyzer::{AudioFrame, FrameCell, SpectralAnalyzer, NUM_BINS};
pub use source::{AnalysisTap, AudioSourceAdapter, CaptureTap};
