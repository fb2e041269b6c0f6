//! Recording and export.
//!
//! [`ExportCapture`] drives one recording at a time through a small state
//! machine: negotiate a container/codec pair, feed frames and audio to the
//! encoder backend while recording, then assemble the produced chunks into
//! a file in the user's download directory.

pub mod encoder;

use std::path::PathBuf;

use crate::audio::CaptureTap;
use crate::error::{Result, VizError};
use crate::settings::{Codec, Settings};
use encoder::{candidates, EncoderBackend, ExportJob, FfmpegEncoder, MimeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    /// Encoder is flushing; no new frames are accepted.
    Processing,
}

pub struct ExportCapture {
    backend: Box<dyn EncoderBackend>,
    state: RecorderState,
    chunks: Vec<Vec<u8>>,
    mime: Option<MimeType>,
    out_dir: PathBuf,
}

impl ExportCapture {
    pub fn new() -> Self {
        Self::with_backend(Box::new(FfmpegEncoder::new()))
    }

    pub fn with_backend(backend: Box<dyn EncoderBackend>) -> Self {
        Self {
            backend,
            state: RecorderState::Idle,
            chunks: Vec::new(),
            mime: None,
            out_dir: default_output_dir(),
        }
    }

    /// Override where finished recordings are written.
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.out_dir = dir;
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// The negotiated format of the active recording, if any.
    pub fn mime(&self) -> Option<&MimeType> {
        self.mime.as_ref()
    }

    /// Negotiate an output format and start the encoder. The preferred
    /// codec's candidates are tried most specific first; if none is
    /// supported every other codec is tried before giving up.
    pub fn start(&mut self, job: ExportJob, settings: &Settings) -> Result<MimeType> {
        if self.state != RecorderState::Idle {
            return Err(VizError::CaptureUnavailable(
                "a recording is already in progress".into(),
            ));
        }

        let container = settings.export.container;
        let preferred = settings.export.codec;
        let mime = self
            .negotiate(container, preferred)
            .ok_or_else(|| VizError::UnsupportedFormat {
                container: container.extension().to_string(),
                codec: preferred.as_str().to_string(),
            })?;
        if mime.codec != preferred {
            println!(
                "Codec {} unavailable, falling back to {}",
                preferred.as_str(),
                mime
            );
        }

        self.backend.begin(&job, &mime)?;
        self.chunks.clear();
        self.state = RecorderState::Recording;
        self.mime = Some(mime.clone());
        println!("Recording {}x{} as {}", job.width, job.height, mime);
        Ok(mime)
    }

    fn negotiate(&self, container: crate::settings::Container, preferred: Codec) -> Option<MimeType> {
        let mut order = vec![preferred];
        order.extend(Codec::ALL.iter().copied().filter(|c| *c != preferred));
        for codec in order {
            for mime in candidates(container, codec) {
                if self.backend.supports(&mime) {
                    return Some(mime);
                }
            }
        }
        None
    }

    /// Feed one captured RGBA frame plus any audio recorded since the last
    /// tick, and collect encoder output as it becomes available.
    pub fn tick(&mut self, rgba: &[u8], audio_tap: &CaptureTap) -> Result<()> {
        if self.state != RecorderState::Recording {
            return Ok(());
        }
        let audio = audio_tap.drain();
        if !audio.is_empty() {
            self.backend.push_audio(&audio);
        }
        self.backend.push_video(rgba)?;
        while let Some(chunk) = self.backend.poll_chunk() {
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Stop the recording and write the result. A recording that produced
    /// zero bytes is reported as [`VizError::EmptyRecording`] and no file
    /// is created; the recorder returns to idle either way.
    pub fn stop(&mut self, settings: &Settings) -> Result<PathBuf> {
        if self.state != RecorderState::Recording {
            return Err(VizError::CaptureUnavailable("not recording".into()));
        }
        self.state = RecorderState::Processing;

        let result = self.finish_file(settings);
        self.chunks.clear();
        self.mime = None;
        self.state = RecorderState::Idle;
        result
    }

    fn finish_file(&mut self, settings: &Settings) -> Result<PathBuf> {
        let tail = self.backend.finish()?;

        let mut total = 0usize;
        for chunk in &self.chunks {
            total += chunk.len();
        }
        total += tail.len();
        if total == 0 {
            return Err(VizError::EmptyRecording);
        }

        let mut bytes = Vec::with_capacity(total);
        for chunk in self.chunks.drain(..) {
            bytes.extend_from_slice(&chunk);
        }
        bytes.extend_from_slice(&tail);

        let path = self.out_dir.join(settings.export_filename());
        std::fs::write(&path, &bytes)?;
        println!("Saved recording: {} ({} bytes)", path.display(), total);
        Ok(path)
    }
}

impl Default for ExportCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Container;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct StubLog {
        begun: Option<MimeType>,
        frames: usize,
        audio_samples: usize,
    }

    struct StubEncoder {
        log: Arc<Mutex<StubLog>>,
        supported: Vec<(Container, Codec)>,
        pending: Vec<Vec<u8>>,
        tail: Vec<u8>,
    }

    impl StubEncoder {
        fn new(supported: Vec<(Container, Codec)>) -> (Self, Arc<Mutex<StubLog>>) {
            let log = Arc::new(Mutex::new(StubLog::default()));
            (
                Self {
                    log: Arc::clone(&log),
                    supported,
                    pending: Vec::new(),
                    tail: Vec::new(),
                },
                log,
            )
        }
    }

    impl EncoderBackend for StubEncoder {
        fn supports(&self, mime: &MimeType) -> bool {
            self.supported.contains(&(mime.container, mime.codec))
        }
        fn begin(&mut self, _job: &ExportJob, mime: &MimeType) -> Result<()> {
            self.log.lock().unwrap().begun = Some(mime.clone());
            Ok(())
        }
        fn push_video(&mut self, _rgba: &[u8]) -> Result<()> {
            let mut log = self.log.lock().unwrap();
            log.frames += 1;
            self.pending.push(vec![log.frames as u8]);
            Ok(())
        }
        fn push_audio(&mut self, samples: &[f32]) {
            self.log.lock().unwrap().audio_samples += samples.len();
        }
        fn poll_chunk(&mut self) -> Option<Vec<u8>> {
            if self.pending.is_empty() {
                None
            } else {
                Some(self.pending.remove(0))
            }
        }
        fn finish(&mut self) -> Result<Vec<u8>> {
            Ok(std::mem::take(&mut self.tail))
        }
    }

    fn job() -> ExportJob {
        ExportJob {
            width: 4,
            height: 4,
            frame_rate: 30,
            bitrate_mbps: 8,
            audio_sample_rate: 48_000,
        }
    }

    fn settings_saving_to_temp() -> Settings {
        Settings::default()
    }

    fn capture_in_temp(stub: StubEncoder, tag: &str) -> (ExportCapture, PathBuf) {
        let dir = std::env::temp_dir().join(format!("wavescene-test-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut cap = ExportCapture::with_backend(Box::new(stub));
        cap.set_output_dir(dir.clone());
        (cap, dir)
    }

    #[test]
    fn lifecycle_idle_recording_idle() {
        let (stub, _log) = StubEncoder::new(vec![(Container::Webm, Codec::Vp9)]);
        let (mut cap, dir) = capture_in_temp(stub, "lifecycle");
        assert_eq!(cap.state(), RecorderState::Idle);

        cap.start(job(), &settings_saving_to_temp()).unwrap();
        assert_eq!(cap.state(), RecorderState::Recording);

        let tap = CaptureTap::new();
        tap.set_enabled(true);
        tap.push(&[0.1, 0.2]);
        cap.tick(&[0u8; 64], &tap).unwrap();

        let path = cap.stop(&settings_saving_to_temp()).unwrap();
        assert_eq!(cap.state(), RecorderState::Idle);
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_recording_writes_no_file() {
        let (stub, _log) = StubEncoder::new(vec![(Container::Webm, Codec::Vp9)]);
        let (mut cap, dir) = capture_in_temp(stub, "empty");
        cap.start(job(), &settings_saving_to_temp()).unwrap();

        // No frames pushed, so stop sees zero bytes
        let err = cap.stop(&settings_saving_to_temp()).unwrap_err();
        assert!(matches!(err, VizError::EmptyRecording));
        assert_eq!(cap.state(), RecorderState::Idle);

        let path = dir.join(settings_saving_to_temp().export_filename());
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unsupported_format_fails_before_begin() {
        let (stub, log) = StubEncoder::new(vec![]);
        let mut cap = ExportCapture::with_backend(Box::new(stub));
        let err = cap.start(job(), &settings_saving_to_temp()).unwrap_err();
        assert!(matches!(err, VizError::UnsupportedFormat { .. }));
        assert_eq!(cap.state(), RecorderState::Idle);
        assert!(log.lock().unwrap().begun.is_none());
    }

    #[test]
    fn falls_back_to_another_codec() {
        // Preferred vp9 unsupported, vp8 available
        let (stub, log) = StubEncoder::new(vec![(Container::Webm, Codec::Vp8)]);
        let (mut cap, dir) = capture_in_temp(stub, "fallback");
        let mime = cap.start(job(), &settings_saving_to_temp()).unwrap();
        assert_eq!(mime.codec, Codec::Vp8);
        assert_eq!(
            log.lock().unwrap().begun.as_ref().map(|m| m.codec),
            Some(Codec::Vp8)
        );
        let _ = cap.stop(&settings_saving_to_temp());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn chunks_are_assembled_in_order() {
        let (stub, _log) = StubEncoder::new(vec![(Container::Webm, Codec::Vp9)]);
        let (mut cap, dir) = capture_in_temp(stub, "chunks");
        cap.start(job(), &settings_saving_to_temp()).unwrap();

        let tap = CaptureTap::new();
        for _ in 0..3 {
            cap.tick(&[0u8; 64], &tap).unwrap();
        }
        let path = cap.stop(&settings_saving_to_temp()).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn audio_drained_into_encoder_each_tick() {
        let (stub, log) = StubEncoder::new(vec![(Container::Webm, Codec::Vp9)]);
        let (mut cap, dir) = capture_in_temp(stub, "audio");
        cap.start(job(), &settings_saving_to_temp()).unwrap();

        let tap = CaptureTap::new();
        tap.set_enabled(true);
        tap.push(&[0.0; 100]);
        cap.tick(&[0u8; 64], &tap).unwrap();
        tap.push(&[0.0; 50]);
        cap.tick(&[0u8; 64], &tap).unwrap();
        assert_eq!(log.lock().unwrap().audio_samples, 150);

        let _ = cap.stop(&settings_saving_to_temp());
        let _ = std::fs::remove_dir_all(dir);
    }
}
