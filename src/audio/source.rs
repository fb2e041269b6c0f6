//! Audio sources.
//!
//! Wraps microphone capture and file playback behind one adapter. Whatever
//! the source, decoded mono samples flow into the analysis tap (a fixed ring
//! the analyzer snapshots) and, while recording, into the capture tap.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, VizError};

/// Ring size for the analysis tap. Matches the FFT input size.
pub const TAP_SIZE: usize = 2048;

/// Fixed-size sample ring shared with the analysis thread.
#[derive(Clone)]
pub struct AnalysisTap {
    ring: Arc<Mutex<Vec<f32>>>,
}

impl AnalysisTap {
    pub fn new() -> Self {
        Self {
            ring: Arc::new(Mutex::new(vec![0.0; TAP_SIZE])),
        }
    }

    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut ring) = self.ring.lock() {
            for &s in samples {
                ring.remove(0);
                ring.push(s);
            }
        }
    }

    /// Copy the current ring contents into `out`.
    pub fn snapshot(&self, out: &mut Vec<f32>) {
        out.clear();
        if let Ok(ring) = self.ring.lock() {
            out.extend_from_slice(&ring);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut ring) = self.ring.lock() {
            ring.iter_mut().for_each(|x| *x = 0.0);
        }
    }
}

/// Unbounded sample sink for recording. Disabled it drops everything, so the
/// audio callback pays nothing when no export is running.
#[derive(Clone)]
pub struct CaptureTap {
    enabled: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<f32>>>,
}

impl CaptureTap {
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_enabled(&self, on: bool) {
        self.enabled.store(on, Ordering::Relaxed);
        if !on {
            if let Ok(mut buf) = self.buffer.lock() {
                buf.clear();
            }
        }
    }

    pub fn push(&self, samples: &[f32]) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        if let Ok(mut buf) = self.buffer.lock() {
            buf.extend_from_slice(samples);
        }
    }

    /// Take everything accumulated since the last drain.
    pub fn drain(&self) -> Vec<f32> {
        match self.buffer.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(_) => Vec::new(),
        }
    }
}

/// Decoded audio file, downmixed to mono.
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode a WAV file to mono f32 samples.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| VizError::DecodeFailed(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| VizError::DecodeFailed(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| VizError::DecodeFailed(e.to_string()))?
        }
    };

    if channels == 0 || interleaved.is_empty() {
        return Err(VizError::DecodeFailed(format!(
            "{}: no audio data",
            path.display()
        )));
    }

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Once-only edge detector for natural playback end.
struct NaturalEnd {
    finished: Arc<AtomicBool>,
    fired: bool,
}

impl NaturalEnd {
    fn new(finished: Arc<AtomicBool>) -> Self {
        Self {
            finished,
            fired: false,
        }
    }

    /// True exactly once, the first poll after playback ran out of samples.
    fn poll(&mut self) -> bool {
        if self.fired {
            return false;
        }
        if self.finished.load(Ordering::Relaxed) {
            self.fired = true;
            return true;
        }
        false
    }

    fn rewind(&mut self) {
        self.finished.store(false, Ordering::Relaxed);
        self.fired = false;
    }
}

struct FilePlayback {
    playhead: Arc<AtomicUsize>,
    paused: Arc<AtomicBool>,
    ended: NaturalEnd,
    total_samples: usize,
    sample_rate: u32,
}

enum SourceKind {
    Mic { device_name: String },
    File(FilePlayback),
}

/// One live audio source feeding the taps.
pub struct AudioSourceAdapter {
    kind: SourceKind,
    analysis: AnalysisTap,
    capture: CaptureTap,
    sample_rate: u32,
    _stream: Stream,
}

impl AudioSourceAdapter {
    /// Open the requested input device, or a reasonable default.
    pub fn mic(config: &Config) -> Result<Self> {
        let host = cpal::default_host();
        let device = config
            .last_device
            .as_ref()
            .and_then(|wanted| {
                host.input_devices().ok().and_then(|mut devices| {
                    devices.find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                })
            })
            .or_else(|| host.default_input_device())
            .ok_or_else(|| VizError::CaptureUnavailable("no input device found".into()))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let stream_config =
            Self::get_config_with_timeout(&device, true, config.device_timeout_secs())
                .ok_or_else(|| {
                    VizError::CaptureUnavailable("input device did not report a config".into())
                })?;
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;

        let analysis = AnalysisTap::new();
        let capture = CaptureTap::new();
        let cb_analysis = analysis.clone();
        let cb_capture = capture.clone();

        let err_fn = |err| eprintln!("Audio stream error: {}", err);
        let mut mono = Vec::new();

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    mono.clear();
                    for chunk in data.chunks(channels) {
                        mono.push(chunk.iter().sum::<f32>() / channels as f32);
                    }
                    cb_analysis.push(&mono);
                    cb_capture.push(&mono);
                },
                err_fn,
                None,
            )
            .map_err(classify_stream_error)?;
        stream
            .play()
            .map_err(|e| VizError::CaptureUnavailable(format!("input stream: {}", e)))?;

        println!("Capturing from: {}", device_name);

        Ok(Self {
            kind: SourceKind::Mic { device_name },
            analysis,
            capture,
            sample_rate,
            _stream: stream,
        })
    }

    /// Decode a file and play it through the default output device.
    pub fn file(path: &Path, config: &Config) -> Result<Self> {
        let decoded = decode_audio(path)?;
        let file_rate = decoded.sample_rate;
        let total = decoded.samples.len();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VizError::CaptureUnavailable("no output device found".into()))?;
        let stream_config =
            Self::get_config_with_timeout(&device, false, config.device_timeout_secs())
                .ok_or_else(|| {
                    VizError::CaptureUnavailable("output device did not report a config".into())
                })?;
        let out_channels = stream_config.channels as usize;
        let out_rate = stream_config.sample_rate.0;

        let playhead = Arc::new(AtomicUsize::new(0));
        let paused = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let analysis = AnalysisTap::new();
        let capture = CaptureTap::new();
        let cb_analysis = analysis.clone();
        let cb_capture = capture.clone();
        let cb_playhead = Arc::clone(&playhead);
        let cb_paused = Arc::clone(&paused);
        let cb_finished = Arc::clone(&finished);
        let samples = Arc::new(decoded.samples);

        // Nearest-sample rate conversion keeps pitch when the device rate
        // differs from the file rate.
        let step = file_rate as f64 / out_rate as f64;
        let mut mono = Vec::new();

        let err_fn = |err| eprintln!("Audio stream error: {}", err);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    mono.clear();
                    if cb_paused.load(Ordering::Relaxed) {
                        out.iter_mut().for_each(|o| *o = 0.0);
                        return;
                    }
                    let mut head = cb_playhead.load(Ordering::Relaxed);
                    for frame in out.chunks_mut(out_channels) {
                        let idx = (head as f64 * step) as usize;
                        let sample = if idx < samples.len() {
                            samples[idx]
                        } else {
                            cb_finished.store(true, Ordering::Relaxed);
                            0.0
                        };
                        for o in frame.iter_mut() {
                            *o = sample;
                        }
                        mono.push(sample);
                        head += 1;
                    }
                    cb_playhead.store(head, Ordering::Relaxed);
                    cb_analysis.push(&mono);
                    cb_capture.push(&mono);
                },
                err_fn,
                None,
            )
            .map_err(classify_stream_error)?;
        stream
            .play()
            .map_err(|e| VizError::CaptureUnavailable(format!("output stream: {}", e)))?;

        println!("Playing: {} ({} Hz)", path.display(), file_rate);

        Ok(Self {
            kind: SourceKind::File(FilePlayback {
                playhead,
                paused,
                ended: NaturalEnd::new(finished),
                total_samples: total,
                sample_rate: file_rate,
            }),
            analysis,
            capture,
            sample_rate: out_rate,
            _stream: stream,
        })
    }

    pub fn analysis_tap(&self) -> AnalysisTap {
        self.analysis.clone()
    }

    pub fn capture_tap(&self) -> CaptureTap {
        self.capture.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, SourceKind::File(_))
    }

    pub fn description(&self) -> String {
        match &self.kind {
            SourceKind::Mic { device_name } => format!("mic: {}", device_name),
            SourceKind::File(p) => {
                let secs = p.total_samples as f32 / p.sample_rate as f32;
                format!("file ({:.0}s)", secs)
            }
        }
    }

    /// Raw device name for persisting as the preferred input.
    pub fn device_name(&self) -> Option<&str> {
        match &self.kind {
            SourceKind::Mic { device_name } => Some(device_name),
            SourceKind::File(_) => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        match &self.kind {
            SourceKind::Mic { .. } => true,
            SourceKind::File(p) => !p.paused.load(Ordering::Relaxed),
        }
    }

    /// Toggle pause. No-op for mic capture.
    pub fn toggle_playback(&mut self) {
        if let SourceKind::File(p) = &self.kind {
            let was = p.paused.load(Ordering::Relaxed);
            p.paused.store(!was, Ordering::Relaxed);
        }
    }

    /// Seek back to the start and resume.
    pub fn restart(&mut self) {
        if let SourceKind::File(p) = &mut self.kind {
            p.playhead.store(0, Ordering::Relaxed);
            p.ended.rewind();
            p.paused.store(false, Ordering::Relaxed);
            self.analysis.clear();
        }
    }

    /// True exactly once when file playback reaches the natural end.
    /// Manual pause never reports as an end.
    pub fn poll_ended(&mut self) -> bool {
        match &mut self.kind {
            SourceKind::Mic { .. } => false,
            SourceKind::File(p) => p.ended.poll(),
        }
    }

    /// Names of the available input devices, in stable enumeration order.
    pub fn input_device_names() -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    pub fn list_devices() {
        println!("\n=== Audio Input Devices ===");
        let names = Self::input_device_names();
        for (idx, name) in names.iter().enumerate() {
            println!("  [{}] {}", idx, name);
        }
        if names.is_empty() {
            println!("  (none found)");
        }
        println!();
    }

    /// Get device config with timeout (the config call often hangs on bad devices)
    fn get_config_with_timeout(
        device: &Device,
        is_input: bool,
        timeout_secs: u64,
    ) -> Option<StreamConfig> {
        let timeout = Duration::from_secs(timeout_secs);
        let device_clone = device.clone();

        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let config = if is_input {
                device_clone.default_input_config()
            } else {
                device_clone.default_output_config()
            };
            let _ = tx.send(config);
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(config)) => Some(config.into()),
            Ok(Err(e)) => {
                eprintln!("  Failed to get config: {}", e);
                None
            }
            Err(_) => {
                eprintln!("  Device config timed out after {:?}", timeout);
                None
            }
        }
    }
}

fn classify_stream_error(err: cpal::BuildStreamError) -> VizError {
    let msg = err.to_string().to_lowercase();
    if msg.contains("denied") || msg.contains("permission") {
        VizError::PermissionDenied
    } else {
        VizError::CaptureUnavailable(format!("build stream: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wavescene-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn decode_rejects_garbage() {
        let path = temp_path("garbage.wav");
        std::fs::write(&path, b"definitely not a wav file").expect("write");
        let err = decode_audio(&path).unwrap_err();
        assert!(matches!(err, VizError::DecodeFailed(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn decode_downmixes_stereo() {
        let path = temp_path("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("create");
        // Left full scale, right silent: mono should land near half
        for _ in 0..100 {
            writer.write_sample(i16::MAX).expect("write");
            writer.write_sample(0i16).expect("write");
        }
        writer.finalize().expect("finalize");

        let decoded = decode_audio(&path).expect("decode");
        assert_eq!(decoded.samples.len(), 100);
        assert_eq!(decoded.sample_rate, 44_100);
        assert!((decoded.samples[0] - 0.5).abs() < 0.01);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn analysis_tap_keeps_fixed_size() {
        let tap = AnalysisTap::new();
        tap.push(&vec![1.0; 100]);
        let mut out = Vec::new();
        tap.snapshot(&mut out);
        assert_eq!(out.len(), TAP_SIZE);
        // Newest samples at the tail
        assert_eq!(out[TAP_SIZE - 1], 1.0);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn capture_tap_drops_when_disabled() {
        let tap = CaptureTap::new();
        tap.push(&[1.0, 2.0]);
        assert!(tap.drain().is_empty());

        tap.set_enabled(true);
        tap.push(&[1.0, 2.0]);
        tap.push(&[3.0]);
        assert_eq!(tap.drain(), vec![1.0, 2.0, 3.0]);
        // Drained, nothing left
        assert!(tap.drain().is_empty());
    }

    #[test]
    fn natural_end_fires_once() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut ended = NaturalEnd::new(Arc::clone(&finished));
        assert!(!ended.poll());

        finished.store(true, Ordering::Relaxed);
        assert!(ended.poll());
        assert!(!ended.poll());

        ended.rewind();
        assert!(!ended.poll());
        finished.store(true, Ordering::Relaxed);
        assert!(ended.poll());
    }
}
