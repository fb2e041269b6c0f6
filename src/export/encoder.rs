//! Video encoding backends.
//!
//! Recording pipes raw RGBA frames into an external `ffmpeg` process and
//! collects the muxed output as it is produced. Audio captured during the
//! recording is staged to a temporary WAV and muxed in when the job
//! finishes.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

use crate::error::{Result, VizError};
use crate::settings::{Codec, Container};

/// A container/codec pair in negotiation order. The string form mirrors a
/// MIME type with a `codecs` parameter, which is what gets surfaced in
/// errors and log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType {
    pub container: Container,
    pub codec: Codec,
    /// Full codec string, e.g. `vp9,opus`. Empty means "container default".
    pub codecs_param: &'static str,
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = match self.container {
            Container::Webm => "video/webm",
            Container::Mp4 => "video/mp4",
        };
        if self.codecs_param.is_empty() {
            write!(f, "{}", base)
        } else {
            write!(f, "{}; codecs={}", base, self.codecs_param)
        }
    }
}

/// Candidates for one codec in a container, most specific first.
pub fn candidates(container: Container, codec: Codec) -> Vec<MimeType> {
    let mk = |codecs_param| MimeType {
        container,
        codec,
        codecs_param,
    };
    match (container, codec) {
        (Container::Webm, Codec::Vp9) => vec![mk("vp9,opus"), mk("vp9"), mk("")],
        (Container::Webm, Codec::Vp8) => vec![mk("vp8,opus"), mk("vp8"), mk("")],
        (Container::Webm, Codec::Av1) => vec![mk("av01,opus"), mk("av01"), mk("")],
        (Container::Webm, Codec::H264) => vec![mk("h264,opus"), mk("h264"), mk("")],
        (Container::Mp4, Codec::H264) => vec![mk("avc1.42E01E,mp4a.40.2"), mk("avc1"), mk("")],
        (Container::Mp4, Codec::Av1) => vec![mk("av01.0.08M.08,mp4a.40.2"), mk("av01"), mk("")],
        (Container::Mp4, Codec::Vp9) => vec![mk("vp09.00.10.08,mp4a.40.2"), mk("vp09"), mk("")],
        (Container::Mp4, Codec::Vp8) => vec![],
    }
}

/// Parameters of one recording job.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate_mbps: u32,
    pub audio_sample_rate: u32,
}

/// Seam between the capture loop and the actual encoder so the recorder
/// state machine can be tested without spawning processes.
pub trait EncoderBackend {
    /// Whether this backend can produce the given container/codec pair.
    fn supports(&self, mime: &MimeType) -> bool;
    fn begin(&mut self, job: &ExportJob, mime: &MimeType) -> Result<()>;
    /// One tightly-packed RGBA frame at the job's resolution.
    fn push_video(&mut self, rgba: &[u8]) -> Result<()>;
    /// Mono samples recorded alongside the video.
    fn push_audio(&mut self, samples: &[f32]);
    /// Muxed output produced since the last poll, if any.
    fn poll_chunk(&mut self) -> Option<Vec<u8>>;
    /// Finalize and return any remaining output.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

fn vcodec_args(mime: &MimeType) -> &'static [&'static str] {
    match mime.codec {
        Codec::Vp9 => &["-c:v", "libvpx-vp9", "-deadline", "realtime", "-cpu-used", "5"],
        Codec::Vp8 => &["-c:v", "libvpx", "-deadline", "realtime", "-cpu-used", "5"],
        Codec::H264 => &["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"],
        Codec::Av1 => &["-c:v", "libaom-av1", "-cpu-used", "8"],
    }
}

pub struct FfmpegEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    chunks: Option<Receiver<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
    audio: Vec<f32>,
    audio_path: PathBuf,
    job: Option<ExportJob>,
    container: Option<Container>,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        let audio_path = std::env::temp_dir().join(format!(
            "wavescene-audio-{}.wav",
            std::process::id()
        ));
        Self {
            child: None,
            stdin: None,
            chunks: None,
            reader: None,
            audio: Vec::new(),
            audio_path,
            job: None,
            container: None,
        }
    }

    fn ffmpeg_available() -> bool {
        static PROBE: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
        *PROBE.get_or_init(|| {
            Command::new("ffmpeg")
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
    }

    fn write_audio_wav(&self, sample_rate: u32) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&self.audio_path, spec)
            .map_err(|e| VizError::CaptureUnavailable(e.to_string()))?;
        for &s in &self.audio {
            writer
                .write_sample(s)
                .map_err(|e| VizError::CaptureUnavailable(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| VizError::CaptureUnavailable(e.to_string()))?;
        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderBackend for FfmpegEncoder {
    fn supports(&self, mime: &MimeType) -> bool {
        // vp8-in-mp4 has no candidates; everything else ffmpeg can try.
        if !Self::ffmpeg_available() {
            return false;
        }
        !candidates(mime.container, mime.codec).is_empty()
    }

    fn begin(&mut self, job: &ExportJob, mime: &MimeType) -> Result<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .args(["-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", job.width, job.height)])
            .args(["-r", &job.frame_rate.to_string()])
            .args(["-i", "pipe:0"])
            .args(vcodec_args(mime))
            .args(["-b:v", &format!("{}M", job.bitrate_mbps)]);
        match mime.container {
            Container::Webm => {
                cmd.args(["-f", "webm"]);
            }
            Container::Mp4 => {
                // Plain mp4 cannot be streamed to a pipe
                cmd.args(["-movflags", "frag_keyframe+empty_moov", "-f", "mp4"]);
            }
        }
        cmd.arg("pipe:1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| VizError::CaptureUnavailable(format!("ffmpeg spawn: {}", e)))?;
        self.stdin = child.stdin.take();
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| VizError::CaptureUnavailable("ffmpeg stdout missing".into()))?;

        let (tx, rx) = mpsc::channel();
        self.reader = Some(std::thread::spawn(move || {
            let mut buf = [0u8; 64 * 1024];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        }));
        self.chunks = Some(rx);
        self.child = Some(child);
        self.job = Some(job.clone());
        self.container = Some(mime.container);
        self.audio.clear();
        Ok(())
    }

    fn push_video(&mut self, rgba: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| VizError::CaptureUnavailable("encoder not started".into()))?;
        stdin
            .write_all(rgba)
            .map_err(|e| VizError::CaptureUnavailable(format!("ffmpeg pipe: {}", e)))?;
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) {
        self.audio.extend_from_slice(samples);
    }

    fn poll_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.as_ref().and_then(|rx| rx.try_recv().ok())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        // Close stdin so ffmpeg flushes and exits
        self.stdin = None;
        let mut out = Vec::new();
        if let Some(rx) = self.chunks.take() {
            while let Ok(chunk) = rx.recv() {
                out.extend_from_slice(&chunk);
            }
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }

        // Mux the recorded audio into the silent video if we got any
        if !self.audio.is_empty() && !out.is_empty() {
            if let (Some(job), Some(container)) = (self.job.clone(), self.container) {
                match self.mux_audio(&out, &job, container) {
                    Ok(mixed) => out = mixed,
                    Err(e) => eprintln!("Audio mux failed, keeping silent video: {}", e),
                }
            }
        }
        self.audio.clear();
        self.job = None;
        self.container = None;
        Ok(out)
    }
}

impl FfmpegEncoder {
    fn mux_audio(&self, video: &[u8], job: &ExportJob, container: Container) -> Result<Vec<u8>> {
        self.write_audio_wav(job.audio_sample_rate)?;
        let ext = container.extension();
        let video_path = std::env::temp_dir().join(format!(
            "wavescene-video-{}.{}",
            std::process::id(),
            ext
        ));
        std::fs::write(&video_path, video)?;

        let out_path = std::env::temp_dir().join(format!(
            "wavescene-muxed-{}.{}",
            std::process::id(),
            ext
        ));
        let acodec: &[&str] = match container {
            Container::Webm => &["-c:a", "libopus"],
            Container::Mp4 => &["-c:a", "aac", "-movflags", "frag_keyframe+empty_moov"],
        };
        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(&video_path)
            .arg("-i")
            .arg(&self.audio_path)
            .args(["-c:v", "copy", "-shortest"])
            .args(acodec)
            .arg(&out_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| VizError::CaptureUnavailable(format!("ffmpeg mux: {}", e)))?;

        let result = if status.success() {
            std::fs::read(&out_path).map_err(VizError::from)
        } else {
            Err(VizError::CaptureUnavailable("ffmpeg mux failed".into()))
        };
        let _ = std::fs::remove_file(&video_path);
        let _ = std::fs::remove_file(&out_path);
        let _ = std::fs::remove_file(&self.audio_path);
        result
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
        let _ = std::fs::remove_file(&self.audio_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_formats_with_codecs_param() {
        let mime = MimeType {
            container: Container::Webm,
            codec: Codec::Vp9,
            codecs_param: "vp9,opus",
        };
        assert_eq!(mime.to_string(), "video/webm; codecs=vp9,opus");

        let bare = MimeType {
            container: Container::Mp4,
            codec: Codec::H264,
            codecs_param: "",
        };
        assert_eq!(bare.to_string(), "video/mp4");
    }

    #[test]
    fn candidates_go_specific_to_bare() {
        let c = candidates(Container::Webm, Codec::Vp9);
        assert_eq!(c[0].codecs_param, "vp9,opus");
        assert_eq!(c.last().map(|m| m.codecs_param), Some(""));
    }

    #[test]
    fn vp8_in_mp4_has_no_candidates() {
        assert!(candidates(Container::Mp4, Codec::Vp8).is_empty());
    }
}
