//! Spectral analysis.
//!
//! Performs real-time FFT on tapped audio samples, reduces the half-spectrum
//! to a fixed number of frequency bins, smooths them over time, and publishes
//! immutable frames for the render thread to pick up.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::audio::source::AnalysisTap;

/// Number of frequency bins exposed to the styles
pub const NUM_BINS: usize = 128;

/// FFT size - large enough for good low-frequency resolution
/// At 44.1kHz: 2048 gives ~21.5 Hz bins
const FFT_SIZE: usize = 2048;

/// Smoothing coefficient: each tick moves 10% of the way to the new value
const SMOOTHING: f32 = 0.1;

/// Analysis ticks per second, decoupled from the render frame rate
const TICK_HZ: u64 = 60;

/// Inclusive end indices of the bass and mid regions for `n` bins.
/// Bass covers `0..=bass_end`, mids `bass_end+1..=mid_end`, treble the rest.
pub fn band_bounds(n: usize) -> (usize, usize) {
    let bass_end = (n as f32 * 0.15).floor() as usize;
    let mid_end = (n as f32 * 0.5).floor() as usize;
    (bass_end, mid_end)
}

/// One immutable analysis result. Bins and band energies are normalized 0-1.
#[derive(Clone)]
pub struct AudioFrame {
    /// Smoothed energy per bin (0-1), low frequencies first
    pub bins: [f32; NUM_BINS],
    /// Byte-scaled bins of the current tick before smoothing, for styles
    /// that run their own response curve
    pub raw_bins: [u8; NUM_BINS],
    /// Average energy of the bass region
    pub bass: f32,
    /// Average energy of the mid region
    pub mid: f32,
    /// Average energy of the treble region
    pub treble: f32,
    /// Average over all bins
    pub overall: f32,
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self {
            bins: [0.0; NUM_BINS],
            raw_bins: [0; NUM_BINS],
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            overall: 0.0,
        }
    }
}

/// FFT stage: windows the samples, transforms, and reduces the half-spectrum
/// to `NUM_BINS` byte-scaled magnitudes.
pub struct SpectrumFrontEnd {
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    fft_window: Vec<f32>,
}

impl SpectrumFrontEnd {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        // Pre-compute Hann window
        let fft_window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos()))
            .collect();

        Self {
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            fft_window,
        }
    }

    /// Produce raw byte-scaled bins from the latest samples.
    /// Short inputs are zero-padded.
    pub fn process(&mut self, samples: &[f32]) -> [u8; NUM_BINS] {
        let sample_count = samples.len().min(FFT_SIZE);

        for i in 0..FFT_SIZE {
            if i < sample_count {
                self.fft_buffer[i] = Complex::new(samples[i] * self.fft_window[i], 0.0);
            } else {
                self.fft_buffer[i] = Complex::new(0.0, 0.0);
            }
        }

        self.fft.process(&mut self.fft_buffer);

        // Group the half-spectrum into NUM_BINS bins of equal width
        let group = (FFT_SIZE / 2) / NUM_BINS;
        let mut bins = [0u8; NUM_BINS];

        for (i, bin) in bins.iter_mut().enumerate() {
            let low = i * group;
            let energy: f32 = self.fft_buffer[low..low + group]
                .iter()
                .map(|c| c.norm_sqr())
                .sum();
            let avg_energy = energy / group as f32;

            // dB scale, roughly -100 to +60 dB mapped onto 0-255
            let db = 10.0 * (avg_energy + 1e-10).log10();
            let normalized = ((db + 100.0) / 160.0).clamp(0.0, 1.0);
            *bin = (normalized * 255.0) as u8;
        }

        bins
    }
}

/// Temporal smoothing stage. Pure per-tick state machine, no I/O.
pub struct Smoother {
    smoothed: [f32; NUM_BINS],
}

impl Smoother {
    pub fn new() -> Self {
        Self {
            smoothed: [0.0; NUM_BINS],
        }
    }

    /// Advance the smoothed state towards `raw` and build the published frame.
    pub fn tick(&mut self, raw: &[u8; NUM_BINS]) -> AudioFrame {
        for (s, &r) in self.smoothed.iter_mut().zip(raw.iter()) {
            *s += (r as f32 - *s) * SMOOTHING;
        }

        let (bass_end, mid_end) = band_bounds(NUM_BINS);

        let mut bins = [0.0f32; NUM_BINS];
        let mut sums = [0.0f32; 3];
        let mut counts = [0u32; 3];

        for i in 0..NUM_BINS {
            let v = self.smoothed[i] / 255.0;
            bins[i] = v;
            let band = if i <= bass_end {
                0
            } else if i <= mid_end {
                1
            } else {
                2
            };
            sums[band] += v;
            counts[band] += 1;
        }

        let avg = |b: usize| {
            if counts[b] > 0 {
                sums[b] / counts[b] as f32
            } else {
                0.0
            }
        };

        AudioFrame {
            bins,
            raw_bins: *raw,
            bass: avg(0),
            mid: avg(1),
            treble: avg(2),
            overall: bins.iter().sum::<f32>() / NUM_BINS as f32,
        }
    }
}

/// Single-slot mailbox between the analysis thread and the render thread.
/// Each publish replaces the whole frame; readers never see a partial update.
pub struct FrameCell {
    slot: Mutex<Option<Arc<AudioFrame>>>,
}

impl FrameCell {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn publish(&self, frame: AudioFrame) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(Arc::new(frame));
        }
    }

    pub fn latest(&self) -> Option<Arc<AudioFrame>> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Background analysis loop. Ticks at its own cadence so a slow render
/// thread never stalls the smoothing.
pub struct SpectralAnalyzer {
    frames: Arc<FrameCell>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SpectralAnalyzer {
    pub fn spawn(tap: AnalysisTap) -> Self {
        let frames = Arc::new(FrameCell::new());
        let stop = Arc::new(AtomicBool::new(false));

        let thread_frames = Arc::clone(&frames);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut front_end = SpectrumFrontEnd::new();
            let mut smoother = Smoother::new();
            let period = Duration::from_millis(1000 / TICK_HZ);
            let mut scratch = Vec::with_capacity(FFT_SIZE);

            while !thread_stop.load(Ordering::Relaxed) {
                tap.snapshot(&mut scratch);
                let raw = front_end.process(&scratch);
                thread_frames.publish(smoother.tick(&raw));
                thread::sleep(period);
            }
        });

        Self {
            frames,
            stop,
            handle: Some(handle),
        }
    }

    pub fn frames(&self) -> Arc<FrameCell> {
        Arc::clone(&self.frames)
    }
}

impl Drop for SpectralAnalyzer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_converges_to_steady_input() {
        let mut smoother = Smoother::new();
        let raw = [200u8; NUM_BINS];
        let mut frame = AudioFrame::default();
        for _ in 0..50 {
            frame = smoother.tick(&raw);
        }
        for &bin in frame.bins.iter() {
            assert!(bin * 255.0 > 198.0, "bin stuck at {}", bin * 255.0);
        }
    }

    #[test]
    fn smoothing_single_tick_moves_ten_percent() {
        let mut smoother = Smoother::new();
        let mut raw = [0u8; NUM_BINS];
        raw[0] = 100;
        let frame = smoother.tick(&raw);
        assert!((frame.bins[0] * 255.0 - 10.0).abs() < 1e-3);
    }

    #[test]
    fn raw_bins_pass_through_unsmoothed() {
        let mut smoother = Smoother::new();
        let raw = [200u8; NUM_BINS];
        let frame = smoother.tick(&raw);
        assert_eq!(frame.raw_bins, raw);
        // The smoothed bins lag behind on the first tick
        assert!(frame.bins[0] < 0.1);
    }

    #[test]
    fn bands_partition_all_bins() {
        for n in [8usize, 32, 100, 128, 256] {
            let (bass_end, mid_end) = band_bounds(n);
            assert!(bass_end < mid_end);
            assert!(mid_end < n - 1);
            for i in 0..n {
                let in_bass = i <= bass_end;
                let in_mid = i > bass_end && i <= mid_end;
                let in_treble = i > mid_end;
                assert_eq!(in_bass as u8 + in_mid as u8 + in_treble as u8, 1);
            }
        }
    }

    #[test]
    fn silence_yields_zero_bins() {
        let mut front_end = SpectrumFrontEnd::new();
        let bins = front_end.process(&vec![0.0; FFT_SIZE]);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn loud_tone_raises_a_low_bin() {
        let mut front_end = SpectrumFrontEnd::new();
        // 440 Hz sine at 44.1kHz
        let samples: Vec<f32> = (0..FFT_SIZE)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin())
            .collect();
        let bins = front_end.process(&samples);
        assert!(bins.iter().take(8).any(|&b| b > 50));
    }

    #[test]
    fn no_frame_before_first_publish() {
        // The draw loop sits out ticks until this reports Some
        assert!(FrameCell::new().latest().is_none());
    }

    #[test]
    fn frame_cell_replaces_whole_frame() {
        let cell = FrameCell::new();
        assert!(cell.latest().is_none());

        let mut a = AudioFrame::default();
        a.bass = 0.25;
        cell.publish(a);

        let mut b = AudioFrame::default();
        b.bass = 0.75;
        cell.publish(b);

        let latest = cell.latest().expect("frame");
        assert_eq!(latest.bass, 0.75);
    }
}
