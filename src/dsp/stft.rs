//! Short-time Fourier transform
//!
//! Centered framing (`n_fft / 2` zeros on each side), periodic Hann window,
//! and an inverse that divides the overlap-added frames by the summed squared
//! window, so `inverse(forward(x), x.len())` reconstructs `x`.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::error::{Result, VoxError};

/// Default analysis window length in samples
pub const N_FFT: usize = 2048;

/// Default hop between frames in samples
pub const HOP_LENGTH: usize = 512;

/// One analysis frame: `n_fft / 2 + 1` complex bins
pub type Spectrum = Vec<Complex32>;

/// Window-sum values below this are treated as zero during reconstruction
const WINDOW_SUM_FLOOR: f32 = 1e-10;

/// Planned forward/inverse transform pair for a fixed window and hop
#[derive(Clone)]
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop", &self.hop)
            .finish()
    }
}

impl Default for Stft {
    fn default() -> Self {
        Self::plan(N_FFT, HOP_LENGTH)
    }
}

impl Stft {
    /// Plan a transform with the given window length and hop
    ///
    /// # Errors
    /// * `Configuration` - `n_fft` is odd or below 2, or `hop` is outside `1..=n_fft`
    pub fn new(n_fft: usize, hop: usize) -> Result<Self> {
        if n_fft < 2 || n_fft % 2 != 0 {
            return Err(VoxError::config(
                "stft",
                "n_fft",
                format!("must be even and at least 2, got {}", n_fft),
            ));
        }
        if hop == 0 || hop > n_fft {
            return Err(VoxError::config(
                "stft",
                "hop",
                format!("must be in 1..={}, got {}", n_fft, hop),
            ));
        }
        Ok(Self::plan(n_fft, hop))
    }

    fn plan(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Number of frequency bins per frame
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Forward transform: frames in time order, each `num_bins()` long
    pub fn forward(&self, samples: &[f32]) -> Vec<Spectrum> {
        let pad = self.n_fft / 2;
        let num_frames = self.num_frames(samples.len());
        let num_bins = self.num_bins();

        let mut frames = Vec::with_capacity(num_frames);
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.n_fft];

        for t in 0..num_frames {
            // Frame start in padded coordinates; padded[i] = samples[i - pad]
            let start = t * self.hop;
            for (j, slot) in scratch.iter_mut().enumerate() {
                let value = (start + j)
                    .checked_sub(pad)
                    .and_then(|i| samples.get(i))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex32::new(value * self.window[j], 0.0);
            }
            self.forward.process(&mut scratch);
            frames.push(scratch[..num_bins].to_vec());
        }

        frames
    }

    /// Inverse transform with overlap-add, trimmed or zero-padded to `length`
    pub fn inverse(&self, frames: &[Spectrum], length: usize) -> Vec<f32> {
        let pad = self.n_fft / 2;
        let padded_len = self.n_fft + self.hop * frames.len().saturating_sub(1);
        let mut output = vec![0.0f32; padded_len];
        let mut window_sum = vec![0.0f32; padded_len];
        let mut scratch = vec![Complex32::new(0.0, 0.0); self.n_fft];
        let norm = 1.0 / self.n_fft as f32;

        for (t, spectrum) in frames.iter().enumerate() {
            self.fill_hermitian(spectrum, &mut scratch);
            self.inverse.process(&mut scratch);

            let start = t * self.hop;
            for j in 0..self.n_fft {
                let w = self.window[j];
                output[start + j] += scratch[j].re * norm * w;
                window_sum[start + j] += w * w;
            }
        }

        for (sample, &wss) in output.iter_mut().zip(&window_sum) {
            if wss > WINDOW_SUM_FLOOR {
                *sample /= wss;
            }
        }

        let mut result: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        result.resize(length, 0.0);
        result
    }

    /// Expand a half spectrum into a full conjugate-symmetric spectrum
    fn fill_hermitian(&self, half: &[Complex32], full: &mut [Complex32]) {
        let n = self.n_fft;
        for (k, slot) in full.iter_mut().enumerate() {
            let bin = if k <= n / 2 {
                half.get(k).copied()
            } else {
                half.get(n - k).map(|c| c.conj())
            };
            *slot = bin.unwrap_or_default();
        }
    }
}

/// Periodic Hann window of length `size`
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / size as f64).cos()) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chirp(len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| {
                let t = n as f32 / 16000.0;
                0.5 * (2.0 * std::f32::consts::PI * (200.0 + 800.0 * t) * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_frame_count() {
        let stft = Stft::default();
        assert_eq!(stft.num_frames(44100), 1 + 44100 / 512);
        assert_eq!(stft.forward(&vec![0.0; 44100]).len(), stft.num_frames(44100));
        assert_eq!(stft.forward(&[0.0; 10]).len(), 1);
    }

    #[test]
    fn test_round_trip_reconstruction() {
        let stft = Stft::default();
        let signal = chirp(16000);

        let frames = stft.forward(&signal);
        assert!(frames.iter().all(|f| f.len() == stft.num_bins()));

        let rebuilt = stft.inverse(&frames, signal.len());
        assert_eq!(rebuilt.len(), signal.len());
        for (a, b) in signal.iter().zip(&rebuilt) {
            assert!((a - b).abs() < 1e-4, "reconstruction error {} vs {}", a, b);
        }
    }

    #[test]
    fn test_inverse_pads_to_requested_length() {
        let stft = Stft::new(256, 64).unwrap();
        let signal = chirp(1000);
        let frames = stft.forward(&signal);

        let longer = stft.inverse(&frames, 5000);
        assert_eq!(longer.len(), 5000);
        assert!(longer[4000..].iter().all(|&s| s == 0.0));

        let shorter = stft.inverse(&frames, 300);
        assert_eq!(shorter.len(), 300);
    }

    #[test]
    fn test_sine_peaks_in_expected_bin() {
        let stft = Stft::new(1024, 256).unwrap();
        let sr = 16000.0;
        // Bin 64 of a 1024-point transform at 16 kHz is 1000 Hz
        let signal: Vec<f32> = (0..8000)
            .map(|n| (2.0 * std::f32::consts::PI * 1000.0 * n as f32 / sr).sin())
            .collect();

        let frames = stft.forward(&signal);
        let middle = &frames[frames.len() / 2];
        let loudest = middle
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(k, _)| k);
        assert_eq!(loudest, Some(64));
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        assert!(matches!(
            Stft::new(2047, 512),
            Err(VoxError::Configuration { stage: "stft", ref parameter, .. }) if parameter == "n_fft"
        ));
        assert!(matches!(
            Stft::new(2048, 0),
            Err(VoxError::Configuration { stage: "stft", ref parameter, .. }) if parameter == "hop"
        ));
        assert!(Stft::new(2048, 4096).is_err());
        assert!(Stft::new(2, 2).is_ok());
    }

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[1] - w[7]).abs() < 1e-6);
    }
}
