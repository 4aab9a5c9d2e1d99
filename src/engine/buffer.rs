//! Audio Buffer Management
//!
//! Provides the mono audio buffer threaded through the effect chain, plus
//! level helpers shared by the stages and the CLI.

use std::fmt;

use crate::error::{Result, VoxError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (1.0 at 0 dB)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Returns
/// Value in decibels. Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Peak absolute value of a sample slice (0.0 for an empty slice)
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

// ============================================================================
// AudioBuffer
// ============================================================================

/// Mono floating-point audio buffer
///
/// Created once from decoded input and moved through the chain by value.
/// Stages consume a buffer and return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from samples and a sample rate
    ///
    /// No validation happens here; the chain calls [`AudioBuffer::validate`]
    /// before any stage runs.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Create a silent buffer of `num_samples` samples
    pub fn silence(num_samples: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; num_samples], sample_rate)
    }

    /// Generate a sine tone
    ///
    /// # Arguments
    /// * `frequency` - Tone frequency in Hz
    /// * `amplitude` - Peak amplitude
    /// * `duration_secs` - Length in seconds
    /// * `sample_rate` - Sample rate in Hz
    pub fn sine(frequency: f32, amplitude: f32, duration_secs: f32, sample_rate: u32) -> Self {
        let num_samples = (duration_secs * sample_rate as f32).round() as usize;
        let angular = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;
        let samples = (0..num_samples)
            .map(|n| (amplitude as f64 * (angular * n as f64).sin()) as f32)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (0.0 when the sample rate is invalid)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Consume the buffer and return its samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Build a buffer at the same sample rate from new samples
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self::new(samples, self.sample_rate)
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// RMS level in dBFS
    pub fn rms_db(&self) -> f32 {
        if self.samples.is_empty() {
            return f32::NEG_INFINITY;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| (s as f64).powi(2)).sum();
        linear_to_db((sum_sq / self.samples.len() as f64).sqrt() as f32)
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.first_non_finite().is_none()
    }

    /// Index of the first NaN/Inf sample, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|s| !s.is_finite())
    }

    /// Reject buffers no stage can process
    ///
    /// # Errors
    /// * `InvalidInput` - zero sample rate or no samples
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(VoxError::InvalidInput {
                reason: "sample rate must be positive".to_string(),
            });
        }
        if self.samples.is_empty() {
            return Err(VoxError::InvalidInput {
                reason: "buffer contains no samples".to_string(),
            });
        }
        Ok(())
    }

    /// Summary of the buffer for display
    pub fn summary(&self) -> BufferSummary {
        BufferSummary {
            sample_rate: self.sample_rate,
            num_samples: self.samples.len(),
            duration_secs: self.duration_secs(),
            peak_db: linear_to_db(self.peak()),
            rms_db: self.rms_db(),
        }
    }
}

/// Descriptive statistics of a buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferSummary {
    pub sample_rate: u32,
    pub num_samples: usize,
    pub duration_secs: f64,
    pub peak_db: f32,
    pub rms_db: f32,
}

impl fmt::Display for BufferSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample Rate: {} Hz | Duration: {:.2}s | Samples: {} | Peak: {:.1} dBFS | RMS: {:.1} dBFS",
            self.sample_rate, self.duration_secs, self.num_samples, self.peak_db, self.rms_db
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
