//! Butterworth filter design and second-order-section filtering
//!
//! Filters are designed from the analog Butterworth prototype, moved to the
//! requested band in the analog domain, and mapped to digital with the
//! pre-warped bilinear transform. The result is a cascade of biquads that is
//! run with the transposed direct form II.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use crate::error::{Result, VoxError};

/// Order of every designed filter
pub const BUTTERWORTH_ORDER: usize = 2;

/// Internal normalized sample rate used for the bilinear transform
const DESIGN_FS: f64 = 2.0;

/// Band shape to design
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandType {
    /// Pass below the corner frequency (Hz)
    LowPass(f64),
    /// Pass above the corner frequency (Hz)
    HighPass(f64),
    /// Pass between two corner frequencies (Hz)
    BandPass(f64, f64),
}

impl BandType {
    fn corners(&self) -> Vec<f64> {
        match *self {
            BandType::LowPass(f) | BandType::HighPass(f) => vec![f],
            BandType::BandPass(lo, hi) => vec![lo, hi],
        }
    }
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Section with the two given real zeros and the conjugate pole pair of `pole`
    fn from_roots(zero_a: f64, zero_b: f64, pole: Complex64) -> Self {
        Self {
            b0: 1.0,
            b1: -(zero_a + zero_b),
            b2: zero_a * zero_b,
            a1: -2.0 * pole.re,
            a2: pole.norm_sqr(),
        }
    }

    fn scaled(self, gain: f64) -> Self {
        Self {
            b0: self.b0 * gain,
            b1: self.b1 * gain,
            b2: self.b2 * gain,
            ..self
        }
    }
}

/// Biquad filter state (transposed direct form II)
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

/// Design an order-2 Butterworth filter as second-order sections
///
/// # Arguments
/// * `band` - Band shape and corner frequencies in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `stage` - Stage name reported in errors
///
/// # Errors
/// * `Configuration` - A corner frequency is not strictly between 0 and Nyquist,
///   or band-pass corners are not increasing
pub fn butterworth(band: BandType, sample_rate: u32, stage: &'static str) -> Result<Vec<BiquadCoeffs>> {
    let nyquist = sample_rate as f64 / 2.0;
    for corner in band.corners() {
        if !(corner > 0.0 && corner < nyquist) {
            return Err(VoxError::config(
                stage,
                format!("{} Hz corner", corner),
                format!(
                    "corner frequency must lie strictly between 0 and the Nyquist frequency ({} Hz)",
                    nyquist
                ),
            ));
        }
    }
    if let BandType::BandPass(lo, hi) = band {
        if lo >= hi {
            return Err(VoxError::config(
                stage,
                "band-pass corners",
                format!("lower corner {} Hz must be below upper corner {} Hz", lo, hi),
            ));
        }
    }

    let prewarp = |hz: f64| 2.0 * DESIGN_FS * (PI * (hz / nyquist) / DESIGN_FS).tan();
    let prototype = prototype_poles();

    let (zeros, poles, gain) = match band {
        BandType::LowPass(f) => {
            let wo = prewarp(f);
            let poles: Vec<Complex64> = prototype.iter().map(|&p| p * wo).collect();
            (Vec::new(), poles, wo.powi(BUTTERWORTH_ORDER as i32))
        }
        BandType::HighPass(f) => {
            let wo = prewarp(f);
            let gain = (Complex64::new(1.0, 0.0) / product(prototype.iter().map(|&p| -p))).re;
            let poles: Vec<Complex64> = prototype.iter().map(|&p| wo / p).collect();
            (vec![Complex64::new(0.0, 0.0); BUTTERWORTH_ORDER], poles, gain)
        }
        BandType::BandPass(lo, hi) => {
            let (w1, w2) = (prewarp(lo), prewarp(hi));
            let bw = w2 - w1;
            let wo = (w1 * w2).sqrt();
            let mut poles = Vec::with_capacity(2 * BUTTERWORTH_ORDER);
            for &p in &prototype {
                let scaled = p * (bw / 2.0);
                let offset = (scaled * scaled - wo * wo).sqrt();
                poles.push(scaled + offset);
                poles.push(scaled - offset);
            }
            (
                vec![Complex64::new(0.0, 0.0); BUTTERWORTH_ORDER],
                poles,
                bw.powi(BUTTERWORTH_ORDER as i32),
            )
        }
    };

    Ok(into_sections(bilinear(zeros, poles, gain)))
}

/// Run samples through a cascade of sections, starting from rest
pub fn sosfilt(sections: &[BiquadCoeffs], samples: &[f32]) -> Vec<f32> {
    let mut states = vec![BiquadState::default(); sections.len()];
    samples
        .iter()
        .map(|&x| {
            let mut value = x as f64;
            for (coeffs, state) in sections.iter().zip(states.iter_mut()) {
                value = state.process(value, coeffs);
            }
            value as f32
        })
        .collect()
}

/// Magnitude response of a section cascade at `frequency` Hz
pub fn magnitude_response(sections: &[BiquadCoeffs], frequency: f64, sample_rate: u32) -> f64 {
    let w = 2.0 * PI * frequency / sample_rate as f64;
    let z1 = Complex64::from_polar(1.0, -w);
    let z2 = z1 * z1;
    sections
        .iter()
        .map(|c| {
            let num = c.b0 + z1 * c.b1 + z2 * c.b2;
            let den = 1.0 + z1 * c.a1 + z2 * c.a2;
            (num / den).norm()
        })
        .product()
}

// ============================================================================
// Design helpers
// ============================================================================

/// Left-half-plane poles of the unit-cutoff analog Butterworth prototype
fn prototype_poles() -> Vec<Complex64> {
    let n = BUTTERWORTH_ORDER as i32;
    (0..n)
        .map(|i| {
            let m = (-n + 1 + 2 * i) as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64))
        })
        .collect()
}

fn product(values: impl Iterator<Item = Complex64>) -> Complex64 {
    values.fold(Complex64::new(1.0, 0.0), |acc, v| acc * v)
}

/// Bilinear transform of an analog zero/pole/gain description
fn bilinear(
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let fs2 = 2.0 * DESIGN_FS;
    let degree = poles.len() - zeros.len();

    let gain = gain
        * (product(zeros.iter().map(|&z| fs2 - z)) / product(poles.iter().map(|&p| fs2 - p))).re;
    let mut digital_zeros: Vec<Complex64> =
        zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    digital_zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let digital_poles = poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();

    (digital_zeros, digital_poles, gain)
}

/// Group conjugate pole pairs and real zeros into biquads
///
/// Every Butterworth design here has an even number of complex poles and
/// only real zeros at +1 or -1.
fn into_sections(
    (zeros, poles, gain): (Vec<Complex64>, Vec<Complex64>, f64),
) -> Vec<BiquadCoeffs> {
    let mut upper: Vec<Complex64> = poles.into_iter().filter(|p| p.im > 0.0).collect();
    // Pole closest to the unit circle last
    upper.sort_by(|a, b| a.norm().total_cmp(&b.norm()));

    let mut real_zeros: Vec<f64> = zeros.iter().map(|z| z.re).collect();
    real_zeros.sort_by(|a, b| a.total_cmp(b));

    let count = upper.len();
    upper
        .iter()
        .enumerate()
        .map(|(i, &pole)| {
            let section = BiquadCoeffs::from_roots(real_zeros[i], real_zeros[i + count], pole);
            if i == 0 {
                section.scaled(gain)
            } else {
                section
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
