//! FFT-based linear convolution

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;

/// Output size of [`convolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolveMode {
    /// Every overlap position: `signal.len() + kernel.len() - 1` samples
    Full,
    /// Centered on the full result, `signal.len()` samples
    Same,
}

/// Linearly convolve `signal` with `kernel`
///
/// Returns an empty vector if either input is empty.
pub fn convolve(signal: &[f32], kernel: &[f32], mode: ConvolveMode) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let full = fft_convolve(signal, kernel);
    match mode {
        ConvolveMode::Full => full,
        ConvolveMode::Same => {
            let start = (kernel.len() - 1) / 2;
            full[start..start + signal.len()].to_vec()
        }
    }
}

fn fft_convolve(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    let full_len = signal.len() + kernel.len() - 1;
    let fft_size = full_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_size);
    let inverse = planner.plan_fft_inverse(fft_size);

    let to_complex = |values: &[f32]| {
        let mut buf = vec![Complex64::new(0.0, 0.0); fft_size];
        for (slot, &v) in buf.iter_mut().zip(values) {
            slot.re = v as f64;
        }
        buf
    };

    let mut x = to_complex(signal);
    let mut h = to_complex(kernel);
    forward.process(&mut x);
    forward.process(&mut h);

    for (a, b) in x.iter_mut().zip(&h) {
        *a *= *b;
    }
    inverse.process(&mut x);

    // rustfft inverse is unnormalized
    let norm = 1.0 / fft_size as f64;
    x[..full_len].iter().map(|c| (c.re * norm) as f32).collect()
}
