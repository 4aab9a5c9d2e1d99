//! Band-limited resampling with a Hann-windowed sinc kernel

use std::f64::consts::PI;

/// Zero crossings of the sinc kernel on each side of the center
const ZERO_CROSSINGS: f64 = 16.0;

/// Resample `samples` by `ratio` (output rate / input rate)
///
/// Output length is `ceil(len * ratio)`. When downsampling the kernel cutoff
/// follows the new Nyquist frequency so content above it is removed rather
/// than aliased.
pub fn resample(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() || !(ratio > 0.0) {
        return Vec::new();
    }
    if ratio == 1.0 {
        return samples.to_vec();
    }

    let out_len = (samples.len() as f64 * ratio).ceil() as usize;
    let cutoff = ratio.min(1.0);
    // Kernel half-width in input samples
    let half_width = ZERO_CROSSINGS / cutoff;
    let last = samples.len() as i64 - 1;

    (0..out_len)
        .map(|n| {
            let position = n as f64 / ratio;
            let lo = ((position - half_width).ceil() as i64).max(0);
            let hi = ((position + half_width).floor() as i64).min(last);

            let mut acc = 0.0f64;
            for i in lo..=hi {
                let distance = position - i as f64;
                acc += samples[i as usize] as f64 * kernel(distance, cutoff, half_width);
            }
            acc as f32
        })
        .collect()
}

#[inline]
fn kernel(distance: f64, cutoff: f64, half_width: f64) -> f64 {
    let window = 0.5 * (1.0 + (PI * distance / half_width).cos());
    cutoff * sinc(cutoff * distance) * window
}

#[inline]
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f64 / rate).sin() as f32)
            .collect()
    }

    #[test]
    fn test_output_length() {
        let input = vec![0.0f32; 1001];
        assert_eq!(resample(&input, 0.5).len(), 501);
        assert_eq!(resample(&input, 2.0).len(), 2002);
        assert_eq!(resample(&input, 1.0).len(), 1001);
    }

    #[test]
    fn test_downsample_preserves_low_tone() {
        let input = tone(100.0, 8000.0, 8000);
        let output = resample(&input, 0.5);
        let expected = tone(100.0, 4000.0, output.len());

        // Ignore kernel edge effects at both ends
        for n in 200..output.len() - 200 {
            assert!(
                (output[n] - expected[n]).abs() < 0.01,
                "sample {}: {} vs {}",
                n,
                output[n],
                expected[n]
            );
        }
    }

    #[test]
    fn test_upsample_preserves_low_tone() {
        let input = tone(100.0, 8000.0, 4000);
        let output = resample(&input, 2.0);
        let expected = tone(100.0, 16000.0, output.len());
        for n in 400..output.len() - 400 {
            assert!((output[n] - expected[n]).abs() < 0.01);
        }
    }

    #[test]
    fn test_downsample_removes_content_above_new_nyquist() {
        // 3 kHz at 8 kHz is above the 2 kHz Nyquist of the halved rate
        let input = tone(3000.0, 8000.0, 8000);
        let output = resample(&input, 0.5);
        let peak = output[200..output.len() - 200]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak < 0.05, "aliased energy {}", peak);
    }
}
