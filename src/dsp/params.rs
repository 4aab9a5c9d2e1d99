//! Effect Parameters
//!
//! One immutable record configuring every stage of the chain. Loadable from
//! JSON with every field optional; missing fields take their neutral value.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::delay::{MultiTapEcho, MAX_DECAY, MAX_DELAY_MS};
use crate::dsp::effect::Stage;
use crate::dsp::eq::ThreeBandEqualizer;
use crate::dsp::gain::{Gain, MAX_GAIN_DB, MIN_GAIN_DB};
use crate::dsp::gate::SpectralNoiseGate;
use crate::dsp::limiter::Normalizer;
use crate::dsp::pitch::{PitchShifter, MAX_SEMITONES};
use crate::dsp::reverb::{SyntheticReverb, DEFAULT_ROOM_SIZE};
use crate::dsp::ring_mod::RobotVoiceModulator;
use crate::dsp::stretch::{TimeStretcher, MAX_RATE, MIN_RATE};
use crate::error::{Result, VoxError};

/// Band gain range shared by bass, mid and treble (dB)
const BAND_RANGE_DB: (f32, f32) = (-20.0, 20.0);

/// Room size range
const ROOM_SIZE_RANGE: (f32, f32) = (0.1, 1.0);

/// Configuration for a full chain run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParameters {
    /// Pitch shift in semitones (-12 to 12)
    pub pitch_shift_semitones: f32,
    /// Time stretch rate (0.5 to 2.0; above 1 is faster)
    pub time_stretch_rate: f32,
    /// Gain in dB (-20 to 20)
    pub gain_db: f32,
    /// Low band gain in dB (-20 to 20)
    pub bass_db: f32,
    /// Mid band gain in dB (-20 to 20)
    pub mid_db: f32,
    /// High band gain in dB (-20 to 20)
    pub treble_db: f32,
    /// Noise reduction strength (0 to 1)
    pub noise_reduction_strength: f32,
    /// Reverb wet mix (0 to 1)
    pub reverb_amount: f32,
    /// Reverb room size (0.1 to 1.0)
    pub reverb_room_size: f32,
    /// Echo tap spacing in ms (0 to 1000)
    pub echo_delay_ms: f32,
    /// Echo per-tap decay (0 to 0.9)
    pub echo_decay: f32,
    /// Ring-modulate with a 200 Hz carrier
    pub robot_voice: bool,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            pitch_shift_semitones: 0.0,
            time_stretch_rate: 1.0,
            gain_db: 0.0,
            bass_db: 0.0,
            mid_db: 0.0,
            treble_db: 0.0,
            noise_reduction_strength: 0.0,
            reverb_amount: 0.0,
            reverb_room_size: DEFAULT_ROOM_SIZE,
            echo_delay_ms: 0.0,
            echo_decay: 0.0,
            robot_voice: false,
        }
    }
}

impl EffectParameters {
    /// Load parameters from a JSON file
    ///
    /// # Errors
    /// * `Io` - The file cannot be read
    /// * `Serialization` - The file is not valid JSON for this record
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Check every field against its range
    ///
    /// # Errors
    /// * `Configuration` - The first field that is non-finite or out of range,
    ///   attributed to the stage it configures
    pub fn validate(&self) -> Result<()> {
        check(
            "pitch_shift",
            "pitch_shift_semitones",
            self.pitch_shift_semitones,
            (-MAX_SEMITONES, MAX_SEMITONES),
        )?;
        check(
            "time_stretch",
            "time_stretch_rate",
            self.time_stretch_rate,
            (MIN_RATE, MAX_RATE),
        )?;
        check("gain", "gain_db", self.gain_db, (MIN_GAIN_DB, MAX_GAIN_DB))?;
        check("equalizer", "bass_db", self.bass_db, BAND_RANGE_DB)?;
        check("equalizer", "mid_db", self.mid_db, BAND_RANGE_DB)?;
        check("equalizer", "treble_db", self.treble_db, BAND_RANGE_DB)?;
        check(
            "noise_gate",
            "noise_reduction_strength",
            self.noise_reduction_strength,
            (0.0, 1.0),
        )?;
        check("reverb", "reverb_amount", self.reverb_amount, (0.0, 1.0))?;
        check(
            "reverb",
            "reverb_room_size",
            self.reverb_room_size,
            ROOM_SIZE_RANGE,
        )?;
        check("echo", "echo_delay_ms", self.echo_delay_ms, (0.0, MAX_DELAY_MS))?;
        check("echo", "echo_decay", self.echo_decay, (0.0, MAX_DECAY))?;
        Ok(())
    }

    /// Build the stages in processing order
    ///
    /// The normalizer is always last. Neutral stages are included; the chain
    /// decides whether to skip them.
    pub fn stages(&self) -> Vec<Box<dyn Stage>> {
        vec![
            Box::new(PitchShifter::new(self.pitch_shift_semitones)),
            Box::new(TimeStretcher::new(self.time_stretch_rate)),
            Box::new(Gain::new(self.gain_db)),
            Box::new(ThreeBandEqualizer::new(
                self.bass_db,
                self.mid_db,
                self.treble_db,
            )),
            Box::new(SpectralNoiseGate::new(self.noise_reduction_strength)),
            Box::new(SyntheticReverb::new(
                self.reverb_amount,
                self.reverb_room_size,
            )),
            Box::new(MultiTapEcho::new(self.echo_delay_ms, self.echo_decay)),
            Box::new(RobotVoiceModulator::new(self.robot_voice)),
            Box::new(Normalizer::new()),
        ]
    }
}

fn check(stage: &'static str, field: &str, value: f32, (lo, hi): (f32, f32)) -> Result<()> {
    if !value.is_finite() {
        return Err(VoxError::config(stage, field, format!("{} is not finite", value)));
    }
    if !(lo..=hi).contains(&value) {
        return Err(VoxError::config(
            stage,
            field,
            format!("{} is outside {}..={}", value, lo, hi),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid_and_neutral() {
        let params = EffectParameters::default();
        params.validate().unwrap();

        let stages = params.stages();
        let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "pitch_shift",
                "time_stretch",
                "gain",
                "equalizer",
                "noise_gate",
                "reverb",
                "echo",
                "robot_voice",
                "normalizer",
            ]
        );
        let active: Vec<&str> = stages
            .iter()
            .filter(|s| !s.is_neutral())
            .map(|s| s.name())
            .collect();
        assert_eq!(active, vec!["normalizer"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params: EffectParameters =
            serde_json::from_str(r#"{ "gain_db": 6.0, "robot_voice": true }"#).unwrap();
        assert_eq!(
            params,
            EffectParameters {
                gain_db: 6.0,
                robot_voice: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "echo_delay_ms": 250, "echo_decay": 0.5 }}"#).unwrap();

        let params = EffectParameters::from_json_file(file.path()).unwrap();
        assert_eq!(params.echo_delay_ms, 250.0);
        assert_eq!(params.echo_decay, 0.5);
        assert_eq!(params.reverb_room_size, DEFAULT_ROOM_SIZE);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        let err = EffectParameters::from_json_file(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_validate_names_field() {
        let params = EffectParameters {
            echo_decay: 0.95,
            ..Default::default()
        };
        match params.validate() {
            Err(VoxError::Configuration {
                stage, parameter, ..
            }) => {
                assert_eq!(stage, "echo");
                assert_eq!(parameter, "echo_decay");
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let params = EffectParameters {
            gain_db: f32::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = EffectParameters {
            reverb_room_size: 0.05,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
