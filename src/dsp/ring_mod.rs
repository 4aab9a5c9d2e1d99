//! Robot Voice
//!
//! Ring modulation by a fixed 200 Hz sine carrier.

use std::f64::consts::PI;

use serde_json::{json, Value};

use crate::dsp::effect::{Stage, StageContext};
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Carrier frequency in Hz
pub const CARRIER_HZ: f64 = 200.0;

/// Multiply each sample by `sin(2 * pi * 200 * n / sample_rate)`
pub fn modulate(mut buffer: AudioBuffer) -> AudioBuffer {
    let step = 2.0 * PI * CARRIER_HZ / buffer.sample_rate() as f64;
    for (n, sample) in buffer.samples_mut().iter_mut().enumerate() {
        *sample *= (step * n as f64).sin() as f32;
    }
    buffer
}

/// Robot voice stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RobotVoiceModulator {
    enabled: bool,
}

impl RobotVoiceModulator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Stage for RobotVoiceModulator {
    fn name(&self) -> &'static str {
        "robot_voice"
    }

    fn display_name(&self) -> &'static str {
        "Robot Voice"
    }

    fn is_neutral(&self) -> bool {
        !self.enabled
    }

    fn apply(&self, buffer: AudioBuffer, _ctx: &mut StageContext) -> Result<AudioBuffer> {
        Ok(modulate(buffer))
    }

    fn params(&self) -> Value {
        json!({
            "enabled": self.enabled,
            "carrier_hz": CARRIER_HZ,
        })
    }
}
