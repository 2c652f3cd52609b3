use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Everything a run can be tuned with. Missing fields in a config file take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated seconds per tick, before the speed multiplier
    pub step_seconds: f64,
    pub speed_multiplier: f64,
    /// Wall-clock pause between ticks when driven in real time
    pub frame_interval_ms: u64,
    /// How often the active vehicle count is sampled, in simulated seconds
    pub sample_interval_seconds: f64,
    pub chaining: ChainingThresholds,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            step_seconds: 1.0,
            speed_multiplier: 10.0,
            frame_interval_ms: 100,
            sample_interval_seconds: 60.0,
            chaining: ChainingThresholds::default(),
        }
    }
}

impl SimConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step_seconds.is_finite() && self.step_seconds > 0.0) {
            bail!("step_seconds must be positive, not {}", self.step_seconds);
        }
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier > 0.0) {
            bail!(
                "speed_multiplier must be positive, not {}",
                self.speed_multiplier
            );
        }
        if self.sample_interval_seconds.is_nan() || self.sample_interval_seconds < 0.0 {
            bail!(
                "sample_interval_seconds can't be {}",
                self.sample_interval_seconds
            );
        }
        Ok(())
    }
}

/// When a vehicle finishing one trip of a block may go on to serve the next one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainingThresholds {
    pub max_deadhead_meters: f64,
    pub max_layover_seconds: f64,
    /// Meters of deadhead per second of layover
    pub max_deadhead_speed: f64,
}

impl Default for ChainingThresholds {
    fn default() -> Self {
        Self {
            max_deadhead_meters: 400.0,
            max_layover_seconds: 7200.0,
            max_deadhead_speed: 5.0,
        }
    }
}

impl ChainingThresholds {
    /// A long gap, in distance or time, is only rejected when the vehicle would also have to
    /// cover it implausibly fast.
    pub fn is_implausible(&self, deadhead_meters: f64, layover_seconds: f64) -> bool {
        (deadhead_meters > self.max_deadhead_meters || layover_seconds > self.max_layover_seconds)
            && deadhead_meters / layover_seconds > self.max_deadhead_speed
    }
}
