// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON configuration: listen address plus the sensor line-up, with
//! per-sensor overrides for simulation shaping and fault injection.

use crate::amplifier::Amplifier;
use crate::bus::{CommunicationUnit, MAX_SENSORS};
use crate::errors::AmpError;
use crate::head::{HeadModel, HeadProfile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Simulator configuration, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Address to bind to (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on (default: 9999)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connected sensors, bus order; the first one becomes the main
    /// unit.
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9999
}

/// One sensor entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Head model, e.g. "IL-030".
    #[serde(rename = "type")]
    pub model: String,

    /// Attribute overrides applied after the head defaults.
    #[serde(default)]
    pub overrides: Overrides,
}

/// Typed override surface. Unknown keys fail the load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    /// Fixed raw value in millimeters.
    pub raw_value: Option<f64>,
    /// Clear the raw value (the head sees no target).
    pub signal_lost: Option<bool>,
    /// Re-randomize the raw value on every poll.
    pub randomized: Option<bool>,
    /// Measurement uncertainty in millimeters.
    pub uncertainty: Option<f64>,
    /// Fault injection: amplifier error word.
    pub internal_error: Option<u16>,
    pub stored_timing_input: Option<bool>,
    pub stored_laser_emission_stop: Option<bool>,
    pub reversed_measurement_direction: Option<bool>,
    pub external_input_1: Option<bool>,
    pub external_input_2: Option<bool>,
    pub external_input_3: Option<bool>,
    pub external_input_4: Option<bool>,
    /// Reproduce the historical firmware's bank selection (stored
    /// setting wins even in external switching).
    pub legacy_bank_selection: Option<bool>,
}

impl SimulatorConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<SimulatorConfig, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: SimulatorConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port cannot be 0".into()));
        }
        if self.sensors.len() > MAX_SENSORS {
            return Err(ConfigError::InvalidValue(format!(
                "at most {} sensors per bus, got {}",
                MAX_SENSORS,
                self.sensors.len()
            )));
        }
        for sensor in &self.sensors {
            if HeadModel::from_config_type(&sensor.model).is_none() {
                return Err(ConfigError::UnknownModel(sensor.model.clone()));
            }
        }
        Ok(())
    }

    /// Build the communication unit with all configured amplifiers.
    pub fn build_bus(&self) -> Result<CommunicationUnit, ConfigError> {
        self.validate()?;
        let mut bus = CommunicationUnit::new();
        for sensor in &self.sensors {
            let model = HeadModel::from_config_type(&sensor.model)
                .ok_or_else(|| ConfigError::UnknownModel(sensor.model.clone()))?;
            let amp = Amplifier::new(HeadProfile::for_model(model));
            apply_overrides(&amp, &sensor.overrides);
            bus.add_unit(amp);
        }
        Ok(bus)
    }
}

fn apply_overrides(amp: &Amplifier, ov: &Overrides) {
    let mut st = amp.lock_state();
    if let Some(u) = ov.uncertainty {
        st.uncertainty = u;
    }
    if let Some(r) = ov.randomized {
        st.randomized = r;
    }
    if let Some(e) = ov.internal_error {
        st.internal_error = AmpError::from_bits(e);
    }
    if let Some(t) = ov.stored_timing_input {
        st.stored_timing_input = t;
    }
    if let Some(s) = ov.stored_laser_emission_stop {
        st.stored_laser_emission_stop = s;
    }
    if let Some(d) = ov.reversed_measurement_direction {
        st.reversed_measurement_direction = d;
    }
    let lines = [
        ov.external_input_1,
        ov.external_input_2,
        ov.external_input_3,
        ov.external_input_4,
    ];
    for (line, value) in lines.iter().enumerate() {
        if let Some(on) = value {
            st.external_inputs[line] = *on;
        }
    }
    if let Some(l) = ov.legacy_bank_selection {
        st.legacy_bank_selection = l;
    }
    if let Some(raw) = ov.raw_value {
        st.set_raw(Some(raw));
    }
    if ov.signal_lost == Some(true) {
        st.set_raw(None);
    }
    st.update_timing_input_status();
}

/// Configuration error types.
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    UnknownModel(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {}", s),
            Self::Parse(s) => write!(f, "Parse error: {}", s),
            Self::UnknownModel(s) => write!(f, "Unknown sensor type: {}", s),
            Self::InvalidValue(s) => write!(f, "Invalid value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}
