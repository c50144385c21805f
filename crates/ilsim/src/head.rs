// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sensor-head catalog: model codes and the per-model constant tables an
//! amplifier is initialised from.

/// Sensor head connected to an amplifier, reported by register 195.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadModel {
    NotConnected,
    Il030,
    Il065,
    Il100,
    Il300,
    Il600,
    IlS025,
    IlS065,
    IlS100,
    Il2000,
}

impl HeadModel {
    /// Model code on the wire.
    pub fn code(self) -> u16 {
        match self {
            HeadModel::NotConnected => 0,
            HeadModel::Il030 => 1,
            HeadModel::Il065 => 2,
            HeadModel::Il100 => 3,
            HeadModel::Il300 => 4,
            HeadModel::Il600 => 5,
            HeadModel::IlS025 => 106,
            HeadModel::IlS065 => 107,
            HeadModel::IlS100 => 208,
            HeadModel::Il2000 => 311,
        }
    }

    /// Resolve a configuration `type` string. The IL-S100 exists in the
    /// catalog but has no constant table yet and is not configurable.
    pub fn from_config_type(name: &str) -> Option<HeadModel> {
        let model = match name {
            "IL-S025" => HeadModel::IlS025,
            "IL-030" => HeadModel::Il030,
            "IL-065" => HeadModel::Il065,
            "IL-S065" => HeadModel::IlS065,
            "IL-100" => HeadModel::Il100,
            "IL-300" => HeadModel::Il300,
            "IL-600" => HeadModel::Il600,
            "IL-2000" => HeadModel::Il2000,
            _ => return None,
        };
        Some(model)
    }
}

/// Per-head constants, fixed at amplifier construction.
///
/// Distances are millimeters, the sampling cycle is milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadProfile {
    pub model: HeadModel,
    pub initial_value: Option<f64>,
    pub measurement_range_max: f64,
    pub measurement_range_min: f64,
    pub reference_distance: f64,
    pub reference_distance_tolerance: f64,
    pub reference_distance_analog_tolerance: f64,
    pub decimal_position: u8,
    /// Simulated repeatability, 10x the data-sheet figure.
    pub uncertainty: f64,
    pub default_analog_upper_limit: f64,
    pub default_analog_lower_limit: f64,
    pub default_tolerance_setting_range: f64,
    pub default_threshold_high: f64,
    pub default_threshold_low: f64,
    pub default_shift_target: f64,
    pub default_auto_trigger_level: f64,
    pub default_bank_analog_upper_limit: f64,
    pub default_bank_analog_lower_limit: f64,
    pub default_sampling_cycle_ms: f64,
    pub default_display_digit: u8,
}

impl HeadProfile {
    /// Constant table for one head model.
    ///
    /// # Panics
    /// `NotConnected` and `IlS100` have no table.
    pub fn for_model(model: HeadModel) -> HeadProfile {
        match model {
            HeadModel::IlS025 => HeadProfile {
                model,
                initial_value: Some(0.000),
                measurement_range_max: 30.000,
                measurement_range_min: 20.000,
                reference_distance: 25.000,
                reference_distance_tolerance: 0.250,
                reference_distance_analog_tolerance: 5.000,
                decimal_position: 3,
                uncertainty: 0.010,
                default_analog_upper_limit: 5.000,
                default_analog_lower_limit: -5.000,
                default_tolerance_setting_range: 0.200,
                default_threshold_high: 5.000,
                default_threshold_low: -5.000,
                default_shift_target: 0.000,
                default_auto_trigger_level: 1.00,
                default_bank_analog_upper_limit: 10.000,
                default_bank_analog_lower_limit: -10.000,
                default_sampling_cycle_ms: 1.000,
                default_display_digit: 2,
            },
            HeadModel::Il030 => HeadProfile {
                model,
                initial_value: Some(0.000),
                measurement_range_max: 45.000,
                measurement_range_min: 20.000,
                reference_distance: 30.000,
                reference_distance_tolerance: 0.250,
                reference_distance_analog_tolerance: 5.000,
                decimal_position: 3,
                uncertainty: 0.010,
                default_analog_upper_limit: 5.000,
                default_analog_lower_limit: -5.000,
                default_tolerance_setting_range: 0.200,
                default_threshold_high: 5.000,
                default_threshold_low: -5.000,
                default_shift_target: 0.000,
                default_auto_trigger_level: 1.00,
                default_bank_analog_upper_limit: 10.000,
                default_bank_analog_lower_limit: -10.000,
                default_sampling_cycle_ms: 1.000,
                default_display_digit: 2,
            },
            HeadModel::Il065 => HeadProfile {
                model,
                initial_value: Some(0.000),
                measurement_range_max: 105.000,
                measurement_range_min: 55.000,
                reference_distance: 65.000,
                reference_distance_tolerance: 0.500,
                reference_distance_analog_tolerance: 10.000,
                decimal_position: 3,
                uncertainty: 0.020,
                default_analog_upper_limit: 10.000,
                default_analog_lower_limit: -10.000,
                default_tolerance_setting_range: 0.200,
                default_threshold_high: 5.000,
                default_threshold_low: -5.000,
                default_shift_target: 0.000,
                default_auto_trigger_level: 1.00,
                default_bank_analog_upper_limit: 10.000,
                default_bank_analog_lower_limit: -10.000,
                default_sampling_cycle_ms: 1.000,
                default_display_digit: 2,
            },
            HeadModel::IlS065 => HeadProfile {
                model,
                initial_value: Some(0.000),
                measurement_range_max: 75.000,
                measurement_range_min: 55.000,
                reference_distance: 65.000,
                reference_distance_tolerance: 0.500,
                reference_distance_analog_tolerance: 10.000,
                decimal_position: 3,
                uncertainty: 0.020,
                default_analog_upper_limit: 10.000,
                default_analog_lower_limit: -10.000,
                default_tolerance_setting_range: 0.200,
                default_threshold_high: 5.000,
                default_threshold_low: -5.000,
                default_shift_target: 0.000,
                default_auto_trigger_level: 1.00,
                default_bank_analog_upper_limit: 10.000,
                default_bank_analog_lower_limit: -10.000,
                default_sampling_cycle_ms: 1.000,
                default_display_digit: 2,
            },
            HeadModel::Il100 => HeadProfile {
                model,
                initial_value: Some(0.000),
                measurement_range_max: 130.000,
                measurement_range_min: 75.000,
                reference_distance: 100.000,
                reference_distance_tolerance: 1.000,
                reference_distance_analog_tolerance: 20.000,
                decimal_position: 3,
                uncertainty: 0.040,
                default_analog_upper_limit: 20.000,
                default_analog_lower_limit: -20.000,
                default_tolerance_setting_range: 0.200,
                default_threshold_high: 5.000,
                default_threshold_low: -5.000,
                default_shift_target: 0.000,
                default_auto_trigger_level: 1.00,
                default_bank_analog_upper_limit: 10.000,
                default_bank_analog_lower_limit: -10.000,
                default_sampling_cycle_ms: 1.000,
                default_display_digit: 2,
            },
            HeadModel::Il300 => HeadProfile {
                model,
                initial_value: Some(0.00),
                measurement_range_max: 450.00,
                measurement_range_min: 160.00,
                reference_distance: 300.00,
                reference_distance_tolerance: 7.00,
                reference_distance_analog_tolerance: 140.00,
                decimal_position: 2,
                uncertainty: 0.30,
                default_analog_upper_limit: 140.00,
                default_analog_lower_limit: -140.00,
                default_tolerance_setting_range: 2.00,
                default_threshold_high: 50.00,
                default_threshold_low: -50.00,
                default_shift_target: 0.00,
                default_auto_trigger_level: 10.00,
                default_bank_analog_upper_limit: 100.00,
                default_bank_analog_lower_limit: -100.00,
                default_sampling_cycle_ms: 2.000,
                default_display_digit: 1,
            },
            HeadModel::Il600 => HeadProfile {
                model,
                initial_value: Some(0.00),
                measurement_range_max: 1000.00,
                measurement_range_min: 200.00,
                reference_distance: 600.00,
                reference_distance_tolerance: 20.00,
                reference_distance_analog_tolerance: 400.00,
                decimal_position: 2,
                uncertainty: 0.50,
                default_analog_upper_limit: 400.00,
                default_analog_lower_limit: -400.00,
                default_tolerance_setting_range: 2.00,
                default_threshold_high: 50.00,
                default_threshold_low: -50.00,
                default_shift_target: 0.00,
                default_auto_trigger_level: 10.00,
                default_bank_analog_upper_limit: 100.00,
                default_bank_analog_lower_limit: -100.00,
                default_sampling_cycle_ms: 2.000,
                default_display_digit: 1,
            },
            HeadModel::Il2000 => HeadProfile {
                model,
                initial_value: Some(0.0),
                measurement_range_max: 3500.0,
                measurement_range_min: 1000.0,
                reference_distance: 2000.0,
                reference_distance_tolerance: 50.0,
                reference_distance_analog_tolerance: 1000.0,
                decimal_position: 1,
                uncertainty: 1.0,
                default_analog_upper_limit: 1000.0,
                default_analog_lower_limit: -1000.0,
                default_tolerance_setting_range: 20.0,
                default_threshold_high: 500.0,
                default_threshold_low: -500.0,
                default_shift_target: 0.0,
                default_auto_trigger_level: 100.0,
                default_bank_analog_upper_limit: 1000.0,
                default_bank_analog_lower_limit: -1000.0,
                default_sampling_cycle_ms: 5.000,
                default_display_digit: 0,
            },
            HeadModel::NotConnected | HeadModel::IlS100 => {
                panic!("no constant table for {:?}", model)
            }
        }
    }
}
