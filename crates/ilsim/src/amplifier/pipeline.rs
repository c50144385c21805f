// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Measurement pipeline: the strictly ordered cascade
//! raw -> R.V. -> CALC -> P.V., the six hold functions, the timing-input
//! edge semantics, and every derived judgment output.
//!
//! Mutating a stage recomputes all later stages synchronously, in order,
//! under the amplifier lock. The hold machine therefore sees exactly one
//! CALC sample per input mutation.

use super::settings::{
    AnalogOutputMode, CalculationMode, DisplayColor, HeadDisplayMode, HoldFunction, InputFunction,
    LedColor, OutputState,
};
use super::AmpState;
use crate::codec::{JUDGMENT_ERROR, JUDGMENT_INVALID, JUDGMENT_OVER_RANGE, JUDGMENT_UNDER_RANGE};
use crate::errors::AmpError;

/// Coefficients of the line through (x1, y1) and (x2, y2), as
/// `(tilt, offset)` of `f(x) = tilt * x + offset`.
pub(crate) fn linear_coefficients(x1: f64, y1: f64, x2: f64, y2: f64) -> (f64, f64) {
    let tilt = (y2 - y1) / (x2 - x1);
    (tilt, y1 - x1 * tilt)
}

fn scale_between(x: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let (tilt, offset) = linear_coefficients(x1, y1, x2, y2);
    tilt * x + offset
}

impl AmpState {
    // --- cascade -----------------------------------------------------

    /// Stage 1 input. `None` models a lost signal.
    pub(crate) fn set_raw(&mut self, value: Option<f64>) {
        self.raw_value = value;
        self.update_rv();
    }

    /// Stage 2: zero shift and sensor calibration.
    pub(crate) fn update_rv(&mut self) {
        let rv = self.raw_value.map(|raw| {
            let direction = if self.reversed_measurement_direction {
                -1.0
            } else {
                1.0
            };
            let (tilt, offset) = if self.calibration_use_user_settings {
                (self.calibration_tilt, self.calibration_offset)
            } else {
                (1.0, 0.0)
            };
            tilt * (direction * raw - self.shift_target()) + offset
        });
        self.r_v_value = rv;
        self.update_calc();
    }

    /// Stage 3: combine with the partner R.V. on the main unit.
    pub(crate) fn update_calc(&mut self) {
        self.calc_value = if self.r_v_value.is_none() {
            None
        } else if self.is_main_unit {
            self.computed_calc_value()
        } else {
            self.r_v_value
        };
        self.update_pv();
    }

    fn computed_calc_value(&self) -> Option<f64> {
        if self.calculation_mode == CalculationMode::Off || !self.has_partner {
            return self.r_v_value;
        }
        let rv = self.r_v_value?;
        let partner = self.partner_rv?;
        let (tilt, offset) = if self.calibration_use_user_settings {
            (self.calculation_tilt, self.calculation_offset)
        } else {
            (1.0, 0.0)
        };
        let combined = match self.calculation_mode {
            CalculationMode::Addition => rv + partner,
            CalculationMode::Subtraction => rv - partner,
            CalculationMode::Off => return self.r_v_value,
        };
        Some(tilt * combined + offset)
    }

    /// Push notification from the expansion unit.
    pub(crate) fn on_partner_rv(&mut self, rv: Option<f64>) {
        self.partner_rv = rv;
        self.update_calc();
    }

    /// Stage 4: run the configured hold function over the fresh CALC.
    pub(crate) fn update_pv(&mut self) {
        match self.hold_function {
            HoldFunction::SampleHold => {
                if !(self.timing_input_on_edge || self.timing_input) {
                    self.p_v_value = self.calc_value;
                }
            }
            HoldFunction::PeakHold => self.sampled_hold(HoldKind::Peak),
            HoldFunction::BottomHold => self.sampled_hold(HoldKind::Bottom),
            HoldFunction::PeakToPeakHold => self.sampled_hold(HoldKind::PeakToPeak),
            HoldFunction::AutoPeakHold => self.auto_hold(HoldKind::Peak),
            HoldFunction::AutoBottomHold => self.auto_hold(HoldKind::Bottom),
        }
    }

    // --- hold machine ------------------------------------------------

    fn clear_hold_set(&mut self) {
        self.hold_value = None;
        self.hold_peak = None;
        self.hold_bottom = None;
    }

    fn accumulate(&mut self, calc: f64) {
        self.hold_peak = Some(self.hold_peak.map_or(calc, |p| p.max(calc)));
        self.hold_bottom = Some(self.hold_bottom.map_or(calc, |b| b.min(calc)));
    }

    fn sampled_hold(&mut self, kind: HoldKind) {
        if !self.currently_sampling || self.error_during_sampling {
            return;
        }
        match self.calc_value {
            None => {
                // An alarmed CALC anywhere in the sampling period voids
                // the whole hold result until the next restart.
                self.clear_hold_set();
                self.error_during_sampling = true;
            }
            Some(calc) => {
                self.accumulate(calc);
                self.hold_value = match kind {
                    HoldKind::Peak => self.hold_peak,
                    HoldKind::Bottom => self.hold_bottom,
                    HoldKind::PeakToPeak => match (self.hold_peak, self.hold_bottom) {
                        (Some(p), Some(b)) => Some(p - b),
                        _ => None,
                    },
                };
            }
        }
    }

    fn auto_hold(&mut self, kind: HoldKind) {
        let start_level = self.auto_trigger_level;
        let end_level = match kind {
            HoldKind::Bottom => start_level + self.hysteresis,
            _ => start_level - self.hysteresis,
        };
        let ended = match self.calc_value {
            None => true,
            Some(c) => match kind {
                HoldKind::Bottom => c > end_level,
                _ => c < end_level,
            },
        };
        if ended {
            self.currently_sampling = false;
            self.p_v_value = self.hold_value;
            return;
        }
        let Some(calc) = self.calc_value else { return };
        let triggered = match kind {
            HoldKind::Bottom => calc < start_level,
            _ => calc > start_level,
        };
        if triggered && (self.currently_sampling || !self.timing_input) {
            if !self.currently_sampling {
                self.clear_hold_set();
                self.currently_sampling = true;
            }
            self.accumulate(calc);
            self.hold_value = match kind {
                HoldKind::Bottom => self.hold_bottom,
                _ => self.hold_peak,
            };
        }
    }

    /// Timing-input transition: freezes and restarts the sampled holds,
    /// and latches CALC in edge-triggered sample hold.
    pub(crate) fn set_timing_input(&mut self, value: bool) {
        let edge = value != self.timing_input;
        let positive_edge = edge && value;
        let negative_edge = edge && !value;
        self.timing_input = value;

        match self.hold_function {
            HoldFunction::SampleHold => {
                if self.timing_input_on_edge && positive_edge {
                    self.p_v_value = self.calc_value;
                }
            }
            HoldFunction::PeakHold | HoldFunction::BottomHold | HoldFunction::PeakToPeakHold => {
                if positive_edge {
                    self.currently_sampling = false;
                    self.error_during_sampling = false;
                    self.p_v_value = self.hold_value;
                }
                if edge && (self.timing_input_on_edge || negative_edge) {
                    self.clear_hold_set();
                    self.currently_sampling = true;
                }
            }
            HoldFunction::AutoPeakHold | HoldFunction::AutoBottomHold => {}
        }
    }

    /// Re-derive the effective timing input from the external line and
    /// the stored flag. Called by the input worker every tick and
    /// synchronously after writes that touch either source.
    pub(crate) fn update_timing_input_status(&mut self) {
        let line3_timing = self.input_functions[2] == InputFunction::Timing
            || !self.external_input_use_user_settings;
        let effective = (line3_timing && self.external_inputs[2]) || self.stored_timing_input;
        self.set_timing_input(effective);
    }

    // --- simulation inputs -------------------------------------------

    pub(crate) fn randomize_value(&mut self) {
        let span = self.randomized_upper_limit - self.randomized_lower_limit;
        let raw = self.randomized_lower_limit + fastrand::f64() * span;
        self.set_raw(Some(raw));
    }

    pub(crate) fn apply_uncertainty(&mut self) {
        if self.raw_value.is_none() {
            return;
        }
        if self.randomized {
            self.randomize_value();
        }
        if let Some(raw) = self.raw_value {
            let noise = (fastrand::f64() * 2.0 - 1.0) * self.uncertainty;
            self.set_raw(Some(raw + noise));
        }
    }

    // --- derived outputs ---------------------------------------------

    /// The laser stops on an emission-stop input, the stored stop flag,
    /// or a head error.
    pub(crate) fn laser_active(&self) -> bool {
        let stop_by_line = self.external_input_use_user_settings
            && self
                .input_functions
                .iter()
                .zip(self.external_inputs.iter())
                .any(|(f, on)| *f == InputFunction::LaserStop && *on);
        !(stop_by_line
            || self.stored_laser_emission_stop
            || self.internal_error == AmpError::SENSOR_HEAD)
    }

    fn judgment_inputs(&self) -> Option<(f64, f64)> {
        if !self.laser_active() {
            return None;
        }
        Some((self.raw_value?, self.p_v_value?))
    }

    pub(crate) fn high_state(&self) -> bool {
        if self.internal_error.contains(AmpError::OVERCURRENT) {
            return false;
        }
        if self.internal_error.any_besides(AmpError::EEPROM) {
            return true;
        }
        match self.judgment_inputs() {
            None => false,
            Some((raw, pv)) => raw > self.upper_bound || pv > self.threshold_high(),
        }
    }

    pub(crate) fn low_state(&self) -> bool {
        if self.internal_error.contains(AmpError::OVERCURRENT) {
            return false;
        }
        if self.internal_error.any_besides(AmpError::EEPROM) {
            return true;
        }
        match self.judgment_inputs() {
            None => false,
            Some((raw, pv)) => raw < self.lower_bound || pv < self.threshold_low(),
        }
    }

    pub(crate) fn go_state(&self) -> bool {
        if self.internal_error.contains(AmpError::OVERCURRENT) {
            return false;
        }
        if self.internal_error.any_besides(AmpError::EEPROM) {
            return false;
        }
        match self.judgment_inputs() {
            None => false,
            Some((raw, pv)) => {
                raw <= self.upper_bound
                    && raw >= self.lower_bound
                    && pv <= self.threshold_high()
                    && pv >= self.threshold_low()
            }
        }
    }

    /// True while no alarm condition exists; the physical line inverts
    /// because the alarm output is normally closed.
    pub(crate) fn alarm_state(&self) -> bool {
        !self.internal_error.is_empty() || self.raw_value.is_none()
    }

    pub(crate) fn high_output(&self) -> bool {
        self.high_state() != self.output_mode_normally_closed
    }

    pub(crate) fn low_output(&self) -> bool {
        self.low_state() != self.output_mode_normally_closed
    }

    pub(crate) fn go_output(&self) -> bool {
        self.go_state() != self.output_mode_normally_closed
    }

    pub(crate) fn alarm_output(&self) -> bool {
        !self.alarm_state()
    }

    pub(crate) fn value_invalid(&self) -> bool {
        !self.laser_active() || self.p_v_value.is_none()
    }

    pub(crate) fn value_under_range(&self) -> bool {
        matches!(self.p_v_value, Some(pv) if pv < self.lower_bound)
    }

    pub(crate) fn value_over_range(&self) -> bool {
        matches!(self.p_v_value, Some(pv) if pv > self.upper_bound)
    }

    pub(crate) fn is_out_of_range(&self) -> bool {
        self.value_invalid() || self.value_under_range() || self.value_over_range()
    }

    /// Judgment value in the bus encoding used by M0/MS and registers
    /// 044..=058.
    pub(crate) fn judgment_wire_value(&self) -> i64 {
        if !self.internal_error.is_empty() {
            JUDGMENT_ERROR
        } else if self.value_invalid() {
            JUDGMENT_INVALID
        } else if self.value_over_range() {
            JUDGMENT_OVER_RANGE
        } else if self.value_under_range() {
            JUDGMENT_UNDER_RANGE
        } else {
            self.to_wire(self.p_v_value)
        }
    }

    /// Output-state field of the MS command, first match wins.
    pub(crate) fn output_state(&self) -> OutputState {
        if !self.internal_error.is_empty() {
            OutputState::Error
        } else if self.high_state() {
            OutputState::High
        } else if self.low_state() {
            OutputState::Low
        } else if self.go_state() {
            OutputState::Go
        } else {
            OutputState::AllOff
        }
    }

    /// Electrical level on the analog output, volts or milliamps.
    pub(crate) fn analog_value(&self) -> f64 {
        let mode = self.analog_output_mode;
        if mode == AnalogOutputMode::Off {
            return 0.0;
        }
        let fault_level = if mode == AnalogOutputMode::Current4To20 {
            3.0
        } else {
            5.5
        };
        if !self.internal_error.is_empty() || self.value_invalid() {
            return fault_level;
        }
        match self.p_v_value {
            None => fault_level,
            Some(pv) if pv > self.analog_upper_limit() => mode.max_level(),
            Some(pv) if pv <= self.analog_lower_limit() => mode.min_level(),
            Some(pv) => scale_between(
                pv,
                self.analog_lower_limit(),
                mode.min_level(),
                self.analog_upper_limit(),
                mode.max_level(),
            ),
        }
    }

    // --- indicator LEDs ----------------------------------------------

    pub(crate) fn reference_distance_led(&self) -> LedColor {
        match self.head_display_mode {
            HeadDisplayMode::Default => {
                let tol = self.profile.reference_distance_tolerance;
                if let Some(raw) = self.raw_value {
                    if raw > self.profile.reference_distance - tol
                        && raw < self.profile.reference_distance + tol
                    {
                        return LedColor::Green;
                    }
                }
                LedColor::Off
            }
            HeadDisplayMode::OkNg => {
                let go_color = if self.display_color == DisplayColor::GoGreen {
                    LedColor::Green
                } else {
                    LedColor::Red
                };
                let nogo_color = if self.display_color == DisplayColor::GoRed {
                    LedColor::Green
                } else {
                    LedColor::Red
                };
                if self.go_output() {
                    go_color
                } else if self.high_output() || self.low_output() || self.raw_value.is_none() {
                    nogo_color
                } else {
                    LedColor::Off
                }
            }
            HeadDisplayMode::Off => LedColor::Off,
        }
    }

    pub(crate) fn analog_range_led(&self) -> LedColor {
        if self.head_display_mode == HeadDisplayMode::Default {
            let tol = self.profile.reference_distance_analog_tolerance;
            if let Some(raw) = self.raw_value {
                if raw > self.profile.reference_distance - tol
                    && raw < self.profile.reference_distance + tol
                {
                    return LedColor::Orange;
                }
            }
        }
        LedColor::Off
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldKind {
    Peak,
    Bottom,
    PeakToPeak,
}
