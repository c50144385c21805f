// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Write-only operation requests (data numbers 001..=028): zero shift,
//! resets, tolerance and two-point tuning, sensor and calculated-value
//! calibration, diff-count tuning.
//!
//! Every request accepts only the value 1. Multi-stage operations keep
//! their staging slots on success and clear them on any failure.

use super::pipeline::linear_coefficients;
use super::settings::{CalcCalibrationMode, CalculationMode, OperationResult};
use super::{AmpState, CalcStagePoint};
use crate::errors::{WireError, WireResult};

/// Calibration factors outside this window abort with an abnormal
/// termination.
const CALIBRATION_FACTOR_MIN: f64 = 0.5;
const CALIBRATION_FACTOR_MAX: f64 = 2.0;

fn factor_ok(factor: f64) -> bool {
    (CALIBRATION_FACTOR_MIN..=CALIBRATION_FACTOR_MAX).contains(&factor)
}

fn require_execute(value: i64) -> WireResult<()> {
    if value == 1 {
        Ok(())
    } else {
        Err(WireError::ValueOutOfRange)
    }
}

impl AmpState {
    /// Compose a two-point sensor calibration on top of the current one
    /// so that `p1_before` maps to `p1_after` and `p2_before` to
    /// `p2_after`.
    fn calibrate_sensor(&mut self, p1_before: f64, p1_after: f64, p2_before: f64, p2_after: f64) {
        let old_tilt = self.calibration_tilt;
        let old_offset = self.calibration_offset;
        let p1_raw = (p1_before - old_offset) / old_tilt;
        let p2_raw = (p2_before - old_offset) / old_tilt;
        let (tilt, offset) = linear_coefficients(p1_raw, p1_after, p2_raw, p2_after);
        self.calibration_tilt = tilt;
        self.calibration_offset = offset;
    }

    /// Same composition for the calculated-value axis.
    fn calibrate_calc(&mut self, p1_before: f64, p1_after: f64, p2_before: f64, p2_after: f64) {
        let old_tilt = self.calculation_tilt;
        let old_offset = self.calculation_offset;
        let p1_raw = (p1_before - old_offset) / old_tilt;
        let p2_raw = (p2_before - old_offset) / old_tilt;
        let (tilt, offset) = linear_coefficients(p1_raw, p1_after, p2_raw, p2_after);
        self.calculation_tilt = tilt;
        self.calculation_offset = offset;
    }

    /// 001: capture the current raw value as the effective bank's shift
    /// target.
    pub(crate) fn op_zero_shift(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.zero_shifting_result = OperationResult::Operating;
        match self.raw_value {
            None => {
                self.zero_shifting_result = OperationResult::Abnormal;
                Err(WireError::NotExecutable)
            }
            Some(raw) => {
                self.change_shift_target(raw, None);
                self.zero_shifting_result = OperationResult::Normal;
                Ok(())
            }
        }
    }

    /// 002: reset the effective bank's shift target.
    pub(crate) fn op_zero_shift_reset(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.zero_shifting_result = OperationResult::Operating;
        self.change_shift_target(0.0, None);
        self.zero_shifting_result = OperationResult::Normal;
        Ok(())
    }

    /// 003: reset request.
    pub(crate) fn op_reset(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.reset_request_result = OperationResult::Operating;
        self.reset();
        self.reset_request_result = OperationResult::Normal;
        Ok(())
    }

    /// 005: initial reset; restores all defaults and schedules the long
    /// EEPROM write.
    pub(crate) fn op_initial_reset(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.restore_default_settings();
        Ok(())
    }

    /// 006: apply the staged system parameters.
    pub(crate) fn op_set_system_parameters(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.set_system_parameters();
        Ok(())
    }

    /// 014: tolerance tuning around the current P.V.
    pub(crate) fn op_tolerance_tuning(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let Some(pv) = self.p_v_value else {
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.change_high_threshold(pv + self.tolerance_setting_range, None);
        self.change_low_threshold(pv - self.tolerance_setting_range, None);
        self.tuning_result = OperationResult::Normal;
        Ok(())
    }

    /// 015: two-point tuning, HIGH side, first point.
    pub(crate) fn op_two_point_high_1st(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let Some(rv) = self.r_v_value else {
            self.two_point_high_1st = None;
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.two_point_high_1st = Some(rv);
        Ok(())
    }

    /// 016: two-point tuning, HIGH side, second point; the threshold
    /// becomes the midpoint.
    pub(crate) fn op_two_point_high_2nd(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let (Some(rv), Some(first)) = (self.r_v_value, self.two_point_high_1st) else {
            self.two_point_high_1st = None;
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.change_high_threshold((first + rv) / 2.0, None);
        self.tuning_result = OperationResult::Normal;
        Ok(())
    }

    /// 017: two-point tuning, LOW side, first point.
    pub(crate) fn op_two_point_low_1st(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let Some(rv) = self.r_v_value else {
            self.two_point_low_1st = None;
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.two_point_low_1st = Some(rv);
        Ok(())
    }

    /// 018: two-point tuning, LOW side, second point.
    pub(crate) fn op_two_point_low_2nd(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let (Some(rv), Some(first)) = (self.r_v_value, self.two_point_low_1st) else {
            self.two_point_low_1st = None;
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.change_low_threshold((first + rv) / 2.0, None);
        self.tuning_result = OperationResult::Normal;
        Ok(())
    }

    /// 019: sensor calibration, first point; stages the current R.V.
    pub(crate) fn op_calibration_set_1(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        let Some(rv) = self.r_v_value else {
            self.calibration_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        if !self.calibration_use_user_settings {
            self.calibration_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        }
        self.calibration_set_1_before = Some(rv);
        Ok(())
    }

    /// 020: sensor calibration, second point; validates the factor and
    /// composes the new transform.
    pub(crate) fn op_calibration_set_2(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        let fail = |st: &mut AmpState| {
            st.calibration_result = OperationResult::Abnormal;
            st.calibration_set_1_before = None;
            Err(WireError::NotExecutable)
        };
        let (Some(rv), Some(first)) = (self.r_v_value, self.calibration_set_1_before) else {
            return fail(self);
        };
        if !self.calibration_use_user_settings {
            return fail(self);
        }
        let factor = (self.calibration_set_2 - self.calibration_set_1) / (rv - first);
        if !factor_ok(factor) {
            return fail(self);
        }
        let (set_1, set_2) = (self.calibration_set_1, self.calibration_set_2);
        self.calibrate_sensor(first, set_1, rv, set_2);
        self.calibration_set_1_before = None;
        self.arm_eeprom(super::EEPROM_WRITE_DELAY);
        self.calibration_result = OperationResult::Normal;
        Ok(())
    }

    /// 021: calculated-value two-point calibration, first point.
    pub(crate) fn op_calc_2p_set_1(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        let failed = self.calc_value.is_none()
            || !self.calibration_use_user_settings
            || self.calc_calibration_mode != CalcCalibrationMode::TwoPoint;
        if failed {
            self.calibration_result = OperationResult::Abnormal;
            self.calc_2p_set_1_before = None;
            return Err(WireError::NotExecutable);
        }
        self.calc_2p_set_1_before = self.calc_value;
        Ok(())
    }

    /// 022: calculated-value two-point calibration, second point.
    pub(crate) fn op_calc_2p_set_2(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        let fail = |st: &mut AmpState| {
            st.calibration_result = OperationResult::Abnormal;
            st.calc_2p_set_1_before = None;
            Err(WireError::NotExecutable)
        };
        let (Some(calc), Some(first)) = (self.calc_value, self.calc_2p_set_1_before) else {
            return fail(self);
        };
        if !self.calibration_use_user_settings
            || self.calc_calibration_mode != CalcCalibrationMode::TwoPoint
        {
            return fail(self);
        }
        let factor = (self.calc_2p_set_2 - self.calc_2p_set_1) / (calc - first);
        if !factor_ok(factor) {
            return fail(self);
        }
        let (set_1, set_2) = (self.calc_2p_set_1, self.calc_2p_set_2);
        self.calibrate_calc(first, set_1, calc, set_2);
        self.calc_2p_set_1_before = None;
        self.arm_eeprom(super::EEPROM_WRITE_DELAY);
        self.calibration_result = OperationResult::Normal;
        Ok(())
    }

    fn calc_3p_inputs(&self) -> Option<CalcStagePoint> {
        Some(CalcStagePoint {
            calc: self.calc_value?,
            rv_main: self.r_v_value?,
            rv_expansion: self.partner_rv?,
        })
    }

    fn calc_3p_preconditions_ok(&self) -> bool {
        self.is_main_unit
            && self.has_partner
            && self.calibration_use_user_settings
            && self.calc_calibration_mode == CalcCalibrationMode::ThreePoint
    }

    fn calc_3p_fail(&mut self) -> WireResult<()> {
        self.calibration_result = OperationResult::Abnormal;
        self.calc_3p_stage_1 = None;
        self.calc_3p_stage_2 = None;
        Err(WireError::NotExecutable)
    }

    /// 023: calculated-value three-point calibration, first point;
    /// stages CALC plus both R.V. values.
    pub(crate) fn op_calc_3p_set_1(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        if !self.calc_3p_preconditions_ok() {
            self.calibration_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        }
        let Some(point) = self.calc_3p_inputs() else {
            self.calibration_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.calc_3p_stage_1 = Some(point);
        Ok(())
    }

    /// 024: three-point calibration, second point.
    pub(crate) fn op_calc_3p_set_2(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        if !self.calc_3p_preconditions_ok() || self.calc_3p_stage_1.is_none() {
            return self.calc_3p_fail();
        }
        let Some(point) = self.calc_3p_inputs() else {
            return self.calc_3p_fail();
        };
        self.calc_3p_stage_2 = Some(point);
        Ok(())
    }

    /// 025: three-point calibration, third point; validates both axis
    /// factors and commits the calc-axis transform.
    pub(crate) fn op_calc_3p_set_3(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.calibration_result = OperationResult::Operating;
        if !self.calc_3p_preconditions_ok() || self.calculation_mode == CalculationMode::Off {
            return self.calc_3p_fail();
        }
        let (Some(stage_1), Some(stage_2)) = (self.calc_3p_stage_1, self.calc_3p_stage_2) else {
            return self.calc_3p_fail();
        };
        let Some(stage_3) = self.calc_3p_inputs() else {
            return self.calc_3p_fail();
        };

        let calc_factor =
            (self.calc_3p_set_3 - self.calc_3p_set_1) / (stage_3.calc - stage_1.calc);
        let axis_sign = if self.calculation_mode == CalculationMode::Addition {
            -1.0
        } else {
            1.0
        };
        let expansion_factor = axis_sign * (stage_2.rv_expansion - stage_1.rv_expansion)
            / (stage_2.rv_main - stage_1.rv_main);

        if !factor_ok(calc_factor) || !factor_ok(expansion_factor) {
            return self.calc_3p_fail();
        }

        // The expansion-axis factor is only a gate; committing it would
        // rescale the expansion unit's own R.V. readings.
        let (set_1, set_3) = (self.calc_3p_set_1, self.calc_3p_set_3);
        self.calibrate_calc(stage_1.calc, set_1, stage_3.calc, set_3);
        self.calc_3p_stage_1 = None;
        self.calc_3p_stage_2 = None;
        self.arm_eeprom(super::EEPROM_WRITE_DELAY);
        self.calibration_result = OperationResult::Normal;
        Ok(())
    }

    /// 026: one-point tuning for the diff-count filter.
    pub(crate) fn op_diff_count_1p(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let Some(pv) = self.p_v_value else {
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.change_high_threshold((pv * 2.0).abs(), None);
        self.change_low_threshold((pv / 2.0).abs(), None);
        self.tuning_result = OperationResult::Normal;
        Ok(())
    }

    /// 027: diff-count two-point tuning, first point.
    pub(crate) fn op_diff_count_2p_1st(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let Some(rv) = self.r_v_value else {
            self.diff_count_1st = None;
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        self.diff_count_1st = Some(rv);
        Ok(())
    }

    /// 028: diff-count two-point tuning, second point; the step size
    /// between the points defines the thresholds.
    pub(crate) fn op_diff_count_2p_2nd(&mut self, value: i64) -> WireResult<()> {
        require_execute(value)?;
        self.tuning_result = OperationResult::Operating;
        let (Some(rv), Some(first)) = (self.r_v_value, self.diff_count_1st) else {
            self.diff_count_1st = None;
            self.tuning_result = OperationResult::Abnormal;
            return Err(WireError::NotExecutable);
        };
        let step = first - rv;
        self.change_high_threshold((step * 2.0).abs(), None);
        self.change_low_threshold((step / 2.0).abs(), None);
        self.tuning_result = OperationResult::Normal;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amplifier::Amplifier;
    use crate::head::{HeadModel, HeadProfile};

    fn state() -> AmpState {
        AmpState::new(HeadProfile::for_model(HeadModel::Il030))
    }

    #[test]
    fn test_zero_shift_captures_raw() {
        let mut st = state();
        st.set_raw(Some(2.5));
        st.op_zero_shift(1).unwrap();
        assert_eq!(st.shift_target(), 2.5);
        assert_eq!(st.zero_shifting_result, OperationResult::Normal);
        st.op_zero_shift_reset(1).unwrap();
        assert_eq!(st.shift_target(), 0.0);
    }

    #[test]
    fn test_zero_shift_without_raw_fails() {
        let mut st = state();
        st.set_raw(None);
        assert_eq!(st.op_zero_shift(1), Err(WireError::NotExecutable));
        assert_eq!(st.zero_shifting_result, OperationResult::Abnormal);
    }

    #[test]
    fn test_operations_reject_non_one() {
        let mut st = state();
        for v in [0, 2, -1] {
            assert_eq!(st.op_zero_shift(v), Err(WireError::ValueOutOfRange));
            assert_eq!(st.op_initial_reset(v), Err(WireError::ValueOutOfRange));
            assert_eq!(st.op_tolerance_tuning(v), Err(WireError::ValueOutOfRange));
        }
    }

    #[test]
    fn test_tolerance_tuning_sets_both_thresholds() {
        let mut st = state();
        st.set_raw(Some(1.0));
        st.op_tolerance_tuning(1).unwrap();
        assert!((st.threshold_high() - 1.2).abs() < 1e-9);
        assert!((st.threshold_low() - 0.8).abs() < 1e-9);
        assert_eq!(st.tuning_result, OperationResult::Normal);
    }

    #[test]
    fn test_two_point_high_tuning() {
        let mut st = state();
        st.set_raw(Some(2.0));
        st.op_two_point_high_1st(1).unwrap();
        assert_eq!(st.tuning_result, OperationResult::Operating);
        st.set_raw(Some(4.0));
        st.op_two_point_high_2nd(1).unwrap();
        assert_eq!(st.threshold_high(), 3.0);
        assert_eq!(st.tuning_result, OperationResult::Normal);
    }

    #[test]
    fn test_two_point_second_without_first_fails() {
        let mut st = state();
        st.set_raw(Some(4.0));
        assert_eq!(st.op_two_point_high_2nd(1), Err(WireError::NotExecutable));
        assert_eq!(st.tuning_result, OperationResult::Abnormal);
    }

    #[test]
    fn test_sensor_calibration_two_points() {
        let mut st = state();
        st.calibration_use_user_settings = true;
        // Targets: SET1 = 0.000, SET2 = 5.000 (head defaults).
        st.set_raw(Some(1.0));
        st.op_calibration_set_1(1).unwrap();
        st.set_raw(Some(4.0));
        st.op_calibration_set_2(1).unwrap();
        assert_eq!(st.calibration_result, OperationResult::Normal);
        assert!(st.calibration_set_1_before.is_none());
        // The calibrated R.V. now maps the two staged points onto the
        // targets.
        st.set_raw(Some(1.0));
        assert!((st.r_v_value.unwrap() - 0.0).abs() < 1e-9);
        st.set_raw(Some(4.0));
        assert!((st.r_v_value.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_requires_user_settings() {
        let mut st = state();
        st.set_raw(Some(1.0));
        assert_eq!(st.op_calibration_set_1(1), Err(WireError::NotExecutable));
        assert_eq!(st.calibration_result, OperationResult::Abnormal);
    }

    #[test]
    fn test_calibration_factor_gate() {
        let mut st = state();
        st.calibration_use_user_settings = true;
        st.set_raw(Some(0.0));
        st.op_calibration_set_1(1).unwrap();
        // SET span is 5.000 but the measured span is 100, factor 0.05.
        st.set_raw(Some(100.0));
        assert_eq!(st.op_calibration_set_2(1), Err(WireError::NotExecutable));
        assert_eq!(st.calibration_result, OperationResult::Abnormal);
        assert!(st.calibration_set_1_before.is_none());
        // The transform stayed untouched.
        assert_eq!(st.calibration_tilt, 1.0);
        assert_eq!(st.calibration_offset, 0.0);
    }

    #[test]
    fn test_calc_2p_requires_mode() {
        let mut st = state();
        st.calibration_use_user_settings = true;
        st.set_raw(Some(1.0));
        assert_eq!(st.op_calc_2p_set_1(1), Err(WireError::NotExecutable));
        st.calc_calibration_mode = CalcCalibrationMode::TwoPoint;
        st.op_calc_2p_set_1(1).unwrap();
    }

    #[test]
    fn test_calc_2p_calibration_applies() {
        let mut st = state();
        st.calibration_use_user_settings = true;
        st.calc_calibration_mode = CalcCalibrationMode::TwoPoint;
        // Targets: SET1 = 5.000, SET2 = 10.000 (head defaults).
        st.set_raw(Some(4.0));
        st.op_calc_2p_set_1(1).unwrap();
        st.set_raw(Some(8.0));
        st.op_calc_2p_set_2(1).unwrap();
        assert_eq!(st.calibration_result, OperationResult::Normal);
        assert!((st.calculation_tilt - 1.25).abs() < 1e-9);
        assert!((st.calculation_offset - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_calc_3p_full_cycle() {
        let main = Amplifier::new(HeadProfile::for_model(HeadModel::Il030));
        let expansion = Amplifier::new(HeadProfile::for_model(HeadModel::Il030));
        Amplifier::pair(&main, &expansion);
        main.handle_write(107, 1).unwrap(); // user calibration on
        main.handle_write(129, 2).unwrap(); // subtraction
        main.handle_write(110, 2).unwrap(); // three-point mode

        expansion.set_raw_value(Some(1.0));
        main.set_raw_value(Some(6.0)); // calc = 5.0, matches SET1
        main.handle_write(23, 1).unwrap();

        expansion.set_raw_value(Some(2.0));
        main.set_raw_value(Some(7.5)); // calc = 5.5, axis factor 1/1.5
        main.handle_write(24, 1).unwrap();

        expansion.set_raw_value(Some(3.0));
        main.set_raw_value(Some(13.0)); // calc = 10.0, matches SET3
        main.handle_write(25, 1).unwrap();

        let st = main.lock_state();
        assert_eq!(st.calibration_result, OperationResult::Normal);
        assert!(st.calc_3p_stage_1.is_none());
        // calc factor was exactly 1 here, so the transform is identity.
        assert!((st.calculation_tilt - 1.0).abs() < 1e-9);
        assert!((st.calculation_offset - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_calc_3p_factor_gate_clears_staging() {
        let main = Amplifier::new(HeadProfile::for_model(HeadModel::Il030));
        let expansion = Amplifier::new(HeadProfile::for_model(HeadModel::Il030));
        Amplifier::pair(&main, &expansion);
        main.handle_write(107, 1).unwrap();
        main.handle_write(129, 2).unwrap();
        main.handle_write(110, 2).unwrap();

        expansion.set_raw_value(Some(1.0));
        main.set_raw_value(Some(6.0));
        main.handle_write(23, 1).unwrap();
        expansion.set_raw_value(Some(2.0));
        main.set_raw_value(Some(7.5));
        main.handle_write(24, 1).unwrap();
        // A tiny calc span blows the factor far above 2.0.
        expansion.set_raw_value(Some(2.0));
        main.set_raw_value(Some(7.6));
        assert_eq!(main.handle_write(25, 1), Err(WireError::NotExecutable));

        let st = main.lock_state();
        assert_eq!(st.calibration_result, OperationResult::Abnormal);
        assert!(st.calc_3p_stage_1.is_none());
        assert!(st.calc_3p_stage_2.is_none());
    }

    #[test]
    fn test_diff_count_tuning() {
        let mut st = state();
        st.set_raw(Some(-3.0));
        st.op_diff_count_1p(1).unwrap();
        assert_eq!(st.threshold_high(), 6.0);
        assert_eq!(st.threshold_low(), 1.5);

        st.set_raw(Some(2.0));
        st.op_diff_count_2p_1st(1).unwrap();
        st.set_raw(Some(5.0));
        st.op_diff_count_2p_2nd(1).unwrap();
        assert_eq!(st.threshold_high(), 6.0);
        assert_eq!(st.threshold_low(), 1.5);
    }

    #[test]
    fn test_initial_reset_restores_defaults() {
        let mut st = state();
        st.hysteresis = 9.0;
        st.key_locked = true;
        st.op_initial_reset(1).unwrap();
        assert_eq!(st.hysteresis, 0.0);
        assert!(!st.key_locked);
        assert_eq!(st.eeprom_write_result, OperationResult::Operating);
        assert!(st.next_eeprom_write.is_some());
    }
}
