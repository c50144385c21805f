// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The amplifier register file: data numbers 0..=223 with per-number
//! read/write handlers, range checks and side effects.
//!
//! The index space splits into read-only status numbers, read-write
//! settings, write-only operation requests and reserved gaps. Reading a
//! write-only number is error 016, writing a read-only number is error
//! 014, touching a reserved number is error 031, and anything above 223
//! is error 020.

use super::settings::{
    AlarmSetting, AnalogOutputMode, AnalogScalingMode, CalcCalibrationMode, CalculationMode,
    DelayTimer, DisplayColor, DisplayDigits, FilterSetting, HeadDisplayMode, HighPassCutoff,
    HoldFunction, InputFunction, PowerSavingMode, SamplingCycle, SubdisplayScreen, TransistorMode,
};
use super::{
    AmpState, PostAction, ReadValue, AMP_REGISTER_MAX, DEVICE_TYPE, EEPROM_WRITE_DELAY,
    PRODUCT_CODE_EXPANSION, PRODUCT_CODE_MAIN, PRODUCT_NAME_EXPANSION, PRODUCT_NAME_MAIN,
    REVISION, SERIES_VERSION,
};
use crate::codec::{WIRE_INVALID, WIRE_MAX, WIRE_MIN};
use crate::errors::{WireError, WireResult};

/// Write-only operation requests.
fn is_operation(number: u16) -> bool {
    matches!(number, 1..=3 | 5 | 6 | 14..=28)
}

/// Numbers with a read handler.
fn is_readable(number: u16) -> bool {
    matches!(number,
        33 | 36..=44 | 50..=56 | 60 | 61
        | 65..=84
        | 97..=100 | 104..=114
        | 129 | 131..=134 | 136..=150 | 152..=159 | 161 | 162
        | 193..=195 | 200 | 215..=217)
}

/// Numbers with a write handler.
fn is_writable(number: u16) -> bool {
    is_operation(number)
        || matches!(number,
            65..=84
            | 97..=100 | 104..=114
            | 129 | 131..=134 | 136..=150 | 152..=159 | 161 | 162)
}

fn check_range(value: i64, min: i64, max: i64) -> WireResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(WireError::ValueOutOfRange)
    }
}

fn bool_from_wire(value: i64) -> WireResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(WireError::ValueOutOfRange),
    }
}

impl AmpState {
    /// SR dispatch.
    pub(crate) fn dispatch_read(&self, number: u16) -> WireResult<ReadValue> {
        if number > AMP_REGISTER_MAX {
            return Err(WireError::NumberOutOfRange);
        }
        if !is_readable(number) {
            return Err(if is_writable(number) {
                WireError::ReadProtected
            } else {
                WireError::Inaccessible
            });
        }
        if number == 200 {
            return Ok(ReadValue::Text(if self.is_main_unit {
                PRODUCT_NAME_MAIN
            } else {
                PRODUCT_NAME_EXPANSION
            }));
        }
        Ok(ReadValue::Int(self.read_register(number)))
    }

    fn read_register(&self, number: u16) -> i64 {
        match number {
            // Error word and judgment outputs.
            33 => i64::from(self.internal_error.bits()),
            36 => {
                i64::from(self.high_output())
                    + 2 * i64::from(self.low_output())
                    + 4 * i64::from(self.go_output())
                    + 8 * i64::from(self.alarm_output())
            }
            37 => self.read_pipeline_value(self.p_v_value),
            38 => self.read_pipeline_value(self.r_v_value),
            // Hold extremes report the invalid sentinel in sample hold.
            39 => {
                if self.hold_function == HoldFunction::SampleHold {
                    WIRE_INVALID
                } else {
                    self.to_wire(self.hold_peak)
                }
            }
            40 => {
                if self.hold_function == HoldFunction::SampleHold {
                    WIRE_INVALID
                } else {
                    self.to_wire(self.hold_bottom)
                }
            }
            41 => {
                if self.is_main_unit {
                    self.read_pipeline_value(self.calc_value)
                } else {
                    WIRE_INVALID
                }
            }
            // Current is reported in 10 uA steps, voltage in mV.
            42 => {
                if !self.is_main_unit || self.analog_output_mode == AnalogOutputMode::Off {
                    0
                } else if self.analog_output_mode == AnalogOutputMode::Current4To20 {
                    (self.analog_value() * 100.0).trunc() as i64
                } else {
                    (self.analog_value() * 1000.0).trunc() as i64
                }
            }
            43 => self.effective_bank_index() as i64,
            44 => i64::from(self.timing_input),
            50 => i64::from(!self.laser_active()),
            51 => i64::from(self.abnormal_settings),
            52 => {
                i64::from(self.external_inputs[0])
                    + 2 * i64::from(self.external_inputs[1])
                    + 4 * i64::from(self.external_inputs[2])
                    + 8 * i64::from(self.external_inputs[3])
            }
            53 => self.eeprom_write_result.wire(),
            54 => self.zero_shifting_result.wire(),
            55 => self.reset_request_result.wire(),
            56 => {
                let mut word = self.transistor_mode.wire();
                if self.is_main_unit {
                    word += 2 * self.analog_output_mode.wire();
                }
                word
            }
            60 => self.tuning_result.wire(),
            61 => self.calibration_result.wire(),
            // Banked values, five numbers per bank.
            65..=84 => {
                let bank = usize::from((number - 65) / 5);
                match (number - 65) % 5 {
                    0 => self.to_wire(Some(self.banks[bank].threshold_high)),
                    1 => self.to_wire(Some(self.banks[bank].threshold_low)),
                    2 => self.to_wire(Some(self.banks[bank].shift_target)),
                    3 => self.to_wire(Some(self.banks[bank].analog_upper_limit)),
                    _ => self.to_wire(Some(self.banks[bank].analog_lower_limit)),
                }
            }
            97 => i64::from(self.key_locked),
            98 => self.active_bank_setting as i64,
            99 => i64::from(self.stored_timing_input),
            100 => i64::from(self.stored_laser_emission_stop),
            104 => self.subdisplay_screen.wire(),
            105 => {
                let mut word = self.future_transistor_mode.wire();
                if self.is_main_unit {
                    word += 2 * self.future_analog_output_mode.wire();
                }
                word
            }
            106 => self.to_wire(Some(self.tolerance_setting_range)),
            107 => i64::from(self.calibration_use_user_settings),
            108 => self.to_wire(Some(self.calibration_set_1)),
            109 => self.to_wire(Some(self.calibration_set_2)),
            110 => self.calc_calibration_mode.wire(),
            111 => self.to_wire(Some(self.calc_2p_set_1)),
            112 => self.to_wire(Some(self.calc_2p_set_2)),
            113 => self.to_wire(Some(self.calc_3p_set_1)),
            114 => self.to_wire(Some(self.calc_3p_set_3)),
            129 => self.calculation_mode.wire(),
            131 => i64::from(self.reversed_measurement_direction),
            132 => self.sampling_cycle.wire(),
            133 => self.filter_setting.wire(),
            134 => i64::from(self.output_mode_normally_closed),
            136 => self.hold_function.wire(),
            137 => self.to_wire(Some(self.auto_trigger_level)),
            138 => i64::from(self.timing_input_on_edge),
            139 => self.delay_timer.wire(),
            140 => self.timer_duration_ms,
            141 => self.to_wire(Some(self.hysteresis)),
            142 => self.analog_scaling_mode.wire(),
            143 => self.to_wire(Some(self.free_analog_upper_limit)),
            144 => self.to_wire(Some(self.free_analog_lower_limit)),
            145 => i64::from(self.external_input_use_user_settings),
            146..=149 => {
                let line = usize::from(number - 146);
                self.input_functions[line].wire(line)
            }
            150 => i64::from(self.switch_banks_via_external_input),
            152 => i64::from(self.zero_shift_saved_in_memory),
            153 => i64::from(self.mutual_interference_prevention_active),
            154 => self.display_digit_setting.wire(),
            155 => self.power_saving_mode.wire(),
            156 => self.head_display_mode.wire(),
            157 => self.display_color.wire(),
            158 => self.diff_count_timer_duration_ms,
            159 => self.high_pass_cutoff.wire(),
            161 => self.alarm_setting.wire(),
            162 => self.alarm_count,
            193 | 215 => {
                if self.is_main_unit {
                    PRODUCT_CODE_MAIN
                } else {
                    PRODUCT_CODE_EXPANSION
                }
            }
            194 => REVISION,
            195 => i64::from(self.profile.model.code()),
            216 => SERIES_VERSION,
            217 => DEVICE_TYPE,
            _ => unreachable!("read handler gap for {}", number),
        }
    }

    /// Value formatting shared by the P.V., R.V. and CALC registers:
    /// invalid while the laser is off or the stage is absent, clamped to
    /// the five-digit window otherwise.
    fn read_pipeline_value(&self, stage: Option<f64>) -> i64 {
        if !self.laser_active() {
            return WIRE_INVALID;
        }
        let Some(v) = stage else {
            return WIRE_INVALID;
        };
        if v > self.upper_bound {
            WIRE_MAX
        } else if v < self.lower_bound {
            WIRE_MIN
        } else {
            self.to_wire(Some(v))
        }
    }

    /// SW dispatch.
    pub(crate) fn dispatch_write(&mut self, number: u16, value: i64) -> WireResult<PostAction> {
        if number > AMP_REGISTER_MAX {
            return Err(WireError::NumberOutOfRange);
        }
        if !is_writable(number) {
            return Err(if is_readable(number) {
                WireError::WriteProtected
            } else {
                WireError::Inaccessible
            });
        }
        match number {
            1 => self.op_zero_shift(value)?,
            2 => self.op_zero_shift_reset(value)?,
            3 => self.op_reset(value)?,
            5 => self.op_initial_reset(value)?,
            6 => self.op_set_system_parameters(value)?,
            14 => self.op_tolerance_tuning(value)?,
            15 => self.op_two_point_high_1st(value)?,
            16 => self.op_two_point_high_2nd(value)?,
            17 => self.op_two_point_low_1st(value)?,
            18 => self.op_two_point_low_2nd(value)?,
            19 => self.op_calibration_set_1(value)?,
            20 => self.op_calibration_set_2(value)?,
            21 => self.op_calc_2p_set_1(value)?,
            22 => self.op_calc_2p_set_2(value)?,
            23 => self.op_calc_3p_set_1(value)?,
            24 => self.op_calc_3p_set_2(value)?,
            25 => self.op_calc_3p_set_3(value)?,
            26 => self.op_diff_count_1p(value)?,
            27 => self.op_diff_count_2p_1st(value)?,
            28 => self.op_diff_count_2p_2nd(value)?,
            65..=84 => self.write_bank_register(number, value)?,
            97 => {
                self.key_locked = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            98 => {
                check_range(value, 0, 3)?;
                // Ignored while bank switching is driven by the external
                // inputs.
                if !self.switch_banks_via_external_input {
                    self.change_bank(value as usize);
                }
            }
            99 => {
                self.stored_timing_input = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
                self.update_timing_input_status();
            }
            100 => {
                self.stored_laser_emission_stop = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            104 => {
                self.subdisplay_screen =
                    SubdisplayScreen::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            105 => self.write_system_parameter_settings(value)?,
            106 => {
                check_range(value, 0, WIRE_MAX)?;
                self.tolerance_setting_range = self.to_mm(value);
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            107 => {
                self.calibration_use_user_settings = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            108 => {
                check_range(value, WIRE_MIN, WIRE_MAX)?;
                self.calibration_set_1 = self.to_mm(value);
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            109 => {
                check_range(value, WIRE_MIN, WIRE_MAX)?;
                self.calibration_set_2 = self.to_mm(value);
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            110 => {
                if !self.is_main_unit {
                    return Err(WireError::WriteProtected);
                }
                self.calc_calibration_mode =
                    CalcCalibrationMode::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            111 => {
                self.write_main_only_mm(value)?;
                self.calc_2p_set_1 = self.to_mm(value);
            }
            112 => {
                self.write_main_only_mm(value)?;
                self.calc_2p_set_2 = self.to_mm(value);
            }
            113 => {
                self.write_main_only_mm(value)?;
                self.calc_3p_set_1 = self.to_mm(value);
            }
            114 => {
                self.write_main_only_mm(value)?;
                self.calc_3p_set_3 = self.to_mm(value);
            }
            129 => return self.write_calculation_function(value),
            131 => {
                self.reversed_measurement_direction = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            132 => {
                self.sampling_cycle =
                    SamplingCycle::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            133 => {
                self.filter_setting =
                    FilterSetting::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            134 => {
                self.output_mode_normally_closed = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            136 => {
                self.hold_function =
                    HoldFunction::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            137 => {
                check_range(value, WIRE_MIN, WIRE_MAX)?;
                self.auto_trigger_level = self.to_mm(value);
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            138 => {
                self.timing_input_on_edge = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            139 => {
                self.delay_timer = DelayTimer::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            140 => {
                check_range(value, 5, 9999)?;
                self.timer_duration_ms = value;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            141 => {
                check_range(value, 0, WIRE_MAX)?;
                self.hysteresis = self.to_mm(value);
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            142 => {
                if !self.is_main_unit {
                    return Err(WireError::WriteProtected);
                }
                self.analog_scaling_mode =
                    AnalogScalingMode::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            143 => {
                let v = self.write_free_range_limit(value)?;
                self.free_analog_upper_limit = v;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            144 => {
                let v = self.write_free_range_limit(value)?;
                self.free_analog_lower_limit = v;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            145 => {
                self.external_input_use_user_settings = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            146..=149 => {
                let line = usize::from(number - 146);
                self.input_functions[line] =
                    InputFunction::from_wire(line, value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            150 => {
                self.switch_banks_via_external_input = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            152 => {
                self.zero_shift_saved_in_memory = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            153 => {
                // The interference setting only exists on the main unit;
                // the device reports a bad ID rather than protection.
                if !self.is_main_unit {
                    return Err(WireError::IdOutOfRange);
                }
                self.mutual_interference_prevention_active = bool_from_wire(value)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            154 => {
                self.display_digit_setting =
                    DisplayDigits::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            155 => {
                self.power_saving_mode =
                    PowerSavingMode::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            156 => {
                self.head_display_mode =
                    HeadDisplayMode::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            157 => {
                self.display_color =
                    DisplayColor::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            158 => {
                check_range(value, 2, 9999)?;
                self.diff_count_timer_duration_ms = value;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            159 => {
                self.high_pass_cutoff =
                    HighPassCutoff::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            161 => {
                self.alarm_setting =
                    AlarmSetting::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            162 => {
                check_range(value, 0, 1000)?;
                self.alarm_count = value;
                self.arm_eeprom(EEPROM_WRITE_DELAY);
            }
            _ => unreachable!("write handler gap for {}", number),
        }
        Ok(PostAction::None)
    }

    fn write_bank_register(&mut self, number: u16, value: i64) -> WireResult<()> {
        let bank = usize::from((number - 65) / 5);
        let field = (number - 65) % 5;
        // The analog limits only exist on the main unit.
        if field >= 3 && !self.is_main_unit {
            return Err(WireError::WriteProtected);
        }
        check_range(value, WIRE_MIN, WIRE_MAX)?;
        let mm = self.to_mm(value);
        match field {
            0 => self.change_high_threshold(mm, Some(bank)),
            1 => self.change_low_threshold(mm, Some(bank)),
            2 => self.change_shift_target(mm, Some(bank)),
            3 => self.change_analog_upper_limit(mm, Some(bank)),
            _ => self.change_analog_lower_limit(mm, Some(bank)),
        }
        Ok(())
    }

    fn write_system_parameter_settings(&mut self, value: i64) -> WireResult<()> {
        let bit_0 = value & 0b0001;
        let bits_123 = (value & 0b1110) >> 1;
        let rest = value >> 4;
        if rest != 0 || value < 0 {
            return Err(WireError::ValueOutOfRange);
        }
        let analog =
            AnalogOutputMode::from_wire(bits_123).ok_or(WireError::ValueOutOfRange)?;
        if !self.is_main_unit && analog != AnalogOutputMode::Off {
            return Err(WireError::ValueOutOfRange);
        }
        // Staged only; data number 006 makes them active.
        self.future_transistor_mode =
            TransistorMode::from_wire(bit_0).ok_or(WireError::ValueOutOfRange)?;
        self.future_analog_output_mode = analog;
        Ok(())
    }

    fn write_main_only_mm(&self, value: i64) -> WireResult<()> {
        if !self.is_main_unit {
            return Err(WireError::WriteProtected);
        }
        check_range(value, WIRE_MIN, WIRE_MAX)
    }

    /// Registers 143/144 are only writable in free-range scaling; bank
    /// scaling reports a state error, the initial scaling is protected.
    fn write_free_range_limit(&self, value: i64) -> WireResult<f64> {
        if !self.is_main_unit {
            return Err(WireError::WriteProtected);
        }
        check_range(value, WIRE_MIN, WIRE_MAX)?;
        match self.analog_scaling_mode {
            AnalogScalingMode::Bank => Err(WireError::NotExecutable),
            AnalogScalingMode::Initial => Err(WireError::WriteProtected),
            AnalogScalingMode::FreeRange => Ok(self.to_mm(value)),
        }
    }

    fn write_calculation_function(&mut self, value: i64) -> WireResult<PostAction> {
        if !self.is_main_unit || !self.has_partner {
            return Err(WireError::WriteProtected);
        }
        let mode = CalculationMode::from_wire(value).ok_or(WireError::ValueOutOfRange)?;
        self.calculation_mode = mode;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
        if mode != CalculationMode::Off {
            // Both units must sample identically for CALC to be sound.
            return Ok(PostAction::PropagateSampling {
                filter: self.filter_setting,
                cycle: self.sampling_cycle,
            });
        }
        Ok(PostAction::None)
    }
}
