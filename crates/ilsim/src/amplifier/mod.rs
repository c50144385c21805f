// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One sensor-amplifier unit: register file, measurement pipeline, hold
//! state machine and the two background workers (EEPROM deadline
//! observer, external-input observer).
//!
//! All mutable state lives behind a single `parking_lot::Mutex`. The
//! main unit never locks its partner while holding its own lock: an
//! expansion-unit R.V. change is pushed to the main unit after the
//! expansion's lock is released, and the main unit computes CALC from a
//! cached copy of the partner R.V.

pub mod settings;

mod ops;
mod pipeline;
mod registers;

use crate::bank::Bank;
use crate::codec::FixedPoint;
use crate::errors::{AmpError, WireResult};
use crate::head::{HeadModel, HeadProfile};
use parking_lot::{Mutex, MutexGuard};
use settings::{
    AlarmSetting, AnalogOutputMode, AnalogScalingMode, CalcCalibrationMode, CalculationMode,
    DelayTimer, DisplayColor, DisplayDigits, FilterSetting, HeadDisplayMode, HighPassCutoff,
    HoldFunction, InputFunction, LedColor, OperationResult, OutputState, PowerSavingMode,
    SamplingCycle, SubdisplayScreen, TransistorMode,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Largest addressable data number on an amplifier.
pub const AMP_REGISTER_MAX: u16 = 223;

/// Product / series code reported by registers 193 and 215.
pub const PRODUCT_CODE_MAIN: i64 = 4022;
pub const PRODUCT_CODE_EXPANSION: i64 = 4023;
/// Product name reported by register 200.
pub const PRODUCT_NAME_MAIN: &str = "IL-1000/1500";
pub const PRODUCT_NAME_EXPANSION: &str = "IL-1050/1550";
/// Firmware revision word, register 194.
pub const REVISION: i64 = 0x0101;
/// Series version and device type, registers 216 and 217.
pub const SERIES_VERSION: i64 = 1;
pub const DEVICE_TYPE: i64 = 0;

/// Cadence of both background workers.
const WORKER_TICK: Duration = Duration::from_millis(10);
/// A settings mutation schedules its EEPROM write this far in the future.
const EEPROM_WRITE_DELAY: Duration = Duration::from_secs(2);
/// Delay after an initial reset.
const INITIAL_RESET_WRITE_DELAY: Duration = Duration::from_secs(3);

/// Value produced by a register read: almost always an integer, a string
/// for the product-name register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    Int(i64),
    Text(&'static str),
}

/// Work a register write leaves for after the state lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PostAction {
    None,
    /// Register 129 mirrors filter and sampling cycle onto the partner.
    PropagateSampling {
        filter: FilterSetting,
        cycle: SamplingCycle,
    },
}

/// One staged point of the calc three-point calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CalcStagePoint {
    pub calc: f64,
    pub rv_main: f64,
    pub rv_expansion: f64,
}

/// Full mutable state of one amplifier.
pub(crate) struct AmpState {
    pub(crate) profile: HeadProfile,
    pub(crate) fixed: FixedPoint,
    pub(crate) lower_bound: f64,
    pub(crate) upper_bound: f64,
    pub(crate) is_main_unit: bool,
    pub(crate) has_partner: bool,
    /// Cached partner R.V., refreshed by the expansion unit's pushes.
    pub(crate) partner_rv: Option<f64>,

    // Measurement pipeline.
    pub(crate) raw_value: Option<f64>,
    pub(crate) r_v_value: Option<f64>,
    pub(crate) calc_value: Option<f64>,
    pub(crate) p_v_value: Option<f64>,
    pub(crate) hold_peak: Option<f64>,
    pub(crate) hold_bottom: Option<f64>,
    pub(crate) hold_value: Option<f64>,
    pub(crate) currently_sampling: bool,
    pub(crate) error_during_sampling: bool,
    pub(crate) timing_input: bool,

    // Simulation shaping.
    pub(crate) randomized: bool,
    pub(crate) uncertainty: f64,
    pub(crate) randomized_lower_limit: f64,
    pub(crate) randomized_upper_limit: f64,

    // Banks and analog scaling.
    pub(crate) banks: [Bank; 4],
    pub(crate) active_bank_setting: usize,
    pub(crate) legacy_bank_selection: bool,
    pub(crate) free_analog_upper_limit: f64,
    pub(crate) free_analog_lower_limit: f64,
    pub(crate) analog_scaling_mode: AnalogScalingMode,

    // Calibration.
    pub(crate) calibration_use_user_settings: bool,
    pub(crate) calibration_tilt: f64,
    pub(crate) calibration_offset: f64,
    pub(crate) calculation_tilt: f64,
    pub(crate) calculation_offset: f64,
    pub(crate) calibration_set_1: f64,
    pub(crate) calibration_set_2: f64,
    pub(crate) calc_2p_set_1: f64,
    pub(crate) calc_2p_set_2: f64,
    pub(crate) calc_3p_set_1: f64,
    pub(crate) calc_3p_set_3: f64,
    pub(crate) calc_calibration_mode: CalcCalibrationMode,

    // Tuning and calibration staging.
    pub(crate) two_point_high_1st: Option<f64>,
    pub(crate) two_point_low_1st: Option<f64>,
    pub(crate) diff_count_1st: Option<f64>,
    pub(crate) calibration_set_1_before: Option<f64>,
    pub(crate) calc_2p_set_1_before: Option<f64>,
    pub(crate) calc_3p_stage_1: Option<CalcStagePoint>,
    pub(crate) calc_3p_stage_2: Option<CalcStagePoint>,

    // Settings.
    pub(crate) transistor_mode: TransistorMode,
    pub(crate) analog_output_mode: AnalogOutputMode,
    pub(crate) future_transistor_mode: TransistorMode,
    pub(crate) future_analog_output_mode: AnalogOutputMode,
    pub(crate) calculation_mode: CalculationMode,
    pub(crate) filter_setting: FilterSetting,
    pub(crate) sampling_cycle: SamplingCycle,
    pub(crate) hold_function: HoldFunction,
    pub(crate) delay_timer: DelayTimer,
    pub(crate) timer_duration_ms: i64,
    pub(crate) diff_count_timer_duration_ms: i64,
    pub(crate) hysteresis: f64,
    pub(crate) subdisplay_screen: SubdisplayScreen,
    pub(crate) display_digit_setting: DisplayDigits,
    pub(crate) display_color: DisplayColor,
    pub(crate) power_saving_mode: PowerSavingMode,
    pub(crate) head_display_mode: HeadDisplayMode,
    pub(crate) high_pass_cutoff: HighPassCutoff,
    pub(crate) alarm_setting: AlarmSetting,
    pub(crate) alarm_count: i64,
    pub(crate) external_inputs: [bool; 4],
    pub(crate) input_functions: [InputFunction; 4],
    pub(crate) external_input_use_user_settings: bool,
    pub(crate) mutual_interference_prevention_active: bool,
    pub(crate) reversed_measurement_direction: bool,
    pub(crate) key_locked: bool,
    pub(crate) stored_laser_emission_stop: bool,
    pub(crate) stored_timing_input: bool,
    pub(crate) timing_input_on_edge: bool,
    pub(crate) output_mode_normally_closed: bool,
    pub(crate) zero_shift_saved_in_memory: bool,
    pub(crate) switch_banks_via_external_input: bool,
    pub(crate) tolerance_setting_range: f64,
    pub(crate) auto_trigger_level: f64,
    pub(crate) abnormal_settings: bool,

    // Result flags.
    pub(crate) eeprom_write_result: OperationResult,
    pub(crate) tuning_result: OperationResult,
    pub(crate) zero_shifting_result: OperationResult,
    pub(crate) reset_request_result: OperationResult,
    pub(crate) calibration_result: OperationResult,

    pub(crate) internal_error: AmpError,

    /// Deadline of the pending EEPROM write, if any.
    pub(crate) next_eeprom_write: Option<Instant>,
}

impl AmpState {
    pub(crate) fn new(profile: HeadProfile) -> AmpState {
        let fixed = FixedPoint::new(profile.decimal_position);
        let mut st = AmpState {
            profile,
            fixed,
            lower_bound: fixed.lower_bound(),
            upper_bound: fixed.upper_bound(),
            is_main_unit: true,
            has_partner: false,
            partner_rv: None,
            raw_value: None,
            r_v_value: None,
            calc_value: None,
            p_v_value: None,
            hold_peak: None,
            hold_bottom: None,
            hold_value: None,
            currently_sampling: true,
            error_during_sampling: false,
            timing_input: false,
            randomized: false,
            uncertainty: profile.uncertainty,
            randomized_lower_limit: profile.reference_distance - profile.measurement_range_max,
            randomized_upper_limit: profile.reference_distance - profile.measurement_range_min,
            banks: [Bank::from_profile(&profile); 4],
            active_bank_setting: 0,
            legacy_bank_selection: false,
            free_analog_upper_limit: profile.default_bank_analog_upper_limit,
            free_analog_lower_limit: profile.default_bank_analog_lower_limit,
            analog_scaling_mode: AnalogScalingMode::Initial,
            calibration_use_user_settings: false,
            calibration_tilt: 1.0,
            calibration_offset: 0.0,
            calculation_tilt: 1.0,
            calculation_offset: 0.0,
            calibration_set_1: fixed.to_mm(0),
            calibration_set_2: fixed.to_mm(5000),
            calc_2p_set_1: fixed.to_mm(5000),
            calc_2p_set_2: fixed.to_mm(10000),
            calc_3p_set_1: fixed.to_mm(5000),
            calc_3p_set_3: fixed.to_mm(10000),
            calc_calibration_mode: CalcCalibrationMode::Initial,
            two_point_high_1st: None,
            two_point_low_1st: None,
            diff_count_1st: None,
            calibration_set_1_before: None,
            calc_2p_set_1_before: None,
            calc_3p_stage_1: None,
            calc_3p_stage_2: None,
            transistor_mode: TransistorMode::Npn,
            analog_output_mode: AnalogOutputMode::Off,
            future_transistor_mode: TransistorMode::Npn,
            future_analog_output_mode: AnalogOutputMode::Off,
            calculation_mode: CalculationMode::Off,
            filter_setting: FilterSetting::default(),
            sampling_cycle: SamplingCycle::Default,
            hold_function: HoldFunction::SampleHold,
            delay_timer: DelayTimer::Off,
            timer_duration_ms: 60,
            diff_count_timer_duration_ms: 10,
            hysteresis: 0.0,
            subdisplay_screen: SubdisplayScreen::RawValue,
            display_digit_setting: DisplayDigits::Default,
            display_color: DisplayColor::GoGreen,
            power_saving_mode: PowerSavingMode::Off,
            head_display_mode: HeadDisplayMode::Default,
            high_pass_cutoff: HighPassCutoff::default(),
            alarm_setting: AlarmSetting::Initial,
            alarm_count: 7,
            external_inputs: [false; 4],
            input_functions: [
                InputFunction::line_default(0),
                InputFunction::line_default(1),
                InputFunction::line_default(2),
                InputFunction::line_default(3),
            ],
            external_input_use_user_settings: false,
            mutual_interference_prevention_active: false,
            reversed_measurement_direction: false,
            key_locked: false,
            stored_laser_emission_stop: false,
            stored_timing_input: false,
            timing_input_on_edge: false,
            output_mode_normally_closed: false,
            zero_shift_saved_in_memory: false,
            switch_banks_via_external_input: false,
            tolerance_setting_range: profile.default_tolerance_setting_range,
            auto_trigger_level: profile.default_auto_trigger_level,
            abnormal_settings: false,
            eeprom_write_result: OperationResult::Normal,
            tuning_result: OperationResult::Normal,
            zero_shifting_result: OperationResult::Normal,
            reset_request_result: OperationResult::Normal,
            calibration_result: OperationResult::Normal,
            internal_error: AmpError::NONE,
            next_eeprom_write: None,
        };
        st.restore_default_settings();
        st.future_transistor_mode = TransistorMode::Npn;
        st.future_analog_output_mode = AnalogOutputMode::Off;
        st.set_system_parameters();
        st.set_raw(profile.initial_value);
        st
    }

    /// Initial-reset semantics: everything back to the head defaults
    /// except the sensor calibration and the active system parameters.
    pub(crate) fn restore_default_settings(&mut self) {
        self.hold_value = None;
        self.hold_bottom = None;
        self.hold_peak = None;

        self.banks = [Bank::from_profile(&self.profile); 4];
        self.active_bank_setting = 0;

        self.free_analog_upper_limit = self.profile.default_bank_analog_upper_limit;
        self.free_analog_lower_limit = self.profile.default_bank_analog_lower_limit;

        self.tolerance_setting_range = self.profile.default_tolerance_setting_range;
        self.auto_trigger_level = self.profile.default_auto_trigger_level;

        self.two_point_high_1st = None;
        self.two_point_low_1st = None;
        self.diff_count_1st = None;
        self.calibration_set_1_before = None;
        self.calc_2p_set_1_before = None;
        self.calc_3p_stage_1 = None;
        self.calc_3p_stage_2 = None;

        self.alarm_count = 7;
        self.alarm_setting = AlarmSetting::Initial;
        self.analog_scaling_mode = AnalogScalingMode::Initial;
        self.calc_2p_set_1 = self.fixed.to_mm(5000);
        self.calc_2p_set_2 = self.fixed.to_mm(10000);
        self.calc_3p_set_1 = self.fixed.to_mm(5000);
        self.calc_3p_set_3 = self.fixed.to_mm(10000);
        self.calc_calibration_mode = CalcCalibrationMode::Initial;
        self.calculation_mode = CalculationMode::Off;
        self.delay_timer = DelayTimer::Off;
        self.diff_count_timer_duration_ms = 10;
        self.display_color = DisplayColor::GoGreen;
        self.display_digit_setting = DisplayDigits::Default;
        self.external_inputs = [false; 4];
        self.input_functions = [
            InputFunction::line_default(0),
            InputFunction::line_default(1),
            InputFunction::line_default(2),
            InputFunction::line_default(3),
        ];
        self.external_input_use_user_settings = false;
        self.filter_setting = FilterSetting::default();
        self.head_display_mode = HeadDisplayMode::Default;
        self.high_pass_cutoff = HighPassCutoff::default();
        self.hold_function = HoldFunction::SampleHold;
        self.hysteresis = 0.0;
        self.key_locked = false;
        self.stored_laser_emission_stop = false;
        self.mutual_interference_prevention_active = false;
        self.output_mode_normally_closed = false;
        self.power_saving_mode = PowerSavingMode::Off;
        self.reversed_measurement_direction = false;
        self.sampling_cycle = SamplingCycle::Default;
        self.stored_timing_input = false;
        self.subdisplay_screen = SubdisplayScreen::RawValue;
        self.switch_banks_via_external_input = false;
        self.timer_duration_ms = 60;
        self.timing_input_on_edge = false;
        self.zero_shift_saved_in_memory = false;
        self.update_timing_input_status();
        self.arm_eeprom(INITIAL_RESET_WRITE_DELAY);
    }

    /// Copy the staged system parameters into the active ones.
    pub(crate) fn set_system_parameters(&mut self) {
        self.analog_output_mode = self.future_analog_output_mode;
        self.transistor_mode = self.future_transistor_mode;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
    }

    /// Reset request: drops the zero shift unless it is memorised.
    pub(crate) fn reset(&mut self) {
        if !self.zero_shift_saved_in_memory {
            self.change_shift_target(0.0, None);
            for bank in &mut self.banks {
                bank.shift_target = 0.0;
            }
        }
    }

    /// Schedule an EEPROM write `delay` from now. The deadline only ever
    /// moves forward.
    pub(crate) fn arm_eeprom(&mut self, delay: Duration) {
        self.eeprom_write_result = OperationResult::Operating;
        let next = Instant::now() + delay;
        match self.next_eeprom_write {
            Some(current) if current >= next => {}
            _ => self.next_eeprom_write = Some(next),
        }
    }

    /// Deadline check run by the EEPROM worker; pure so the transition is
    /// testable with synthetic instants.
    pub(crate) fn service_eeprom(&mut self, now: Instant) {
        if let Some(deadline) = self.next_eeprom_write {
            if now >= deadline {
                self.eeprom_write_result = if self.internal_error.contains(AmpError::EEPROM) {
                    OperationResult::Abnormal
                } else {
                    OperationResult::Normal
                };
                self.next_eeprom_write = None;
            }
        }
    }

    // --- bank accessors ----------------------------------------------

    /// Bank index the judgment outputs operate on.
    ///
    /// With `legacy_bank_selection` the stored setting is returned
    /// unconditionally (the historical firmware behavior); otherwise the
    /// externally-derived index applies while bank switching is set to
    /// "external input".
    pub(crate) fn effective_bank_index(&self) -> usize {
        if self.legacy_bank_selection {
            return self.active_bank_setting;
        }
        if self.switch_banks_via_external_input {
            self.external_bank_index()
        } else {
            self.active_bank_setting
        }
    }

    fn external_bank_index(&self) -> usize {
        if !self.external_input_use_user_settings {
            return 0;
        }
        let line_high = |f: InputFunction| {
            self.input_functions
                .iter()
                .zip(self.external_inputs.iter())
                .any(|(func, on)| *func == f && *on)
        };
        let bank_a = line_high(InputFunction::BankA);
        let bank_b = line_high(InputFunction::BankB);
        2 * usize::from(bank_b) + usize::from(bank_a)
    }

    pub(crate) fn active_bank(&self) -> &Bank {
        &self.banks[self.effective_bank_index()]
    }

    pub(crate) fn threshold_high(&self) -> f64 {
        self.active_bank().threshold_high
    }

    pub(crate) fn threshold_low(&self) -> f64 {
        self.active_bank().threshold_low
    }

    pub(crate) fn shift_target(&self) -> f64 {
        self.active_bank().shift_target
    }

    /// Scaling limits resolve against the scaling mode, not always the
    /// active bank.
    pub(crate) fn analog_upper_limit(&self) -> f64 {
        match self.analog_scaling_mode {
            AnalogScalingMode::Bank => self.active_bank().analog_upper_limit,
            AnalogScalingMode::FreeRange => self.free_analog_upper_limit,
            AnalogScalingMode::Initial => self.profile.default_analog_upper_limit,
        }
    }

    pub(crate) fn analog_lower_limit(&self) -> f64 {
        match self.analog_scaling_mode {
            AnalogScalingMode::Bank => self.active_bank().analog_lower_limit,
            AnalogScalingMode::FreeRange => self.free_analog_lower_limit,
            AnalogScalingMode::Initial => self.profile.default_analog_lower_limit,
        }
    }

    /// Bank mutators arm the EEPROM scheduler; `index` of `None` targets
    /// the effective bank.
    pub(crate) fn change_high_threshold(&mut self, value: f64, index: Option<usize>) {
        let i = index.unwrap_or_else(|| self.effective_bank_index());
        self.banks[i].threshold_high = value;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
    }

    pub(crate) fn change_low_threshold(&mut self, value: f64, index: Option<usize>) {
        let i = index.unwrap_or_else(|| self.effective_bank_index());
        self.banks[i].threshold_low = value;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
    }

    /// Zero-shift writes persist immediately, and only when the memory
    /// function is on.
    pub(crate) fn change_shift_target(&mut self, value: f64, index: Option<usize>) {
        let i = index.unwrap_or_else(|| self.effective_bank_index());
        self.banks[i].shift_target = value;
        if self.zero_shift_saved_in_memory {
            self.arm_eeprom(Duration::ZERO);
        }
    }

    pub(crate) fn change_analog_upper_limit(&mut self, value: f64, index: Option<usize>) {
        let i = index.unwrap_or_else(|| self.effective_bank_index());
        self.banks[i].analog_upper_limit = value;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
    }

    pub(crate) fn change_analog_lower_limit(&mut self, value: f64, index: Option<usize>) {
        let i = index.unwrap_or_else(|| self.effective_bank_index());
        self.banks[i].analog_lower_limit = value;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
    }

    pub(crate) fn change_bank(&mut self, index: usize) {
        self.active_bank_setting = index;
        self.arm_eeprom(EEPROM_WRITE_DELAY);
    }

    // --- conversions -------------------------------------------------

    pub(crate) fn to_wire(&self, value: Option<f64>) -> i64 {
        self.fixed.to_wire(value)
    }

    pub(crate) fn to_mm(&self, value: i64) -> f64 {
        self.fixed.to_mm(value)
    }
}

struct AmpInner {
    state: Mutex<AmpState>,
    partner: Mutex<Option<Weak<AmpInner>>>,
    stop: AtomicBool,
}

/// Handle to one amplifier. Cloning shares the underlying unit.
#[derive(Clone)]
pub struct Amplifier {
    inner: Arc<AmpInner>,
}

impl std::fmt::Debug for Amplifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Amplifier").finish()
    }
}

impl Amplifier {
    /// Build an amplifier from a head constant table and start its
    /// background workers. The workers exit on `stop_workers` or when
    /// the last handle is dropped.
    pub fn new(profile: HeadProfile) -> Amplifier {
        let inner = Arc::new(AmpInner {
            state: Mutex::new(AmpState::new(profile)),
            partner: Mutex::new(None),
            stop: AtomicBool::new(false),
        });
        spawn_workers(&inner);
        Amplifier { inner }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, AmpState> {
        self.inner.state.lock()
    }

    /// Run `f` under the state lock; if the R.V. of an expansion unit
    /// changed, push the new value to the main unit afterwards.
    fn with_state<R>(&self, f: impl FnOnce(&mut AmpState) -> R) -> R {
        let (result, push) = {
            let mut st = self.inner.state.lock();
            let rv_before = st.r_v_value;
            let result = f(&mut st);
            let push = if st.r_v_value != rv_before && !st.is_main_unit && st.has_partner {
                Some(st.r_v_value)
            } else {
                None
            };
            (result, push)
        };
        if let Some(rv) = push {
            self.push_rv_to_partner(rv);
        }
        result
    }

    fn push_rv_to_partner(&self, rv: Option<f64>) {
        let partner = self.inner.partner.lock().clone();
        if let Some(p) = partner.and_then(|w| w.upgrade()) {
            let mut st = p.state.lock();
            if st.is_main_unit {
                st.on_partner_rv(rv);
            }
        }
    }

    // --- protocol entry points ---------------------------------------

    /// SR dispatch for this amplifier.
    pub fn handle_read(&self, number: u16) -> WireResult<ReadValue> {
        self.lock_state().dispatch_read(number)
    }

    /// SW dispatch for this amplifier.
    pub fn handle_write(&self, number: u16, value: i64) -> WireResult<()> {
        let post = self.with_state(|st| st.dispatch_write(number, value))?;
        if let PostAction::PropagateSampling { filter, cycle } = post {
            let partner = self.inner.partner.lock().clone();
            if let Some(p) = partner.and_then(|w| w.upgrade()) {
                let mut st = p.state.lock();
                st.filter_setting = filter;
                st.sampling_cycle = cycle;
            }
        }
        Ok(())
    }

    // --- simulation surface ------------------------------------------

    /// Feed a raw distance into the pipeline (`None` models a lost
    /// signal).
    pub fn set_raw_value(&self, value: Option<f64>) {
        self.with_state(|st| st.set_raw(value));
    }

    /// Draw a fresh raw value uniformly across the measuring range.
    pub fn randomize_value(&self) {
        self.with_state(|st| st.randomize_value());
    }

    /// Add measurement noise (and re-randomize first if the unit is in
    /// randomized mode).
    pub fn apply_uncertainty(&self) {
        self.with_state(|st| st.apply_uncertainty());
    }

    /// Fault injection: overwrite the internal error word.
    pub fn set_error(&self, error: AmpError) {
        log::debug!("amplifier fault injection: {}", error);
        self.with_state(|st| st.internal_error = error);
    }

    /// Clear every injected fault.
    pub fn clear_error(&self) {
        self.with_state(|st| st.internal_error = AmpError::NONE);
    }

    /// Drive one external input line (0-based).
    pub fn set_external_input(&self, line: usize, on: bool) {
        self.with_state(|st| {
            st.external_inputs[line] = on;
            st.update_timing_input_status();
        });
    }

    // --- read-only queries used by the bus and the display surface ---

    pub fn is_main_unit(&self) -> bool {
        self.lock_state().is_main_unit
    }

    pub fn decimal_position(&self) -> u8 {
        self.lock_state().fixed.decimal_position()
    }

    pub fn head_model(&self) -> HeadModel {
        self.lock_state().profile.model
    }

    pub fn has_error(&self) -> bool {
        !self.lock_state().internal_error.is_empty()
    }

    pub fn error_bits(&self) -> u16 {
        self.lock_state().internal_error.bits()
    }

    pub fn first_error_code(&self) -> u16 {
        self.lock_state().internal_error.first_code()
    }

    pub fn high_output(&self) -> bool {
        self.lock_state().high_output()
    }

    pub fn low_output(&self) -> bool {
        self.lock_state().low_output()
    }

    pub fn go_output(&self) -> bool {
        self.lock_state().go_output()
    }

    pub fn alarm_output(&self) -> bool {
        self.lock_state().alarm_output()
    }

    pub fn value_invalid(&self) -> bool {
        self.lock_state().value_invalid()
    }

    pub fn value_under_range(&self) -> bool {
        self.lock_state().value_under_range()
    }

    pub fn value_over_range(&self) -> bool {
        self.lock_state().value_over_range()
    }

    pub fn is_out_of_range(&self) -> bool {
        self.lock_state().is_out_of_range()
    }

    /// Judgment value in the bus encoding (error/invalid/range sentinels
    /// applied).
    pub fn judgment_wire_value(&self) -> i64 {
        self.lock_state().judgment_wire_value()
    }

    /// Output state field of the MS command.
    pub fn output_state(&self) -> OutputState {
        self.lock_state().output_state()
    }

    /// Effective sampling rate in milliseconds.
    pub fn sampling_rate_ms(&self) -> f64 {
        let st = self.lock_state();
        st.sampling_cycle.rate_ms(st.profile.default_sampling_cycle_ms)
    }

    /// Effective display digit count.
    pub fn display_digits(&self) -> u8 {
        let st = self.lock_state();
        st.display_digit_setting.digits(st.profile.default_display_digit)
    }

    pub fn reference_distance_led(&self) -> LedColor {
        self.lock_state().reference_distance_led()
    }

    pub fn analog_range_led(&self) -> LedColor {
        self.lock_state().analog_range_led()
    }

    pub fn laser_emission_led(&self) -> LedColor {
        if self.lock_state().laser_active() {
            LedColor::Green
        } else {
            LedColor::Blinking
        }
    }

    pub fn alarm_led(&self) -> bool {
        !self.lock_state().internal_error.is_empty()
    }

    // --- wiring ------------------------------------------------------

    pub(crate) fn set_main(&self, is_main: bool) {
        self.with_state(|st| st.is_main_unit = is_main);
    }

    pub(crate) fn unpair(&self) {
        *self.inner.partner.lock() = None;
        self.with_state(|st| {
            st.has_partner = false;
            st.partner_rv = None;
        });
    }

    /// Pair the first two units on a bus: `main` computes CALC from its
    /// own R.V. and `expansion`'s, which it receives by push.
    pub(crate) fn pair(main: &Amplifier, expansion: &Amplifier) {
        *main.inner.partner.lock() = Some(Arc::downgrade(&expansion.inner));
        *expansion.inner.partner.lock() = Some(Arc::downgrade(&main.inner));
        let expansion_rv = {
            let mut st = expansion.lock_state();
            st.is_main_unit = false;
            st.has_partner = true;
            st.r_v_value
        };
        let mut st = main.lock_state();
        st.is_main_unit = true;
        st.has_partner = true;
        st.on_partner_rv(expansion_rv);
    }

    /// Signal both background workers to drain.
    pub fn stop_workers(&self) {
        self.inner.stop.store(true, Ordering::Relaxed);
    }
}

fn spawn_workers(inner: &Arc<AmpInner>) {
    let weak = Arc::downgrade(inner);
    thread::Builder::new()
        .name("ilsim-eeprom".into())
        .spawn(move || loop {
            let Some(inner) = weak.upgrade() else { break };
            if inner.stop.load(Ordering::Relaxed) {
                break;
            }
            inner.state.lock().service_eeprom(Instant::now());
            drop(inner);
            thread::sleep(WORKER_TICK);
        })
        .expect("spawn eeprom worker");

    let weak = Arc::downgrade(inner);
    thread::Builder::new()
        .name("ilsim-inputs".into())
        .spawn(move || loop {
            let Some(inner) = weak.upgrade() else { break };
            if inner.stop.load(Ordering::Relaxed) {
                break;
            }
            inner.state.lock().update_timing_input_status();
            drop(inner);
            thread::sleep(WORKER_TICK);
        })
        .expect("spawn input worker");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn il030() -> Amplifier {
        Amplifier::new(HeadProfile::for_model(HeadModel::Il030))
    }

    #[test]
    fn test_fresh_amplifier_pipeline() {
        let amp = il030();
        let st = amp.lock_state();
        assert_eq!(st.raw_value, Some(0.0));
        assert_eq!(st.r_v_value, Some(0.0));
        assert_eq!(st.calc_value, Some(0.0));
        assert_eq!(st.p_v_value, Some(0.0));
        assert!(st.is_main_unit);
        assert!(!st.has_partner);
    }

    #[test]
    fn test_construction_arms_eeprom() {
        let amp = il030();
        // restore_default_settings during construction scheduled a write.
        let st = amp.lock_state();
        assert_eq!(st.eeprom_write_result, OperationResult::Operating);
        assert!(st.next_eeprom_write.is_some());
    }

    #[test]
    fn test_eeprom_deadline_transition() {
        let amp = il030();
        let mut st = amp.lock_state();
        st.arm_eeprom(Duration::from_secs(2));
        let deadline = st.next_eeprom_write.unwrap();
        st.service_eeprom(deadline - Duration::from_millis(1));
        assert_eq!(st.eeprom_write_result, OperationResult::Operating);
        st.service_eeprom(deadline);
        assert_eq!(st.eeprom_write_result, OperationResult::Normal);
        assert!(st.next_eeprom_write.is_none());
    }

    #[test]
    fn test_eeprom_deadline_only_moves_forward() {
        let amp = il030();
        let mut st = amp.lock_state();
        st.arm_eeprom(Duration::from_secs(5));
        let far = st.next_eeprom_write.unwrap();
        st.arm_eeprom(Duration::from_secs(1));
        assert_eq!(st.next_eeprom_write, Some(far));
    }

    #[test]
    fn test_eeprom_abnormal_on_injected_fault() {
        let amp = il030();
        amp.set_error(AmpError::EEPROM);
        let mut st = amp.lock_state();
        st.arm_eeprom(Duration::ZERO);
        let deadline = st.next_eeprom_write.unwrap();
        st.service_eeprom(deadline);
        assert_eq!(st.eeprom_write_result, OperationResult::Abnormal);
    }

    #[test]
    fn test_expansion_push_updates_main_calc() {
        let main = il030();
        let expansion = il030();
        Amplifier::pair(&main, &expansion);
        main.handle_write(129, 1).unwrap(); // addition
        main.set_raw_value(Some(1.0));
        expansion.set_raw_value(Some(2.0));
        let st = main.lock_state();
        assert_eq!(st.partner_rv, Some(2.0));
        assert_eq!(st.calc_value, Some(3.0));
    }

    #[test]
    fn test_pairing_roles() {
        let a = il030();
        let b = il030();
        Amplifier::pair(&a, &b);
        assert!(a.is_main_unit());
        assert!(!b.is_main_unit());
    }

    #[test]
    fn test_effective_bank_follows_external_inputs() {
        let amp = il030();
        amp.handle_write(150, 1).unwrap(); // external switching
        amp.handle_write(145, 1).unwrap(); // user input settings
        amp.handle_write(146, 1).unwrap(); // line 1 = Bank A
        amp.handle_write(147, 2).unwrap(); // line 2 = Bank B
        assert_eq!(amp.lock_state().effective_bank_index(), 0);
        amp.set_external_input(0, true);
        assert_eq!(amp.lock_state().effective_bank_index(), 1);
        amp.set_external_input(1, true);
        assert_eq!(amp.lock_state().effective_bank_index(), 3);
        amp.set_external_input(0, false);
        assert_eq!(amp.lock_state().effective_bank_index(), 2);
    }

    #[test]
    fn test_legacy_bank_selection_sticks_to_setting() {
        let amp = il030();
        amp.lock_state().legacy_bank_selection = true;
        amp.handle_write(150, 1).unwrap();
        amp.handle_write(145, 1).unwrap();
        amp.handle_write(146, 1).unwrap();
        amp.set_external_input(0, true);
        assert_eq!(amp.lock_state().effective_bank_index(), 0);
    }

    #[test]
    fn test_restore_default_settings_resets_listed_state() {
        let amp = il030();
        amp.handle_write(136, 2).unwrap();
        amp.handle_write(141, 250).unwrap();
        amp.handle_write(97, 1).unwrap();
        {
            let mut st = amp.lock_state();
            st.restore_default_settings();
            assert_eq!(st.hold_function, HoldFunction::SampleHold);
            assert_eq!(st.hysteresis, 0.0);
            assert!(!st.key_locked);
            assert_eq!(st.alarm_count, 7);
            assert_eq!(st.active_bank_setting, 0);
        }
    }
}
