// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enumerated amplifier settings and their wire encodings.
//!
//! Each enum decodes with `from_wire` (returning `None` for values the
//! register write must reject) and encodes with `wire`.

/// Output state field of the MS command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    AllOff,
    High,
    Low,
    Error,
    Go,
}

impl OutputState {
    pub fn wire(self) -> i64 {
        match self {
            OutputState::AllOff => 0,
            OutputState::High => 1,
            OutputState::Low => 2,
            OutputState::Error => 3,
            OutputState::Go => 4,
        }
    }
}

/// Three-stage result of an asynchronous operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationResult {
    Operating,
    #[default]
    Normal,
    Abnormal,
}

impl OperationResult {
    pub fn wire(self) -> i64 {
        match self {
            OperationResult::Operating => 0,
            OperationResult::Normal => 1,
            OperationResult::Abnormal => 2,
        }
    }
}

/// Judgment output transistor polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransistorMode {
    #[default]
    Npn,
    Pnp,
}

impl TransistorMode {
    pub fn from_wire(v: i64) -> Option<TransistorMode> {
        match v {
            0 => Some(TransistorMode::Npn),
            1 => Some(TransistorMode::Pnp),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            TransistorMode::Npn => 0,
            TransistorMode::Pnp => 1,
        }
    }
}

/// Type and range of the analog output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalogOutputMode {
    #[default]
    Off,
    Volt0To5,
    VoltMinus5To5,
    Volt1To5,
    Current4To20,
}

impl AnalogOutputMode {
    pub fn from_wire(v: i64) -> Option<AnalogOutputMode> {
        match v {
            0b000 => Some(AnalogOutputMode::Off),
            0b001 => Some(AnalogOutputMode::Volt0To5),
            0b010 => Some(AnalogOutputMode::VoltMinus5To5),
            0b011 => Some(AnalogOutputMode::Volt1To5),
            0b100 => Some(AnalogOutputMode::Current4To20),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            AnalogOutputMode::Off => 0b000,
            AnalogOutputMode::Volt0To5 => 0b001,
            AnalogOutputMode::VoltMinus5To5 => 0b010,
            AnalogOutputMode::Volt1To5 => 0b011,
            AnalogOutputMode::Current4To20 => 0b100,
        }
    }

    /// Electrical ceiling of the mode, volts or milliamps.
    pub fn max_level(self) -> f64 {
        match self {
            AnalogOutputMode::Off => 0.0,
            AnalogOutputMode::Current4To20 => 20.0,
            AnalogOutputMode::Volt0To5
            | AnalogOutputMode::Volt1To5
            | AnalogOutputMode::VoltMinus5To5 => 5.0,
        }
    }

    /// Electrical floor of the mode, volts or milliamps.
    pub fn min_level(self) -> f64 {
        match self {
            AnalogOutputMode::Off => 0.0,
            AnalogOutputMode::Current4To20 => 4.0,
            AnalogOutputMode::Volt0To5 => 0.0,
            AnalogOutputMode::Volt1To5 => 1.0,
            AnalogOutputMode::VoltMinus5To5 => -5.0,
        }
    }
}

/// Contents of the sub display screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubdisplayScreen {
    #[default]
    RawValue,
    AnalogValue,
    HighValue,
    LowValue,
    ShiftValue,
    CalcValue,
}

impl SubdisplayScreen {
    pub fn from_wire(v: i64) -> Option<SubdisplayScreen> {
        match v {
            0 => Some(SubdisplayScreen::RawValue),
            1 => Some(SubdisplayScreen::AnalogValue),
            2 => Some(SubdisplayScreen::HighValue),
            3 => Some(SubdisplayScreen::LowValue),
            4 => Some(SubdisplayScreen::ShiftValue),
            5 => Some(SubdisplayScreen::CalcValue),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            SubdisplayScreen::RawValue => 0,
            SubdisplayScreen::AnalogValue => 1,
            SubdisplayScreen::HighValue => 2,
            SubdisplayScreen::LowValue => 3,
            SubdisplayScreen::ShiftValue => 4,
            SubdisplayScreen::CalcValue => 5,
        }
    }
}

/// Calibration mode for the calculated value (main unit only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalcCalibrationMode {
    #[default]
    Initial,
    TwoPoint,
    ThreePoint,
}

impl CalcCalibrationMode {
    pub fn from_wire(v: i64) -> Option<CalcCalibrationMode> {
        match v {
            0 => Some(CalcCalibrationMode::Initial),
            1 => Some(CalcCalibrationMode::TwoPoint),
            2 => Some(CalcCalibrationMode::ThreePoint),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            CalcCalibrationMode::Initial => 0,
            CalcCalibrationMode::TwoPoint => 1,
            CalcCalibrationMode::ThreePoint => 2,
        }
    }
}

/// Function combining main and expansion R.V. into CALC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalculationMode {
    #[default]
    Off,
    Addition,
    Subtraction,
}

impl CalculationMode {
    pub fn from_wire(v: i64) -> Option<CalculationMode> {
        match v {
            0 => Some(CalculationMode::Off),
            1 => Some(CalculationMode::Addition),
            2 => Some(CalculationMode::Subtraction),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            CalculationMode::Off => 0,
            CalculationMode::Addition => 1,
            CalculationMode::Subtraction => 2,
        }
    }
}

/// Sampling cycle selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingCycle {
    #[default]
    Default,
    OneThirdMs,
    OneMs,
    TwoMs,
    FiveMs,
}

impl SamplingCycle {
    pub fn from_wire(v: i64) -> Option<SamplingCycle> {
        match v {
            0 => Some(SamplingCycle::Default),
            1 => Some(SamplingCycle::OneThirdMs),
            2 => Some(SamplingCycle::OneMs),
            3 => Some(SamplingCycle::TwoMs),
            4 => Some(SamplingCycle::FiveMs),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            SamplingCycle::Default => 0,
            SamplingCycle::OneThirdMs => 1,
            SamplingCycle::OneMs => 2,
            SamplingCycle::TwoMs => 3,
            SamplingCycle::FiveMs => 4,
        }
    }

    /// Effective rate in milliseconds, with the head default substituted
    /// for the `Default` selector.
    pub fn rate_ms(self, head_default_ms: f64) -> f64 {
        match self {
            SamplingCycle::Default => head_default_ms,
            SamplingCycle::OneThirdMs => 0.33,
            SamplingCycle::OneMs => 1.0,
            SamplingCycle::TwoMs => 2.0,
            SamplingCycle::FiveMs => 5.0,
        }
    }
}

/// Averaging / diff-count / high-pass filter selector, wire values 0..=14.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSetting(u8);

impl FilterSetting {
    pub const DIFF_COUNT: FilterSetting = FilterSetting(13);
    pub const HIGH_PASS: FilterSetting = FilterSetting(14);

    /// Factory default: 16-times averaging.
    pub fn default_averaging() -> FilterSetting {
        FilterSetting(4)
    }

    pub fn from_wire(v: i64) -> Option<FilterSetting> {
        if (0..=14).contains(&v) {
            Some(FilterSetting(v as u8))
        } else {
            None
        }
    }

    pub fn wire(self) -> i64 {
        i64::from(self.0)
    }
}

impl Default for FilterSetting {
    fn default() -> FilterSetting {
        FilterSetting::default_averaging()
    }
}

/// Hold function deriving P.V. from CALC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldFunction {
    #[default]
    SampleHold,
    PeakHold,
    BottomHold,
    PeakToPeakHold,
    AutoPeakHold,
    AutoBottomHold,
}

impl HoldFunction {
    pub fn from_wire(v: i64) -> Option<HoldFunction> {
        match v {
            0 => Some(HoldFunction::SampleHold),
            1 => Some(HoldFunction::PeakHold),
            2 => Some(HoldFunction::BottomHold),
            3 => Some(HoldFunction::PeakToPeakHold),
            4 => Some(HoldFunction::AutoPeakHold),
            5 => Some(HoldFunction::AutoBottomHold),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            HoldFunction::SampleHold => 0,
            HoldFunction::PeakHold => 1,
            HoldFunction::BottomHold => 2,
            HoldFunction::PeakToPeakHold => 3,
            HoldFunction::AutoPeakHold => 4,
            HoldFunction::AutoBottomHold => 5,
        }
    }
}

/// Delay timer applied to the judgment outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayTimer {
    #[default]
    Off,
    OnDelay,
    OffDelay,
    OneShot,
}

impl DelayTimer {
    pub fn from_wire(v: i64) -> Option<DelayTimer> {
        match v {
            0 => Some(DelayTimer::Off),
            1 => Some(DelayTimer::OnDelay),
            2 => Some(DelayTimer::OffDelay),
            3 => Some(DelayTimer::OneShot),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            DelayTimer::Off => 0,
            DelayTimer::OnDelay => 1,
            DelayTimer::OffDelay => 2,
            DelayTimer::OneShot => 3,
        }
    }
}

/// Source of the analog output scaling limits (main unit only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalogScalingMode {
    #[default]
    Initial,
    FreeRange,
    Bank,
}

impl AnalogScalingMode {
    pub fn from_wire(v: i64) -> Option<AnalogScalingMode> {
        match v {
            0 => Some(AnalogScalingMode::Initial),
            1 => Some(AnalogScalingMode::FreeRange),
            2 => Some(AnalogScalingMode::Bank),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            AnalogScalingMode::Initial => 0,
            AnalogScalingMode::FreeRange => 1,
            AnalogScalingMode::Bank => 2,
        }
    }
}

/// Function assigned to one of the four external input lines.
///
/// The wire encoding differs per line: value 0 means zero shift on line
/// 1, reset on line 2, timing on line 3 and "not used" on line 4; values
/// 1..=3 mean Bank A / Bank B / laser stop everywhere, and 4 means "not
/// used" on lines 1..=3 (line 4 rejects it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFunction {
    ZeroShift,
    Reset,
    Timing,
    BankA,
    BankB,
    LaserStop,
    Unused,
}

impl InputFunction {
    /// Factory assignment of line `line` (0-based).
    pub fn line_default(line: usize) -> InputFunction {
        match line {
            0 => InputFunction::ZeroShift,
            1 => InputFunction::Reset,
            2 => InputFunction::Timing,
            _ => InputFunction::Unused,
        }
    }

    pub fn from_wire(line: usize, v: i64) -> Option<InputFunction> {
        match (line, v) {
            (0..=2, 0) => Some(InputFunction::line_default(line)),
            (3, 0) => Some(InputFunction::Unused),
            (_, 1) => Some(InputFunction::BankA),
            (_, 2) => Some(InputFunction::BankB),
            (_, 3) => Some(InputFunction::LaserStop),
            (0..=2, 4) => Some(InputFunction::Unused),
            _ => None,
        }
    }

    pub fn wire(self, line: usize) -> i64 {
        match self {
            InputFunction::BankA => 1,
            InputFunction::BankB => 2,
            InputFunction::LaserStop => 3,
            InputFunction::Unused => {
                if line == 3 {
                    0
                } else {
                    4
                }
            }
            // The line-specific functions encode as 0 on their own line.
            InputFunction::ZeroShift | InputFunction::Reset | InputFunction::Timing => 0,
        }
    }
}

/// Digit count shown on the main display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayDigits {
    #[default]
    Default,
    Three,
    Two,
    One,
    Zero,
}

impl DisplayDigits {
    pub fn from_wire(v: i64) -> Option<DisplayDigits> {
        match v {
            0 => Some(DisplayDigits::Default),
            1 => Some(DisplayDigits::Three),
            2 => Some(DisplayDigits::Two),
            3 => Some(DisplayDigits::One),
            4 => Some(DisplayDigits::Zero),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            DisplayDigits::Default => 0,
            DisplayDigits::Three => 1,
            DisplayDigits::Two => 2,
            DisplayDigits::One => 3,
            DisplayDigits::Zero => 4,
        }
    }

    /// Effective digits behind the decimal point.
    pub fn digits(self, head_default: u8) -> u8 {
        match self {
            DisplayDigits::Default => head_default,
            DisplayDigits::Three => 3,
            DisplayDigits::Two => 2,
            DisplayDigits::One => 1,
            DisplayDigits::Zero => 0,
        }
    }
}

/// Display color policy of the amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayColor {
    #[default]
    GoGreen,
    GoRed,
    AlwaysRed,
}

impl DisplayColor {
    pub fn from_wire(v: i64) -> Option<DisplayColor> {
        match v {
            0 => Some(DisplayColor::GoGreen),
            1 => Some(DisplayColor::GoRed),
            2 => Some(DisplayColor::AlwaysRed),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            DisplayColor::GoGreen => 0,
            DisplayColor::GoRed => 1,
            DisplayColor::AlwaysRed => 2,
        }
    }
}

/// Power saving mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerSavingMode {
    #[default]
    Off,
    Half,
    All,
}

impl PowerSavingMode {
    pub fn from_wire(v: i64) -> Option<PowerSavingMode> {
        match v {
            0 => Some(PowerSavingMode::Off),
            1 => Some(PowerSavingMode::Half),
            2 => Some(PowerSavingMode::All),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            PowerSavingMode::Off => 0,
            PowerSavingMode::Half => 1,
            PowerSavingMode::All => 2,
        }
    }
}

/// Head display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadDisplayMode {
    #[default]
    Default,
    OkNg,
    Off,
}

impl HeadDisplayMode {
    pub fn from_wire(v: i64) -> Option<HeadDisplayMode> {
        match v {
            0 => Some(HeadDisplayMode::Default),
            1 => Some(HeadDisplayMode::OkNg),
            2 => Some(HeadDisplayMode::Off),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            HeadDisplayMode::Default => 0,
            HeadDisplayMode::OkNg => 1,
            HeadDisplayMode::Off => 2,
        }
    }
}

/// Cutoff frequency of the high-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighPassCutoff(u8);

impl HighPassCutoff {
    /// Factory default: 1 Hz.
    pub fn default_cutoff() -> HighPassCutoff {
        HighPassCutoff(3)
    }

    pub fn from_wire(v: i64) -> Option<HighPassCutoff> {
        if (0..=9).contains(&v) {
            Some(HighPassCutoff(v as u8))
        } else {
            None
        }
    }

    pub fn wire(self) -> i64 {
        i64::from(self.0)
    }
}

impl Default for HighPassCutoff {
    fn default() -> HighPassCutoff {
        HighPassCutoff::default_cutoff()
    }
}

/// Alarm behavior selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmSetting {
    #[default]
    Initial,
    Clamp,
    UserSetting,
}

impl AlarmSetting {
    pub fn from_wire(v: i64) -> Option<AlarmSetting> {
        match v {
            0 => Some(AlarmSetting::Initial),
            1 => Some(AlarmSetting::Clamp),
            2 => Some(AlarmSetting::UserSetting),
            _ => None,
        }
    }

    pub fn wire(self) -> i64 {
        match self {
            AlarmSetting::Initial => 0,
            AlarmSetting::Clamp => 1,
            AlarmSetting::UserSetting => 2,
        }
    }
}

/// Color of one indicator LED on the head or amplifier face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Off,
    Green,
    Red,
    Orange,
    Blinking,
}
