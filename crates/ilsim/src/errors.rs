// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy: wire-visible ER codes, the communication unit's
//! internal error enum, and the amplifier's bit-flag error word.

use std::fmt;

/// Error codes that can appear on the wire in an `ER,<cmd>,<code>` reply.
///
/// These are the only failure modes a client can observe; everything an
/// amplifier or the bus can get wrong maps onto one of them at the
/// protocol engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// 009: the written data is outside of the valid range.
    ValueOutOfRange,
    /// 012: the operation command cannot be executed in the current state.
    NotExecutable,
    /// 014: the data number is write-protected.
    WriteProtected,
    /// 016: the data number is read-protected.
    ReadProtected,
    /// 020: the data number is outside of the valid range.
    NumberOutOfRange,
    /// 022: the ID is outside of the valid range.
    IdOutOfRange,
    /// 031: the data number is reserved, neither readable nor writable.
    Inaccessible,
    /// 254: general system error on the communication unit.
    SystemError,
    /// 255: the command format is not correct.
    BadFormat,
}

impl WireError {
    /// Three-digit code used in the `ER` reply.
    pub fn code(self) -> u16 {
        match self {
            WireError::ValueOutOfRange => 9,
            WireError::NotExecutable => 12,
            WireError::WriteProtected => 14,
            WireError::ReadProtected => 16,
            WireError::NumberOutOfRange => 20,
            WireError::IdOutOfRange => 22,
            WireError::Inaccessible => 31,
            WireError::SystemError => 254,
            WireError::BadFormat => 255,
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::ValueOutOfRange => write!(f, "ER 009: value outside valid range"),
            WireError::NotExecutable => write!(f, "ER 012: not executable in current state"),
            WireError::WriteProtected => write!(f, "ER 014: data number is write-protected"),
            WireError::ReadProtected => write!(f, "ER 016: data number is read-protected"),
            WireError::NumberOutOfRange => write!(f, "ER 020: data number outside valid range"),
            WireError::IdOutOfRange => write!(f, "ER 022: ID outside valid range"),
            WireError::Inaccessible => write!(f, "ER 031: reserved data number"),
            WireError::SystemError => write!(f, "ER 254: general system error"),
            WireError::BadFormat => write!(f, "ER 255: invalid command format"),
        }
    }
}

impl std::error::Error for WireError {}

/// Result alias used across the register files and the protocol engine.
pub type WireResult<T> = Result<T, WireError>;

/// Internal error codes of the communication unit.
///
/// Only `NoError` ever arises on its own; every other code exists for
/// fault injection through configuration or the library API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusErrorCode {
    #[default]
    NoError,
    /// 051: no ID was assigned within 10 s of start-up.
    UnassignedId,
    /// 052: inter-amplifier communication failed before ID assignment.
    StartupCommunication,
    /// 053: an unsupported sensor amplifier is connected.
    UnsupportedAmplifier,
    /// 054: amplifiers outside the specification are mixed on the bus.
    MixedModels,
    /// 055: initial communication failed after ID assignment.
    InitialCommunication,
    /// 056: the number of connected amplifiers exceeds the allowable range.
    CurrentLimitation,
    /// 057: communication error between sensor amplifiers.
    InterAmplifierCommunication,
    /// 070: the IP address collides with another device.
    DuplicateIpAddress,
    /// 100: the IP address is incorrect.
    BadIpAddress,
    /// 101: default gateway setting error.
    BadGateway,
    /// 102: EEPROM read (MAC address etc.) failed.
    EepromReadFailure,
    /// 103: the protocol stack failed to start.
    ProtocolStackFailure,
    /// 104: FlashROM access failed.
    FlashAccessFailure,
    /// 150: the number of held IDs is incorrect.
    HeldIdCount,
    /// 151: the number of sensors is incorrect.
    SensorCount,
    /// 152: an initial read error occurred.
    InitialRead,
}

impl BusErrorCode {
    /// Numeric code reported by bus registers 009 and 668.
    pub fn code(self) -> u16 {
        match self {
            BusErrorCode::NoError => 0,
            BusErrorCode::UnassignedId => 51,
            BusErrorCode::StartupCommunication => 52,
            BusErrorCode::UnsupportedAmplifier => 53,
            BusErrorCode::MixedModels => 54,
            BusErrorCode::InitialCommunication => 55,
            BusErrorCode::CurrentLimitation => 56,
            BusErrorCode::InterAmplifierCommunication => 57,
            BusErrorCode::DuplicateIpAddress => 70,
            BusErrorCode::BadIpAddress => 100,
            BusErrorCode::BadGateway => 101,
            BusErrorCode::EepromReadFailure => 102,
            BusErrorCode::ProtocolStackFailure => 103,
            BusErrorCode::FlashAccessFailure => 104,
            BusErrorCode::HeldIdCount => 150,
            BusErrorCode::SensorCount => 151,
            BusErrorCode::InitialRead => 152,
        }
    }

    /// Reverse of [`code`](Self::code); unknown codes are rejected.
    pub fn from_code(code: u16) -> Option<BusErrorCode> {
        let v = match code {
            0 => BusErrorCode::NoError,
            51 => BusErrorCode::UnassignedId,
            52 => BusErrorCode::StartupCommunication,
            53 => BusErrorCode::UnsupportedAmplifier,
            54 => BusErrorCode::MixedModels,
            55 => BusErrorCode::InitialCommunication,
            56 => BusErrorCode::CurrentLimitation,
            57 => BusErrorCode::InterAmplifierCommunication,
            70 => BusErrorCode::DuplicateIpAddress,
            100 => BusErrorCode::BadIpAddress,
            101 => BusErrorCode::BadGateway,
            102 => BusErrorCode::EepromReadFailure,
            103 => BusErrorCode::ProtocolStackFailure,
            104 => BusErrorCode::FlashAccessFailure,
            150 => BusErrorCode::HeldIdCount,
            151 => BusErrorCode::SensorCount,
            152 => BusErrorCode::InitialRead,
            _ => return None,
        };
        Some(v)
    }
}

impl fmt::Display for BusErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus error {:03}", self.code())
    }
}

/// Bit-flag error word of one sensor amplifier.
///
/// Register 033 reports the raw word; register 009 of the bus reports the
/// ordinal of the lowest set bit. Bits 3..=6, 9, 10, 14 and 15 are
/// reserved and always zero on real hardware, but fault injection may set
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmpError(u16);

impl AmpError {
    pub const NONE: AmpError = AmpError(0);
    /// Bit 0: overcurrent on a judgment output.
    pub const OVERCURRENT: AmpError = AmpError(1 << 0);
    /// Bit 1: EEPROM write failure.
    pub const EEPROM: AmpError = AmpError(1 << 1);
    /// Bit 2: sensor head error.
    pub const SENSOR_HEAD: AmpError = AmpError(1 << 2);
    /// Bit 7: spot light laser error.
    pub const SPOT_LIGHT_LASER: AmpError = AmpError(1 << 7);
    /// Bit 8: incompatible model error.
    pub const INCOMPATIBLE_MODEL: AmpError = AmpError(1 << 8);
    /// Bit 11: amplifier communication error.
    pub const AMPLIFIER_COMMUNICATION: AmpError = AmpError(1 << 11);
    /// Bit 12: number-of-units error.
    pub const NUMBER_OF_UNITS: AmpError = AmpError(1 << 12);
    /// Bit 13: calculation error.
    pub const CALCULATION: AmpError = AmpError(1 << 13);

    pub fn from_bits(bits: u16) -> AmpError {
        AmpError(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: AmpError) -> bool {
        self.0 & other.0 != 0
    }

    /// Ordinal of the lowest set bit (1-based), 0 when the word is clear.
    /// This is the "first error code" surfaced by bus register 009.
    pub fn first_code(self) -> u16 {
        if self.0 == 0 {
            0
        } else {
            self.0.trailing_zeros() as u16 + 1
        }
    }

    /// True when any bit other than the masked-out ones is set.
    pub fn any_besides(self, mask: AmpError) -> bool {
        self.0 & !mask.0 != 0
    }
}

impl fmt::Display for AmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "amplifier error word {:#06x}", self.0)
    }
}
