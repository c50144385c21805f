// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The communication unit at the head of the bus: holds the ordered
//! amplifier vector, assigns the main/expansion roles, and answers the
//! bus-global register space (data numbers 0..=1179).

use crate::amplifier::Amplifier;
use crate::errors::{BusErrorCode, WireError, WireResult};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Largest addressable data number on the communication unit.
pub const BUS_REGISTER_MAX: u16 = 1179;

/// Upper limit on connected amplifiers.
pub const MAX_SENSORS: usize = 15;

/// Communication unit with its connected sensor amplifiers.
///
/// Shared read access is enough for the whole protocol surface; the two
/// unit-level settings are atomics so a reloadable server can keep the
/// bus behind a plain `Arc`.
#[derive(Default)]
pub struct CommunicationUnit {
    sensors: Vec<Amplifier>,
    internal_error: AtomicU16,
    mask_sensor_status: AtomicBool,
}

impl CommunicationUnit {
    pub fn new() -> CommunicationUnit {
        CommunicationUnit::default()
    }

    /// Append one amplifier and re-run the role assignment.
    pub fn add_unit(&mut self, unit: Amplifier) {
        self.sensors.push(unit);
        self.assign_main_unit();
    }

    /// Append several amplifiers at once.
    pub fn add_units(&mut self, units: impl IntoIterator<Item = Amplifier>) {
        self.sensors.extend(units);
        self.assign_main_unit();
    }

    /// First unit becomes the main unit, the second its expansion
    /// partner; everything after runs standalone.
    fn assign_main_unit(&mut self) {
        let Some(main) = self.sensors.first() else {
            return;
        };
        main.set_main(true);
        if let Some(expansion) = self.sensors.get(1) {
            Amplifier::pair(main, expansion);
        } else {
            main.unpair();
        }
        for other in self.sensors.iter().skip(2) {
            other.set_main(false);
            other.unpair();
        }
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn sensors(&self) -> &[Amplifier] {
        &self.sensors
    }

    /// Resolve a 1-based wire ID to an amplifier.
    pub fn sensor(&self, id: u8) -> WireResult<&Amplifier> {
        if id == 0 {
            return Err(WireError::IdOutOfRange);
        }
        self.sensors
            .get(usize::from(id) - 1)
            .ok_or(WireError::IdOutOfRange)
    }

    /// Fault injection on the communication unit itself.
    pub fn set_internal_error(&self, error: BusErrorCode) {
        log::debug!("bus fault injection: {}", error);
        self.internal_error.store(error.code(), Ordering::Relaxed);
    }

    pub fn internal_error_code(&self) -> u16 {
        self.internal_error.load(Ordering::Relaxed)
    }

    pub fn has_internal_error(&self) -> bool {
        self.internal_error_code() != 0
    }

    /// Draw fresh measurements on every sensor.
    pub fn randomize_sensors(&self) {
        for sensor in &self.sensors {
            sensor.randomize_value();
        }
    }

    /// Apply per-sensor measurement uncertainty, as M0/MS do before
    /// formatting.
    pub fn apply_sensor_uncertainty(&self) {
        for sensor in &self.sensors {
            sensor.apply_uncertainty();
        }
    }

    /// Drain the background workers of every amplifier.
    pub fn stop_workers(&self) {
        for sensor in &self.sensors {
            sensor.stop_workers();
        }
    }

    fn sensor_bitmap(&self, predicate: impl Fn(&Amplifier) -> bool) -> i64 {
        self.sensors
            .iter()
            .enumerate()
            .fold(0i64, |acc, (i, s)| acc | (i64::from(predicate(s)) << i))
    }

    /// SR dispatch for ID 00.
    pub fn handle_read(&self, number: u16) -> WireResult<i64> {
        if number > BUS_REGISTER_MAX {
            return Err(WireError::NumberOutOfRange);
        }
        let value = match number {
            // Packed unit status: bit 0 bus error, bit 15 any sensor
            // error, the rest reserved.
            0 => {
                i64::from(self.has_internal_error())
                    + ((1 << 15) * i64::from(self.sensors.iter().any(|s| s.has_error())))
            }
            1 => self.sensor_bitmap(|s| s.has_error()),
            // Warnings only exist for the IB series; fixed to 0 here.
            2 | 10 | 11 => 0,
            4 => self.sensor_bitmap(|s| s.is_out_of_range()),
            8 => {
                if self.has_internal_error() {
                    0
                } else {
                    self.sensors
                        .iter()
                        .position(|s| s.has_error())
                        .map_or(0, |i| i as i64 + 1)
                }
            }
            9 => {
                if self.has_internal_error() {
                    i64::from(self.internal_error_code())
                } else {
                    self.sensors
                        .iter()
                        .find(|s| s.has_error())
                        .map_or(0, |s| i64::from(s.first_error_code()))
                }
            }
            16 => self.sensor_bitmap(|s| s.high_output()),
            17 => self.sensor_bitmap(|s| s.low_output()),
            18 => self.sensor_bitmap(|s| s.go_output()),
            19 => self.sensor_bitmap(|s| s.alarm_output()),
            // Output 5 is not wired on IL amplifiers.
            20 => 0,
            38 => self.sensor_bitmap(|s| s.value_invalid()),
            39 => self.sensor_bitmap(|s| s.value_under_range()),
            40 => self.sensor_bitmap(|s| s.value_over_range()),
            44..=58 => {
                let index = usize::from(number - 44);
                self.sensors
                    .get(index)
                    .ok_or(WireError::IdOutOfRange)?
                    .judgment_wire_value()
            }
            76 => i64::from(self.mask_sensor_status.load(Ordering::Relaxed)),
            77 => self.sensors.len() as i64,
            668 => i64::from(self.internal_error_code()),
            669..=683 => {
                let index = usize::from(number - 669);
                i64::from(
                    self.sensors
                        .get(index)
                        .ok_or(WireError::IdOutOfRange)?
                        .error_bits(),
                )
            }
            _ => {
                return Err(if self.is_writable(number) {
                    WireError::ReadProtected
                } else {
                    WireError::Inaccessible
                })
            }
        };
        Ok(value)
    }

    /// SW dispatch for ID 00.
    pub fn handle_write(&self, number: u16, value: i64) -> WireResult<()> {
        if number > BUS_REGISTER_MAX {
            return Err(WireError::NumberOutOfRange);
        }
        match number {
            76 => {
                let mask = match value {
                    0 => false,
                    1 => true,
                    _ => return Err(WireError::ValueOutOfRange),
                };
                self.mask_sensor_status.store(mask, Ordering::Relaxed);
                Ok(())
            }
            _ => Err(if self.is_readable(number) {
                WireError::WriteProtected
            } else {
                WireError::Inaccessible
            }),
        }
    }

    fn is_readable(&self, number: u16) -> bool {
        matches!(number,
            0..=2 | 4 | 8..=11 | 16..=20 | 38..=40 | 44..=58 | 76 | 77 | 668..=683)
    }

    fn is_writable(&self, number: u16) -> bool {
        number == 76
    }
}
