// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Line protocol engine: lexes one CR-LF-terminated request, dispatches
//! it to the communication unit or an amplifier, and formats exactly one
//! CR-LF-terminated reply.
//!
//! Grammar (everything else is error 255):
//!
//! ```text
//! M0                      read measured values of all amplifiers
//! MS                      read output state + measured value of all amplifiers
//! SR,<id2>,<q3>           register read
//! SW,<id2>,<q3>,<sv10>    register write
//! FR,<id2>,<q3>           read decimal position
//! ```
//!
//! `<id2>` is exactly two digits, `<q3>` exactly three, `<sv10>` a sign
//! and exactly nine digits. Field widths are strict; IDs above 15 pass
//! the lexer and fail dispatch with error 022.

use crate::amplifier::ReadValue;
use crate::bus::CommunicationUnit;
use crate::codec::format_signed;
use crate::errors::{WireError, WireResult};

const TERMINATOR: &str = "\r\n";

/// One parsed request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `M0`: judgment values of every amplifier.
    MeasuredValues,
    /// `MS`: output state plus judgment value of every amplifier.
    MeasuredStates,
    /// `SR`: register read from the bus (id 0) or an amplifier.
    Read { id: u8, number: u16 },
    /// `SW`: register write.
    Write { id: u8, number: u16, value: i64 },
    /// `FR`: decimal position of an amplifier.
    DecimalPosition { id: u8, number: u16 },
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_id(s: &str) -> WireResult<u8> {
    if s.len() != 2 || !all_digits(s) {
        return Err(WireError::BadFormat);
    }
    s.parse().map_err(|_| WireError::BadFormat)
}

fn parse_number(s: &str) -> WireResult<u16> {
    if s.len() != 3 || !all_digits(s) {
        return Err(WireError::BadFormat);
    }
    s.parse().map_err(|_| WireError::BadFormat)
}

fn parse_value(s: &str) -> WireResult<i64> {
    if s.len() != 10 {
        return Err(WireError::BadFormat);
    }
    let (sign, digits) = s.split_at(1);
    if (sign != "+" && sign != "-") || !all_digits(digits) {
        return Err(WireError::BadFormat);
    }
    let magnitude: i64 = digits.parse().map_err(|_| WireError::BadFormat)?;
    Ok(if sign == "-" { -magnitude } else { magnitude })
}

/// Parse one raw line, terminator included.
pub fn parse_request(line: &str) -> WireResult<Request> {
    let body = line.strip_suffix(TERMINATOR).ok_or(WireError::BadFormat)?;
    match body {
        "M0" => return Ok(Request::MeasuredValues),
        "MS" => return Ok(Request::MeasuredStates),
        _ => {}
    }
    let mut fields = body.split(',');
    let command = fields.next().ok_or(WireError::BadFormat)?;
    match command {
        "SR" | "FR" => {
            let id = parse_id(fields.next().ok_or(WireError::BadFormat)?)?;
            let number = parse_number(fields.next().ok_or(WireError::BadFormat)?)?;
            if fields.next().is_some() {
                return Err(WireError::BadFormat);
            }
            Ok(if command == "SR" {
                Request::Read { id, number }
            } else {
                Request::DecimalPosition { id, number }
            })
        }
        "SW" => {
            let id = parse_id(fields.next().ok_or(WireError::BadFormat)?)?;
            let number = parse_number(fields.next().ok_or(WireError::BadFormat)?)?;
            let value = parse_value(fields.next().ok_or(WireError::BadFormat)?)?;
            if fields.next().is_some() {
                return Err(WireError::BadFormat);
            }
            Ok(Request::Write { id, number, value })
        }
        _ => Err(WireError::BadFormat),
    }
}

/// Handle one raw request line and produce the raw reply line.
pub fn handle_query(bus: &CommunicationUnit, raw: &str) -> String {
    // The error reply echoes the first two characters of the request,
    // whatever they were.
    let echo: String = raw.chars().take(2).collect();
    let request = match parse_request(raw) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("rejected request line: {:?}", raw);
            return error_reply(&echo, e);
        }
    };
    if bus.has_internal_error() {
        return error_reply(&echo, WireError::SystemError);
    }
    match dispatch(bus, request) {
        Ok(reply) => reply,
        Err(e) => error_reply(&echo, e),
    }
}

fn error_reply(echo: &str, error: WireError) -> String {
    format!("ER,{},{:03}{}", echo, error.code(), TERMINATOR)
}

fn dispatch(bus: &CommunicationUnit, request: Request) -> WireResult<String> {
    match request {
        Request::MeasuredValues => {
            bus.apply_sensor_uncertainty();
            let values: Vec<String> = bus
                .sensors()
                .iter()
                .map(|s| format_signed(s.judgment_wire_value()))
                .collect();
            Ok(format!("M0,{}{}", values.join(","), TERMINATOR))
        }
        Request::MeasuredStates => {
            bus.apply_sensor_uncertainty();
            let values: Vec<String> = bus
                .sensors()
                .iter()
                .map(|s| {
                    format!(
                        "{:02},{}",
                        s.output_state().wire(),
                        format_signed(s.judgment_wire_value())
                    )
                })
                .collect();
            Ok(format!("MS,{}{}", values.join(","), TERMINATOR))
        }
        Request::Read { id, number } => {
            let value = if id == 0 {
                ReadValue::Int(bus.handle_read(number)?)
            } else {
                bus.sensor(id)?.handle_read(number)?
            };
            Ok(match value {
                ReadValue::Int(v) => {
                    format!("SR,{:02},{:03},{}{}", id, number, format_signed(v), TERMINATOR)
                }
                ReadValue::Text(t) => format!("SR,{:02},{:03},{}{}", id, number, t, TERMINATOR),
            })
        }
        Request::Write { id, number, value } => {
            if id == 0 {
                bus.handle_write(number, value)?;
            } else {
                bus.sensor(id)?.handle_write(number, value)?;
            }
            Ok(format!("SW,{:02},{:03}{}", id, number, TERMINATOR))
        }
        Request::DecimalPosition { id, number } => {
            let sensor = bus.sensor(id)?;
            let position = i64::from(sensor.decimal_position());
            Ok(format!(
                "FR,{:02},{:03},{}{}",
                id,
                number,
                format_signed(position),
                TERMINATOR
            ))
        }
    }
}
