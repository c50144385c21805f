// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire-level conformance of the line protocol: request grammar, reply
//! framing, dispatch routing and the ER code mapping.

use ilsim::bus::CommunicationUnit;
use ilsim::errors::BusErrorCode;
use ilsim::protocol::handle_query;
use ilsim::SimulatorConfig;

/// IL-030 bus with measurement noise disabled so replies are
/// deterministic.
fn quiet_bus(sensors: usize) -> CommunicationUnit {
    let entries: Vec<String> = (0..sensors)
        .map(|_| r#"{"type": "IL-030", "overrides": {"uncertainty": 0.0}}"#.to_string())
        .collect();
    let json = format!(r#"{{"sensors": [{}]}}"#, entries.join(","));
    let config: SimulatorConfig = serde_json::from_str(&json).unwrap();
    config.build_bus().unwrap()
}

#[test]
fn test_m0_single_sensor_at_rest() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "M0\r\n"), "M0,+000000000\r\n");
    bus.stop_workers();
}

#[test]
fn test_m0_multiple_sensors() {
    let bus = quiet_bus(3);
    bus.sensors()[1].set_raw_value(Some(1.5));
    bus.sensors()[2].set_raw_value(None);
    assert_eq!(
        handle_query(&bus, "M0\r\n"),
        "M0,+000000000,+000001500,-099999998\r\n"
    );
    bus.stop_workers();
}

#[test]
fn test_m0_empty_bus() {
    let bus = quiet_bus(0);
    assert_eq!(handle_query(&bus, "M0\r\n"), "M0,\r\n");
}

#[test]
fn test_ms_reports_state_and_value() {
    let bus = quiet_bus(2);
    bus.sensors()[1].set_raw_value(Some(7.0)); // above the HIGH threshold
    assert_eq!(
        handle_query(&bus, "MS\r\n"),
        "MS,04,+000000000,01,+000007000\r\n"
    );
    bus.stop_workers();
}

#[test]
fn test_sr_judgment_value() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000000000\r\n");
    bus.stop_workers();
}

#[test]
fn test_sr_reply_framing() {
    let bus = quiet_bus(1);
    let reply = handle_query(&bus, "SR,01,037\r\n");
    assert_eq!(reply.len(), 22);
    assert!(reply.ends_with("\r\n"));
    // The signed field is ten characters, sign included.
    let value_field = &reply[10..20];
    assert!(value_field.starts_with('+') || value_field.starts_with('-'));
    assert_eq!(value_field.len(), 10);
    bus.stop_workers();
}

#[test]
fn test_fr_reports_decimal_position() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "FR,01,037\r\n"), "FR,01,037,+000000003\r\n");
    bus.stop_workers();
}

#[test]
fn test_fr_on_communication_unit_is_bad_id() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "FR,00,037\r\n"), "ER,FR,022\r\n");
    bus.stop_workers();
}

#[test]
fn test_sw_then_sr_roundtrip() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SW,01,136,+000000002\r\n"), "SW,01,136\r\n");
    assert_eq!(handle_query(&bus, "SR,01,136\r\n"), "SR,01,136,+000000002\r\n");
    bus.stop_workers();
}

#[test]
fn test_sw_out_of_range_value() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SW,01,136,+000000009\r\n"), "ER,SW,009\r\n");
    bus.stop_workers();
}

#[test]
fn test_sr_number_above_amplifier_space() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SR,01,500\r\n"), "ER,SR,020\r\n");
    bus.stop_workers();
}

#[test]
fn test_sr_reserved_number() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SR,01,120\r\n"), "ER,SR,031\r\n");
    bus.stop_workers();
}

#[test]
fn test_sr_write_only_number() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SR,01,001\r\n"), "ER,SR,016\r\n");
    bus.stop_workers();
}

#[test]
fn test_sw_read_only_number() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SW,01,037,+000000001\r\n"), "ER,SW,014\r\n");
    bus.stop_workers();
}

#[test]
fn test_malformed_line_echoes_first_two_characters() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "GARBAGE\r\n"), "ER,GA,255\r\n");
    assert_eq!(handle_query(&bus, "sr,01,037\r\n"), "ER,sr,255\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\n"), "ER,SR,255\r\n");
    assert_eq!(handle_query(&bus, "SR, 1,037\r\n"), "ER,SR,255\r\n");
    bus.stop_workers();
}

#[test]
fn test_sensor_count_register() {
    let bus = quiet_bus(3);
    assert_eq!(handle_query(&bus, "SR,00,077\r\n"), "SR,00,077,+000000003\r\n");
    bus.stop_workers();
}

#[test]
fn test_absent_sensor_id() {
    let bus = quiet_bus(2);
    assert_eq!(handle_query(&bus, "SR,03,037\r\n"), "ER,SR,022\r\n");
    assert_eq!(handle_query(&bus, "SR,16,037\r\n"), "ER,SR,022\r\n");
    assert_eq!(handle_query(&bus, "SW,99,136,+000000002\r\n"), "ER,SW,022\r\n");
    bus.stop_workers();
}

#[test]
fn test_bus_error_preempts_dispatch() {
    let bus = quiet_bus(1);
    bus.set_internal_error(BusErrorCode::InterAmplifierCommunication);
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "ER,SR,254\r\n");
    assert_eq!(handle_query(&bus, "M0\r\n"), "ER,M0,254\r\n");
    assert_eq!(handle_query(&bus, "SW,01,136,+000000002\r\n"), "ER,SW,254\r\n");
    // A malformed line is still a format error first.
    assert_eq!(handle_query(&bus, "NOPE\r\n"), "ER,NO,255\r\n");
    bus.set_internal_error(BusErrorCode::NoError);
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000000000\r\n");
    bus.stop_workers();
}

#[test]
fn test_product_name_register_is_text() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SR,01,200\r\n"), "SR,01,200,IL-1000/1500\r\n");
    bus.stop_workers();
}

#[test]
fn test_m0_applies_measurement_noise() {
    let json = r#"{"sensors": [{"type": "IL-030", "overrides": {"uncertainty": 0.05}}]}"#;
    let config: SimulatorConfig = serde_json::from_str(json).unwrap();
    let bus = config.build_bus().unwrap();
    // The judgment value stays inside the +/-0.05 mm noise window
    // around zero, and the raw value accumulates the walk.
    let reply = handle_query(&bus, "M0\r\n");
    let value: i64 = reply[3..13].trim_start_matches('+').parse().unwrap();
    assert!(value.abs() <= 50, "value {} outside the noise window", value);
    // Register reads do not add noise on top.
    let sr = handle_query(&bus, "SR,01,037\r\n");
    let sr_value: i64 = sr[10..20].trim_start_matches('+').parse().unwrap();
    assert_eq!(value, sr_value);
    bus.stop_workers();
}

#[test]
fn test_bus_judgment_registers_match_m0() {
    let bus = quiet_bus(2);
    bus.sensors()[0].set_raw_value(Some(2.0));
    bus.sensors()[1].set_raw_value(Some(-1.0));
    assert_eq!(handle_query(&bus, "SR,00,044\r\n"), "SR,00,044,+000002000\r\n");
    assert_eq!(handle_query(&bus, "SR,00,045\r\n"), "SR,00,045,-000001000\r\n");
    assert_eq!(handle_query(&bus, "SR,00,046\r\n"), "ER,SR,022\r\n");
    bus.stop_workers();
}

#[test]
fn test_bus_mask_setting_write() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SW,00,076,+000000001\r\n"), "SW,00,076\r\n");
    assert_eq!(handle_query(&bus, "SR,00,076\r\n"), "SR,00,076,+000000001\r\n");
    bus.stop_workers();
}

#[test]
fn test_bus_number_above_register_space() {
    let bus = quiet_bus(1);
    assert_eq!(handle_query(&bus, "SR,00,999\r\n"), "ER,SR,031\r\n");
    bus.stop_workers();
}
