// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end behavior of the measurement cascade: hold functions driven
//! through the timing-input register, main/expansion calculation, zero
//! shift, calibration and the judgment outputs, all observed through the
//! wire protocol.

use ilsim::errors::AmpError;
use ilsim::protocol::handle_query;
use ilsim::{CommunicationUnit, SimulatorConfig};

fn quiet_bus(sensors: usize) -> CommunicationUnit {
    let entries: Vec<String> = (0..sensors)
        .map(|_| r#"{"type": "IL-030", "overrides": {"uncertainty": 0.0}}"#.to_string())
        .collect();
    let json = format!(r#"{{"sensors": [{}]}}"#, entries.join(","));
    let config: SimulatorConfig = serde_json::from_str(&json).unwrap();
    config.build_bus().unwrap()
}

#[test]
fn test_sample_hold_follows_every_raw_mutation() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    for (raw, wire) in [(0.5, "+000000500"), (-1.25, "-000001250"), (3.0, "+000003000")] {
        amp.set_raw_value(Some(raw));
        assert_eq!(
            handle_query(&bus, "SR,01,037\r\n"),
            format!("SR,01,037,{}\r\n", wire)
        );
    }
    bus.stop_workers();
}

#[test]
fn test_peak_hold_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,136,+000000001\r\n"); // peak hold
    // Start a fresh sampling period via the stored timing input.
    handle_query(&bus, "SW,01,099,+000000001\r\n");
    handle_query(&bus, "SW,01,099,+000000000\r\n");
    for raw in [1.0, 4.0, 2.0] {
        amp.set_raw_value(Some(raw));
    }
    // Peak and bottom are readable during the sampling period.
    assert_eq!(handle_query(&bus, "SR,01,039\r\n"), "SR,01,039,+000004000\r\n");
    assert_eq!(handle_query(&bus, "SR,01,040\r\n"), "SR,01,040,+000001000\r\n");
    // The rising edge freezes the peak into the judgment value.
    handle_query(&bus, "SW,01,099,+000000001\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000004000\r\n");
    bus.stop_workers();
}

#[test]
fn test_peak_to_peak_hold_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,136,+000000003\r\n");
    handle_query(&bus, "SW,01,099,+000000001\r\n");
    handle_query(&bus, "SW,01,099,+000000000\r\n");
    for raw in [2.0, -1.0, 3.0] {
        amp.set_raw_value(Some(raw));
    }
    handle_query(&bus, "SW,01,099,+000000001\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000004000\r\n");
    bus.stop_workers();
}

#[test]
fn test_edge_triggered_sample_hold() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,138,+000000001\r\n"); // edge mode
    amp.set_raw_value(Some(2.0));
    // Level tracking is off; P.V. still holds the construction-time 0.
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000000000\r\n");
    handle_query(&bus, "SW,01,099,+000000001\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000002000\r\n");
    bus.stop_workers();
}

#[test]
fn test_calculation_modes_between_partners() {
    let bus = quiet_bus(2);
    let main = &bus.sensors()[0];
    let expansion = &bus.sensors()[1];
    main.set_raw_value(Some(2.0));
    expansion.set_raw_value(Some(0.5));

    handle_query(&bus, "SW,01,129,+000000001\r\n"); // addition
    main.set_raw_value(Some(2.0));
    assert_eq!(handle_query(&bus, "SR,01,041\r\n"), "SR,01,041,+000002500\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000002500\r\n");

    handle_query(&bus, "SW,01,129,+000000002\r\n"); // subtraction
    main.set_raw_value(Some(2.0));
    assert_eq!(handle_query(&bus, "SR,01,041\r\n"), "SR,01,041,+000001500\r\n");

    // The expansion unit's own judgment value stays its R.V.
    assert_eq!(handle_query(&bus, "SR,02,037\r\n"), "SR,02,037,+000000500\r\n");
    // CALC reads as invalid on the expansion unit.
    assert_eq!(handle_query(&bus, "SR,02,041\r\n"), "SR,02,041,-000099998\r\n");
    bus.stop_workers();
}

#[test]
fn test_partner_loss_invalidates_calc() {
    let bus = quiet_bus(2);
    let main = &bus.sensors()[0];
    let expansion = &bus.sensors()[1];
    handle_query(&bus, "SW,01,129,+000000001\r\n");
    main.set_raw_value(Some(1.0));
    expansion.set_raw_value(Some(1.0));
    assert_eq!(handle_query(&bus, "SR,01,041\r\n"), "SR,01,041,+000002000\r\n");
    expansion.set_raw_value(None);
    assert_eq!(handle_query(&bus, "SR,01,041\r\n"), "SR,01,041,-000099998\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,-000099998\r\n");
    bus.stop_workers();
}

#[test]
fn test_zero_shift_moves_the_judgment_window() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    amp.set_raw_value(Some(1.5));
    handle_query(&bus, "SW,01,001,+000000001\r\n");
    // The shift lands in the effective bank's target register.
    assert_eq!(handle_query(&bus, "SR,01,067\r\n"), "SR,01,067,+000001500\r\n");
    // The next measurement is reported relative to the shift.
    amp.set_raw_value(Some(2.0));
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000000500\r\n");
    // Resetting restores the unshifted reading.
    handle_query(&bus, "SW,01,002,+000000001\r\n");
    amp.set_raw_value(Some(2.0));
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000002000\r\n");
    bus.stop_workers();
}

#[test]
fn test_two_point_tuning_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    amp.set_raw_value(Some(2.0));
    handle_query(&bus, "SW,01,015,+000000001\r\n");
    amp.set_raw_value(Some(6.0));
    handle_query(&bus, "SW,01,016,+000000001\r\n");
    assert_eq!(handle_query(&bus, "SR,01,065\r\n"), "SR,01,065,+000004000\r\n");
    assert_eq!(handle_query(&bus, "SR,01,060\r\n"), "SR,01,060,+000000001\r\n");
    bus.stop_workers();
}

#[test]
fn test_calibration_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,107,+000000001\r\n"); // user calibration
    // Targets: map 1.0 -> SET1 (0.000) and 4.0 -> SET2 (5.000),
    // calibration factor 5/3.
    amp.set_raw_value(Some(1.0));
    handle_query(&bus, "SW,01,019,+000000001\r\n");
    amp.set_raw_value(Some(4.0));
    handle_query(&bus, "SW,01,020,+000000001\r\n");
    assert_eq!(handle_query(&bus, "SR,01,061\r\n"), "SR,01,061,+000000001\r\n");
    amp.set_raw_value(Some(1.0));
    assert_eq!(handle_query(&bus, "SR,01,038\r\n"), "SR,01,038,+000000000\r\n");
    amp.set_raw_value(Some(4.0));
    assert_eq!(handle_query(&bus, "SR,01,038\r\n"), "SR,01,038,+000005000\r\n");
    bus.stop_workers();
}

#[test]
fn test_calibration_factor_gate_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,107,+000000001\r\n");
    amp.set_raw_value(Some(0.0));
    handle_query(&bus, "SW,01,019,+000000001\r\n");
    amp.set_raw_value(Some(50.0)); // factor 0.1, outside 0.5..=2.0
    assert_eq!(handle_query(&bus, "SW,01,020,+000000001\r\n"), "ER,SW,012\r\n");
    assert_eq!(handle_query(&bus, "SR,01,061\r\n"), "SR,01,061,+000000002\r\n");
    bus.stop_workers();
}

#[test]
fn test_judgment_outputs_follow_thresholds() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    amp.set_raw_value(Some(0.0));
    assert_eq!(handle_query(&bus, "MS\r\n"), "MS,04,+000000000\r\n");
    amp.set_raw_value(Some(6.0));
    assert_eq!(handle_query(&bus, "MS\r\n"), "MS,01,+000006000\r\n");
    amp.set_raw_value(Some(-6.0));
    assert_eq!(handle_query(&bus, "MS\r\n"), "MS,02,-000006000\r\n");
    amp.set_error(AmpError::SENSOR_HEAD);
    assert_eq!(handle_query(&bus, "MS\r\n"), "MS,03,+100000000\r\n");
    amp.clear_error();
    bus.stop_workers();
}

#[test]
fn test_laser_stop_invalidates_judgment() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    amp.set_raw_value(Some(1.0));
    handle_query(&bus, "SW,01,100,+000000001\r\n"); // emission stop
    assert_eq!(handle_query(&bus, "SR,01,050\r\n"), "SR,01,050,+000000001\r\n");
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,-000099998\r\n");
    assert_eq!(handle_query(&bus, "M0\r\n"), "M0,-099999998\r\n");
    handle_query(&bus, "SW,01,100,+000000000\r\n");
    assert_eq!(handle_query(&bus, "SR,01,050\r\n"), "SR,01,050,+000000000\r\n");
    bus.stop_workers();
}

#[test]
fn test_range_sentinels_on_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    amp.set_raw_value(Some(500.0));
    assert_eq!(handle_query(&bus, "M0\r\n"), "M0,+099999999\r\n");
    // Under-range shares the over-range sentinel on the bus interface.
    amp.set_raw_value(Some(-500.0));
    assert_eq!(handle_query(&bus, "M0\r\n"), "M0,+099999999\r\n");
    // Register 037 keeps the distinct clamp values.
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,-000099999\r\n");
    bus.stop_workers();
}

#[test]
fn test_reversed_direction_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,131,+000000001\r\n");
    amp.set_raw_value(Some(2.0));
    assert_eq!(handle_query(&bus, "SR,01,038\r\n"), "SR,01,038,-000002000\r\n");
    bus.stop_workers();
}

#[test]
fn test_auto_peak_hold_over_the_wire() {
    let bus = quiet_bus(1);
    let amp = &bus.sensors()[0];
    handle_query(&bus, "SW,01,136,+000000004\r\n"); // auto peak hold
    handle_query(&bus, "SW,01,137,+000001000\r\n"); // trigger at 1.000
    for raw in [2.0, 5.0, 3.0] {
        amp.set_raw_value(Some(raw));
    }
    // Dropping below the trigger ends the period and publishes the peak.
    amp.set_raw_value(Some(0.5));
    assert_eq!(handle_query(&bus, "SR,01,037\r\n"), "SR,01,037,+000005000\r\n");
    bus.stop_workers();
}
