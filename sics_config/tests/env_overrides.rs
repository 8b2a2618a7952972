use sics_config::Config;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn overrides_apply_to_matching_fields() {
    let mut cfg = Config::default();
    cfg.apply_env(lookup(&[
        ("TTY", "/dev/ttyACM0"),
        ("BAUDRATE", "9600"),
        ("METER_POLL_MS", "500"),
        ("MQTT_DEVICE_ID", "WT0001B"),
    ]));
    assert_eq!(cfg.serial.port, "/dev/ttyACM0");
    assert_eq!(cfg.serial.baud_rate, 9600);
    assert_eq!(cfg.timing.meas_poll_ms, 500);
    assert_eq!(cfg.device.device_id, "WT0001B");
    cfg.validate().expect("overridden config stays valid");
}

#[test]
fn numeric_overrides_are_clamped() {
    let mut cfg = Config::default();
    cfg.apply_env(lookup(&[("BAUDRATE", "1000000"), ("METER_POLL_MS", "10")]));
    assert_eq!(cfg.serial.baud_rate, 115_200);
    assert_eq!(cfg.timing.meas_poll_ms, 200);
}

#[test]
fn garbage_overrides_fall_back_to_defaults() {
    let mut cfg = Config::default();
    cfg.serial.baud_rate = 9600;
    cfg.apply_env(lookup(&[("BAUDRATE", "fast"), ("TTY", "   ")]));
    assert_eq!(cfg.serial.baud_rate, 38_400);
    assert_eq!(cfg.serial.port, "/dev/ttyUSB0");
}

#[test]
fn absent_variables_leave_config_untouched() {
    let mut cfg = Config::default();
    cfg.timing.meas_poll_ms = 1200;
    cfg.apply_env(|_| None);
    assert_eq!(cfg.timing.meas_poll_ms, 1200);
}
