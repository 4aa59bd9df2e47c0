use hub_core::cap::sensor::PowerReading;
use serde_json::json;

#[test]
fn decodes_numbers_and_numeric_strings() {
    assert_eq!(PowerReading::from_state_value(&json!(42.5)), Ok(PowerReading::Watts(42.5)));
    assert_eq!(PowerReading::from_state_value(&json!(10)), Ok(PowerReading::Watts(10.0)));
    assert_eq!(PowerReading::from_state_value(&json!(" 25.0 ")), Ok(PowerReading::Watts(25.0)));
    assert_eq!(PowerReading::from_state_value(&json!("-3")), Ok(PowerReading::Watts(-3.0)));
}

#[test]
fn no_reading_markers_decode_to_unknown() {
    for value in [json!(null), json!("unknown"), json!("Unavailable"), json!(""), json!("none")] {
        assert_eq!(PowerReading::from_state_value(&value), Ok(PowerReading::Unknown), "{value}");
    }
}

#[test]
fn garbage_is_rejected() {
    let values =
        [json!("on"), json!(true), json!([1, 2]), json!({"w": 1}), json!("NaN"), json!("inf")];
    for value in values {
        assert!(PowerReading::from_state_value(&value).is_err(), "{value}");
    }
}

#[test]
fn state_value_round_trips() {
    for reading in [PowerReading::Unknown, PowerReading::Watts(12.5)] {
        assert_eq!(PowerReading::from_state_value(&reading.to_state_value()), Ok(reading));
    }
    assert_eq!(PowerReading::Watts(3.0).watts(), Some(3.0));
    assert_eq!(PowerReading::Unknown.watts(), None);
}
