use hub_core::{
    bus_contract::CommandSet,
    cap::light::{Brightness, LightCommand, LightDescription, LightFeatures, LightState, Power},
    model::EntityId,
};
use serde_json::json;

fn dimmable(steps: Option<u32>) -> LightDescription {
    LightDescription {
        entity_id: EntityId::new(),
        features: LightFeatures::ONOFF | LightFeatures::DIMMABLE,
        steps,
    }
}

#[test]
fn bitflags_bits_numeric_mask() {
    let f = LightFeatures::ONOFF | LightFeatures::DIMMABLE;
    assert_eq!(f.bits(), 0b0011);
    let json_num = serde_json::to_string(&f.bits()).unwrap();
    assert_eq!(json_num, "3");
}

#[test]
fn attributes_carry_features_and_steps() {
    let attrs = dimmable(Some(4)).attributes();
    assert_eq!(attrs.get("features"), Some(&json!(3)));
    assert_eq!(attrs.get("steps"), Some(&json!(4)));

    let attrs = dimmable(None).attributes();
    assert!(!attrs.contains_key("steps"));
}

#[test]
fn state_power_follows_brightness() {
    let on = LightState::from_brightness(Brightness(191), Some(50.0));
    assert_eq!(on.power, Power::On);
    assert!(on.is_on());
    assert_eq!(on.brightness, Some(Brightness(191)));

    let off = LightState::from_brightness(Brightness::OFF, Some(0.0));
    assert_eq!(off.power, Power::Off);
    assert_eq!(LightState::off().brightness, Some(Brightness(0)));
}

#[test]
fn command_conversion_to_commandset() {
    let cs: CommandSet = LightCommand::SetBrightness { level: Brightness(127) }.into();
    assert_eq!(cs.action, "set");
    assert_eq!(cs.value, json!({ "brightness": 127 }));

    let cs: CommandSet = LightCommand::Toggle.into();
    assert_eq!(cs.action, "toggle");
    assert!(cs.value.is_null());

    let cs: CommandSet = LightCommand::SetPower { on: false }.into();
    assert_eq!(cs.value, json!({ "on": false }));
}

#[test]
fn validation_blocks_dimming_on_plain_lights() {
    let plain = LightDescription {
        entity_id: EntityId::new(),
        features: LightFeatures::ONOFF,
        steps: None,
    };
    assert!(plain.validate(&LightCommand::SetPower { on: true }).is_ok());
    assert!(plain.validate(&LightCommand::Toggle).is_ok());
    assert!(plain.validate(&LightCommand::SetBrightness { level: Brightness(10) }).is_err());

    let set = LightCommand::SetBrightness { level: Brightness(10) };
    assert!(dimmable(Some(4)).validate(&set).is_ok());
}
