use hub_core::{
    bus_contract::CommandSet,
    cap::switch::{SwitchCommand, SwitchDescription, SwitchFeatures},
    model::EntityId,
};
use serde_json::json;

#[test]
fn commands_round_trip_through_commandset() {
    for cmd in [SwitchCommand::Toggle, SwitchCommand::Set { on: true }, SwitchCommand::TURN_OFF] {
        let cs: CommandSet = cmd.into();
        assert_eq!(SwitchCommand::try_from(&cs), Ok(cmd));
    }
}

#[test]
fn set_accepts_bare_boolean_value() {
    let cs = CommandSet { action: "set".into(), value: json!(true), correlation_id: None };
    assert_eq!(SwitchCommand::try_from(&cs), Ok(SwitchCommand::Set { on: true }));
}

#[test]
fn rejects_unknown_actions_and_missing_values() {
    let cs = CommandSet { action: "dim".into(), value: json!(null), correlation_id: None };
    assert!(SwitchCommand::try_from(&cs).is_err());

    let cs = CommandSet { action: "set".into(), value: json!({}), correlation_id: None };
    assert!(SwitchCommand::try_from(&cs).is_err());
}

#[test]
fn command_names_match_host_services() {
    assert_eq!(SwitchCommand::Toggle.name(), "toggle");
    assert_eq!(SwitchCommand::TURN_OFF.name(), "turn_off");
    assert_eq!(SwitchCommand::Set { on: true }.name(), "turn_on");
}

#[test]
fn toggle_requires_toggle_feature() {
    let d = SwitchDescription { entity_id: EntityId::new(), features: SwitchFeatures::ONOFF };
    assert!(d.validate(&SwitchCommand::TURN_OFF).is_ok());
    assert!(d.validate(&SwitchCommand::Toggle).is_err());

    let d = SwitchDescription {
        entity_id: EntityId::new(),
        features: SwitchFeatures::ONOFF | SwitchFeatures::TOGGLE,
    };
    assert!(d.validate(&SwitchCommand::Toggle).is_ok());
}
