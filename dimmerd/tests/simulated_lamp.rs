use adapter_sdk::runtime::AdapterContext;
use dimmerd::{config::Config, wiring::start};
use hub_core::{
    bus::{Bus, Message},
    bus_contract::{StateUpdate, state_topic},
    cap::light::{Brightness, LightCommand},
    model::EntityId,
};
use serde_json::json;
use tokio::time::{Duration, timeout};
use tokio_stream::{Stream, StreamExt};

fn simulated_config(delays: Option<(&str, &str)>) -> Config {
    Config::from_lookup(|key: &str| match (key, delays) {
        ("DIMMER_SIMULATE", _) => Some("1".into()),
        ("DIMMER_NAME", _) => Some("Demo Lamp".into()),
        ("DIMMER_TOGGLE_DELAY_SEC", Some((toggle, _))) => Some(toggle.into()),
        ("DIMMER_SETTLING_DELAY_SEC", Some((_, settling))) => Some(settling.into()),
        _ => None,
    })
    .unwrap()
}

async fn request(ctx: &AdapterContext, light: EntityId, level: u8) {
    ctx.send_command(light, LightCommand::SetBrightness { level: Brightness(level) }.into())
        .await
        .unwrap();
}

async fn wait_for_brightness(
    states: &mut (impl Stream<Item = Message> + Unpin),
    level: u8,
) -> StateUpdate {
    timeout(Duration::from_secs(60), async {
        while let Some(msg) = states.next().await {
            let update: StateUpdate = serde_json::from_slice(&msg.payload).unwrap();
            if update.attributes.get("brightness") == Some(&json!(level)) {
                return update;
            }
        }
        panic!("state stream closed");
    })
    .await
    .unwrap_or_else(|_| panic!("lamp never reached brightness {level}"))
}

async fn reaches_brightness_127(cfg: Config) {
    let running = start(&cfg).await.unwrap();
    let bus = running.bus();
    let mut states = bus.subscribe(&state_topic(cfg.entity_id)).await.unwrap();
    let ctx = AdapterContext::new(bus);

    request(&ctx, cfg.entity_id, 127).await;
    let reached = wait_for_brightness(&mut states, 127).await;

    assert_eq!(reached.attributes["power_w"], json!(25.0));
    assert_eq!(running.light().controller().current_brightness(), 127);
    running.shutdown();
}

#[tokio::test(start_paused = true)]
async fn simulated_lamp_reaches_requested_brightness() {
    reaches_brightness_127(simulated_config(None)).await;
}

#[tokio::test(start_paused = true)]
async fn slow_toggles_still_reach_requested_brightness() {
    reaches_brightness_127(simulated_config(Some(("1.5", "4")))).await;
}

#[tokio::test(start_paused = true)]
async fn short_settling_forgets_step_after_turn_off() {
    let cfg = simulated_config(Some(("0.1", "0.4")));
    let running = start(&cfg).await.unwrap();
    let bus = running.bus();
    let mut states = bus.subscribe(&state_topic(cfg.entity_id)).await.unwrap();
    let ctx = AdapterContext::new(bus);

    request(&ctx, cfg.entity_id, 191).await;
    wait_for_brightness(&mut states, 191).await;
    request(&ctx, cfg.entity_id, 0).await;
    wait_for_brightness(&mut states, 0).await;

    // Back on from step 1, not from the step after 3.
    request(&ctx, cfg.entity_id, 127).await;
    let reached = wait_for_brightness(&mut states, 127).await;
    assert_eq!(reached.attributes["power_w"], json!(25.0));
    running.shutdown();
}

#[tokio::test(start_paused = true)]
async fn simulation_rejects_toggle_delay_past_settling() {
    let cfg = simulated_config(Some(("2", "1")));
    let err = start(&cfg).await.err().expect("start should fail");
    assert!(err.to_string().contains("settling delay"), "{err}");
}
