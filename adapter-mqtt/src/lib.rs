//! MQTT transport for the hub bus. Every hub topic is published verbatim as
//! an MQTT topic, and everything the broker delivers on the configured
//! subscription is fanned out to local subscribers.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use hub_core::bus::{Bus, Message, filter_broadcast};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MqttBusOptions {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// MQTT filter subscribed on every (re)connect.
    pub subscription: String,
}

impl MqttBusOptions {
    pub fn new(host: impl Into<String>, port: u16, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: client_id.into(),
            keep_alive: Duration::from_secs(5),
            subscription: "#".into(),
        }
    }
}

#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    tx: Arc<broadcast::Sender<Message>>,
}

impl MqttBus {
    pub async fn connect(options: MqttBusOptions) -> Result<Self> {
        let mut opts = MqttOptions::new(&options.client_id, &options.host, options.port);
        opts.set_keep_alive(options.keep_alive);
        opts.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(opts, 64);
        client
            .subscribe(&options.subscription, QoS::AtLeastOnce)
            .await
            .context("queue mqtt subscription")?;

        let (tx, _rx) = broadcast::channel(1024);
        let tx = Arc::new(tx);
        let forwarder_tx = Arc::clone(&tx);
        let resubscribe = client.clone();
        let subscription = options.subscription.clone();
        let mut connected_once = false;

        info!(
            host = %options.host,
            port = options.port,
            client_id = %options.client_id,
            "connecting to mqtt broker"
        );
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(p))) => {
                        let _ = forwarder_tx.send(Message { topic: p.topic, payload: p.payload });
                    }
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("mqtt connected");
                        // A clean session forgets subscriptions across reconnects.
                        if connected_once {
                            let qos = QoS::AtLeastOnce;
                            if let Err(err) = resubscribe.try_subscribe(&subscription, qos) {
                                warn!("mqtt resubscribe failed: {err}");
                            }
                        }
                        connected_once = true;
                    }
                    Ok(event) => debug!(?event, "mqtt event"),
                    Err(err) => {
                        warn!("mqtt event loop error: {err}");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                }
            }
        });

        Ok(Self { client, tx })
    }
}

#[async_trait]
impl Bus for MqttBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .with_context(|| format!("publish mqtt message on {topic}"))
    }

    async fn subscribe(
        &self,
        pattern: &str,
    ) -> Result<Box<dyn Stream<Item = Message> + Unpin + Send>> {
        Ok(Box::new(filter_broadcast(self.tx.subscribe(), pattern)))
    }
}
