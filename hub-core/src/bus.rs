use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
}

#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;
    async fn subscribe(
        &self,
        pattern: &str,
    ) -> Result<Box<dyn Stream<Item = Message> + Unpin + Send>>;
}

#[derive(Clone)]
pub struct InMemoryBus {
    tx: Arc<broadcast::Sender<Message>>,
}

impl InMemoryBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx: Arc::new(tx) }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        // No subscribers is not an error on a fire-and-forget bus.
        let _ = self.tx.send(Message { topic: topic.to_string(), payload });
        Ok(())
    }

    async fn subscribe(
        &self,
        pattern: &str,
    ) -> Result<Box<dyn Stream<Item = Message> + Unpin + Send>> {
        Ok(Box::new(filter_broadcast(self.tx.subscribe(), pattern)))
    }
}

/// Turns a broadcast receiver into a stream of messages whose topic matches `pattern`.
/// Lagged receivers skip the dropped messages and keep going.
pub fn filter_broadcast(
    rx: broadcast::Receiver<Message>,
    pattern: &str,
) -> impl Stream<Item = Message> + Unpin + Send + 'static {
    let pattern = pattern.to_string();
    BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(msg) if topic_matches(&pattern, &msg.topic) => Some(msg),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(pattern = %pattern, skipped, "bus subscriber lagged");
            None
        }
    })
}

/// `*` matches everything, `a.b.*` matches `a.b` and anything below it,
/// a trailing `*` is a plain prefix match.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "*" || pattern == topic {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return topic == prefix
            || topic.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('.'));
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return topic.starts_with(prefix);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    #[test]
    fn wildcard_patterns() {
        assert!(topic_matches("*", "hub.state.update.x"));
        assert!(topic_matches("hub.state.*", "hub.state"));
        assert!(topic_matches("hub.state.*", "hub.state.update.x"));
        assert!(!topic_matches("hub.state.*", "hub.statement"));
        assert!(topic_matches("hub.command.*", "hub.command.abc"));
        assert!(topic_matches("hub.comm*", "hub.command.abc"));
        assert!(!topic_matches("hub.command.abc", "hub.command.abcd"));
    }

    #[tokio::test]
    async fn subscribers_only_see_matching_topics() -> Result<()> {
        let bus = InMemoryBus::default();
        let mut sub = bus.subscribe("hub.state.*").await?;

        bus.publish("hub.command.x", Bytes::from_static(b"ignored")).await?;
        bus.publish("hub.state.update.x", Bytes::from_static(b"42")).await?;

        let msg = timeout(Duration::from_millis(200), sub.next())
            .await
            .expect("message not received")
            .expect("stream closed");
        assert_eq!(msg.topic, "hub.state.update.x");
        assert_eq!(msg.payload, Bytes::from_static(b"42"));
        Ok(())
    }

    #[tokio::test]
    async fn lagged_subscriber_keeps_receiving() -> Result<()> {
        let bus = InMemoryBus::with_capacity(2);
        let mut sub = bus.subscribe("t").await?;

        for i in 0..5u8 {
            bus.publish("t", Bytes::from(vec![i])).await?;
        }

        let msg = timeout(Duration::from_millis(200), sub.next())
            .await
            .expect("message not received")
            .expect("stream closed");
        assert_eq!(msg.payload, Bytes::from(vec![3u8]));
        Ok(())
    }
}
