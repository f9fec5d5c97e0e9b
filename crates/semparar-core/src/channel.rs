//! Correlation channel: request/response matching over the pub/sub bus.
//!
//! Outbound notifications go out on the fixed [`OUTBOUND_TOPIC`]. When a
//! notification carries interactive actions, the channel registers a
//! one-shot observer on the broadcast stream and resolves with the first
//! inbound envelope whose topic equals the derived reply topic
//! (`semparar/<tag><group><message>`, empty-string defaults, no
//! separators). The derivation rule is wire protocol: the human-facing
//! client reproduces the same concatenation to answer.

use std::time::Duration;

use semparar_types::error::ChannelError;
use semparar_types::message::{Notification, OutboundMessage, OUTBOUND_TOPIC, TOPIC_NAMESPACE};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::error::RecvError;

use crate::bus::InboundBus;

/// How long a correlated reply may take before the waiter fails.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

/// Raw publish seam over the bus. `semparar-infra` implements this with
/// rumqttc; tests use in-memory fakes.
pub trait Transport: Send + Sync {
    /// Publish a serialized payload on the given topic. Side effect only.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;
}

/// Derive the reply topic a client answers an interactive notification on.
///
/// Exact concatenation of `tag`, `group`, and the message text under the
/// topic namespace. Two notifications collide only if the concatenation is
/// literally identical.
pub fn reply_topic(notification: &Notification) -> String {
    format!(
        "{TOPIC_NAMESPACE}{}{}{}",
        notification.data.tag.as_deref().unwrap_or(""),
        notification.data.group.as_deref().unwrap_or(""),
        notification.message,
    )
}

/// Publishes outbound notifications and awaits correlated replies.
///
/// Generic over the [`Transport`] so the workflow and its tests never touch
/// a real broker.
pub struct CorrelationChannel<T> {
    transport: T,
    inbound: InboundBus,
}

impl<T: Clone> Clone for CorrelationChannel<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            inbound: self.inbound.clone(),
        }
    }
}

impl<T: Transport> CorrelationChannel<T> {
    pub fn new(transport: T, inbound: InboundBus) -> Self {
        Self { transport, inbound }
    }

    /// Serialize and publish a message on [`OUTBOUND_TOPIC`]. Does not wait.
    pub async fn publish(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let payload =
            serde_json::to_vec(message).map_err(|e| ChannelError::Publish(e.to_string()))?;
        self.transport.publish(OUTBOUND_TOPIC, payload).await
    }

    /// Publish a message and, if it declares actions, await the correlated
    /// reply.
    ///
    /// - `actions` empty: publishes and resolves `Ok(None)` immediately,
    ///   without registering an observer.
    /// - `actions` non-empty: subscribes to the broadcast stream *before*
    ///   publishing (a reply cannot slip past the waiter), then resolves
    ///   with the first envelope whose topic equals the derived reply
    ///   topic, decoded to `R`. Envelopes on other topics are ignored.
    ///
    /// The observer is deregistered on every exit path: match, decode
    /// failure, and timeout all drop the broadcast receiver.
    pub async fn send_and_await<R: DeserializeOwned>(
        &self,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> Result<Option<R>, ChannelError> {
        if message.notification.data.actions.is_empty() {
            self.publish(message).await?;
            return Ok(None);
        }

        let expected = reply_topic(&message.notification);
        let mut rx = self.inbound.subscribe();
        self.publish(message).await?;

        tracing::debug!(topic = %expected, "awaiting correlated reply");

        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(envelope) if envelope.topic == expected => {
                        return serde_json::from_value::<R>(envelope.payload)
                            .map_err(|e| ChannelError::Decode(e.to_string()));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "correlation waiter lagged behind the bus");
                        continue;
                    }
                    Err(RecvError::Closed) => return Err(ChannelError::Closed),
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result.map(Some),
            Err(_) => Err(ChannelError::Timeout(timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use semparar_types::message::{
        Action, ActionKind, ActionResponse, InboundEnvelope, NotificationData,
    };

    use super::*;

    /// Records publishes; optionally fails them all.
    #[derive(Clone, Default)]
    struct RecordingTransport {
        published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        fail: bool,
    }

    impl Transport for RecordingTransport {
        async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
            if self.fail {
                return Err(ChannelError::Publish("broker unavailable".to_string()));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload));
            Ok(())
        }
    }

    fn interactive_message(tag: &str, text: &str) -> OutboundMessage {
        OutboundMessage {
            topic: "semparar/sendReportsToEmail".to_string(),
            notification: Notification {
                title: "Sem Parar".to_string(),
                message: text.to_string(),
                data: NotificationData {
                    tag: Some(tag.to_string()),
                    actions: vec![Action {
                        action: ActionKind::Reply,
                        title: "Resolver".to_string(),
                    }],
                    ..NotificationData::default()
                },
            },
        }
    }

    fn plain_message(text: &str) -> OutboundMessage {
        OutboundMessage {
            topic: "semparar/sendReportsToEmail".to_string(),
            notification: Notification {
                title: "Sem Parar".to_string(),
                message: text.to_string(),
                data: NotificationData::default(),
            },
        }
    }

    #[test]
    fn reply_topic_concatenates_without_separators() {
        let message = interactive_message("semparar-sendReportsToEmail", "Resolva a captcha");
        assert_eq!(
            reply_topic(&message.notification),
            "semparar/semparar-sendReportsToEmailResolva a captcha"
        );
    }

    #[test]
    fn reply_topic_defaults_missing_fields_to_empty() {
        let message = plain_message("Resolva a captcha");
        assert_eq!(reply_topic(&message.notification), "semparar/Resolva a captcha");
    }

    #[tokio::test]
    async fn empty_actions_resolves_none_without_observer() {
        let bus = InboundBus::new(16);
        let transport = RecordingTransport::default();
        let channel = CorrelationChannel::new(transport.clone(), bus.clone());

        let result: Option<ActionResponse> = channel
            .send_and_await(&plain_message("status"), REPLY_TIMEOUT)
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(bus.observer_count(), 0);
        // The publish itself still happened, on the fixed outbound topic.
        let published = transport.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, OUTBOUND_TOPIC);
    }

    #[tokio::test]
    async fn matching_reply_resolves_the_waiter() {
        let bus = InboundBus::new(16);
        let channel = CorrelationChannel::new(RecordingTransport::default(), bus.clone());
        let message = interactive_message("tag", "Resolva a captcha");
        let topic = reply_topic(&message.notification);

        let reply_bus = bus.clone();
        let waiter = tokio::spawn(async move {
            channel
                .send_and_await::<ActionResponse>(&message, REPLY_TIMEOUT)
                .await
        });

        // Let the waiter subscribe and publish first.
        tokio::task::yield_now().await;
        reply_bus.publish(InboundEnvelope {
            topic,
            payload: serde_json::json!({"action": "REPLY", "text": "abc123"}),
        });

        let response = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(response.action, ActionKind::Reply);
        assert_eq!(response.text.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn non_matching_traffic_is_ignored_until_the_match() {
        let bus = InboundBus::new(16);
        let channel = CorrelationChannel::new(RecordingTransport::default(), bus.clone());
        let message = interactive_message("tag", "Resolva a captcha");
        let topic = reply_topic(&message.notification);

        let reply_bus = bus.clone();
        let waiter = tokio::spawn(async move {
            channel
                .send_and_await::<ActionResponse>(&message, REPLY_TIMEOUT)
                .await
        });

        tokio::task::yield_now().await;
        reply_bus.publish(InboundEnvelope {
            topic: "semparar/unrelated".to_string(),
            payload: serde_json::json!({"noise": true}),
        });
        reply_bus.publish(InboundEnvelope {
            topic,
            payload: serde_json::json!({"action": "CANCEL"}),
        });

        let response = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(response.action, ActionKind::Cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fails_and_leaves_no_residual_observer() {
        let bus = InboundBus::new(16);
        let channel = CorrelationChannel::new(RecordingTransport::default(), bus.clone());
        let message = interactive_message("tag", "Resolva a captcha");

        let result = channel
            .send_and_await::<ActionResponse>(&message, REPLY_TIMEOUT)
            .await;

        assert!(matches!(result, Err(ChannelError::Timeout(120))));
        // The observer must be gone; later matching traffic has nobody to
        // spuriously resolve.
        assert_eq!(bus.observer_count(), 0);
    }

    #[tokio::test]
    async fn publish_failure_surfaces_immediately() {
        let bus = InboundBus::new(16);
        let transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };
        let channel = CorrelationChannel::new(transport, bus);

        let result = channel.publish(&plain_message("status")).await;
        assert!(matches!(result, Err(ChannelError::Publish(_))));
    }

    #[tokio::test]
    async fn malformed_reply_payload_is_a_decode_error() {
        let bus = InboundBus::new(16);
        let channel = CorrelationChannel::new(RecordingTransport::default(), bus.clone());
        let message = interactive_message("tag", "Resolva a captcha");
        let topic = reply_topic(&message.notification);

        let reply_bus = bus.clone();
        let waiter = tokio::spawn(async move {
            channel
                .send_and_await::<ActionResponse>(&message, REPLY_TIMEOUT)
                .await
        });

        tokio::task::yield_now().await;
        reply_bus.publish(InboundEnvelope {
            topic,
            payload: serde_json::json!("not an object"),
        });

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ChannelError::Decode(_))));
    }
}
