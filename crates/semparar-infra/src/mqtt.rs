//! MQTT transport over rumqttc.
//!
//! One connection serves both directions: the [`MqttTransport`] handle
//! publishes (QoS 1), and a pump task drives the event loop, decoding every
//! incoming publish under `semparar/#` into an [`InboundEnvelope`] on the
//! broadcast bus. Payloads that are not JSON are logged and dropped, the
//! same as the original client behaved.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use semparar_core::bus::InboundBus;
use semparar_core::channel::Transport;
use semparar_types::config::BusSettings;
use semparar_types::error::{ChannelError, ConfigError};
use tokio::task::JoinHandle;

/// Everything under the service namespace.
const SUBSCRIPTION: &str = "semparar/#";

const CLIENT_ID: &str = "semparar-reports";
const CHANNEL_CAPACITY: usize = 64;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Publish handle over the shared MQTT connection. Cheap to clone.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
}

impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| ChannelError::Publish(e.to_string()))
    }
}

/// Connect to the broker, subscribe to the service namespace, and start
/// the inbound pump. Returns the publish handle and the pump task.
pub async fn connect(
    settings: &BusSettings,
    bus: InboundBus,
) -> Result<(MqttTransport, JoinHandle<()>), ChannelError> {
    let (host, port) = parse_address(&settings.address)
        .map_err(|e| ChannelError::Connect(e.to_string()))?;

    let mut options = MqttOptions::new(CLIENT_ID, host, port);
    options.set_credentials(&settings.username, &settings.password);

    let (client, eventloop) = AsyncClient::new(options, CHANNEL_CAPACITY);
    client
        .subscribe(SUBSCRIPTION, QoS::AtLeastOnce)
        .await
        .map_err(|e| ChannelError::Connect(e.to_string()))?;
    tracing::info!(subscription = SUBSCRIPTION, "listening on the bus");

    let pump = spawn_pump(eventloop, bus);
    Ok((MqttTransport { client }, pump))
}

/// Drive the event loop forever, fanning incoming publishes out on the
/// broadcast bus. rumqttc reconnects on the next poll after an error; a
/// short backoff keeps a dead broker from spinning the loop.
fn spawn_pump(mut eventloop: EventLoop, bus: InboundBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match serde_json::from_slice(&publish.payload) {
                        Ok(payload) => {
                            tracing::debug!(topic = %publish.topic, "inbound message");
                            bus.publish(semparar_types::message::InboundEnvelope {
                                topic: publish.topic.clone(),
                                payload,
                            });
                        }
                        Err(err) => {
                            tracing::warn!(topic = %publish.topic, %err, "dropping non-JSON payload");
                        }
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("connected to the bus");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(%err, "bus connection error, reconnecting");
                    tokio::time::sleep(RECONNECT_BACKOFF).await;
                }
            }
        }
    })
}

/// Accepts `host:port`, with an optional `mqtt://` or `tcp://` scheme.
/// Port defaults to 1883.
fn parse_address(address: &str) -> Result<(String, u16), ConfigError> {
    let bare = address
        .strip_prefix("mqtt://")
        .or_else(|| address.strip_prefix("tcp://"))
        .unwrap_or(address);

    let (host, port) = match bare.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| ConfigError::InvalidVar {
                var: crate::settings::MQTT_ADDRESS,
                reason: format!("invalid port in '{address}'"),
            })?;
            (host, port)
        }
        None => (bare, 1883),
    };

    if host.is_empty() {
        return Err(ConfigError::InvalidVar {
            var: crate::settings::MQTT_ADDRESS,
            reason: format!("empty host in '{address}'"),
        });
    }

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_host_and_port() {
        assert_eq!(
            parse_address("broker.local:1884").unwrap(),
            ("broker.local".to_string(), 1884)
        );
    }

    #[test]
    fn strips_mqtt_scheme() {
        assert_eq!(
            parse_address("mqtt://broker.local:1883").unwrap(),
            ("broker.local".to_string(), 1883)
        );
    }

    #[test]
    fn port_defaults_to_1883() {
        assert_eq!(
            parse_address("tcp://broker.local").unwrap(),
            ("broker.local".to_string(), 1883)
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(parse_address("broker.local:abc").is_err());
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(parse_address(":1883").is_err());
    }
}
