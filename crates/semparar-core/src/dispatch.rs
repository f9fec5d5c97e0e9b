//! Trigger dispatcher: routes inbound bus traffic to the supervisor.
//!
//! Consumes the broadcast stream; envelopes on the trigger topic become
//! supervisor calls, everything else is ignored here (correlation waiters
//! observe the same stream independently).

use semparar_types::config::ReportConfig;
use semparar_types::message::TRIGGER_TOPIC;
use tokio::sync::broadcast::error::RecvError;

use crate::bus::InboundBus;
use crate::channel::Transport;
use crate::supervisor::Supervisor;
use crate::ui::UiLauncher;

/// Decode a trigger payload. `null` means "clear the running instance,
/// start nothing".
pub fn decode_trigger(
    payload: serde_json::Value,
) -> Result<Option<ReportConfig>, serde_json::Error> {
    if payload.is_null() {
        return Ok(None);
    }
    serde_json::from_value(payload).map(Some)
}

/// Consume the bus until it closes, feeding triggers to the supervisor.
///
/// Malformed trigger payloads are logged and skipped; a lagged receiver
/// keeps going with whatever traffic is still buffered.
pub async fn run_dispatcher<T, L>(bus: &InboundBus, supervisor: &mut Supervisor<T, L>)
where
    T: Transport + Clone + 'static,
    L: UiLauncher + Clone + 'static,
{
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(envelope) if envelope.topic == TRIGGER_TOPIC => {
                match decode_trigger(envelope.payload) {
                    Ok(config) => supervisor.trigger(config).await,
                    Err(err) => {
                        tracing::warn!(%err, "ignoring malformed trigger payload");
                    }
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "dispatcher lagged behind the bus");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!("inbound stream closed, dispatcher stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_payload_decodes_to_none() {
        assert!(decode_trigger(serde_json::Value::Null).unwrap().is_none());
    }

    #[test]
    fn object_payload_decodes_to_config() {
        let config = decode_trigger(serde_json::json!({
            "username": "u",
            "password": "p",
            "emails": ["a@b.c"],
            "pastDays": 7
        }))
        .unwrap()
        .unwrap();
        assert_eq!(config.emails, vec!["a@b.c"]);
        assert_eq!(config.past_days(), 7);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(decode_trigger(serde_json::json!({"username": 42})).is_err());
    }
}
