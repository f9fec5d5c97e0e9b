//! Wire-protocol message types for the MQTT bus.
//!
//! Field names, defaults, and the topic layout are protocol, not an
//! implementation detail: the human-facing client answers an interactive
//! notification on a topic derived from `tag`, `group`, and `message`, so
//! any change here must be mirrored by every bus consumer.

use serde::{Deserialize, Serialize};

/// Topic the service listens on for report triggers.
pub const TRIGGER_TOPIC: &str = "semparar/sendReportsToEmail";

/// Topic every outbound notification is published on.
pub const OUTBOUND_TOPIC: &str = "semparar/message";

/// Namespace prefix for derived reply topics.
pub const TOPIC_NAMESPACE: &str = "semparar/";

/// An outbound notification envelope, published verbatim (JSON) on
/// [`OUTBOUND_TOPIC`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub topic: String,
    pub notification: Notification,
}

/// Human-facing status/progress payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: NotificationData,
}

/// Notification metadata: progress, optional challenge image, and the
/// interactive actions the client may answer with.
///
/// A non-empty `actions` list signals "this message expects a reply".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Base64-encoded challenge image, when the notification carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub progress: u32,
    #[serde(default = "default_progress_max")]
    pub progress_max: u32,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub ttl: u32,
}

fn default_progress_max() -> u32 {
    100
}

fn default_priority() -> String {
    "high".to_string()
}

impl Default for NotificationData {
    fn default() -> Self {
        Self {
            tag: None,
            group: None,
            image: None,
            progress: 0,
            progress_max: default_progress_max(),
            actions: Vec::new(),
            priority: default_priority(),
            ttl: 0,
        }
    }
}

/// One interactive action offered by a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub action: ActionKind,
    pub title: String,
}

/// The action the human chose (or is offered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Reply,
    Cancel,
}

/// The human's answer to an interactive notification: which action was
/// chosen and, for `REPLY`, the free text (captcha solution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Envelope for anything the bus delivers inbound.
///
/// The payload stays a raw JSON value here; consumers decode it to their
/// own type once they have matched on the topic.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    pub topic: String,
    pub payload: serde_json::Value,
}
