use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved sender identity for input that originates outside the system.
pub const EXTERNAL_SENDER: &str = "external";

/// Origin kind of an envelope.
///
/// Classifies where an envelope came from; participants branch on it,
/// the router never interprets it.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Delivery target of an envelope.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    /// A specific participant, by identity.
    Participant { identity: String },
    /// Every registered participant except the sender.
    Broadcast,
}

impl Recipient {
    pub fn to(identity: impl Into<String>) -> Self {
        Self::Participant {
            identity: identity.into(),
        }
    }

    /// The target identity, if this is a direct recipient.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Participant { identity } => Some(identity),
            Self::Broadcast => None,
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Participant { identity } => write!(f, "{}", identity),
            Self::Broadcast => write!(f, "[ALL]"),
        }
    }
}

/// Envelope payload: free text or a structured mapping.
///
/// Opaque to the router; only participants interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Data(serde_json::Value),
}

impl Payload {
    /// The `action` field used for dispatch, if the payload carries one.
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Data(value) => value.get("action").and_then(|v| v.as_str()),
        }
    }

    /// A named field of a structured payload.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        match self {
            Self::Text(_) => None,
            Self::Data(value) => value.get(key),
        }
    }

    /// The payload as a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Text(text) => serde_json::Value::String(text.clone()),
            Self::Data(value) => value.clone(),
        }
    }

    /// Render the payload as text.
    ///
    /// Text payloads come back verbatim. Structured payloads render as
    /// pretty-printed JSON, which is deterministic per payload value
    /// (serde_json maps iterate in key order).
    pub fn render_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Data(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Data(value)
    }
}

/// One unit of inter-participant communication.
///
/// Immutable once constructed: routing an envelope never mutates it, only
/// produces new envelopes. `created_at` is informational; ordering comes
/// from insertion order into the router's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique id, generated at construction.
    pub id: String,
    /// Identity of the producing participant, or [`EXTERNAL_SENDER`].
    pub sender: String,
    /// Origin kind.
    pub role: Role,
    /// Delivery target.
    pub recipient: Recipient,
    /// Message content.
    pub payload: Payload,
    /// Construction timestamp.
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(
        sender: impl Into<String>,
        role: Role,
        recipient: Recipient,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            role,
            recipient,
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    /// An assistant envelope addressed to one participant.
    pub fn direct(
        sender: impl Into<String>,
        to: impl Into<String>,
        payload: impl Into<Payload>,
    ) -> Self {
        Self::new(sender, Role::Assistant, Recipient::to(to), payload)
    }

    /// An assistant envelope addressed to everyone but the sender.
    pub fn broadcast(sender: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::new(sender, Role::Assistant, Recipient::Broadcast, payload)
    }

    /// The initial user envelope carrying raw external input.
    pub fn external(to: impl Into<String>, input: impl Into<Payload>) -> Self {
        Self::new(EXTERNAL_SENDER, Role::User, Recipient::to(to), input)
    }

    /// The payload's dispatch action, if any.
    pub fn action(&self) -> Option<&str> {
        self.payload.action()
    }

    /// Render the payload as text.
    pub fn render_text(&self) -> String {
        self.payload.render_text()
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] [{}] {} → {}",
            self.created_at.format("%H:%M:%S%.3f"),
            self.id.get(..8).unwrap_or(&self.id),
            self.sender,
            self.recipient
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_renders_verbatim() {
        let env = Envelope::external("Coordinator", "plan a trip");
        assert_eq!(env.render_text(), "plan a trip");
        assert_eq!(env.action(), None);
    }

    #[test]
    fn test_structured_payload_action() {
        let env = Envelope::direct(
            "A",
            "B",
            serde_json::json!({ "action": "ping", "detail": 1 }),
        );
        assert_eq!(env.action(), Some("ping"));
        assert_eq!(env.payload.field("detail"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_structured_payload_renders_deterministically() {
        let payload = Payload::Data(serde_json::json!({ "b": 2, "a": 1 }));
        let first = payload.render_text();
        let second = payload.render_text();
        assert_eq!(first, second);
        assert!(first.contains("\"a\""));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Envelope::external("X", "hi");
        let b = Envelope::external("X", "hi");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_external_sender_and_role() {
        let env = Envelope::external("Coordinator", "hi");
        assert_eq!(env.sender, EXTERNAL_SENDER);
        assert_eq!(env.role, Role::User);
        assert_eq!(env.recipient.identity(), Some("Coordinator"));
    }

    #[test]
    fn test_display_includes_sender_and_target() {
        let env = Envelope::broadcast("Coordinator", "done");
        let rendered = env.to_string();
        assert!(rendered.contains("Coordinator"));
        assert!(rendered.contains("[ALL]"));
    }

    #[test]
    fn test_display_tolerates_short_ids() {
        // Ids shorter than the truncation width can arrive via
        // deserialized external envelopes.
        let mut env = Envelope::broadcast("A", "hi");
        env.id = "tiny".to_string();
        assert!(env.to_string().contains("tiny"));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let env = Envelope::direct("A", "B", serde_json::json!({ "action": "pong" }));
        let json = serde_json::to_string(&env).unwrap();
        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, env.id);
        assert_eq!(parsed.action(), Some("pong"));
        assert_eq!(parsed.recipient, Recipient::to("B"));
    }
}
