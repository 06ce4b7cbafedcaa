//! Registry change events
//!
//! The wire format is the gateway's JSON:
//! `{"eventType": "REGISTERED", "backendInfo": {"id": ..., "displayName": ...}}`.
//! Unknown tags still decode; rejecting them is the reconciler's job so the
//! offending tag can be reported as a protocol violation.

use serde::{Deserialize, Serialize};

use super::backend::Backend;

/// Kind of registry change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegistryEventType {
    Registered,
    Unregistered,
    /// Any tag outside the protocol, kept verbatim
    Unrecognized(String),
}

impl RegistryEventType {
    pub fn as_str(&self) -> &str {
        match self {
            RegistryEventType::Registered => "REGISTERED",
            RegistryEventType::Unregistered => "UNREGISTERED",
            RegistryEventType::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for RegistryEventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "REGISTERED" => RegistryEventType::Registered,
            "UNREGISTERED" => RegistryEventType::Unregistered,
            _ => RegistryEventType::Unrecognized(tag),
        }
    }
}

impl From<RegistryEventType> for String {
    fn from(event_type: RegistryEventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl std::fmt::Display for RegistryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event from the registry feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendChangeEvent {
    pub event_type: RegistryEventType,
    pub backend_info: Backend,
}

impl BackendChangeEvent {
    /// A backend announced itself
    pub fn registered(backend: Backend) -> Self {
        Self {
            event_type: RegistryEventType::Registered,
            backend_info: backend,
        }
    }

    /// A backend went away
    pub fn unregistered(backend: Backend) -> Self {
        Self {
            event_type: RegistryEventType::Unregistered,
            backend_info: backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendId;

    #[test]
    fn test_event_decodes_known_tags() {
        let json = r#"{"eventType":"REGISTERED","backendInfo":{"id":"1","displayName":"A"}}"#;
        let event: BackendChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, RegistryEventType::Registered);
        assert_eq!(event.backend_info.id, BackendId::from("1"));

        let json = r#"{"eventType":"UNREGISTERED","backendInfo":{"id":"1","displayName":"A"}}"#;
        let event: BackendChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, RegistryEventType::Unregistered);
    }

    #[test]
    fn test_event_keeps_unknown_tag() {
        let json = r#"{"eventType":"SUSPENDED","backendInfo":{"id":"1","displayName":"A"}}"#;
        let event: BackendChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, RegistryEventType::Unrecognized("SUSPENDED".to_string()));
        assert_eq!(event.event_type.to_string(), "SUSPENDED");
    }

    #[test]
    fn test_event_serializes_tag_verbatim() {
        let event = BackendChangeEvent::unregistered(Backend::new("9", "Nine"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""eventType":"UNREGISTERED""#));
        assert!(json.contains("backendInfo"));
    }
}
