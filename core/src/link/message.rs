use crate::prelude::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar value carried in a link payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl LinkValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LinkValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LinkValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LinkValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for LinkValue {
    fn from(value: bool) -> Self {
        LinkValue::Bool(value)
    }
}

impl From<f64> for LinkValue {
    fn from(value: f64) -> Self {
        LinkValue::Number(value)
    }
}

impl From<&str> for LinkValue {
    fn from(value: &str) -> Self {
        LinkValue::Text(value.to_string())
    }
}

impl From<String> for LinkValue {
    fn from(value: String) -> Self {
        LinkValue::Text(value)
    }
}

/// Key-value message exchanged with the paired device.
pub type Payload = BTreeMap<String, LinkValue>;

/// Builds a payload from `(key, value)` pairs.
pub fn payload<K, V, I>(entries: I) -> Payload
where
    K: Into<String>,
    V: Into<LinkValue>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Messages the wearable sends to its peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Monitoring(bool),
    Shot { timestamp: f64 },
    TestResponse,
    Pong,
    /// Reply to an inbound message that asked for one.
    Received,
}

impl Notification {
    pub fn into_payload(self) -> Payload {
        match self {
            Notification::Monitoring(active) => payload([("monitoring", active)]),
            Notification::Shot { timestamp } => {
                let mut message = payload([("shotDetected", true)]);
                message.insert("timestamp".into(), LinkValue::Number(timestamp));
                message
            }
            Notification::TestResponse => {
                let mut message = payload([("testResponse", true)]);
                message.insert("status".into(), "ok".into());
                message
            }
            Notification::Pong => {
                let mut message = payload([("pong", true)]);
                message.insert("status".into(), "ok".into());
                message
            }
            Notification::Received => payload([("status", "received")]),
        }
    }
}

/// Inbound command decoded from its `action` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartMonitoring,
    StopMonitoring,
    SessionStatus { is_active: bool },
    Test,
    Ping,
    Unknown(String),
}

impl Command {
    pub fn parse(message: &Payload) -> MonitorResult<Self> {
        let action = match message.get("action") {
            Some(LinkValue::Text(action)) => action.as_str(),
            Some(other) => {
                return Err(MonitorError::MalformedInboundCommand(format!(
                    "action is not a string: {:?}",
                    other
                )))
            }
            None => {
                return Err(MonitorError::MalformedInboundCommand(
                    "missing action".into(),
                ))
            }
        };

        let command = match action {
            "startMonitoring" => Command::StartMonitoring,
            "stopMonitoring" => Command::StopMonitoring,
            "sessionStatus" => Command::SessionStatus {
                is_active: message
                    .get("isActive")
                    .and_then(LinkValue::as_bool)
                    .unwrap_or(false),
            },
            "test" => Command::Test,
            "ping" => Command::Ping,
            other => Command::Unknown(other.to_string()),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_notification_carries_flag_and_timestamp() {
        let message = Notification::Shot {
            timestamp: 1_700_000_000.25,
        }
        .into_payload();
        assert_eq!(message.len(), 2);
        assert_eq!(message["shotDetected"], LinkValue::Bool(true));
        assert_eq!(message["timestamp"], LinkValue::Number(1_700_000_000.25));
    }

    #[test]
    fn acknowledgements_report_ok() {
        let pong = Notification::Pong.into_payload();
        assert_eq!(pong["pong"].as_bool(), Some(true));
        assert_eq!(pong["status"].as_str(), Some("ok"));

        let test = Notification::TestResponse.into_payload();
        assert_eq!(test["testResponse"].as_bool(), Some(true));
        assert_eq!(test["status"].as_str(), Some("ok"));
    }

    #[test]
    fn payload_json_uses_plain_scalars() {
        let json = serde_json::to_string(&Notification::Monitoring(true).into_payload()).unwrap();
        assert_eq!(json, r#"{"monitoring":true}"#);

        let parsed: Payload =
            serde_json::from_str(r#"{"action":"sessionStatus","isActive":true,"n":3}"#).unwrap();
        assert_eq!(parsed["isActive"], LinkValue::Bool(true));
        assert_eq!(parsed["n"].as_f64(), Some(3.0));
    }

    #[test]
    fn commands_parse_by_action() {
        let ping = payload([("action", "ping")]);
        assert_eq!(Command::parse(&ping), Ok(Command::Ping));

        let mut status = payload([("action", "sessionStatus")]);
        assert_eq!(
            Command::parse(&status),
            Ok(Command::SessionStatus { is_active: false })
        );
        status.insert("isActive".into(), true.into());
        assert_eq!(
            Command::parse(&status),
            Ok(Command::SessionStatus { is_active: true })
        );

        let unknown = payload([("action", "dance")]);
        assert_eq!(
            Command::parse(&unknown),
            Ok(Command::Unknown("dance".into()))
        );
    }

    #[test]
    fn non_boolean_is_active_defaults_to_false() {
        let mut status = payload([("action", "sessionStatus")]);
        status.insert("isActive".into(), "yes".into());
        assert_eq!(
            Command::parse(&status),
            Ok(Command::SessionStatus { is_active: false })
        );
    }

    #[test]
    fn missing_or_mistyped_action_is_malformed() {
        let empty = Payload::new();
        assert!(matches!(
            Command::parse(&empty),
            Err(MonitorError::MalformedInboundCommand(_))
        ));

        let numeric = payload([("action", 4.0)]);
        assert!(matches!(
            Command::parse(&numeric),
            Err(MonitorError::MalformedInboundCommand(_))
        ));
    }
}
