//! Envelopes crossing the native/embedded boundary.
//!
//! Inbound envelopes overload `id` as a routing key. [`Inbound::decode`]
//! resolves it once, so the rest of the bridge dispatches on a tag instead
//! of comparing strings.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EnvelopeError;
use crate::status::{RunnerInfo, RunnerStatus};

pub const STATUS_ID: &str = "0";
pub const INFO_ID: &str = "-1";
pub const CONSOLE_ID: &str = "-2";

/// Message the embedded runtime sends back for a probe.
pub const PING_REPLY: &str = "mobile:ping";
/// Message name of an outbound probe.
pub const PING_MESSAGE: &str = "mobile(ping)";

/// A decoded inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    StatusUpdate(RunnerStatus),
    HandshakeInfo(RunnerInfo),
    ConsoleLog(ConsoleLine),
    Correlated(CorrelatedEnvelope),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    fn parse(level: &str) -> Self {
        match level {
            "debug" => ConsoleLevel::Debug,
            "info" => ConsoleLevel::Info,
            "warn" => ConsoleLevel::Warn,
            "error" => ConsoleLevel::Error,
            _ => ConsoleLevel::Log,
        }
    }
}

/// A `console.*` call forwarded from the embedded page.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub args: Vec<Value>,
}

impl ConsoleLine {
    /// Arguments joined the way a browser console prints them.
    pub fn text(&self) -> String {
        self.args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// An envelope correlated to a request issued through the messaging layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedEnvelope {
    pub id: String,
    /// `Some(Value::Null)` when the key is present with a null value.
    pub response: Option<Value>,
    pub subscription: Option<Value>,
    /// The envelope as received, for the messaging layer.
    pub raw: Value,
}

impl CorrelatedEnvelope {
    /// Whether this envelope proves the embedded runtime is still processing.
    pub fn is_liveness_signal(&self) -> bool {
        !self.id.is_empty() && (self.response.is_some() || self.subscription.is_some())
    }

    pub fn is_ping_reply(&self) -> bool {
        matches!(&self.response, Some(Value::String(s)) if s == PING_REPLY)
    }
}

impl Inbound {
    /// Decode a raw envelope posted by the embedded page.
    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(map) = &value else {
            return Err(EnvelopeError::NotAnObject);
        };
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingId)?
            .to_string();

        match id.as_str() {
            STATUS_ID => decode_status(map).map(Inbound::StatusUpdate),
            INFO_ID => decode_info(map).map(Inbound::HandshakeInfo),
            CONSOLE_ID => decode_console(map).map(Inbound::ConsoleLog),
            _ => {
                let response = map.get("response").cloned();
                let subscription = map.get("subscription").cloned();
                Ok(Inbound::Correlated(CorrelatedEnvelope {
                    id,
                    response,
                    subscription,
                    raw: value,
                }))
            }
        }
    }
}

fn decode_status(map: &Map<String, Value>) -> Result<RunnerStatus, EnvelopeError> {
    let status = map
        .get("response")
        .and_then(|r| r.get("status"))
        .ok_or_else(|| EnvelopeError::InvalidPayload {
            kind: "status",
            reason: "missing response.status".into(),
        })?;
    serde_json::from_value(status.clone()).map_err(|e| EnvelopeError::InvalidPayload {
        kind: "status",
        reason: e.to_string(),
    })
}

fn decode_info(map: &Map<String, Value>) -> Result<RunnerInfo, EnvelopeError> {
    let response = map.get("response").ok_or_else(|| EnvelopeError::InvalidPayload {
        kind: "info",
        reason: "missing response".into(),
    })?;
    serde_json::from_value(response.clone()).map_err(|e| EnvelopeError::InvalidPayload {
        kind: "info",
        reason: e.to_string(),
    })
}

fn decode_console(map: &Map<String, Value>) -> Result<ConsoleLine, EnvelopeError> {
    let Some(Value::Array(items)) = map.get("response") else {
        return Err(EnvelopeError::InvalidPayload {
            kind: "console",
            reason: "response is not an array".into(),
        });
    };
    let mut items = items.iter();
    let level = items
        .next()
        .and_then(Value::as_str)
        .map(ConsoleLevel::parse)
        .unwrap_or(ConsoleLevel::Log);
    Ok(ConsoleLine {
        level,
        args: items.cloned().collect(),
    })
}

/// Probe posted into the embedded page to check it is still responsive.
#[derive(Debug, Clone, Serialize)]
pub struct PingEnvelope {
    pub id: String,
    pub message: &'static str,
    pub request: Value,
}

impl PingEnvelope {
    pub fn new() -> Self {
        Self {
            id: format!("ping_{}", uuid::Uuid::new_v4().simple()),
            message: PING_MESSAGE,
            request: Value::Null,
        }
    }

    /// Script that delivers the probe through the page's `postMessage`.
    pub fn injection_script(&self) -> String {
        // Serializing a struct of strings and null cannot fail.
        let body = serde_json::to_string(self).unwrap_or_default();
        format!("window.postMessage({body})")
    }
}

impl Default for PingEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_status_announcement() {
        let inbound = Inbound::decode(r#"{"id":"0","response":{"status":"crypto_ready"}}"#).unwrap();
        assert_eq!(inbound, Inbound::StatusUpdate(RunnerStatus::CryptoReady));
    }

    #[test]
    fn decodes_handshake_with_missing_version() {
        let inbound = Inbound::decode(
            r#"{"id":"-1","response":{"url":"file:///site/index.html","userAgent":"UA"}}"#,
        )
        .unwrap();
        let Inbound::HandshakeInfo(info) = inbound else {
            panic!("expected handshake");
        };
        assert_eq!(info.url, "file:///site/index.html");
        assert_eq!(info.version, None);
        assert_eq!(info.user_agent, "UA");
    }

    #[test]
    fn decodes_console_line() {
        let inbound =
            Inbound::decode(r#"{"id":"-2","response":["warn","low balance",{"n":1}]}"#).unwrap();
        let Inbound::ConsoleLog(line) = inbound else {
            panic!("expected console line");
        };
        assert_eq!(line.level, ConsoleLevel::Warn);
        assert_eq!(line.text(), r#"low balance {"n":1}"#);
    }

    #[test]
    fn correlated_liveness_requires_response_or_subscription_key() {
        let with_null = Inbound::decode(r#"{"id":"42","response":null}"#).unwrap();
        let without = Inbound::decode(r#"{"id":"42"}"#).unwrap();
        let empty_id = Inbound::decode(r#"{"id":"","subscription":{}}"#).unwrap();

        let liveness = |inbound: Inbound| match inbound {
            Inbound::Correlated(env) => env.is_liveness_signal(),
            _ => false,
        };
        assert!(liveness(with_null));
        assert!(!liveness(without));
        assert!(!liveness(empty_id));
    }

    #[test]
    fn ping_reply_is_recognised() {
        let Inbound::Correlated(env) =
            Inbound::decode(r#"{"id":"ping_1","response":"mobile:ping"}"#).unwrap()
        else {
            panic!("expected correlated envelope");
        };
        assert!(env.is_ping_reply());
        assert!(env.is_liveness_signal());
    }

    #[test]
    fn malformed_envelopes_are_errors() {
        assert!(matches!(Inbound::decode("{not json"), Err(EnvelopeError::Malformed(_))));
        assert!(matches!(Inbound::decode("[1,2]"), Err(EnvelopeError::NotAnObject)));
        assert!(matches!(Inbound::decode(r#"{"id":7}"#), Err(EnvelopeError::MissingId)));
        assert!(matches!(
            Inbound::decode(r#"{"id":"0","response":{"status":"bogus"}}"#),
            Err(EnvelopeError::InvalidPayload { kind: "status", .. })
        ));
    }

    #[test]
    fn ping_script_posts_probe_object() {
        let ping = PingEnvelope::new();
        let script = ping.injection_script();
        let body = script
            .strip_prefix("window.postMessage(")
            .and_then(|s| s.strip_suffix(')'))
            .unwrap();
        let value: Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["message"], json!("mobile(ping)"));
        assert_eq!(value["request"], Value::Null);
        assert!(value.get("origin").is_none());
        assert!(value["id"].as_str().unwrap().starts_with("ping_"));
    }
}
