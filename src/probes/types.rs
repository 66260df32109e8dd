//! Shared probe contracts and payload types.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::{ContextError, ProbeContext};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("context error: {0}")]
    Context(#[from] ContextError),
    #[error("probe execution failed: {0}")]
    Execution(String),
    #[error("subscription failed: {0}")]
    Subscription(String),
}

/// Open-ended result mapping a probe reports through the readiness
/// callback. The shape is probe-defined; consumers discriminate on the
/// `kind` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadinessPayload(Map<String, Value>);

impl ReadinessPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn kind(&self) -> Option<&str> {
        self.get("kind").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Error payload a queue reports when a probe's dispatch fails.
    pub fn error(queue: &str, probe: &str, error: &ProbeError) -> Self {
        Self::new()
            .with("kind", "error")
            .with("queue", queue)
            .with("module", probe)
            .with("error", error.to_string())
    }
}

/// The single function every probe in a queue reports results through.
/// Invocations may interleave across probes and queues, so implementations
/// must be re-entrant and discriminate by payload content.
pub type ReadinessCallback = Arc<dyn Fn(ReadinessPayload) + Send + Sync>;

/// A single-shot probe: runs exactly once per queue activation and
/// resolves one result mapping (possibly empty).
#[async_trait]
pub trait ExecProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn exec(&self, cx: &ProbeContext) -> Result<ReadinessPayload, ProbeError>;
}

/// A subscribing probe: `start` registers against the context and must not
/// block; the callback may then fire zero or more times until `stop`.
/// `stop` unregisters and is idempotent, with or without a prior `start`.
#[async_trait]
pub trait EventProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self, cx: ProbeContext, ready: ReadinessCallback) -> Result<(), ProbeError>;

    async fn stop(&self) -> Result<(), ProbeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    Exec,
    Event,
}

impl ProbeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeKind::Exec => "exec",
            ProbeKind::Event => "event",
        }
    }
}

/// A registered probe. The variant is fixed at construction, so queue
/// dispatch is a plain match on the discriminant and never inspects types
/// at runtime.
#[derive(Clone)]
pub enum Probe {
    Exec(Arc<dyn ExecProbe>),
    Event(Arc<dyn EventProbe>),
}

impl Probe {
    pub fn exec(probe: impl ExecProbe + 'static) -> Self {
        Probe::Exec(Arc::new(probe))
    }

    pub fn event(probe: impl EventProbe + 'static) -> Self {
        Probe::Event(Arc::new(probe))
    }

    pub fn kind(&self) -> ProbeKind {
        match self {
            Probe::Exec(_) => ProbeKind::Exec,
            Probe::Event(_) => ProbeKind::Event,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Probe::Exec(probe) => probe.name(),
            Probe::Event(probe) => probe.name(),
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_discrimination() {
        let payload = ReadinessPayload::new().with("kind", "fonts").with("count", 3u64);
        assert_eq!(payload.kind(), Some("fonts"));
        assert_eq!(payload.get("count").and_then(Value::as_u64), Some(3));
    }

    #[test]
    fn test_payload_may_be_empty() {
        let payload = ReadinessPayload::new();
        assert!(payload.is_empty());
        assert_eq!(payload.kind(), None);
    }

    #[test]
    fn test_error_payload_shape() {
        let error = ProbeError::Execution("boom".to_string());
        let payload = ReadinessPayload::error("data", "fonts", &error);
        assert_eq!(payload.kind(), Some("error"));
        assert_eq!(payload.get("queue").and_then(Value::as_str), Some("data"));
        assert_eq!(payload.get("module").and_then(Value::as_str), Some("fonts"));
        assert!(payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap()
            .contains("boom"));
    }

    #[test]
    fn test_payload_serializes_transparently() {
        let payload = ReadinessPayload::new().with("kind", "copy").with("selection", "text");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"kind":"copy","selection":"text"}"#);
    }
}
