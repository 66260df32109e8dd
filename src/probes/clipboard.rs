//! Copy/paste capture.
//!
//! Subscribes to clipboard events on the document and forwards each one to
//! the readiness callback: copies report the current document selection,
//! pastes report the pasted text.

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::{ClipboardEventKind, ProbeContext};
use crate::probes::types::{EventProbe, ProbeError, ReadinessCallback, ReadinessPayload};

pub struct ClipboardProbe {
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardProbe {
    pub fn new() -> Self {
        Self {
            forwarder: Mutex::new(None),
        }
    }
}

impl Default for ClipboardProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventProbe for ClipboardProbe {
    fn name(&self) -> &str {
        "clipboard"
    }

    async fn start(&self, cx: ProbeContext, ready: ReadinessCallback) -> Result<(), ProbeError> {
        let mut slot = self.forwarder.lock().await;
        if slot.is_some() {
            return Err(ProbeError::Subscription(
                "clipboard capture already started".to_string(),
            ));
        }

        let mut events = cx.document.subscribe_clipboard();
        let document = cx.document.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let payload = match event.kind {
                            ClipboardEventKind::Copy => ReadinessPayload::new()
                                .with("kind", "copy")
                                .with("selection", document.selection()),
                            ClipboardEventKind::Paste => ReadinessPayload::new()
                                .with("kind", "paste")
                                .with("data", event.data),
                        }
                        .with("event_id", event.id.to_string())
                        .with("at", event.at.to_rfc3339());
                        ready(payload);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "clipboard capture lagging; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *slot = Some(task);
        info!("clipboard capture started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProbeError> {
        match self.forwarder.lock().await.take() {
            Some(task) => {
                task.abort();
                info!("clipboard capture stopped");
            }
            None => debug!("clipboard capture stop ignored: not started"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::headless::HeadlessContext;
    use crate::context::ClipboardEvent;
    use serde_json::Value;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    fn recording_callback() -> (ReadinessCallback, Arc<StdMutex<Vec<ReadinessPayload>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ReadinessCallback = Arc::new(move |payload| {
            sink.lock().unwrap().push(payload);
        });
        (callback, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_reports_selection_and_paste_reports_data() {
        let headless = HeadlessContext::new();
        let (callback, seen) = recording_callback();
        let probe = ClipboardProbe::new();
        probe.start(headless.probe_context(), callback).await.unwrap();

        headless.document.set_selection("selected text");
        headless
            .document
            .emit(ClipboardEvent::new(ClipboardEventKind::Copy, "selected text"));
        headless
            .document
            .emit(ClipboardEvent::new(ClipboardEventKind::Paste, "pasted text"));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let payloads = seen.lock().unwrap();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].kind(), Some("copy"));
        assert_eq!(
            payloads[0].get("selection").and_then(Value::as_str),
            Some("selected text")
        );
        assert_eq!(payloads[1].kind(), Some("paste"));
        assert_eq!(
            payloads[1].get("data").and_then(Value::as_str),
            Some("pasted text")
        );
        assert!(payloads[0].get("event_id").is_some());

        drop(payloads);
        probe.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_forwarding() {
        let headless = HeadlessContext::new();
        let (callback, seen) = recording_callback();
        let probe = ClipboardProbe::new();
        probe.start(headless.probe_context(), callback).await.unwrap();

        probe.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        headless
            .document
            .emit(ClipboardEvent::new(ClipboardEventKind::Copy, "late"));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_without_start() {
        let probe = ClipboardProbe::new();
        probe.stop().await.unwrap();
        probe.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let headless = HeadlessContext::new();
        let (callback, _) = recording_callback();
        let probe = ClipboardProbe::new();
        probe
            .start(headless.probe_context(), callback.clone())
            .await
            .unwrap();
        let second = probe.start(headless.probe_context(), callback).await;
        assert!(matches!(second, Err(ProbeError::Subscription(_))));
        probe.stop().await.unwrap();
    }
}
