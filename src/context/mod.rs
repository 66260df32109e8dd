//! Execution context shared by every probe.
//!
//! The context bundles the window/document/navigator handles a probe runs
//! against. The handles are trait objects so the same probes work against an
//! embedder-backed environment or the in-process [`headless`] one.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod headless;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("canvas surface unavailable: {0}")]
    Canvas(String),
    #[error("text measurement failed for font spec {font:?}: {reason}")]
    Measurement { font: String, reason: String },
}

/// Window-level handle.
pub trait WindowHandle: Send + Sync {
    fn inner_size(&self) -> (u32, u32);
    fn device_pixel_ratio(&self) -> f64;
}

/// 2D measurement surface obtained from the document.
pub trait CanvasHandle: Send + Sync {
    /// Advance width of `text` rendered with the CSS-style `font` spec,
    /// e.g. `"72px Arial"`.
    fn measure_text(&self, font: &str, text: &str) -> Result<f64, ContextError>;
}

/// Document-level handle.
pub trait DocumentHandle: Send + Sync {
    fn create_canvas(&self) -> Result<Box<dyn CanvasHandle>, ContextError>;

    /// Current text selection, empty when nothing is selected.
    fn selection(&self) -> String;

    /// Subscribes to clipboard events on the document body.
    fn subscribe_clipboard(&self) -> broadcast::Receiver<ClipboardEvent>;
}

/// Navigator-level handle.
pub trait NavigatorHandle: Send + Sync {
    fn user_agent(&self) -> String;
    fn language(&self) -> String;
}

/// Shared handle bundle passed unchanged to every probe. Probes read
/// through the handles concurrently, so implementations must tolerate
/// interleaved access.
#[derive(Clone)]
pub struct ProbeContext {
    pub window: Arc<dyn WindowHandle>,
    pub document: Arc<dyn DocumentHandle>,
    pub navigator: Arc<dyn NavigatorHandle>,
}

impl fmt::Debug for ProbeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeContext")
            .field("user_agent", &self.navigator.user_agent())
            .field("language", &self.navigator.language())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardEventKind {
    Copy,
    Paste,
}

impl ClipboardEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipboardEventKind::Copy => "copy",
            ClipboardEventKind::Paste => "paste",
        }
    }
}

/// A copy or paste observed on the document body. `data` carries the
/// selection for copies and the pasted text for pastes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardEvent {
    pub id: Uuid,
    pub kind: ClipboardEventKind,
    pub data: String,
    pub at: DateTime<Utc>,
}

impl ClipboardEvent {
    pub fn new(kind: ClipboardEventKind, data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            data: data.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_event_kind_serializes_lowercase() {
        let copy = serde_json::to_string(&ClipboardEventKind::Copy).unwrap();
        assert_eq!(copy, "\"copy\"");
        let paste = serde_json::to_string(&ClipboardEventKind::Paste).unwrap();
        assert_eq!(paste, "\"paste\"");
    }

    #[test]
    fn test_clipboard_event_new_fills_identity() {
        let event = ClipboardEvent::new(ClipboardEventKind::Copy, "hello");
        assert_eq!(event.kind, ClipboardEventKind::Copy);
        assert_eq!(event.data, "hello");
        assert!(!event.id.is_nil());
    }
}
