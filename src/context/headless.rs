//! In-process headless context.
//!
//! Stands in for a real embedder: font metrics come from a per-family
//! advance table, clipboard events from a broadcast channel the caller (or
//! the synthesizer) feeds. The daemon and the test suite both run against
//! this implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::Lazy;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{
    CanvasHandle, ClipboardEvent, ClipboardEventKind, ContextError, DocumentHandle,
    NavigatorHandle, ProbeContext, WindowHandle,
};

const CLIPBOARD_CHANNEL_CAPACITY: usize = 64;

/// Per-character advance in px (at 72px) for the generic families every
/// environment resolves.
static GENERIC_ADVANCES: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([("monospace", 43.26), ("sans-serif", 39.99), ("serif", 38.55)])
});

/// Families the default headless environment has "installed", with
/// advances distinct from every generic family so metric comparison can
/// tell them apart.
static DEFAULT_INSTALLED: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    [
        ("Arial", 40.02),
        ("Arial Black", 47.10),
        ("Comic Sans MS", 45.21),
        ("Courier New", 43.30),
        ("Georgia", 41.83),
        ("Helvetica", 40.40),
        ("Impact", 36.25),
        ("Tahoma", 42.94),
        ("Times New Roman", 38.61),
        ("Trebuchet MS", 43.72),
        ("Verdana", 44.66),
    ]
    .into_iter()
    .map(|(family, advance)| (family.to_string(), advance))
    .collect()
});

pub struct HeadlessWindow {
    inner_size: (u32, u32),
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self {
            inner_size: (1280, 800),
        }
    }
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowHandle for HeadlessWindow {
    fn inner_size(&self) -> (u32, u32) {
        self.inner_size
    }

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// Measurement surface backed by the document's advance table. Unknown
/// families render with the default font, so they measure exactly like
/// `sans-serif`.
pub struct HeadlessCanvas {
    installed: Arc<HashMap<String, f64>>,
}

impl CanvasHandle for HeadlessCanvas {
    fn measure_text(&self, font: &str, text: &str) -> Result<f64, ContextError> {
        let family = match font.split_once(' ') {
            Some((_size, family)) => family.trim(),
            None => font,
        };
        if family.is_empty() {
            return Err(ContextError::Measurement {
                font: font.to_string(),
                reason: "empty font family".to_string(),
            });
        }

        let advance = self
            .installed
            .get(family)
            .or_else(|| GENERIC_ADVANCES.get(family))
            .copied()
            .unwrap_or(GENERIC_ADVANCES["sans-serif"]);

        Ok(advance * text.chars().count() as f64)
    }
}

pub struct HeadlessDocument {
    installed: Arc<HashMap<String, f64>>,
    selection: RwLock<String>,
    clipboard_tx: broadcast::Sender<ClipboardEvent>,
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::with_fonts(DEFAULT_INSTALLED.clone())
    }

    /// Builds a document whose advance table holds exactly `installed`.
    pub fn with_fonts(installed: HashMap<String, f64>) -> Self {
        let (clipboard_tx, _) = broadcast::channel(CLIPBOARD_CHANNEL_CAPACITY);
        Self {
            installed: Arc::new(installed),
            selection: RwLock::new(String::new()),
            clipboard_tx,
        }
    }

    pub fn set_selection(&self, text: impl Into<String>) {
        if let Ok(mut selection) = self.selection.write() {
            *selection = text.into();
        }
    }

    /// Delivers a clipboard event to every subscriber. Returns the number
    /// of subscribers that received it.
    pub fn emit(&self, event: ClipboardEvent) -> usize {
        self.clipboard_tx.send(event).unwrap_or(0)
    }
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentHandle for HeadlessDocument {
    fn create_canvas(&self) -> Result<Box<dyn CanvasHandle>, ContextError> {
        Ok(Box::new(HeadlessCanvas {
            installed: self.installed.clone(),
        }))
    }

    fn selection(&self) -> String {
        self.selection
            .read()
            .map(|selection| selection.clone())
            .unwrap_or_default()
    }

    fn subscribe_clipboard(&self) -> broadcast::Receiver<ClipboardEvent> {
        self.clipboard_tx.subscribe()
    }
}

pub struct HeadlessNavigator {
    user_agent: String,
    language: String,
}

impl HeadlessNavigator {
    pub fn new() -> Self {
        Self {
            user_agent: format!("ProbeGuard/{} (headless)", env!("CARGO_PKG_VERSION")),
            language: "en-US".to_string(),
        }
    }
}

impl Default for HeadlessNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigatorHandle for HeadlessNavigator {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn language(&self) -> String {
        self.language.clone()
    }
}

/// The full simulated environment. Keeps concrete handles so callers can
/// drive the document (selection, clipboard events) while probes see only
/// the [`ProbeContext`] trait surface.
pub struct HeadlessContext {
    pub window: Arc<HeadlessWindow>,
    pub document: Arc<HeadlessDocument>,
    pub navigator: Arc<HeadlessNavigator>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self {
            window: Arc::new(HeadlessWindow::new()),
            document: Arc::new(HeadlessDocument::new()),
            navigator: Arc::new(HeadlessNavigator::new()),
        }
    }

    pub fn with_fonts(installed: HashMap<String, f64>) -> Self {
        Self {
            window: Arc::new(HeadlessWindow::new()),
            document: Arc::new(HeadlessDocument::with_fonts(installed)),
            navigator: Arc::new(HeadlessNavigator::new()),
        }
    }

    pub fn probe_context(&self) -> ProbeContext {
        ProbeContext {
            window: self.window.clone(),
            document: self.document.clone(),
            navigator: self.navigator.clone(),
        }
    }
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new()
    }
}

const SYNTHETIC_SNIPPETS: &[&str] = &[
    "the quick brown fox",
    "SELECT * FROM sessions",
    "https://example.com/article",
    "meeting notes 14:00",
    "TOTP 493 201",
];

/// Feeds the headless document with synthetic copy/paste activity so the
/// daemon has events to observe. Copies also update the document selection,
/// matching what a real copy does.
pub fn spawn_clipboard_synthesizer(
    document: Arc<HeadlessDocument>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            let (kind, snippet) = {
                let mut rng = rand::thread_rng();
                let snippet = SYNTHETIC_SNIPPETS[rng.gen_range(0..SYNTHETIC_SNIPPETS.len())];
                let kind = if rng.gen_bool(0.5) {
                    ClipboardEventKind::Copy
                } else {
                    ClipboardEventKind::Paste
                };
                (kind, snippet)
            };
            if kind == ClipboardEventKind::Copy {
                document.set_selection(snippet);
            }
            let delivered = document.emit(ClipboardEvent::new(kind, snippet));
            debug!(kind = kind.as_str(), delivered, "synthetic clipboard event");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_text_scales_with_length() {
        let document = HeadlessDocument::new();
        let canvas = document.create_canvas().unwrap();
        let short = canvas.measure_text("72px monospace", "mm").unwrap();
        let long = canvas.measure_text("72px monospace", "mmmm").unwrap();
        assert!(long > short);
        assert_eq!(long, short * 2.0);
    }

    #[test]
    fn test_unknown_family_measures_like_sans_serif() {
        let document = HeadlessDocument::new();
        let canvas = document.create_canvas().unwrap();
        let unknown = canvas.measure_text("72px No Such Family", "mmmmmmmmmmlli").unwrap();
        let sans = canvas.measure_text("72px sans-serif", "mmmmmmmmmmlli").unwrap();
        assert_eq!(unknown, sans);
    }

    #[test]
    fn test_installed_family_differs_from_generics() {
        let document = HeadlessDocument::new();
        let canvas = document.create_canvas().unwrap();
        let arial = canvas.measure_text("72px Arial", "mmmmmmmmmmlli").unwrap();
        for generic in ["monospace", "sans-serif", "serif"] {
            let base = canvas
                .measure_text(&format!("72px {}", generic), "mmmmmmmmmmlli")
                .unwrap();
            assert_ne!(arial, base);
        }
    }

    #[test]
    fn test_empty_family_is_rejected() {
        let document = HeadlessDocument::new();
        let canvas = document.create_canvas().unwrap();
        assert!(canvas.measure_text("72px ", "mmm").is_err());
    }

    #[test]
    fn test_selection_roundtrip() {
        let document = HeadlessDocument::new();
        assert_eq!(document.selection(), "");
        document.set_selection("copied text");
        assert_eq!(document.selection(), "copied text");
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let document = HeadlessDocument::new();
        assert_eq!(document.emit(ClipboardEvent::new(ClipboardEventKind::Copy, "x")), 0);

        let mut rx = document.subscribe_clipboard();
        let delivered = document.emit(ClipboardEvent::new(ClipboardEventKind::Paste, "pasted"));
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ClipboardEventKind::Paste);
        assert_eq!(event.data, "pasted");
    }
}
