//! Detection probes and their shared contracts.

pub mod clipboard;
pub mod fonts;
pub mod types;

pub use clipboard::ClipboardProbe;
pub use fonts::FontsProbe;
pub use types::*;
