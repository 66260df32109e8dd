//! Installed-font enumeration via canvas text metrics.
//!
//! Measures a fixed test string in every candidate family and keeps the
//! families whose width differs from all three generic base families. A
//! family that measures exactly like a base family fell back to the
//! environment's default font and is treated as not installed.

use async_trait::async_trait;
use tracing::debug;

use crate::context::ProbeContext;
use crate::probes::types::{ExecProbe, ProbeError, ReadinessPayload};

/// Generic families every environment resolves.
const BASE_FONTS: &[&str] = &["monospace", "sans-serif", "serif"];

/// Wide glyphs plus narrow ones, so per-family width differences add up.
const TEST_STRING: &str = "mmmmmmmmmmlli";
const TEST_SIZE: &str = "72px";

/// Candidate families to test (may be refined or loaded from config in the
/// future).
const FONT_LIST: &[&str] = &[
    "American Typewriter",
    "Andale Mono",
    "Arial",
    "Arial Black",
    "Arial Narrow",
    "Arial Rounded MT Bold",
    "Arial Unicode MS",
    "Avenir",
    "Avenir Next",
    "Avenir Next Condensed",
    "Bahnschrift",
    "Baskerville",
    "Big Caslon",
    "Bodoni 72",
    "Bodoni 72 Oldstyle",
    "Bodoni 72 Smallcaps",
    "Bradley Hand",
    "Brush Script MT",
    "Calibri",
    "Cambria",
    "Cambria Math",
    "Candara",
    "Chalkboard",
    "Chalkboard SE",
    "Chalkduster",
    "Charter",
    "Cochin",
    "Comic Sans MS",
    "Consolas",
    "Constantia",
    "Copperplate",
    "Corbel",
    "Courier",
    "Courier New",
    "Didot",
    "DIN Alternate",
    "DIN Condensed",
    "Ebrima",
    "Franklin Gothic Medium",
    "Futura",
    "Gabriola",
    "Gadugi",
    "Geneva",
    "Georgia",
    "Gill Sans",
    "Helvetica",
    "Helvetica Neue",
    "Herculanum",
    "Hoefler Text",
    "HoloLens MDL2 Assets",
    "Impact",
    "Ink Free",
    "Javanese Text",
    "Leelawadee UI",
    "Lucida Console",
    "Lucida Grande",
    "Lucida Sans Unicode",
    "Luminari",
    "Malgun Gothic",
    "Marker Felt",
    "Marlett",
    "Menlo",
    "Microsoft Himalaya",
    "Microsoft JhengHei",
    "Microsoft New Tai Lue",
    "Microsoft PhagsPa",
    "Microsoft Sans Serif",
    "Microsoft Tai Le",
    "Microsoft YaHei",
    "Microsoft Yi Baiti",
    "MingLiU-ExtB",
    "Monaco",
    "Mongolian Baiti",
    "MS Gothic",
    "MV Boli",
    "Myanmar Text",
    "Nirmala UI",
    "Noteworthy",
    "Optima",
    "Palatino",
    "Palatino Linotype",
    "Papyrus",
    "Phosphate",
    "Rockwell",
    "Savoye LET",
    "Segoe MDL2 Assets",
    "Segoe Print",
    "Segoe Script",
    "Segoe UI",
    "Segoe UI Historic",
    "Segoe UI Emoji",
    "Segoe UI Symbol",
    "SignPainter",
    "SimSun",
    "Sitka",
    "Skia",
    "Snell Roundhand",
    "Sylfaen",
    "Symbol",
    "Tahoma",
    "Times",
    "Times New Roman",
    "Trattatello",
    "Trebuchet MS",
    "Verdana",
    "Webdings",
    "Wingdings",
    "Yu Gothic",
    "Zapfino",
];

/// Single-shot probe enumerating installed font families.
pub struct FontsProbe {
    candidates: Vec<String>,
}

impl FontsProbe {
    pub fn new() -> Self {
        Self::with_candidates(FONT_LIST.iter().map(|family| family.to_string()).collect())
    }

    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self { candidates }
    }
}

impl Default for FontsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecProbe for FontsProbe {
    fn name(&self) -> &str {
        "fonts"
    }

    async fn exec(&self, cx: &ProbeContext) -> Result<ReadinessPayload, ProbeError> {
        let canvas = cx.document.create_canvas()?;

        let mut base_widths = Vec::with_capacity(BASE_FONTS.len());
        for base in BASE_FONTS {
            let width = canvas.measure_text(&format!("{} {}", TEST_SIZE, base), TEST_STRING)?;
            base_widths.push(width);
        }

        let mut detected = Vec::new();
        for family in &self.candidates {
            let width = canvas.measure_text(&format!("{} {}", TEST_SIZE, family), TEST_STRING)?;
            // A fallback render has metrics identical to one of the bases.
            let matched = base_widths.iter().any(|base| width == *base);
            if !matched {
                detected.push(family.clone());
            }
        }

        debug!(
            candidates = self.candidates.len(),
            detected = detected.len(),
            "font enumeration finished"
        );

        Ok(ReadinessPayload::new()
            .with("kind", "fonts")
            .with("count", detected.len() as u64)
            .with("fonts", detected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::headless::HeadlessContext;
    use serde_json::Value;

    fn context() -> ProbeContext {
        HeadlessContext::new().probe_context()
    }

    #[tokio::test]
    async fn test_detects_installed_families_only() {
        let probe = FontsProbe::with_candidates(vec![
            "Arial".to_string(),
            "Verdana".to_string(),
            "No Such Family".to_string(),
        ]);
        let payload = probe.exec(&context()).await.unwrap();

        assert_eq!(payload.kind(), Some("fonts"));
        let fonts: Vec<&str> = payload
            .get("fonts")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(fonts, vec!["Arial", "Verdana"]);
        assert_eq!(payload.get("count").and_then(Value::as_u64), Some(2));
    }

    #[tokio::test]
    async fn test_generic_families_are_never_detected() {
        let probe = FontsProbe::with_candidates(vec![
            "monospace".to_string(),
            "sans-serif".to_string(),
            "serif".to_string(),
        ]);
        let payload = probe.exec(&context()).await.unwrap();
        assert_eq!(payload.get("count").and_then(Value::as_u64), Some(0));
    }

    #[tokio::test]
    async fn test_default_candidate_list_runs_against_headless_context() {
        let probe = FontsProbe::new();
        let payload = probe.exec(&context()).await.unwrap();

        let fonts: Vec<&str> = payload
            .get("fonts")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        // The headless default table installs a subset of the candidates.
        assert!(fonts.contains(&"Arial"));
        assert!(fonts.contains(&"Times New Roman"));
        assert!(!fonts.contains(&"Zapfino"));
    }
}
