//! Institution detection: ordered, first-match-wins stages over the catalog.
//!
//! Each stage is a plain function returning `Some(hit)` or `None`;
//! [`detect`] folds over [`DETECTION_STAGES`] in priority order. Every
//! keyword of every institution is tried before any pattern, so a keyword
//! of a later institution beats a pattern of an earlier one.

use crate::catalog::Catalog;
use crate::output::{DetectionMethod, DetectionResult};
use tracing::debug;

/// One detection stage: catalog + text → optional hit.
pub type DetectionStage = fn(&Catalog, &str) -> Option<DetectionResult>;

/// Stages in priority order.
pub const DETECTION_STAGES: &[(&str, DetectionStage)] =
    &[("keyword", keyword_stage), ("pattern", pattern_stage)];

/// Case-insensitive substring match of each institution's keywords.
pub fn keyword_stage(catalog: &Catalog, text: &str) -> Option<DetectionResult> {
    let lowered = text.to_lowercase();
    catalog
        .institutions()
        .iter()
        .find(|inst| inst.keywords.iter().any(|k| lowered.contains(k.as_str())))
        .map(|inst| DetectionResult::direct(&inst.key, DetectionMethod::Keyword))
}

/// Case-insensitive regex match of each institution's patterns.
pub fn pattern_stage(catalog: &Catalog, text: &str) -> Option<DetectionResult> {
    catalog
        .institutions()
        .iter()
        .find(|inst| inst.patterns.iter().any(|p| p.is_match(text)))
        .map(|inst| DetectionResult::direct(&inst.key, DetectionMethod::Pattern))
}

/// Run the stages in order; the first hit wins.
pub fn detect(catalog: &Catalog, text: &str) -> Option<DetectionResult> {
    DETECTION_STAGES.iter().find_map(|(name, stage)| {
        let hit = stage(catalog, text);
        match &hit {
            Some(h) => debug!(
                "Detection stage '{}' matched {}",
                name,
                h.institution_key.as_deref().unwrap_or_default()
            ),
            None => debug!("Detection stage '{}' found nothing", name),
        }
        hit
    })
}
