//! Scale-family classification from observed grade points.
//!
//! Families are checked in catalog order, most specific first. A family
//! matches when any observed point lies strictly within `tolerance` of any
//! of its fingerprint points. Values shared by every family (4.0, 3.0, ...)
//! never appear in a fingerprint, so they cannot cause a match on their own.

use crate::catalog::Catalog;
use crate::output::{Confidence, ScaleClassification};
use tracing::{debug, warn};

/// Classify `points` against the catalog's scale families.
///
/// Returns `None` only for empty input, or when nothing matches and the
/// catalog has no fallback family. The fallback carries low confidence and
/// no representative institution.
pub fn classify(catalog: &Catalog, points: &[f64], tolerance: f64) -> Option<ScaleClassification> {
    if points.is_empty() {
        return None;
    }

    for family in catalog.scale_families() {
        let matched = points.iter().copied().find(|p| {
            family
                .fingerprint_points
                .iter()
                .any(|f| (p - f).abs() < tolerance)
        });
        if let Some(point) = matched {
            debug!("Scale family '{}' matched on {}", family.id, point);
            return Some(ScaleClassification {
                family_id: family.id.clone(),
                confidence: Confidence::High,
                representative_institution_key: Some(family.representative_institution_key.clone()),
                matched_point: Some(point),
            });
        }
    }

    let fallback = catalog.fallback_family()?;
    warn!(
        "No scale fingerprint among {:?}; guessing family '{}' with low confidence",
        points, fallback.id
    );
    Some(ScaleClassification {
        family_id: fallback.id.clone(),
        confidence: Confidence::Low,
        representative_institution_key: None,
        matched_point: None,
    })
}
