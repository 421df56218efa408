//! Result types produced by an analysis.
//!
//! [`AnalysisOutcome`] is the single value returned per document. It is
//! created fresh by every call, never mutated after return, and contains no
//! timestamps or timings, so analysing the same bytes twice yields equal
//! outcomes.

use crate::catalog::{normalise_letter, Catalog, PointScale};
use crate::error::ExtractionError;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative strength of a detection. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which signal produced the institution key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    Keyword,
    Pattern,
    ScaleInference,
    #[default]
    None,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::Keyword => "keyword",
            DetectionMethod::Pattern => "pattern",
            DetectionMethod::ScaleInference => "scale-inference",
            DetectionMethod::None => "none",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Institution decision for one analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub institution_key: Option<String>,
    pub confidence: Confidence,
    pub method: DetectionMethod,
}

impl DetectionResult {
    /// A direct textual hit; always high confidence.
    pub fn direct(key: impl Into<String>, method: DetectionMethod) -> Self {
        Self {
            institution_key: Some(key.into()),
            confidence: Confidence::High,
            method,
        }
    }

    /// Nothing detected.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_hit(&self) -> bool {
        self.institution_key.is_some()
    }
}

/// Scale-family verdict from the observed grade points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleClassification {
    pub family_id: String,
    pub confidence: Confidence,
    /// `None` for the fallback guess ("unknown" institution).
    pub representative_institution_key: Option<String>,
    /// The observed point that matched a fingerprint, if any.
    pub matched_point: Option<f64>,
}

impl ScaleClassification {
    /// True for the no-evidence fallback family guess.
    pub fn is_weak_guess(&self) -> bool {
        self.representative_institution_key.is_none()
    }
}

/// One best-effort course line. May be a false positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCourseRecord {
    pub raw_line: String,
    pub code: Option<String>,
    pub name: Option<String>,
    pub credit: f64,
    pub grade: String,
}

/// One letter → point pair of a synthesized scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterPoint {
    pub letter: String,
    pub point: f64,
}

/// Grading scale fabricated from the observed grade points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomScale {
    /// Always [`CustomScale::KEY`].
    pub key: String,
    pub name: String,
    pub short_name: String,
    pub scale_ceiling: f64,
    /// Highest point first; always ends with an `F` entry.
    pub grades: Vec<LetterPoint>,
    /// Synthesized letters that also appear as letter grades in the text.
    pub corroborated_letters: Vec<String>,
}

impl CustomScale {
    pub const KEY: &'static str = "custom";
}

impl PointScale for CustomScale {
    fn scale_key(&self) -> &str {
        &self.key
    }

    fn scale_ceiling(&self) -> f64 {
        self.scale_ceiling
    }

    fn point_for(&self, letter: &str) -> Option<f64> {
        let letter = normalise_letter(letter);
        self.grades
            .iter()
            .find(|g| g.letter == letter)
            .map(|g| g.point)
    }
}

/// Everything one analysis call learned about a document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Institution found, a scale family classified, or a custom scale built.
    pub success: bool,
    pub file_name: String,
    /// `None` only when the bytes could not be read at all.
    pub document_kind: Option<DocumentKind>,
    pub detection: DetectionResult,
    pub scale_family: Option<ScaleClassification>,
    /// Distinct points in `[0, 4]`, highest first.
    pub detected_grade_points: Vec<f64>,
    /// Distinct letter grades in first-occurrence order.
    pub detected_grades: Vec<String>,
    pub courses: Vec<ExtractedCourseRecord>,
    pub custom_scale: Option<CustomScale>,
    /// Extracted document text followed by `" " + file_name`.
    pub raw_text: String,
    /// Set only when text extraction failed.
    pub error: Option<ExtractionError>,
}

impl AnalysisOutcome {
    pub fn institution_key(&self) -> Option<&str> {
        self.detection.institution_key.as_deref()
    }

    pub fn confidence(&self) -> Confidence {
        self.detection.confidence
    }

    /// No error, and nothing usable detected: the caller should ask the
    /// user to pick an institution.
    pub fn is_inconclusive(&self) -> bool {
        !self.success && self.error.is_none()
    }

    /// Institution key a caller should pre-select.
    ///
    /// Direct detection beats the classifier's representative; the
    /// synthesized scale never names an institution.
    pub fn resolved_institution(&self) -> Option<&str> {
        self.institution_key().or_else(|| {
            self.scale_family
                .as_ref()
                .and_then(|s| s.representative_institution_key.as_deref())
        })
    }

    /// Scale to apply for grade lookups: the resolved institution's, else
    /// the synthesized custom scale.
    pub fn selected_scale<'a>(&'a self, catalog: &'a Catalog) -> Option<&'a dyn PointScale> {
        if let Some(inst) = self.resolved_institution().and_then(|k| catalog.get(k)) {
            return Some(inst as &dyn PointScale);
        }
        self.custom_scale.as_ref().map(|s| s as &dyn PointScale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom() -> CustomScale {
        CustomScale {
            key: CustomScale::KEY.into(),
            name: "Custom (Detected)".into(),
            short_name: "Custom".into(),
            scale_ceiling: 4.0,
            grades: vec![
                LetterPoint { letter: "A+".into(), point: 4.0 },
                LetterPoint { letter: "F".into(), point: 0.0 },
            ],
            corroborated_letters: vec![],
        }
    }

    #[test]
    fn confidence_orders_low_to_high() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
        assert_eq!(Confidence::Medium.max(Confidence::High), Confidence::High);
    }

    #[test]
    fn method_serialises_kebab_case() {
        let json = serde_json::to_string(&DetectionMethod::ScaleInference).unwrap();
        assert_eq!(json, "\"scale-inference\"");
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"high\"");
    }

    #[test]
    fn resolved_institution_prefers_direct_hit() {
        let outcome = AnalysisOutcome {
            detection: DetectionResult::direct("buet", DetectionMethod::Keyword),
            scale_family: Some(ScaleClassification {
                family_id: "tenths".into(),
                confidence: Confidence::High,
                representative_institution_key: Some("nsu".into()),
                matched_point: Some(3.7),
            }),
            ..Default::default()
        };
        assert_eq!(outcome.resolved_institution(), Some("buet"));
    }

    #[test]
    fn resolved_institution_ignores_weak_guess() {
        let outcome = AnalysisOutcome {
            scale_family: Some(ScaleClassification {
                family_id: "quarters".into(),
                confidence: Confidence::Low,
                representative_institution_key: None,
                matched_point: None,
            }),
            ..Default::default()
        };
        assert_eq!(outcome.resolved_institution(), None);
        assert!(outcome.is_inconclusive());
    }

    #[test]
    fn selected_scale_falls_back_to_custom() {
        let catalog = Catalog::builtin();
        let outcome = AnalysisOutcome {
            custom_scale: Some(custom()),
            ..Default::default()
        };
        let scale = outcome.selected_scale(&catalog).unwrap();
        assert_eq!(scale.scale_key(), "custom");
        assert_eq!(scale.point_for("a+"), Some(4.0));
        assert_eq!(scale.point_for("B"), None);
    }

    #[test]
    fn selected_scale_uses_catalog_institution() {
        let catalog = Catalog::builtin();
        let outcome = AnalysisOutcome {
            detection: DetectionResult::direct("iub", DetectionMethod::Pattern),
            custom_scale: Some(custom()),
            ..Default::default()
        };
        let scale = outcome.selected_scale(&catalog).unwrap();
        assert_eq!(scale.scale_key(), "iub");
        assert_eq!(scale.point_for("A-"), Some(3.67));
    }
}
