//! Institution catalog: the read-only reference data every analysis runs against.
//!
//! A [`Catalog`] is an ordered list of [`Institution`]s (each with recognition
//! keywords, case-insensitive regex patterns and a marks → letter → point
//! grading table) plus an ordered list of [`ScaleFamily`] fingerprints used
//! when no institution is named in the document.
//!
//! The catalog is built once (either [`Catalog::builtin`] or a JSON file via
//! [`Catalog::load`]), validated, and then shared behind an `Arc` by every
//! analysis. Nothing in the crate mutates it after construction.
//!
//! # JSON schema
//!
//! ```json
//! {
//!   "institutions": [{
//!     "key": "nsu",
//!     "display_name": "North South University (NSU)",
//!     "short_name": "NSU",
//!     "scale_ceiling": 4.0,
//!     "keywords": ["north south university", "nsu"],
//!     "patterns": ["north\\s*south\\s*university"],
//!     "grades": [{ "letter": "A", "min_marks": 93, "max_marks": 100, "point": 4.0 }]
//!   }],
//!   "scale_families": [{
//!     "id": "tenths",
//!     "member_institution_keys": ["nsu"],
//!     "fingerprint_points": [3.7, 3.3],
//!     "representative_institution_key": "nsu"
//!   }],
//!   "fallback_family": "tenths"
//! }
//! ```

use crate::error::TranscriptError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;

/// One row of a grading table.
///
/// `min_marks..=max_marks` is inclusive; the bands of one institution
/// partition `[0, 100]` on whole marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub letter: String,
    pub min_marks: f64,
    pub max_marks: f64,
    pub point: f64,
}

/// A known institution with its canonical grading scale.
#[derive(Debug, Clone, Serialize)]
pub struct Institution {
    /// Unique, lowercase, stable identifier (e.g. `"buet"`).
    pub key: String,
    pub display_name: String,
    pub short_name: String,
    /// Maximum grade point of the scale (4.0 for every built-in entry).
    pub scale_ceiling: f64,
    /// Grading table, highest band first.
    pub grades: Vec<GradeBand>,
    /// Lowercased substrings matched against the lowercased document text.
    pub keywords: Vec<String>,
    /// Case-insensitive patterns, tried only after every keyword failed.
    #[serde(serialize_with = "serialize_patterns")]
    pub patterns: Vec<Regex>,
}

/// Group of institutions sharing the same fractional grade-point increments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFamily {
    pub id: String,
    pub member_institution_keys: Vec<String>,
    /// Point values that only this family uses (e.g. 3.67, 3.33 …).
    pub fingerprint_points: Vec<f64>,
    pub representative_institution_key: String,
}

/// Lookup seam for the GPA-averaging side: letter → point for one scale.
///
/// `None` means "leave this course out of the weighted average", never zero.
pub trait PointScale {
    /// Institution key, or a synthetic key for detected scales.
    fn scale_key(&self) -> &str;

    /// Highest attainable point.
    fn scale_ceiling(&self) -> f64;

    /// Numeric point for `letter`, matched after trimming and uppercasing.
    fn point_for(&self, letter: &str) -> Option<f64>;
}

impl PointScale for Institution {
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

impl Institution {
    /// Letter grade for a raw mark in `[0, 100]`.
    ///
    /// Fractional marks fall into the highest band whose `min_marks` they
    /// reach, so 44.5 at BUET is still an F.
    pub fn letter_for_marks(&self, marks: f64) -> Option<&str> {
        if !(0.0..=100.0).contains(&marks) {
            return None;
        }
        self.grades
            .iter()
            .filter(|g| marks >= g.min_marks)
            .max_by(|a, b| a.min_marks.total_cmp(&b.min_marks))
            .map(|g| g.letter.as_str())
    }
}

/// Trim and uppercase a letter grade for comparison.
pub(crate) fn normalise_letter(letter: &str) -> String {
    letter.trim().to_ascii_uppercase()
}

fn serialize_patterns<S: Serializer>(patterns: &[Regex], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(patterns.iter().map(Regex::as_str))
}

/// Serialised form of an institution; patterns are still source strings.
#[derive(Debug, Clone, Deserialize)]
pub struct InstitutionDef {
    pub key: String,
    pub display_name: String,
    pub short_name: String,
    #[serde(default = "default_ceiling")]
    pub scale_ceiling: f64,
    pub grades: Vec<GradeBand>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_ceiling() -> f64 {
    4.0
}

impl InstitutionDef {
    fn compile(self) -> Result<Institution, TranscriptError> {
        let patterns = self
            .patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| TranscriptError::InvalidPattern {
                        institution: self.key.clone(),
                        pattern: p.clone(),
                        detail: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut grades = self.grades;
        for band in &mut grades {
            band.letter = normalise_letter(&band.letter);
        }
        grades.sort_by(|a, b| b.min_marks.total_cmp(&a.min_marks));

        Ok(Institution {
            key: self.key,
            display_name: self.display_name,
            short_name: self.short_name,
            scale_ceiling: self.scale_ceiling,
            grades,
            keywords: self.keywords.iter().map(|k| k.to_lowercase()).collect(),
            patterns,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    institutions: Vec<InstitutionDef>,
    #[serde(default)]
    scale_families: Vec<ScaleFamily>,
    #[serde(default)]
    fallback_family: Option<String>,
}

/// Immutable, ordered set of institutions and scale families.
///
/// Order matters: detection is first-match-wins over `institutions`, and
/// classification checks `scale_families` in the stored order.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    institutions: Vec<Institution>,
    scale_families: Vec<ScaleFamily>,
    fallback_family: Option<String>,
}

impl Catalog {
    /// Compile and validate a catalog from its parts.
    pub fn new(
        institutions: Vec<InstitutionDef>,
        scale_families: Vec<ScaleFamily>,
        fallback_family: Option<String>,
    ) -> Result<Self, TranscriptError> {
        let institutions = institutions
            .into_iter()
            .map(InstitutionDef::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let catalog = Self {
            institutions,
            scale_families,
            fallback_family,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse a catalog from JSON (see the module docs for the schema).
    pub fn from_json(json: &str) -> Result<Self, TranscriptError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| TranscriptError::CatalogParse(e.to_string()))?;
        Self::new(file.institutions, file.scale_families, file.fallback_family)
    }

    /// Read and parse a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TranscriptError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| TranscriptError::CatalogRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }

    /// The ten Bangladeshi institutions and three scale families shipped
    /// with the crate.
    pub fn builtin() -> Self {
        let institutions = BUILTIN_INSTITUTIONS
            .iter()
            .map(BuiltinInstitution::to_def)
            .collect();
        let families = BUILTIN_FAMILIES
            .iter()
            .map(|(id, members, points, rep)| ScaleFamily {
                id: id.to_string(),
                member_institution_keys: members.iter().map(|m| m.to_string()).collect(),
                fingerprint_points: points.to_vec(),
                representative_institution_key: rep.to_string(),
            })
            .collect();
        Self::new(institutions, families, Some("quarters".to_string()))
            .expect("built-in catalog is valid")
    }

    pub fn institutions(&self) -> &[Institution] {
        &self.institutions
    }

    /// Scale families in classification priority order.
    pub fn scale_families(&self) -> &[ScaleFamily] {
        &self.scale_families
    }

    /// Family reported (with low confidence) when no fingerprint matches.
    pub fn fallback_family(&self) -> Option<&ScaleFamily> {
        let id = self.fallback_family.as_deref()?;
        self.scale_families.iter().find(|f| f.id == id)
    }

    pub fn get(&self, key: &str) -> Option<&Institution> {
        self.institutions.iter().find(|i| i.key == key)
    }

    pub fn family(&self, id: &str) -> Option<&ScaleFamily> {
        self.scale_families.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }

    /// `(letterGrade, institutionKey) -> point`; `None` for unknown key or letter.
    pub fn grade_point(&self, key: &str, letter: &str) -> Option<f64> {
        self.get(key)?.point_for(letter)
    }

    /// `(institutionKey, marks) -> letter`; `None` for unknown key or marks
    /// outside `[0, 100]`.
    pub fn letter_for_marks(&self, key: &str, marks: f64) -> Option<&str> {
        self.get(key)?.letter_for_marks(marks)
    }

    /// Check every structural invariant of the catalog.
    pub fn validate(&self) -> Result<(), TranscriptError> {
        let mut keys = HashSet::new();
        for inst in &self.institutions {
            if inst.key.is_empty() || inst.key != inst.key.to_lowercase() {
                return Err(invalid(format!(
                    "institution key '{}' must be non-empty and lowercase",
                    inst.key
                )));
            }
            if !keys.insert(inst.key.as_str()) {
                return Err(invalid(format!("duplicate institution key '{}'", inst.key)));
            }
            validate_grades(inst)?;
        }

        let mut family_ids = HashSet::new();
        for family in &self.scale_families {
            if !family_ids.insert(family.id.as_str()) {
                return Err(invalid(format!("duplicate scale family '{}'", family.id)));
            }
            if family.fingerprint_points.is_empty() {
                return Err(invalid(format!(
                    "scale family '{}' has no fingerprint points",
                    family.id
                )));
            }
            for key in &family.member_institution_keys {
                if !keys.contains(key.as_str()) {
                    return Err(invalid(format!(
                        "scale family '{}' names unknown institution '{key}'",
                        family.id
                    )));
                }
            }
            if !family
                .member_institution_keys
                .contains(&family.representative_institution_key)
            {
                return Err(invalid(format!(
                    "representative '{}' of scale family '{}' is not a member",
                    family.representative_institution_key, family.id
                )));
            }
        }

        if let Some(ref id) = self.fallback_family {
            if !family_ids.contains(id.as_str()) {
                return Err(invalid(format!("fallback family '{id}' is not defined")));
            }
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn invalid(msg: String) -> TranscriptError {
    TranscriptError::InvalidCatalog(msg)
}

fn validate_grades(inst: &Institution) -> Result<(), TranscriptError> {
    if inst.grades.is_empty() {
        return Err(invalid(format!("'{}' has no grade bands", inst.key)));
    }
    if inst.scale_ceiling <= 0.0 {
        return Err(invalid(format!("'{}' has a non-positive scale ceiling", inst.key)));
    }

    let mut letters = HashSet::new();
    for band in &inst.grades {
        if !letters.insert(band.letter.as_str()) {
            return Err(invalid(format!(
                "'{}' lists letter '{}' twice",
                inst.key, band.letter
            )));
        }
        if band.min_marks > band.max_marks {
            return Err(invalid(format!(
                "'{}' band '{}' has min_marks above max_marks",
                inst.key, band.letter
            )));
        }
        if !(0.0..=inst.scale_ceiling).contains(&band.point) {
            return Err(invalid(format!(
                "'{}' band '{}' point {} is outside [0, {}]",
                inst.key, band.letter, band.point, inst.scale_ceiling
            )));
        }
    }

    // `grades` is sorted highest band first; walk it bottom-up.
    let mut expected_min = 0.0;
    for band in inst.grades.iter().rev() {
        if (band.min_marks - expected_min).abs() > f64::EPSILON {
            return Err(invalid(format!(
                "'{}' bands leave a gap or overlap at {} marks (band '{}' starts at {})",
                inst.key, expected_min, band.letter, band.min_marks
            )));
        }
        expected_min = band.max_marks + 1.0;
    }
    if (expected_min - 101.0).abs() > f64::EPSILON {
        return Err(invalid(format!(
            "'{}' bands do not reach 100 marks",
            inst.key
        )));
    }
    Ok(())
}

// ── Built-in data ────────────────────────────────────────────────────────

type Band = (&'static str, f64, f64, f64);

struct BuiltinInstitution {
    key: &'static str,
    display_name: &'static str,
    short_name: &'static str,
    keywords: &'static [&'static str],
    patterns: &'static [&'static str],
    grades: &'static [Band],
}

impl BuiltinInstitution {
    fn to_def(&self) -> InstitutionDef {
        InstitutionDef {
            key: self.key.to_string(),
            display_name: self.display_name.to_string(),
            short_name: self.short_name.to_string(),
            scale_ceiling: 4.0,
            grades: self
                .grades
                .iter()
                .map(|&(letter, min_marks, max_marks, point)| GradeBand {
                    letter: letter.to_string(),
                    min_marks,
                    max_marks,
                    point,
                })
                .collect(),
            keywords: self.keywords.iter().map(|k| k.to_string()).collect(),
            patterns: self.patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

const BUET_GRADES: &[Band] = &[
    ("A+", 90.0, 100.0, 4.0),
    ("A", 85.0, 89.0, 3.75),
    ("A-", 80.0, 84.0, 3.5),
    ("B+", 75.0, 79.0, 3.25),
    ("B", 70.0, 74.0, 3.0),
    ("B-", 65.0, 69.0, 2.75),
    ("C+", 60.0, 64.0, 2.5),
    ("C", 55.0, 59.0, 2.25),
    ("C-", 50.0, 54.0, 2.0),
    ("D", 45.0, 49.0, 1.75),
    ("F", 0.0, 44.0, 0.0),
];

/// DU and DIU share one table.
const DHAKA_GRADES: &[Band] = &[
    ("A+", 80.0, 100.0, 4.0),
    ("A", 75.0, 79.0, 3.75),
    ("A-", 70.0, 74.0, 3.5),
    ("B+", 65.0, 69.0, 3.25),
    ("B", 60.0, 64.0, 3.0),
    ("B-", 55.0, 59.0, 2.75),
    ("C+", 50.0, 54.0, 2.5),
    ("C", 45.0, 49.0, 2.25),
    ("D", 40.0, 44.0, 2.0),
    ("F", 0.0, 39.0, 0.0),
];

const NSU_GRADES: &[Band] = &[
    ("A", 93.0, 100.0, 4.0),
    ("A-", 90.0, 92.0, 3.7),
    ("B+", 87.0, 89.0, 3.3),
    ("B", 83.0, 86.0, 3.0),
    ("B-", 80.0, 82.0, 2.7),
    ("C+", 77.0, 79.0, 2.3),
    ("C", 73.0, 76.0, 2.0),
    ("C-", 70.0, 72.0, 1.7),
    ("D+", 67.0, 69.0, 1.3),
    ("D", 60.0, 66.0, 1.0),
    ("F", 0.0, 59.0, 0.0),
];

const BRACU_GRADES: &[Band] = &[
    ("A", 90.0, 100.0, 4.0),
    ("A-", 85.0, 89.0, 3.7),
    ("B+", 80.0, 84.0, 3.3),
    ("B", 75.0, 79.0, 3.0),
    ("B-", 70.0, 74.0, 2.7),
    ("C+", 65.0, 69.0, 2.3),
    ("C", 60.0, 64.0, 2.0),
    ("C-", 55.0, 59.0, 1.7),
    ("D+", 50.0, 54.0, 1.3),
    ("D", 45.0, 49.0, 1.0),
    ("F", 0.0, 44.0, 0.0),
];

const IUB_GRADES: &[Band] = &[
    ("A", 90.0, 100.0, 4.0),
    ("A-", 85.0, 89.0, 3.67),
    ("B+", 80.0, 84.0, 3.33),
    ("B", 75.0, 79.0, 3.0),
    ("B-", 70.0, 74.0, 2.67),
    ("C+", 65.0, 69.0, 2.33),
    ("C", 60.0, 64.0, 2.0),
    ("C-", 55.0, 59.0, 1.67),
    ("D+", 50.0, 54.0, 1.33),
    ("D", 45.0, 49.0, 1.0),
    ("F", 0.0, 44.0, 0.0),
];

const AIUB_GRADES: &[Band] = &[
    ("A+", 90.0, 100.0, 4.0),
    ("A", 85.0, 89.0, 3.75),
    ("B+", 80.0, 84.0, 3.5),
    ("B", 75.0, 79.0, 3.25),
    ("C+", 70.0, 74.0, 3.0),
    ("C", 65.0, 69.0, 2.75),
    ("D+", 60.0, 64.0, 2.5),
    ("D", 50.0, 59.0, 2.25),
    ("F", 0.0, 49.0, 0.0),
];

/// CUET, RUET and KUET share one table.
const ENGINEERING_GRADES: &[Band] = &[
    ("A+", 90.0, 100.0, 4.0),
    ("A", 85.0, 89.0, 3.75),
    ("A-", 80.0, 84.0, 3.5),
    ("B+", 75.0, 79.0, 3.25),
    ("B", 70.0, 74.0, 3.0),
    ("B-", 65.0, 69.0, 2.75),
    ("C+", 60.0, 64.0, 2.5),
    ("C", 55.0, 59.0, 2.25),
    ("D", 50.0, 54.0, 2.0),
    ("F", 0.0, 49.0, 0.0),
];

const BUILTIN_INSTITUTIONS: &[BuiltinInstitution] = &[
    BuiltinInstitution {
        key: "buet",
        display_name: "Bangladesh University of Engineering and Technology (BUET)",
        short_name: "BUET",
        keywords: &["buet", "bangladesh university of engineering and technology"],
        patterns: &[r"buet", r"engineering\s*and\s*technology"],
        grades: BUET_GRADES,
    },
    BuiltinInstitution {
        key: "du",
        display_name: "University of Dhaka (DU)",
        short_name: "DU",
        keywords: &["university of dhaka", "dhaka university"],
        patterns: &[r"university\s*of\s*dhaka", r"dhaka\s*university"],
        grades: DHAKA_GRADES,
    },
    BuiltinInstitution {
        key: "nsu",
        display_name: "North South University (NSU)",
        short_name: "NSU",
        keywords: &["north south university", "nsu"],
        patterns: &[r"north\s*south\s*university"],
        grades: NSU_GRADES,
    },
    BuiltinInstitution {
        key: "bracu",
        display_name: "BRAC University (BRACU)",
        short_name: "BRACU",
        keywords: &["brac university", "bracu"],
        patterns: &[r"brac\s*university"],
        grades: BRACU_GRADES,
    },
    BuiltinInstitution {
        key: "iub",
        display_name: "Independent University, Bangladesh (IUB)",
        short_name: "IUB",
        keywords: &["independent university", "iub"],
        patterns: &[r"independent\s*university"],
        grades: IUB_GRADES,
    },
    BuiltinInstitution {
        key: "aiub",
        display_name: "American International University-Bangladesh (AIUB)",
        short_name: "AIUB",
        keywords: &["american international university-bangladesh", "aiub"],
        patterns: &[r"american\s*international\s*university", r"aiub"],
        grades: AIUB_GRADES,
    },
    BuiltinInstitution {
        key: "cuet",
        display_name: "Chittagong University of Engineering & Technology (CUET)",
        short_name: "CUET",
        keywords: &["chittagong university of engineering", "cuet"],
        patterns: &[r"chittagong\s*university\s*of\s*engineering", r"cuet"],
        grades: ENGINEERING_GRADES,
    },
    BuiltinInstitution {
        key: "ruet",
        display_name: "Rajshahi University of Engineering & Technology (RUET)",
        short_name: "RUET",
        keywords: &["rajshahi university of engineering", "ruet"],
        patterns: &[r"rajshahi\s*university\s*of\s*engineering", r"ruet"],
        grades: ENGINEERING_GRADES,
    },
    BuiltinInstitution {
        key: "kuet",
        display_name: "Khulna University of Engineering & Technology (KUET)",
        short_name: "KUET",
        keywords: &["khulna university of engineering", "kuet"],
        patterns: &[r"khulna\s*university\s*of\s*engineering", r"kuet"],
        grades: ENGINEERING_GRADES,
    },
    BuiltinInstitution {
        key: "diu",
        display_name: "Daffodil International University (DIU)",
        short_name: "DIU",
        keywords: &["daffodil international university", "diu"],
        patterns: &[r"daffodil\s*international", r"diu"],
        grades: DHAKA_GRADES,
    },
];

/// `(id, members, fingerprints, representative)`, most specific family first.
const BUILTIN_FAMILIES: &[(&str, &[&str], &[f64], &str)] = &[
    ("thirds", &["iub"], &[3.67, 3.33, 2.67, 2.33, 1.67, 1.33], "iub"),
    (
        "tenths",
        &["nsu", "bracu"],
        &[3.7, 3.3, 2.7, 2.3, 1.7, 1.3],
        "nsu",
    ),
    (
        "quarters",
        &["buet", "aiub", "cuet", "ruet", "kuet", "du", "diu"],
        &[3.75, 3.25, 2.75, 2.25, 1.75],
        "buet",
    ),
];
