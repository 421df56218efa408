//! Best-effort course-line extraction.
//!
//! Each line is tried against a fixed list of line shapes, most structured
//! first; the first shape that matches wins and later shapes are not tried.
//! Lines matching no shape are skipped silently. Results may include false
//! positives (a header row that happens to end in `3 A`) and miss real
//! courses laid out differently; callers must treat them as a hint.

use crate::output::ExtractedCourseRecord;
use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};
use tracing::trace;

/// Capture-group layout of one line shape.
struct LineShape {
    label: &'static str,
    regex: Regex,
    code: Option<usize>,
    name: Option<usize>,
    credit: usize,
    /// Group whose leading number is consulted when `credit` does not parse
    /// to a positive number.
    fallback_credit: Option<usize>,
    grade: usize,
}

fn shape(
    label: &'static str,
    pattern: &str,
    code: Option<usize>,
    name: Option<usize>,
    credit: usize,
    fallback_credit: Option<usize>,
    grade: usize,
) -> LineShape {
    LineShape {
        label,
        regex: RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap(),
        code,
        name,
        credit,
        fallback_credit,
        grade,
    }
}

static RE_LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)").unwrap());

static LINE_SHAPES: Lazy<Vec<LineShape>> = Lazy::new(|| {
    vec![
        // CODE NAME CREDIT GRADE POINT
        shape(
            "code-name-credit-grade-point",
            r"([A-Z]{2,4}\s*[0-9]{3,4}[A-Z]?)\s+(.+?)\s+([0-9]+\.?[0-9]*)\s+([A-F][+-]?)\s+([0-9]+\.?[0-9]*)",
            Some(1),
            Some(2),
            3,
            Some(2),
            4,
        ),
        // NAME CREDIT GRADE
        shape(
            "name-credit-grade",
            r"(.+?)\s+([0-9]+\.?[0-9]*)\s+([A-F][+-]?)\s*$",
            None,
            Some(1),
            2,
            None,
            3,
        ),
        // CODE GRADE CREDIT
        shape(
            "code-grade-credit",
            r"([A-Z]{2,4}\s*[0-9]{3,4})\s+([A-F][+-]?)\s+([0-9]+\.?[0-9]*)",
            Some(1),
            None,
            3,
            None,
            2,
        ),
    ]
});

/// Extract course records in line order.
///
/// Lines are split on `\n` or `\r`, trimmed, and skipped when shorter than
/// `min_line_chars` characters. `default_credit` is used when no credit
/// capture parses to a positive number.
pub fn extract_courses(
    text: &str,
    min_line_chars: usize,
    default_credit: f64,
) -> Vec<ExtractedCourseRecord> {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| line.chars().count() >= min_line_chars)
        .filter_map(|line| parse_line(line, default_credit))
        .collect()
}

/// Try every line shape in order against one trimmed line.
pub fn parse_line(line: &str, default_credit: f64) -> Option<ExtractedCourseRecord> {
    LINE_SHAPES.iter().find_map(|shape| {
        let caps = shape.regex.captures(line)?;
        trace!("Line matched shape '{}': {}", shape.label, line);
        Some(ExtractedCourseRecord {
            raw_line: line.to_string(),
            code: shape.code.and_then(|g| group(&caps, g)),
            name: shape.name.and_then(|g| group(&caps, g)),
            credit: positive(&caps, Some(shape.credit))
                .or_else(|| positive(&caps, shape.fallback_credit))
                .unwrap_or(default_credit),
            grade: caps[shape.grade].to_ascii_uppercase(),
        })
    })
}

fn group(caps: &Captures<'_>, idx: usize) -> Option<String> {
    caps.get(idx)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Leading decimal number of a capture (`"3 Credits Lab"` → 3), if positive.
fn positive(caps: &Captures<'_>, idx: Option<usize>) -> Option<f64> {
    let m = caps.get(idx?)?;
    RE_LEADING_NUMBER
        .find(m.as_str().trim_start())
        .and_then(|n| n.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}
