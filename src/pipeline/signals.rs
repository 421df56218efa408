//! Grade-signal extraction: numeric grade points and letter grades.
//!
//! Both extractors are pure set-builders over the same text and do not
//! interact.

use once_cell::sync::Lazy;
use regex::Regex;

/// `D.D` / `D.DD` with an integer part of 0–4. Digits and word
/// boundaries are ASCII-only.
static RE_GRADE_POINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)([0-4])\.([0-9]{1,2})(?-u:\b)").unwrap());

/// A single uppercase `A`–`F`, optionally followed by `+` or `-`.
///
/// The trailing alternation keeps `A` in `ABC` from matching while still
/// accepting `A+` (where `+` is not a word character).
static RE_LETTER_GRADE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)([A-F])(?:([+-])|(?-u:\b))").unwrap());

/// Distinct grade points in `[0, 4]`, highest first.
pub fn extract_grade_points(text: &str) -> Vec<f64> {
    let mut points: Vec<f64> = Vec::new();
    for m in RE_GRADE_POINT.find_iter(text) {
        let Ok(value) = m.as_str().parse::<f64>() else {
            continue;
        };
        if !(0.0..=4.0).contains(&value) {
            continue;
        }
        if !points.contains(&value) {
            points.push(value);
        }
    }
    points.sort_by(|a, b| b.total_cmp(a));
    points
}

/// Distinct letter grades in order of first occurrence, uppercased.
pub fn extract_letter_grades(text: &str) -> Vec<String> {
    let mut grades: Vec<String> = Vec::new();
    for caps in RE_LETTER_GRADE.captures_iter(text) {
        let mut grade = caps[1].to_ascii_uppercase();
        if let Some(modifier) = caps.get(2) {
            grade.push_str(modifier.as_str());
        }
        if !grades.contains(&grade) {
            grades.push(grade);
        }
    }
    grades
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_are_distinct_and_descending() {
        assert_eq!(
            extract_grade_points("GPA 3.75 and 3.25 and 3.75"),
            vec![3.75, 3.25]
        );
    }

    #[test]
    fn points_above_four_are_discarded() {
        // 4.5 matches the token shape but lies outside [0, 4].
        assert_eq!(extract_grade_points("4.5 4.00 0.5"), vec![4.0, 0.5]);
    }

    #[test]
    fn points_ignore_longer_numbers() {
        // 13.75 and 3.755 are not grade-point tokens.
        assert!(extract_grade_points("13.75 3.755 version 10.2").is_empty());
    }

    #[test]
    fn trailing_zero_dedupes_with_short_form() {
        assert_eq!(extract_grade_points("3.7 3.70"), vec![3.7]);
    }

    #[test]
    fn letters_in_first_occurrence_order() {
        assert_eq!(
            extract_letter_grades("Result: B+ then A- then B+ and F"),
            vec!["B+", "A-", "F"]
        );
    }

    #[test]
    fn letters_inside_words_are_ignored() {
        assert!(extract_letter_grades("ABC Database DEF").is_empty());
        assert_eq!(extract_letter_grades("CSE101 A"), vec!["A"]);
    }

    #[test]
    fn lowercase_letters_are_not_grades() {
        assert!(extract_letter_grades("a b c").is_empty());
    }

    #[test]
    fn only_ascii_characters_form_words() {
        // Bengali digits are neither grade-point digits nor word characters.
        assert!(extract_grade_points("৩.৭৫ 3.৭").is_empty());
        assert_eq!(extract_grade_points("জিপিএ৩3.70"), vec![3.7]);
        assert_eq!(extract_letter_grades("গA+ ফলাফলB"), vec!["A+", "B"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(extract_grade_points("").is_empty());
        assert!(extract_letter_grades("").is_empty());
    }
}
