//! Custom-scale synthesis from observed grade points.
//!
//! A positional heuristic: the highest observed point is paired with `A+`,
//! the next with `A`, and so on down a fixed letter ladder. It assumes but
//! never verifies that the observed points are the institution's own
//! ladder in descending order.

use crate::output::{CustomScale, LetterPoint};

/// Letter ladder used for positional pairing, best first.
pub const CANONICAL_LETTERS: [&str; 12] =
    ["A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "F"];

pub const CUSTOM_SCALE_NAME: &str = "Custom (Detected)";
pub const CUSTOM_SCALE_SHORT_NAME: &str = "Custom";
pub const CUSTOM_SCALE_CEILING: f64 = 4.0;

/// Build a custom scale from distinct `points` (any order).
///
/// `observed_letters` only feeds `corroborated_letters`; it never changes
/// the pairing. The result always ends with an `F` entry.
pub fn synthesize(points: &[f64], observed_letters: &[String]) -> CustomScale {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted.dedup();

    let mut grades: Vec<LetterPoint> = CANONICAL_LETTERS
        .iter()
        .zip(sorted)
        .map(|(letter, point)| LetterPoint {
            letter: letter.to_string(),
            point,
        })
        .collect();

    if !grades.iter().any(|g| g.letter == "F") {
        grades.push(LetterPoint {
            letter: "F".to_string(),
            point: 0.0,
        });
    }

    let corroborated_letters = grades
        .iter()
        .filter(|g| observed_letters.iter().any(|o| *o == g.letter))
        .map(|g| g.letter.clone())
        .collect();

    CustomScale {
        key: CustomScale::KEY.to_string(),
        name: CUSTOM_SCALE_NAME.to_string(),
        short_name: CUSTOM_SCALE_SHORT_NAME.to_string(),
        scale_ceiling: CUSTOM_SCALE_CEILING,
        grades,
        corroborated_letters,
    }
}
