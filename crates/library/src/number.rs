//! Chapter numbers from directory names.

use regex::Regex;
use std::sync::LazyLock;

static CHAPTER_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:ch(?:apter)?\.?\s*)?([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Extract the chapter number from a chapter directory name.
///
/// Recognizes an optional `ch`/`chapter` label (any case, optionally
/// followed by `.` and whitespace) in front of the first number in the name.
/// A number is a run of ASCII digits, optionally followed by `.` and a
/// second run of digits. The first number wins; names without one (or whose
/// number does not fit in a finite `f64`) have no chapter number.
///
/// ```
/// use shelf_library::number::chapter_number;
///
/// assert_eq!(chapter_number("Chapter 12"), Some(12.0));
/// assert_eq!(chapter_number("Ch. 4.5"), Some(4.5));
/// assert_eq!(chapter_number("Oneshot"), None);
/// ```
pub fn chapter_number(name: &str) -> Option<f64> {
    let number = CHAPTER_NUMBER_REGEX.captures(name)?.get(1)?;
    number.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}
