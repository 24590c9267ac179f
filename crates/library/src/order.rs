//! Name ordering.
//!
//! Pages are ordered "naturally" (`2.jpg` before `10.jpg`) while title and
//! chapter directories use a plain case-insensitive order. Both comparators
//! fall back to the raw name on ties, so the order is total and two scans of
//! the same tree always agree.

use std::cmp::Ordering;

/// Width that digit runs are left-padded to.
const DIGIT_WIDTH: usize = 10;

/// Sort key for natural ordering.
///
/// The name is lowercased, leading zeros are stripped from every run of ASCII
/// digits and the run is left-padded with zeros to a fixed width, so that
/// numeric runs compare by value. A name with a longer run is padded to the
/// length of that run instead.
///
/// ```
/// use shelf_library::order::natural_key;
///
/// assert_eq!(natural_key("Page007.JPG"), "page0000000007.jpg");
/// ```
pub fn natural_key(name: &str) -> String {
    padded_key(name, DIGIT_WIDTH.max(longest_run(name)))
}

/// Compare two names by their natural keys, then by the raw name.
///
/// Both keys are padded to the same width, so digit runs longer than the
/// default width still compare by value.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let width = DIGIT_WIDTH.max(longest_run(a)).max(longest_run(b));
    padded_key(a, width).cmp(&padded_key(b, width)).then_with(|| a.cmp(b))
}

fn padded_key(name: &str, width: usize) -> String {
    let mut key = String::with_capacity(name.len() + width);
    let mut digits = String::new();
    for c in name.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        push_digits(&mut key, &mut digits, width);
        key.extend(c.to_lowercase());
    }
    push_digits(&mut key, &mut digits, width);
    key
}

fn push_digits(key: &mut String, digits: &mut String, width: usize) {
    if digits.is_empty() {
        return;
    }
    let trimmed = digits.trim_start_matches('0');
    for _ in trimmed.len()..width {
        key.push('0');
    }
    key.push_str(trimmed);
    digits.clear();
}

/// Length of the longest run of ASCII digits in `name`, leading zeros
/// excluded.
fn longest_run(name: &str) -> usize {
    name.split(|c: char| !c.is_ascii_digit())
        .map(|run| run.trim_start_matches('0').len())
        .max()
        .unwrap_or(0)
}

/// Compare two directory names case-insensitively, then by the raw name.
pub fn directory_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
