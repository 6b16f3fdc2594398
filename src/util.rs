// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" cell/number handling so the rest of
// the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Extract the first run of decimal digits found anywhere in `s`.
///
/// Free-text quantities look like `4pcs`, `12 units` or `approx. 3 boxes`.
/// Any Unicode decimal digit counts (`٣` is 3). Returns `None` when the text
/// holds no digits at all; callers treat that as a quantity of 0.
pub fn parse_quantity(s: &str) -> Option<u64> {
    let m = DIGITS.find(s)?;
    // A digit run longer than u64 saturates rather than failing the load.
    let value = m.as_str().chars().try_fold(0u64, |acc, c| {
        acc.checked_mul(10)?.checked_add(decimal_value(c)?)
    });
    Some(value.unwrap_or(u64::MAX))
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DIGITS.is_match(c.encode_utf8(&mut buf))
}

// Decimal digits come in contiguous blocks of ten ordered 0..9, so the value
// is the offset from the start of the run of digit code points, modulo 10.
fn decimal_value(c: char) -> Option<u64> {
    if let Some(d) = c.to_digit(10) {
        return Some(d as u64);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut zero = c as u32;
    while let Some(prev) = zero
        .checked_sub(1)
        .and_then(char::from_u32)
        .filter(|p| is_decimal_digit(*p))
    {
        zero = prev as u32;
    }
    Some(((c as u32 - zero) % 10) as u64)
}

/// Parse a cost cell that arrived as text.
///
/// - Trims whitespace.
/// - Strips a leading `$` and thousands separators like `","`.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_cost(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_prefix('$').unwrap_or(s).trim();
    if s.is_empty() {
        return None;
    }
    let v = s.replace(',', "").parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// Compare two labels in natural order, so that `WW2` sorts before `WW10`.
///
/// Runs of ASCII digits compare by numeric value, everything else compares
/// character by character. Labels that are equal under that rule (`WW02` vs
/// `WW2`) fall back to plain string order so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut ai);
                let nb = take_digits(&mut bi);
                let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(&nb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                ai.next();
                bi.next();
            }
        }
    }
}

// Digit run with leading zeros removed, so length orders by magnitude.
fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = it.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        it.next();
    }
    let trimmed = run.trim_start_matches('0');
    trimmed.to_string()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - thousands separators (e.g., `1,234,567.89`).
    // Digits are grouped from the formatted string so magnitudes beyond the
    // integer types still render.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let mut res = group_thousands(int_part);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Dollar amount with two decimals, e.g. `$1,234.50` or `-$12.00`.
pub fn format_usd(n: f64) -> String {
    let s = format_number(n, 2);
    match s.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", s),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("4pcs", Some(4))]
    #[case("12 units", Some(12))]
    #[case("approx. 3 boxes of 20", Some(3))]
    #[case("007", Some(7))]
    #[case("\u{0663}pcs", Some(3))]
    #[case("\u{0967}\u{0968} units", Some(12))]
    #[case("\u{1D7DA} boxes", Some(2))]
    #[case("99999999999999999999999", Some(u64::MAX))]
    #[case("none", None)]
    #[case("", None)]
    fn quantity_takes_first_digit_run(#[case] input: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_quantity(input), expected);
    }

    #[rstest]
    #[case("100", Some(100.0))]
    #[case(" $1,250.75 ", Some(1250.75))]
    #[case("-3.5", Some(-3.5))]
    #[case("$", None)]
    #[case("n/a", None)]
    #[case("", None)]
    fn cost_text(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_cost(input), expected);
    }

    #[rstest]
    #[case("WW2", "WW10", Ordering::Less)]
    #[case("WW10", "WW9", Ordering::Greater)]
    #[case("WW01", "WW01", Ordering::Equal)]
    #[case("WW01", "WW1", Ordering::Less)]
    #[case("2024-WW3", "2025-WW1", Ordering::Less)]
    #[case("WW", "WW1", Ordering::Less)]
    #[case("Week 5", "Week 40", Ordering::Less)]
    fn natural_order(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(natural_cmp(a, b), expected);
        assert_eq!(natural_cmp(b, a), expected.reverse());
    }

    #[rstest]
    #[case(0.0, "$0.00")]
    #[case(1234.5, "$1,234.50")]
    #[case(-12.0, "-$12.00")]
    #[case(1_000_000.5, "$1,000,000.50")]
    #[case(999.0, "$999.00")]
    #[case(1e19, "$10,000,000,000,000,000,000.00")]
    #[case(-1e20, "-$100,000,000,000,000,000,000.00")]
    fn usd(#[case] n: f64, #[case] expected: &str) {
        assert_eq!(format_usd(n), expected);
    }

    #[test]
    fn counts_get_separators() {
        assert_eq!(format_int(9855usize), "9,855");
    }
}
