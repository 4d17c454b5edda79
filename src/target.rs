// Target ("Meta") parsing.
//
// Goal strings are free text typed into the indicator sheet, e.g. `"≥ 95%"`,
// `"≤ 5%"` or `"90%"`. Only the first number is read; a range such as
// `"90-95%"` yields 0.90. Only ASCII digits are recognized, so `"≤ ٥%"` has
// no target.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]+\.?[0-9]*").expect("number pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Observed value must not exceed the target (`≤`, `<`).
    AtMost,
    /// Observed value must reach the target (`≥`, `>`, or no symbol).
    AtLeast,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParsedTarget {
    pub ratio: f64,
    pub direction: Direction,
}

/// Direction is decided by symbol scanning alone, independently of whether a
/// number is present.
pub fn direction_of(text: &str) -> Direction {
    if text.contains('≤') || text.contains('<') {
        Direction::AtMost
    } else {
        Direction::AtLeast
    }
}

/// Parse a goal string into a target ratio in `[0, 1]` (for 0–100 inputs) and
/// its comparison direction. `None` when the input is missing or carries no
/// number.
pub fn parse_target(text: Option<&str>) -> Option<ParsedTarget> {
    let text = text?;
    let m = NUMBER_RE.find(text)?;
    let value = m.as_str().parse::<f64>().ok()?;
    Some(ParsedTarget {
        ratio: value / 100.0,
        direction: direction_of(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_at_least_with_symbol() {
        let t = parse_target(Some("≥ 95%")).unwrap();
        assert!(approx(t.ratio, 0.95));
        assert_eq!(t.direction, Direction::AtLeast);
    }

    #[test]
    fn test_at_least_without_symbol() {
        let t = parse_target(Some("Meta 80%")).unwrap();
        assert!(approx(t.ratio, 0.80));
        assert_eq!(t.direction, Direction::AtLeast);

        let t = parse_target(Some("> 90")).unwrap();
        assert_eq!(t.direction, Direction::AtLeast);
    }

    #[test]
    fn test_at_most_symbols() {
        let t = parse_target(Some("≤ 5%")).unwrap();
        assert!(approx(t.ratio, 0.05));
        assert_eq!(t.direction, Direction::AtMost);

        let t = parse_target(Some("menor a < 2.5 %")).unwrap();
        assert!(approx(t.ratio, 0.025));
        assert_eq!(t.direction, Direction::AtMost);
    }

    #[test]
    fn test_decimal_and_trailing_point() {
        assert!(approx(parse_target(Some("97.5%")).unwrap().ratio, 0.975));
        assert!(approx(parse_target(Some("100.")).unwrap().ratio, 1.0));
        assert!(approx(parse_target(Some("0%")).unwrap().ratio, 0.0));
    }

    #[test]
    fn test_range_uses_first_number() {
        let t = parse_target(Some("90-95%")).unwrap();
        assert!(approx(t.ratio, 0.90));
    }

    #[test]
    fn test_only_ascii_digits() {
        assert_eq!(parse_target(Some("≤ ٥%")), None);
        let t = parse_target(Some("٥ o 90%")).unwrap();
        assert!(approx(t.ratio, 0.90));
    }

    #[test]
    fn test_no_number_is_none() {
        assert_eq!(parse_target(Some("No aplica")), None);
        assert_eq!(parse_target(Some("")), None);
        assert_eq!(parse_target(Some("≤")), None);
        assert_eq!(parse_target(None), None);
    }

    #[test]
    fn test_direction_of_ignores_number() {
        assert_eq!(direction_of("< sin meta"), Direction::AtMost);
        assert_eq!(direction_of("≥"), Direction::AtLeast);
    }
}
