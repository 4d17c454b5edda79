use crate::target::{Direction, ParsedTarget};
use serde::Serialize;

/// Outcome of comparing an observed ratio against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compliance {
    Compliant,
    NonCompliant,
    /// Missing ratio or unparseable target. Never shown as pass or fail.
    Undetermined,
}

impl Compliance {
    pub fn label(self) -> &'static str {
        match self {
            Compliance::Compliant => "Cumple Meta",
            Compliance::NonCompliant => "No Cumple Meta",
            Compliance::Undetermined => "Meta no determinada",
        }
    }
}

/// Boundary values always comply: `ratio == target` passes in both directions.
pub fn evaluate(ratio: Option<f64>, target: Option<&ParsedTarget>) -> Compliance {
    let (Some(ratio), Some(target)) = (ratio, target) else {
        return Compliance::Undetermined;
    };
    if ratio.is_nan() || target.ratio.is_nan() {
        return Compliance::Undetermined;
    }
    let ok = match target.direction {
        Direction::AtMost => ratio <= target.ratio,
        Direction::AtLeast => ratio >= target.ratio,
    };
    if ok {
        Compliance::Compliant
    } else {
        Compliance::NonCompliant
    }
}
