use serde::{Deserialize, Serialize};
use std::fmt;

/// A cluster metric that may be missing from the source data.
///
/// Deserializes from a number, `null`, or an absent field (with
/// `#[serde(default)]`). An unknown metric is never treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Metric {
    Known(f64),
    #[default]
    Unknown,
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Metric::Known(v),
            None => Metric::Unknown,
        }
    }
}

impl From<Metric> for Option<f64> {
    fn from(metric: Metric) -> Self {
        metric.value()
    }
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Known(v) => Some(*v),
            Metric::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Metric::Known(_))
    }

    /// Check the value against [0, 1], clamping or rejecting per `policy`.
    /// NaN and infinities are rejected regardless of policy.
    pub fn checked(self, field: &'static str, policy: RangePolicy) -> Result<Metric, ValidationError> {
        let v = match self {
            Metric::Unknown => return Ok(Metric::Unknown),
            Metric::Known(v) => v,
        };

        if !v.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }

        if (0.0..=1.0).contains(&v) {
            return Ok(Metric::Known(v));
        }

        match policy {
            RangePolicy::Clamp => Ok(Metric::Known(v.clamp(0.0, 1.0))),
            RangePolicy::Reject => Err(ValidationError::OutOfRange { field, value: v }),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Known(v) => write!(f, "{:.2}", v),
            Metric::Unknown => write!(f, "n/a"),
        }
    }
}

/// What to do with a known metric outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    #[default]
    Clamp,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    OutOfRange { field: &'static str, value: f64 },
    NotFinite { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange { field, value } => {
                write!(f, "{} out of range: {} (expected 0.0-1.0)", field, value)
            }
            ValidationError::NotFinite { field } => write!(f, "{} is not a finite number", field),
        }
    }
}

impl std::error::Error for ValidationError {}
