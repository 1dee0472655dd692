//! Input rows for binning: feature value, binary label, time cohort

use serde::Serialize;
use std::fmt;

/// Identifier of a time cohort (e.g. a calendar month encoded as 202301).
/// Temporal order is the numeric order of the identifiers.
pub type CohortId = i64;

/// A single feature value, numeric or categorical
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Numeric(v) => write!(f, "{}", v),
            FeatureValue::Categorical(c) => write!(f, "'{}'", c),
        }
    }
}

/// One immutable input row: feature value, 0/1 label, and time cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub value: FeatureValue,
    /// Binary outcome label: 1 = event (e.g. default), 0 = non-event
    pub label: u8,
    pub cohort: CohortId,
}

impl Observation {
    pub fn numeric(value: f64, label: u8, cohort: CohortId) -> Self {
        Self {
            value: FeatureValue::Numeric(value),
            label,
            cohort,
        }
    }

    pub fn categorical(value: impl Into<String>, label: u8, cohort: CohortId) -> Self {
        Self {
            value: FeatureValue::Categorical(value.into()),
            label,
            cohort,
        }
    }

    /// Whether this row is an event (label = 1)
    #[inline]
    pub fn is_event(&self) -> bool {
        self.label != 0
    }
}
