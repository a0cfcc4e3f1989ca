use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean per-sample log-likelihood of a table under a mixture.
///
/// Higher is better. EM never decreases it between iterations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLikelihood(f64);

impl LogLikelihood {
    /// Create a new log-likelihood value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for LogLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::LogLikelihood;

    #[test]
    fn display_format() {
        assert_eq!(format!("{}", LogLikelihood::new(-1.5)), "-1.500000");
    }

    #[test]
    fn total_cmp_ordering() {
        let a = LogLikelihood::new(-2.0);
        let b = LogLikelihood::new(-1.0);
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(b.total_cmp(&b), Ordering::Equal);
    }
}
