// Concurrency window (double watermark)

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Watermarks controlling when submission pauses and resumes
///
/// Submission suspends once `upper_bound` jobs are pending and resumes when
/// the pending count falls to `lower_bound` or below. `lower_bound` should be
/// at least the number of parallel workers and `upper_bound` roughly 3x that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    lower_bound: usize,
    upper_bound: usize,
}

impl WindowConfig {
    /// Validate and build a window
    ///
    /// # Errors
    /// - `DomainError::InvalidInput` if `upper_bound == 0` or `lower_bound >= upper_bound`
    pub fn new(lower_bound: usize, upper_bound: usize) -> Result<Self> {
        if upper_bound == 0 {
            return Err(DomainError::InvalidInput(
                "upper_bound must be at least 1".to_string(),
            ));
        }
        if lower_bound >= upper_bound {
            return Err(DomainError::InvalidInput(format!(
                "lower_bound ({}) must be below upper_bound ({})",
                lower_bound, upper_bound
            )));
        }
        Ok(Self {
            lower_bound,
            upper_bound,
        })
    }

    /// Window sized for `parallelism` workers: lower = parallelism, upper = 3 * lower
    pub fn for_parallelism(parallelism: usize) -> Self {
        let lower_bound = parallelism.max(1);
        Self {
            lower_bound,
            upper_bound: lower_bound * 3,
        }
    }

    pub fn lower_bound(&self) -> usize {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> usize {
        self.upper_bound
    }

    /// Submitter must suspend at this pending count
    pub fn is_full(&self, pending: usize) -> bool {
        pending >= self.upper_bound
    }

    /// Suspended submitter may resume at this pending count
    pub fn has_room(&self, pending: usize) -> bool {
        pending <= self.lower_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_window() {
        let window = WindowConfig::new(32, 96).unwrap();
        assert_eq!(window.lower_bound(), 32);
        assert_eq!(window.upper_bound(), 96);
        assert!(window.is_full(96));
        assert!(!window.is_full(95));
        assert!(window.has_room(32));
        assert!(!window.has_room(33));
    }

    #[test]
    fn test_zero_lower_bound_is_allowed() {
        let window = WindowConfig::new(0, 1).unwrap();
        assert!(window.is_full(1));
        assert!(window.has_room(0));
    }

    #[test]
    fn test_rejects_inverted_or_empty_window() {
        assert!(matches!(
            WindowConfig::new(0, 0),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            WindowConfig::new(10, 10),
            Err(DomainError::InvalidInput(_))
        ));
        let err = WindowConfig::new(20, 10).unwrap_err();
        assert!(err.to_string().contains("must be below"));
    }

    #[test]
    fn test_for_parallelism() {
        let window = WindowConfig::for_parallelism(8);
        assert_eq!(window.lower_bound(), 8);
        assert_eq!(window.upper_bound(), 24);

        // never degenerate, even when the probe reports nothing
        let window = WindowConfig::for_parallelism(0);
        assert_eq!(window.lower_bound(), 1);
        assert_eq!(window.upper_bound(), 3);
    }
}
