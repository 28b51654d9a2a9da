// Dispatch configuration entry point

use crate::domain::error::{DomainError, Result};
use crate::domain::{PrimalityOracle, WindowConfig};
use crate::port::SystemProbe;
use serde::{Deserialize, Serialize};

/// Validated settings for one dispatch session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub window: WindowConfig,
    pub trials: u32,
}

impl DispatchConfig {
    /// Watermarks derived from the machine: `lower = parallelism`, `upper = 3 * lower`
    pub fn from_probe(probe: &dyn SystemProbe, trials: u32) -> Result<Self> {
        let window = WindowConfig::for_parallelism(probe.parallelism());
        configure(window.lower_bound(), window.upper_bound(), trials)
    }

    /// Primality oracle running `trials` rounds
    pub fn oracle(&self) -> PrimalityOracle {
        // trials was validated by configure()
        PrimalityOracle::new(self.trials).unwrap_or_default()
    }
}

/// Validate watermarks and trial count
///
/// # Errors
/// - DomainError::InvalidInput if `upper_bound == 0`, `lower_bound >= upper_bound`
///   or `trial_count == 0`
pub fn configure(lower_bound: usize, upper_bound: usize, trial_count: u32) -> Result<DispatchConfig> {
    let window = WindowConfig::new(lower_bound, upper_bound)?;
    if trial_count == 0 {
        return Err(DomainError::InvalidInput(
            "trial count must be at least 1".to_string(),
        ));
    }
    Ok(DispatchConfig {
        window,
        trials: trial_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::system_probe::mocks::MockSystemProbe;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_configure_accepts_valid_window() {
        let config = assert_ok!(configure(4, 12, 3));
        assert_eq!(config.window.lower_bound(), 4);
        assert_eq!(config.window.upper_bound(), 12);
        assert_eq!(config.oracle().trials(), 3);
    }

    #[test]
    fn test_configure_rejects_invalid_input() {
        assert!(matches!(configure(5, 5, 3), Err(DomainError::InvalidInput(_))));
        assert!(matches!(configure(6, 2, 3), Err(DomainError::InvalidInput(_))));
        assert!(matches!(configure(0, 0, 3), Err(DomainError::InvalidInput(_))));

        let err = assert_err!(configure(1, 3, 0));
        assert!(err.to_string().contains("trial count"));
    }

    #[test]
    fn test_from_probe_uses_parallelism() {
        let config = DispatchConfig::from_probe(&MockSystemProbe::new(8), 5).unwrap();
        assert_eq!(config.window.lower_bound(), 8);
        assert_eq!(config.window.upper_bound(), 24);
        assert_eq!(config.trials, 5);
    }
}
