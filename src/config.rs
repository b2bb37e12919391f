use chrono::Duration;

use crate::{error::ReplayError, strategy::DualThrustConfig};

/// The configuration surface consumed by the time-series builder and the
/// Dual Thrust evaluator, independent of how a hosting application supplies
/// it. The CLI entry point (`src/bin/replay.rs`) is one such supplier.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Bar duration; must be a positive multiple of one minute.
    pub frequency: Duration,
    pub strategy: DualThrustConfig,
}

impl RunConfig {
    pub fn new(frequency: Duration, strategy: DualThrustConfig) -> Result<Self, ReplayError> {
        if frequency <= Duration::zero() || frequency.num_seconds() % 60 != 0 {
            return Err(ReplayError::InvalidConfig(
                "frequency must be a positive multiple of one minute".to_string(),
            ));
        }
        Ok(Self { frequency, strategy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn strategy() -> DualThrustConfig {
        DualThrustConfig::new(
            5,
            dec!(0.5),
            dec!(0.5),
            Duration::minutes(60),
            Duration::minutes(15),
        )
        .unwrap()
    }

    #[test]
    fn rejects_zero_frequency() {
        let result = RunConfig::new(Duration::zero(), strategy());
        assert!(matches!(result, Err(ReplayError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_minute_multiple() {
        let result = RunConfig::new(Duration::seconds(90), strategy());
        assert!(matches!(result, Err(ReplayError::InvalidConfig(_))));
    }

    #[test]
    fn accepts_positive_minute_multiple() {
        let result = RunConfig::new(Duration::minutes(5), strategy());
        assert!(result.is_ok());
    }
}
