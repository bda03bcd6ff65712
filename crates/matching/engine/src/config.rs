//! Engine configuration

use lob::{MAX_LEVELS, MAX_ORDERS};

/// Engine configuration, fixed at construction.
///
/// Books are pre-allocated for instrument ids `1..=instrument_count`; the
/// capacities are per book and never resized afterwards.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of instruments served (ids `1..=instrument_count`)
    pub instrument_count: u32,
    /// Slot pool capacity per book
    pub max_orders: usize,
    /// Price levels per side per book
    pub max_levels: usize,
    /// Force the scalar price scanner regardless of hardware support
    pub disable_simd: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrument_count: 10,
            max_orders: MAX_ORDERS,
            max_levels: MAX_LEVELS,
            disable_simd: false,
        }
    }
}

impl EngineConfig {
    /// Environment variable forcing the scalar scanner when set to `true`/`1`
    pub const DISABLE_SIMD_ENV: &'static str = "CHRONOS_DISABLE_SIMD";

    /// Defaults with the SIMD override taken from the environment
    #[must_use]
    pub fn from_env() -> Self {
        let disable_simd = std::env::var(Self::DISABLE_SIMD_ENV)
            .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
            .unwrap_or(false);
        Self {
            disable_simd,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.instrument_count, 10);
        assert_eq!(config.max_orders, MAX_ORDERS);
        assert_eq!(config.max_levels, MAX_LEVELS);
        assert!(!config.disable_simd);
    }
}
