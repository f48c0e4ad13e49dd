//! Per-instrument scalars read from a config section (carry rates).

use std::collections::HashMap;

use crate::domain::config_validation::parse_number;
use crate::domain::error::RebalancerError;
use crate::ports::config_port::ConfigPort;
use crate::ports::signal_port::ScalarSource;

#[derive(Debug, Clone, Default)]
pub struct ConfigScalarSource {
    values: HashMap<String, f64>,
}

impl ConfigScalarSource {
    /// Every key of `section` is an instrument id; ids are matched upper-cased.
    pub fn from_config(config: &dyn ConfigPort, section: &str) -> Result<Self, RebalancerError> {
        let mut values = HashMap::new();
        for key in config.section_keys(section) {
            if let Some(value) = parse_number::<f64>(config, section, &key)? {
                values.insert(key.to_uppercase(), value);
            }
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ScalarSource for ConfigScalarSource {
    fn scalar(&self, instrument: &str) -> Option<f64> {
        self.values
            .get(&instrument.to_uppercase())
            .copied()
            .filter(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn reads_carry_section() {
        let config =
            FileConfigAdapter::from_string("[carry]\nAUDJPY = 0.041\nEURCHF = -0.007\n").unwrap();
        let source = ConfigScalarSource::from_config(&config, "carry").unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.scalar("AUDJPY"), Some(0.041));
        assert_eq!(source.scalar("eurchf"), Some(-0.007));
        assert_eq!(source.scalar("USDCAD"), None);
    }

    #[test]
    fn missing_section_is_empty() {
        let config = FileConfigAdapter::from_string("[signal]\nlookback = 1\n").unwrap();
        let source = ConfigScalarSource::from_config(&config, "carry").unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn non_numeric_value_is_config_error() {
        let config = FileConfigAdapter::from_string("[carry]\nAUDJPY = high\n").unwrap();
        let err = ConfigScalarSource::from_config(&config, "carry").unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { section, .. } if section == "carry"));
    }
}
