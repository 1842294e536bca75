use super::config::{Band, ThresholdConfig};

/// Validate threshold configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_thresholds(config: &ThresholdConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let bands = [
        ("structure_consistency", config.structure_consistency),
        ("experimental_support", config.experimental_support),
        ("taxonomic_diversity", config.taxonomic_diversity),
        ("tgroup_homogeneity", config.tgroup_homogeneity),
    ];

    for (name, band) in bands {
        if let Some(band) = band {
            validate_band(name, &band, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_band(name: &str, band: &Band, errors: &mut Vec<String>) {
    let mut in_range = true;
    for (bound, value) in [("high", band.high), ("low", band.low)] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            errors.push(format!(
                "thresholds.{}.{}: must be between 0.0 and 1.0, got {}",
                name, bound, value
            ));
            in_range = false;
        }
    }

    if in_range && band.low > band.high {
        errors.push(format!(
            "thresholds.{}: low ({}) must not exceed high ({})",
            name, band.low, band.high
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(validate_thresholds(&ThresholdConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_config_valid() {
        let config = ThresholdConfig {
            structure_consistency: None,
            experimental_support: None,
            taxonomic_diversity: None,
            tgroup_homogeneity: None,
            out_of_range: None,
        };
        assert!(validate_thresholds(&config).is_ok());
    }

    #[test]
    fn test_equal_bounds_valid() {
        let config = ThresholdConfig {
            structure_consistency: Some(Band::new(0.7, 0.7)),
            ..ThresholdConfig::default()
        };
        assert!(validate_thresholds(&config).is_ok());
    }

    #[test]
    fn test_out_of_range_bound() {
        let config = ThresholdConfig {
            experimental_support: Some(Band::new(1.5, 0.4)),
            ..ThresholdConfig::default()
        };
        let errors = validate_thresholds(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("thresholds.experimental_support.high"));
    }

    #[test]
    fn test_inverted_band() {
        let config = ThresholdConfig {
            tgroup_homogeneity: Some(Band::new(0.5, 0.8)),
            ..ThresholdConfig::default()
        };
        let errors = validate_thresholds(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("thresholds.tgroup_homogeneity"));
        assert!(errors[0].contains("must not exceed"));
    }

    #[test]
    fn test_collects_all_errors() {
        let config = ThresholdConfig {
            structure_consistency: Some(Band::new(0.5, 0.9)), // Error 1
            taxonomic_diversity: Some(Band::new(f64::NAN, -0.1)), // Errors 2 and 3
            ..ThresholdConfig::default()
        };
        let errors = validate_thresholds(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
