//! A module for validating and managing configurations for cycle counting runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CycleError, CycleResult};

/// Default hysteresis threshold, in signal units.
pub const DEFAULT_DELTA: f64 = 0.1;
/// Default ultimate load: large enough that the Goodman correction is a no-op.
pub const DEFAULT_ULTIMATE_LOAD: f64 = 1e16;
/// Default weight of an unclosed residual interval.
pub const DEFAULT_PARTIAL_CYCLE_WEIGHT: f64 = 0.5;
/// Default output scale: ranges and means are written in signal units.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Cycle-closing rule used by the rainflow counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountingMethod {
    /// Three consecutive points A,B,C with |A-B| <= |B-C| close A-B as a full cycle.
    #[default]
    ThreePoint,
    /// As `ThreePoint`, except an interval starting at the bottom of the stack is
    /// counted as a half cycle and only its first point is dropped.
    Astm,
}

/// Knobs of the signal-reduction core.
///
/// Every field has a default, so a YAML section may name only what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingConfig {
    /// Hysteresis threshold of the turning-point extractor. Must be greater than 0.
    pub delta: f64,
    /// Fixed load mean used by the Goodman-adjusted range.
    pub fixed_load_mean: f64,
    /// Ultimate load of the Goodman correction. Must be greater than 0.
    pub ultimate_load: f64,
    /// Weight given to residual half cycles, between 0.0 and 1.0.
    pub partial_cycle_weight: f64,
    pub method: CountingMethod,
}

impl Default for CountingConfig {
    fn default() -> Self {
        CountingConfig {
            delta: DEFAULT_DELTA,
            fixed_load_mean: 0.0,
            ultimate_load: DEFAULT_ULTIMATE_LOAD,
            partial_cycle_weight: DEFAULT_PARTIAL_CYCLE_WEIGHT,
            method: CountingMethod::default(),
        }
    }
}

impl CountingConfig {
    /// Builds a config with the given threshold and defaults for everything else.
    pub fn with_delta(delta: f64) -> Self {
        CountingConfig {
            delta,
            ..Default::default()
        }
    }

    /// Validates everything, including the extractor threshold.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclecount::config::CountingConfig;
    ///
    /// assert!(CountingConfig::default().validate().is_ok());
    /// assert!(CountingConfig::with_delta(0.0).validate().is_err());
    /// ```
    pub fn validate(&self) -> CycleResult<()> {
        validate_delta(self.delta)?;
        self.validate_counting()
    }

    /// Validates only the knobs the rainflow counter reads.
    pub fn validate_counting(&self) -> CycleResult<()> {
        if !self.ultimate_load.is_finite() || self.ultimate_load <= 0.0 {
            return Err(CycleError::invalid(
                "ultimate_load",
                format!("must be a finite value greater than 0.0, got {}", self.ultimate_load),
            ));
        }
        if !self.fixed_load_mean.is_finite() {
            return Err(CycleError::invalid(
                "fixed_load_mean",
                format!("must be finite, got {}", self.fixed_load_mean),
            ));
        }
        if !(0.0..=1.0).contains(&self.partial_cycle_weight) {
            return Err(CycleError::invalid(
                "partial_cycle_weight",
                format!("must be between 0.0 and 1.0, got {}", self.partial_cycle_weight),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_delta(delta: f64) -> CycleResult<()> {
    if !delta.is_finite() || delta <= 0.0 {
        return Err(CycleError::invalid(
            "delta",
            format!("must be a finite value greater than 0.0, got {}", delta),
        ));
    }
    Ok(())
}

pub(crate) fn validate_scale(scale: f64) -> CycleResult<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CycleError::invalid(
            "scale",
            format!("must be a finite value greater than 0.0, got {}", scale),
        ));
    }
    Ok(())
}

/// Represents the configuration of a batch run of the command line tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub counting: CountingConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Validates the entire configuration.
    pub fn validate(&self) -> CycleResult<()> {
        self.counting.validate()?;
        self.input.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Where the signals come from and how their delimited files are laid out.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Signal files, each processed independently.
    pub files: Vec<String>,
    /// Number of header lines to skip.
    #[serde(default = "default_header")]
    pub header: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Zero-based column holding the timestamps.
    #[serde(default)]
    pub time_column: usize,
    /// Zero-based column holding the signal values.
    #[serde(default = "default_value_column")]
    pub value_column: usize,
}

fn default_header() -> usize {
    1
}

fn default_delimiter() -> String {
    ",".to_owned()
}

fn default_value_column() -> usize {
    1
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            files: Vec::new(),
            header: default_header(),
            delimiter: default_delimiter(),
            time_column: 0,
            value_column: default_value_column(),
        }
    }
}

impl InputConfig {
    /// Validates the `InputConfig`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclecount::config::InputConfig;
    ///
    /// let input = InputConfig { files: vec!["soc.csv".into()], ..Default::default() };
    /// assert!(input.validate().is_ok());
    ///
    /// let same_columns = InputConfig { value_column: 0, ..input };
    /// assert!(same_columns.validate().is_err());
    /// ```
    pub fn validate(&self) -> CycleResult<()> {
        if self.files.is_empty() {
            return Err(CycleError::invalid("files", "must not be empty"));
        }
        if self.files.iter().any(|f| f.trim().is_empty()) {
            return Err(CycleError::invalid("files", "must not contain empty paths"));
        }
        if self.delimiter.len() != 1 {
            return Err(CycleError::invalid(
                "delimiter",
                format!("must be a single byte, got {:?}", self.delimiter),
            ));
        }
        if self.time_column == self.value_column {
            return Err(CycleError::invalid(
                "value_column",
                format!("must differ from time_column, both are {}", self.value_column),
            ));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// Output layout of the command line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Table,
}

/// Order of the emitted cycle table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CycleOrder {
    /// Order in which the stack collapsed the cycles.
    Discovery,
    /// Ascending range.
    #[default]
    Range,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Linear factor applied to ranges, means and the mean level. Must be greater than 0;
    /// 0.01 turns percent into fractions.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub sort: CycleOrder,
    /// Output file; standard output when absent.
    #[serde(default)]
    pub path: Option<String>,
}

fn default_scale() -> f64 {
    DEFAULT_SCALE
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: OutputFormat::default(),
            scale: default_scale(),
            sort: CycleOrder::default(),
            path: None,
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> CycleResult<()> {
        validate_scale(self.scale)?;
        if let Some(path) = &self.path {
            if path.trim().is_empty() {
                return Err(CycleError::invalid("path", "must not be empty when given"));
            }
        }
        Ok(())
    }
}

/// Loads the configuration from a YAML file.
///
/// # Errors
///
/// This function will return an error if reading or parsing the configuration file fails.
/// The content is not validated; call [`Config::validate`] for that.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<Config> {
    let path = config_path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Parses a YAML configuration document.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_defaults() {
        let config = CountingConfig::default();
        assert_eq!(config.delta, 0.1);
        assert_eq!(config.fixed_load_mean, 0.0);
        assert_eq!(config.ultimate_load, 1e16);
        assert_eq!(config.partial_cycle_weight, 0.5);
        assert_eq!(config.method, CountingMethod::ThreePoint);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_counting_rejects_bad_values() {
        for delta in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(CountingConfig::with_delta(delta).validate().is_err(), "delta {}", delta);
        }
        let config = CountingConfig {
            ultimate_load: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CycleError::InvalidConfiguration { field: "ultimate_load", .. })
        ));
        let config = CountingConfig {
            ultimate_load: -3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = CountingConfig {
            partial_cycle_weight: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = CountingConfig {
            fixed_load_mean: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_counting_ignores_delta() {
        let config = CountingConfig::with_delta(-1.0);
        assert!(config.validate_counting().is_ok());
    }

    #[test]
    fn test_parse_config_defaults() {
        let yaml = "input:\n  files: [a.csv, b.csv]\n";
        let config = parse_config(yaml).expect("Failed to parse config");
        assert_eq!(config.counting, CountingConfig::default());
        assert_eq!(config.input.files.len(), 2);
        assert_eq!(config.input.header, 1);
        assert_eq!(config.input.delimiter_byte(), b',');
        assert_eq!(config.input.time_column, 0);
        assert_eq!(config.input.value_column, 1);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.sort, CycleOrder::Range);
        assert_eq!(config.output.scale, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_full() {
        let yaml = r#"
counting:
  delta: 0.5
  fixed_load_mean: 10.0
  ultimate_load: 100.0
  partial_cycle_weight: 1.0
  method: ASTM
input:
  files: [soc.txt]
  header: 0
  delimiter: ";"
  time_column: 2
  value_column: 0
output:
  format: TABLE
  scale: 0.01
  sort: DISCOVERY
  path: out.txt
"#;
        let config = parse_config(yaml).expect("Failed to parse config");
        assert_eq!(config.counting.method, CountingMethod::Astm);
        assert_eq!(config.counting.ultimate_load, 100.0);
        assert_eq!(config.input.delimiter_byte(), b';');
        assert_eq!(config.output.format, OutputFormat::Table);
        assert_eq!(config.output.sort, CycleOrder::Discovery);
        assert_eq!(config.output.path.as_deref(), Some("out.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = parse_config("input:\n  files: []\n").expect("Failed to parse config");
        assert!(config.validate().is_err());
        config.input.files.push("soc.csv".into());
        assert!(config.validate().is_ok());
        for scale in [0.0, -0.01, f64::NAN] {
            config.output.scale = scale;
            assert!(matches!(
                config.validate(),
                Err(CycleError::InvalidConfiguration { field: "scale", .. })
            ));
        }
        config.output.scale = DEFAULT_SCALE;
        config.input.delimiter = "::".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("tests/does-not-exist.yaml").unwrap_err();
        assert!(err.to_string().contains("does-not-exist.yaml"));
    }
}
