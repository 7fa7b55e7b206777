//! Sweep configuration.
//!
//! A [`SweepConfig`] names every grid axis explicitly. Every field has a
//! default, so a JSON file only needs the fields it changes:
//!
//! ```json
//! { "sizes": [4096, 16384], "compressors": ["gzip", "ppmd"], "seed": 7 }
//! ```

use std::path::Path;
use std::time::Duration;

use compstat_tests::{BatteryParams, ClassicalTest};
use serde::{Deserialize, Serialize};

use crate::codec::{CodecKind, DEFAULT_EXTERNAL_TIMEOUT};
use crate::driver::Probe;
use crate::error::{Error, Result};
use crate::generator::{LcgParams, MarkovParams, ParityConvention, Preamble};
use crate::hypothesis::{CompressionTest, DEFAULT_ALPHA, DEFAULT_ORDER, LogBase};

/// Every knob of one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Significance level shared by every compression test of the run.
    pub alpha: f64,
    pub sizes: Vec<usize>,
    pub probabilities: Vec<f64>,
    pub memories: Vec<usize>,
    pub compressors: Vec<String>,
    pub tests: Vec<String>,
    /// Explicit LCG runs, each crossed with every probe.
    pub lcg: Vec<LcgParams>,
    /// Context order of the entropy estimate for bit sequences.
    pub order: usize,
    /// Context order of the entropy estimate for LCG byte sequences.
    pub byte_order: usize,
    pub parity: ParityConvention,
    pub preamble: Preamble,
    pub log_base: LogBase,
    pub serial_window: usize,
    pub apen_window: usize,
    /// Run seed. `None` draws one from the OS and reports it.
    pub seed: Option<u64>,
    /// Worker threads; 1 runs sequentially.
    pub jobs: usize,
    /// Wall-clock budget per cell in seconds.
    pub timeout_secs: Option<f64>,
    /// Budget for each external compressor process in seconds.
    pub external_timeout_secs: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let battery = BatteryParams::default();
        Self {
            alpha: DEFAULT_ALPHA,
            sizes: vec![1 << 14],
            probabilities: vec![0.5, 0.8],
            memories: vec![5],
            compressors: ["gzip", "zlib", "bzip2"].map(String::from).to_vec(),
            tests: [
                ClassicalTest::Runs,
                ClassicalTest::Serial,
                ClassicalTest::ApproximateEntropy,
                ClassicalTest::Cusum,
                ClassicalTest::RandomExcursions,
            ]
            .map(|t| t.name().to_string())
            .to_vec(),
            lcg: Vec::new(),
            order: DEFAULT_ORDER,
            byte_order: 1,
            parity: ParityConvention::default(),
            preamble: Preamble::default(),
            log_base: LogBase::default(),
            serial_window: battery.serial_window,
            apen_window: battery.apen_window,
            seed: None,
            jobs: 1,
            timeout_secs: None,
            external_timeout_secs: DEFAULT_EXTERNAL_TIMEOUT.as_secs_f64(),
        }
    }
}

impl SweepConfig {
    /// Check every field before any work starts.
    pub fn validate(&self) -> Result<()> {
        self.compression_test()?;
        self.byte_compression_test()?;

        if self.sizes.is_empty() && self.lcg.is_empty() {
            return Err(Error::invalid("sizes", "no sizes and no LCG runs configured"));
        }
        for &size in &self.sizes {
            for &probability in &self.probabilities {
                for &memory in &self.memories {
                    MarkovParams::new(size, probability, memory)?;
                }
            }
            if self.order > size {
                return Err(Error::invalid(
                    "order",
                    format!("context order {} exceeds size {size}", self.order),
                ));
            }
        }
        for lcg in &self.lcg {
            lcg.validate()?;
            let extracted = lcg.bytes().len();
            if extracted == 0 {
                return Err(Error::invalid(
                    "lcg",
                    format!("{} keeps no words after byte extraction", lcg.label()),
                ));
            }
            if self.byte_order > extracted {
                return Err(Error::invalid(
                    "byte_order",
                    format!(
                        "context order {} exceeds the {extracted} bytes kept from {}",
                        self.byte_order,
                        lcg.label()
                    ),
                ));
            }
        }

        if self.probes()?.is_empty() {
            return Err(Error::invalid("compressors", "no compressors and no tests selected"));
        }
        if !(2..=16).contains(&self.serial_window) {
            return Err(Error::invalid(
                "serial_window",
                format!("must lie in 2..=16, got {}", self.serial_window),
            ));
        }
        if !(1..=15).contains(&self.apen_window) {
            return Err(Error::invalid(
                "apen_window",
                format!("must lie in 1..=15, got {}", self.apen_window),
            ));
        }
        if self.jobs == 0 {
            return Err(Error::invalid("jobs", "must be at least 1"));
        }
        if let Some(t) = self.timeout_secs {
            positive_secs("timeout_secs", t)?;
        }
        positive_secs("external_timeout_secs", self.external_timeout_secs)?;
        Ok(())
    }

    /// Resolve compressor and test names into probes, compressors first.
    pub fn probes(&self) -> Result<Vec<Probe>> {
        let mut probes = Vec::with_capacity(self.compressors.len() + self.tests.len());
        for name in &self.compressors {
            probes.push(Probe::Compressor(CodecKind::from_name(name)?));
        }
        for name in &self.tests {
            let test = ClassicalTest::from_name(name).ok_or_else(|| Error::UnsupportedTest {
                requested: name.clone(),
                supported: ClassicalTest::supported_names(),
            })?;
            probes.push(Probe::Classical(test));
        }
        Ok(probes)
    }

    pub fn compression_test(&self) -> Result<CompressionTest> {
        CompressionTest::new(self.alpha, self.order, self.log_base)
    }

    pub fn byte_compression_test(&self) -> Result<CompressionTest> {
        CompressionTest::new(self.alpha, self.byte_order, self.log_base)
    }

    pub fn battery_params(&self) -> BatteryParams {
        BatteryParams {
            serial_window: self.serial_window,
            apen_window: self.apen_window,
        }
    }

    pub fn cell_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }

    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.external_timeout_secs)
    }
}

fn positive_secs(name: &'static str, secs: f64) -> Result<()> {
    if secs.is_finite() && secs > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(name, format!("must be a positive number of seconds, got {secs}")))
    }
}

/// Load a JSON sweep configuration and validate it.
pub fn load_config_from_path(path: &Path) -> Result<SweepConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let config = serde_json::from_str::<SweepConfig>(&raw)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SweepConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sizes, vec![16384]);
        assert_eq!(config.order, 6);
        assert_eq!(config.probes().unwrap().len(), 8);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, r#"{ "sizes": [4096], "seed": 7, "parity": "bias_on_odd" }"#).unwrap();
        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.sizes, vec![4096]);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.parity, ParityConvention::BiasOnOdd);
        assert_eq!(config.compressors, SweepConfig::default().compressors);
    }

    #[test]
    fn lcg_runs_deserialize() {
        let json = r#"{ "lcg": [{ "modulus": 2147483648, "multiplier": 65539,
                                  "increment": 0, "seed": 1, "count": 1000 }] }"#;
        let config: SweepConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.lcg[0].multiplier, 65539);
    }

    #[test]
    fn unknown_compressor_fails_fast() {
        let config = SweepConfig {
            compressors: vec!["gzip".into(), "lz4".into()],
            ..SweepConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::UnsupportedCompressor { .. })
        ));
    }

    #[test]
    fn unknown_test_fails_fast() {
        let config = SweepConfig {
            tests: vec!["spectral".into()],
            ..SweepConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::UnsupportedTest { .. })));
    }

    #[test]
    fn out_of_range_values_fail_fast() {
        let bad = [
            SweepConfig { alpha: 1.0, ..SweepConfig::default() },
            SweepConfig { probabilities: vec![0.0], ..SweepConfig::default() },
            SweepConfig { sizes: vec![0], ..SweepConfig::default() },
            SweepConfig { memories: vec![1 << 20], ..SweepConfig::default() },
            SweepConfig { jobs: 0, ..SweepConfig::default() },
            SweepConfig { timeout_secs: Some(-1.0), ..SweepConfig::default() },
            SweepConfig { serial_window: 1, ..SweepConfig::default() },
            SweepConfig { order: 1 << 20, ..SweepConfig::default() },
            SweepConfig {
                compressors: Vec::new(),
                tests: Vec::new(),
                ..SweepConfig::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(Error::InvalidParameter { .. })),
                "{config:?} passed validation"
            );
        }
    }

    #[test]
    fn lcg_without_extracted_bytes_fails_fast() {
        // Every word equals 290, above 256 * floor(300 / 256) = 256.
        let config = SweepConfig {
            lcg: vec![LcgParams::new(300, 1, 0, 290, 1000).unwrap()],
            ..SweepConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { name: "lcg", .. })
        ));
    }

    #[test]
    fn byte_order_longer_than_lcg_run_fails_fast() {
        let config = SweepConfig {
            lcg: vec![LcgParams::new(1 << 31, 65539, 0, 1, 3).unwrap()],
            byte_order: 5,
            ..SweepConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { name: "byte_order", .. })
        ));
        let config = SweepConfig {
            byte_order: 3,
            ..config
        };
        config.validate().unwrap();
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ sizes: ").unwrap();
        assert!(matches!(load_config_from_path(&path), Err(Error::Config(_))));
        assert!(matches!(
            load_config_from_path(&dir.path().join("absent.json")),
            Err(Error::Config(_))
        ));
    }
}
