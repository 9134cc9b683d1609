//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::demand::EnergyFactors;
use crate::profile::HOURS;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the reference scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::reference`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Demand distribution parameters.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Optimal-scheduler weights and solver budget.
    #[serde(default)]
    pub optimal: OptimalConfig,
    /// Strategy selection.
    #[serde(default)]
    pub run: RunConfig,
    /// Robustness-sweep parameters.
    #[serde(default)]
    pub robustness: RobustnessConfig,
}

/// Demand distribution parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Energy units per high-priority task.
    pub high_energy: f64,
    /// Energy units per mid-priority task.
    pub mid_energy: f64,
    /// Energy units per low-priority task.
    pub low_energy: f64,
    /// Length of the rotating window for mid/low subtasks (1..=24).
    pub window_hours: usize,
    /// Abort the run on the first malformed task row instead of skipping it.
    pub strict_format: bool,
}

impl Default for DemandConfig {
    fn default() -> Self {
        let f = EnergyFactors::default();
        Self {
            high_energy: f.high,
            mid_energy: f.mid,
            low_energy: f.low,
            window_hours: HOURS,
            strict_format: false,
        }
    }
}

impl DemandConfig {
    pub fn factors(&self) -> EnergyFactors {
        EnergyFactors {
            high: self.high_energy,
            mid: self.mid_energy,
            low: self.low_energy,
        }
    }
}

/// Optimal-scheduler incentive weights and solver budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimalConfig {
    /// Reward per unit of green energy used.
    pub beta: f64,
    /// Reward per unit of green supply in the chosen hour.
    pub gamma: f64,
    /// Wall-clock solver limit (seconds, > 0).
    ///
    /// HiGHS returns its best solution when the limit is hit. The opt-in
    /// `microlp` backend has no incumbent and fails instead, so it is only
    /// suitable for small models (narrowed `demand.window_hours`).
    pub time_limit_secs: f64,
    /// Relative optimality gap (0.0 to < 1.0).
    pub gap_rel: f64,
}

impl Default for OptimalConfig {
    fn default() -> Self {
        Self {
            beta: 0.15,
            gamma: 0.05,
            time_limit_secs: 60.0,
            gap_rel: 0.01,
        }
    }
}

/// Strategy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// One of [`RunConfig::STRATEGIES`].
    pub strategy: String,
}

impl RunConfig {
    /// Accepted strategy names.
    pub const STRATEGIES: &[&str] = &["greedy", "optimal", "in_place", "compare"];
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            strategy: "greedy".to_string(),
        }
    }
}

/// Robustness-sweep parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobustnessConfig {
    /// Number of perturbed variants to generate.
    pub variants: usize,
    /// Random seed for the perturbations.
    pub seed: u64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            variants: 10,
            seed: 42,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"optimal.gap_rel"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the reference scenario (default factors, weights and budget).
    pub fn reference() -> Self {
        Self::default()
    }

    /// Returns the green-bias preset: stronger incentives toward green supply.
    pub fn green_bias() -> Self {
        Self {
            optimal: OptimalConfig {
                beta: 0.3,
                gamma: 0.1,
                ..OptimalConfig::default()
            },
            run: RunConfig {
                strategy: "compare".to_string(),
            },
            ..Self::default()
        }
    }

    /// Returns the strict preset: malformed task rows abort the run.
    pub fn strict() -> Self {
        Self {
            demand: DemandConfig {
                strict_format: true,
                ..DemandConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["reference", "green_bias", "strict"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "reference" => Ok(Self::reference()),
            "green_bias" => Ok(Self::green_bias()),
            "strict" => Ok(Self::strict()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let d = &self.demand;
        for (field, value) in [
            ("demand.high_energy", d.high_energy),
            ("demand.mid_energy", d.mid_energy),
            ("demand.low_energy", d.low_energy),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(field, "must be a finite value >= 0"));
            }
        }
        if !(1..=HOURS).contains(&d.window_hours) {
            errors.push(ConfigError::new("demand.window_hours", "must be in 1..=24"));
        }

        let o = &self.optimal;
        if !o.beta.is_finite() || o.beta < 0.0 {
            errors.push(ConfigError::new("optimal.beta", "must be >= 0"));
        }
        if !o.gamma.is_finite() || o.gamma < 0.0 {
            errors.push(ConfigError::new("optimal.gamma", "must be >= 0"));
        }
        if !o.time_limit_secs.is_finite() || o.time_limit_secs <= 0.0 {
            errors.push(ConfigError::new("optimal.time_limit_secs", "must be > 0"));
        }
        if !(0.0..1.0).contains(&o.gap_rel) {
            errors.push(ConfigError::new("optimal.gap_rel", "must be in [0.0, 1.0)"));
        }

        if !RunConfig::STRATEGIES.contains(&self.run.strategy.as_str()) {
            errors.push(ConfigError::new(
                "run.strategy",
                format!(
                    "must be one of {}, got \"{}\"",
                    RunConfig::STRATEGIES.join(", "),
                    self.run.strategy
                ),
            ));
        }

        if self.robustness.variants == 0 {
            errors.push(ConfigError::new("robustness.variants", "must be > 0"));
        }

        errors
    }
}
