use crate::error::{Error, check_num};
use crate::model::TieRule;
use crate::network::Topology;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Configuration of a single simulation run.
///
/// Immutable once constructed; the sweep harness derives one per grid cell.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Number of agents.
    pub n: usize,
    /// Edge density parameter of the network generator.
    pub edge_density: f64,

    /// Probability of adopting the neighbourhood majority.
    pub influence: f64,
    /// Probability of flipping the current opinion.
    pub noise: f64,
    /// Expected fraction of agents that never change opinion.
    #[serde(default)]
    pub zealot_fraction: f64,

    /// Number of update steps.
    pub steps: usize,
    /// Network generator.
    pub topology: Topology,
    /// Seed of the run's random number generators.
    pub seed: u64,

    /// Rounding of an exact 0.5 neighbourhood average.
    #[serde(default)]
    pub tie_rule: TieRule,
}

impl SimConfig {
    /// Check every parameter before any random draw happens.
    pub fn validate(&self) -> Result<(), Error> {
        check_num("number of agents", self.n, 1..)?;
        check_num("edge density", self.edge_density, 0.0..=1.0)?;
        check_num("influence", self.influence, 0.0..=1.0)?;
        check_num("noise", self.noise, 0.0..=1.0)?;
        check_num("zealot fraction", self.zealot_fraction, 0.0..=1.0)?;
        Ok(())
    }
}

/// Parameter grid of a sweep.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Influence values, iterated outermost.
    pub influences: Vec<f64>,
    /// Noise values, iterated in the middle.
    pub noises: Vec<f64>,
    /// Repeats per parameter pair, iterated innermost.
    pub repeats: usize,
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.influences.is_empty() {
            return Err(Error::config("influences", "list must not be empty"));
        }
        if self.noises.is_empty() {
            return Err(Error::config("noises", "list must not be empty"));
        }
        for &influence in &self.influences {
            check_num("influence", influence, 0.0..=1.0)?;
        }
        for &noise in &self.noises {
            check_num("noise", noise, 0.0..=1.0)?;
        }
        check_num("number of repeats", self.repeats, 1..)?;
        Ok(())
    }

    /// Number of runs in the sweep.
    pub fn n_cells(&self) -> usize {
        self.influences.len() * self.noises.len() * self.repeats
    }
}

/// Contents of a simulation directory's `config.toml`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub sim: SimConfig,
    pub sweep: Option<SweepConfig>,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed,
    /// or if any configuration value is invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config
            .sim
            .validate()
            .context("invalid simulation parameters")?;
        if let Some(sweep) = &config.sweep {
            sweep.validate().context("invalid sweep parameters")?;
        }

        Ok(config)
    }
}

#[cfg(test)]
pub(crate) fn test_config(n: usize, topology: Topology) -> SimConfig {
    SimConfig {
        n,
        edge_density: 0.1,
        influence: 0.8,
        noise: 0.02,
        zealot_fraction: 0.0,
        steps: 20,
        topology,
        seed: 42,
        tie_rule: TieRule::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[sim]
n = 200
edge_density = 0.05
influence = 0.8
noise = 0.02
steps = 100
topology = "ws"
seed = 42

[sweep]
influences = [0.2, 0.4]
noises = [0.0, 0.1]
repeats = 3
"#;

    #[test]
    fn parses_config_with_defaults_and_aliases() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert_eq!(config.sim.topology, Topology::WattsStrogatz);
        assert_eq!(config.sim.zealot_fraction, 0.0);
        assert_eq!(config.sim.tie_rule, TieRule::HalfToEven);
        assert_eq!(config.sweep.unwrap().n_cells(), 12);
    }

    #[test]
    fn rejects_unknown_topology_tag() {
        let contents = CONFIG.replace("\"ws\"", "\"lattice\"");
        assert!(Config::from_toml(&contents).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let contents = CONFIG.replace("noise = 0.02", "noise = 1.5");
        assert!(Config::from_toml(&contents).is_err());

        let contents = CONFIG.replace("n = 200", "n = 0");
        assert!(Config::from_toml(&contents).is_err());

        let contents = CONFIG.replace("repeats = 3", "repeats = 0");
        assert!(Config::from_toml(&contents).is_err());

        let contents = CONFIG.replace("noises = [0.0, 0.1]", "noises = []");
        assert!(Config::from_toml(&contents).is_err());
    }

    #[test]
    fn validate_reports_config_error() {
        let mut cfg = test_config(10, Topology::Erdos);
        cfg.zealot_fraction = -0.5;
        assert!(matches!(cfg.validate(), Err(Error::Config { .. })));
    }
}
