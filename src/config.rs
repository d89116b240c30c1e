use crate::plot::MAX_MAP_SIDE_PX;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub model: ModelConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Side length of the square grid.
    pub grid_size: usize,
    /// Random number generator seed (OS entropy when absent).
    pub seed: Option<u64>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Number of trials accumulated for the histogram.
    pub n_simulations: usize,
    /// Maximum number of ticks per walk (unbounded when absent).
    pub max_steps: Option<usize>,
    #[serde(default)]
    pub counting: StepCounting,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Number of histogram bins.
    pub hist_bins: usize,
    /// Size in pixels of one grid cell in the path map.
    pub cell_px: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            hist_bins: 20,
            cell_px: 48,
        }
    }
}

/// Which ticks of a walk contribute to its step count.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepCounting {
    /// Every tick counts, including bounces off the boundary.
    #[default]
    AllTicks,
    /// Only ticks that displaced the walker count.
    DisplacementOnly,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::parse(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.model.grid_size, 2..=1_000).context("invalid grid size")?;

        check_num(self.run.n_simulations, 1..=1_000_000)
            .context("invalid number of simulations")?;
        if let Some(max_steps) = self.run.max_steps {
            check_num(max_steps, 1..).context("invalid maximum number of steps")?;
        }

        check_num(self.output.hist_bins, 1..=1_000).context("invalid number of histogram bins")?;
        check_num(self.output.cell_px, 8..=256).context("invalid cell size")?;
        let map_side = self.model.grid_size as u64 * self.output.cell_px as u64;
        check_num(map_side, ..=MAX_MAP_SIDE_PX as u64)
            .context("path map side (grid size times cell size) is too large")?;

        Ok(())
    }
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// Check that `vec` is a probability vector of length `exp_len`.
pub fn check_prob_vec(vec: &[f64], exp_len: usize) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if vec.iter().any(|&ele| ele.is_nan() || ele < 0.0) {
        bail!("vector must have only non-negative elements");
    }
    let sum: f64 = vec.iter().sum();
    let tol = 1e-9;
    if (sum - 1.0).abs() > tol {
        bail!("vector must sum to 1.0 (tolerance: {tol}), but sums to {sum}");
    }
    Ok(())
}
