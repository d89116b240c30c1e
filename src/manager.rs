use crate::config::Config;
use crate::engine::{self, History, WalkRules};
use crate::model::Model;
use crate::plot;
use crate::stats::{Accumulator, Histogram};
use anyhow::{Context, Result};
use glob::glob;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use std::{
    fs,
    path::{Path, PathBuf},
};

const OUTPUT_FILES: [&str; 2] = ["histogram.png", "path-map.png"];

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Run all trials, then trace one extra walk, and render both outputs.
    pub fn run_simulation(&self) -> Result<()> {
        let (model, mut rng) = self.start_session().context("failed to start session")?;
        let rules = WalkRules::from(&self.cfg.run);

        let mut history = History::new();
        engine::run_many(
            &model,
            self.cfg.run.n_simulations,
            rules,
            &mut history,
            &mut rng,
        )
        .context("failed to run trials")?;

        self.report(&history);

        let step_counts = history.step_counts();
        if step_counts.is_empty() {
            log::warn!("no walk reached its target, skipping histogram");
        } else {
            let hist = Histogram::new(&step_counts, self.cfg.output.hist_bins)
                .context("failed to build histogram")?;
            let (lo, hi) = hist.range();
            log::info!(
                "histogram of {} bins over [{lo}, {hi}] ({} exhausted walks excluded)",
                hist.n_bins(),
                history.n_exhausted()
            );
            for (i_bin, &count) in hist.counts().iter().enumerate() {
                let (bin_lo, bin_hi) = hist.bin_edges(i_bin);
                log::debug!("bin {i_bin:02} [{bin_lo:.2}, {bin_hi:.2}): {count}");
            }
            plot::save_image(&plot::histogram_image(&hist), self.histogram_file())
                .context("failed to save histogram")?;
        }

        self.trace(&model, rules, &mut rng)
    }

    /// Trace a single walk and render it as a path map.
    pub fn trace_walk(&self) -> Result<()> {
        let (model, mut rng) = self.start_session().context("failed to start session")?;
        let rules = WalkRules::from(&self.cfg.run);
        self.trace(&model, rules, &mut rng)
    }

    /// Remove every rendered image (`*.png`) from the simulation directory.
    pub fn clean_sim(&self) -> Result<()> {
        let pattern = self.sim_dir.join("*.png");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        for file in glob(pattern)
            .context("failed to glob output files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
        {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }
        Ok(())
    }

    fn start_session(&self) -> Result<(Model, ChaCha12Rng)> {
        let mut rng = match self.cfg.model.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let model = Model::generate(self.cfg.model.grid_size, &mut rng)
            .context("failed to generate model")?;
        log::info!("generated {0}x{0} transition table", model.grid_size());

        Ok((model, rng))
    }

    fn trace(&self, model: &Model, rules: WalkRules, rng: &mut ChaCha12Rng) -> Result<()> {
        let (start, target) = engine::place_random_positions(model.grid_size(), rng)
            .context("failed to place walker and sensor")?;
        log::debug!("start cell probabilities: {:?}", model.table().probs(start));

        let trace = engine::trace_walk(model.table(), start, target, rules, rng)
            .context("failed to trace walk")?;
        log::info!(
            "traced walk {start:?} -> {target:?}: {:?}, {} positions",
            trace.outcome,
            trace.path.len()
        );

        let img = plot::path_map_image(model.grid_size(), &trace.path, self.cfg.output.cell_px)
            .context("failed to draw path map")?;
        plot::save_image(&img, self.path_map_file()).context("failed to save path map")
    }

    fn report(&self, history: &History) {
        let mut acc = Accumulator::new();
        for steps in history.step_counts() {
            acc.add(steps as f64);
        }
        let report = acc.report();
        log::info!(
            "trials: {}, reached: {}, exhausted: {}",
            history.len(),
            report.n_vals,
            history.n_exhausted()
        );
        if !history.is_empty() {
            log::info!("{report:#?}");
        }
    }

    fn histogram_file(&self) -> PathBuf {
        self.sim_dir.join(OUTPUT_FILES[0])
    }

    fn path_map_file(&self) -> PathBuf {
        self.sim_dir.join(OUTPUT_FILES[1])
    }
}
