use crate::config::{RunConfig, StepCounting, check_num};
use crate::model::{Model, Position, TransitionTable};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_distr::Uniform;

/// Limits and counting mode applied to every walk.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct WalkRules {
    /// Maximum number of ticks before a walk is abandoned.
    pub max_steps: Option<usize>,
    pub counting: StepCounting,
}

impl From<&RunConfig> for WalkRules {
    fn from(run: &RunConfig) -> Self {
        Self {
            max_steps: run.max_steps,
            counting: run.counting,
        }
    }
}

/// Result of a single walk.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WalkOutcome {
    /// The walker reached the target after the given number of steps.
    Reached(usize),
    /// The step budget ran out; holds the steps counted so far.
    Exhausted(usize),
}

impl WalkOutcome {
    pub fn steps(self) -> usize {
        match self {
            WalkOutcome::Reached(steps) | WalkOutcome::Exhausted(steps) => steps,
        }
    }

    pub fn is_reached(self) -> bool {
        matches!(self, WalkOutcome::Reached(_))
    }
}

/// A walk together with every position the walker occupied, one per tick.
#[derive(Debug, Clone)]
pub struct Trace {
    pub outcome: WalkOutcome,
    pub path: Vec<Position>,
}

/// Outcomes of all trials of a session, in trial order.
#[derive(Debug, Default, Clone)]
pub struct History {
    outcomes: Vec<WalkOutcome>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: WalkOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Step counts of the walks that reached their target, in trial order.
    ///
    /// Exhausted walks are left out; see [`History::n_exhausted`] for how many.
    /// Without a step budget every walk reaches its target and nothing is dropped.
    pub fn step_counts(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_reached())
            .map(|outcome| outcome.steps())
            .collect()
    }

    pub fn n_exhausted(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_reached()).count()
    }
}

/// Advance the walker by one tick.
///
/// A move that would leave the grid is discarded and the walker stays put.
pub fn step<R: Rng + ?Sized>(table: &TransitionTable, pos: Position, rng: &mut R) -> Position {
    let dir = table.sample_direction(pos, rng);
    pos.neighbor(dir, table.grid_size()).unwrap_or(pos)
}

/// Walk from `start` until `target` is reached or the step budget runs out.
///
/// Without a budget the walk only ends on the target, so a table that makes the
/// target unreachable blocks forever.
pub fn run_walk<R: Rng + ?Sized>(
    table: &TransitionTable,
    start: Position,
    target: Position,
    rules: WalkRules,
    rng: &mut R,
) -> Result<WalkOutcome> {
    walk(table, start, target, rules, rng, |_| {})
}

/// Like [`run_walk`], but also records the path followed by the walker.
///
/// The path holds the start, then one position per tick (bounces included),
/// so under [`StepCounting::AllTicks`] its length is the step count plus one.
pub fn trace_walk<R: Rng + ?Sized>(
    table: &TransitionTable,
    start: Position,
    target: Position,
    rules: WalkRules,
    rng: &mut R,
) -> Result<Trace> {
    let mut path = Vec::new();
    let outcome = walk(table, start, target, rules, rng, |pos| path.push(pos))?;
    Ok(Trace { outcome, path })
}

fn walk<R, F>(
    table: &TransitionTable,
    start: Position,
    target: Position,
    rules: WalkRules,
    rng: &mut R,
    mut visit: F,
) -> Result<WalkOutcome>
where
    R: Rng + ?Sized,
    F: FnMut(Position),
{
    if !table.contains(start) {
        bail!("start {start:?} is outside the grid");
    }
    if !table.contains(target) {
        bail!("target {target:?} is outside the grid");
    }

    let mut pos = start;
    let mut n_steps = 0;
    let mut n_ticks = 0;
    visit(pos);

    while pos != target {
        if rules.max_steps.is_some_and(|max_steps| n_ticks >= max_steps) {
            return Ok(WalkOutcome::Exhausted(n_steps));
        }

        let next = step(table, pos, rng);
        n_ticks += 1;
        if next != pos || rules.counting == StepCounting::AllTicks {
            n_steps += 1;
        }

        pos = next;
        visit(pos);
    }

    Ok(WalkOutcome::Reached(n_steps))
}

/// Pick a uniformly random target and a distinct, uniformly random start.
///
/// Returns `(start, target)`.
///
/// # Errors
/// Returns an error if `grid_size` is smaller than 2.
pub fn place_random_positions<R: Rng + ?Sized>(
    grid_size: usize,
    rng: &mut R,
) -> Result<(Position, Position)> {
    check_num(grid_size, 2..).context("invalid grid size")?;

    let coord_dist = Uniform::new(0, grid_size)?;
    let sample_pos = |rng: &mut R| Position::new(coord_dist.sample(rng), coord_dist.sample(rng));

    let target = sample_pos(rng);
    loop {
        let start = sample_pos(rng);
        if start != target {
            return Ok((start, target));
        }
    }
}

/// Run `n_trials` independent walks between fresh random placements and
/// append their outcomes to `history`.
pub fn run_many<R: Rng + ?Sized>(
    model: &Model,
    n_trials: usize,
    rules: WalkRules,
    history: &mut History,
    rng: &mut R,
) -> Result<()> {
    const N_REPORTS: usize = 10;
    let report_every = n_trials.div_ceil(N_REPORTS).max(1);

    for i_trial in 0..n_trials {
        let (start, target) = place_random_positions(model.grid_size(), rng)
            .context("failed to place walker and sensor")?;

        let outcome = run_walk(model.table(), start, target, rules, rng)
            .with_context(|| format!("failed to run trial {i_trial}"))?;
        match outcome {
            WalkOutcome::Reached(steps) => {
                log::debug!("trial {i_trial}: {start:?} -> {target:?} in {steps} steps");
            }
            WalkOutcome::Exhausted(steps) => {
                log::warn!("trial {i_trial}: {start:?} -> {target:?} exhausted after {steps} steps");
            }
        }
        history.push(outcome);

        if (i_trial + 1) % report_every == 0 || i_trial + 1 == n_trials {
            let progress = 100.0 * (i_trial + 1) as f64 / n_trials as f64;
            log::info!("completed {progress:06.2}%");
        }
    }

    Ok(())
}
