use crate::config::{check_num, check_prob_vec};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_distr::{Open01, weighted::WeightedIndex};

/// Number of move directions available from every cell.
pub const N_DIR: usize = 4;

/// Unit move of the walker, indexed as in the transition table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; N_DIR] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Offset `(dx, dy)` applied by this move.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Cell of the grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Neighbor in direction `dir`, if it lies inside a grid of side `grid_size`.
    pub fn neighbor(self, dir: Direction, grid_size: usize) -> Option<Self> {
        let (dx, dy) = dir.offset();
        let x = self.x.checked_add_signed(dx).filter(|&x| x < grid_size)?;
        let y = self.y.checked_add_signed(dy).filter(|&y| y < grid_size)?;
        Some(Self { x, y })
    }
}

/// Per-cell probability distributions over move directions.
///
/// Cells are stored row-major (`y * grid_size + x`). Every row is a valid
/// probability vector, and the table never changes once built.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    grid_size: usize,
    probs: Vec<[f64; N_DIR]>,
    dists: Vec<WeightedIndex<f64>>,
}

impl TransitionTable {
    /// Generate a random table for a grid of side `grid_size`.
    ///
    /// Weights are drawn from the open interval (0, 1) and normalized per cell,
    /// so every direction has strictly positive probability.
    pub fn generate<R: Rng + ?Sized>(grid_size: usize, rng: &mut R) -> Result<Self> {
        let n_cell = grid_size * grid_size;
        let mut probs = Vec::with_capacity(n_cell);
        for _ in 0..n_cell {
            let mut weights = [0.0_f64; N_DIR];
            for ele in weights.iter_mut() {
                *ele = rng.sample(Open01);
            }
            let sum: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|ele| *ele /= sum);
            probs.push(weights);
        }
        Self::from_probs(grid_size, probs)
    }

    /// Build a table from explicit per-cell distributions.
    ///
    /// # Errors
    /// Returns an error if the number of cells does not match `grid_size` or
    /// if any cell is not a probability vector.
    pub fn from_probs(grid_size: usize, probs: Vec<[f64; N_DIR]>) -> Result<Self> {
        check_num(grid_size, 1..).context("invalid grid size")?;
        let n_cell = grid_size * grid_size;
        if probs.len() != n_cell {
            bail!("table must have {n_cell} cells, but has {}", probs.len());
        }

        let mut dists = Vec::with_capacity(probs.len());
        for (i_cell, cell) in probs.iter().enumerate() {
            check_prob_vec(cell, N_DIR)
                .with_context(|| format!("invalid probabilities of cell {i_cell}"))?;
            dists.push(WeightedIndex::new(cell)?);
        }

        Ok(Self {
            grid_size,
            probs,
            dists,
        })
    }

    /// Build a table in which every cell uses the same distribution.
    #[cfg(test)]
    pub fn uniform_cells(grid_size: usize, cell: [f64; N_DIR]) -> Result<Self> {
        Self::from_probs(grid_size, vec![cell; grid_size * grid_size])
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Direction probabilities of the cell at `pos`.
    pub fn probs(&self, pos: Position) -> &[f64; N_DIR] {
        &self.probs[self.cell_index(pos)]
    }

    /// Sample a move direction from the distribution of the cell at `pos`.
    pub fn sample_direction<R: Rng + ?Sized>(&self, pos: Position, rng: &mut R) -> Direction {
        let idx = self.dists[self.cell_index(pos)].sample(rng);
        Direction::ALL[idx]
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.grid_size && pos.y < self.grid_size
    }

    fn cell_index(&self, pos: Position) -> usize {
        debug_assert!(self.contains(pos), "{pos:?} is outside the grid");
        pos.y * self.grid_size + pos.x
    }
}

/// Immutable simulation model shared by every trial of a session.
#[derive(Debug, Clone)]
pub struct Model {
    table: TransitionTable,
}

impl Model {
    /// Generate a model with a random transition table.
    ///
    /// # Errors
    /// Returns an error if `grid_size` is smaller than 2, since start and
    /// target cells could then never differ.
    pub fn generate<R: Rng + ?Sized>(grid_size: usize, rng: &mut R) -> Result<Self> {
        check_num(grid_size, 2..).context("invalid grid size")?;
        let table = TransitionTable::generate(grid_size, rng)
            .context("failed to generate transition table")?;
        Ok(Self { table })
    }

    #[cfg(test)]
    pub fn from_table(table: TransitionTable) -> Result<Self> {
        check_num(table.grid_size(), 2..).context("invalid grid size")?;
        Ok(Self { table })
    }

    pub fn grid_size(&self) -> usize {
        self.table.grid_size()
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn direction_indices_are_consistent() {
        for (idx, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(*dir as usize, idx);
        }
        assert_eq!(Direction::North.offset(), (0, 1));
        assert_eq!(Direction::West.offset(), (-1, 0));
    }

    #[test]
    fn neighbor_stays_inside_grid() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.neighbor(Direction::South, 3), None);
        assert_eq!(corner.neighbor(Direction::West, 3), None);
        assert_eq!(
            corner.neighbor(Direction::North, 3),
            Some(Position::new(0, 1))
        );

        let far = Position::new(2, 2);
        assert_eq!(far.neighbor(Direction::North, 3), None);
        assert_eq!(far.neighbor(Direction::East, 3), None);
        assert_eq!(far.neighbor(Direction::West, 3), Some(Position::new(1, 2)));
    }

    #[test]
    fn generated_table_is_normalized() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        for grid_size in [1, 2, 5, 10] {
            let table = TransitionTable::generate(grid_size, &mut rng).expect("generate");
            assert_eq!(table.grid_size(), grid_size);
            for y in 0..grid_size {
                for x in 0..grid_size {
                    let probs = table.probs(Position::new(x, y));
                    assert!(probs.iter().all(|&p| p > 0.0));
                    let sum: f64 = probs.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-9, "cell ({x}, {y}) sums to {sum}");
                }
            }
        }
    }

    #[test]
    fn from_probs_rejects_invalid_tables() {
        assert!(TransitionTable::from_probs(2, vec![[0.25; N_DIR]; 3]).is_err());
        let mut probs = vec![[0.25; N_DIR]; 4];
        probs[2] = [0.5, 0.5, 0.5, 0.0];
        assert!(TransitionTable::from_probs(2, probs).is_err());
        assert!(TransitionTable::from_probs(0, Vec::new()).is_err());
    }

    #[test]
    fn sampling_follows_degenerate_distribution() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let table = TransitionTable::uniform_cells(3, [0.0, 0.0, 1.0, 0.0]).expect("table");
        for _ in 0..100 {
            let dir = table.sample_direction(Position::new(1, 1), &mut rng);
            assert_eq!(dir, Direction::East);
        }
    }

    #[test]
    fn model_rejects_single_cell_grid() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        assert!(Model::generate(1, &mut rng).is_err());
        assert!(Model::generate(0, &mut rng).is_err());
        let table = TransitionTable::uniform_cells(1, [0.25; N_DIR]).expect("table");
        assert!(Model::from_table(table).is_err());

        let model = Model::generate(4, &mut rng).expect("model");
        assert_eq!(model.grid_size(), 4);
    }
}
