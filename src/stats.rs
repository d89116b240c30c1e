use anyhow::{Result, bail};

/// Running mean and variance of a stream of values (Welford's algorithm).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, PartialEq)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    pub fn report(&self) -> AccumulatorReport {
        let empty = self.n_vals == 0;
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: if empty { f64::NAN } else { self.mean },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
            min: if empty { f64::NAN } else { self.min },
            max: if empty { f64::NAN } else { self.max },
        }
    }
}

/// Frequency histogram with a fixed number of equal-width bins.
///
/// The bins cover the observed range `[lo, hi]`; the last bin is closed on
/// the right. A range of zero width is widened by 0.5 on each side.
#[derive(Debug)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<usize>,
}

impl Histogram {
    pub fn new(vals: &[usize], n_bins: usize) -> Result<Self> {
        if n_bins == 0 {
            bail!("number of bins must be positive");
        }
        let (Some(&min), Some(&max)) = (vals.iter().min(), vals.iter().max()) else {
            bail!("histogram needs at least one value");
        };

        let (mut lo, mut hi) = (min as f64, max as f64);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / n_bins as f64;
        let mut counts = vec![0; n_bins];
        for &val in vals {
            let i_bin = ((val as f64 - lo) / width) as usize;
            counts[i_bin.min(n_bins - 1)] += 1;
        }

        Ok(Self { lo, hi, counts })
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Range `[lo, hi]` covered by the bins.
    pub fn range(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    pub fn bin_edges(&self, i_bin: usize) -> (f64, f64) {
        let width = (self.hi - self.lo) / self.n_bins() as f64;
        (
            self.lo + width * i_bin as f64,
            self.lo + width * (i_bin + 1) as f64,
        )
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_matches_direct_computation() {
        let vals = [3.0, 7.0, 7.0, 19.0];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));
        let report = acc.report();

        assert_eq!(report.n_vals, 4);
        assert!((report.mean - 9.0).abs() < 1e-12);
        let var = vals.iter().map(|v| (v - 9.0_f64).powi(2)).sum::<f64>() / 3.0;
        assert!((report.std_dev - var.sqrt()).abs() < 1e-12);
        assert_eq!(report.min, 3.0);
        assert_eq!(report.max, 19.0);
    }

    #[test]
    fn accumulator_with_few_values() {
        let acc = Accumulator::new();
        assert!(acc.report().mean.is_nan());

        let mut acc = Accumulator::new();
        acc.add(5.0);
        let report = acc.report();
        assert_eq!(report.mean, 5.0);
        assert!(report.std_dev.is_nan());
    }

    #[test]
    fn histogram_counts_every_value() {
        let vals: Vec<usize> = (0..=100).collect();
        let hist = Histogram::new(&vals, 20).expect("histogram");
        assert_eq!(hist.n_bins(), 20);
        assert_eq!(hist.counts().iter().sum::<usize>(), vals.len());
        assert_eq!(hist.range(), (0.0, 100.0));
        assert_eq!(hist.counts()[0], 5);
        assert_eq!(hist.counts()[19], 6);
        assert_eq!(hist.bin_edges(1), (5.0, 10.0));
    }

    #[test]
    fn histogram_of_constant_values() {
        let hist = Histogram::new(&[4, 4, 4], 20).expect("histogram");
        assert_eq!(hist.range(), (3.5, 4.5));
        assert_eq!(hist.counts()[10], 3);
        assert_eq!(hist.max_count(), 3);
    }

    #[test]
    fn histogram_rejects_degenerate_input() {
        assert!(Histogram::new(&[], 20).is_err());
        assert!(Histogram::new(&[1, 2], 0).is_err());
    }
}
