//! Thresholded-activation output interface (spec.md §3, §6): a
//! post-processing step over a GEMM result, not wired into the kernel.

/// `num_thresholds x rows` monotone non-decreasing thresholds, one column
/// of thresholds per output row.
#[derive(Debug, Clone)]
pub struct ThresholdMatrix {
    rows: usize,
    thresholds: Vec<Vec<i32>>,
}

impl ThresholdMatrix {
    /// `thresholds[t]` is the length-`rows` threshold vector for crossing
    /// level `t`; thresholds must be non-decreasing along `t` for the
    /// output to be monotone, but this is the caller's responsibility to
    /// uphold (not checked here, matching spec.md's framing of
    /// thresholding as an output-interface contract, not a kernel one).
    pub fn new(rows: usize, thresholds: Vec<Vec<i32>>) -> Self {
        assert!(
            thresholds.iter().all(|t| t.len() == rows),
            "every threshold level must supply exactly `rows` entries"
        );
        Self { rows, thresholds }
    }

    pub fn num_thresholds(&self) -> usize {
        self.thresholds.len()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// For each row of a GEMM result, count how many thresholds it crosses.
/// `result` is row-major `rows x cols`; only the first column of each row
/// is compared against `thresholds` (the activation interface applies
/// per-output-row, matching spec.md §3's `[numThresholds][rows]` shape).
pub fn apply_thresholds(result: &[i32], rows: usize, cols: usize, thresholds: &ThresholdMatrix) -> Vec<u32> {
    assert_eq!(result.len(), rows * cols);
    assert_eq!(thresholds.rows(), rows);

    (0..rows)
        .map(|r| {
            let value = result[r * cols];
            thresholds
                .thresholds
                .iter()
                .filter(|level| value >= level[r])
                .count() as u32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_crossings_per_row() {
        let thresholds = ThresholdMatrix::new(2, vec![vec![0, 0], vec![5, 10], vec![10, 20]]);
        // row0 crosses all three levels (value 12 >= 0,5,10); row1 crosses only the first (value 3 >= 0)
        let result = vec![12, 0, 3, 0];
        let counts = apply_thresholds(&result, 2, 2, &thresholds);
        assert_eq!(counts, vec![3, 1]);
    }

    #[test]
    fn zero_crossings_when_below_every_threshold() {
        let thresholds = ThresholdMatrix::new(1, vec![vec![100]]);
        let result = vec![1];
        let counts = apply_thresholds(&result, 1, 1, &thresholds);
        assert_eq!(counts, vec![0]);
    }
}
