//! Per-row popcount helper used by the bipolar correction paths in the
//! GEMM kernel.

use crate::bsm::BitSerialMatrix;

/// Return, for a 1-bit [`BitSerialMatrix`], the popcount of each logical
/// row's single bit-plane (padded columns are always zero so they never
/// contribute).
pub fn sum_rows(bsm: &BitSerialMatrix) -> Vec<u32> {
    assert_eq!(bsm.nbits(), 1, "sum_rows is only defined for 1-bit matrices");

    let wpr = bsm.words_per_row();
    let data = bsm.data();
    (0..bsm.nrows())
        .map(|r| {
            let row_start = r * wpr;
            data[row_start..row_start + wpr]
                .iter()
                .map(|w| w.count_ones())
                .sum()
        })
        .collect()
}
