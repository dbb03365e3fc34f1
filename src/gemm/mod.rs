//! `GEMMContext` and the cache-blocked bit-serial GEMM kernel.
//!
//! The outer loop tiles LHS/RHS rows by the block sizes the solver chose;
//! for every `(bit_lhs, bit_rhs)` bit-plane pair it delegates to
//! [`microkernel::and_popcount_row`] and folds the result into the 32-bit
//! accumulator with `2^(bit_lhs+bit_rhs)` weighting, sign correction, and
//! (when either operand is bipolar) the `sum_rows`-based signed-sum
//! correction described in spec.md §4.5.

pub mod microkernel;

use crate::align::align_to;
use crate::backend::Backend;
use crate::block_solver::{solve_block_sizes, BlockSizes};
use crate::bsm::BitSerialMatrix;
use crate::error::GemmBitserialError;
use crate::sumrows::sum_rows;

use tracing::debug;

/// Register/cache tuning constants a back-end supplies to the block-size
/// solver: `m_lhs`/`m_rhs` are register-tile row multiples, `m_depth` is
/// the depth register multiple (depth is aligned to `m_depth * 64` bits),
/// and `cache_bits` is the target cache residency budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmTuning {
    pub m_lhs: usize,
    pub m_rhs: usize,
    pub m_depth: usize,
    pub cache_bits: usize,
}

/// Conservative default tuning per backend. Real deployments would
/// calibrate `cache_bits` against the target CPU's actual L2 budget; these
/// are illustrative defaults in the same spirit as the fixed `DK_OFFSET`/
/// `BUCKET_WIDTH` constants the teacher's encodings use per bit-width.
pub fn default_tuning(backend: Backend) -> GemmTuning {
    match backend.resolve() {
        Backend::Generic => GemmTuning {
            m_lhs: 4,
            m_rhs: 4,
            m_depth: 1,
            cache_bits: 32 * 1024 * 8,
        },
        Backend::Avx2 => GemmTuning {
            m_lhs: 8,
            m_rhs: 8,
            m_depth: 4,
            cache_bits: 256 * 1024 * 8,
        },
        Backend::Avx512 => GemmTuning {
            m_lhs: 8,
            m_rhs: 8,
            m_depth: 8,
            cache_bits: 1024 * 1024 * 8,
        },
        Backend::AutoDetect => unreachable!("Backend::resolve never returns AutoDetect"),
    }
}

/// Owns the LHS/RHS bit-serial operands, the solved block sizes, and the
/// unpadded `lhs.nrows() x rhs.nrows()` result buffer.
#[derive(Debug)]
pub struct GemmContext {
    lhs: BitSerialMatrix,
    rhs: BitSerialMatrix,
    block_sizes: BlockSizes,
    backend: Backend,
    result: Vec<i32>,
}

impl GemmContext {
    /// Allocate a context using the given backend's default tuning
    /// constants (resolving `AutoDetect` at allocation time).
    pub fn alloc(
        lhs_rows: usize,
        depth: usize,
        rhs_rows: usize,
        lhs_bits: usize,
        rhs_bits: usize,
        lhs_signed: bool,
        rhs_signed: bool,
        backend: Backend,
    ) -> Result<Self, GemmBitserialError> {
        let backend = backend.resolve();
        Self::alloc_with_tuning(
            lhs_rows,
            depth,
            rhs_rows,
            lhs_bits,
            rhs_bits,
            lhs_signed,
            rhs_signed,
            backend,
            default_tuning(backend),
        )
    }

    /// Allocate a context with caller-supplied tuning constants, the
    /// variant spec.md §4.5 reserves for a back-end that wants its own
    /// `mL`/`mD`/`mR`/`cacheBits`.
    pub fn alloc_with_tuning(
        lhs_rows: usize,
        depth: usize,
        rhs_rows: usize,
        lhs_bits: usize,
        rhs_bits: usize,
        lhs_signed: bool,
        rhs_signed: bool,
        backend: Backend,
        tuning: GemmTuning,
    ) -> Result<Self, GemmBitserialError> {
        let depth_colalign = tuning.m_depth * 64;
        let depth_a = align_to(depth, depth_colalign);

        let block_sizes = solve_block_sizes(
            tuning.m_lhs,
            tuning.m_rhs,
            tuning.cache_bits,
            depth_a,
            lhs_rows,
            rhs_rows,
        )?;

        let lhs = BitSerialMatrix::alloc(
            lhs_bits,
            lhs_rows,
            depth,
            lhs_signed,
            block_sizes.lhs_block,
            depth_colalign,
        )?;
        let rhs = BitSerialMatrix::alloc(
            rhs_bits,
            rhs_rows,
            depth,
            rhs_signed,
            block_sizes.rhs_block,
            depth_colalign,
        )?;

        debug!(?backend, ?block_sizes, depth_a, "allocated GEMM context");

        Ok(Self {
            result: vec![0i32; lhs_rows * rhs_rows],
            lhs,
            rhs,
            block_sizes,
            backend,
        })
    }

    pub fn lhs(&self) -> &BitSerialMatrix {
        &self.lhs
    }
    pub fn lhs_mut(&mut self) -> &mut BitSerialMatrix {
        &mut self.lhs
    }
    pub fn rhs(&self) -> &BitSerialMatrix {
        &self.rhs
    }
    pub fn rhs_mut(&mut self) -> &mut BitSerialMatrix {
        &mut self.rhs
    }
    pub fn result(&self) -> &[i32] {
        &self.result
    }
    pub fn result_shape(&self) -> (usize, usize) {
        (self.lhs.nrows(), self.rhs.nrows())
    }
    pub fn block_sizes(&self) -> BlockSizes {
        self.block_sizes
    }
    pub fn backend(&self) -> Backend {
        self.backend
    }
}

/// Run the cache-blocked bit-serial GEMM: `ctx.result()[i*rhs.nrows()+j]
/// = Σ_k lhs[i,k]*rhs[j,k]` after this call.
pub fn gemm_bit_serial(ctx: &mut GemmContext) {
    assert_eq!(ctx.lhs.ncols(), ctx.rhs.ncols(), "lhs/rhs depth mismatch");
    assert_eq!(ctx.lhs.ncols_a(), ctx.rhs.ncols_a(), "lhs/rhs must share colalign");

    ctx.result.fill(0);

    let depth = ctx.lhs.ncols() as i64;
    let lhs_sums = ctx.lhs.is_bipolar().then(|| sum_rows(&ctx.lhs));
    let rhs_sums = ctx.rhs.is_bipolar().then(|| sum_rows(&ctx.rhs));

    let lhs_rows_a = ctx.lhs.nrows_a();
    let rhs_rows_a = ctx.rhs.nrows_a();
    let lhs_nrows = ctx.lhs.nrows();
    let rhs_nrows = ctx.rhs.nrows();
    let lhs_block = ctx.block_sizes.lhs_block;
    let rhs_block = ctx.block_sizes.rhs_block;
    let backend = ctx.backend;

    let mut lhs_tile_start = 0;
    while lhs_tile_start < lhs_rows_a {
        let lhs_tile_end = (lhs_tile_start + lhs_block).min(lhs_rows_a);

        let mut rhs_tile_start = 0;
        while rhs_tile_start < rhs_rows_a {
            let rhs_tile_end = (rhs_tile_start + rhs_block).min(rhs_rows_a);

            for bl in 0..ctx.lhs.nbits() {
                for br in 0..ctx.rhs.nbits() {
                    let sign_l = ctx.lhs.signed() && !ctx.lhs.is_bipolar() && bl == ctx.lhs.nbits() - 1;
                    let sign_r = ctx.rhs.signed() && !ctx.rhs.is_bipolar() && br == ctx.rhs.nbits() - 1;
                    let negate = sign_l ^ sign_r;
                    let weight = 1i64 << (bl + br);

                    for i in lhs_tile_start..lhs_tile_end.min(lhs_nrows) {
                        let lhs_row = ctx.lhs.row_words(bl, i);

                        for j in rhs_tile_start..rhs_tile_end.min(rhs_nrows) {
                            let rhs_row = ctx.rhs.row_words(br, j);
                            let p = microkernel::and_popcount_row(backend, lhs_row, rhs_row) as i64;

                            let contribution = match (&lhs_sums, &rhs_sums) {
                                (Some(lsum), Some(rsum)) => {
                                    4 * p - 2 * lsum[i] as i64 - 2 * rsum[j] as i64 + depth
                                }
                                (Some(_), None) => {
                                    // rhs is the non-bipolar operand here, so the
                                    // subtrahend is *its* current bit-plane row
                                    // popcount, not the bipolar row sum.
                                    let row_pop: i64 =
                                        rhs_row.iter().map(|w| w.count_ones() as i64).sum();
                                    let c = (2 * p - row_pop) << br;
                                    if sign_r { -c } else { c }
                                }
                                (None, Some(_)) => {
                                    let row_pop: i64 =
                                        lhs_row.iter().map(|w| w.count_ones() as i64).sum();
                                    let c = (2 * p - row_pop) << bl;
                                    if sign_l { -c } else { c }
                                }
                                (None, None) => {
                                    if negate { -(weight * p) } else { weight * p }
                                }
                            };

                            ctx.result[i * rhs_nrows + j] += contribution as i32;
                        }
                    }
                }
            }

            rhs_tile_start = rhs_tile_end;
        }
        lhs_tile_start = lhs_tile_end;
    }
}
