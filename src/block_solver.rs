//! Block-size solver: picks row-tile counts for the LHS/RHS operands that
//! fit a cache budget while staying a multiple of the register-tile size.
//!
//! Given register-tile multiples `m_lhs`, `m_rhs`, a padded depth in bits
//! `depth_bits`, and a cache budget `cache_bits`, the solver chooses
//! `L = m_lhs * x`, `R = m_rhs * x` maximising `x` subject to
//!
//! `32*L*R + depth_bits*(L + R) <= cache_bits`
//!
//! (a result tile of 32-bit accumulators, plus two input stripes of
//! `depth_bits` bits per row). Substituting gives a quadratic in `x`:
//! `a*x^2 + b*x - cache_bits <= 0` with `a = 32*m_lhs*m_rhs`,
//! `b = depth_bits*(m_lhs + m_rhs)`; the solver takes the floor of the
//! quadratic's positive root.

use crate::error::GemmBitserialError;

use tracing::{debug, trace};

/// Solved (and possibly fine-tuned) row-tile sizes for both operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizes {
    pub lhs_block: usize,
    pub rhs_block: usize,
}

/// Solve for `(lhs_block, rhs_block)` given register-tile multiples, a
/// cache budget in bits, the padded depth in bits, and the (padded) row
/// counts of each operand.
///
/// Falls back to register-tile-only blocking when the unconstrained
/// quadratic solution overshoots either operand's row count, and invokes
/// [`fine_tune_block_size`] per side when the resulting padding waste
/// exceeds 10%.
pub fn solve_block_sizes(
    m_lhs: usize,
    m_rhs: usize,
    cache_bits: usize,
    depth_bits: usize,
    lhs_rows: usize,
    rhs_rows: usize,
) -> Result<BlockSizes, GemmBitserialError> {
    assert!(m_lhs > 0 && m_rhs > 0, "register-tile multiples must be positive");

    let a = 32u128 * m_lhs as u128 * m_rhs as u128;
    let b = depth_bits as u128 * (m_lhs + m_rhs) as u128;
    let discriminant = b * b + 4 * a * cache_bits as u128;

    if discriminant == 0 {
        return Err(GemmBitserialError::SolverInfeasible {
            m_lhs,
            m_rhs,
            cache_bits,
            depth_bits,
        });
    }

    let sqrt_disc = isqrt_u128(discriminant);
    // root = (-b + sqrt(disc)) / (2a); b, sqrt_disc, a are all non-negative
    // so the root itself is non-negative whenever sqrt_disc >= b.
    if sqrt_disc < b {
        return Err(GemmBitserialError::SolverInfeasible {
            m_lhs,
            m_rhs,
            cache_bits,
            depth_bits,
        });
    }
    let x = (sqrt_disc - b) / (2 * a);

    if x == 0 {
        return Err(GemmBitserialError::SolverInfeasible {
            m_lhs,
            m_rhs,
            cache_bits,
            depth_bits,
        });
    }

    let x = x as usize;
    let mut lhs_block = m_lhs * x;
    let mut rhs_block = m_rhs * x;
    trace!(lhs_block, rhs_block, x, "block solver quadratic root");

    if lhs_block > lhs_rows || rhs_block > rhs_rows {
        lhs_block = crate::align::align_to(lhs_rows, m_lhs);
        rhs_block = crate::align::align_to(rhs_rows, m_rhs);
        debug!(lhs_block, rhs_block, "block solver fell back to register-tile-only blocking");
        return Ok(BlockSizes { lhs_block, rhs_block });
    }

    if padding_waste(lhs_rows, lhs_block) > 0.10 {
        lhs_block = fine_tune_block_size(lhs_rows, lhs_block, m_lhs);
    }
    if padding_waste(rhs_rows, rhs_block) > 0.10 {
        rhs_block = fine_tune_block_size(rhs_rows, rhs_block, m_rhs);
    }

    debug!(lhs_block, rhs_block, "block solver chose tile sizes");
    Ok(BlockSizes { lhs_block, rhs_block })
}

fn padding_waste(rows: usize, block: usize) -> f64 {
    (crate::align::align_to(rows, block) - rows) as f64 / rows as f64
}

/// Search candidate block sizes from `bs_max` down to `bs_div` in steps of
/// `bs_div`, keeping only multiples of `bs_div`, and return the candidate
/// minimising padding waste against `rows`. Ties favour the larger (higher
/// throughput) candidate, which falls out naturally from scanning largest
/// to smallest and only replacing on strict improvement.
pub fn fine_tune_block_size(rows: usize, bs_max: usize, bs_div: usize) -> usize {
    assert!(bs_div > 0 && bs_max % bs_div == 0, "bs_max must be a multiple of bs_div");

    let mut best = bs_max;
    let mut best_waste = crate::align::align_to(rows, bs_max) - rows;

    let mut cand = bs_max;
    while cand >= bs_div {
        let waste = crate::align::align_to(rows, cand) - rows;
        if waste < best_waste {
            best = cand;
            best_waste = waste;
        }
        if cand == bs_div {
            break;
        }
        cand -= bs_div;
    }

    best
}

/// Integer square root via Newton's method, exact for the discriminant
/// range the solver produces (perfect squares aside, always floors).
fn isqrt_u128(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
