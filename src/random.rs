//! Random matrix generation for tests and benchmarks.
//!
//! Mirrors `qm::random`'s shape: a trait over the admissible integer
//! range for a given `(nbits, signed)` pair, backed by `rand`'s `StdRng`.
//! spec.md §9's Open Question — whether to preserve the original's
//! biased `rand() % maxVal` or switch to an unbiased draw — is resolved
//! here the same way the teacher's own `random_in_range` already resolved
//! it for minterm generation: an unbiased inclusive `random_range` draw,
//! not a modulo reduction.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Inclusive `[min, max]` range of representable values for an
/// `(nbits, signed)` bit-serial element, per spec.md §3's encoding rules.
pub fn value_range(nbits: usize, signed: bool, bipolar: bool) -> (i64, i64) {
    if bipolar {
        return (-1, 1);
    }
    if signed {
        (-(1i64 << (nbits - 1)), (1i64 << (nbits - 1)) - 1)
    } else {
        (0, (1i64 << nbits) - 1)
    }
}

/// Generate a `rows x cols` row-major matrix of random values admissible
/// for `(nbits, signed)`, via an unbiased inclusive draw per element.
pub fn random_matrix(rows: usize, cols: usize, nbits: usize, signed: bool, seed: u64) -> Vec<i32> {
    let bipolar = nbits == 1 && signed;
    let (min_val, max_val) = value_range(nbits, signed, bipolar);
    let mut rng = StdRng::seed_from_u64(seed);

    (0..rows * cols)
        .map(|_| {
            if bipolar {
                if rng.random_bool(0.5) { 1 } else { -1 }
            } else {
                rng.random_range(min_val..=max_val) as i32
            }
        })
        .collect()
}
