// Bipolar-encoding equivalence: bipolar GEMM must match a naive GEMM over
// the sign-expanded {-1, +1} matrices, including mixed bipolar x multi-bit
// combinations.

use gemm_bitserial::random::random_matrix;
use gemm_bitserial::{gemm_bit_serial, Backend, GemmContext};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn naive_gemm(a: &[i32], a_rows: usize, b: &[i32], b_rows: usize, depth: usize) -> Vec<i64> {
    let mut c = vec![0i64; a_rows * b_rows];
    for i in 0..a_rows {
        for j in 0..b_rows {
            let mut acc = 0i64;
            for k in 0..depth {
                acc += a[i * depth + k] as i64 * b[j * depth + k] as i64;
            }
            c[i * b_rows + j] = acc;
        }
    }
    c
}

#[test]
fn bipolar_times_bipolar_matches_sign_expanded_gemm() {
    let mut rng = StdRng::seed_from_u64(55);

    for _ in 0..20 {
        let lhs_rows = rng.random_range(1..=6);
        let rhs_rows = rng.random_range(1..=6);
        let depth = rng.random_range(1..=33);

        let lhs_src = random_matrix(lhs_rows, depth, 1, true, rng.random());
        let rhs_src = random_matrix(rhs_rows, depth, 1, true, rng.random());

        let mut ctx =
            GemmContext::alloc(lhs_rows, depth, rhs_rows, 1, 1, true, true, Backend::Generic).unwrap();
        ctx.lhs_mut().import_regular(&lhs_src, false);
        ctx.rhs_mut().import_regular(&rhs_src, false);
        gemm_bit_serial(&mut ctx);

        let expected = naive_gemm(&lhs_src, lhs_rows, &rhs_src, rhs_rows, depth);
        for i in 0..lhs_rows {
            for j in 0..rhs_rows {
                assert_eq!(ctx.result()[i * rhs_rows + j] as i64, expected[i * rhs_rows + j]);
            }
        }
    }
}

#[test]
fn bipolar_times_unsigned_multibit_matches_naive_gemm() {
    let lhs_rows = 4;
    let rhs_rows = 3;
    let depth = 9;

    let lhs_src = random_matrix(lhs_rows, depth, 1, true, 101); // bipolar
    let rhs_src = random_matrix(rhs_rows, depth, 4, false, 202); // unsigned 4-bit

    let mut ctx =
        GemmContext::alloc(lhs_rows, depth, rhs_rows, 1, 4, true, false, Backend::Generic).unwrap();
    ctx.lhs_mut().import_regular(&lhs_src, false);
    ctx.rhs_mut().import_regular(&rhs_src, false);
    gemm_bit_serial(&mut ctx);

    let expected = naive_gemm(&lhs_src, lhs_rows, &rhs_src, rhs_rows, depth);
    for i in 0..lhs_rows {
        for j in 0..rhs_rows {
            assert_eq!(ctx.result()[i * rhs_rows + j] as i64, expected[i * rhs_rows + j]);
        }
    }
}

#[test]
fn bipolar_times_signed_multibit_matches_naive_gemm() {
    let lhs_rows = 3;
    let rhs_rows = 4;
    let depth = 6;

    let lhs_src = random_matrix(lhs_rows, depth, 3, true, 303); // signed 3-bit
    let rhs_src = random_matrix(rhs_rows, depth, 1, true, 404); // bipolar

    let mut ctx =
        GemmContext::alloc(lhs_rows, depth, rhs_rows, 3, 1, true, true, Backend::Generic).unwrap();
    ctx.lhs_mut().import_regular(&lhs_src, false);
    ctx.rhs_mut().import_regular(&rhs_src, false);
    gemm_bit_serial(&mut ctx);

    let expected = naive_gemm(&lhs_src, lhs_rows, &rhs_src, rhs_rows, depth);
    for i in 0..lhs_rows {
        for j in 0..rhs_rows {
            assert_eq!(ctx.result()[i * rhs_rows + j] as i64, expected[i * rhs_rows + j]);
        }
    }
}

#[test]
fn orthogonal_bipolar_rows_sum_to_zero() {
    let mut ctx = GemmContext::alloc(1, 8, 1, 1, 1, true, true, Backend::Generic).unwrap();
    ctx.lhs_mut().import_regular(&[1i8; 8], false);
    ctx.rhs_mut().import_regular(&[1i8, -1, 1, -1, 1, -1, 1, -1], false);
    gemm_bit_serial(&mut ctx);
    assert_eq!(ctx.result(), &[0]);
}
