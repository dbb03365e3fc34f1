//! Bit-serial GEMM kernel for low-precision integer matrices.
//!
//! Two matrices of `nbits`-wide integers (optionally signed two's-complement,
//! or bipolar `{-1, +1}`) are decomposed into binary bit-planes and
//! multiplied via AND+popcount across all bit-plane pairs, with
//! `2^(bit_lhs+bit_rhs)` weighting and sign correction, accumulating into a
//! 32-bit integer result: `C = A * B^T`.
//!
//! ```
//! use gemm_bitserial::{Backend, GemmContext, gemm_bit_serial};
//!
//! let mut ctx = GemmContext::alloc(2, 3, 2, 2, 2, false, false, Backend::Generic).unwrap();
//! ctx.lhs_mut().import_regular(&[1u8, 2, 3, 0, 1, 2], false);
//! ctx.rhs_mut().import_regular(&[1u8, 1, 1, 2, 0, 1], false);
//! gemm_bit_serial(&mut ctx);
//! assert_eq!(ctx.result(), &[6, 5, 3, 2]);
//! ```

pub mod align;
pub mod backend;
pub mod block_solver;
pub mod bsm;
pub mod error;
pub mod gemm;
pub mod random;
pub mod sumrows;
pub mod threshold;

pub use backend::Backend;
pub use bsm::{BitSerialMatrix, ScalarElement};
pub use error::GemmBitserialError;
pub use gemm::{gemm_bit_serial, GemmContext, GemmTuning};
pub use sumrows::sum_rows;
