use std::fmt;

/// Errors surfaced by the bit-serial matrix and GEMM kernel.
///
/// All variants correspond to contract violations the caller is expected
/// to avoid (bad shapes, unsupported import modes, an infeasible block-size
/// solve) rather than transient or recoverable failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GemmBitserialError {
    /// A shape parameter was out of range: zero/negative sizes, `nbits`
    /// outside `1..=64`, or `colalign` not a multiple of the machine word.
    InvalidShape { reason: String },
    /// The computed buffer size overflowed `usize` before allocation was
    /// attempted.
    OutOfMemory { requested_words: u128 },
    /// An operation that is not implemented for the given configuration
    /// was requested (e.g. quantised import on a signed matrix, or a
    /// broadcast/shared threshold row).
    UnsupportedMode { reason: String },
    /// The block-size solver's quadratic has no feasible positive root
    /// for the given cache budget and register-tile multiples.
    SolverInfeasible {
        m_lhs: usize,
        m_rhs: usize,
        cache_bits: usize,
        depth_bits: usize,
    },
}

impl fmt::Display for GemmBitserialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GemmBitserialError::InvalidShape { reason } => {
                write!(f, "invalid shape: {reason}")
            }
            GemmBitserialError::OutOfMemory { requested_words } => {
                write!(f, "allocation of {requested_words} words would overflow")
            }
            GemmBitserialError::UnsupportedMode { reason } => {
                write!(f, "unsupported mode: {reason}")
            }
            GemmBitserialError::SolverInfeasible {
                m_lhs,
                m_rhs,
                cache_bits,
                depth_bits,
            } => write!(
                f,
                "block-size solver infeasible for mL={m_lhs}, mR={m_rhs}, cache_bits={cache_bits}, depth_bits={depth_bits}"
            ),
        }
    }
}

impl std::error::Error for GemmBitserialError {}
