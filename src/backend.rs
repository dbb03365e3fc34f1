//! Back-end selection for the AND+popcount micro-kernel.
//!
//! Mirrors the compile-time/runtime dispatch split spec.md §9 calls for:
//! a small enum picks between a scalar fallback and architecture-specific
//! SIMD micro-kernels. All back-ends must agree bit-for-bit; they differ
//! only in throughput.

use std::fmt;

/// Which micro-kernel implementation computes AND+popcount over a row of
/// 64-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Resolve to the best backend available on the running CPU at
    /// context-creation time.
    AutoDetect,
    /// Portable scalar: 64-bit AND + `u64::count_ones`.
    Generic,
    /// x86_64 AVX2: 256-bit AND, popcount via a nibble-lookup reduction.
    Avx2,
    /// x86_64 AVX-512 with `AVX512VPOPCNTDQ`: 512-bit AND + hardware
    /// vector popcount.
    Avx512,
}

impl Backend {
    /// Runtime CPU feature detection, preferring the widest available
    /// vector width.
    pub fn detect_best() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::is_x86_feature_detected!("avx512f")
                && std::is_x86_feature_detected!("avx512vpopcntdq")
            {
                return Self::Avx512;
            }
            if std::is_x86_feature_detected!("avx2") {
                return Self::Avx2;
            }
        }
        Self::Generic
    }

    /// Resolve `AutoDetect` to a concrete backend; pass through otherwise.
    pub fn resolve(self) -> Self {
        match self {
            Self::AutoDetect => Self::detect_best(),
            other => other,
        }
    }

    /// Whether this backend's required CPU features are present.
    pub fn is_supported(self) -> bool {
        match self {
            Self::AutoDetect | Self::Generic => true,
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => std::is_x86_feature_detected!("avx2"),
            #[cfg(target_arch = "x86_64")]
            Self::Avx512 => {
                std::is_x86_feature_detected!("avx512f")
                    && std::is_x86_feature_detected!("avx512vpopcntdq")
            }
            #[cfg(not(target_arch = "x86_64"))]
            Self::Avx2 | Self::Avx512 => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoDetect => "auto-detect",
            Self::Generic => "generic (scalar)",
            Self::Avx2 => "AVX2",
            Self::Avx512 => "AVX-512",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::AutoDetect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_never_autodetect() {
        assert_ne!(Backend::AutoDetect.resolve(), Backend::AutoDetect);
    }

    #[test]
    fn generic_always_supported() {
        assert!(Backend::Generic.is_supported());
        assert!(Backend::AutoDetect.is_supported());
    }

    #[test]
    fn resolve_is_idempotent_on_concrete_variants() {
        assert_eq!(Backend::Generic.resolve(), Backend::Generic);
    }
}
