//! The fixed enumeration of scalar source/destination types importers and
//! exporters convert to and from, per spec.md §9's "Template-over-T"
//! design note: rather than a single generic-numeric trait, one trait
//! `ScalarElement` with one impl per concrete width, the same shape as
//! `BitOps`/`MintermEncoding` in the teacher's bit-width encoding.

/// A scalar element type a [`crate::bsm::BitSerialMatrix`] can import from
/// or export to.
pub trait ScalarElement: Copy {
    /// Widen to `i64` for the bit-decomposition/reconstruction math. `f32`
    /// sources/destinations are expected to already hold integral values.
    fn to_i64(self) -> i64;
    fn from_i64(v: i64) -> Self;
}

macro_rules! impl_scalar_element_int {
    ($t:ty) => {
        impl ScalarElement for $t {
            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }
            #[inline]
            fn from_i64(v: i64) -> Self {
                v as $t
            }
        }
    };
}

impl_scalar_element_int!(i8);
impl_scalar_element_int!(u8);
impl_scalar_element_int!(i16);
impl_scalar_element_int!(u16);
impl_scalar_element_int!(i32);
impl_scalar_element_int!(u32);

impl ScalarElement for f32 {
    #[inline]
    fn to_i64(self) -> i64 {
        self as i64
    }
    #[inline]
    fn from_i64(v: i64) -> Self {
        v as f32
    }
}
