//! `BitSerialMatrix`: a dense `nrows x ncols` matrix of `nbits`-wide
//! integers stored as `nbits` binary bit-planes, with importers/exporters
//! for a fixed set of scalar element types.

mod scalar;

pub use scalar::ScalarElement;

use crate::align::{align_to, word_offset, words_per_bitplane, words_per_row, WORD_BITS};
use crate::error::GemmBitserialError;

use tracing::debug;

/// A bit-serial matrix: `nbits` binary bit-planes over an `nrows_a x
/// ncols_a` (padded) grid, addressed `[bit][row][col_word]` in a single
/// contiguous `Vec<u64>` that the matrix owns outright.
#[derive(Debug, Clone)]
pub struct BitSerialMatrix {
    nbits: usize,
    nrows: usize,
    ncols: usize,
    nrows_a: usize,
    ncols_a: usize,
    signed: bool,
    data: Vec<u64>,
}

impl BitSerialMatrix {
    /// Allocate a zeroed bit-serial matrix.
    ///
    /// `colalign` must be a multiple of the 64-bit machine word;
    /// `nbits` must be in `1..=64`. Fails with
    /// [`GemmBitserialError::InvalidShape`] on bad parameters, or
    /// [`GemmBitserialError::OutOfMemory`] if the computed buffer size
    /// would overflow.
    pub fn alloc(
        nbits: usize,
        nrows: usize,
        ncols: usize,
        signed: bool,
        rowalign: usize,
        colalign: usize,
    ) -> Result<Self, GemmBitserialError> {
        if colalign == 0 || colalign % WORD_BITS != 0 {
            return Err(GemmBitserialError::InvalidShape {
                reason: format!("colalign ({colalign}) must be a nonzero multiple of {WORD_BITS}"),
            });
        }
        if nbits == 0 || nbits > 64 {
            return Err(GemmBitserialError::InvalidShape {
                reason: format!("nbits ({nbits}) must be in 1..=64"),
            });
        }
        if nrows == 0 || ncols == 0 || rowalign == 0 {
            return Err(GemmBitserialError::InvalidShape {
                reason: "nrows, ncols, and rowalign must be positive".to_string(),
            });
        }

        let nrows_a = align_to(nrows, rowalign);
        let ncols_a = align_to(ncols, colalign);

        let total_words = nbits as u128
            * nrows_a as u128
            * (ncols_a as u128 / WORD_BITS as u128);
        let total_words_usize = usize::try_from(total_words).map_err(|_| {
            GemmBitserialError::OutOfMemory {
                requested_words: total_words,
            }
        })?;

        debug!(nbits, nrows, ncols, nrows_a, ncols_a, total_words_usize, "allocated bit-serial matrix");

        Ok(Self {
            nbits,
            nrows,
            ncols,
            nrows_a,
            ncols_a,
            signed,
            data: vec![0u64; total_words_usize],
        })
    }

    pub fn nbits(&self) -> usize {
        self.nbits
    }
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    pub fn ncols(&self) -> usize {
        self.ncols
    }
    pub fn nrows_a(&self) -> usize {
        self.nrows_a
    }
    pub fn ncols_a(&self) -> usize {
        self.ncols_a
    }
    pub fn signed(&self) -> bool {
        self.signed
    }

    /// `nbits == 1 && signed`: a single bit-plane encodes `{-1, +1}`
    /// rather than a 1-bit two's-complement value.
    pub fn is_bipolar(&self) -> bool {
        self.nbits == 1 && self.signed
    }

    pub fn words_per_row(&self) -> usize {
        words_per_row(self.ncols_a)
    }

    pub fn words_per_bitplane(&self) -> usize {
        words_per_bitplane(self.nrows_a, self.ncols_a)
    }

    /// Raw word buffer, laid out `[bit][row][col_word]`.
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// The `words_per_row()`-long word slice for bit-plane `bit`, row
    /// `row` — the unit the AND+popcount micro-kernel operates over.
    #[inline]
    pub fn row_words(&self, bit: usize, row: usize) -> &[u64] {
        let start = self.offset(bit, row, 0);
        &self.data[start..start + self.words_per_row()]
    }

    #[inline]
    fn offset(&self, bit: usize, row: usize, col: usize) -> usize {
        debug_assert!(bit < self.nbits, "bit {bit} out of range (nbits={})", self.nbits);
        debug_assert!(row < self.nrows_a, "row {row} out of range (nrows_a={})", self.nrows_a);
        debug_assert!(col < self.ncols_a, "col {col} out of range (ncols_a={})", self.ncols_a);
        word_offset(self.nrows_a, self.ncols_a, bit, row, col)
    }

    /// Read bit `(bit, row, col)`. Indices are caller-checked; out of
    /// range is a contract violation (debug-asserted, not a `Result`).
    #[inline]
    pub fn get(&self, bit: usize, row: usize, col: usize) -> bool {
        let word = self.data[self.offset(bit, row, col)];
        (word >> (col % WORD_BITS)) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, bit: usize, row: usize, col: usize) {
        let off = self.offset(bit, row, col);
        self.data[off] |= 1u64 << (col % WORD_BITS);
    }

    #[inline]
    pub fn unset(&mut self, bit: usize, row: usize, col: usize) {
        let off = self.offset(bit, row, col);
        self.data[off] &= !(1u64 << (col % WORD_BITS));
    }

    /// Zero the entire buffer (including padding).
    pub fn clear_all(&mut self) {
        self.data.fill(0);
    }

    /// Encode `v` (already widened to `i64`) into this matrix's bit
    /// representation and write it at `(row, col)`.
    fn encode_cell(&mut self, row: usize, col: usize, v: i64) {
        if self.is_bipolar() {
            if v > 0 {
                self.set(0, row, col);
            } else {
                self.unset(0, row, col);
            }
            return;
        }

        let u: u64 = if self.signed && v < 0 {
            (v + (1i64 << self.nbits)) as u64
        } else {
            v as u64
        };

        for b in 0..self.nbits {
            if (u >> b) & 1 != 0 {
                self.set(b, row, col);
            } else {
                self.unset(b, row, col);
            }
        }
    }

    /// Reconstruct the logical (signed or unsigned) integer value stored
    /// at `(row, col)`.
    fn decode_cell(&self, row: usize, col: usize) -> i64 {
        if self.is_bipolar() {
            return if self.get(0, row, col) { 1 } else { -1 };
        }

        let mut v: i64 = 0;
        for b in 0..self.nbits {
            if self.get(b, row, col) {
                if self.signed && b == self.nbits - 1 {
                    v -= 1i64 << b;
                } else {
                    v += 1i64 << b;
                }
            }
        }
        v
    }

    /// Index of logical cell `(r, c)` into a flattened row-major or
    /// column-major source/destination slice.
    #[inline]
    fn flat_index(&self, r: usize, c: usize, col_major: bool) -> usize {
        if col_major {
            c * self.nrows + r
        } else {
            r * self.ncols + c
        }
    }

    /// Clear the matrix, then import each logical cell from `src`
    /// (row-major unless `read_col_major`), bit-decomposing it into the
    /// stored representation. Padded cells are left zero.
    pub fn import_regular<T: ScalarElement>(&mut self, src: &[T], read_col_major: bool) {
        self.clear_all();
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                let v = src[self.flat_index(r, c, read_col_major)].to_i64();
                self.encode_cell(r, c, v);
            }
        }
    }

    /// Clear the matrix, then import each logical cell quantised against
    /// per-row `thresholds`. Only valid for unsigned matrices.
    ///
    /// `thresholds[t][row]` must be non-decreasing in `t` for the
    /// quantisation to be monotone; each element is replaced by the
    /// smallest `t` for which `src <= thresholds[t][row]`, or
    /// `thresholds.len()` if none qualify.
    ///
    /// `thresholds` must supply one value per row (a broadcast/shared
    /// threshold row, i.e. any inner slice shorter than `nrows`, is the
    /// known-unsupported mode inherited from the superseded Roaring
    /// prototype).
    pub fn import_regular_and_quantize<T: ScalarElement>(
        &mut self,
        src: &[T],
        thresholds: &[Vec<i64>],
        read_col_major: bool,
    ) -> Result<(), GemmBitserialError> {
        if self.signed {
            return Err(GemmBitserialError::UnsupportedMode {
                reason: "quantised import is only valid for unsigned matrices".to_string(),
            });
        }
        for (t, row_thresholds) in thresholds.iter().enumerate() {
            if row_thresholds.len() != self.nrows {
                return Err(GemmBitserialError::UnsupportedMode {
                    reason: format!(
                        "broadcast thresholds are not supported: threshold row {t} has {} entries, expected {} (one per row)",
                        row_thresholds.len(),
                        self.nrows
                    ),
                });
            }
        }

        let num_thres = thresholds.len();
        self.clear_all();
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                let v = src[self.flat_index(r, c, read_col_major)].to_i64();
                let mut q = num_thres as i64;
                for (t, row_thresholds) in thresholds.iter().enumerate() {
                    if v <= row_thresholds[r] {
                        q = t as i64;
                        break;
                    }
                }
                self.encode_cell(r, c, q);
            }
        }
        Ok(())
    }

    /// Reconstruct every logical cell into `dst` (row-major unless
    /// `write_col_major`).
    pub fn export_regular<T: ScalarElement>(&self, dst: &mut [T], write_col_major: bool) {
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                let v = self.decode_cell(r, c);
                dst[self.flat_index(r, c, write_col_major)] = T::from_i64(v);
            }
        }
    }
}
