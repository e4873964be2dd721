//! Bit-packed 1D buffer for per-lane boolean flags.
//!
//! Uses 1 bit per lane instead of 1 byte. Bits past `len` in the last word
//! are always kept zero, so word-wise operations never see stale lanes.

/// Number of bits per storage word.
const BITS_PER_WORD: usize = 64;

/// A fixed-length sequence of booleans packed into `u64` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer {
    /// Packed bit storage, LSB first.
    words: Vec<u64>,
    len: usize,
}

impl BitBuffer {
    /// Create a new bit buffer of `len` bits, all set to `value`.
    #[inline]
    pub fn new_filled(len: usize, value: bool) -> Self {
        let fill = if value { !0u64 } else { 0u64 };
        let mut buf = Self {
            words: vec![fill; len.div_ceil(BITS_PER_WORD)],
            len,
        };
        buf.clear_tail();
        buf
    }

    /// Create a new bit buffer from a slice of booleans.
    #[inline]
    pub fn from_slice(data: &[bool]) -> Self {
        let mut words = vec![0u64; data.len().div_ceil(BITS_PER_WORD)];

        for (i, &value) in data.iter().enumerate() {
            if value {
                words[i / BITS_PER_WORD] |= 1u64 << (i % BITS_PER_WORD);
            }
        }

        Self {
            words,
            len: data.len(),
        }
    }

    /// Create a buffer of `len` bits where only the first `count` are set.
    pub fn with_prefix(len: usize, count: usize) -> Self {
        assert!(
            count <= len,
            "prefix {} is longer than the buffer ({})",
            count,
            len
        );

        let mut buf = Self::new_filled(len, false);
        let full_words = count / BITS_PER_WORD;
        buf.words[..full_words].fill(!0u64);
        let rest = count % BITS_PER_WORD;
        if rest != 0 {
            buf.words[full_words] = (1u64 << rest) - 1;
        }
        buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get a bit value at the given index.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        (self.words[idx / BITS_PER_WORD] >> (idx % BITS_PER_WORD)) & 1 != 0
    }

    /// Count the number of set bits.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if at least one bit is set.
    #[inline]
    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// In-place `self &= other`.
    pub fn and_assign(&mut self, other: &Self) {
        assert_eq!(self.len, other.len, "bit buffer length mismatch");
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a &= *b);
    }

    /// In-place `self &= !other`.
    pub fn and_not_assign(&mut self, other: &Self) {
        assert_eq!(self.len, other.len, "bit buffer length mismatch");
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a &= !*b);
    }

    fn clear_tail(&mut self) {
        let rest = self.len % BITS_PER_WORD;
        if rest != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rest) - 1;
            }
        }
    }
}
