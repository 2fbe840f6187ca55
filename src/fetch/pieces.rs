//! Piece planning for ranged downloads.
//!
//! A remote file of `total` bytes is fetched in fixed-size pieces, one
//! transfer buffer each.  Only the last piece may be shorter.
//!
//! ```text
//! total = 3·buf + 7
//! [0 .. buf-1] [buf .. 2buf-1] [2buf .. 3buf-1] [3buf .. 3buf+6]
//! ```

/// An inclusive byte range, as sent in an HTTP `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub first: u64,
    pub last: u64,
}

impl ByteRange {
    /// Number of bytes covered.  Never zero.
    pub const fn len(&self) -> u64 {
        self.last - self.first + 1
    }

    /// `bytes=first-last`
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.first, self.last)
    }
}

/// How a download of `total` bytes is split into pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiecePlan {
    total: u64,
    piece_size: u64,
}

impl PiecePlan {
    /// Returns `None` when either size is zero or the piece count would
    /// not fit a `u32`.
    pub fn new(total: u64, piece_size: u32) -> Option<Self> {
        if total == 0 || piece_size == 0 {
            return None;
        }
        let piece_size = u64::from(piece_size);
        if total.div_ceil(piece_size) > u64::from(u32::MAX) {
            return None;
        }
        Some(Self { total, piece_size })
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    /// `ceil(total / piece_size)`; fits by construction.
    pub const fn count(&self) -> u32 {
        self.total.div_ceil(self.piece_size) as u32
    }

    /// Range of piece `index`, or `None` past the end.
    pub fn piece(&self, index: u32) -> Option<ByteRange> {
        if index >= self.count() {
            return None;
        }
        let first = u64::from(index) * self.piece_size;
        let last = (first + self.piece_size).min(self.total) - 1;
        Some(ByteRange { first, last })
    }

    /// Bytes still to come once piece `index` has been written.
    pub fn remaining_after(&self, index: u32) -> u64 {
        self.piece(index)
            .map_or(0, |range| self.total - range.last - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = ByteRange> + '_ {
        (0..self.count()).filter_map(move |i| self.piece(i))
    }
}

// ── Tests ────────────────────────────────────────────────────
