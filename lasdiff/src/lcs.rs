//! Longest-common-subsequence length table shared by leaf alignment and
//! ordering-change detection.

/// `len(i, j)` = LCS length of `a[i..]` and `b[j..]`, filled from the end.
pub(crate) struct LcsTable {
    cols: usize,
    len: Vec<u32>,
}

impl LcsTable {
    /// Fill the table for sequences of length `m` and `n`, where
    /// `agree(i, j)` says whether `a[i]` and `b[j]` correspond.
    pub(crate) fn new(m: usize, n: usize, agree: impl Fn(usize, usize) -> bool) -> Self {
        let cols = n + 1;
        let mut len = vec![0u32; (m + 1) * cols];
        for i in (0..m).rev() {
            for j in (0..n).rev() {
                len[i * cols + j] = if agree(i, j) {
                    len[(i + 1) * cols + j + 1] + 1
                } else {
                    len[(i + 1) * cols + j].max(len[i * cols + j + 1])
                };
            }
        }
        Self { cols, len }
    }

    #[inline]
    pub(crate) fn at(&self, i: usize, j: usize) -> u32 {
        self.len[i * self.cols + j]
    }

    /// Walk the table and return the aligned index pairs, preferring to skip
    /// an element of `a` on ties.
    pub(crate) fn align(&self, m: usize, n: usize, agree: impl Fn(usize, usize) -> bool) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < m && j < n {
            if agree(i, j) {
                pairs.push((i, j));
                i += 1;
                j += 1;
            } else if self.at(i + 1, j) >= self.at(i, j + 1) {
                i += 1;
            } else {
                j += 1;
            }
        }
        pairs
    }
}
