use std::ops::Range;

/// Splits `rows` into `bands` equal contiguous ranges.
///
/// Every band gets `rows / bands` rows; the remainder goes to the last band,
/// so the ranges always cover `0..rows` exactly and never overlap.
pub fn partition_rows(rows: usize, bands: usize) -> Vec<Range<usize>> {
    assert!(bands > 0, "at least one band is required");

    let per_band = rows / bands;
    (0..bands)
        .map(|i| {
            let start = i * per_band;
            let end = if i + 1 == bands { rows } else { start + per_band };
            start..end
        })
        .collect()
}

/// Exclusive view over a contiguous range of rows of a row-major buffer.
///
/// Row indices passed to the accessors are absolute (relative to the whole
/// buffer), so per-row work reads the same with or without banding.
#[derive(Debug)]
pub struct RowBand<'a, T> {
    rows: Range<usize>,
    row_len: usize,
    data: &'a mut [T],
}

impl<'a, T> RowBand<'a, T> {
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn row_len(&self) -> usize {
        self.row_len
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(
            self.rows.contains(&y),
            "row {y} outside band {:?}",
            self.rows
        );
        let start = (y - self.rows.start) * self.row_len;
        &mut self.data[start..start + self.row_len]
    }
}

/// Hands out one disjoint [`RowBand`] per range.
///
/// The ranges must be contiguous, start at row 0 and cover the whole buffer;
/// anything else would leave rows unowned or alias them, so it panics.
pub fn split_row_bands<'a, T>(
    data: &'a mut [T],
    row_len: usize,
    ranges: &[Range<usize>],
) -> Vec<RowBand<'a, T>> {
    assert!(row_len > 0, "row length must be non-zero");
    assert_eq!(data.len() % row_len, 0, "buffer is not a whole number of rows");

    let total_rows = data.len() / row_len;
    let mut rest = data;
    let mut next_row = 0;
    let mut bands = Vec::with_capacity(ranges.len());

    for range in ranges {
        assert_eq!(range.start, next_row, "row bands must be contiguous");
        assert!(range.end >= range.start && range.end <= total_rows);

        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len() * row_len);
        bands.push(RowBand {
            rows: range.clone(),
            row_len,
            data: head,
        });
        rest = tail;
        next_row = range.end;
    }

    assert_eq!(next_row, total_rows, "row bands must cover the buffer");
    bands
}
