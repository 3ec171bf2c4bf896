//! Static partitioning of the image into row bands ("buckets").
//!
//! Each bucket covers whole rows, so in row-major output it owns one
//! contiguous slice and workers never write to the same memory.

/// Default number of image rows per bucket.
pub const DEFAULT_BAND_ROWS: u32 = 16;

/// A horizontal band of full-width rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// First row of the band
    pub y: u32,
    /// Image width in pixels
    pub width: u32,
    /// Number of rows in the band
    pub height: u32,
    /// Index of this bucket from the top of the image
    pub index: usize,
}

impl Bucket {
    /// Create a new bucket.
    pub fn new(y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            y,
            width,
            height,
            index,
        }
    }

    /// Global `(x, y)` of every pixel, in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> {
        let (y0, width, height) = (self.y, self.width, self.height);
        (y0..y0 + height).flat_map(move |y| (0..width).map(move |x| (x, y)))
    }
}

/// Split an image into bands of `band_rows` rows, top to bottom.
///
/// The last band is shorter when `height` is not a multiple of `band_rows`.
/// A `band_rows` of zero is treated as one.
pub fn generate_buckets(width: u32, height: u32, band_rows: u32) -> Vec<Bucket> {
    let band_rows = band_rows.max(1);

    (0..height)
        .step_by(band_rows as usize)
        .enumerate()
        .map(|(index, y)| Bucket::new(y, width, band_rows.min(height - y), index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 64, 16);
        assert_eq!(buckets.len(), 4);

        let total_pixels: usize = buckets.iter().map(|b| b.pixels().count()).sum();
        assert_eq!(total_pixels, 128 * 64);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(10, 100, 16);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[6].y, 96);
        assert_eq!(buckets[6].height, 4);

        let total_pixels: usize = buckets.iter().map(|b| b.pixels().count()).sum();
        assert_eq!(total_pixels, 10 * 100);
    }

    #[test]
    fn test_buckets_are_contiguous_and_ordered() {
        let buckets = generate_buckets(7, 33, 5);
        let mut next_row = 0;
        for (i, bucket) in buckets.iter().enumerate() {
            assert_eq!(bucket.index, i);
            assert_eq!(bucket.y, next_row);
            next_row += bucket.height;
        }
        assert_eq!(next_row, 33);
    }

    #[test]
    fn test_zero_band_rows_means_one() {
        assert_eq!(generate_buckets(4, 3, 0).len(), 3);
    }

    #[test]
    fn test_empty_image_has_no_buckets() {
        assert!(generate_buckets(4, 0, 8).is_empty());
    }

    #[test]
    fn test_bucket_pixels_row_major() {
        let bucket = Bucket::new(2, 3, 2, 0);
        let pixels: Vec<_> = bucket.pixels().collect();
        assert_eq!(pixels, vec![(0, 2), (1, 2), (2, 2), (0, 3), (1, 3), (2, 3)]);
    }
}
