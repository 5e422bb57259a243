//! Row-band geometry for splitting a raster across parallel workers.
//!
//! # Architecture
//!
//! A raster of height `h` split for `T` workers is divided into bands of
//! `ceil(h / T)` rows:
//! - Bands are disjoint and together cover every row exactly once
//! - Each band is read through a [`RowSlice`] that carries extra margin rows
//!   above and below so stencil filters see real neighbours at band edges
//! - Only the band's own rows are ever written back to the parent raster
//!
//! Margins come from a filter's [`SpatialExtent`]; a 3x3 stencil needs one
//! row on each side.

use crate::core::error::{EditorError, EditorResult};
use crate::core::raster::{Plane, Raster, CHANNELS};
use image::ImageBuffer;

/// A half-open range of rows `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    /// First row (inclusive)
    pub start: u32,
    /// Last row (exclusive)
    pub end: u32,
}

impl RowBand {
    /// Create a new band.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Number of rows in the band.
    pub fn height(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the band covers no rows.
    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Whether `row` lies inside the band.
    pub fn contains(&self, row: u32) -> bool {
        row >= self.start && row < self.end
    }

    /// Expand by `margin` rows on both sides, clamping to `[0, image_height)`.
    pub fn expand_with_margin(&self, margin: u32, image_height: u32) -> Self {
        Self {
            start: self.start.saturating_sub(margin),
            end: self.end.saturating_add(margin).min(image_height),
        }
    }
}

/// Rows a filter needs around each output pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpatialExtent {
    /// Pixels needed to the left.
    pub left: u32,
    /// Pixels needed to the right.
    pub right: u32,
    /// Pixels needed above.
    pub top: u32,
    /// Pixels needed below.
    pub bottom: u32,
}

impl SpatialExtent {
    /// Extent of a point operation.
    pub fn none() -> Self {
        Self::default()
    }

    /// Same extent on all sides.
    pub fn symmetric(radius: u32) -> Self {
        Self {
            left: radius,
            right: radius,
            top: radius,
            bottom: radius,
        }
    }

    /// Rows a row slice must carry on each side.
    pub fn vertical(&self) -> u32 {
        self.top.max(self.bottom)
    }

    /// Check if this filter requires any overlap.
    pub fn needs_overlap(&self) -> bool {
        self.left > 0 || self.right > 0 || self.top > 0 || self.bottom > 0
    }
}

/// Iterator over the bands of a raster split into `parts` workers.
///
/// Bands are `ceil(height / parts)` rows tall; the last one may be shorter.
/// When `parts` exceeds `height` the trailing empty bands are not produced.
#[derive(Debug, Clone)]
pub struct RowBands {
    height: u32,
    band_height: u32,
    next_start: u32,
}

impl RowBands {
    /// Split `height` rows among `parts` workers.
    pub fn new(height: u32, parts: usize) -> Self {
        let parts = parts.max(1) as u64;
        let band_height = (u64::from(height) + parts - 1) / parts;
        Self {
            height,
            band_height: band_height.max(1) as u32,
            next_start: 0,
        }
    }

    /// Rows per band (the last band may be shorter).
    pub fn band_height(&self) -> u32 {
        self.band_height
    }
}

impl Iterator for RowBands {
    type Item = RowBand;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start >= self.height {
            return None;
        }
        let start = self.next_start;
        let end = start.saturating_add(self.band_height).min(self.height);
        self.next_start = end;
        Some(RowBand::new(start, end))
    }
}

/// A margin-extended window of rows taken from a parent plane.
///
/// The window is a standalone [`Raster`] so any effect can run on it in
/// isolation. Row 0 of the window is parent row `window.start`.
#[derive(Debug, Clone)]
pub struct RowSlice {
    raster: Raster,
    window: RowBand,
    band: RowBand,
}

impl RowSlice {
    /// Copy `band` plus `margin` rows on each side out of `plane`.
    pub fn extract(plane: &Plane, band: RowBand, margin: u32) -> EditorResult<Self> {
        let (width, height) = plane.dimensions();
        if band.start > band.end || band.end > height {
            return Err(EditorError::Geometry(format!(
                "rows {}..{} out of bounds for height {}",
                band.start, band.end, height
            )));
        }

        let window = band.expand_with_margin(margin, height);
        let stride = width as usize * CHANNELS;
        let raw: &[u16] = plane;
        let rows = raw[window.start as usize * stride..window.end as usize * stride].to_vec();
        let window_plane: Plane = ImageBuffer::from_raw(width, window.height(), rows)
            .ok_or_else(|| EditorError::Geometry("row window size mismatch".to_string()))?;

        Ok(Self {
            raster: Raster::from_plane(window_plane),
            window,
            band,
        })
    }

    /// Parent rows this slice is authoritative for.
    pub fn band(&self) -> RowBand {
        self.band
    }

    /// Parent rows copied into the slice, margins included.
    pub fn window(&self) -> RowBand {
        self.window
    }

    /// The slice's own raster.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Mutable access for running an effect on the slice.
    pub fn raster_mut(&mut self) -> &mut Raster {
        &mut self.raster
    }

    /// Copy the authoritative rows of the slice's output plane into `rows`,
    /// which must hold exactly the band's rows of the parent output plane.
    pub fn write_band(&self, rows: &mut [u16]) -> EditorResult<()> {
        let stride = self.raster.row_stride();
        let offset = (self.band.start - self.window.start) as usize * stride;
        let len = self.band.height() as usize * stride;
        if rows.len() != len {
            return Err(EditorError::Geometry(format!(
                "band of {} subpixels cannot receive {} subpixels",
                rows.len(),
                len
            )));
        }
        let output: &[u16] = self.raster.output();
        rows.copy_from_slice(&output[offset..offset + len]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn numbered(width: u32, height: u32) -> Plane {
        ImageBuffer::from_fn(width, height, |x, y| Rgba([x as u16, y as u16, 0, 1]))
    }

    #[test]
    fn test_row_band() {
        let band = RowBand::new(10, 20);
        assert_eq!(band.height(), 10);
        assert!(band.contains(10));
        assert!(!band.contains(20));
        assert!(RowBand::new(4, 4).is_empty());
    }

    #[test]
    fn test_expand_with_margin() {
        let band = RowBand::new(10, 20);
        assert_eq!(band.expand_with_margin(5, 100), RowBand::new(5, 25));
        assert_eq!(band.expand_with_margin(15, 22), RowBand::new(0, 22));
    }

    #[test]
    fn test_bands_cover_every_row_once() {
        for height in [1u32, 2, 7, 10, 33] {
            for parts in [1usize, 2, 3, 5, 8, 40] {
                let bands: Vec<_> = RowBands::new(height, parts).collect();
                assert!(bands.len() <= parts);
                assert_eq!(bands[0].start, 0);
                assert_eq!(bands.last().unwrap().end, height);
                for pair in bands.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
                assert!(bands.iter().all(|b| !b.is_empty()));
            }
        }
    }

    #[test]
    fn test_band_height_is_ceiling() {
        let bands = RowBands::new(10, 3);
        assert_eq!(bands.band_height(), 4);
        let bands: Vec<_> = bands.collect();
        assert_eq!(
            bands,
            vec![RowBand::new(0, 4), RowBand::new(4, 8), RowBand::new(8, 10)]
        );
    }

    #[test]
    fn test_zero_height_has_no_bands() {
        assert_eq!(RowBands::new(0, 4).count(), 0);
    }

    #[test]
    fn test_spatial_extent() {
        assert!(!SpatialExtent::none().needs_overlap());
        let extent = SpatialExtent::symmetric(1);
        assert!(extent.needs_overlap());
        assert_eq!(extent.vertical(), 1);
    }

    #[test]
    fn test_extract_clamps_window() {
        let plane = numbered(3, 6);
        let slice = RowSlice::extract(&plane, RowBand::new(0, 2), 5).unwrap();
        assert_eq!(slice.window(), RowBand::new(0, 6));
        assert_eq!(slice.raster().height(), 6);

        let slice = RowSlice::extract(&plane, RowBand::new(3, 4), 1).unwrap();
        assert_eq!(slice.window(), RowBand::new(2, 5));
        assert_eq!(*slice.raster().input().get_pixel(1, 0), Rgba([1, 2, 0, 1]));
    }

    #[test]
    fn test_extract_out_of_bounds() {
        let plane = numbered(2, 4);
        assert!(RowSlice::extract(&plane, RowBand::new(2, 5), 1).is_err());
    }

    #[test]
    fn test_write_band_only_copies_authoritative_rows() {
        let plane = numbered(2, 8);
        let slice = RowSlice::extract(&plane, RowBand::new(3, 5), 2).unwrap();

        let mut rows = vec![0u16; 2 * 2 * CHANNELS];
        slice.write_band(&mut rows).unwrap();
        // First pixel of parent row 3, then first pixel of parent row 4.
        assert_eq!(&rows[0..4], &[0, 3, 0, 1]);
        assert_eq!(&rows[8..12], &[0, 4, 0, 1]);

        let mut wrong = vec![0u16; 3];
        assert!(slice.write_band(&mut wrong).is_err());
    }
}
