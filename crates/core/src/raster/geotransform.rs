//! Affine geotransformation for north-up rasters

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing a north-up raster.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up grids: row 0 is the northernmost
/// row and column 0 the westernmost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (east-west cell size, metres)
    pub pixel_width: f64,
    /// Pixel height (north-south cell size, usually negative)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a new north-up GeoTransform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Build from a lower-left corner as used by ESRI ASCII grids.
    pub fn from_lower_left(xll: f64, yll: f64, cell_size: f64, rows: usize) -> Self {
        Self::new(xll, yll + rows as f64 * cell_size, cell_size, -cell_size)
    }

    /// Convert pixel coordinates to map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Convert map coordinates to fractional pixel coordinates (col, row)
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width.abs() < 1e-12 || self.pixel_height.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Cell spacing `(dx, dy)` in map units, both reported as magnitudes
    pub fn spacing(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    /// Check if this is a north-up grid with positive spacing
    pub fn is_north_up(&self) -> bool {
        self.pixel_width > 0.0 && self.pixel_height < 0.0
    }

    /// Easting of every column center
    pub fn x_coords(&self, cols: usize) -> Vec<f64> {
        (0..cols)
            .map(|col| self.origin_x + (col as f64 + 0.5) * self.pixel_width)
            .collect()
    }

    /// Northing of every row center
    pub fn y_coords(&self, rows: usize) -> Vec<f64> {
        (0..rows)
            .map(|row| self.origin_y + (row as f64 + 0.5) * self.pixel_height)
            .collect()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` for a raster of the given size
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + cols as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + rows as f64 * self.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);

        let (x, y) = gt.pixel_to_geo(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);

        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_coords_are_cell_centers() {
        let gt = GeoTransform::new(500_000.0, 4_800_000.0, 30.0, -50.0);
        assert_eq!(gt.x_coords(3), vec![500_015.0, 500_045.0, 500_075.0]);
        assert_eq!(gt.y_coords(2), vec![4_799_975.0, 4_799_925.0]);
        assert_eq!(gt.spacing(), (30.0, 50.0));
    }

    #[test]
    fn test_lower_left() {
        let gt = GeoTransform::from_lower_left(0.0, 0.0, 10.0, 5);
        assert_relative_eq!(gt.origin_y, 50.0);
        assert!(gt.is_north_up());

        let (min_x, min_y, max_x, max_y) = gt.bounds(4, 5);
        assert_relative_eq!(min_x, 0.0);
        assert_relative_eq!(min_y, 0.0);
        assert_relative_eq!(max_x, 40.0);
        assert_relative_eq!(max_y, 50.0);
    }
}
