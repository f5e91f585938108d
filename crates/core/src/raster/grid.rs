//! Main Raster type

use crate::error::{Error, Result};
use crate::projection::Projection;
use crate::raster::GeoTransform;
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D elevation raster.
///
/// Values are 64-bit floats in metres stored row-major `(row, col)`, row 0
/// being the northernmost row. Missing cells are NaN once read; the
/// file's no-data marker is kept for reporting.
///
/// # Example
///
/// ```ignore
/// use topowind_core::{GeoTransform, Raster};
///
/// let mut dem = Raster::filled(100, 100, 1500.0);
/// dem.set_transform(GeoTransform::new(500_000.0, 4_800_000.0, 30.0, -30.0));
/// dem.set(10, 20, 1512.5)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster {
    data: Array2<f64>,
    transform: GeoTransform,
    projection: Option<Projection>,
    nodata: Option<f64>,
}

impl Raster {
    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::InvalidGeometry(format!(
                "{} values cannot fill a {}x{} raster",
                data.len(),
                rows,
                cols
            )));
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::InvalidGeometry(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<f64>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            projection: None,
            nodata: None,
        }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data.get((row, col)).copied().ok_or_else(|| {
            Error::InvalidParameter {
                name: "index",
                value: format!("({}, {})", row, col),
                reason: format!("outside raster of size {:?}", self.shape()),
            }
        })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let shape = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::InvalidParameter {
                name: "index",
                value: format!("({}, {})", row, col),
                reason: format!("outside raster of size {:?}", shape),
            }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn set_projection(&mut self, projection: Option<Projection>) {
        self.projection = projection;
    }

    /// The no-data marker found in the source file, if any
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    /// Cell spacing `(dx, dy)` in metres
    pub fn spacing(&self) -> (f64, f64) {
        self.transform.spacing()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Replace every cell equal to the no-data marker with NaN.
    ///
    /// Returns the number of cells replaced.
    pub fn mask_nodata(&mut self) -> usize {
        let Some(nd) = self.nodata else {
            return 0;
        };
        let mut count = 0;
        for v in self.data.iter_mut() {
            if !v.is_nan() && (*v - nd).abs() <= f64::EPSILON * nd.abs().max(1.0) {
                *v = f64::NAN;
                count += 1;
            }
        }
        count
    }

    /// Basic statistics over finite cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &v in self.data.iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        if count == 0 {
            return RasterStatistics {
                min: None,
                max: None,
                mean: None,
                valid_count: 0,
                nodata_count: self.len(),
            };
        }

        RasterStatistics {
            min: Some(min),
            max: Some(max),
            mean: Some(sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster = Raster::filled(100, 200, 0.0);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster = Raster::filled(10, 10, 0.0);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
        assert!(raster.set(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_from_vec_wrong_length() {
        let err = Raster::from_vec(vec![0.0; 5], 2, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
        let err = Raster::from_vec(vec![0.0; 2], usize::MAX, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }

    #[test]
    fn test_mask_nodata() {
        let mut raster = Raster::from_vec(vec![1.0, -9999.0, 3.0, -9999.0], 2, 2).unwrap();
        raster.set_nodata(Some(-9999.0));
        assert_eq!(raster.mask_nodata(), 2);
        assert!(raster.get(0, 1).unwrap().is_nan());
        assert_eq!(raster.get(1, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_raster_statistics() {
        let mut raster = Raster::filled(10, 10, 0.0);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f64).unwrap();
            }
        }
        raster.set(0, 0, f64::NAN).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 99);
        assert_eq!(stats.nodata_count, 1);
    }
}
