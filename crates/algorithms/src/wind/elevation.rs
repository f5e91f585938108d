//! Validated elevation grid consumed by the wind exposure core

use ndarray::{Array2, ArrayView2};
use topowind_core::{Error, Raster, Result};

/// Rectangular grid of finite elevations (metres) with positive cell
/// spacings. Row 0 is the northernmost row, column 0 the westernmost.
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    data: Array2<f64>,
    dx: f64,
    dy: f64,
}

impl ElevationGrid {
    /// Validate and wrap an elevation array.
    ///
    /// Fails with `InvalidGeometry` on an empty array, non-positive or
    /// non-finite spacing, or any non-finite elevation.
    pub fn new(data: Array2<f64>, dx: f64, dy: f64) -> Result<Self> {
        if !(dx.is_finite() && dx > 0.0) || !(dy.is_finite() && dy > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "cell spacing must be positive and finite, got dx = {}, dy = {}",
                dx, dy
            )));
        }
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidGeometry(format!(
                "elevation grid is empty ({}x{})",
                rows, cols
            )));
        }
        if let Some(((row, col), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "non-finite elevation {} at ({}, {}); resolve missing data before computing exposure",
                v, row, col
            )));
        }
        Ok(Self { data, dx, dy })
    }

    /// Build from nested rows, rejecting ragged input.
    pub fn from_rows(rows: &[Vec<f64>], dx: f64, dy: f64) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(Error::InvalidGeometry(format!(
                "grid is not rectangular: row {} has {} columns, expected {}",
                i,
                row.len(),
                cols
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), cols), flat)
            .map_err(|e| Error::InvalidGeometry(e.to_string()))?;
        Self::new(data, dx, dy)
    }

    /// Take elevations and spacing from a north-up raster.
    pub fn from_raster(dem: &Raster) -> Result<Self> {
        if !dem.transform().is_north_up() {
            return Err(Error::InvalidGeometry(format!(
                "DEM must be north-up with positive pixel width, got {:?}",
                dem.transform()
            )));
        }
        let (dx, dy) = dem.spacing();
        Self::new(dem.data().clone(), dx, dy)
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// East-west spacing (metres)
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// North-south spacing (metres)
    pub fn dy(&self) -> f64 {
        self.dy
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}
