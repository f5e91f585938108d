//! Self-describing direction × y × x raster stack handed to writers

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::{Array3, ArrayView2, Axis};

/// A 3-D raster stack with the coordinate metadata a writer needs.
///
/// `data` has shape `(azimuths.len(), y_coords.len(), x_coords.len())`.
/// Values are degrees; azimuths are degrees clockwise from north.
#[derive(Debug, Clone)]
pub struct PackagedStack {
    pub data: Array3<f64>,
    pub azimuths: Vec<f64>,
    /// Easting of each column center
    pub x_coords: Vec<f64>,
    /// Northing of each row center
    pub y_coords: Vec<f64>,
    /// Opaque projection identifier passed through to the container
    pub projection: String,
    pub variable_name: String,
    /// Long name written as the variable description
    pub description: String,
    pub transform: GeoTransform,
}

impl PackagedStack {
    /// Shape as (directions, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// One direction slice
    pub fn slice(&self, k: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), k)
    }

    /// Check that the side arrays agree with the data shape.
    pub fn validate(&self) -> Result<()> {
        let (n_dir, rows, cols) = self.shape();
        let side = (self.azimuths.len(), self.y_coords.len(), self.x_coords.len());
        if side != (n_dir, rows, cols) {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", (n_dir, rows, cols)),
                actual: format!("{:?}", side),
            });
        }
        if self.variable_name.is_empty() {
            return Err(Error::InvalidParameter {
                name: "variable_name",
                value: String::new(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(n_dir: usize) -> PackagedStack {
        let gt = GeoTransform::new(0.0, 20.0, 10.0, -10.0);
        PackagedStack {
            data: Array3::zeros((n_dir, 2, 3)),
            azimuths: vec![0.0, 90.0],
            x_coords: gt.x_coords(3),
            y_coords: gt.y_coords(2),
            projection: "EPSG:32611".into(),
            variable_name: "maxus".into(),
            description: "Maximum upwind slope".into(),
            transform: gt,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(stack(2).validate().is_ok());
        assert_eq!(stack(2).slice(1).dim(), (2, 3));
    }

    #[test]
    fn test_validate_mismatch() {
        let err = stack(3).validate().unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }
}
