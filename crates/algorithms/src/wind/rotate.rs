//! Wind-aligned resampling of the elevation grid
//!
//! The grid is resampled onto a lattice whose rows run downwind: row 0 is the
//! most upwind row and every column is a straight wind-parallel profile.
//! Cells are addressed in local metric coordinates with the origin at the
//! north-west corner of the grid, x east and y north:
//!
//! ```text
//! source (i, j) centre  = ((j + 0.5)·dx, −(i + 0.5)·dy)
//! downwind unit vector  = (−sin θ, −cos θ)
//! across-wind vector    = ( cos θ, −sin θ)
//! ```
//!
//! Each lattice cell samples the source cell containing its centre (nearest
//! neighbour). Lattice cells outside the source extent are inactive.

use ndarray::{Array2, ArrayView2};
use topowind_core::{try_filled_vec, Error, Result};
use tracing::debug;

use super::elevation::ElevationGrid;

/// Source index of inactive lattice cells
const INACTIVE: usize = usize::MAX;

/// Absorbs round-off when the extent is an exact multiple of the step
const EXTENT_EPSILON: f64 = 1e-9;

/// Elevations resampled along one azimuth, with the mapping back to the source.
#[derive(Debug, Clone)]
pub struct RotatedGrid {
    azimuth: f64,
    step: f64,
    elevations: Array2<f64>,
    sources: Array2<usize>,
    source_shape: (usize, usize),
    spacing: (f64, f64),
}

/// Resample `dem` so that rows run downwind for wind blowing from `azimuth`.
///
/// `step` is the lattice spacing in metres along both axes; `None` uses
/// `min(dx, dy)`.
pub fn rotate(dem: &ElevationGrid, azimuth: f64, step: Option<f64>) -> Result<RotatedGrid> {
    if !azimuth.is_finite() {
        return Err(Error::InvalidGeometry(format!("azimuth {} is not finite", azimuth)));
    }
    let step = step.unwrap_or_else(|| dem.dx().min(dem.dy()));
    if !(step.is_finite() && step > 0.0) {
        return Err(Error::InvalidGeometry(format!(
            "resampling step must be positive and finite, got {}",
            step
        )));
    }

    let (src_rows, src_cols) = dem.shape();
    let (dx, dy) = (dem.dx(), dem.dy());
    let (sin, cos) = unit_components(azimuth);

    let width = src_cols as f64 * dx;
    let height = src_rows as f64 * dy;
    let corners = [(0.0, 0.0), (width, 0.0), (0.0, -height), (width, -height)];

    let mut along = (f64::INFINITY, f64::NEG_INFINITY);
    let mut across = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let a = -sin * x - cos * y;
        let b = cos * x - sin * y;
        along = (along.0.min(a), along.1.max(a));
        across = (across.0.min(b), across.1.max(b));
    }

    let rows = lattice_len(along.1 - along.0, step);
    let cols = lattice_len(across.1 - across.0, step);
    let cells = rows.checked_mul(cols).ok_or_else(|| {
        Error::ResourceExhausted(format!("rotated lattice {}x{} overflows", rows, cols))
    })?;

    let mut elevations = try_filled_vec("rotated elevations", cells, f64::NAN)?;
    let mut sources = try_filled_vec("rotation map", cells, INACTIVE)?;

    for r in 0..rows {
        let a = along.0 + (r as f64 + 0.5) * step;
        for q in 0..cols {
            let b = across.0 + (q as f64 + 0.5) * step;
            let x = -a * sin + b * cos;
            let y = -a * cos - b * sin;

            let j = (x / dx).floor();
            let i = (-y / dy).floor();
            if i < 0.0 || j < 0.0 || i >= src_rows as f64 || j >= src_cols as f64 {
                continue;
            }
            let (i, j) = (i as usize, j as usize);
            let k = r * cols + q;
            elevations[k] = dem.get(i, j);
            sources[k] = i * src_cols + j;
        }
    }

    let elevations = Array2::from_shape_vec((rows, cols), elevations)
        .map_err(|e| Error::InvalidGeometry(e.to_string()))?;
    let sources = Array2::from_shape_vec((rows, cols), sources)
        .map_err(|e| Error::InvalidGeometry(e.to_string()))?;

    Ok(RotatedGrid {
        azimuth,
        step,
        elevations,
        sources,
        source_shape: (src_rows, src_cols),
        spacing: (dx, dy),
    })
}

/// sin/cos of an azimuth, exact at multiples of 90°
fn unit_components(azimuth: f64) -> (f64, f64) {
    let (sin, cos) = azimuth.to_radians().sin_cos();
    (snap(sin), snap(cos))
}

fn snap(v: f64) -> f64 {
    if v.abs() < 1e-12 {
        0.0
    } else if (v.abs() - 1.0).abs() < 1e-12 {
        v.signum()
    } else {
        v
    }
}

fn lattice_len(extent: f64, step: f64) -> usize {
    ((extent / step - EXTENT_EPSILON).ceil() as usize).max(1)
}

impl RotatedGrid {
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Lattice spacing in metres
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Lattice dimensions as (rows, cols); rows run downwind
    pub fn shape(&self) -> (usize, usize) {
        self.elevations.dim()
    }

    /// Resampled elevations; inactive cells hold NaN
    pub fn elevations(&self) -> ArrayView2<'_, f64> {
        self.elevations.view()
    }

    /// Elevation of lattice cell (row, col); NaN when inactive
    #[inline]
    pub fn elevation(&self, row: usize, col: usize) -> f64 {
        self.elevations[(row, col)]
    }

    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.sources[(row, col)] != INACTIVE
    }

    /// Source cell sampled by lattice cell (row, col), if active
    pub fn source(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        match self.sources[(row, col)] {
            INACTIVE => None,
            k => Some((k / self.source_shape.1, k % self.source_shape.1)),
        }
    }

    pub fn active_count(&self) -> usize {
        self.sources.iter().filter(|&&k| k != INACTIVE).count()
    }

    /// Map per-lattice-cell values back onto the source grid.
    ///
    /// Several lattice cells sampling one source cell reduce with `max`
    /// (NaN ignored). Source cells sampled by no lattice cell take the value
    /// of the nearest sampled cell. Cells still without a value (no upwind
    /// terrain at all) become 0.
    pub fn unrotate(&self, values: &Array2<f64>) -> Result<Array2<f64>> {
        if values.dim() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", self.shape()),
                actual: format!("{:?}", values.dim()),
            });
        }

        let (rows, cols) = self.source_shape;
        let mut out = try_filled_vec("unrotated values", rows * cols, f64::NAN)?;
        let mut mapped = try_filled_vec("coverage mask", rows * cols, false)?;

        for (&k, &v) in self.sources.iter().zip(values.iter()) {
            if k == INACTIVE {
                continue;
            }
            mapped[k] = true;
            if !v.is_nan() && (out[k].is_nan() || v > out[k]) {
                out[k] = v;
            }
        }

        let fills: Vec<(usize, f64)> = (0..rows * cols)
            .filter(|&k| !mapped[k])
            .filter_map(|k| self.nearest_mapped(&mapped, k).map(|n| (k, out[n])))
            .collect();
        if !fills.is_empty() {
            debug!(
                azimuth = self.azimuth,
                cells = fills.len(),
                "filled unsampled cells from nearest neighbour"
            );
        }
        for (k, v) in fills {
            out[k] = v;
        }

        for v in out.iter_mut().filter(|v| v.is_nan()) {
            *v = 0.0;
        }

        Array2::from_shape_vec((rows, cols), out).map_err(|e| Error::InvalidGeometry(e.to_string()))
    }

    /// Nearest sampled source cell by metric distance.
    ///
    /// Rings are searched outward in row-major order; the first cell found at
    /// the smallest distance wins.
    fn nearest_mapped(&self, mapped: &[bool], k: usize) -> Option<usize> {
        let (rows, cols) = self.source_shape;
        let (dx, dy) = self.spacing;
        let (i, j) = ((k / cols) as isize, (k % cols) as isize);
        let min_spacing = dx.min(dy);

        let mut best: Option<(f64, usize)> = None;
        for ring in 1..=rows.max(cols) as isize {
            if let Some((d, _)) = best {
                if ring as f64 * min_spacing >= d {
                    break;
                }
            }
            for di in -ring..=ring {
                for dj in -ring..=ring {
                    if di.abs() != ring && dj.abs() != ring {
                        continue;
                    }
                    let (ni, nj) = (i + di, j + dj);
                    if ni < 0 || nj < 0 || ni >= rows as isize || nj >= cols as isize {
                        continue;
                    }
                    let n = ni as usize * cols + nj as usize;
                    if !mapped[n] {
                        continue;
                    }
                    let d = (di as f64 * dy).hypot(dj as f64 * dx);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, n));
                    }
                }
            }
        }
        best.map(|(_, n)| n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(rows: usize, cols: usize) -> ElevationGrid {
        let data = Array2::from_shape_fn((rows, cols), |(i, j)| (i * cols + j) as f64);
        ElevationGrid::new(data, 10.0, 10.0).unwrap()
    }

    #[test]
    fn test_north_is_identity() {
        let dem = ramp(4, 6);
        let grid = rotate(&dem, 0.0, None).unwrap();
        assert_eq!(grid.shape(), (4, 6));
        for i in 0..4 {
            for j in 0..6 {
                assert_eq!(grid.source(i, j), Some((i, j)));
                assert_eq!(grid.elevations()[(i, j)], dem.get(i, j));
            }
        }
    }

    #[test]
    fn test_south_flips_both_axes() {
        let dem = ramp(4, 6);
        let grid = rotate(&dem, 180.0, None).unwrap();
        assert_eq!(grid.shape(), (4, 6));
        assert_eq!(grid.source(0, 0), Some((3, 5)));
        assert_eq!(grid.source(3, 5), Some((0, 0)));
    }

    #[test]
    fn test_east_wind_starts_at_east_edge() {
        let dem = ramp(4, 6);
        let grid = rotate(&dem, 90.0, None).unwrap();
        // rows walk westward, columns walk southward
        assert_eq!(grid.shape(), (6, 4));
        assert_eq!(grid.source(0, 0), Some((0, 5)));
        assert_eq!(grid.source(5, 3), Some((3, 0)));
    }

    #[test]
    fn test_diagonal_has_inactive_corners() {
        let dem = ramp(10, 10);
        let grid = rotate(&dem, 45.0, None).unwrap();
        let (rows, cols) = grid.shape();
        assert!(rows >= 14 && cols >= 14);
        assert!(!grid.is_active(0, 0));
        assert!(grid.elevations()[(0, 0)].is_nan());
        assert!(grid.active_count() > 0);
    }

    #[test]
    fn test_unrotate_identity() {
        let dem = ramp(3, 3);
        let grid = rotate(&dem, 0.0, None).unwrap();
        let values = grid.elevations().to_owned();
        let back = grid.unrotate(&values).unwrap();
        assert_eq!(back, dem.view());
    }

    #[test]
    fn test_unrotate_covers_every_cell() {
        let dem = ramp(20, 15);
        for azimuth in [17.0, 45.0, 123.0, 301.5] {
            let grid = rotate(&dem, azimuth, None).unwrap();
            let values = Array2::from_elem(grid.shape(), 1.5);
            let back = grid.unrotate(&values).unwrap();
            assert_eq!(back.dim(), (20, 15));
            assert!(back.iter().all(|&v| v == 1.5), "azimuth {}", azimuth);
        }
    }

    #[test]
    fn test_unrotate_nan_becomes_zero() {
        let dem = ramp(2, 2);
        let grid = rotate(&dem, 0.0, None).unwrap();
        let mut values = Array2::from_elem((2, 2), 4.0);
        values[(0, 1)] = f64::NAN;
        let back = grid.unrotate(&values).unwrap();
        assert_relative_eq!(back[(0, 1)], 0.0);
        assert_relative_eq!(back[(1, 1)], 4.0);
    }

    #[test]
    fn test_unrotate_shape_mismatch() {
        let grid = rotate(&ramp(2, 2), 0.0, None).unwrap();
        let err = grid.unrotate(&Array2::zeros((3, 2))).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_bad_step() {
        let dem = ramp(2, 2);
        assert!(rotate(&dem, 0.0, Some(0.0)).is_err());
        assert!(rotate(&dem, 0.0, Some(f64::NAN)).is_err());
        assert!(rotate(&dem, f64::INFINITY, None).is_err());
    }

    #[test]
    fn test_coarser_step_shrinks_lattice() {
        let dem = ramp(10, 10);
        let grid = rotate(&dem, 0.0, Some(20.0)).unwrap();
        assert_eq!(grid.shape(), (5, 5));
        assert_eq!(grid.source(1, 1), Some((3, 3)));
    }
}
