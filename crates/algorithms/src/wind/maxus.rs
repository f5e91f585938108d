//! Maximum upwind slope (maxus)
//!
//! For every azimuth the DEM is rotated so the wind runs down the lattice
//! columns, each column is scanned for its upwind horizon, and the angles are
//! mapped back onto the DEM. Slice `k` of the result belongs to azimuth `k`
//! of the azimuth set.

use ndarray::{s, Array2, Array3, ArrayView2};
use serde::{Deserialize, Serialize};
use topowind_core::{try_filled_vec, Algorithm, Error, Result};
use topowind_parallel::ProcessingMode;
use tracing::{debug, info};

use super::azimuth::AzimuthSet;
use super::elevation::ElevationGrid;
use super::horizon::{scan_horizons, HorizonParams};
use super::rotate::rotate;
use crate::cancel::CancellationToken;

/// Parameters for the maxus computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxusParams {
    /// Wind directions (default every 5°)
    pub azimuths: AzimuthSet,
    /// Upwind search distance in metres (default 500, `None` = unlimited)
    pub search_radius: Option<f64>,
    /// Height above the subject cell in metres (default 3)
    pub height: f64,
    /// Lattice spacing after rotation in metres (default `min(dx, dy)`)
    pub step: Option<f64>,
    /// How azimuths are distributed over threads
    #[serde(skip)]
    pub mode: ProcessingMode,
}

impl Default for MaxusParams {
    fn default() -> Self {
        Self {
            azimuths: AzimuthSet::default(),
            search_radius: Some(500.0),
            height: 3.0,
            step: None,
            mode: ProcessingMode::default(),
        }
    }
}

impl MaxusParams {
    fn horizon(&self) -> HorizonParams {
        HorizonParams {
            search_radius: self.search_radius,
            height: self.height,
        }
    }
}

/// Slope angles in degrees, shaped `(azimuths, rows, cols)`
#[derive(Debug, Clone, PartialEq)]
pub struct MaxusStack {
    data: Array3<f64>,
    azimuths: AzimuthSet,
    search_radius: Option<f64>,
}

impl MaxusStack {
    /// Pair a data cube with its azimuths; axis 0 must match the set length.
    pub fn new(data: Array3<f64>, azimuths: AzimuthSet, search_radius: Option<f64>) -> Result<Self> {
        if data.dim().0 != azimuths.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} directions", azimuths.len()),
                actual: format!("{} slices", data.dim().0),
            });
        }
        Ok(Self {
            data,
            azimuths,
            search_radius,
        })
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    pub fn azimuths(&self) -> &AzimuthSet {
        &self.azimuths
    }

    /// Search radius the stack was computed with, if it came from a single scan
    pub fn search_radius(&self) -> Option<f64> {
        self.search_radius
    }

    /// Dimensions as (directions, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Slice for the `k`-th azimuth
    pub fn slice(&self, k: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![k, .., ..])
    }

    /// Slice for a given azimuth in degrees
    pub fn direction(&self, azimuth: f64) -> Option<ArrayView2<'_, f64>> {
        self.azimuths.position(azimuth).map(|k| self.slice(k))
    }
}

/// Maxus for a single azimuth, in the DEM's own frame.
pub fn maxus_direction(dem: &ElevationGrid, azimuth: f64, params: &MaxusParams) -> Result<Array2<f64>> {
    let grid = rotate(dem, azimuth, params.step)?;
    let angles = scan_horizons(&grid, &params.horizon())?;
    grid.unrotate(&angles)
}

/// Compute the maxus stack for every azimuth in `params.azimuths`.
///
/// Azimuths run in parallel according to `params.mode`; the cancellation
/// token is checked before each azimuth starts. Any failure, including
/// cancellation, discards all partial results.
pub fn maxus(
    dem: &ElevationGrid,
    params: &MaxusParams,
    cancel: Option<&CancellationToken>,
) -> Result<MaxusStack> {
    if !(params.height.is_finite() && params.height >= 0.0) {
        return Err(Error::InvalidParameter {
            name: "height",
            value: params.height.to_string(),
            reason: "must be a non-negative number of metres".into(),
        });
    }

    let cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);
    let (rows, cols) = dem.shape();
    let azimuths = params.azimuths.degrees();
    info!(
        rows,
        cols,
        directions = azimuths.len(),
        search_radius = ?params.search_radius,
        height = params.height,
        "computing maxus"
    );

    let plane = rows * cols;
    let cells = azimuths.len().checked_mul(plane).ok_or_else(|| {
        Error::ResourceExhausted(format!(
            "maxus stack {}x{}x{} overflows",
            azimuths.len(),
            rows,
            cols
        ))
    })?;
    // each direction writes straight into its own plane of the stack
    let mut flat = try_filled_vec("maxus stack", cells, f64::NAN)?;
    params.mode.try_par_chunks(&mut flat, plane, |k, out| {
        if cancelled() {
            return Err(Error::Cancelled);
        }
        let azimuth = azimuths[k];
        debug!(azimuth, "maxus direction started");
        let slice = maxus_direction(dem, azimuth, params)?;
        for (dst, &src) in out.iter_mut().zip(slice.iter()) {
            *dst = src;
        }
        debug!(azimuth, "maxus direction finished");
        Ok(())
    })?;

    if cancelled() {
        return Err(Error::Cancelled);
    }

    let data = Array3::from_shape_vec((azimuths.len(), rows, cols), flat).map_err(|e| {
        Error::ShapeMismatch {
            expected: format!("({}, {}, {})", azimuths.len(), rows, cols),
            actual: e.to_string(),
        }
    })?;
    MaxusStack::new(data, params.azimuths.clone(), params.search_radius)
}

/// Maxus as an [`Algorithm`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Maxus;

impl Algorithm for Maxus {
    type Input = ElevationGrid;
    type Output = MaxusStack;
    type Params = MaxusParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Maxus"
    }

    fn description(&self) -> &'static str {
        "Maximum upwind slope per cell and wind direction"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        maxus(&input, &params, None)
    }
}
