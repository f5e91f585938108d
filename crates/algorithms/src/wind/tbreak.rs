//! Topographic break (tbreak)
//!
//! The difference between maxus over a long fetch and over a short one. A
//! large positive value marks a cell that is exposed locally but sheltered
//! by distant terrain.

use serde::{Deserialize, Serialize};
use topowind_core::{Error, Result};
use topowind_parallel::ProcessingMode;
use tracing::info;

use super::azimuth::AzimuthSet;
use super::elevation::ElevationGrid;
use super::maxus::{maxus, MaxusParams, MaxusStack};
use crate::cancel::CancellationToken;

/// Parameters for computing tbreak straight from a DEM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TbreakParams {
    pub azimuths: AzimuthSet,
    /// Long fetch in metres (default 500)
    pub global_radius: f64,
    /// Short fetch in metres (default 100); must be below `global_radius`
    pub local_radius: f64,
    pub height: f64,
    pub step: Option<f64>,
    #[serde(skip)]
    pub mode: ProcessingMode,
}

impl Default for TbreakParams {
    fn default() -> Self {
        Self {
            azimuths: AzimuthSet::default(),
            global_radius: 500.0,
            local_radius: 100.0,
            height: 3.0,
            step: None,
            mode: ProcessingMode::default(),
        }
    }
}

impl TbreakParams {
    fn maxus_params(&self, radius: f64) -> MaxusParams {
        MaxusParams {
            azimuths: self.azimuths.clone(),
            search_radius: Some(radius),
            height: self.height,
            step: self.step,
            mode: self.mode,
        }
    }
}

/// Both maxus stacks and the break derived from them
#[derive(Debug, Clone)]
pub struct TbreakOutput {
    pub global: MaxusStack,
    pub local: MaxusStack,
    pub tbreak: MaxusStack,
}

/// `global − local`, elementwise.
///
/// Fails with `ShapeMismatch` if the stacks differ in shape or azimuth order.
pub fn tbreak(global: &MaxusStack, local: &MaxusStack) -> Result<MaxusStack> {
    if global.shape() != local.shape() {
        return Err(Error::ShapeMismatch {
            expected: format!("{:?}", global.shape()),
            actual: format!("{:?}", local.shape()),
        });
    }
    if global.azimuths().degrees() != local.azimuths().degrees() {
        return Err(Error::ShapeMismatch {
            expected: format!("azimuths {:?}", global.azimuths().degrees()),
            actual: format!("azimuths {:?}", local.azimuths().degrees()),
        });
    }

    let data = global.data() - local.data();
    MaxusStack::new(data, global.azimuths().clone(), None)
}

/// Run maxus at both fetches and derive tbreak.
pub fn tbreak_from_dem(
    dem: &ElevationGrid,
    params: &TbreakParams,
    cancel: Option<&CancellationToken>,
) -> Result<TbreakOutput> {
    if !(params.local_radius > 0.0 && params.local_radius < params.global_radius) {
        return Err(Error::InvalidParameter {
            name: "local_radius",
            value: params.local_radius.to_string(),
            reason: format!(
                "must be positive and smaller than the global radius {}",
                params.global_radius
            ),
        });
    }

    info!(global = params.global_radius, local = params.local_radius, "computing tbreak");
    let global = maxus(dem, &params.maxus_params(params.global_radius), cancel)?;
    let local = maxus(dem, &params.maxus_params(params.local_radius), cancel)?;
    let tbreak = tbreak(&global, &local)?;

    Ok(TbreakOutput {
        global,
        local,
        tbreak,
    })
}
