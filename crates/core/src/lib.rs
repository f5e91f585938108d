//! # topowind core
//!
//! Core types and I/O for the topowind wind exposure preprocessor.
//!
//! This crate provides:
//! - `Raster`: georeferenced elevation grid
//! - `GeoTransform`: north-up affine transform and cell-center coordinates
//! - `Projection`: opaque projection identifier carried to outputs
//! - `PackagedStack`: direction × y × x result with coordinate metadata
//! - Raster I/O: GeoTIFF and ESRI ASCII DEM readers, stack writers
//! - The `Algorithm` trait shared by the wind exposure algorithms

pub mod error;
pub mod io;
pub mod projection;
pub mod raster;

pub use error::{try_filled_vec, Error, Result};
pub use projection::Projection;
pub use raster::{GeoTransform, PackagedStack, Raster};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::projection::Projection;
    pub use crate::raster::{GeoTransform, PackagedStack, Raster};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in topowind.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
