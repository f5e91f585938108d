//! # topowind algorithms
//!
//! Wind exposure preprocessing over digital elevation models.
//!
//! ## Modules
//!
//! - **wind**: azimuth sets, wind-aligned rotation, horizon scan, maxus,
//!   tbreak and directional windowing
//! - **package**: coordinate metadata and output through a `StackWriter`
//! - **cancel**: cooperative cancellation between azimuths

pub mod cancel;
pub mod package;
pub mod wind;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::package::{GridMetadata, Packager};
    pub use crate::wind::{
        maxus, rotate, scan_horizons, tbreak, tbreak_from_dem, window, AzimuthSet,
        ElevationGrid, HorizonParams, Maxus, MaxusParams, MaxusStack, TbreakOutput,
        TbreakParams, WindowParams,
    };
    pub use topowind_core::prelude::*;
    pub use topowind_parallel::ProcessingMode;
}
