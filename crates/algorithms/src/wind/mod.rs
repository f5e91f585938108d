//! Wind exposure from terrain
//!
//! - Azimuths: ordered wind directions
//! - Rotate: wind-aligned resampling of the DEM and its inverse
//! - Horizon: windowed upwind horizon scan along profiles
//! - Maxus: maximum upwind slope per direction
//! - Tbreak: long-fetch minus short-fetch maxus
//! - Window: directional averaging of a stack

mod azimuth;
mod elevation;
mod horizon;
mod maxus;
mod rotate;
mod tbreak;
mod window;

pub use azimuth::AzimuthSet;
pub use elevation::ElevationGrid;
pub use horizon::{scan_horizons, scan_profile, window_cells, HorizonParams};
pub use maxus::{maxus, maxus_direction, Maxus, MaxusParams, MaxusStack};
pub use rotate::{rotate, RotatedGrid};
pub use tbreak::{tbreak, tbreak_from_dem, TbreakOutput, TbreakParams};
pub use window::{window, WindowParams};
