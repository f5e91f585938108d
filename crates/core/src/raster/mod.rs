//! Raster data structures

mod geotransform;
mod grid;
mod stack;

pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use stack::PackagedStack;
