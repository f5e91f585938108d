//! I/O adapters at the edges of the preprocessor
//!
//! DEM readers produce a [`Raster`]; result stacks leave through a
//! [`StackWriter`], which the packager receives as an explicit dependency.

mod ascii;
mod native;
#[cfg(feature = "netcdf")]
mod netcdf_io;

pub use ascii::{parse_ascii_grid, read_ascii_grid};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_stack_geotiff, write_geotiff,
    write_stack_geotiff, GeoTiffStackWriter,
};
#[cfg(feature = "netcdf")]
pub use netcdf_io::{write_stack_netcdf, NetCdfStackWriter};

use crate::error::{Error, Result};
use crate::raster::{PackagedStack, Raster};
use std::path::Path;

/// Sink for packaged direction stacks.
pub trait StackWriter: Send + Sync {
    /// Short format name for log messages
    fn format_name(&self) -> &'static str;

    /// Persist the stack at `path`
    fn write(&self, stack: &PackagedStack, path: &Path) -> Result<()>;
}

impl<W: StackWriter + ?Sized> StackWriter for Box<W> {
    fn format_name(&self) -> &'static str {
        (**self).format_name()
    }

    fn write(&self, stack: &PackagedStack, path: &Path) -> Result<()> {
        (**self).write(stack, path)
    }
}

/// Raster container formats recognised from file extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    GeoTiff,
    AsciiGrid,
    NetCdf,
}

impl RasterFormat {
    /// Guess the format from the path extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tif" | "tiff" => Some(RasterFormat::GeoTiff),
            "asc" => Some(RasterFormat::AsciiGrid),
            "nc" | "nc4" => Some(RasterFormat::NetCdf),
            _ => None,
        }
    }
}

/// Read a DEM, choosing the reader from the file extension.
pub fn read_dem<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    match RasterFormat::from_path(path) {
        Some(RasterFormat::GeoTiff) => read_geotiff(path),
        Some(RasterFormat::AsciiGrid) => read_ascii_grid(path),
        _ => Err(Error::UnsupportedDataType(format!(
            "cannot read DEM '{}': expected .tif, .tiff or .asc",
            path.display()
        ))),
    }
}

/// Pick a stack writer for the output path.
///
/// `.nc` requires the `netcdf` feature; `.tif`/`.tiff` always works.
pub fn stack_writer_for(path: &Path) -> Result<Box<dyn StackWriter>> {
    match RasterFormat::from_path(path) {
        Some(RasterFormat::GeoTiff) => Ok(Box::new(GeoTiffStackWriter)),
        #[cfg(feature = "netcdf")]
        Some(RasterFormat::NetCdf) => Ok(Box::new(NetCdfStackWriter)),
        #[cfg(not(feature = "netcdf"))]
        Some(RasterFormat::NetCdf) => Err(Error::UnsupportedDataType(
            "netCDF output requires the `netcdf` feature".into(),
        )),
        _ => Err(Error::UnsupportedDataType(format!(
            "cannot write stack '{}': expected .nc, .tif or .tiff",
            path.display()
        ))),
    }
}
