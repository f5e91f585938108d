//! Error types for topowind

use std::collections::TryReserveError;
use thiserror::Error;

/// Main error type for topowind operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// DEM not rectangular, non-positive spacing, non-finite elevations or
    /// impossible rotation/scan parameters.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Empty, out-of-range or duplicate azimuths, or an increment that does
    /// not divide 360.
    #[error("Invalid azimuths: {0}")]
    InvalidAzimuths(String),

    #[error("Stack shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Malformed raster container (bad header, truncated data, missing tags)
    #[error("Format error: {0}")]
    Format(String),

    #[error("netCDF error: {0}")]
    #[cfg(feature = "netcdf")]
    NetCdf(String),
}

#[cfg(feature = "netcdf")]
impl From<netcdf::Error> for Error {
    fn from(e: netcdf::Error) -> Self {
        Error::NetCdf(e.to_string())
    }
}

impl Error {
    /// Wrap a failed `try_reserve` for the named buffer.
    pub fn exhausted(what: &str, cells: usize, source: TryReserveError) -> Self {
        Error::ResourceExhausted(format!("cannot allocate {} ({} cells): {}", what, cells, source))
    }
}

/// Result type alias for topowind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a vector of `len` copies of `value`, reporting allocation failure
/// as [`Error::ResourceExhausted`] instead of aborting.
pub fn try_filled_vec<T: Clone>(what: &str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| Error::exhausted(what, len, e))?;
    buf.resize(len, value);
    Ok(buf)
}
