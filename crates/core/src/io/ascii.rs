//! ESRI ASCII grid (`.asc`) DEM reader
//!
//! Header keys are case-insensitive: `ncols`, `nrows`, `xllcorner` or
//! `xllcenter`, `yllcorner` or `yllcenter`, `cellsize` and an optional
//! `NODATA_value`. Values follow in row-major order starting at the
//! northernmost row.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    centered: bool,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

/// Read an ESRI ASCII grid from disk
pub fn read_ascii_grid<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_ascii_grid(&text)
}

/// Parse an ESRI ASCII grid held in memory
pub fn parse_ascii_grid(text: &str) -> Result<Raster> {
    let mut header = Header::default();
    let mut tokens = text.split_whitespace().peekable();

    // Header lines are key/value pairs; the first numeric token starts the data.
    while let Some(&token) = tokens.peek() {
        if token.parse::<f64>().is_ok() {
            break;
        }
        let key = token.to_ascii_lowercase();
        tokens.next();
        let value = tokens
            .next()
            .ok_or_else(|| Error::Format(format!("header key '{}' has no value", key)))?;

        match key.as_str() {
            "ncols" => header.ncols = Some(parse_usize(&key, value)?),
            "nrows" => header.nrows = Some(parse_usize(&key, value)?),
            "xllcorner" => header.xll = Some(parse_f64(&key, value)?),
            "yllcorner" => header.yll = Some(parse_f64(&key, value)?),
            "xllcenter" => {
                header.xll = Some(parse_f64(&key, value)?);
                header.centered = true;
            }
            "yllcenter" => {
                header.yll = Some(parse_f64(&key, value)?);
                header.centered = true;
            }
            "cellsize" => header.cellsize = Some(parse_f64(&key, value)?),
            "nodata_value" => header.nodata = Some(parse_f64(&key, value)?),
            _ => return Err(Error::Format(format!("unknown header key '{}'", token))),
        }
    }

    let cols = require(header.ncols, "ncols")?;
    let rows = require(header.nrows, "nrows")?;
    let cellsize = require(header.cellsize, "cellsize")?;
    let mut xll = require(header.xll, "xllcorner")?;
    let mut yll = require(header.yll, "yllcorner")?;
    if header.centered {
        xll -= cellsize / 2.0;
        yll -= cellsize / 2.0;
    }

    let expected = rows
        .checked_mul(cols)
        .ok_or_else(|| Error::Format(format!("{}x{} grid is too large", rows, cols)))?;
    let values = tokens
        .map(|t| parse_f64("value", t))
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != expected {
        return Err(Error::Format(format!(
            "expected {} values for a {}x{} grid, found {}",
            expected,
            rows,
            cols,
            values.len()
        )));
    }

    let mut raster = Raster::from_vec(values, rows, cols)?;
    raster.set_transform(GeoTransform::from_lower_left(xll, yll, cellsize, rows));
    raster.set_nodata(header.nodata);
    let masked = raster.mask_nodata();
    debug!(rows, cols, cellsize, masked, "parsed ASCII grid");
    Ok(raster)
}

fn require<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| Error::Format(format!("missing header key '{}'", key)))
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| Error::Format(format!("bad integer for '{}': {}", key, value)))
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| Error::Format(format!("bad number for '{}': {}", key, value)))
}
