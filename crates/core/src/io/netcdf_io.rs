//! netCDF stack writer (feature `netcdf`)
//!
//! Layout:
//! - dimensions `direction`, `y`, `x`
//! - coordinate variables `direction` (degrees from north), `y`, `x` (metres)
//! - the data variable on `(direction, y, x)` as 32-bit float
//! - global attributes `projection` and `history`

use crate::error::Result;
use crate::io::StackWriter;
use crate::raster::PackagedStack;
use std::path::Path;

/// [`StackWriter`] producing netCDF-4 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfStackWriter;

impl StackWriter for NetCdfStackWriter {
    fn format_name(&self) -> &'static str {
        "netCDF"
    }

    fn write(&self, stack: &PackagedStack, path: &Path) -> Result<()> {
        write_stack_netcdf(stack, path)
    }
}

/// Write a direction stack as netCDF.
pub fn write_stack_netcdf(stack: &PackagedStack, path: &Path) -> Result<()> {
    stack.validate()?;
    let (n_dir, rows, cols) = stack.shape();

    let mut file = netcdf::create(path)?;
    file.add_dimension("direction", n_dir)?;
    file.add_dimension("y", rows)?;
    file.add_dimension("x", cols)?;

    file.add_attribute("projection", stack.projection.as_str())?;
    file.add_attribute(
        "history",
        format!("created by topowind {}", env!("CARGO_PKG_VERSION")).as_str(),
    )?;

    {
        let mut var = file.add_variable::<f64>("direction", &["direction"])?;
        var.put_attribute("units", "degrees")?;
        var.put_attribute("description", "Wind direction from North")?;
        var.put_values(&stack.azimuths, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>("y", &["y"])?;
        var.put_attribute("units", "meters")?;
        var.put_attribute("description", "north south")?;
        var.put_values(&stack.y_coords, ..)?;
    }

    {
        let mut var = file.add_variable::<f64>("x", &["x"])?;
        var.put_attribute("units", "meters")?;
        var.put_attribute("description", "east west")?;
        var.put_values(&stack.x_coords, ..)?;
    }

    {
        let values: Vec<f32> = stack.data.iter().map(|&v| v as f32).collect();
        let mut var = file.add_variable::<f32>(&stack.variable_name, &["direction", "y", "x"])?;
        var.put_attribute("units", "degrees")?;
        var.put_attribute("description", stack.description.as_str())?;
        var.put_values(&values, ..)?;
    }

    Ok(())
}
