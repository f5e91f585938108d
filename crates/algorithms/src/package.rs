//! Attach coordinate metadata to result stacks and hand them to a writer

use std::path::Path;

use topowind_core::io::StackWriter;
use topowind_core::{GeoTransform, PackagedStack, Projection, Raster, Result};
use tracing::info;

use crate::wind::MaxusStack;

/// Georeferencing shared by every stack computed from one DEM
#[derive(Debug, Clone, PartialEq)]
pub struct GridMetadata {
    pub transform: GeoTransform,
    pub projection: Projection,
}

impl GridMetadata {
    pub fn new(transform: GeoTransform, projection: Projection) -> Self {
        Self {
            transform,
            projection,
        }
    }

    /// Metadata of the DEM the stacks were computed from
    pub fn from_raster(dem: &Raster) -> Self {
        Self {
            transform: *dem.transform(),
            projection: dem.projection().cloned().unwrap_or_default(),
        }
    }
}

/// Long name stored with a variable
fn describe(variable_name: &str) -> String {
    if variable_name.starts_with("maxus") {
        "Maximum upwind slope".into()
    } else if variable_name.starts_with("tbreak") {
        "Topographic break".into()
    } else {
        variable_name.to_string()
    }
}

/// Builds [`PackagedStack`]s and publishes them through an injected writer.
pub struct Packager<W: StackWriter> {
    writer: W,
}

impl<W: StackWriter> Packager<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Pair `stack` with coordinates and names. Performs no I/O.
    pub fn package(
        &self,
        stack: &MaxusStack,
        meta: &GridMetadata,
        variable_name: &str,
    ) -> Result<PackagedStack> {
        let (_, rows, cols) = stack.shape();
        let packaged = PackagedStack {
            data: stack.data().clone(),
            azimuths: stack.azimuths().degrees().to_vec(),
            x_coords: meta.transform.x_coords(cols),
            y_coords: meta.transform.y_coords(rows),
            projection: meta.projection.as_str().to_string(),
            variable_name: variable_name.to_string(),
            description: describe(variable_name),
            transform: meta.transform,
        };
        packaged.validate()?;
        Ok(packaged)
    }

    /// Hand a packaged stack to the writer.
    pub fn publish(&self, packaged: &PackagedStack, path: &Path) -> Result<()> {
        let (n_dir, rows, cols) = packaged.shape();
        self.writer.write(packaged, path)?;
        info!(
            variable = %packaged.variable_name,
            format = self.writer.format_name(),
            path = %path.display(),
            directions = n_dir,
            rows,
            cols,
            "stack written"
        );
        Ok(())
    }
}
