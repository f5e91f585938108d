//! Projection identifiers
//!
//! The preprocessor never reprojects; it only carries the identifier from the
//! input DEM to the output container, where the writer stores it verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque projection identifier (EPSG code, PROJ string or WKT).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projection(String);

impl Projection {
    /// Wrap any identifier string, trimming surrounding whitespace
    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into().trim().to_string())
    }

    /// `EPSG:<code>`
    pub fn from_epsg(code: u32) -> Self {
        Self(format!("EPSG:{}", code))
    }

    /// Identifier used when the input carries no projection
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    /// EPSG code if the identifier has the `EPSG:<code>` form
    pub fn epsg(&self) -> Option<u32> {
        let (authority, code) = self.0.split_once(':')?;
        if authority.eq_ignore_ascii_case("epsg") {
            code.trim().parse().ok()
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_empty() || self.0 == "unknown"
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::unknown()
    }
}
