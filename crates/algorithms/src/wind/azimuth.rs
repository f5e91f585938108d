//! Azimuth discretization
//!
//! Azimuths are degrees clockwise from north and name the direction the wind
//! blows *from*.

use serde::{Deserialize, Serialize};
use topowind_core::{Error, Result};

const TOLERANCE: f64 = 1e-9;

/// Ordered, validated set of azimuths in `[0, 360)`.
///
/// The order is significant: slice `k` of every stack built from this set
/// belongs to `degrees()[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct AzimuthSet {
    degrees: Vec<f64>,
}

impl AzimuthSet {
    /// `0, increment, 2·increment, …, 360 − increment`.
    ///
    /// The increment must be a positive divisor of 360.
    pub fn from_increment(increment: u32) -> Result<Self> {
        if increment == 0 || 360 % increment != 0 {
            return Err(Error::InvalidAzimuths(format!(
                "increment {} must be a positive divisor of 360",
                increment
            )));
        }
        Ok(Self {
            degrees: (0..360 / increment).map(|k| (k * increment) as f64).collect(),
        })
    }

    /// Use an explicit list of azimuths, in the given order.
    pub fn from_degrees(degrees: Vec<f64>) -> Result<Self> {
        if degrees.is_empty() {
            return Err(Error::InvalidAzimuths("azimuth set is empty".into()));
        }
        if let Some(bad) = degrees
            .iter()
            .find(|a| !a.is_finite() || **a < 0.0 || **a >= 360.0)
        {
            return Err(Error::InvalidAzimuths(format!(
                "azimuth {} is outside [0, 360)",
                bad
            )));
        }

        let mut sorted = degrees.clone();
        sorted.sort_by(f64::total_cmp);
        if let Some(pair) = sorted.windows(2).find(|w| w[1] - w[0] < TOLERANCE) {
            return Err(Error::InvalidAzimuths(format!(
                "duplicate azimuth {}",
                pair[0]
            )));
        }
        // 359.9999999999 and 0 name the same direction
        if sorted.len() > 1 && sorted[0] + 360.0 - sorted[sorted.len() - 1] < TOLERANCE {
            return Err(Error::InvalidAzimuths(format!(
                "duplicate azimuth {} (wraps to {})",
                sorted[sorted.len() - 1],
                sorted[0]
            )));
        }

        Ok(Self { degrees })
    }

    pub fn degrees(&self) -> &[f64] {
        &self.degrees
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.degrees.iter().copied()
    }

    /// Index of the azimuth equal to `azimuth` (after wrapping into `[0, 360)`)
    pub fn position(&self, azimuth: f64) -> Option<usize> {
        let target = azimuth.rem_euclid(360.0);
        self.degrees.iter().position(|&a| {
            let diff = (a - target).abs();
            diff < TOLERANCE || (360.0 - diff).abs() < TOLERANCE
        })
    }

    /// The common spacing if the set covers the full circle in equal steps
    /// (in any order), `None` otherwise.
    pub fn increment(&self) -> Option<f64> {
        let inc = 360.0 / self.degrees.len() as f64;
        let base = self.degrees[0];
        let even = self.degrees.iter().all(|&a| {
            let steps = (a - base).rem_euclid(360.0) / inc;
            (steps - steps.round()).abs() < 1e-6
        });
        even.then_some(inc)
    }
}

impl Default for AzimuthSet {
    /// Every 5 degrees
    fn default() -> Self {
        Self {
            degrees: (0..72).map(|k| k as f64 * 5.0).collect(),
        }
    }
}

impl TryFrom<Vec<f64>> for AzimuthSet {
    type Error = Error;

    fn try_from(degrees: Vec<f64>) -> Result<Self> {
        Self::from_degrees(degrees)
    }
}

impl From<AzimuthSet> for Vec<f64> {
    fn from(set: AzimuthSet) -> Self {
        set.degrees
    }
}
