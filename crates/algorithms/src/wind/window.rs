//! Directional windowing of a stack
//!
//! Each output slice is the mean of the input slices whose azimuths fall in
//! `[d − width/2, d + width/2]`, wrapping through north. The width need not
//! be a multiple of the azimuth increment.

use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use topowind_core::{Error, Result};
use tracing::debug;

use super::azimuth::AzimuthSet;
use super::maxus::MaxusStack;

/// Parameters for [`window`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowParams {
    /// Full angular width in degrees (default 100)
    pub width: f64,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self { width: 100.0 }
    }
}

impl WindowParams {
    fn invalid(&self, reason: String) -> Error {
        Error::InvalidParameter {
            name: "width",
            value: self.width.to_string(),
            reason,
        }
    }

    /// Number of neighbours taken on each side of a direction for stacks
    /// built on `azimuths`.
    ///
    /// Fails when the width is outside `[0, 360)` or the azimuths do not
    /// cover the circle in equal steps.
    pub fn half_steps(&self, azimuths: &AzimuthSet) -> Result<usize> {
        let width = self.width;
        if !(width.is_finite() && (0.0..360.0).contains(&width)) {
            return Err(self.invalid("must be in [0, 360) degrees".into()));
        }
        let increment = azimuths.increment().ok_or_else(|| {
            self.invalid("azimuths are not evenly spaced around the circle".into())
        })?;
        // tolerance keeps 100/20 from landing just under 2.5
        Ok((width / 2.0 / increment + 1e-9).floor() as usize)
    }
}

/// Average every direction of `stack` over the directions within
/// `width / 2` of it on either side.
///
/// The stack azimuths must cover the circle in equal steps and `width` must
/// lie in `[0, 360)`. A width smaller than twice the increment returns the
/// stack unchanged.
pub fn window(stack: &MaxusStack, params: &WindowParams) -> Result<MaxusStack> {
    let azimuths = stack.azimuths();
    let half = params.half_steps(azimuths)? as i64;
    let n = azimuths.len() as i64;

    // evenly spaced sets may be stored in any order; walk them by angle
    let mut order: Vec<usize> = (0..azimuths.len()).collect();
    order.sort_by(|&a, &b| azimuths.degrees()[a].total_cmp(&azimuths.degrees()[b]));

    let (_, rows, cols) = stack.shape();
    let mut out = Array3::<f64>::zeros((azimuths.len(), rows, cols));

    for (pos, &k) in order.iter().enumerate() {
        let members = (2 * half + 1) as f64;
        let mut target = out.index_axis_mut(Axis(0), k);
        for m in -half..=half {
            let idx = order[(pos as i64 + m).rem_euclid(n) as usize];
            target += &stack.slice(idx);
        }
        target /= members;
        debug!(azimuth = azimuths.degrees()[k], members, "windowed direction");
    }

    MaxusStack::new(out, azimuths.clone(), stack.search_radius())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_stack(increment: u32) -> MaxusStack {
        let set = AzimuthSet::from_increment(increment).unwrap();
        let n = set.len();
        let data = Array3::from_shape_fn((n, 2, 2), |(k, _, _)| k as f64);
        MaxusStack::new(data, set, Some(500.0)).unwrap()
    }

    #[test]
    fn test_zero_width_is_identity() {
        let stack = ramp_stack(90);
        let out = window(&stack, &WindowParams { width: 0.0 }).unwrap();
        assert_eq!(out, stack);
    }

    #[test]
    fn test_wraps_through_north() {
        // slices 0..4 at 0, 90, 180, 270
        let stack = ramp_stack(90);
        let out = window(&stack, &WindowParams { width: 180.0 }).unwrap();
        // 0° averages 270°, 0°, 90°
        assert_relative_eq!(out.slice(0)[(0, 0)], (3.0 + 0.0 + 1.0) / 3.0);
        assert_relative_eq!(out.slice(2)[(1, 1)], (1.0 + 2.0 + 3.0) / 3.0);
        assert_eq!(out.azimuths(), stack.azimuths());
    }

    #[test]
    fn test_default_width_on_five_degrees() {
        let stack = ramp_stack(5);
        let out = window(&stack, &WindowParams::default()).unwrap();
        // 50° either side of 90° is slices 8..=28
        let expected = (8..=28).sum::<usize>() as f64 / 21.0;
        assert_relative_eq!(out.slice(18)[(0, 1)], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_width_not_a_multiple_of_increment() {
        // 20° steps, 100° window: directions within ±50° are 0, ±20, ±40
        let stack = ramp_stack(20);
        let out = window(&stack, &WindowParams::default()).unwrap();
        let expected = (16.0 + 17.0 + 0.0 + 1.0 + 2.0) / 5.0;
        assert_relative_eq!(out.slice(0)[(0, 0)], expected, epsilon = 1e-12);
        assert_relative_eq!(out.slice(9)[(1, 0)], 9.0, epsilon = 1e-12);

        for increment in [15, 40, 45, 60, 90] {
            let stack = ramp_stack(increment);
            assert!(
                window(&stack, &WindowParams::default()).is_ok(),
                "increment {} should accept a 100 degree window",
                increment
            );
        }
    }

    #[test]
    fn test_narrow_window_is_identity() {
        let stack = ramp_stack(90);
        let out = window(&stack, &WindowParams { width: 90.0 }).unwrap();
        assert_eq!(out, stack);
    }

    #[test]
    fn test_shuffled_azimuths() {
        let set = AzimuthSet::from_degrees(vec![180.0, 0.0, 270.0, 90.0]).unwrap();
        let data = Array3::from_shape_fn((4, 1, 1), |(k, _, _)| [2.0, 0.0, 3.0, 1.0][k]);
        let stack = MaxusStack::new(data, set, None).unwrap();
        let out = window(&stack, &WindowParams { width: 180.0 }).unwrap();
        // slice 1 is 0°, averaged with 270° and 90°
        assert_relative_eq!(out.slice(1)[(0, 0)], (3.0 + 0.0 + 1.0) / 3.0);
        assert_eq!(out.azimuths(), stack.azimuths());
    }

    #[test]
    fn test_rejects_bad_width() {
        let stack = ramp_stack(90);
        for width in [-10.0, 360.0, 400.0, f64::NAN, f64::INFINITY] {
            assert!(
                window(&stack, &WindowParams { width }).is_err(),
                "width {} should be rejected",
                width
            );
        }
    }

    #[test]
    fn test_rejects_uneven_azimuths() {
        let set = AzimuthSet::from_degrees(vec![0.0, 10.0, 180.0]).unwrap();
        let stack = MaxusStack::new(Array3::zeros((3, 1, 1)), set, None).unwrap();
        assert!(window(&stack, &WindowParams { width: 20.0 }).is_err());
    }
}
