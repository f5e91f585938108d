//! Windowed upwind horizon search along wind-parallel profiles
//!
//! For every subject cell `c` of a profile the scanner finds the upwind cell
//! `p` in `[c − N, c − 1]` with the largest elevation angle
//!
//! ```text
//! angle = atan((z_p − (z_c + h)) / ((c − p)·s))
//! ```
//!
//! where `s` is the lattice step, `h` the subject height and `N = ceil(R / s)`
//! the window length for search radius `R`.
//!
//! The profile is split into blocks of `N` cells. The window of `c` is the
//! suffix of one block plus the prefix of the next, so each subject issues
//! two tangent queries: one against an upper hull grown left to right across
//! the current block, one against an upper hull grown right to left across
//! the previous block. Hull updates are amortized O(1) and tangent queries
//! are a binary search, giving O(L log N) per profile of length L.
//!
//! Ties between cells at the same angle go to the one nearer the subject.

use std::collections::VecDeque;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use topowind_core::{try_filled_vec, Error, Result};

use super::rotate::RotatedGrid;

/// Search parameters for one horizon scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonParams {
    /// Upwind search distance in metres (`None` = unlimited)
    pub search_radius: Option<f64>,
    /// Height added to the subject cell in metres (default 3)
    pub height: f64,
}

impl Default for HorizonParams {
    fn default() -> Self {
        Self {
            search_radius: Some(500.0),
            height: 3.0,
        }
    }
}

/// Window length in cells for a search radius on a lattice of spacing `step`.
///
/// An unlimited or infinite radius covers the whole profile.
pub fn window_cells(search_radius: Option<f64>, step: f64, profile_len: usize) -> Result<usize> {
    if !(step.is_finite() && step > 0.0) {
        return Err(Error::InvalidGeometry(format!(
            "lattice step must be positive and finite, got {}",
            step
        )));
    }
    let full = profile_len.max(1);
    let radius = match search_radius {
        None => return Ok(full),
        Some(r) if r == f64::INFINITY => return Ok(full),
        Some(r) => r,
    };
    if !(radius > 0.0) {
        return Err(Error::InvalidGeometry(format!(
            "search radius must be positive, got {}",
            radius
        )));
    }
    let cells = (radius / step - 1e-9).ceil();
    if cells < 1.0 {
        return Err(Error::InvalidGeometry(format!(
            "search radius {} covers no cells at step {}",
            radius, step
        )));
    }
    Ok(if cells >= full as f64 { full } else { cells as usize })
}

/// Maximum upwind angle (degrees) for every lattice cell.
///
/// Columns of the rotated grid are independent profiles with row 0 upwind.
/// Inactive cells are skipped as candidates and left NaN as subjects; NaN
/// also marks subjects with no active upwind cell in range.
pub fn scan_horizons(grid: &RotatedGrid, params: &HorizonParams) -> Result<Array2<f64>> {
    let (rows, cols) = grid.shape();
    let window = window_cells(params.search_radius, grid.step(), rows)?;
    let elevations = grid.elevations();

    let mut out = Array2::from_shape_vec(
        (rows, cols),
        try_filled_vec("horizon angles", rows * cols, f64::NAN)?,
    )
    .map_err(|e| Error::InvalidGeometry(e.to_string()))?;

    let mut profile = Vec::with_capacity(rows);
    let mut angles = vec![f64::NAN; rows];
    let mut hull = UpperHull::default();

    for q in 0..cols {
        profile.clear();
        profile.extend(elevations.column(q).iter().copied());
        scan_into(&profile, grid.step(), window, params.height, &mut angles, &mut hull);
        out.column_mut(q)
            .iter_mut()
            .zip(&angles)
            .for_each(|(o, &a)| *o = a);
    }

    Ok(out)
}

/// Maximum upwind angle for a single profile (index 0 upwind).
///
/// `window` is the number of upwind cells searched; NaN elevations are
/// inactive.
pub fn scan_profile(profile: &[f64], step: f64, window: usize, height: f64) -> Vec<f64> {
    let mut angles = vec![f64::NAN; profile.len()];
    let mut hull = UpperHull::default();
    scan_into(profile, step, window.max(1), height, &mut angles, &mut hull);
    angles
}

fn scan_into(
    profile: &[f64],
    step: f64,
    window: usize,
    height: f64,
    out: &mut [f64],
    hull: &mut UpperHull,
) {
    let len = profile.len();
    out.fill(f64::NAN);
    let vertex = |p: usize| Vertex {
        pos: p as f64 * step,
        z: profile[p],
    };

    // Prefix of the subject's own block, growing rightward
    hull.clear();
    for c in 1..len {
        let p = c - 1;
        if p % window == 0 {
            hull.clear();
        }
        if profile[p].is_finite() {
            hull.push_right(vertex(p));
        }
        if profile[c].is_finite() {
            if let Some(angle) = hull.max_angle(c as f64 * step, profile[c] + height) {
                out[c] = angle;
            }
        }
    }

    // Suffix of the previous block, growing leftward. Subject c = p + window
    // sees cells [p, block_end).
    let mut block_start = 0;
    while block_start + window < len {
        let block_end = block_start + window;
        hull.clear();
        for p in (block_start + 1..block_end).rev() {
            if profile[p].is_finite() {
                hull.push_left(vertex(p));
            }
            let c = p + window;
            if c >= len || !profile[c].is_finite() {
                continue;
            }
            if let Some(angle) = hull.max_angle(c as f64 * step, profile[c] + height) {
                // strictly greater: equal angles keep the nearer prefix cell
                if out[c].is_nan() || angle > out[c] {
                    out[c] = angle;
                }
            }
        }
        block_start = block_end;
    }
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    pos: f64,
    z: f64,
}

/// z-component of (b − a) × (c − a); positive when c lies above line ab
#[inline]
fn cross(a: Vertex, b: Vertex, c: Vertex) -> f64 {
    (b.pos - a.pos) * (c.z - a.z) - (b.z - a.z) * (c.pos - a.pos)
}

/// Upper convex hull with vertices in ascending position
#[derive(Debug, Default)]
struct UpperHull {
    vertices: VecDeque<Vertex>,
}

impl UpperHull {
    fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Append a vertex to the right of all current ones
    fn push_right(&mut self, v: Vertex) {
        while self.vertices.len() >= 2 {
            let n = self.vertices.len();
            if cross(self.vertices[n - 2], self.vertices[n - 1], v) >= 0.0 {
                self.vertices.pop_back();
            } else {
                break;
            }
        }
        self.vertices.push_back(v);
    }

    /// Prepend a vertex to the left of all current ones
    fn push_left(&mut self, v: Vertex) {
        while self.vertices.len() >= 2 {
            if cross(v, self.vertices[0], self.vertices[1]) >= 0.0 {
                self.vertices.pop_front();
            } else {
                break;
            }
        }
        self.vertices.push_front(v);
    }

    /// Largest elevation angle (degrees) from a viewpoint right of the hull.
    ///
    /// Along the hull the angle rises then falls, so the tangent vertex is the
    /// first `k` whose successor is strictly lower. The comparison is done on
    /// cross products to stay exact for equal angles.
    fn max_angle(&self, view_pos: f64, view_z: f64) -> Option<f64> {
        let n = self.vertices.len();
        if n == 0 {
            return None;
        }
        let rises = |k: usize| {
            let (a, b) = (self.vertices[k], self.vertices[k + 1]);
            (b.z - view_z) * (view_pos - a.pos) >= (a.z - view_z) * (view_pos - b.pos)
        };
        let (mut lo, mut hi) = (0, n - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if rises(mid) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let v = self.vertices[lo];
        Some(((v.z - view_z) / (view_pos - v.pos)).atan().to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Direct O(L·N) search used as the reference
    fn brute_force(profile: &[f64], step: f64, window: usize, height: f64) -> Vec<f64> {
        (0..profile.len())
            .map(|c| {
                if !profile[c].is_finite() {
                    return f64::NAN;
                }
                let zv = profile[c] + height;
                let mut best = f64::NAN;
                for p in c.saturating_sub(window)..c {
                    if !profile[p].is_finite() {
                        continue;
                    }
                    let angle = ((profile[p] - zv) / ((c - p) as f64 * step)).atan().to_degrees();
                    if best.is_nan() || angle > best {
                        best = angle;
                    }
                }
                best
            })
            .collect()
    }

    fn assert_same(fast: &[f64], slow: &[f64]) {
        assert_eq!(fast.len(), slow.len());
        for (c, (&f, &s)) in fast.iter().zip(slow).enumerate() {
            if s.is_nan() {
                assert!(f.is_nan(), "cell {}: expected NaN, got {}", c, f);
            } else {
                assert_relative_eq!(f, s, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_flat_profile() {
        let profile = vec![100.0; 12];
        let angles = scan_profile(&profile, 100.0, 5, 3.0);
        assert!(angles[0].is_nan());
        // farthest cell in range gives the shallowest depression
        for c in 5..12 {
            assert_relative_eq!(angles[c], (-3.0f64 / 500.0).atan().to_degrees(), epsilon = 1e-12);
        }
        assert_relative_eq!(angles[2], (-3.0f64 / 200.0).atan().to_degrees(), epsilon = 1e-12);
    }

    #[test]
    fn test_single_obstruction() {
        let mut profile = vec![0.0; 10];
        profile[2] = 50.0;
        let angles = scan_profile(&profile, 10.0, 10, 2.0);
        assert_relative_eq!(angles[6], (48.0f64 / 40.0).atan().to_degrees(), epsilon = 1e-12);
        // outside a short window the obstruction is invisible
        let short = scan_profile(&profile, 10.0, 3, 2.0);
        assert_relative_eq!(short[6], (-2.0f64 / 30.0).atan().to_degrees(), epsilon = 1e-12);
    }

    #[test]
    fn test_inactive_cells_skipped() {
        let profile = vec![f64::NAN, 10.0, f64::NAN, 0.0, f64::NAN];
        let angles = scan_profile(&profile, 1.0, 4, 0.0);
        assert!(angles[0].is_nan());
        assert!(angles[1].is_nan());
        assert!(angles[2].is_nan());
        assert_relative_eq!(angles[3], (10.0f64 / 2.0).atan().to_degrees(), epsilon = 1e-12);
        assert!(angles[4].is_nan());
    }

    #[test]
    fn test_matches_brute_force_random() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.random_range(1..60);
            let window = rng.random_range(1..=len + 3);
            let step = rng.random_range(0.5..50.0);
            let height = rng.random_range(0.0..10.0);
            let profile: Vec<f64> = (0..len)
                .map(|_| {
                    if rng.random_range(0..10) == 0 {
                        f64::NAN
                    } else {
                        rng.random_range(-100.0..400.0)
                    }
                })
                .collect();
            let fast = scan_profile(&profile, step, window, height);
            let slow = brute_force(&profile, step, window, height);
            assert_same(&fast, &slow);
        }
    }

    #[test]
    fn test_equal_angles_keep_nearer() {
        // cells 0 and 2 sit on one ray from the subject at 4
        let profile = vec![20.0, 0.0, 10.0, 0.0, 0.0];
        let angles = scan_profile(&profile, 1.0, 4, 0.0);
        assert_relative_eq!(angles[4], (10.0f64 / 2.0).atan().to_degrees(), epsilon = 1e-12);
    }

    #[test]
    fn test_window_cells() {
        assert_eq!(window_cells(Some(500.0), 100.0, 50).unwrap(), 5);
        assert_eq!(window_cells(Some(450.0), 100.0, 50).unwrap(), 5);
        assert_eq!(window_cells(Some(500.0), 100.0, 3).unwrap(), 3);
        assert_eq!(window_cells(None, 100.0, 7).unwrap(), 7);
        assert_eq!(window_cells(Some(f64::INFINITY), 1.0, 9).unwrap(), 9);
        assert!(window_cells(Some(0.0), 1.0, 9).is_err());
        assert!(window_cells(Some(f64::NAN), 1.0, 9).is_err());
        assert!(window_cells(Some(1.0), 0.0, 9).is_err());
        assert!(window_cells(Some(1.0), -1.0, 9).is_err());
    }
}
