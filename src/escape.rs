// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time function.  Takes a point on the complex plane and
//! repeatedly squares it and adds the original point back in,
//! counting how many rounds it takes before the magnitude passes the
//! escape radius.  Points that never get there within the iteration
//! limit are taken to be members of the Mandelbrot set.
//!
//! Three shortcuts keep the expensive members cheap: a closed-form
//! test for the main cardioid and the period-2 bulb, period detection
//! for orbits that settle into a cycle, and folding the point onto
//! the upper half-plane, since the set is symmetric about the real
//! axis, so a [`SymmetryCache`] can serve the mirror image of a point
//! already computed.  The magnitude test compares squared magnitudes
//! and never takes a square root.
//!
//! [`SymmetryCache`]: ../symmetry/struct.SymmetryCache.html

use num::Complex;

use errors::{Error, Result};
use symmetry::SymmetryCache;

/// The period-detection anchor is refreshed after this many
/// iterations, which bounds the longest cycle that can be caught.
pub const PERIOD_CHECK_INTERVAL: usize = 20;

const D4: f64 = 1.0 / 4.0;
const D16: f64 = D4 / 4.0;

/// What one point of the complex plane did under iteration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IterationResult {
    /// The zero-based iteration at which the point escaped, or the
    /// iteration limit for members of the set.
    pub iterations: usize,
    /// True iff `iterations` reached the limit without escaping.
    pub in_set: bool,
    /// The last value of z.  For escaped points this is the first
    /// value whose magnitude reached the escape radius.
    pub final_z: Complex<f64>,
    /// The running derivative of z with respect to c, used for
    /// distance estimation.
    pub final_dz: Complex<f64>,
    /// Iterations actually run.  Below `iterations` when a shortcut
    /// settled membership early, and zero for the closed-form test.
    pub steps: usize,
}

impl IterationResult {
    fn inside(max_iterations: usize, z: Complex<f64>, dz: Complex<f64>, steps: usize) -> Self {
        IterationResult {
            iterations: max_iterations,
            in_set: true,
            final_z: z,
            final_dz: dz,
            steps,
        }
    }

    fn escaped(iterations: usize, z: Complex<f64>, dz: Complex<f64>) -> Self {
        IterationResult {
            iterations,
            in_set: false,
            final_z: z,
            final_dz: dz,
            steps: iterations + 1,
        }
    }
}

/// True if the point lies inside the main cardioid or the period-2
/// bulb, both of which are entirely inside the Mandelbrot set.  Unlike
/// a sampling heuristic this never claims a point that is outside.
#[inline]
pub fn in_main_body(point: Complex<f64>) -> bool {
    // Both regions lie well within radius 2; this also keeps infinities
    // and NaNs from satisfying the inequalities below.
    if !(point.norm_sqr() < 4.0) {
        return false;
    }
    let y = point.im * point.im;
    let q = (point.re - D4) * (point.re - D4) + y;
    q * (q + point.re - D4) <= y * D4 || (point.re + 1.0) * (point.re + 1.0) + y <= D16
}

/// Maps a point onto the upper half-plane.  The orbit of the conjugate
/// of c is the conjugate of the orbit of c, so both escape together.
#[inline]
pub fn fold(point: Complex<f64>) -> Complex<f64> {
    Complex::new(point.re, point.im.abs())
}

/// Holds the iteration limit and escape radius for a render pass.
#[derive(Copy, Clone, Debug)]
pub struct Evaluator {
    max_iterations: usize,
    escape_radius: f64,
    escape_radius_sqr: f64,
}

impl Evaluator {
    /// Rejects an iteration limit of zero and escape radii at or below
    /// one.  Radii below two are accepted, but a point can pass
    /// beyond such a radius and still be a member of the set, so the
    /// image is only an approximation; that gets a warning.
    pub fn new(max_iterations: usize, escape_radius: f64) -> Result<Self> {
        if max_iterations == 0 {
            return Err(Error::InvalidIterations);
        }
        if !(escape_radius > 1.0) || !escape_radius.is_finite() {
            return Err(Error::InvalidEscapeRadius(escape_radius));
        }
        if escape_radius < 2.0 {
            warn!(
                "Escape radius {} is below 2.0; some members of the set will be drawn as escaping",
                escape_radius
            );
        }
        Ok(Evaluator {
            max_iterations,
            escape_radius,
            escape_radius_sqr: escape_radius * escape_radius,
        })
    }

    /// The iteration limit.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// The escape radius.
    pub fn escape_radius(&self) -> f64 {
        self.escape_radius
    }

    /// Evaluates one point with every shortcut except the cache.
    pub fn evaluate(&self, point: Complex<f64>) -> IterationResult {
        self.evaluate_with(point, None)
    }

    /// Evaluates one point, consulting and filling the cache if one is
    /// given.  A point found in the cache is answered with the stored
    /// result verbatim.
    pub fn evaluate_with(
        &self,
        point: Complex<f64>,
        cache: Option<&mut SymmetryCache>,
    ) -> IterationResult {
        if in_main_body(point) {
            return IterationResult::inside(self.max_iterations, fold(point), Complex::new(0.0, 0.0), 0);
        }
        match cache {
            None => self.escape(fold(point), true),
            Some(cache) => {
                if let Some(found) = cache.get(&point) {
                    return found;
                }
                let result = self.escape(fold(point), true);
                cache.insert(&point, result)
            }
        }
    }

    /// Evaluates a run of points, typically one row of the image.
    pub fn evaluate_batch(&self, points: &[Complex<f64>]) -> Vec<IterationResult> {
        points.iter().map(|point| self.evaluate(*point)).collect()
    }

    /// Plain iteration of the point as given, with no bulb test, no
    /// folding and no period detection.  Slow, but it is the reference
    /// the shortcuts must agree with.
    pub fn iterate_direct(&self, point: Complex<f64>) -> IterationResult {
        self.escape(point, false)
    }

    fn escape(&self, c: Complex<f64>, period_checking: bool) -> IterationResult {
        let mut z: Complex<f64> = Complex::new(0.0, 0.0);
        let mut dz: Complex<f64> = Complex::new(1.0, 0.0);
        let mut anchor = z;
        let mut since_anchor = 0;

        for n in 0..self.max_iterations {
            dz = z * dz * 2.0 + 1.0;
            z = z * z + c;
            // Written so that an overflow to NaN also counts as escaping.
            if !(z.re * z.re + z.im * z.im < self.escape_radius_sqr) {
                return IterationResult::escaped(n, z, dz);
            }
            if period_checking {
                if z == anchor {
                    return IterationResult::inside(self.max_iterations, z, dz, n + 1);
                }
                since_anchor += 1;
                if since_anchor >= PERIOD_CHECK_INTERVAL {
                    since_anchor = 0;
                    anchor = z;
                }
            }
        }
        IterationResult::inside(self.max_iterations, z, dz, self.max_iterations)
    }
}
