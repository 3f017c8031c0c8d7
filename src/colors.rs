// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns an iteration result into a color.
//!
//! The "discrete" value of an escaped point is the iteration at which
//! it escaped, which produces visible bands.  The "smooth" value folds
//! in how far past the escape radius the point landed:
//!
//! ```text
//! X = n + 1 - log2(ln |z|) + log2(ln R)
//! ```
//!
//! and is then fed through the same scheme.  Members of the set always
//! get the scheme's fixed in-set color.

use std::fs;
use std::path::Path;

use errors::{Error, Result};
use escape::{Evaluator, IterationResult};

/// An 8-bit RGB triple.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Black.
    pub const BLACK: Rgb = Rgb([0, 0, 0]);
    /// White.
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    /// Red; used for the quadtree overlay.
    pub const RED: Rgb = Rgb([255, 0, 0]);
}

#[inline]
fn channel(x: f64) -> u8 {
    num::clamp((x * 255.0).round(), 0.0, 255.0) as u8
}

/// Converts hue, saturation and value, each in `[0, 1]`, to RGB.  A
/// hue of 1.0 wraps around to red.
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Rgb {
    let h6 = hue.fract() * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));
    let (r, g, b) = match sector as u32 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    Rgb([channel(r), channel(g), channel(b)])
}

/// The continuous dwell of an escaped point, or None if it is not a
/// finite number.  That happens for members of the set, and whenever
/// `ln |z|` or `ln R` is not positive.
pub fn continuous_dwell(result: &IterationResult, escape_radius: f64) -> Option<f64> {
    if result.in_set {
        return None;
    }
    // ln|z| = ln(|z|^2) / 2, which saves the square root.
    let ln_z = 0.5 * result.final_z.norm_sqr().ln();
    let dwell = (result.iterations as f64) + 1.0 - ln_z.log2() + escape_radius.ln().log2();
    if dwell.is_finite() {
        Some(dwell)
    } else {
        None
    }
}

/// An ordered table of colors, interpolated linearly.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap {
    colors: Vec<Rgb>,
}

const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

const MAGMA: [[u8; 3]; 5] = [
    [0, 0, 4],
    [81, 18, 124],
    [183, 55, 121],
    [252, 137, 97],
    [252, 253, 191],
];

const FIRE: [[u8; 3]; 4] = [[0, 0, 0], [255, 0, 0], [255, 255, 0], [255, 255, 255]];

const OCEAN: [[u8; 3]; 4] = [[0, 0, 0], [0, 0, 255], [0, 255, 255], [255, 255, 255]];

const GRAY: [[u8; 3]; 2] = [[0, 0, 0], [255, 255, 255]];

/// Names accepted by `Colormap::builtin`.
pub const BUILTIN_COLORMAPS: [&str; 5] = ["viridis", "magma", "fire", "ocean", "gray"];

impl Colormap {
    /// A table needs at least two colors.
    pub fn new(colors: Vec<Rgb>) -> Result<Colormap> {
        if colors.len() < 2 {
            return Err(Error::ColormapTooShort(colors.len()));
        }
        Ok(Colormap { colors })
    }

    /// One of the palettes that ship with the renderer.
    pub fn builtin(name: &str) -> Result<Colormap> {
        let table: &[[u8; 3]] = match name {
            "viridis" => &VIRIDIS,
            "magma" => &MAGMA,
            "fire" => &FIRE,
            "ocean" => &OCEAN,
            "gray" => &GRAY,
            _ => return Err(Error::UnknownColormap(name.to_string())),
        };
        Colormap::new(table.iter().map(|c| Rgb(*c)).collect())
    }

    /// Parses a colormap file: one `r g b` triple per line, each an
    /// integer from 0 to 255, separated by whitespace.  Blank lines
    /// are skipped.
    pub fn parse(text: &str) -> Result<Colormap> {
        let mut colors = vec![];
        for (index, line) in text.lines().enumerate() {
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.is_empty() {
                continue;
            }
            let malformed = |reason: String| Error::MalformedColormap {
                line: index + 1,
                reason,
            };
            if values.len() != 3 {
                return Err(malformed(format!(
                    "expected 3 values, found {}",
                    values.len()
                )));
            }
            let mut rgb = [0u8; 3];
            for (slot, value) in rgb.iter_mut().zip(values.iter()) {
                let parsed: i64 = value
                    .parse()
                    .map_err(|_| malformed(format!("\"{}\" is not an integer", value)))?;
                if parsed < 0 || parsed > 255 {
                    return Err(malformed(format!("{} is not between 0 and 255", parsed)));
                }
                *slot = parsed as u8;
            }
            colors.push(Rgb(rgb));
        }
        Colormap::new(colors)
    }

    /// Reads and parses a colormap file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Colormap> {
        let text = fs::read_to_string(path)?;
        Colormap::parse(&text)
    }

    /// Number of colors in the table.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Never true for a constructed colormap.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The color at position `t` of the table, `t` clamped to `[0, 1]`.
    pub fn sample(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { num::clamp(t, 0.0, 1.0) };
        let pos = t * ((self.colors.len() - 1) as f64);
        let i = (pos.floor() as usize).min(self.colors.len() - 2);
        let f = pos - (i as f64);
        let (Rgb(a), Rgb(b)) = (self.colors[i], self.colors[i + 1]);
        let mut out = [0u8; 3];
        for k in 0..3 {
            let mixed = f64::from(a[k]) + (f64::from(b[k]) - f64::from(a[k])) * f;
            out[k] = num::clamp(mixed.round(), 0.0, 255.0) as u8;
        }
        Rgb(out)
    }
}

/// The four ways of coloring a point.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorScheme {
    /// Gray level from the square root of the normalized dwell.
    Grayscale,
    /// Hue sweep at full saturation and value.
    Hsv,
    /// Hue and saturation from the log of the dwell, with the parity of
    /// the dwell, the half-plane of the final z and a distance estimate
    /// stitched in.
    Quilt,
    /// Normalized dwell looked up in a color table.
    Colormap(Colormap),
}

impl ColorScheme {
    /// The scheme numbered as on the command line: 0 grayscale, 1 HSV,
    /// 2 quilt, 3 colormap.  The colormap scheme needs a table.
    pub fn from_index(index: u8, colormap: Option<Colormap>) -> Result<ColorScheme> {
        match index {
            0 => Ok(ColorScheme::Grayscale),
            1 => Ok(ColorScheme::Hsv),
            2 => Ok(ColorScheme::Quilt),
            3 => colormap.map(ColorScheme::Colormap).ok_or(Error::MissingColormap),
            _ => Err(Error::UnknownColorScheme(index)),
        }
    }

    /// The inverse of `from_index`.
    pub fn index(&self) -> u8 {
        match *self {
            ColorScheme::Grayscale => 0,
            ColorScheme::Hsv => 1,
            ColorScheme::Quilt => 2,
            ColorScheme::Colormap(_) => 3,
        }
    }

    /// The color every member of the set gets.
    pub fn in_set_color(&self) -> Rgb {
        match *self {
            ColorScheme::Grayscale => Rgb::WHITE,
            _ => Rgb::BLACK,
        }
    }
}

/// A color scheme bound to the parameters of a render pass.
#[derive(Clone, Debug)]
pub struct Coloring {
    scheme: ColorScheme,
    max_iterations: usize,
    escape_radius: f64,
    smooth: bool,
}

impl Coloring {
    /// Takes the iteration limit and escape radius from the evaluator
    /// whose results will be colored.
    pub fn new(scheme: ColorScheme, evaluator: &Evaluator, smooth: bool) -> Self {
        Coloring {
            scheme,
            max_iterations: evaluator.max_iterations(),
            escape_radius: evaluator.escape_radius(),
            smooth,
        }
    }

    /// The color of a member of the set.
    pub fn in_set_color(&self) -> Rgb {
        self.scheme.in_set_color()
    }

    /// The value a scheme colors by: the dwell, smoothed if asked
    /// for.  A smooth value that cannot be computed falls back to the
    /// discrete dwell.
    fn dwell(&self, result: &IterationResult) -> f64 {
        let discrete = result.iterations as f64;
        if !self.smooth {
            return discrete;
        }
        match continuous_dwell(result, self.escape_radius) {
            Some(x) => num::clamp(x, 0.0, self.max_iterations as f64),
            None => discrete,
        }
    }

    /// Colors one evaluated point.
    pub fn paint(&self, result: &IterationResult) -> Rgb {
        if result.in_set {
            return self.in_set_color();
        }
        let max = self.max_iterations as f64;
        let dwell = self.dwell(result);
        match self.scheme {
            ColorScheme::Grayscale => {
                let s = (dwell / max).sqrt();
                let level = channel(s);
                Rgb([level, level, level])
            }
            ColorScheme::Hsv => {
                let hue = ((dwell / max * 255.0).powi(2)).round() % 255.0;
                hsv_to_rgb(hue / 255.0, 1.0, 1.0)
            }
            ColorScheme::Quilt => self.quilt(result, dwell),
            ColorScheme::Colormap(ref table) => table.sample(dwell / max),
        }
    }

    fn quilt(&self, result: &IterationResult, dwell: f64) -> Rgb {
        let z = result.final_z;
        let n = result.iterations;
        let fin_angle = z.im.atan2(z.re);
        let fin_radius = dwell - (n as f64);

        let z2 = z.norm_sqr();
        let distance = z2.ln() * (z2 / result.final_dz.norm_sqr()).sqrt();
        let dscale = (distance / 0.00001).ln();
        let mut value = if dscale > 0.0 {
            1.0
        } else if dscale > -8.0 {
            (8.0 + dscale) / 8.0
        } else {
            0.0
        };

        let mut p = ((n + 1) as f64).ln() / 100_000f64.ln();
        let mut angle;
        if p < 0.5 {
            p = 1.0 - 1.5 * p;
            angle = 1.0 - p;
        } else {
            p = 1.5 * p - 0.5;
            angle = p;
        }
        let mut radius = p.sqrt();

        if (n + 1) % 2 == 0 {
            value *= 0.85;
            radius *= 0.667;
        }
        if fin_angle < 0.0 {
            angle += 0.02;
        }
        angle += 0.0001 * fin_radius;

        let hue = angle * 10.0;
        hsv_to_rgb(hue - hue.floor(), radius - radius.floor(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::Complex;

    fn escaped(iterations: usize, z: Complex<f64>, dz: Complex<f64>) -> IterationResult {
        IterationResult {
            iterations,
            in_set: false,
            final_z: z,
            final_dz: dz,
            steps: iterations + 1,
        }
    }

    fn inside(max: usize) -> IterationResult {
        IterationResult {
            iterations: max,
            in_set: true,
            final_z: Complex::new(0.1, 0.1),
            final_dz: Complex::new(0.0, 0.0),
            steps: max,
        }
    }

    fn coloring(scheme: ColorScheme, smooth: bool) -> Coloring {
        Coloring::new(scheme, &Evaluator::new(100, 2.0).unwrap(), smooth)
    }

    #[test]
    fn hsv_primary_colors() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Rgb([255, 0, 0]));
        assert_eq!(hsv_to_rgb(0.5, 1.0, 1.0), Rgb([0, 255, 255]));
        assert_eq!(hsv_to_rgb(1.0, 1.0, 1.0), Rgb([255, 0, 0]));
        assert_eq!(hsv_to_rgb(0.7, 0.0, 1.0), Rgb::WHITE);
        assert_eq!(hsv_to_rgb(0.2, 1.0, 0.0), Rgb::BLACK);
    }

    #[test]
    fn dwell_at_the_radius_is_one_past_the_count() {
        let r = escaped(5, Complex::new(2.0, 0.0), Complex::new(1.0, 0.0));
        let x = continuous_dwell(&r, 2.0).unwrap();
        assert!((x - 6.0).abs() < 1e-9, "{}", x);
    }

    #[test]
    fn dwell_shrinks_the_farther_out_a_point_lands() {
        let near = escaped(5, Complex::new(2.1, 0.0), Complex::new(1.0, 0.0));
        let far = escaped(5, Complex::new(3.5, 0.0), Complex::new(1.0, 0.0));
        assert!(continuous_dwell(&near, 2.0).unwrap() > continuous_dwell(&far, 2.0).unwrap());
    }

    #[test]
    fn dwell_is_undefined_for_members_and_tiny_radii() {
        assert_eq!(continuous_dwell(&inside(100), 2.0), None);
        let r = escaped(5, Complex::new(2.0, 0.0), Complex::new(1.0, 0.0));
        assert_eq!(continuous_dwell(&r, 1.0), None);
        assert_eq!(continuous_dwell(&r, 0.5), None);
    }

    #[test]
    fn members_get_the_sentinel_color() {
        assert_eq!(coloring(ColorScheme::Grayscale, false).paint(&inside(100)), Rgb::WHITE);
        assert_eq!(coloring(ColorScheme::Grayscale, true).paint(&inside(100)), Rgb::WHITE);
        assert_eq!(coloring(ColorScheme::Hsv, true).paint(&inside(100)), Rgb::BLACK);
        assert_eq!(coloring(ColorScheme::Quilt, true).paint(&inside(100)), Rgb::BLACK);
        let table = Colormap::builtin("viridis").unwrap();
        assert_eq!(coloring(ColorScheme::Colormap(table), false).paint(&inside(100)), Rgb::BLACK);
    }

    #[test]
    fn grayscale_discrete_levels() {
        let c = coloring(ColorScheme::Grayscale, false);
        let z = Complex::new(3.0, 0.0);
        let dz = Complex::new(1.0, 0.0);
        assert_eq!(c.paint(&escaped(0, z, dz)), Rgb::BLACK);
        assert_eq!(c.paint(&escaped(25, z, dz)), Rgb([128, 128, 128]));
    }

    #[test]
    fn hsv_escapes_are_fully_bright() {
        let c = coloring(ColorScheme::Hsv, false);
        let Rgb(rgb) = c.paint(&escaped(40, Complex::new(3.0, 0.0), Complex::new(1.0, 0.0)));
        assert_eq!(rgb.iter().cloned().max(), Some(255));
    }

    #[test]
    fn smoothing_changes_escaped_colors_only_slightly() {
        let discrete = coloring(ColorScheme::Grayscale, false);
        let smooth = coloring(ColorScheme::Grayscale, true);
        let r = escaped(25, Complex::new(2.5, 0.0), Complex::new(1.0, 0.0));
        let Rgb(a) = discrete.paint(&r);
        let Rgb(b) = smooth.paint(&r);
        assert_ne!(a, b);
        assert!((i32::from(a[0]) - i32::from(b[0])).abs() < 10);
    }

    #[test]
    fn quilt_depends_on_the_half_plane_of_the_final_z() {
        let c = coloring(ColorScheme::Quilt, false);
        let dz = Complex::new(100.0, 0.0);
        let above = c.paint(&escaped(10, Complex::new(2.0, 1.0), dz));
        let below = c.paint(&escaped(10, Complex::new(2.0, -1.0), dz));
        assert_ne!(above, below);
    }

    #[test]
    fn quilt_dims_even_escape_counts() {
        // Counting the escaping step itself, n = 1 is the second
        // iteration, an even count, so it gets the dimmer stripe.
        let c = coloring(ColorScheme::Quilt, false);
        let (z, dz) = (Complex::new(2.0, 1.0), Complex::new(1.0, 0.0));
        let Rgb(even) = c.paint(&escaped(1, z, dz));
        let Rgb(odd) = c.paint(&escaped(2, z, dz));
        assert_eq!(even.iter().cloned().max(), Some(217));
        assert_eq!(odd.iter().cloned().max(), Some(255));
    }

    #[test]
    fn colormap_interpolates() {
        let table = Colormap::new(vec![Rgb::BLACK, Rgb::WHITE]).unwrap();
        assert_eq!(table.sample(0.0), Rgb::BLACK);
        assert_eq!(table.sample(1.0), Rgb::WHITE);
        assert_eq!(table.sample(0.5), Rgb([128, 128, 128]));
        assert_eq!(table.sample(7.0), Rgb::WHITE);
        assert_eq!(table.sample(-1.0), Rgb::BLACK);
    }

    #[test]
    fn colormap_hits_its_stops() {
        let table = Colormap::builtin("fire").unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.sample(1.0 / 3.0), Rgb([255, 0, 0]));
    }

    #[test]
    fn builtin_colormaps_exist() {
        for name in BUILTIN_COLORMAPS.iter() {
            assert!(Colormap::builtin(name).is_ok(), "{}", name);
        }
        match Colormap::builtin("jet") {
            Err(Error::UnknownColormap(name)) => assert_eq!(name, "jet"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_colormap_files() {
        let table = Colormap::parse("0 0 0\n\n128 64 32\n255 255 255\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.sample(0.5), Rgb([128, 64, 32]));
    }

    #[test]
    fn rejects_malformed_colormap_lines() {
        match Colormap::parse("0 0 0\n1 2\n") {
            Err(Error::MalformedColormap { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Colormap::parse("0 0 0\n1 2 3 4\n").is_err());
        assert!(Colormap::parse("0 0 0\n1 2 256\n").is_err());
        assert!(Colormap::parse("0 0 0\n1 x 3\n").is_err());
        assert!(Colormap::parse("0 0 -1\n1 2 3\n").is_err());
    }

    #[test]
    fn rejects_short_colormaps() {
        match Colormap::parse("10 10 10\n") {
            Err(Error::ColormapTooShort(n)) => assert_eq!(n, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scheme_indices() {
        assert_eq!(ColorScheme::from_index(0, None).unwrap(), ColorScheme::Grayscale);
        assert_eq!(ColorScheme::from_index(2, None).unwrap(), ColorScheme::Quilt);
        assert!(ColorScheme::from_index(3, None).is_err());
        assert!(ColorScheme::from_index(4, None).is_err());
        let table = Colormap::builtin("gray").unwrap();
        let scheme = ColorScheme::from_index(3, Some(table)).unwrap();
        assert_eq!(scheme.index(), 3);
        assert_eq!(ColorScheme::Hsv.index(), 1);
    }
}
