#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Quadtree Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points c on the complex plane for
//! which z -> z² + c, started at zero, never runs off to infinity.
//! Rendering it means iterating every pixel's point until it escapes
//! or an iteration limit runs out, and coloring the pixel by how long
//! that took (its "dwell").
//!
//! Most of that work is wasted.  The set is connected and has no
//! holes, and outside it the dwell changes slowly, so big rectangles
//! of an image are all one color.  This crate renders by evaluating
//! only the border of a rectangle: when the border is uniform the
//! inside is flood-filled, and when it is not the inside is cut into
//! quadrants that are examined in turn.  A plain raster renderer is
//! here too, both as a reference and to finish off the regions the
//! mixed policy leaves open.
//!
//! Iteration itself is cut short wherever it safely can be: points in
//! the main cardioid and the period-2 bulb are answered without
//! iterating, orbits that revisit a point are recognized as periodic,
//! and, on a single thread, the mirror image of a point below the real
//! axis is looked up rather than recomputed.
//!
//! A render can be described by a `config.yml` in a run directory, which
//! is also where its image is written; see `rundir`.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
extern crate crossbeam;
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate serde;
extern crate serde_yaml;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod canvas;
pub mod colors;
pub mod config;
pub mod errors;
pub mod escape;
pub mod planes;
pub mod quadtree;
pub mod raster;
pub mod render;
pub mod rundir;
pub mod symmetry;

pub use canvas::PixelBuffer;
pub use colors::{ColorScheme, Colormap, Coloring, Rgb};
pub use config::{RenderConfig, RendererKind, Strategy};
pub use errors::{Error, Result};
pub use escape::{Evaluator, IterationResult};
pub use planes::{Pixel, Rect, Viewport};
pub use quadtree::{Policy, QuadTree, QuadtreeRenderer};
pub use raster::RasterRenderer;
pub use render::{render, RenderStats, Rendering, Scene};
pub use rundir::RunDirectory;
pub use symmetry::SymmetryCache;
