// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Viewport struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0 in
//! the upper left corner, and a window onto the complex plane
//! described by its center and its width.  Also contains the pixel
//! rectangles the quadtree renderer carves the integral plane into.
use itertools::iproduct;
use num::Complex;

use errors::{Error, Result};

/// Describes the column, row of a pixel.  Rows grow downward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of a `width` x `height` image onto the complex plane.
/// The image is centered on `center`, and its full width covers
/// `world_width` units of the real axis.  Pixels are square, so the
/// height of the window follows from the aspect ratio of the image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// The point of the complex plane at the middle of the image.
    pub center: Complex<f64>,
    /// Width of the window on the real axis.
    pub world_width: f64,
    // Complex-plane units per pixel.
    scale: f64,
}

impl Viewport {
    /// Constructor.  Fails if the image is empty or the window has no
    /// width.
    pub fn new(
        width: usize,
        height: usize,
        center: Complex<f64>,
        world_width: f64,
    ) -> Result<Viewport> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions(width, height));
        }
        if !(world_width > 0.0) || !world_width.is_finite() {
            return Err(Error::InvalidWorldWidth(world_width));
        }
        if !center.re.is_finite() || !center.im.is_finite() {
            return Err(Error::InvalidCenter(center.re, center.im));
        }
        Ok(Viewport {
            width,
            height,
            center,
            world_width,
            scale: world_width / (width as f64),
        })
    }

    /// Complex-plane units covered by one pixel.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The total number of pixels in the image.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Never true for a constructed viewport; here for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole image as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Given a pixel on the integral plane, return the complex number
    /// it samples.  The imaginary axis points up while rows count
    /// down, hence the sign flip.  Each call stands alone, so pixels
    /// map identically whatever order a renderer visits them in.
    pub fn map(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            (pixel.0 as f64) * self.scale + self.center.re - (self.width as f64) * self.scale / 2.0,
            -(pixel.1 as f64) * self.scale + self.center.im + (self.height as f64) * self.scale / 2.0,
        )
    }
}

/// A rectangle of pixels, `left..right` by `top..bottom`.  The right
/// and bottom edges are exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    /// First column.
    pub left: usize,
    /// First row.
    pub top: usize,
    /// One past the last column.
    pub right: usize,
    /// One past the last row.
    pub bottom: usize,
}

impl Rect {
    /// Constructor.  The corners must not be crossed.
    pub fn new(left: usize, top: usize, right: usize, bottom: usize) -> Rect {
        debug_assert!(left <= right && top <= bottom, "crossed rectangle");
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.right - self.left
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// True if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// True if the pixel lies inside.
    pub fn contains(&self, pixel: &Pixel) -> bool {
        pixel.0 >= self.left && pixel.0 < self.right && pixel.1 >= self.top && pixel.1 < self.bottom
    }

    /// The rectangle left over once the one-pixel outer ring is
    /// removed, or None if the ring is all there is.
    pub fn interior(&self) -> Option<Rect> {
        if self.width() < 3 || self.height() < 3 {
            return None;
        }
        Some(Rect::new(
            self.left + 1,
            self.top + 1,
            self.right - 1,
            self.bottom - 1,
        ))
    }

    /// The pixels of the outer ring, each exactly once, even when the
    /// rectangle is a single row or column.
    pub fn boundary(&self) -> Vec<Pixel> {
        if self.is_empty() {
            return vec![];
        }
        let mut ring = Vec::with_capacity(2 * (self.width() + self.height()));
        let last_row = self.bottom - 1;
        let last_col = self.right - 1;
        ring.extend((self.left..self.right).map(|x| Pixel(x, self.top)));
        if last_row > self.top {
            ring.extend((self.left..self.right).map(|x| Pixel(x, last_row)));
        }
        for y in (self.top + 1)..last_row {
            ring.push(Pixel(self.left, y));
            if last_col > self.left {
                ring.push(Pixel(last_col, y));
            }
        }
        ring
    }

    /// Every pixel, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> {
        iproduct!(self.top..self.bottom, self.left..self.right).map(|(y, x)| Pixel(x, y))
    }
}
