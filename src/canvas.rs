// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The output of a render: a row-major grid of colors, plus a mask
//! recording which pixels have been given one.

use colors::Rgb;
use planes::{Pixel, Rect};

/// A width x height image under construction.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    assigned: Vec<bool>,
    overwrites: usize,
}

impl PixelBuffer {
    /// A blank buffer; nothing is assigned yet.
    pub fn new(width: usize, height: usize) -> Self {
        PixelBuffer {
            width,
            height,
            pixels: vec![Rgb::default(); width * height],
            assigned: vec![false; width * height],
            overwrites: 0,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn offset(&self, pixel: &Pixel) -> usize {
        debug_assert!(pixel.0 < self.width && pixel.1 < self.height);
        pixel.1 * self.width + pixel.0
    }

    /// The color of a pixel, if it has one.
    pub fn get(&self, pixel: &Pixel) -> Option<Rgb> {
        let offset = self.offset(pixel);
        if self.assigned[offset] {
            Some(self.pixels[offset])
        } else {
            None
        }
    }

    /// True once the pixel has a color.
    pub fn is_assigned(&self, pixel: &Pixel) -> bool {
        self.assigned[self.offset(pixel)]
    }

    /// Colors a pixel.  Renderers never color a pixel twice; if one
    /// does, it is counted in `overwrites`.
    pub fn set(&mut self, pixel: &Pixel, color: Rgb) {
        let offset = self.offset(pixel);
        if self.assigned[offset] {
            self.overwrites += 1;
        }
        self.pixels[offset] = color;
        self.assigned[offset] = true;
    }

    /// Colors every pixel of the rectangle.
    pub fn fill(&mut self, rect: &Rect, color: Rgb) {
        for pixel in rect.pixels() {
            self.set(&pixel, color);
        }
    }

    /// Pixels still without a color.
    pub fn unassigned(&self) -> usize {
        self.assigned.iter().filter(|a| !**a).count()
    }

    /// True when every pixel has a color.
    pub fn is_complete(&self) -> bool {
        self.assigned.iter().all(|a| *a)
    }

    /// How many times a pixel was colored after it already had a color.
    pub fn overwrites(&self) -> usize {
        self.overwrites
    }

    /// The rows of the image with their assignment masks, each row
    /// borrowed separately so they can go to different threads.
    pub fn rows_mut(&mut self) -> Vec<(usize, &mut [Rgb], &mut [bool])> {
        let width = self.width;
        self.pixels
            .chunks_mut(width)
            .zip(self.assigned.chunks_mut(width))
            .enumerate()
            .map(|(row, (pixels, assigned))| (row, pixels, assigned))
            .collect()
    }

    /// The colors in row-major order, unassigned pixels left black.
    pub fn colors(&self) -> &[Rgb] {
        &self.pixels
    }

    /// Flattened `r, g, b` bytes, as image encoders expect them.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|Rgb(c)| c.iter().cloned()).collect()
    }
}
