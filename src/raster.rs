// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The plain renderer: every pixel is evaluated on its own.  It also
//! finishes off the mixed quadtree renderer, so it only ever touches
//! pixels that do not have a color yet.

use crossbeam::thread::ScopedJoinHandle;
use std::sync::{Arc, Mutex};

use canvas::PixelBuffer;
use colors::Rgb;
use planes::Pixel;
use render::Scene;
use symmetry::SymmetryCache;

type RowType<'a> = (usize, &'a mut [Rgb], &'a mut [bool]);

/// Renders unassigned pixels one at a time.
pub struct RasterRenderer<'a> {
    scene: &'a Scene,
}

impl<'a> RasterRenderer<'a> {
    /// Borrows the scene for the length of the pass.
    pub fn new(scene: &'a Scene) -> Self {
        RasterRenderer { scene }
    }

    /// The single-threaded renderer.  This is the only raster variant
    /// that can use the symmetry cache.  Returns the number of pixels
    /// evaluated.
    pub fn render(&self, pixels: &mut PixelBuffer, mut cache: Option<&mut SymmetryCache>) -> usize {
        let mut evaluated = 0;
        for pixel in self.scene.viewport.bounds().pixels() {
            if pixels.is_assigned(&pixel) {
                continue;
            }
            let (color, _) = self.scene.sample(&pixel, cache.as_mut().map(|c| &mut **c));
            pixels.set(&pixel, color);
            evaluated += 1;
        }
        evaluated
    }

    /// Colors one row.  The unassigned columns are evaluated as one batch.
    fn render_row(&self, row: RowType) -> usize {
        let (y, colors, assigned) = row;
        let columns: Vec<usize> = (0..colors.len()).filter(|x| !assigned[*x]).collect();
        let points: Vec<_> = columns
            .iter()
            .map(|x| self.scene.viewport.map(&Pixel(*x, y)))
            .collect();
        let results = self.scene.evaluator.evaluate_batch(&points);
        for (x, result) in columns.iter().zip(results.iter()) {
            colors[*x] = self.scene.coloring.paint(result);
            assigned[*x] = true;
        }
        columns.len()
    }

    /// A multi-threaded version of the renderer that takes a thread
    /// count.  Rows are handed out to the workers one at a time.
    pub fn render_threaded(&self, pixels: &mut PixelBuffer, threads: usize) -> usize {
        let rows = Arc::new(Mutex::new(pixels.rows_mut().into_iter()));
        crossbeam::scope(|spawner| {
            let handles: Vec<ScopedJoinHandle<usize>> = (0..threads.max(1))
                .map(|_| {
                    let rows = rows.clone();
                    spawner.spawn(move |_| {
                        let mut evaluated = 0;
                        loop {
                            let row = { rows.lock().unwrap().next() };
                            match row {
                                Some(row) => evaluated += self.render_row(row),
                                None => {
                                    break;
                                }
                            }
                        }
                        evaluated
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .sum()
        })
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colors::{ColorScheme, Coloring};
    use escape::Evaluator;
    use num::Complex;
    use planes::Viewport;

    fn scene(width: usize, height: usize) -> Scene {
        let evaluator = Evaluator::new(50, 2.0).unwrap();
        Scene::new(
            Viewport::new(width, height, Complex::new(-0.75, 0.0), 3.5).unwrap(),
            evaluator,
            Coloring::new(ColorScheme::Grayscale, &evaluator, false),
        )
    }

    #[test]
    fn covers_every_pixel_once() {
        let scene = scene(13, 9);
        let mut pixels = PixelBuffer::new(13, 9);
        assert_eq!(RasterRenderer::new(&scene).render(&mut pixels, None), 13 * 9);
        assert!(pixels.is_complete());
        assert_eq!(pixels.overwrites(), 0);
    }

    #[test]
    fn skips_pixels_that_already_have_a_color() {
        let scene = scene(6, 6);
        let mut pixels = PixelBuffer::new(6, 6);
        pixels.set(&Pixel(2, 2), Rgb::RED);
        assert_eq!(RasterRenderer::new(&scene).render(&mut pixels, None), 35);
        assert_eq!(pixels.get(&Pixel(2, 2)), Some(Rgb::RED));
        assert_eq!(pixels.overwrites(), 0);
    }

    #[test]
    fn threads_and_cache_do_not_change_the_image() {
        let scene = scene(31, 17);
        let mut plain = PixelBuffer::new(31, 17);
        RasterRenderer::new(&scene).render(&mut plain, None);

        let mut cached = PixelBuffer::new(31, 17);
        let mut cache = SymmetryCache::new();
        RasterRenderer::new(&scene).render(&mut cached, Some(&mut cache));
        assert_eq!(plain.colors(), cached.colors());

        for threads in 1..5 {
            let mut threaded = PixelBuffer::new(31, 17);
            assert_eq!(
                RasterRenderer::new(&scene).render_threaded(&mut threaded, threads),
                31 * 17
            );
            assert!(threaded.is_complete());
            assert_eq!(plain.colors(), threaded.colors());
        }
    }

    #[test]
    fn cache_is_hit_on_a_view_symmetric_about_the_real_axis() {
        // A power-of-two scale keeps mirrored rows bit-for-bit opposite.
        let evaluator = Evaluator::new(50, 2.0).unwrap();
        let scene = Scene::new(
            Viewport::new(16, 16, Complex::new(-0.5, 0.0), 4.0).unwrap(),
            evaluator,
            Coloring::new(ColorScheme::Grayscale, &evaluator, false),
        );
        let mut pixels = PixelBuffer::new(16, 16);
        let mut cache = SymmetryCache::new();
        RasterRenderer::new(&scene).render(&mut pixels, Some(&mut cache));
        assert!(cache.hits() > 0);
    }
}
