// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The entry point: takes a validated configuration, picks a renderer
//! and a strategy, and hands back the finished image along with the
//! quadtree it was carved into.

use std::ops::AddAssign;

use canvas::PixelBuffer;
use colors::{Coloring, Rgb};
use config::{RenderConfig, RendererKind, Strategy};
use errors::Result;
use escape::Evaluator;
use planes::{Pixel, Rect, Viewport};
use quadtree::QuadtreeRenderer;
use raster::RasterRenderer;
use symmetry::SymmetryCache;

/// Everything needed to turn a pixel into a color.
#[derive(Clone, Debug)]
pub struct Scene {
    /// Where the image sits on the complex plane.
    pub viewport: Viewport,
    /// The escape-time function and its limits.
    pub evaluator: Evaluator,
    /// How results become colors.
    pub coloring: Coloring,
}

impl Scene {
    /// Bundles the three stages.
    pub fn new(viewport: Viewport, evaluator: Evaluator, coloring: Coloring) -> Self {
        Scene {
            viewport,
            evaluator,
            coloring,
        }
    }

    /// Evaluates and colors one pixel.  Also says whether the pixel
    /// belongs to the set.
    pub fn sample(&self, pixel: &Pixel, cache: Option<&mut SymmetryCache>) -> (Rgb, bool) {
        let result = self
            .evaluator
            .evaluate_with(self.viewport.map(pixel), cache);
        (self.coloring.paint(&result), result.in_set)
    }
}

/// Counters describing how a render pass spent its effort.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Pixels colored by running the escape-time function.
    pub evaluated: usize,
    /// Pixels colored by flood-filling a quadtree node.
    pub filled: usize,
    /// Quadtree nodes examined.
    pub nodes: usize,
    /// Evaluations answered by the symmetry cache.
    pub cache_hits: usize,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: RenderStats) {
        self.evaluated += other.evaluated;
        self.filled += other.filled;
        self.nodes += other.nodes;
        self.cache_hits += other.cache_hits;
    }
}

/// The product of a render pass.
#[derive(Clone, Debug)]
pub struct Rendering {
    /// The image.
    pub pixels: PixelBuffer,
    /// Bounds of every quadtree node visited, for the debug overlay.
    /// Empty unless the overlay was asked for and a quadtree renderer ran.
    pub quadtree: Vec<Rect>,
    /// Effort counters.
    pub stats: RenderStats,
}

/// Validates the configuration and renders it.  Configuration errors
/// come back before any pixel is touched; after that rendering always
/// produces a complete image.
pub fn render(config: &RenderConfig) -> Result<Rendering> {
    let scene = config.scene()?;
    let kind = config.renderer();
    let strategy = config.strategy();
    debug!(
        "Rendering {}x{} with {:?} renderer, {:?} strategy",
        scene.viewport.width, scene.viewport.height, kind, strategy
    );

    let mut pixels = PixelBuffer::new(scene.viewport.width, scene.viewport.height);
    let mut stats = RenderStats::default();
    let mut cache = match strategy {
        Strategy::Sequential => Some(SymmetryCache::new()),
        Strategy::Parallel { .. } => {
            debug!("Symmetry cache disabled for parallel rendering");
            None
        }
    };

    let quadtree = match kind {
        RendererKind::Raster => {
            let raster = RasterRenderer::new(&scene);
            stats.evaluated += match strategy {
                Strategy::Sequential => raster.render(&mut pixels, cache.as_mut()),
                Strategy::Parallel { threads } => raster.render_threaded(&mut pixels, threads),
            };
            None
        }
        RendererKind::Quadtree(policy) => {
            let renderer = QuadtreeRenderer::new(&scene, policy);
            let (tree, tree_stats) = match strategy {
                Strategy::Parallel { threads } if config.fast_quadtree => {
                    renderer.render_batched(&mut pixels, threads)
                }
                Strategy::Parallel { threads } => renderer.render_queued(&mut pixels, threads),
                Strategy::Sequential => renderer.render(&mut pixels, cache.as_mut()),
            };
            stats += tree_stats;
            Some(tree)
        }
    };

    if let Some(ref cache) = cache {
        stats.cache_hits = cache.hits();
    }
    debug!("{:?}", stats);
    debug_assert!(pixels.is_complete());

    let quadtree = match quadtree {
        Some(ref tree) if config.show_quadtree => tree.rects(),
        _ => vec![],
    };
    Ok(Rendering {
        pixels,
        quadtree,
        stats,
    })
}
