// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The adaptive renderer.  Large regions of a Mandelbrot image are a
//! single color: the interior of the set, and the bands far outside
//! it.  Rather than evaluating every pixel, we evaluate only the
//! outer ring of a rectangle.  If the ring says the rectangle is
//! uniform, the inside is flood-filled; otherwise the inside (the
//! rectangle minus the ring, which is already done) is cut into four
//! quadrants and each gets the same treatment.  No pixel is ever
//! evaluated twice.
//!
//! Two policies decide what "uniform" means:
//!
//! * `Pure` fills when every ring pixel came out the same color.
//! * `Mixed` fills only when every ring pixel is a member of the set.
//!   A ring with no members at all is left for a raster pass at the
//!   end, since escaping points are cheap to evaluate; only rings that
//!   are partly inside the set are split further.
//!
//! The tree lives in a flat arena.  Nodes are handled breadth first,
//! either one at a time from a queue, or a whole level at a time
//! spread over worker threads.

use crossbeam::thread::ScopedJoinHandle;
use itertools::iproduct;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::{Arc, Mutex};

use canvas::PixelBuffer;
use colors::Rgb;
use planes::{Pixel, Rect};
use raster::RasterRenderer;
use render::{RenderStats, Scene};
use symmetry::SymmetryCache;

/// Index of a node in the arena.
pub type NodeId = usize;

/// The root node, which spans the whole image.
pub const ROOT: NodeId = 0;

/// Which rings are uniform enough to fill.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Fill only rings made entirely of members of the set; finish
    /// with a raster pass.
    Mixed,
    /// Fill any ring of a single color.
    Pure,
}

/// Where a node is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Queued but not yet examined.
    Unvisited,
    /// The interior was flood-filled with this color.
    Filled(Rgb),
    /// The interior was handed to four children.
    Split,
    /// Every pixel was evaluated directly.
    Evaluated,
    /// Ring evaluated, interior left to the closing raster pass.
    Deferred,
}

/// One rectangle of the decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// The pixels this node is responsible for.
    pub bounds: Rect,
    /// What became of it.
    pub state: NodeState,
    /// The node whose interior this one is a quadrant of.
    pub parent: Option<NodeId>,
    /// Children are allocated next to each other.
    pub children: Option<Range<NodeId>>,
}

/// Cuts a rectangle into quadrants, top left, top right, bottom left,
/// bottom right.  The halves differ by at most one pixel, the odd one
/// going right and down.  A side only one pixel long is not halved,
/// so thin rectangles give two quadrants, or one.
pub fn quadrants(rect: &Rect) -> Vec<Rect> {
    let half_width = rect.left + rect.width() / 2;
    let half_height = rect.top + rect.height() / 2;
    let columns: Vec<(usize, usize)> = vec![(rect.left, half_width), (half_width, rect.right)]
        .into_iter()
        .filter(|(a, b)| a < b)
        .collect();
    let rows: Vec<(usize, usize)> = vec![(rect.top, half_height), (half_height, rect.bottom)]
        .into_iter()
        .filter(|(a, b)| a < b)
        .collect();
    iproduct!(rows, columns)
        .map(|((top, bottom), (left, right))| Rect::new(left, top, right, bottom))
        .collect()
}

/// A quadtree over an image, stored as a flat arena of nodes.
#[derive(Clone, Debug)]
pub struct QuadTree {
    nodes: Vec<Node>,
}

impl QuadTree {
    /// A tree with only its root.
    pub fn new(bounds: Rect) -> Self {
        QuadTree {
            nodes: vec![Node {
                bounds,
                state: NodeState::Unvisited,
                parent: None,
                children: None,
            }],
        }
    }

    /// Number of nodes allocated.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// The children of a node, if it was split.
    pub fn children(&self, id: NodeId) -> Option<Range<NodeId>> {
        self.nodes[id].children.clone()
    }

    /// Hands `region` to new children of `id`, one per quadrant, and
    /// marks `id` as split.  `region` is the node's whole rectangle
    /// for the root, and its interior for every other node.
    pub fn split(&mut self, id: NodeId, region: &Rect) -> Range<NodeId> {
        let first = self.nodes.len();
        for bounds in quadrants(region) {
            self.nodes.push(Node {
                bounds,
                state: NodeState::Unvisited,
                parent: Some(id),
                children: None,
            });
        }
        let children = first..self.nodes.len();
        self.nodes[id].state = NodeState::Split;
        self.nodes[id].children = Some(children.clone());
        children
    }

    /// Records what became of a node.
    pub fn mark(&mut self, id: NodeId, state: NodeState) {
        self.nodes[id].state = state;
    }

    /// The rectangle of every node, root first, in breadth-first order.
    pub fn rects(&self) -> Vec<Rect> {
        self.nodes.iter().map(|node| node.bounds).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Decision {
    Fill(Rect, Rgb),
    Split(Rect),
    Defer,
    Evaluated,
}

/// What examining one node produced: the colors of the pixels it
/// evaluated, and what to do with its interior.
#[derive(Clone, Debug)]
struct Visit {
    samples: Vec<(Pixel, Rgb)>,
    decision: Decision,
}

/// Renders by recursive subdivision.
pub struct QuadtreeRenderer<'a> {
    scene: &'a Scene,
    policy: Policy,
}

impl<'a> QuadtreeRenderer<'a> {
    /// Borrows the scene for the length of the pass.
    pub fn new(scene: &'a Scene, policy: Policy) -> Self {
        QuadtreeRenderer { scene, policy }
    }

    /// Evaluates the ring of a node and decides its fate.  Only reads
    /// the scene, so any number of nodes can be examined at once.
    fn examine(&self, bounds: &Rect, mut cache: Option<&mut SymmetryCache>) -> Visit {
        let ring = bounds.boundary();
        let mut samples = Vec::with_capacity(ring.len());
        let (mut all_inside, mut any_inside, mut uniform) = (true, false, true);
        for pixel in ring {
            let (color, in_set) = self.scene.sample(&pixel, cache.as_mut().map(|c| &mut **c));
            all_inside &= in_set;
            any_inside |= in_set;
            if let Some(&(_, first)) = samples.first() {
                uniform &= first == color;
            }
            samples.push((pixel, color));
        }

        let interior = match bounds.interior() {
            Some(interior) => interior,
            None => {
                return Visit {
                    samples,
                    decision: Decision::Evaluated,
                }
            }
        };

        let fill = match self.policy {
            Policy::Mixed if all_inside => Some(self.scene.coloring.in_set_color()),
            Policy::Pure if uniform => Some(samples[0].1),
            _ => None,
        };
        let decision = if let Some(color) = fill {
            Decision::Fill(interior, color)
        } else if self.policy == Policy::Mixed && !any_inside {
            Decision::Defer
        } else if interior.width() >= 2 && interior.height() >= 2 {
            Decision::Split(interior)
        } else {
            // Too thin to cut in four; finish it here.
            for pixel in interior.pixels() {
                let (color, _) = self.scene.sample(&pixel, cache.as_mut().map(|c| &mut **c));
                samples.push((pixel, color));
            }
            Decision::Evaluated
        };
        Visit { samples, decision }
    }

    /// Writes a visit into the image and the tree, queueing any new
    /// children.
    fn apply(
        &self,
        tree: &mut QuadTree,
        pixels: &mut PixelBuffer,
        id: NodeId,
        visit: Visit,
        queue: &mut VecDeque<NodeId>,
        stats: &mut RenderStats,
    ) {
        stats.nodes += 1;
        stats.evaluated += visit.samples.len();
        for (pixel, color) in &visit.samples {
            pixels.set(pixel, *color);
        }
        match visit.decision {
            Decision::Fill(interior, color) => {
                pixels.fill(&interior, color);
                stats.filled += interior.area();
                tree.mark(id, NodeState::Filled(color));
            }
            Decision::Split(interior) => {
                queue.extend(tree.split(id, &interior));
            }
            Decision::Defer => tree.mark(id, NodeState::Deferred),
            Decision::Evaluated => tree.mark(id, NodeState::Evaluated),
        }
    }

    fn seed(&self) -> (QuadTree, VecDeque<NodeId>) {
        let bounds = self.scene.viewport.bounds();
        let mut tree = QuadTree::new(bounds);
        // The root is always split, and has no ring of its own.
        let queue = tree.split(ROOT, &bounds).collect();
        (tree, queue)
    }

    fn build_queued(
        &self,
        pixels: &mut PixelBuffer,
        mut cache: Option<&mut SymmetryCache>,
        stats: &mut RenderStats,
    ) -> QuadTree {
        let (mut tree, mut queue) = self.seed();
        while let Some(id) = queue.pop_front() {
            let bounds = tree.node(id).bounds;
            let visit = self.examine(&bounds, cache.as_mut().map(|c| &mut **c));
            self.apply(&mut tree, pixels, id, visit, &mut queue, stats);
        }
        tree
    }

    fn examine_level(&self, level: &[(NodeId, Rect)], threads: usize) -> Vec<(NodeId, Visit)> {
        let work = Arc::new(Mutex::new(level.iter()));
        let mut visits: Vec<(NodeId, Visit)> = crossbeam::scope(|spawner| {
            let handles: Vec<ScopedJoinHandle<Vec<(NodeId, Visit)>>> = (0..threads.max(1))
                .map(|_| {
                    let work = work.clone();
                    spawner.spawn(move |_| {
                        let mut visits = vec![];
                        loop {
                            let next = { work.lock().unwrap().next() };
                            match next {
                                Some((id, bounds)) => visits.push((*id, self.examine(bounds, None))),
                                None => {
                                    break;
                                }
                            }
                        }
                        visits
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .flatten()
                .collect()
        })
        .unwrap();
        visits.sort_by_key(|(id, _)| *id);
        visits
    }

    fn build_batched(&self, pixels: &mut PixelBuffer, threads: usize, stats: &mut RenderStats) -> QuadTree {
        let (mut tree, mut queue) = self.seed();
        let mut depth = 0;
        while !queue.is_empty() {
            let level: Vec<(NodeId, Rect)> = queue
                .drain(..)
                .map(|id| (id, tree.node(id).bounds))
                .collect();
            trace!("Quadtree level {}: {} nodes", depth, level.len());
            // Nodes of one level cover disjoint pixels, so their rings
            // can be evaluated in any order; the writes happen here,
            // after every worker is done.
            for (id, visit) in self.examine_level(&level, threads) {
                self.apply(&mut tree, pixels, id, visit, &mut queue, stats);
            }
            depth += 1;
        }
        tree
    }

    fn finish(&self, pixels: &mut PixelBuffer, cache: Option<&mut SymmetryCache>, threads: usize) -> usize {
        let raster = RasterRenderer::new(self.scene);
        match (self.policy, cache) {
            (Policy::Pure, _) => 0,
            (Policy::Mixed, Some(cache)) => raster.render(pixels, Some(cache)),
            (Policy::Mixed, None) if threads > 1 => raster.render_threaded(pixels, threads),
            (Policy::Mixed, None) => raster.render(pixels, None),
        }
    }

    /// Single-threaded: one node at a time from a FIFO queue, then
    /// (mixed policy) a raster pass over whatever is left.  The cache,
    /// if given, serves both.
    pub fn render(
        &self,
        pixels: &mut PixelBuffer,
        mut cache: Option<&mut SymmetryCache>,
    ) -> (QuadTree, RenderStats) {
        let mut stats = RenderStats::default();
        let tree = self.build_queued(pixels, cache.as_mut().map(|c| &mut **c), &mut stats);
        stats.evaluated += self.finish(pixels, cache, 1);
        debug!("Quadtree of {} nodes: {:?}", tree.len(), stats);
        (tree, stats)
    }

    /// The tree is built one node at a time without a cache; the
    /// closing raster pass (mixed policy) runs on `threads` workers.
    pub fn render_queued(&self, pixels: &mut PixelBuffer, threads: usize) -> (QuadTree, RenderStats) {
        let mut stats = RenderStats::default();
        let tree = self.build_queued(pixels, None, &mut stats);
        stats.evaluated += self.finish(pixels, None, threads);
        debug!("Quadtree of {} nodes: {:?}", tree.len(), stats);
        (tree, stats)
    }

    /// The tree is built a level at a time, each level's nodes spread
    /// over `threads` workers.  Produces the same image and the same
    /// tree as `render`.
    pub fn render_batched(&self, pixels: &mut PixelBuffer, threads: usize) -> (QuadTree, RenderStats) {
        let mut stats = RenderStats::default();
        let tree = self.build_batched(pixels, threads, &mut stats);
        stats.evaluated += self.finish(pixels, None, threads);
        debug!("Quadtree of {} nodes: {:?}", tree.len(), stats);
        (tree, stats)
    }
}
