// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parameters of a render, as the command line (or any other
//! caller) hands them over, and the choices that follow from them.

use num::Complex;

use colors::{ColorScheme, Coloring};
use errors::{Error, Result};
use escape::Evaluator;
use planes::Viewport;
use quadtree::Policy;
use render::Scene;

/// Which renderer fills the image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RendererKind {
    /// Every pixel evaluated.
    Raster,
    /// Recursive subdivision under the given fill policy.
    Quadtree(Policy),
}

/// How the work is spread out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// One thread, with the symmetry cache.
    Sequential,
    /// Worker threads, without the cache.
    Parallel {
        /// Number of workers.
        threads: usize,
    },
}

/// Everything a render needs to know.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Spread the work over `threads` workers.
    pub accelerated: bool,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Real part of the point at the center of the image.
    pub center_real: f64,
    /// Imaginary part of the point at the center of the image.
    pub center_imaginary: f64,
    /// Width of the view on the complex plane.
    pub world_width: f64,
    /// Iteration limit.
    pub max_iterations: usize,
    /// Bailout radius.
    pub escape_radius: f64,
    /// How dwell becomes color.
    pub color_scheme: ColorScheme,
    /// Use fractional dwell.
    pub smooth: bool,
    /// Evaluate every pixel instead of subdividing.
    pub raster: bool,
    /// Subdivide with the mixed policy.
    pub mixed_raster: bool,
    /// With `accelerated`, examine whole quadtree levels in parallel.
    pub fast_quadtree: bool,
    /// Keep the quadtree rectangles for the overlay.
    pub show_quadtree: bool,
    /// Worker count when accelerated.
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            accelerated: false,
            width: 512,
            height: 512,
            center_real: -0.75,
            center_imaginary: 0.0,
            world_width: 3.5,
            max_iterations: 100,
            escape_radius: 2.0,
            color_scheme: ColorScheme::Grayscale,
            smooth: false,
            raster: false,
            mixed_raster: false,
            fast_quadtree: true,
            show_quadtree: false,
            threads: num_cpus::get(),
        }
    }
}

impl RenderConfig {
    /// Checks every parameter without rendering anything.
    pub fn validate(&self) -> Result<()> {
        self.scene().map(|_| ())
    }

    /// Builds the viewport, evaluator and coloring, validating as it
    /// goes.
    pub fn scene(&self) -> Result<Scene> {
        if self.threads == 0 {
            return Err(Error::InvalidThreads);
        }
        let viewport = Viewport::new(
            self.width,
            self.height,
            Complex::new(self.center_real, self.center_imaginary),
            self.world_width,
        )?;
        let evaluator = Evaluator::new(self.max_iterations, self.escape_radius)?;
        let coloring = Coloring::new(self.color_scheme.clone(), &evaluator, self.smooth);
        Ok(Scene::new(viewport, evaluator, coloring))
    }

    /// `raster` wins over `mixed_raster`; without either the pure
    /// quadtree runs.
    pub fn renderer(&self) -> RendererKind {
        if self.raster {
            RendererKind::Raster
        } else if self.mixed_raster {
            RendererKind::Quadtree(Policy::Mixed)
        } else {
            RendererKind::Quadtree(Policy::Pure)
        }
    }

    /// A single worker is the same as not accelerating at all.
    pub fn strategy(&self) -> Strategy {
        if !self.accelerated || self.threads <= 1 {
            Strategy::Sequential
        } else {
            Strategy::Parallel {
                threads: self.threads,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colors::Rgb;
    use planes::Pixel;
    use render::render;

    fn example() -> RenderConfig {
        RenderConfig {
            width: 4,
            height: 4,
            max_iterations: 50,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.renderer(), RendererKind::Quadtree(Policy::Pure));
        assert_eq!(config.strategy(), Strategy::Sequential);
    }

    #[test]
    fn small_escape_radius_is_rejected() {
        let config = RenderConfig {
            escape_radius: 0.5,
            ..example()
        };
        match config.validate() {
            Err(Error::InvalidEscapeRadius(r)) => assert_eq!(r, 0.5),
            other => panic!("expected an escape radius error, got {:?}", other),
        }
        assert!(render(&config).is_err());
    }

    #[test]
    fn escape_radius_between_one_and_two_is_accepted() {
        let config = RenderConfig {
            escape_radius: 1.5,
            ..example()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let cases = vec![
            RenderConfig { width: 0, ..example() },
            RenderConfig { height: 0, ..example() },
            RenderConfig { world_width: 0.0, ..example() },
            RenderConfig { world_width: -1.0, ..example() },
            RenderConfig { center_real: ::std::f64::NAN, ..example() },
            RenderConfig { max_iterations: 0, ..example() },
            RenderConfig { threads: 0, ..example() },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn renderer_selection() {
        let both = RenderConfig {
            raster: true,
            mixed_raster: true,
            ..example()
        };
        assert_eq!(both.renderer(), RendererKind::Raster);
        let mixed = RenderConfig {
            mixed_raster: true,
            ..example()
        };
        assert_eq!(mixed.renderer(), RendererKind::Quadtree(Policy::Mixed));
    }

    #[test]
    fn strategy_selection() {
        let accelerated = RenderConfig {
            accelerated: true,
            threads: 3,
            ..example()
        };
        assert_eq!(accelerated.strategy(), Strategy::Parallel { threads: 3 });
        let one = RenderConfig {
            accelerated: true,
            threads: 1,
            ..example()
        };
        assert_eq!(one.strategy(), Strategy::Sequential);
    }

    #[test]
    fn the_four_by_four_example() {
        let raster = render(&RenderConfig {
            raster: true,
            ..example()
        })
        .unwrap();
        let quadtree = render(&example()).unwrap();
        assert_eq!(raster.pixels.colors(), quadtree.pixels.colors());
        assert!(raster.quadtree.is_empty());
        assert_eq!(quadtree.pixels.get(&Pixel(2, 2)), Some(Rgb::WHITE));
        for corner in &[Pixel(0, 0), Pixel(3, 0), Pixel(0, 3), Pixel(3, 3)] {
            assert_ne!(quadtree.pixels.get(corner), Some(Rgb::WHITE));
        }
    }

    #[test]
    fn every_combination_renders_the_same_uniform_view() {
        let base = RenderConfig {
            width: 45,
            height: 33,
            center_real: -0.1,
            center_imaginary: 0.0,
            world_width: 0.2,
            threads: 3,
            ..RenderConfig::default()
        };
        let expected = render(&RenderConfig {
            raster: true,
            ..base.clone()
        })
        .unwrap();
        for &(accelerated, raster, mixed_raster, fast_quadtree) in &[
            (false, false, false, true),
            (false, false, true, true),
            (true, true, false, true),
            (true, false, false, true),
            (true, false, false, false),
            (true, false, true, true),
        ] {
            let config = RenderConfig {
                accelerated,
                raster,
                mixed_raster,
                fast_quadtree,
                show_quadtree: true,
                ..base.clone()
            };
            let rendering = render(&config).unwrap();
            assert_eq!(rendering.pixels.colors(), expected.pixels.colors());
            assert_eq!(rendering.pixels.overwrites(), 0);
            assert_eq!(rendering.quadtree.is_empty(), raster);
        }
    }
}
