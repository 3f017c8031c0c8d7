// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate image;
#[macro_use]
extern crate log;
extern crate num_cpus;
extern crate quadbrot;

use clap::{App, Arg, ArgMatches, ErrorKind};
use quadbrot::{ColorScheme, Colormap, Error, RenderConfig, Rendering, RunDirectory};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    T::from_str(s).map(|_| ()).map_err(|_| err.to_string())
}

const DIRECTORY: &str = "directory";
const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const WORLD_WIDTH: &str = "world-width";
const ITERATIONS: &str = "iterations";
const ESCAPE_RADIUS: &str = "escape-radius";
const COLOR_SCHEME: &str = "color-scheme";
const COLORMAP: &str = "colormap";
const COLORMAP_FILE: &str = "colormap-file";
const SMOOTH: &str = "smooth";
const RASTER: &str = "raster";
const MIXED_RASTER: &str = "mixed-raster";
const ACCELERATED: &str = "accelerated";
const NO_FAST_QUADTREE: &str = "no-fast-quadtree";
const SHOW_QUADTREE: &str = "show-quadtree";
const THREADS: &str = "threads";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("quadbrot")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Adaptive quadtree Mandelbrot renderer")
        .arg(
            Arg::with_name(DIRECTORY)
                .index(1)
                .help("Run directory holding config.yml; the image is written there as image.png"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; the format follows the extension"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("512x512")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.75,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the center point"))
                .help("Point of the complex plane at the center of the image"),
        )
        .arg(
            Arg::with_name(WORLD_WIDTH)
                .long(WORLD_WIDTH)
                .short("w")
                .takes_value(true)
                .default_value("3.5")
                .validator(|s| validate_number::<f64>(&s, "Could not parse the world width"))
                .help("Width of the view on the complex plane"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100")
                .validator(|s| validate_number::<usize>(&s, "Could not parse iteration count"))
                .help("Iterations before a point is taken to be in the set"),
        )
        .arg(
            Arg::with_name(ESCAPE_RADIUS)
                .long(ESCAPE_RADIUS)
                .short("r")
                .takes_value(true)
                .default_value("2.0")
                .validator(|s| validate_number::<f64>(&s, "Could not parse escape radius"))
                .help("Distance from the origin at which a point has escaped"),
        )
        .arg(
            Arg::with_name(COLOR_SCHEME)
                .long(COLOR_SCHEME)
                .short("C")
                .takes_value(true)
                .default_value("0")
                .validator(|s| {
                    validate_range::<u8>(
                        &s,
                        0,
                        3,
                        "Could not parse color scheme",
                        "Color scheme must be 0 (grayscale), 1 (HSV), 2 (quilt) or 3 (colormap)",
                    )
                })
                .help("0 grayscale, 1 HSV, 2 quilt, 3 colormap"),
        )
        .arg(
            Arg::with_name(COLORMAP)
                .long(COLORMAP)
                .takes_value(true)
                .conflicts_with(COLORMAP_FILE)
                .help("Builtin colormap: viridis, magma, fire, ocean or gray"),
        )
        .arg(
            Arg::with_name(COLORMAP_FILE)
                .long(COLORMAP_FILE)
                .takes_value(true)
                .help("Colormap file, one 'r g b' triple per line"),
        )
        .arg(Arg::with_name(SMOOTH).long(SMOOTH).help("Color by fractional dwell"))
        .arg(
            Arg::with_name(RASTER)
                .long(RASTER)
                .conflicts_with(MIXED_RASTER)
                .help("Evaluate every pixel instead of subdividing"),
        )
        .arg(
            Arg::with_name(MIXED_RASTER)
                .long(MIXED_RASTER)
                .help("Fill only regions inside the set; raster the rest"),
        )
        .arg(
            Arg::with_name(ACCELERATED)
                .long(ACCELERATED)
                .short("a")
                .help("Render on several threads"),
        )
        .arg(
            Arg::with_name(NO_FAST_QUADTREE)
                .long(NO_FAST_QUADTREE)
                .help("When accelerated, build the quadtree one node at a time"),
        )
        .arg(
            Arg::with_name(SHOW_QUADTREE)
                .long(SHOW_QUADTREE)
                .help("Outline the quadtree in red"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use when accelerated [default: all cores]"),
        )
        .get_matches()
}

/// Values reach here only after their validators passed.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> T {
    match matches.value_of(name).map(T::from_str) {
        Some(Ok(value)) => value,
        _ => clap::Error::with_description(&format!("Invalid value for --{}", name), ErrorKind::InvalidValue).exit(),
    }
}

fn pair<T: FromStr>(matches: &ArgMatches, name: &str, separator: char) -> (T, T) {
    match matches.value_of(name).and_then(|s| parse_pair(s, separator)) {
        Some(pair) => pair,
        None => clap::Error::with_description(&format!("Invalid value for --{}", name), ErrorKind::InvalidValue).exit(),
    }
}

/// Defaults do not count; only what was typed overrides config.yml.
fn given(matches: &ArgMatches, name: &str) -> bool {
    matches.occurrences_of(name) > 0
}

fn color_scheme(matches: &ArgMatches, current: ColorScheme) -> quadbrot::Result<ColorScheme> {
    let colormap = match (matches.value_of(COLORMAP), matches.value_of(COLORMAP_FILE)) {
        (Some(name), _) => Some(Colormap::builtin(name)?),
        (None, Some(path)) => Some(Colormap::load(path)?),
        (None, None) => None,
    };
    let index = if given(matches, COLOR_SCHEME) {
        value::<u8>(matches, COLOR_SCHEME)
    } else {
        current.index()
    };
    if index != 3 && colormap.is_some() {
        warn!("A colormap was given but color scheme {} does not use it", index);
    }
    let colormap = colormap.or_else(|| match current {
        ColorScheme::Colormap(map) => Some(map),
        _ => None,
    });
    ColorScheme::from_index(index, colormap)
}

fn configure(matches: &ArgMatches, base: RenderConfig) -> quadbrot::Result<RenderConfig> {
    let mut config = base;
    if given(matches, SIZE) {
        let (width, height) = pair::<usize>(matches, SIZE, 'x');
        config.width = width;
        config.height = height;
    }
    if given(matches, CENTER) {
        let (center_real, center_imaginary) = pair::<f64>(matches, CENTER, ',');
        config.center_real = center_real;
        config.center_imaginary = center_imaginary;
    }
    if given(matches, WORLD_WIDTH) {
        config.world_width = value(matches, WORLD_WIDTH);
    }
    if given(matches, ITERATIONS) {
        config.max_iterations = value(matches, ITERATIONS);
    }
    if given(matches, ESCAPE_RADIUS) {
        config.escape_radius = value(matches, ESCAPE_RADIUS);
    }
    if given(matches, THREADS) {
        config.threads = value(matches, THREADS);
    }
    config.accelerated |= matches.is_present(ACCELERATED);
    config.smooth |= matches.is_present(SMOOTH);
    config.raster |= matches.is_present(RASTER);
    config.mixed_raster |= matches.is_present(MIXED_RASTER);
    config.show_quadtree |= matches.is_present(SHOW_QUADTREE);
    if matches.is_present(NO_FAST_QUADTREE) {
        config.fast_quadtree = false;
    }
    config.color_scheme = color_scheme(matches, config.color_scheme)?;
    config.validate()?;
    Ok(config)
}

/// With no directory and no output file, the render gets a fresh
/// numbered run directory under the current one.
fn destination(matches: &ArgMatches) -> quadbrot::Result<(Option<RunDirectory>, PathBuf)> {
    match (matches.value_of(DIRECTORY), matches.value_of(OUTPUT)) {
        (Some(directory), output) => {
            let run = RunDirectory::open(directory)?;
            let outfile = output.map(PathBuf::from).unwrap_or_else(|| run.image_file());
            Ok((Some(run), outfile))
        }
        (None, Some(output)) => Ok((None, PathBuf::from(output))),
        (None, None) => {
            let run = RunDirectory::create_numbered(".")?;
            let outfile = run.image_file();
            Ok((Some(run), outfile))
        }
    }
}

fn write_image(outfile: &Path, rendering: &Rendering) -> quadbrot::Result<()> {
    let (width, height) = (rendering.pixels.width(), rendering.pixels.height());
    let mut img = image::RgbImage::from_raw(width as u32, height as u32, rendering.pixels.to_bytes())
        .ok_or(Error::InvalidDimensions(width, height))?;
    for rect in &rendering.quadtree {
        for pixel in rect.boundary() {
            img.put_pixel(pixel.0 as u32, pixel.1 as u32, image::Rgb(quadbrot::Rgb::RED.0));
        }
    }
    img.save(outfile)?;
    Ok(())
}

fn run(matches: &ArgMatches) -> quadbrot::Result<()> {
    let (directory, outfile) = destination(matches)?;
    let base = match directory {
        Some(ref run) => {
            info!("Using run directory {}", run.path().display());
            run.load_config(RenderConfig::default())?
        }
        None => RenderConfig::default(),
    };
    let config = configure(matches, base)?;

    let tic = Instant::now();
    let rendering = quadbrot::render(&config)?;
    info!("Finished calculating in {:.4} seconds", seconds(tic));
    debug!("{:?}", rendering.stats);

    let tic = Instant::now();
    write_image(&outfile, &rendering)?;
    info!("Finished rendering and saving in {:.4} seconds", seconds(tic));
    Ok(())
}

fn seconds(since: Instant) -> f64 {
    let elapsed = since.elapsed();
    elapsed.as_secs() as f64 + f64::from(elapsed.subsec_nanos()) * 1e-9
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_module_path(false)
        .init();

    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
