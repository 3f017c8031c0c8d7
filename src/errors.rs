// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything that can go wrong before a render starts.  Once the
//! configuration has been validated, rendering itself cannot fail.

use std::io;

/// Configuration, run directory and colormap loading failures.
#[derive(Debug, Fail)]
pub enum Error {
    /// Width or height of the output image is zero.
    #[fail(display = "Image dimensions must be positive, got {}x{}", _0, _1)]
    InvalidDimensions(usize, usize),

    /// The complex-plane width of the view is not a positive, finite number.
    #[fail(display = "World width must be positive and finite, got {}", _0)]
    InvalidWorldWidth(f64),

    /// The view center is not a finite complex number.
    #[fail(display = "Center must be finite, got {},{}", _0, _1)]
    InvalidCenter(f64, f64),

    /// Zero iterations would classify every point as escaping.
    #[fail(display = "Iteration count must be positive")]
    InvalidIterations,

    /// Escape radius at or below one.
    #[fail(
        display = "Escape radius must be greater than 1.0, got {} (2.0 or more is recommended)",
        _0
    )]
    InvalidEscapeRadius(f64),

    /// Color scheme index outside 0..=3.
    #[fail(display = "Unknown color scheme {}; must be 0, 1, 2 or 3", _0)]
    UnknownColorScheme(u8),

    /// The colormap scheme was chosen without naming a palette.
    #[fail(display = "The colormap color scheme needs a builtin colormap name or a colormap file")]
    MissingColormap,

    /// The named builtin palette does not exist.
    #[fail(display = "Unknown builtin colormap \"{}\"", _0)]
    UnknownColormap(String),

    /// A line of a colormap file could not be read as an RGB triple.
    #[fail(display = "Colormap line {}: {}", line, reason)]
    MalformedColormap {
        /// One-based line number in the colormap file.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A colormap needs at least two entries to interpolate between.
    #[fail(display = "Colormap has {} entries, at least 2 are required", _0)]
    ColormapTooShort(usize),

    /// Worker thread count of zero.
    #[fail(display = "Thread count must be at least 1")]
    InvalidThreads,

    /// A `config.yml` key holds a value of the wrong type.
    #[fail(display = "Configuration file has incorrect type in {}", _0)]
    ConfigType(String),

    /// The configuration file is valid YAML but not a mapping of keys.
    #[fail(display = "Malformed configuration file: {}", _0)]
    MalformedConfig(String),

    /// The configuration file is not valid YAML.
    #[fail(display = "Could not read configuration file: {}", _0)]
    Yaml(#[cause] serde_yaml::Error),

    /// The colormap scheme was chosen in a configuration file without
    /// saying whether the colormap is builtin.
    #[fail(display = "With the colormap color scheme, builtin_colormap must be set")]
    MissingColormapSource,

    /// A configuration file names a colormap file that is not there.
    #[fail(display = "Colormap file {} does not exist", _0)]
    ColormapNotFound(String),

    /// Reading a colormap or writing an image failed.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = ::std::result::Result<T, Error>;
