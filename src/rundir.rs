// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A run directory holds one render: an optional `config.yml`
//! describing it, any colormap file the configuration names, and the
//! `image.png` the render produces.
//!
//! Every key of `config.yml` is optional.  Each one present is checked
//! for type on its own, so a mistake is reported against the key that
//! holds it.

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use colors::{ColorScheme, Colormap};
use config::RenderConfig;
use errors::{Error, Result};

/// The configuration file looked for in a run directory.
pub const CONFIG_FILE: &str = "config.yml";

/// The image written into a run directory.
pub const IMAGE_FILE: &str = "image.png";

const RUN_PREFIX: &str = "Mandelbrot_run";

const KNOWN_KEYS: [&str; 17] = [
    "accelerated",
    "height",
    "width",
    "center_real",
    "center_imaginary",
    "world_width",
    "max_iterations",
    "escape_radius",
    "color_scheme",
    "builtin_colormap",
    "colormap",
    "smooth",
    "raster",
    "mixed_raster",
    "fast_quadtree",
    "show_quadtree",
    "threads",
];

/// A directory a render reads its configuration from and writes its
/// image into.
#[derive(Clone, Debug)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    /// Uses the given directory, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<RunDirectory> {
        fs::create_dir_all(path.as_ref())?;
        Ok(RunDirectory {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Creates `Mandelbrot_runN` under `parent`, N being the lowest
    /// number not already taken.
    pub fn create_numbered<P: AsRef<Path>>(parent: P) -> Result<RunDirectory> {
        let mut run = 0;
        loop {
            let path = parent.as_ref().join(format!("{}{}", RUN_PREFIX, run));
            if !path.exists() {
                fs::create_dir_all(&path)?;
                debug!("Created run directory {}", path.display());
                return Ok(RunDirectory { path });
            }
            run += 1;
        }
    }

    /// Where the directory is.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the image goes.
    pub fn image_file(&self) -> PathBuf {
        self.path.join(IMAGE_FILE)
    }

    /// Applies the directory's `config.yml`, if it has one, on top of
    /// `base`.
    pub fn load_config(&self, base: RenderConfig) -> Result<RenderConfig> {
        let file = self.path.join(CONFIG_FILE);
        if !file.exists() {
            debug!("No {} in {}", CONFIG_FILE, self.path.display());
            return Ok(base);
        }
        let text = fs::read_to_string(&file)?;
        parse_config(&text, &self.path, base)
    }
}

fn field<T: DeserializeOwned>(table: &Mapping, key: &str) -> Result<Option<T>> {
    match table.get(&Value::String(key.to_string())) {
        None => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|_| Error::ConfigType(key.to_string())),
    }
}

fn set<T: DeserializeOwned>(table: &Mapping, key: &str, slot: &mut T) -> Result<()> {
    if let Some(value) = field(table, key)? {
        *slot = value;
    }
    Ok(())
}

fn colormap(table: &Mapping, directory: &Path) -> Result<Colormap> {
    let builtin: bool = field(table, "builtin_colormap")?.ok_or(Error::MissingColormapSource)?;
    let name: String = field(table, "colormap")?.ok_or(Error::MissingColormap)?;
    if builtin {
        return Colormap::builtin(&name);
    }
    let path = directory.join(&name);
    if !path.exists() {
        return Err(Error::ColormapNotFound(path.display().to_string()));
    }
    Colormap::load(&path)
}

/// Reads the text of a `config.yml` over `base`.  Colormap files are
/// looked up relative to `directory`.
pub fn parse_config(text: &str, directory: &Path, base: RenderConfig) -> Result<RenderConfig> {
    if text.trim().is_empty() {
        return Ok(base);
    }
    let table = match serde_yaml::from_str::<Value>(text)? {
        Value::Mapping(table) => table,
        Value::Null => Mapping::new(),
        _ => {
            return Err(Error::MalformedConfig(
                "expected a mapping of keys to values".to_string(),
            ))
        }
    };
    for (key, _) in table.iter() {
        match key.as_str() {
            Some(name) if KNOWN_KEYS.contains(&name) => {}
            _ => warn!("Ignoring unknown configuration key {:?}", key),
        }
    }

    let mut config = base;
    set(&table, "accelerated", &mut config.accelerated)?;
    set(&table, "width", &mut config.width)?;
    set(&table, "height", &mut config.height)?;
    set(&table, "center_real", &mut config.center_real)?;
    set(&table, "center_imaginary", &mut config.center_imaginary)?;
    set(&table, "world_width", &mut config.world_width)?;
    set(&table, "max_iterations", &mut config.max_iterations)?;
    set(&table, "escape_radius", &mut config.escape_radius)?;
    set(&table, "smooth", &mut config.smooth)?;
    set(&table, "raster", &mut config.raster)?;
    set(&table, "mixed_raster", &mut config.mixed_raster)?;
    set(&table, "fast_quadtree", &mut config.fast_quadtree)?;
    set(&table, "show_quadtree", &mut config.show_quadtree)?;
    set(&table, "threads", &mut config.threads)?;

    if let Some(index) = field::<u8>(&table, "color_scheme")? {
        let colors = if index == 3 {
            Some(colormap(&table, directory)?)
        } else {
            None
        };
        config.color_scheme = ColorScheme::from_index(index, colors)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(text: &str) -> Result<RenderConfig> {
        parse_config(text, Path::new("."), RenderConfig::default())
    }

    #[test]
    fn empty_file_keeps_the_defaults() {
        assert_eq!(parse("\n  \n").unwrap().width, 512);
        let config = parse("").unwrap();
        assert_eq!(config.width, 512);
        assert_eq!(config.color_scheme, ColorScheme::Grayscale);
    }

    #[test]
    fn keys_override_the_defaults() {
        let config = parse(
            "width: 64\nheight: 48\ncenter_real: -0.5\ncenter_imaginary: 0.25\n\
             world_width: 2\nmax_iterations: 300\nsmooth: true\nmixed_raster: true\n\
             color_scheme: 2\nfast_quadtree: false\n",
        )
        .unwrap();
        assert_eq!((config.width, config.height), (64, 48));
        assert_eq!((config.center_real, config.center_imaginary), (-0.5, 0.25));
        assert_eq!(config.world_width, 2.0);
        assert_eq!(config.max_iterations, 300);
        assert!(config.smooth && config.mixed_raster && !config.fast_quadtree);
        assert_eq!(config.color_scheme, ColorScheme::Quilt);
        assert_eq!(config.escape_radius, 2.0);
    }

    #[test]
    fn wrong_types_name_the_key() {
        for (text, key) in &[
            ("width: wide\n", "width"),
            ("accelerated: 3\n", "accelerated"),
            ("height: -4\n", "height"),
            ("world_width: [1, 2]\n", "world_width"),
            ("color_scheme: 1\nmax_iterations: 2.5\n", "max_iterations"),
            ("color_scheme: 3\nbuiltin_colormap: true\ncolormap: 7\n", "colormap"),
        ] {
            match parse(text) {
                Err(Error::ConfigType(found)) => assert_eq!(found, *key),
                other => panic!("{:?}: expected a type error, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn documents_that_are_not_mappings_are_refused() {
        match parse("- 1\n- 2\n") {
            Err(Error::MalformedConfig(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse("width: [1\n") {
            Err(Error::Yaml(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = parse("video: true\nwidth: 20\n").unwrap();
        assert_eq!(config.width, 20);
    }

    #[test]
    fn builtin_colormap() {
        let config = parse("color_scheme: 3\nbuiltin_colormap: true\ncolormap: magma\n").unwrap();
        assert_eq!(
            config.color_scheme,
            ColorScheme::Colormap(Colormap::builtin("magma").unwrap())
        );
        match parse("color_scheme: 3\nbuiltin_colormap: true\ncolormap: plaid\n") {
            Err(Error::UnknownColormap(name)) => assert_eq!(name, "plaid"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn colormap_scheme_needs_its_source() {
        match parse("color_scheme: 3\ncolormap: magma\n") {
            Err(Error::MissingColormapSource) => {}
            other => panic!("unexpected {:?}", other),
        }
        match parse("color_scheme: 3\nbuiltin_colormap: true\n") {
            Err(Error::MissingColormap) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("color_scheme: 7\n").is_err());
    }

    #[test]
    fn colormap_files_are_relative_to_the_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("warm.txt"), "0 0 0\n255 128 0\n").unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "color_scheme: 3\nbuiltin_colormap: false\ncolormap: warm.txt\n",
        )
        .unwrap();
        let run = RunDirectory::open(dir.path()).unwrap();
        let config = run.load_config(RenderConfig::default()).unwrap();
        let expected = Colormap::parse("0 0 0\n255 128 0\n").unwrap();
        assert_eq!(config.color_scheme, ColorScheme::Colormap(expected));
    }

    #[test]
    fn missing_colormap_file_names_the_path() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "color_scheme: 3\nbuiltin_colormap: false\ncolormap: missing.txt\n",
        )
        .unwrap();
        let run = RunDirectory::open(dir.path()).unwrap();
        match run.load_config(RenderConfig::default()) {
            Err(Error::ColormapNotFound(path)) => assert!(path.ends_with("missing.txt")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn directory_without_a_config_keeps_the_base() {
        let dir = tempdir().unwrap();
        let run = RunDirectory::open(dir.path().join("fresh")).unwrap();
        assert!(run.path().is_dir());
        let base = RenderConfig {
            width: 33,
            ..RenderConfig::default()
        };
        assert_eq!(run.load_config(base).unwrap().width, 33);
        assert_eq!(run.image_file(), dir.path().join("fresh").join(IMAGE_FILE));
    }

    #[test]
    fn numbered_directories_take_the_next_free_number() {
        let dir = tempdir().unwrap();
        let first = RunDirectory::create_numbered(dir.path()).unwrap();
        let second = RunDirectory::create_numbered(dir.path()).unwrap();
        assert_eq!(first.path(), dir.path().join("Mandelbrot_run0").as_path());
        assert_eq!(second.path(), dir.path().join("Mandelbrot_run1").as_path());
    }
}
