/*
 *  dmd/matrix/loader.rs
 *
 *  rgbdmd - pixels out the door
 *  (c) 2020-26 Stuart Hunter
 *
 *  Finds and opens librgbmatrix at runtime
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use log::{debug, info};

use super::ffi::{
    CanvasClearFn,
    CanvasSizeFn,
    CreateFromOptionsFn,
    CreateOffscreenCanvasFn,
    GetBrightnessFn,
    MatrixDeleteFn,
    SetBrightnessFn,
    SetPixelFn,
    SwapOnVsyncFn,
};
use super::native::NativePanel;
use super::options::MatrixOptions;
use super::{MatrixDriver, MatrixPanel};
use crate::dmd::error::DmdError;

/// Environment override, either a directory or the library file itself
pub const LIBRARY_PATH_ENV: &str = "RGBDMD_MATRIX_LIB";

/// Library file names, most specific first
pub const LIBRARY_FILENAMES: &[&str] = &["librgbmatrix.so.1", "librgbmatrix.so"];

/// Entry points resolved from the library.
///
/// Plain function pointers, valid only while the owning [`Library`] is
/// loaded; both live together in [`LoadedLibrary`].
#[derive(Clone, Copy)]
pub(crate) struct MatrixApi {
    pub create: CreateFromOptionsFn,
    pub delete: MatrixDeleteFn,
    pub create_offscreen_canvas: CreateOffscreenCanvasFn,
    pub swap_on_vsync: SwapOnVsyncFn,
    pub set_brightness: SetBrightnessFn,
    pub get_brightness: GetBrightnessFn,
    pub canvas_size: CanvasSizeFn,
    pub set_pixel: SetPixelFn,
    pub clear: CanvasClearFn,
}

pub(crate) struct LoadedLibrary {
    pub api: MatrixApi,
    pub path: PathBuf,

    /// The loaded shared library (must be kept alive)
    #[allow(dead_code)]
    library: Library,
}

/// The native matrix library, shared by every panel created from it
#[derive(Clone)]
pub struct MatrixLibrary {
    inner: Arc<LoadedLibrary>,
}

impl std::fmt::Debug for MatrixLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixLibrary").field("path", &self.inner.path).finish()
    }
}

impl MatrixLibrary {
    /// Directories searched for the library, in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable override
        if let Ok(path) = std::env::var(LIBRARY_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }

        // 2. Source checkout next to the working directory
        paths.push(PathBuf::from("./rpi-rgb-led-matrix/lib"));

        // 3. User-local
        if let Some(home) = dirs_next::home_dir() {
            paths.push(home.join(".local/lib"));
        }

        // 4. System directories
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/usr/lib"));

        paths
    }

    /// Concrete files to try for the given search paths.
    ///
    /// A search path naming a file is taken as is.
    pub fn candidates(search_paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in search_paths {
            if path.is_file() {
                files.push(path.clone());
                continue;
            }
            for name in LIBRARY_FILENAMES {
                files.push(path.join(name));
            }
        }
        files
    }

    /// Find and load the library from the usual places.
    ///
    /// Known locations are tried first, then the plain file names through
    /// the system loader (`ld.so.conf`, `LD_LIBRARY_PATH`).
    pub fn locate() -> Result<Self, DmdError> {
        Self::locate_in(&Self::search_paths(), true)
    }

    /// Find and load the library from `search_paths` only, optionally
    /// falling back to the system loader.
    ///
    /// The error lists every file tried.
    pub fn locate_in(search_paths: &[PathBuf], system_loader: bool) -> Result<Self, DmdError> {
        let mut searched = Vec::new();

        for file in Self::candidates(search_paths) {
            if file.exists() {
                debug!("Found matrix library at: {}", file.display());
                return Self::load(&file);
            }
            searched.push(file);
        }

        if system_loader {
            for name in LIBRARY_FILENAMES {
                // SAFETY: librgbmatrix has no load-time initialisers with side effects
                match unsafe { Library::new(name) } {
                    Ok(library) => return Self::from_library(library, PathBuf::from(name)),
                    Err(e) => {
                        debug!("system loader could not open {}: {}", name, e);
                        searched.push(PathBuf::from(name));
                    }
                }
            }
        }

        Err(DmdError::LibraryMissing { searched })
    }

    /// Load the library from a specific file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DmdError> {
        let path = path.as_ref();
        // SAFETY: as in locate_in()
        let library = unsafe { Library::new(path) }.map_err(|e| {
            debug!("failed to load {}: {}", path.display(), e);
            DmdError::LibraryMissing { searched: vec![path.to_path_buf()] }
        })?;
        Self::from_library(library, path.to_path_buf())
    }

    fn from_library(library: Library, path: PathBuf) -> Result<Self, DmdError> {
        let api = MatrixApi {
            create: symbol(&library, "led_matrix_create_from_options_and_rt_options")?,
            delete: symbol(&library, "led_matrix_delete")?,
            create_offscreen_canvas: symbol(&library, "led_matrix_create_offscreen_canvas")?,
            swap_on_vsync: symbol(&library, "led_matrix_swap_on_vsync")?,
            set_brightness: symbol(&library, "led_matrix_set_brightness")?,
            get_brightness: symbol(&library, "led_matrix_get_brightness")?,
            canvas_size: symbol(&library, "led_canvas_get_size")?,
            set_pixel: symbol(&library, "led_canvas_set_pixel")?,
            clear: symbol(&library, "led_canvas_clear")?,
        };
        info!("Loaded matrix library from: {}", path.display());

        Ok(Self { inner: Arc::new(LoadedLibrary { api, path, library }) })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

// Copy a function pointer out of the library; the caller keeps the library alive
fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, DmdError> {
    let mut c_name = Vec::with_capacity(name.len() + 1);
    c_name.extend_from_slice(name.as_bytes());
    c_name.push(0);

    // SAFETY: T is one of the ffi fn types matching the C declaration of `name`
    let sym: Symbol<T> = unsafe { library.get(&c_name) }.map_err(|e| DmdError::MissingSymbol {
        symbol: name,
        reason: e.to_string(),
    })?;
    Ok(*sym)
}

impl MatrixDriver for MatrixLibrary {
    fn describe(&self) -> String {
        self.inner.path.display().to_string()
    }

    fn create_panel(&self, options: &MatrixOptions) -> Result<Box<dyn MatrixPanel>, DmdError> {
        let panel = NativePanel::create(Arc::clone(&self.inner), options)?;
        Ok(Box::new(panel))
    }
}
