//   Copyright 2026 Egor Larionov
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

/**
 * Knitro is distributed under a commercial license, so unlike open source solvers it cannot be
 * downloaded or built here. This build file is responsible for:
 *
 * 1. Locating a local Knitro installation through the `KNITRODIR` environment variable (the same
 *    variable the Knitro installer documents).
 * 2. Emitting the link directives for the shared `knitro` library found there.
 *
 * When no installation is found the crate still compiles (the declarations do not reference the
 * library by themselves) and a warning is emitted. Any binary that actually calls into Knitro will
 * then fail to link.
 */
use std::env;
use std::path::{Path, PathBuf};

const LIBRARY: &str = "knitro";
const INSTALL_ENV: &str = "KNITRODIR";

#[cfg(target_os = "macos")]
static LIB_EXT: &str = "dylib";
#[cfg(target_os = "linux")]
static LIB_EXT: &str = "so";
#[cfg(target_os = "windows")]
static LIB_EXT: &str = "dll";
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
static LIB_EXT: &str = "so";

fn main() {
    println!("cargo:rerun-if-env-changed={}", INSTALL_ENV);

    match find_install_dir() {
        Ok(lib_dir) => link(&lib_dir),
        Err(err) => println!("cargo:warning=knitro-sys: {}; Knitro will not be linked", err),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Error {
    EnvNotSet,
    LibraryNotFound(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::EnvNotSet => write!(f, "{} is not set", INSTALL_ENV),
            Error::LibraryNotFound(dir) => {
                write!(f, "no {} library found in {}", LIBRARY, dir.display())
            }
        }
    }
}

/// Find the directory containing the Knitro shared library.
fn find_install_dir() -> Result<PathBuf, Error> {
    let root = env::var_os(INSTALL_ENV).ok_or(Error::EnvNotSet)?;
    let lib_dir = PathBuf::from(root).join("lib");
    if contains_library(&lib_dir) {
        Ok(lib_dir)
    } else {
        Err(Error::LibraryNotFound(lib_dir))
    }
}

fn contains_library(dir: &Path) -> bool {
    let prefix = if cfg!(target_os = "windows") { "" } else { "lib" };
    let Ok(entries) = dir.read_dir() else {
        return false;
    };
    entries.filter_map(Result::ok).any(|entry| {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        // Versioned libraries such as `libknitro.so.14.0.0` count too.
        name.starts_with(&format!("{}{}", prefix, LIBRARY)) && name.contains(LIB_EXT)
    })
}

fn link(lib_dir: &Path) {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=dylib={}", LIBRARY);
}
