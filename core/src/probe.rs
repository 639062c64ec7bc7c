//! Pixel dimension probing.
//!
//! Dimensions come from an external metadata tool (ImageMagick's
//! `identify` by default) rather than decoding images in-process. Every
//! failure mode collapses to `None` so a bad file never aborts a run.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default program used by [`IdentifyProbe`].
pub const IDENTIFY_PROGRAM: &str = "identify";

/// One `WIDTH HEIGHT` line per frame; only the first is read.
const IDENTIFY_FORMAT: &str = "%w %h\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Anything that can report the pixel size of a file.
pub trait DimensionSource {
    fn probe(&self, path: &Path) -> Option<Dimensions>;
}

impl<T: DimensionSource + ?Sized> DimensionSource for &T {
    fn probe(&self, path: &Path) -> Option<Dimensions> {
        (**self).probe(path)
    }
}

/// Shells out to `identify -format "%w %h\n" <path>`.
#[derive(Debug, Clone)]
pub struct IdentifyProbe {
    program: PathBuf,
}

impl Default for IdentifyProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifyProbe {
    pub fn new() -> Self {
        Self::with_program(IDENTIFY_PROGRAM)
    }

    /// Uses another program with the same argument and output contract.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DimensionSource for IdentifyProbe {
    fn probe(&self, path: &Path) -> Option<Dimensions> {
        let output = match Command::new(&self.program)
            .arg("-format")
            .arg(IDENTIFY_FORMAT)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
        {
            Ok(output) => output,
            Err(error) => {
                tracing::debug!(
                    program = %self.program.display(),
                    path = %path.display(),
                    %error,
                    "failed to run dimension probe"
                );
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                path = %path.display(),
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "dimension probe exited unsuccessfully"
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let dimensions = parse_dimensions(&stdout);
        if dimensions.is_none() {
            tracing::debug!(
                path = %path.display(),
                output = %stdout.trim(),
                "unparseable probe output"
            );
        }
        dimensions
    }
}

/// Parses the first line of probe output as `WIDTH HEIGHT`.
///
/// Extra tokens after the first two are ignored. Zero and non-integer
/// values are rejected.
pub fn parse_dimensions(output: &str) -> Option<Dimensions> {
    let first_line = output.trim().lines().next()?;
    let mut tokens = first_line.split_whitespace();
    let width: u32 = tokens.next()?.parse().ok()?;
    let height: u32 = tokens.next()?.parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Dimensions::new(width, height))
}

/// In-memory dimensions keyed by file name.
///
/// Keying by name rather than full path means a file keeps its size after
/// being moved between the main and quarantine directories.
#[derive(Debug, Clone, Default)]
pub struct StaticDimensions {
    entries: FxHashMap<OsString, Dimensions>,
}

impl StaticDimensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file_name: impl AsRef<OsStr>, width: u32, height: u32) -> Self {
        self.insert(file_name, width, height);
        self
    }

    pub fn insert(&mut self, file_name: impl AsRef<OsStr>, width: u32, height: u32) {
        self.entries.insert(
            file_name.as_ref().to_os_string(),
            Dimensions::new(width, height),
        );
    }
}

impl DimensionSource for StaticDimensions {
    fn probe(&self, path: &Path) -> Option<Dimensions> {
        path.file_name()
            .and_then(|name| self.entries.get(name))
            .copied()
    }
}
