//! Wrapper around the GDAL `ogr2ogr` command-line tool.
//!
//! Only one conversion is needed: any vector format GDAL can read into a
//! GeoJSON file. The tool is treated as a black box that either writes the
//! output file and exits with status 0, or fails.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, WpsError};

/// Program name looked up on `PATH` when no explicit path is configured.
pub const DEFAULT_PROGRAM: &str = "ogr2ogr";

/// Synchronous `ogr2ogr` invoker.
#[derive(Debug, Clone)]
pub struct Ogr2Ogr {
    program: PathBuf,
}

impl Ogr2Ogr {
    /// Use `program` instead of the `ogr2ogr` found on `PATH`.
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// The program that will be executed.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Convert `input` to GeoJSON, writing the result to `output`.
    ///
    /// Runs `<program> -f geojson <output> <input>` and waits for it.
    ///
    /// # Errors
    ///
    /// - [`WpsError::ConverterUnavailable`] if the program cannot be started
    /// - [`WpsError::ConversionFailed`] if it exits with a non-zero status;
    ///   the error carries the captured stderr
    pub fn to_geojson(&self, input: &Path, output: &Path) -> Result<()> {
        let args: [OsString; 4] = ["-f".into(), "geojson".into(), output.into(), input.into()];

        tracing::debug!(
            program = %self.program.display(),
            input = %input.display(),
            output = %output.display(),
            "Running conversion"
        );

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| WpsError::ConverterUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            tracing::warn!(
                program = %self.program.display(),
                status = %result.status,
                stderr = %stderr,
                "Conversion failed"
            );
            return Err(WpsError::ConversionFailed {
                program: self.program.display().to_string(),
                status: result.status.to_string(),
                stderr,
            });
        }

        Ok(())
    }

    /// Ask the program for its version string.
    ///
    /// Used at startup to warn early when GDAL is not installed.
    pub fn version(&self) -> Result<String> {
        let result = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|source| WpsError::ConverterUnavailable {
                program: self.program.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(WpsError::ConversionFailed {
                program: self.program.display().to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&result.stdout).trim().to_string())
    }
}

impl Default for Ogr2Ogr {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}
