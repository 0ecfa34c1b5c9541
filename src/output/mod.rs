//! Diff artifact serialization.
//!
//! A [`DiffSerializer`] writes finished diff results to the configured sink.
//! The strategy is selected by the closed [`OutputFormat`] set and validated
//! at construction: selecting a named-but-unimplemented format fails fast
//! with [`SerializeError::UnsupportedFormat`] instead of silently doing
//! nothing.

pub mod file;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diff::DiffResult;

pub use file::FileSerializer;

/// Fixed name of the per-partition diff artifact.
pub const DIFF_FILE_NAME: &str = "store_to_source.diff";

/// The closed set of output formats.
///
/// `FILE` is implemented; `TEMPFILE` and `STDOUT` are named by the
/// configuration surface and rejected at serializer construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    /// Per-partition diff files under the output directory.
    #[default]
    File,
    /// Temporary-file output (not implemented).
    Tempfile,
    /// Standard-output streaming (not implemented).
    Stdout,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::File => "FILE",
            Self::Tempfile => "TEMPFILE",
            Self::Stdout => "STDOUT",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during diff serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// The selected format has no implementation. Raised at construction.
    #[error("output format {0} is not supported")]
    UnsupportedFormat(OutputFormat),

    /// I/O error while writing an artifact.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes finished diff results to the configured sink.
pub struct DiffSerializer {
    strategy: Strategy,
}

enum Strategy {
    File(FileSerializer),
}

impl DiffSerializer {
    /// Select and validate the output strategy.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError::UnsupportedFormat` for `TEMPFILE` and
    /// `STDOUT`.
    pub fn new(format: OutputFormat, output_dir: &Path) -> Result<Self, SerializeError> {
        match format {
            OutputFormat::File => Ok(Self {
                strategy: Strategy::File(FileSerializer::new(output_dir)),
            }),
            unsupported => Err(SerializeError::UnsupportedFormat(unsupported)),
        }
    }

    /// Write one diff result, returning the artifact path.
    ///
    /// # Errors
    ///
    /// Returns `SerializeError::Io` if the artifact cannot be written.
    pub fn write(&self, diff: &DiffResult) -> Result<PathBuf, SerializeError> {
        match &self.strategy {
            Strategy::File(serializer) => serializer.write(diff),
        }
    }
}
