//! Replays missing log lines to the downstream ingester.
//!
//! One outbound TCP stream per reload session: every diff artifact under the
//! input directory is read in sorted order and its newline-terminated lines
//! are sent sequentially. The connection is closed once the sources are
//! exhausted. Any transport error aborts the whole reload; there is no
//! partial-resume.

use std::fs;
use std::io::{self, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use walkdir::WalkDir;

use crate::output::OutputFormat;

/// Connect timeout for the ingester endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur during a reload session.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The selected input format has no implementation.
    #[error("input format {0} is not supported")]
    UnsupportedFormat(OutputFormat),

    /// The ingester endpoint could not be resolved or reached.
    #[error("failed to connect to ingester at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A diff artifact could not be read.
    #[error("failed to read diff artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The transport failed mid-session; the reload is aborted.
    #[error("failed to send lines from {path}: {source}")]
    Send {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input directory could not be traversed.
    #[error("failed to read input directory {path}: {source}")]
    InputDirIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Statistics from one reload session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReloadStats {
    /// Artifacts read.
    pub files: usize,
    /// Lines sent.
    pub lines: usize,
}

/// Streams diff artifacts to the downstream ingester, line by line.
pub struct LogsReloader {
    host: String,
    port: u16,
    input_dir: PathBuf,
}

impl LogsReloader {
    /// Create a reloader for `host:port` reading artifacts from `input_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::UnsupportedFormat` if `input_format` is not
    /// `FILE`; the check happens here, at construction, never mid-session.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        input_dir: &Path,
        input_format: OutputFormat,
    ) -> Result<Self, ReloadError> {
        if input_format != OutputFormat::File {
            return Err(ReloadError::UnsupportedFormat(input_format));
        }

        Ok(Self {
            host: host.into(),
            port,
            input_dir: input_dir.to_path_buf(),
        })
    }

    /// Connect and send every artifact line in source order.
    ///
    /// # Errors
    ///
    /// Any connect, read, or send failure aborts the session.
    pub fn reload(&self) -> Result<ReloadStats, ReloadError> {
        let paths = self.artifact_paths()?;
        if paths.is_empty() {
            log::info!(
                "No diff artifacts under {}, nothing to reload",
                self.input_dir.display()
            );
            return Ok(ReloadStats::default());
        }

        let addr = format!("{}:{}", self.host, self.port);
        log::debug!("Connecting to ingester at {}", addr);

        let mut stream = connect(&addr)?;
        let mut stats = ReloadStats::default();

        for path in paths {
            let content = fs::read_to_string(&path).map_err(|e| ReloadError::Read {
                path: path.clone(),
                source: e,
            })?;

            for line in content.split_inclusive('\n') {
                stream
                    .write_all(line.as_bytes())
                    .map_err(|e| ReloadError::Send {
                        path: path.clone(),
                        source: e,
                    })?;
                stats.lines += 1;
            }
            stats.files += 1;
            log::debug!("Replayed {}", path.display());
        }

        stream.flush().map_err(|e| ReloadError::Send {
            path: self.input_dir.clone(),
            source: e,
        })?;
        // Dropping the stream closes the connection.

        log::info!(
            "Reloaded {} lines from {} artifacts",
            stats.lines,
            stats.files
        );
        Ok(stats)
    }

    /// Every regular file under the input directory, in sorted order.
    fn artifact_paths(&self) -> Result<Vec<PathBuf>, ReloadError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.input_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ReloadError::InputDirIo {
                path: self.input_dir.clone(),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("walk error")),
            })?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

fn connect(addr: &str) -> Result<TcpStream, ReloadError> {
    let resolved = {
        use std::net::ToSocketAddrs;
        addr.to_socket_addrs()
            .map_err(|e| ReloadError::Connect {
                addr: addr.to_string(),
                source: e,
            })?
            .next()
            .ok_or_else(|| ReloadError::Connect {
                addr: addr.to_string(),
                source: io::Error::other("address resolved to nothing"),
            })?
    };

    TcpStream::connect_timeout(&resolved, CONNECT_TIMEOUT).map_err(|e| ReloadError::Connect {
        addr: addr.to_string(),
        source: e,
    })
}
