use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything the debugger can refuse to do.
///
/// Execution-time mistakes inside a debuggee (bad operands, unknown opcodes)
/// are not errors; machines absorb them and keep stepping.
#[derive(Error, Debug)]
pub enum DebugError {
    #[error("Invalid HEX line: {line}")]
    HexRecord { line: String },

    #[error("Artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid launch configuration: {message}")]
    InvalidLaunch { message: String },

    #[error("No program loaded")]
    NoProgramLoaded,
}

pub type Result<T> = std::result::Result<T, DebugError>;
