use crate::error::{DebugError, Result};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Launch arguments as a debugging front end sends them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Toy-ISA program text. Takes precedence over the Z80 artifacts.
    #[serde(default)]
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub asm: Option<PathBuf>,
    #[serde(default)]
    pub hex: Option<PathBuf>,
    #[serde(default)]
    pub listing: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub artifact_base: Option<String>,
    #[serde(default)]
    pub entry: Option<u16>,
    #[serde(default = "default_stop_on_entry")]
    pub stop_on_entry: bool,
}

fn default_stop_on_entry() -> bool {
    true
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: None,
            asm: None,
            hex: None,
            listing: None,
            output_dir: None,
            artifact_base: None,
            entry: None,
            stop_on_entry: default_stop_on_entry(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub hex: PathBuf,
    pub listing: PathBuf,
}

/// Artifact contents, read and ready to be turned into a machine.
#[derive(Debug, Clone)]
pub enum ProgramSource {
    Tiny {
        path: PathBuf,
        lines: Vec<String>,
    },
    Z80 {
        listing_path: PathBuf,
        listing: String,
        hex: String,
        entry: Option<u16>,
    },
}

fn given(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

/// Work out where the HEX and listing files live.
///
/// Explicit `hex` and `listing` paths win. Otherwise both are derived from
/// the assembler source: `<outputDir>/<artifactBase>.hex|.lst`, where the
/// directory defaults to the source's directory and the base to its stem.
pub fn resolve_artifacts(config: &LaunchConfig) -> Result<ArtifactPaths> {
    if let (Some(hex), Some(listing)) = (given(&config.hex), given(&config.listing)) {
        return Ok(ArtifactPaths {
            hex: hex.to_path_buf(),
            listing: listing.to_path_buf(),
        });
    }

    let asm = given(&config.asm).ok_or_else(|| DebugError::InvalidLaunch {
        message: "Z80 runtime requires \"asm\" (root asm file) or explicit \"hex\" and \"listing\" paths."
            .to_string(),
    })?;

    let base = match config.artifact_base.as_deref().filter(|b| !b.is_empty()) {
        Some(base) => base.to_string(),
        None => asm
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| DebugError::InvalidLaunch {
                message: format!("Cannot derive artifact name from {}", asm.display()),
            })?,
    };
    let out_dir = match given(&config.output_dir) {
        Some(dir) => dir.to_path_buf(),
        None => asm.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    Ok(ArtifactPaths {
        hex: out_dir.join(format!("{base}.hex")),
        listing: out_dir.join(format!("{base}.lst")),
    })
}

/// Read everything a launch needs from disk.
pub fn load_program(config: &LaunchConfig) -> Result<ProgramSource> {
    if let Some(path) = given(&config.program) {
        let text = read_artifact(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        info!("Read toy program {} ({} lines)", path.display(), lines.len());
        return Ok(ProgramSource::Tiny {
            path: path.to_path_buf(),
            lines,
        });
    }

    let paths = resolve_artifacts(config)?;
    let hex = read_artifact(&paths.hex)?;
    let listing = read_artifact(&paths.listing)?;
    info!(
        "Read Z80 artifacts hex={} listing={}",
        paths.hex.display(),
        paths.listing.display()
    );

    Ok(ProgramSource::Z80 {
        listing_path: paths.listing,
        listing,
        hex,
        entry: config.entry,
    })
}

fn read_artifact(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DebugError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|source| DebugError::Io {
        path: path.to_path_buf(),
        source,
    })
}
