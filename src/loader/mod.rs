mod artifacts;
mod hex;
mod listing;

pub use artifacts::{load_program, resolve_artifacts, ArtifactPaths, LaunchConfig, ProgramSource};
pub use hex::{parse_intel_hex, BinaryImage, MEMORY_SIZE};
pub use listing::{parse_listing, AddressMap};
