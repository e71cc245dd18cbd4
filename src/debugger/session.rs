use super::breakpoints::Breakpoints;
use super::stepping::HaltState;
use crate::error::Result;
use crate::loader::{parse_intel_hex, parse_listing, AddressMap, ProgramSource};
use crate::machine::{validate_program, Machine, TinyCpu, Z80Cpu};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    Tiny,
    Z80,
}

/// Everything one loaded program owns.
///
/// A reload builds a fresh `Session` and swaps it in whole, so a half
/// replaced machine or breakpoint set is never visible.
pub struct Session {
    pub(super) machine: Box<dyn Machine>,
    pub(super) address_map: AddressMap,
    pub(super) source_path: PathBuf,
    pub(super) kind: MachineKind,
    pub(super) breakpoints: Breakpoints,
    pub(super) halt: HaltState,
    /// Set while stopped on a breakpoint, so `continue` can leave it.
    pub(super) parked_at: Option<usize>,
    pub(super) diagnostics: Vec<String>,
}

impl Session {
    pub fn from_source(source: ProgramSource) -> Result<Self> {
        match source {
            ProgramSource::Tiny { path, lines } => {
                let diagnostics = validate_program(&lines);
                for diagnostic in &diagnostics {
                    warn!("{}: {}", path.display(), diagnostic);
                }
                info!("Loaded toy program {} ({} lines)", path.display(), lines.len());
                Ok(Self::new(
                    Box::new(TinyCpu::new(&lines)),
                    AddressMap::identity(lines.len()),
                    path,
                    MachineKind::Tiny,
                    diagnostics,
                ))
            }
            ProgramSource::Z80 {
                listing_path,
                listing,
                hex,
                entry,
            } => {
                let image = parse_intel_hex(&hex)?;
                let address_map = parse_listing(&listing);
                let cpu = Z80Cpu::new(image, entry);
                info!(
                    "Loaded Z80 image: entry 0x{:04X}, {} mapped listing lines",
                    cpu.entry(),
                    address_map.len()
                );
                Ok(Self::new(
                    Box::new(cpu),
                    address_map,
                    listing_path,
                    MachineKind::Z80,
                    Vec::new(),
                ))
            }
        }
    }

    fn new(
        machine: Box<dyn Machine>,
        address_map: AddressMap,
        source_path: PathBuf,
        kind: MachineKind,
        diagnostics: Vec<String>,
    ) -> Self {
        Self {
            machine,
            address_map,
            source_path,
            kind,
            breakpoints: Breakpoints::new(),
            halt: HaltState::Running,
            parked_at: None,
            diagnostics,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    pub fn address_map(&self) -> &AddressMap {
        &self.address_map
    }

    pub fn machine(&self) -> &dyn Machine {
        self.machine.as_ref()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn halt_state(&self) -> HaltState {
        self.halt
    }
}
