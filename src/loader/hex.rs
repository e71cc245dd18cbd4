use crate::error::{DebugError, Result};
use log::{debug, trace};

/// Size of the flat address space a HEX image is loaded into.
pub const MEMORY_SIZE: usize = 0x10000;

const RECORD_DATA: u8 = 0x00;
const RECORD_EOF: u8 = 0x01;
const MIN_RECORD_LEN: usize = 11;

/// Flat 64 KiB memory image built from Intel HEX text.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryImage {
    memory: Box<[u8]>,
    /// Lowest address touched by any data record, 0 if none.
    pub start_address: u16,
    /// One past the highest byte written by a data record, 0 if none.
    pub end_address: usize,
}

impl BinaryImage {
    pub fn empty() -> Self {
        Self {
            memory: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
            start_address: 0,
            end_address: 0,
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn byte(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    /// Writes outside the address space are dropped.
    fn write(&mut self, location: usize, value: u8) -> bool {
        match self.memory.get_mut(location) {
            Some(slot) => {
                *slot = value;
                self.end_address = self.end_address.max(location + 1);
                true
            }
            None => false,
        }
    }
}

impl Default for BinaryImage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parse Intel HEX text into a [`BinaryImage`].
///
/// Only data and end-of-file records are interpreted; any other record type
/// is accepted and skipped. Checksums are not validated.
pub fn parse_intel_hex(content: &str) -> Result<BinaryImage> {
    let mut image = BinaryImage::empty();
    let mut start_address: Option<u16> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !line.starts_with(':') || line.len() < MIN_RECORD_LEN {
            return Err(invalid(line));
        }

        let byte_count = hex_field(line, 1, 2)? as usize;
        let address = hex_field(line, 3, 4)? as u16;
        let record_type = hex_field(line, 7, 2)? as u8;

        if record_type == RECORD_EOF {
            trace!("EOF record reached, ignoring remaining lines");
            break;
        }

        if record_type != RECORD_DATA {
            debug!("Skipping unsupported HEX record type {:02X}", record_type);
            continue;
        }

        start_address = Some(start_address.map_or(address, |s| s.min(address)));

        let payload = &line[9..];
        for i in 0..byte_count {
            let Some(pair) = payload.get(i * 2..i * 2 + 2) else {
                debug!("HEX record truncated after {} of {} bytes: {}", i, byte_count, line);
                break;
            };
            if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid(line));
            }
            let value = u8::from_str_radix(pair, 16).map_err(|_| invalid(line))?;
            let location = address as usize + i;
            if !image.write(location, value) {
                debug!("Dropping out-of-range write at 0x{:X}", location);
            }
        }
    }

    image.start_address = start_address.unwrap_or(0);
    Ok(image)
}

fn hex_field(line: &str, offset: usize, width: usize) -> Result<u32> {
    line.get(offset..offset + width)
        .filter(|field| field.bytes().all(|b| b.is_ascii_hexdigit()))
        .and_then(|field| u32::from_str_radix(field, 16).ok())
        .ok_or_else(|| invalid(line))
}

fn invalid(line: &str) -> DebugError {
    DebugError::HexRecord {
        line: line.to_string(),
    }
}
