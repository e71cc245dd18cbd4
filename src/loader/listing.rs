use std::collections::HashMap;

/// Bidirectional mapping between 1-based source lines and machine addresses.
///
/// Both directions keep the first occurrence of a key; later duplicates
/// (macro expansions, repeated origins) are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressMap {
    line_to_address: HashMap<usize, usize>,
    address_to_line: HashMap<usize, usize>,
}

impl AddressMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map where line `n` executes at index `n - 1`, used for line-oriented
    /// programs whose program counter is the line index.
    pub fn identity(line_count: usize) -> Self {
        let mut map = Self::new();
        for index in 0..line_count {
            map.insert(index + 1, index);
        }
        map
    }

    pub fn insert(&mut self, line: usize, address: usize) {
        self.line_to_address.entry(line).or_insert(address);
        self.address_to_line.entry(address).or_insert(line);
    }

    pub fn address_for_line(&self, line: usize) -> Option<usize> {
        self.line_to_address.get(&line).copied()
    }

    pub fn line_for_address(&self, address: usize) -> Option<usize> {
        self.address_to_line.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.line_to_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_to_address.is_empty()
    }
}

/// Scan an assembler listing for lines that start with a four digit hex
/// address field followed by whitespace.
pub fn parse_listing(content: &str) -> AddressMap {
    let mut map = AddressMap::new();
    for (idx, line) in content.lines().enumerate() {
        if let Some(address) = leading_address(line) {
            map.insert(idx + 1, address);
        }
    }
    map
}

fn leading_address(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    if bytes.len() < 5 || !bytes[..4].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    // The field must be exactly four digits wide.
    if !(bytes[4] as char).is_ascii_whitespace() {
        return None;
    }
    usize::from_str_radix(&line[..4], 16).ok()
}
