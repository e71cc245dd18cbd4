use log::debug;
use std::collections::HashSet;

/// Machine addresses `continue` must stop in front of.
#[derive(Debug, Default, Clone)]
pub struct Breakpoints {
    points: HashSet<usize>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self {
            points: HashSet::new(),
        }
    }

    pub fn add(&mut self, address: usize) {
        self.points.insert(address);
        debug!("Breakpoint set at address 0x{:04X}", address);
    }

    pub fn contains(&self, address: usize) -> bool {
        self.points.contains(&address)
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<usize> for Breakpoints {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
