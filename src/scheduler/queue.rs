use crate::unit::LoadUnit;
use crate::{LoaderError, Result};

/// Ordered, append-only list of load units
#[derive(Debug, Default)]
pub struct LoadQueue {
    units: Vec<Box<dyn LoadUnit>>,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit at the end
    pub fn append(&mut self, unit: Box<dyn LoadUnit>) {
        self.units.push(unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit at `index` in insertion order
    pub fn get(&self, index: usize) -> Result<&dyn LoadUnit> {
        self.units
            .get(index)
            .map(|unit| unit.as_ref())
            .ok_or(LoaderError::IndexOutOfBounds {
                index,
                len: self.units.len(),
            })
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Result<&mut Box<dyn LoadUnit>> {
        let len = self.units.len();
        self.units
            .get_mut(index)
            .ok_or(LoaderError::IndexOutOfBounds { index, len })
    }

    /// Labels of every unit, in order
    pub fn labels(&self) -> Vec<String> {
        self.units.iter().map(|unit| unit.label()).collect()
    }
}
