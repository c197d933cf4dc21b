//! Property layers: one scalar per cell, independent of occupancy
//!
//! Values are stored as `f64`; integer-valued fields (counts, capacities)
//! are represented exactly.

use crate::core::error::{Result, SimError};
use crate::core::types::Pos;
use crate::spatial::grid::Grid;

/// Named scalar field with the same dimensions as its grid
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyLayer {
    name: String,
    values: Grid<f64>,
}

impl PropertyLayer {
    pub fn new(name: impl Into<String>, width: usize, height: usize, default: f64) -> Self {
        Self {
            name: name.into(),
            values: Grid::new(width, height, default),
        }
    }

    /// Build a layer by evaluating `f` at every cell
    pub fn from_fn(
        name: impl Into<String>,
        width: usize,
        height: usize,
        f: impl Fn(Pos) -> f64,
    ) -> Self {
        let mut values = Grid::new(width, height, 0.0);
        for pos in values.positions().collect::<Vec<_>>() {
            values.set(pos, f(pos));
        }
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a layer from a field indexed `rows[y][x]`.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let name = name.into();
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(SimError::DimensionMismatch {
                context: format!("layer {}", name),
                expected: (height, width),
                found: (height, bad.len()),
            });
        }
        Ok(Self {
            name,
            values: Grid::from_rows(rows),
        })
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.values.width
    }

    pub fn height(&self) -> usize {
        self.values.height
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.values.height, self.values.width)
    }

    pub fn get(&self, pos: Pos) -> Result<f64> {
        self.values
            .get(pos)
            .copied()
            .ok_or(SimError::OutOfBounds(pos))
    }

    pub fn set(&mut self, pos: Pos, value: f64) -> Result<()> {
        if self.values.set(pos, value) {
            Ok(())
        } else {
            Err(SimError::OutOfBounds(pos))
        }
    }

    /// Replace a cell's value with `f(old)`, returning the old value
    pub fn modify(&mut self, pos: Pos, f: impl FnOnce(f64) -> f64) -> Result<f64> {
        let slot = self.values.get_mut(pos).ok_or(SimError::OutOfBounds(pos))?;
        let old = *slot;
        *slot = f(old);
        Ok(old)
    }

    /// Read a cell and zero it, returning what was there
    pub fn take(&mut self, pos: Pos) -> Result<f64> {
        self.modify(pos, |_| 0.0)
    }

    /// Elementwise `value = min(value + delta, upper)`
    pub fn add_clamped(&mut self, delta: f64, upper: &PropertyLayer) -> Result<()> {
        if upper.shape() != self.shape() {
            return Err(SimError::DimensionMismatch {
                context: format!("clamping {} by {}", self.name, upper.name),
                expected: self.shape(),
                found: upper.shape(),
            });
        }
        for (v, cap) in self.values.values_mut().iter_mut().zip(upper.values.values()) {
            *v = (*v + delta).min(*cap);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, f64)> + '_ {
        self.values.iter().map(|(p, v)| (p, *v))
    }

    pub fn sum(&self) -> f64 {
        self.values.values().iter().sum()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.values().iter().copied().reduce(f64::max)
    }
}
