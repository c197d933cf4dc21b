//! Dense 2D storage indexed by cell coordinate

use crate::core::types::Pos;

/// Generic row-major 2D grid
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: Clone> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width * height],
        }
    }

    /// Build from rows, `rows[y][x]`. Caller guarantees a rectangular shape.
    pub(crate) fn from_rows(rows: Vec<Vec<T>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let data: Vec<T> = rows.into_iter().flatten().collect();
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: Pos) -> usize {
        pos.y * self.width + pos.x
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&T> {
        if self.contains(pos) {
            Some(&self.data[self.index(pos)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut T> {
        if self.contains(pos) {
            let i = self.index(pos);
            Some(&mut self.data[i])
        } else {
            None
        }
    }

    /// Write a cell; out-of-range writes are ignored and reported as `false`.
    #[inline]
    pub fn set(&mut self, pos: Pos, value: T) -> bool {
        match self.get_mut(pos) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// All coordinates in storage order (row by row)
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        let width = self.width;
        (0..self.width * self.height).map(move |i| Pos::new(i % width, i / width))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, &T)> {
        self.positions().zip(self.data.iter())
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
