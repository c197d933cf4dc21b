//! Adjacency and topology arithmetic
//!
//! Pure coordinate math shared by the occupancy grid and property layers.
//! Nothing here knows about agents.

use serde::{Deserialize, Serialize};

use crate::core::types::Pos;

/// Edge behavior of the lattice, fixed at grid creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Coordinates past an edge do not exist
    Bounded,
    /// Coordinates wrap modulo width/height (torus)
    Wrapping,
}

/// Which cells count as adjacent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// 8 surrounding cells at radius 1 (Chebyshev ball)
    Moore,
    /// 4 orthogonal cells at radius 1 (Manhattan ball)
    VonNeumann,
}

impl Neighborhood {
    #[inline]
    fn admits(self, dx: i64, dy: i64, radius: i64) -> bool {
        match self {
            Neighborhood::Moore => dx.abs() <= radius && dy.abs() <= radius,
            Neighborhood::VonNeumann => dx.abs() + dy.abs() <= radius,
        }
    }

    /// Relative offsets within `radius`, `dx` outer and `dy` inner,
    /// the center offset excluded.
    pub fn offsets(self, radius: usize) -> Vec<(i64, i64)> {
        let r = radius as i64;
        let mut out = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                if (dx, dy) != (0, 0) && self.admits(dx, dy, r) {
                    out.push((dx, dy));
                }
            }
        }
        out
    }
}

/// Lattice shape plus topology; does the wrapping/clipping math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    pub width: usize,
    pub height: usize,
    pub topology: Topology,
}

impl Lattice {
    /// Both dimensions must be positive; `SingleGrid::new` checks this and
    /// returns `InvalidConfig` instead.
    pub fn new(width: usize, height: usize, topology: Topology) -> Self {
        debug_assert!(
            width > 0 && height > 0,
            "lattice dimensions must be positive, got {}x{}",
            width,
            height
        );
        Self {
            width,
            height,
            topology,
        }
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Largest radius that can still reach a new cell. Any larger radius
    /// yields the same set of cells.
    pub fn max_useful_radius(&self, kind: Neighborhood) -> usize {
        match kind {
            Neighborhood::Moore => self.width.max(self.height),
            Neighborhood::VonNeumann => self.width + self.height,
        }
    }

    /// Apply an offset, wrapping or clipping per topology
    pub fn offset(&self, pos: Pos, dx: i64, dy: i64) -> Option<Pos> {
        let x = pos.x as i64 + dx;
        let y = pos.y as i64 + dy;
        let (w, h) = (self.width as i64, self.height as i64);
        match self.topology {
            Topology::Bounded => {
                if (0..w).contains(&x) && (0..h).contains(&y) {
                    Some(Pos::new(x as usize, y as usize))
                } else {
                    None
                }
            }
            Topology::Wrapping => Some(Pos::new(x.rem_euclid(w) as usize, y.rem_euclid(h) as usize)),
        }
    }

    /// Cells adjacent to `pos` within `radius`, in offset order.
    ///
    /// On a wrapping lattice smaller than the neighborhood, a cell reachable
    /// through several offsets is returned once, and the center is only
    /// returned when `include_center` is set. Radii past
    /// `max_useful_radius` are clamped to it.
    pub fn neighborhood(
        &self,
        pos: Pos,
        kind: Neighborhood,
        include_center: bool,
        radius: usize,
    ) -> Vec<Pos> {
        let offsets = kind.offsets(radius.min(self.max_useful_radius(kind)));
        let mut out = Vec::with_capacity(offsets.len() + 1);
        if include_center {
            out.push(pos);
        }
        for (dx, dy) in offsets {
            if let Some(p) = self.offset(pos, dx, dy) {
                if p == pos || out.contains(&p) {
                    continue;
                }
                out.push(p);
            }
        }
        out
    }

    /// Axis distance respecting wrap-around
    #[inline]
    fn axis_distance(&self, a: usize, b: usize, len: usize) -> usize {
        let d = a.abs_diff(b);
        match self.topology {
            Topology::Bounded => d,
            Topology::Wrapping => d.min(len - d),
        }
    }

    pub fn manhattan_distance(&self, a: Pos, b: Pos) -> usize {
        self.axis_distance(a.x, b.x, self.width) + self.axis_distance(a.y, b.y, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts() {
        assert_eq!(Neighborhood::Moore.offsets(1).len(), 8);
        assert_eq!(Neighborhood::VonNeumann.offsets(1).len(), 4);
        assert_eq!(Neighborhood::Moore.offsets(2).len(), 24);
        assert_eq!(Neighborhood::VonNeumann.offsets(2).len(), 12);
    }

    #[test]
    fn test_bounded_corner_is_clipped() {
        let lattice = Lattice::new(3, 3, Topology::Bounded);
        let n = lattice.neighborhood(Pos::new(0, 0), Neighborhood::Moore, false, 1);
        assert_eq!(n.len(), 3);
        let n = lattice.neighborhood(Pos::new(0, 0), Neighborhood::VonNeumann, false, 1);
        assert_eq!(n.len(), 2);
    }

    #[test]
    fn test_wrapping_corner_has_full_neighborhood() {
        let lattice = Lattice::new(3, 3, Topology::Wrapping);
        let n = lattice.neighborhood(Pos::new(0, 0), Neighborhood::Moore, false, 1);
        assert_eq!(n.len(), 8);
        assert!(n.contains(&Pos::new(2, 2)));
        assert!(!n.contains(&Pos::new(0, 0)));
    }

    #[test]
    fn test_wrapping_small_grid_dedupes() {
        let lattice = Lattice::new(2, 2, Topology::Wrapping);
        let n = lattice.neighborhood(Pos::new(0, 0), Neighborhood::Moore, false, 1);
        assert_eq!(n.len(), 3);

        let n = lattice.neighborhood(Pos::new(0, 0), Neighborhood::Moore, true, 1);
        assert_eq!(n.len(), 4);
        assert_eq!(n[0], Pos::new(0, 0));
    }

    #[test]
    fn test_oversized_radius_is_clamped() {
        for topology in [Topology::Bounded, Topology::Wrapping] {
            let lattice = Lattice::new(5, 4, topology);
            let pos = Pos::new(2, 1);
            for kind in [Neighborhood::Moore, Neighborhood::VonNeumann] {
                let mut huge = lattice.neighborhood(pos, kind, false, usize::MAX / 2);
                huge.sort();
                let mut all: Vec<Pos> = (0..4)
                    .flat_map(|y| (0..5).map(move |x| Pos::new(x, y)))
                    .filter(|&p| p != pos)
                    .collect();
                all.sort();
                assert_eq!(huge, all, "{:?} {:?}", topology, kind);
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "lattice dimensions must be positive")]
    fn test_zero_sized_lattice_rejected() {
        let _ = Lattice::new(0, 3, Topology::Wrapping);
    }

    #[test]
    fn test_manhattan_wraps() {
        let bounded = Lattice::new(10, 10, Topology::Bounded);
        let torus = Lattice::new(10, 10, Topology::Wrapping);
        let a = Pos::new(0, 0);
        let b = Pos::new(9, 9);
        assert_eq!(bounded.manhattan_distance(a, b), 18);
        assert_eq!(torus.manhattan_distance(a, b), 2);
    }
}
