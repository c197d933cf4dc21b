//! Spatial substrate: lattice math, occupancy and scalar fields

pub mod field;
pub mod grid;
pub mod layer;
pub mod neighborhood;
pub mod occupancy;

pub use grid::Grid;
pub use layer::PropertyLayer;
pub use neighborhood::{Lattice, Neighborhood, Topology};
pub use occupancy::SingleGrid;
