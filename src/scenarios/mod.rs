//! Agent policies: one model per scenario

pub mod life;
pub mod segregation;
pub mod sugarscape;

pub use life::{CellState, LifeCell, LifeModel, LifeRule};
pub use segregation::{Group, Resident, SegregationModel};
pub use sugarscape::{Forager, SugarscapeModel, VisionMode};
