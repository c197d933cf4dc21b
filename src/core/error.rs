use thiserror::Error;

use crate::core::types::{AgentId, Pos};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Cell {pos} is already occupied by agent {occupant}")]
    OccupiedCell { pos: Pos, occupant: AgentId },

    #[error("Agent {0} is not placed on the grid")]
    NotPlaced(AgentId),

    #[error("Agent {agent} is already placed at {pos}")]
    AlreadyPlaced { agent: AgentId, pos: Pos },

    #[error("Position {0} is outside the grid")]
    OutOfBounds(Pos),

    #[error("No empty cell available")]
    GridFull,

    #[error("Dimension mismatch in {context}: expected {expected:?} (rows, columns), found {found:?}")]
    DimensionMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Field parse error on line {line}: {token:?} is not a number")]
    FieldParse { line: usize, token: String },

    #[error("Metric {metric} is undefined for an empty population")]
    EmptyPopulation { metric: &'static str },

    #[error("Metric {metric} is undefined: {reason}")]
    UndefinedMetric { metric: &'static str, reason: String },

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Unknown property layer: {0}")]
    UnknownLayer(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl SimError {
    /// True for errors that mean "this metric has no value right now"
    /// rather than a broken invariant.
    pub fn is_undefined_metric(&self) -> bool {
        matches!(
            self,
            SimError::EmptyPopulation { .. } | SimError::UndefinedMetric { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
