//! Exclusive-occupancy grid
//!
//! Each cell holds at most one agent. The grid keeps both directions of the
//! binding (cell -> agent and agent -> cell) and every mutating operation
//! checks its preconditions before touching either map, so a failed call
//! leaves the grid unchanged.

use ahash::AHashMap;

use crate::core::error::{Result, SimError};
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, Pos};
use crate::spatial::grid::Grid;
use crate::spatial::layer::PropertyLayer;
use crate::spatial::neighborhood::{Lattice, Neighborhood, Topology};

/// Fixed-size lattice with exclusive occupancy and named property layers
#[derive(Debug, Clone)]
pub struct SingleGrid {
    lattice: Lattice,
    cells: Grid<Option<AgentId>>,
    positions: AHashMap<AgentId, Pos>,
    layers: AHashMap<String, PropertyLayer>,
}

impl SingleGrid {
    pub fn new(width: usize, height: usize, topology: Topology) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            lattice: Lattice::new(width, height, topology),
            cells: Grid::new(width, height, None),
            positions: AHashMap::new(),
            layers: AHashMap::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.lattice.width
    }

    pub fn height(&self) -> usize {
        self.lattice.height
    }

    pub fn topology(&self) -> Topology {
        self.lattice.topology
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.lattice.contains(pos)
    }

    fn check_bounds(&self, pos: Pos) -> Result<()> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(SimError::OutOfBounds(pos))
        }
    }

    // === OCCUPANCY QUERIES ===

    pub fn agent_at(&self, pos: Pos) -> Option<AgentId> {
        self.cells.get(pos).copied().flatten()
    }

    pub fn is_cell_empty(&self, pos: Pos) -> bool {
        self.contains(pos) && self.agent_at(pos).is_none()
    }

    pub fn position_of(&self, agent: AgentId) -> Option<Pos> {
        self.positions.get(&agent).copied()
    }

    pub fn occupied_count(&self) -> usize {
        self.positions.len()
    }

    pub fn empty_count(&self) -> usize {
        self.lattice.cell_count() - self.positions.len()
    }

    /// Empty cells in row-major order
    pub fn empty_cells(&self) -> Vec<Pos> {
        self.cells
            .iter()
            .filter(|(_, slot)| slot.is_none())
            .map(|(pos, _)| pos)
            .collect()
    }

    /// All coordinates in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        self.cells.positions()
    }

    /// Occupied cells and their agents, row-major
    pub fn occupants(&self) -> impl Iterator<Item = (Pos, AgentId)> + '_ {
        self.cells
            .iter()
            .filter_map(|(pos, slot)| slot.map(|agent| (pos, agent)))
    }

    // === PLACEMENT ===

    /// Bind `agent` to the empty cell `pos`
    pub fn place(&mut self, agent: AgentId, pos: Pos) -> Result<()> {
        self.check_bounds(pos)?;
        if let Some(current) = self.position_of(agent) {
            return Err(SimError::AlreadyPlaced { agent, pos: current });
        }
        if let Some(occupant) = self.agent_at(pos) {
            return Err(SimError::OccupiedCell { pos, occupant });
        }
        self.cells.set(pos, Some(agent));
        self.positions.insert(agent, pos);
        Ok(())
    }

    /// Clear the agent's binding, returning the cell it held
    pub fn remove(&mut self, agent: AgentId) -> Result<Pos> {
        let pos = self
            .positions
            .remove(&agent)
            .ok_or(SimError::NotPlaced(agent))?;
        self.cells.set(pos, None);
        Ok(pos)
    }

    /// Move a placed agent to the empty cell `to`. Moving onto its own cell is a no-op.
    pub fn move_to(&mut self, agent: AgentId, to: Pos) -> Result<()> {
        self.check_bounds(to)?;
        let from = self.position_of(agent).ok_or(SimError::NotPlaced(agent))?;
        if from == to {
            return Ok(());
        }
        if let Some(occupant) = self.agent_at(to) {
            return Err(SimError::OccupiedCell { pos: to, occupant });
        }
        self.cells.set(from, None);
        self.cells.set(to, Some(agent));
        self.positions.insert(agent, to);
        Ok(())
    }

    /// Move a placed agent to a uniformly chosen empty cell.
    ///
    /// Fails with `GridFull` when no empty cell exists; the agent then stays where it was.
    pub fn move_to_random_empty(&mut self, agent: AgentId, rng: &mut RandomSource) -> Result<Pos> {
        if self.position_of(agent).is_none() {
            return Err(SimError::NotPlaced(agent));
        }
        let empties = self.empty_cells();
        let target = *rng.choose(&empties).ok_or(SimError::GridFull)?;
        self.move_to(agent, target)?;
        tracing::trace!("Agent {} relocated to {}", agent, target);
        Ok(target)
    }

    /// Place an unplaced agent on a uniformly chosen empty cell
    pub fn place_at_random_empty(&mut self, agent: AgentId, rng: &mut RandomSource) -> Result<Pos> {
        if let Some(current) = self.position_of(agent) {
            return Err(SimError::AlreadyPlaced { agent, pos: current });
        }
        let empties = self.empty_cells();
        let target = *rng.choose(&empties).ok_or(SimError::GridFull)?;
        self.place(agent, target)?;
        Ok(target)
    }

    // === NEIGHBORHOOD QUERIES ===

    /// Cells around `pos` (occupied or not)
    pub fn neighborhood(
        &self,
        pos: Pos,
        kind: Neighborhood,
        include_center: bool,
        radius: usize,
    ) -> Result<Vec<Pos>> {
        self.check_bounds(pos)?;
        Ok(self.lattice.neighborhood(pos, kind, include_center, radius))
    }

    /// Agents occupying the cells around `pos`, in neighborhood order
    pub fn neighbors(
        &self,
        pos: Pos,
        kind: Neighborhood,
        include_center: bool,
        radius: usize,
    ) -> Result<Vec<AgentId>> {
        Ok(self
            .neighborhood(pos, kind, include_center, radius)?
            .into_iter()
            .filter_map(|p| self.agent_at(p))
            .collect())
    }

    pub fn manhattan_distance(&self, a: Pos, b: Pos) -> usize {
        self.lattice.manhattan_distance(a, b)
    }

    // === PROPERTY LAYERS ===

    /// Attach a layer; its shape must equal the grid's
    pub fn add_property_layer(&mut self, layer: PropertyLayer) -> Result<()> {
        let expected = (self.height(), self.width());
        if layer.shape() != expected {
            return Err(SimError::DimensionMismatch {
                context: format!("layer {}", layer.name()),
                expected,
                found: layer.shape(),
            });
        }
        self.layers.insert(layer.name().to_string(), layer);
        Ok(())
    }

    pub fn property_layer(&self, name: &str) -> Result<&PropertyLayer> {
        self.layers
            .get(name)
            .ok_or_else(|| SimError::UnknownLayer(name.to_string()))
    }

    pub fn property_layer_mut(&mut self, name: &str) -> Result<&mut PropertyLayer> {
        self.layers
            .get_mut(name)
            .ok_or_else(|| SimError::UnknownLayer(name.to_string()))
    }

    /// Check both directions of the binding agree. Used by tests and debug runs.
    pub fn is_consistent(&self) -> bool {
        let forward = self
            .positions
            .iter()
            .all(|(&agent, &pos)| self.agent_at(pos) == Some(agent));
        forward && self.occupants().count() == self.positions.len()
    }
}
