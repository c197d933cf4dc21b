//! Resource foraging on a capacity landscape
//!
//! The grid carries a `sugar` layer bounded by a static capacity map. A step
//! regrows the layer, then runs three shuffled phases: move to the richest
//! visible empty cell, harvest and metabolize, and starve. Moves take effect
//! immediately, so later movers see earlier movers' cells as taken.

use serde::{Deserialize, Serialize};

use crate::core::config::SugarscapeConfig;
use crate::core::error::{Result, SimError};
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, Pos, Step};
use crate::simulation::agent_set::AgentSet;
use crate::simulation::metrics::{gini, MetricCollector, MetricRecord};
use crate::simulation::scheduler::{invoke, Model, Order};
use crate::spatial::field::{load_field, two_peaks, DEFAULT_PEAK_CAPACITY};
use crate::spatial::layer::PropertyLayer;
use crate::spatial::neighborhood::{Neighborhood, Topology};
use crate::spatial::occupancy::SingleGrid;

/// Name of the regrowing resource layer on the grid
pub const SUGAR_LAYER: &str = "sugar";

/// Ray directions in scan order: N, E, S, W
const RAYS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Which cells an agent can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionMode {
    /// The four orthogonal rays up to `vision` cells
    Rays,
    /// Every cell within Manhattan distance `vision`
    Diamond,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forager {
    /// Accumulated resource stock
    pub sugar: f64,
    /// Resource burned per step
    pub metabolism: f64,
    pub vision: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SugarscapePhase {
    Move,
    GatherAndEat,
    SeeIfDie,
}

pub struct SugarscapeModel {
    config: SugarscapeConfig,
    grid: SingleGrid,
    agents: AgentSet<Forager>,
    /// Upper bound for every cell of the sugar layer; never changes
    capacity: PropertyLayer,
    rng: RandomSource,
    steps: Step,
    collector: MetricCollector<SugarscapeModel>,
    record: MetricRecord,
}

impl SugarscapeModel {
    /// Build from config: capacity from `config.map` if set, otherwise the
    /// default two-peak landscape.
    pub fn new(config: SugarscapeConfig) -> Result<Self> {
        config.validate()?;
        let capacity = match &config.map {
            Some(path) => load_field("capacity", path, config.width, config.height)?,
            None => two_peaks(
                "capacity",
                config.width,
                config.height,
                DEFAULT_PEAK_CAPACITY,
            ),
        };
        Self::with_capacity(config, capacity)
    }

    /// Build on an explicit capacity map. The sugar layer starts full.
    pub fn with_capacity(config: SugarscapeConfig, capacity: PropertyLayer) -> Result<Self> {
        config.validate()?;
        let expected = (config.height, config.width);
        if capacity.shape() != expected {
            return Err(SimError::DimensionMismatch {
                context: format!("capacity map {}", capacity.name()),
                expected,
                found: capacity.shape(),
            });
        }

        let mut grid = SingleGrid::new(config.width, config.height, Topology::Bounded)?;
        let mut sugar = capacity.clone();
        sugar.set_name(SUGAR_LAYER);
        grid.add_property_layer(sugar)?;

        let mut rng = RandomSource::from_optional_seed(config.seed);
        let mut agents = AgentSet::new();
        for _ in 0..config.initial_population {
            let forager = Forager {
                sugar: draw(&mut rng, config.endowment_min, config.endowment_max) as f64,
                metabolism: draw(&mut rng, config.metabolism_min, config.metabolism_max) as f64,
                vision: draw(&mut rng, config.vision_min, config.vision_max) as usize,
            };
            let id = agents.spawn(forager);
            grid.place_at_random_empty(id, &mut rng)?;
        }

        let collector = MetricCollector::new()
            .with("population", report_population)
            .with("Gini", report_gini);

        let mut model = Self {
            config,
            grid,
            agents,
            capacity,
            rng,
            steps: 0,
            collector,
            record: MetricRecord::new(),
        };
        model.collect()?;

        tracing::info!(
            "Sugarscape model {}x{} (seed {}), {} foragers, total capacity {:.1}",
            model.config.width,
            model.config.height,
            model.rng.seed(),
            model.agents.len(),
            model.capacity.sum()
        );
        Ok(model)
    }

    fn collect(&mut self) -> Result<()> {
        let row = self.collector.sample(self, self.steps)?;
        self.record.push(row);
        Ok(())
    }

    /// Add a forager at a chosen empty cell
    pub fn add_forager(&mut self, forager: Forager, pos: Pos) -> Result<AgentId> {
        if let Some(occupant) = self.grid.agent_at(pos) {
            return Err(SimError::OccupiedCell { pos, occupant });
        }
        let id = self.agents.spawn(forager);
        if let Err(e) = self.grid.place(id, pos) {
            self.agents.remove(id)?;
            return Err(e);
        }
        Ok(id)
    }

    pub fn grid(&self) -> &SingleGrid {
        &self.grid
    }

    pub fn capacity(&self) -> &PropertyLayer {
        &self.capacity
    }

    pub fn sugar(&self) -> Result<&PropertyLayer> {
        self.grid.property_layer(SUGAR_LAYER)
    }

    pub fn forager(&self, id: AgentId) -> Option<&Forager> {
        self.agents.get(id)
    }

    pub fn population(&self) -> usize {
        self.agents.len()
    }

    /// Stocks in creation order
    pub fn stocks(&self) -> Vec<f64> {
        self.agents.values().map(|f| f.sugar).collect()
    }

    fn regrow(&mut self) -> Result<()> {
        let rate = self.config.regrow_rate;
        let capacity = &self.capacity;
        self.grid
            .property_layer_mut(SUGAR_LAYER)?
            .add_clamped(rate, capacity)
    }

    /// Cells visible from `pos`, in scan order
    fn visible_cells(&self, pos: Pos, vision: usize) -> Vec<Pos> {
        let lattice = self.grid.lattice();
        match self.config.vision_mode {
            VisionMode::Rays => {
                // Past the longest side a ray leaves the grid or revisits cells
                let vision = vision.min(lattice.width.max(lattice.height));
                let mut cells = Vec::with_capacity(vision * RAYS.len());
                for d in 1..=vision as i64 {
                    for (dx, dy) in RAYS {
                        if let Some(cell) = lattice.offset(pos, dx * d, dy * d) {
                            cells.push(cell);
                        }
                    }
                }
                cells
            }
            VisionMode::Diamond => {
                let mut cells = lattice.neighborhood(pos, Neighborhood::VonNeumann, false, vision);
                cells.sort_by_key(|&c| (lattice.manhattan_distance(pos, c), c.y, c.x));
                cells
            }
        }
    }

    /// The current cell, or the first visible empty cell holding strictly more
    fn best_target(&self, agent: AgentId) -> Result<Pos> {
        let vision = self.agents.require(agent)?.vision;
        let pos = self
            .grid
            .position_of(agent)
            .ok_or(SimError::NotPlaced(agent))?;
        let sugar = self.sugar()?;

        let mut best = pos;
        let mut best_value = sugar.get(pos)?;
        for cell in self.visible_cells(pos, vision) {
            if !self.grid.is_cell_empty(cell) {
                continue;
            }
            let value = sugar.get(cell)?;
            if value > best_value {
                best = cell;
                best_value = value;
            }
        }
        Ok(best)
    }
}

fn draw(rng: &mut RandomSource, low: u32, high: u32) -> i64 {
    rng.int_inclusive(low as i64, high as i64)
}

fn report_population(m: &SugarscapeModel) -> Result<f64> {
    Ok(m.population() as f64)
}

fn report_gini(m: &SugarscapeModel) -> Result<f64> {
    gini(&m.stocks())
}

impl Model for SugarscapeModel {
    type Agent = Forager;
    type Phase = SugarscapePhase;

    fn agents(&self) -> &AgentSet<Forager> {
        &self.agents
    }

    fn random_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    fn activate(&mut self, phase: SugarscapePhase, agent: AgentId) -> Result<()> {
        match phase {
            SugarscapePhase::Move => {
                let target = self.best_target(agent)?;
                self.grid.move_to(agent, target)?;
            }
            SugarscapePhase::GatherAndEat => {
                let pos = self
                    .grid
                    .position_of(agent)
                    .ok_or(SimError::NotPlaced(agent))?;
                let harvest = self.grid.property_layer_mut(SUGAR_LAYER)?.take(pos)?;
                let forager = self.agents.require_mut(agent)?;
                forager.sugar += harvest - forager.metabolism;
            }
            SugarscapePhase::SeeIfDie => {
                if self.agents.require(agent)?.sugar < 0.0 {
                    self.agents.despawn(agent, &mut self.grid)?;
                    tracing::trace!("Forager {} starved", agent);
                }
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        self.regrow()?;
        invoke(self, SugarscapePhase::Move, Order::Shuffled)?;
        invoke(self, SugarscapePhase::GatherAndEat, Order::Shuffled)?;
        invoke(self, SugarscapePhase::SeeIfDie, Order::Shuffled)?;
        self.steps += 1;
        self.collect()?;
        tracing::debug!(
            "Sugarscape step {}: {} foragers",
            self.steps,
            self.agents.len()
        );
        Ok(())
    }

    /// Stops at extinction
    fn running(&self) -> bool {
        !self.agents.is_empty()
    }

    fn steps(&self) -> Step {
        self.steps
    }

    fn metrics(&self) -> &MetricRecord {
        &self.record
    }
}
