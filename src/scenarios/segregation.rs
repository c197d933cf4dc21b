//! Two-group segregation with neighborhood influence
//!
//! Residents live on a wrapping grid. Each step every resident, in shuffled
//! order, checks the share of same-group neighbors and relocates to a random
//! empty cell when it falls below the desired share. A second shuffled phase
//! lets residents under sustained negative influence switch group.
//! The run stops once a whole step passes with every resident happy.

use serde::{Deserialize, Serialize};

use crate::core::config::SegregationConfig;
use crate::core::error::{Result, SimError};
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, Pos, Step};
use crate::simulation::agent_set::AgentSet;
use crate::simulation::metrics::{MetricCollector, MetricRecord};
use crate::simulation::scheduler::{invoke, Model, Order};
use crate::spatial::neighborhood::{Neighborhood, Topology};
use crate::spatial::occupancy::SingleGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    One,
    Two,
}

impl Group {
    pub fn other(self) -> Self {
        match self {
            Group::One => Group::Two,
            Group::Two => Group::One,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resident {
    pub group: Group,
    /// Consecutive steps spent under negative influence
    negative_streak: u32,
}

impl Resident {
    pub fn new(group: Group) -> Self {
        Self {
            group,
            negative_streak: 0,
        }
    }

    pub fn negative_streak(&self) -> u32 {
        self.negative_streak
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegregationPhase {
    Move,
    Switch,
}

pub struct SegregationModel {
    config: SegregationConfig,
    grid: SingleGrid,
    agents: AgentSet<Resident>,
    rng: RandomSource,
    steps: Step,
    /// Residents found happy during the current step's move phase
    happy: usize,
    collector: MetricCollector<SegregationModel>,
    record: MetricRecord,
}

impl SegregationModel {
    /// Fill each cell with probability `density`; a placed resident joins
    /// group one with probability `group_one_share`.
    pub fn new(config: SegregationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = RandomSource::from_optional_seed(config.seed);
        let mut grid = SingleGrid::new(config.width, config.height, Topology::Wrapping)?;
        let mut agents = AgentSet::new();

        for pos in grid.positions().collect::<Vec<_>>() {
            if !rng.chance(config.density) {
                continue;
            }
            let group = if rng.chance(config.group_one_share) {
                Group::One
            } else {
                Group::Two
            };
            let id = agents.spawn(Resident::new(group));
            grid.place(id, pos)?;
        }

        Self::build(config, grid, agents, rng)
    }

    /// Place the listed residents and nobody else
    pub fn with_residents(config: SegregationConfig, residents: &[(Pos, Group)]) -> Result<Self> {
        config.validate()?;
        let rng = RandomSource::from_optional_seed(config.seed);
        let mut grid = SingleGrid::new(config.width, config.height, Topology::Wrapping)?;
        let mut agents = AgentSet::new();
        for &(pos, group) in residents {
            let id = agents.spawn(Resident::new(group));
            grid.place(id, pos)?;
        }
        Self::build(config, grid, agents, rng)
    }

    fn build(
        config: SegregationConfig,
        grid: SingleGrid,
        agents: AgentSet<Resident>,
        rng: RandomSource,
    ) -> Result<Self> {
        let collector = MetricCollector::new()
            .with("happy", report_happy)
            .with("share_happy", report_share_happy);

        let mut model = Self {
            config,
            grid,
            agents,
            rng,
            steps: 0,
            happy: 0,
            collector,
            record: MetricRecord::new(),
        };
        model.collect()?;

        tracing::info!(
            "Segregation model {}x{} (seed {}), {} residents",
            model.config.width,
            model.config.height,
            model.rng.seed(),
            model.agents.len()
        );
        Ok(model)
    }

    fn collect(&mut self) -> Result<()> {
        let row = self.collector.sample(self, self.steps)?;
        self.record.push(row);
        Ok(())
    }

    pub fn grid(&self) -> &SingleGrid {
        &self.grid
    }

    pub fn happy(&self) -> usize {
        self.happy
    }

    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn resident(&self, id: AgentId) -> Option<&Resident> {
        self.agents.get(id)
    }

    pub fn group_at(&self, pos: Pos) -> Option<Group> {
        let id = self.grid.agent_at(pos)?;
        self.agents.get(id).map(|r| r.group)
    }

    fn position(&self, agent: AgentId) -> Result<Pos> {
        self.grid
            .position_of(agent)
            .ok_or(SimError::NotPlaced(agent))
    }

    /// Share of occupied neighbor cells holding the same group
    fn share_alike(&self, agent: AgentId) -> Result<f64> {
        let group = self.agents.require(agent)?.group;
        let pos = self.position(agent)?;
        let neighbors = self
            .grid
            .neighbors(pos, Neighborhood::Moore, false, self.config.radius)?;
        if neighbors.is_empty() {
            return Ok(self.config.isolated_share);
        }
        let mut similar = 0;
        for n in &neighbors {
            if self.agents.require(*n)?.group == group {
                similar += 1;
            }
        }
        Ok(similar as f64 / neighbors.len() as f64)
    }

    /// Distance-weighted signed vote of the neighbors, in `[-1, 1]`.
    /// Zero when there are no neighbors.
    fn influence(&self, agent: AgentId) -> Result<f64> {
        let group = self.agents.require(agent)?.group;
        let pos = self.position(agent)?;
        let cells = self
            .grid
            .neighborhood(pos, Neighborhood::Moore, false, self.config.radius)?;

        let (mut weighted, mut total) = (0.0, 0.0);
        for cell in cells {
            let Some(n) = self.grid.agent_at(cell) else {
                continue;
            };
            let w = 1.0 / (self.grid.manhattan_distance(pos, cell) as f64 + 1.0);
            let sign = if self.agents.require(n)?.group == group {
                1.0
            } else {
                -1.0
            };
            weighted += w * sign;
            total += w;
        }
        if total == 0.0 {
            return Ok(0.0);
        }
        Ok(weighted / total)
    }
}

fn report_happy(m: &SegregationModel) -> Result<f64> {
    Ok(m.happy as f64)
}

/// Percentage of residents happy this step; 0 for an empty grid
fn report_share_happy(m: &SegregationModel) -> Result<f64> {
    if m.agents.is_empty() {
        return Ok(0.0);
    }
    Ok(m.happy as f64 / m.agents.len() as f64 * 100.0)
}

impl Model for SegregationModel {
    type Agent = Resident;
    type Phase = SegregationPhase;

    fn agents(&self) -> &AgentSet<Resident> {
        &self.agents
    }

    fn random_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    fn activate(&mut self, phase: SegregationPhase, agent: AgentId) -> Result<()> {
        match phase {
            SegregationPhase::Move => {
                if self.share_alike(agent)? < self.config.desired_share_alike {
                    self.grid.move_to_random_empty(agent, &mut self.rng)?;
                } else {
                    self.happy += 1;
                }
            }
            SegregationPhase::Switch => {
                let influence = self.influence(agent)?;
                let threshold = self.config.transition_threshold;
                let probability = self.config.transition_probability;
                let resident = self.agents.require_mut(agent)?;
                if influence >= 0.0 {
                    resident.negative_streak = 0;
                    return Ok(());
                }
                resident.negative_streak += 1;
                if resident.negative_streak >= threshold {
                    resident.negative_streak = 0;
                    if self.rng.chance(probability) {
                        resident.group = resident.group.other();
                        tracing::trace!("Resident {} switched to {:?}", agent, resident.group);
                    }
                }
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        self.happy = 0;
        invoke(self, SegregationPhase::Move, Order::Shuffled)?;
        invoke(self, SegregationPhase::Switch, Order::Shuffled)?;
        self.steps += 1;
        self.collect()?;
        tracing::debug!(
            "Segregation step {}: {}/{} happy",
            self.steps,
            self.happy,
            self.agents.len()
        );
        Ok(())
    }

    /// False once every resident was happy in the last step
    fn running(&self) -> bool {
        self.happy < self.agents.len()
    }

    fn steps(&self) -> Step {
        self.steps
    }

    fn metrics(&self) -> &MetricRecord {
        &self.record
    }
}
