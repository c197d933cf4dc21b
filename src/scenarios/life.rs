//! Neighbor-count cellular automaton
//!
//! Every cell of a bounded grid holds one agent that is either alive or dead.
//! A step has two phases: `Decide` reads only committed neighbor states and
//! writes each cell's pending state, then `Commit` copies pending into
//! committed. The outcome is therefore independent of activation order.

use serde::{Deserialize, Serialize};

use crate::core::config::LifeConfig;
use crate::core::error::{Result, SimError};
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, Pos, Step};
use crate::simulation::agent_set::AgentSet;
use crate::simulation::metrics::{MetricCollector, MetricRecord};
use crate::simulation::scheduler::{invoke, Model};
use crate::spatial::neighborhood::{Neighborhood, Topology};
use crate::spatial::occupancy::SingleGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Dead,
    Alive,
}

/// One lattice cell as an agent
#[derive(Debug, Clone, PartialEq)]
pub struct LifeCell {
    pub state: CellState,
    pending: CellState,
}

impl LifeCell {
    pub fn new(state: CellState) -> Self {
        Self {
            state,
            pending: state,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == CellState::Alive
    }
}

/// Survival and birth neighbor counts
#[derive(Debug, Clone, PartialEq)]
pub struct LifeRule {
    pub survive: Vec<u8>,
    pub birth: Vec<u8>,
}

impl LifeRule {
    pub fn next(&self, state: CellState, alive_neighbors: usize) -> CellState {
        let counts = match state {
            CellState::Alive => &self.survive,
            CellState::Dead => &self.birth,
        };
        if counts.iter().any(|&k| k as usize == alive_neighbors) {
            CellState::Alive
        } else {
            CellState::Dead
        }
    }
}

impl Default for LifeRule {
    fn default() -> Self {
        Self {
            survive: vec![2, 3],
            birth: vec![5],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifePhase {
    Decide,
    Commit,
}

pub struct LifeModel {
    config: LifeConfig,
    rule: LifeRule,
    grid: SingleGrid,
    agents: AgentSet<LifeCell>,
    rng: RandomSource,
    steps: Step,
    collector: MetricCollector<LifeModel>,
    record: MetricRecord,
}

impl LifeModel {
    /// Random initial grid, each cell alive with probability `start_alive`
    pub fn new(config: LifeConfig) -> Result<Self> {
        config.validate()?;
        let rng = RandomSource::from_optional_seed(config.seed);
        let start_alive = config.start_alive;
        Self::build(config, rng, |_, rng| {
            if rng.chance(start_alive) {
                CellState::Alive
            } else {
                CellState::Dead
            }
        })
    }

    /// Fixed initial grid: the listed cells alive, everything else dead.
    /// No random draws are made for the initial state.
    pub fn with_pattern(config: LifeConfig, alive: &[Pos]) -> Result<Self> {
        config.validate()?;
        let rng = RandomSource::from_optional_seed(config.seed);
        Self::build(config, rng, |pos, _| {
            if alive.contains(&pos) {
                CellState::Alive
            } else {
                CellState::Dead
            }
        })
    }

    fn build(
        config: LifeConfig,
        mut rng: RandomSource,
        mut initial: impl FnMut(Pos, &mut RandomSource) -> CellState,
    ) -> Result<Self> {
        let mut grid = SingleGrid::new(config.width, config.height, Topology::Bounded)?;
        let mut agents = AgentSet::new();
        for pos in grid.positions().collect::<Vec<_>>() {
            let id = agents.spawn(LifeCell::new(initial(pos, &mut rng)));
            grid.place(id, pos)?;
        }

        let rule = LifeRule {
            survive: config.survive.clone(),
            birth: config.birth.clone(),
        };
        let collector = MetricCollector::new()
            .with("alive", report_alive)
            .with("alive_share", report_alive_share);

        let mut model = Self {
            config,
            rule,
            grid,
            agents,
            rng,
            steps: 0,
            collector,
            record: MetricRecord::new(),
        };
        model.collect()?;

        tracing::info!(
            "Life model {}x{} (seed {}), {} cells alive",
            model.config.width,
            model.config.height,
            model.rng.seed(),
            model.alive_count()
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

    pub fn rule(&self) -> &LifeRule {
        &self.rule
    }

    pub fn state_at(&self, pos: Pos) -> Option<CellState> {
        let id = self.grid.agent_at(pos)?;
        self.agents.get(id).map(|c| c.state)
    }

    pub fn alive_count(&self) -> usize {
        self.agents.values().filter(|c| c.is_alive()).count()
    }

    /// Committed states in row-major order
    pub fn states(&self) -> Vec<(Pos, CellState)> {
        self.grid
            .occupants()
            .filter_map(|(pos, id)| self.agents.get(id).map(|c| (pos, c.state)))
            .collect()
    }

    fn live_neighbors(&self, id: AgentId) -> Result<usize> {
        let pos = self
            .grid
            .position_of(id)
            .ok_or(SimError::NotPlaced(id))?;
        let neighbors = self.grid.neighbors(pos, Neighborhood::Moore, false, 1)?;
        let mut alive = 0;
        for n in neighbors {
            if self.agents.require(n)?.is_alive() {
                alive += 1;
            }
        }
        Ok(alive)
    }
}

fn report_alive(m: &LifeModel) -> Result<f64> {
    Ok(m.alive_count() as f64)
}

fn report_alive_share(m: &LifeModel) -> Result<f64> {
    Ok(m.alive_count() as f64 / m.agents.len() as f64)
}

impl Model for LifeModel {
    type Agent = LifeCell;
    type Phase = LifePhase;

    fn agents(&self) -> &AgentSet<LifeCell> {
        &self.agents
    }

    fn random_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    fn activate(&mut self, phase: LifePhase, agent: AgentId) -> Result<()> {
        match phase {
            LifePhase::Decide => {
                let k = self.live_neighbors(agent)?;
                let cell = self.agents.require_mut(agent)?;
                cell.pending = self.rule.next(cell.state, k);
            }
            LifePhase::Commit => {
                let cell = self.agents.require_mut(agent)?;
                cell.state = cell.pending;
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        let order = self.config.activation;
        invoke(self, LifePhase::Decide, order)?;
        invoke(self, LifePhase::Commit, order)?;
        self.steps += 1;
        self.collect()?;
        tracing::debug!("Life step {}: {} alive", self.steps, self.alive_count());
        Ok(())
    }

    /// The automaton has no terminal condition
    fn running(&self) -> bool {
        true
    }

    fn steps(&self) -> Step {
        self.steps
    }

    fn metrics(&self) -> &MetricRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::scheduler::Order;

    fn config(w: usize, h: usize) -> LifeConfig {
        LifeConfig {
            width: w,
            height: h,
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_table() {
        let rule = LifeRule::default();
        for k in 0..=8 {
            let survives = rule.next(CellState::Alive, k) == CellState::Alive;
            assert_eq!(survives, k == 2 || k == 3, "alive with {}", k);
            let born = rule.next(CellState::Dead, k) == CellState::Alive;
            assert_eq!(born, k == 5, "dead with {}", k);
        }
    }

    #[test]
    fn test_blinker_dies_out_under_birth_five() {
        // Vertical bar of three: the center survives (2 neighbors), the ends
        // die (1 neighbor), and nothing is born since no dead cell sees 5.
        let alive = [Pos::new(2, 1), Pos::new(2, 2), Pos::new(2, 3)];
        let mut model = LifeModel::with_pattern(config(5, 5), &alive).unwrap();
        model.step().unwrap();
        assert_eq!(model.alive_count(), 1);
        assert_eq!(model.state_at(Pos::new(2, 2)), Some(CellState::Alive));
        model.step().unwrap();
        assert_eq!(model.alive_count(), 0);
    }

    #[test]
    fn test_birth_on_exactly_five() {
        // Five live cells around (1, 1); the center is born.
        let alive = [
            Pos::new(0, 0),
            Pos::new(1, 0),
            Pos::new(2, 0),
            Pos::new(0, 1),
            Pos::new(2, 1),
        ];
        let mut model = LifeModel::with_pattern(config(3, 3), &alive).unwrap();
        model.step().unwrap();
        assert_eq!(model.state_at(Pos::new(1, 1)), Some(CellState::Alive));
    }

    #[test]
    fn test_every_cell_is_an_agent() {
        let model = LifeModel::new(config(7, 4)).unwrap();
        assert_eq!(model.agents().len(), 28);
        assert_eq!(model.grid().empty_count(), 0);
        assert!(model.grid().is_consistent());
    }

    #[test]
    fn test_initial_row_recorded() {
        let model = LifeModel::new(config(10, 10)).unwrap();
        let row = model.metrics().last().unwrap();
        assert_eq!(row.step, 0);
        assert_eq!(row.get("alive"), Some(model.alive_count() as f64));
    }

    #[test]
    fn test_start_alive_extremes() {
        let all = LifeModel::new(LifeConfig {
            start_alive: 1.0,
            ..config(6, 6)
        })
        .unwrap();
        assert_eq!(all.alive_count(), 36);

        let none = LifeModel::new(LifeConfig {
            start_alive: 0.0,
            ..config(6, 6)
        })
        .unwrap();
        assert_eq!(none.alive_count(), 0);
    }

    #[test]
    fn test_order_does_not_change_result() {
        let fixed = LifeModel::new(config(12, 9)).unwrap();
        let shuffled_cfg = LifeConfig {
            activation: Order::Shuffled,
            ..config(12, 9)
        };
        let shuffled = LifeModel::new(shuffled_cfg).unwrap();
        assert_eq!(fixed.states(), shuffled.states());

        let (mut a, mut b) = (fixed, shuffled);
        for _ in 0..5 {
            a.step().unwrap();
            b.step().unwrap();
            assert_eq!(a.states(), b.states());
        }
    }
}
