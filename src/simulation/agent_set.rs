//! Live agent collection
//!
//! Agents are keyed by sequential `AgentId`s in a `BTreeMap`, so fixed-order
//! iteration is creation order and never depends on hashing.

use std::collections::BTreeMap;

use crate::core::error::{Result, SimError};
use crate::core::types::AgentId;
use crate::spatial::occupancy::SingleGrid;

#[derive(Debug, Clone)]
pub struct AgentSet<A> {
    agents: BTreeMap<AgentId, A>,
    next_id: u64,
}

impl<A> AgentSet<A> {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Add an agent, returning its fresh id
    pub fn spawn(&mut self, agent: A) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        self.agents.insert(id, agent);
        id
    }

    pub fn get(&self, id: AgentId) -> Option<&A> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut A> {
        self.agents.get_mut(&id)
    }

    /// Like `get`, but a missing agent is an error
    pub fn require(&self, id: AgentId) -> Result<&A> {
        self.agents.get(&id).ok_or(SimError::AgentNotFound(id))
    }

    pub fn require_mut(&mut self, id: AgentId) -> Result<&mut A> {
        self.agents.get_mut(&id).ok_or(SimError::AgentNotFound(id))
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Ids in creation order
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &A)> {
        self.agents.iter().map(|(id, a)| (*id, a))
    }

    pub fn values(&self) -> impl Iterator<Item = &A> {
        self.agents.values()
    }

    /// Drop an agent from the set only. Prefer `despawn` for placed agents.
    pub fn remove(&mut self, id: AgentId) -> Result<A> {
        self.agents.remove(&id).ok_or(SimError::AgentNotFound(id))
    }

    /// Remove an agent from both the grid and the set.
    ///
    /// The grid binding is cleared first; if the agent is not placed the
    /// set is left untouched and `NotPlaced` is returned.
    pub fn despawn(&mut self, id: AgentId, grid: &mut SingleGrid) -> Result<A> {
        if !self.contains(id) {
            return Err(SimError::AgentNotFound(id));
        }
        grid.remove(id)?;
        self.remove(id)
    }
}

impl<A> Default for AgentSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pos;
    use crate::spatial::neighborhood::Topology;

    #[test]
    fn test_spawn_assigns_sequential_ids() {
        let mut set = AgentSet::new();
        let a = set.spawn("a");
        let b = set.spawn("b");
        assert_eq!(a, AgentId(0));
        assert_eq!(b, AgentId(1));
        assert_eq!(set.ids(), vec![a, b]);
        assert_eq!(set.get(b), Some(&"b"));
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut set = AgentSet::new();
        let a = set.spawn(1);
        set.remove(a).unwrap();
        let b = set.spawn(2);
        assert_ne!(a, b);
        assert!(matches!(set.remove(a), Err(SimError::AgentNotFound(_))));
    }

    #[test]
    fn test_despawn_clears_grid() {
        let mut grid = SingleGrid::new(2, 2, Topology::Bounded).unwrap();
        let mut set = AgentSet::new();
        let id = set.spawn(());
        grid.place(id, Pos::new(1, 1)).unwrap();

        set.despawn(id, &mut grid).unwrap();
        assert!(set.is_empty());
        assert!(grid.is_cell_empty(Pos::new(1, 1)));
        assert_eq!(grid.occupied_count(), 0);

        // Unplaced agent stays in the set
        let loose = set.spawn(());
        assert!(matches!(
            set.despawn(loose, &mut grid),
            Err(SimError::NotPlaced(_))
        ));
        assert!(set.contains(loose));
    }
}
