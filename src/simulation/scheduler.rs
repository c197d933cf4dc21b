//! Step loop plumbing
//!
//! A model exposes its agents, its random source, and a per-phase behavior.
//! `invoke` runs one phase over every live agent; the model's own `step`
//! decides which phases run, in which order, and when metrics are collected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::Result;
use crate::core::random::RandomSource;
use crate::core::types::{AgentId, Step};
use crate::simulation::agent_set::AgentSet;
use crate::simulation::metrics::MetricRecord;

/// Activation order for a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Creation order, stable across runs
    Fixed,
    /// Fresh permutation from the model's random source on every call
    Shuffled,
}

/// A simulation driven by discrete steps
pub trait Model {
    type Agent;
    /// Named behaviors an agent can be asked to perform
    type Phase: Copy + fmt::Debug;

    fn agents(&self) -> &AgentSet<Self::Agent>;

    fn random_mut(&mut self) -> &mut RandomSource;

    /// Perform `phase` for a single agent
    fn activate(&mut self, phase: Self::Phase, agent: AgentId) -> Result<()>;

    /// Advance one full step, including metric collection
    fn step(&mut self) -> Result<()>;

    /// False once the model's own termination predicate holds
    fn running(&self) -> bool;

    /// Completed steps
    fn steps(&self) -> Step;

    fn metrics(&self) -> &MetricRecord;
}

/// Invoke `phase` on every agent alive when the phase starts.
///
/// Agents removed by an earlier activation in the same phase are skipped.
/// The first failing activation aborts the phase and the error propagates.
pub fn invoke<M: Model>(model: &mut M, phase: M::Phase, order: Order) -> Result<()> {
    let mut ids = model.agents().ids();
    if order == Order::Shuffled {
        model.random_mut().shuffle(&mut ids);
    }
    for id in ids {
        if !model.agents().contains(id) {
            continue;
        }
        model.activate(phase, id)?;
    }
    Ok(())
}

/// Step while the model is running, at most `max_steps` times.
/// Returns the number of steps executed.
pub fn run<M: Model>(model: &mut M, max_steps: Step) -> Result<Step> {
    let mut executed = 0;
    while executed < max_steps && model.running() {
        model.step()?;
        executed += 1;
    }
    tracing::debug!(
        "Run finished after {} steps (running: {})",
        executed,
        model.running()
    );
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SimError;

    /// Minimal model: each agent appends its id to a log
    struct Echo {
        agents: AgentSet<()>,
        rng: RandomSource,
        log: Vec<AgentId>,
        steps: Step,
        limit: Step,
        fail_on: Option<AgentId>,
        metrics: MetricRecord,
    }

    #[derive(Debug, Clone, Copy)]
    enum EchoPhase {
        Say,
        Leave,
    }

    impl Echo {
        fn new(n: usize, limit: Step) -> Self {
            let mut agents = AgentSet::new();
            for _ in 0..n {
                agents.spawn(());
            }
            Self {
                agents,
                rng: RandomSource::from_seed(3),
                log: Vec::new(),
                steps: 0,
                limit,
                fail_on: None,
                metrics: MetricRecord::new(),
            }
        }
    }

    impl Model for Echo {
        type Agent = ();
        type Phase = EchoPhase;

        fn agents(&self) -> &AgentSet<()> {
            &self.agents
        }

        fn random_mut(&mut self) -> &mut RandomSource {
            &mut self.rng
        }

        fn activate(&mut self, phase: EchoPhase, agent: AgentId) -> Result<()> {
            if self.fail_on == Some(agent) {
                return Err(SimError::AgentNotFound(agent));
            }
            match phase {
                EchoPhase::Say => self.log.push(agent),
                EchoPhase::Leave => {
                    // Every agent removes its successor
                    let next = AgentId(agent.0 + 1);
                    if self.agents.contains(next) {
                        self.agents.remove(next)?;
                    }
                }
            }
            Ok(())
        }

        fn step(&mut self) -> Result<()> {
            invoke(self, EchoPhase::Say, Order::Fixed)?;
            self.steps += 1;
            Ok(())
        }

        fn running(&self) -> bool {
            self.steps < self.limit
        }

        fn steps(&self) -> Step {
            self.steps
        }

        fn metrics(&self) -> &MetricRecord {
            &self.metrics
        }
    }

    #[test]
    fn test_fixed_order_invocation() {
        let mut m = Echo::new(4, 10);
        invoke(&mut m, EchoPhase::Say, Order::Fixed).unwrap();
        assert_eq!(m.log, vec![AgentId(0), AgentId(1), AgentId(2), AgentId(3)]);
    }

    #[test]
    fn test_shuffled_order_covers_everyone_once() {
        let mut m = Echo::new(30, 10);
        invoke(&mut m, EchoPhase::Say, Order::Shuffled).unwrap();
        let mut seen = m.log.clone();
        seen.sort();
        assert_eq!(seen, m.agents.ids());
        assert_ne!(m.log, m.agents.ids());

        // Same seed, same permutation; a fresh one on the next call
        let mut again = Echo::new(30, 10);
        invoke(&mut again, EchoPhase::Say, Order::Shuffled).unwrap();
        assert_eq!(again.log, m.log);
        invoke(&mut again, EchoPhase::Say, Order::Shuffled).unwrap();
        assert_ne!(again.log[30..], again.log[..30]);
    }

    #[test]
    fn test_removed_agents_are_skipped() {
        let mut m = Echo::new(4, 10);
        invoke(&mut m, EchoPhase::Leave, Order::Fixed).unwrap();
        // 0 removes 1, 1 is skipped, 2 removes 3
        assert_eq!(m.agents.ids(), vec![AgentId(0), AgentId(2)]);
    }

    #[test]
    fn test_error_aborts_phase() {
        let mut m = Echo::new(4, 10);
        m.fail_on = Some(AgentId(1));
        assert!(invoke(&mut m, EchoPhase::Say, Order::Fixed).is_err());
        assert_eq!(m.log, vec![AgentId(0)]);
    }

    #[test]
    fn test_run_respects_termination_and_bound() {
        let mut m = Echo::new(1, 3);
        assert_eq!(run(&mut m, 100).unwrap(), 3);
        assert!(!m.running());

        let mut m = Echo::new(1, 100);
        assert_eq!(run(&mut m, 5).unwrap(), 5);
        assert_eq!(m.steps(), 5);
    }
}
