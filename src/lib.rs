//! Gridsim - agent-based simulations on a 2-D lattice
//!
//! A small substrate (exclusive-occupancy grid, property layers, seeded
//! scheduler, metric collection) and three models built on it: a
//! neighbor-count automaton, two-group segregation, and resource foraging.

pub mod core;
pub mod scenarios;
pub mod simulation;
pub mod spatial;
