pub mod agent_set;
pub mod batch;
pub mod metrics;
pub mod scheduler;

pub use agent_set::AgentSet;
pub use batch::{run_batch, BatchRun};
pub use metrics::{gini, MetricCollector, MetricRecord, MetricRow};
pub use scheduler::{invoke, run, Model, Order};
