//! Per-step aggregate metrics
//!
//! A `MetricCollector` holds named reporter functions; sampling a model
//! produces one `MetricRow`, which the model appends to its `MetricRecord`.
//! Rows are never modified after being appended.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{Result, SimError};
use crate::core::types::Step;

/// Computes one scalar from a model
pub type Reporter<M> = fn(&M) -> Result<f64>;

/// Named reporters evaluated after each step
pub struct MetricCollector<M> {
    reporters: Vec<(&'static str, Reporter<M>)>,
}

impl<M> MetricCollector<M> {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, reporter: Reporter<M>) -> Self {
        self.reporters.push((name, reporter));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.reporters.iter().map(|(name, _)| *name)
    }

    /// Evaluate every reporter against `model`.
    ///
    /// Undefined metrics (empty population, zero total) are stored as `None`;
    /// any other reporter error is returned.
    pub fn sample(&self, model: &M, step: Step) -> Result<MetricRow> {
        let mut values = BTreeMap::new();
        for (name, reporter) in &self.reporters {
            let value = match reporter(model) {
                Ok(v) => Some(v),
                Err(e) if e.is_undefined_metric() => {
                    tracing::warn!("Step {}: {}", step, e);
                    None
                }
                Err(e) => return Err(e),
            };
            values.insert((*name).to_string(), value);
        }
        Ok(MetricRow { step, values })
    }
}

impl<M> Default for MetricCollector<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics after one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub step: Step,
    pub values: BTreeMap<String, Option<f64>>,
}

impl MetricRow {
    /// `None` if the metric is unknown or was undefined at this step
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }
}

/// Append-only time series of metric rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    rows: Vec<MetricRow>,
}

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: MetricRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&MetricRow> {
        self.rows.last()
    }

    /// One metric across all rows
    pub fn column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Gini coefficient of a non-negative distribution.
///
/// `1 + 1/n - 2 * sum(s_i * (n - i)) / (n * sum(s))` over ascending `s`.
/// Undefined for an empty population or a zero total.
pub fn gini(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(SimError::EmptyPopulation { metric: "Gini" });
    }
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return Err(SimError::UndefinedMetric {
            metric: "Gini",
            reason: "total stock is zero".into(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, s)| s * (n - i as f64))
        .sum();

    Ok(1.0 + 1.0 / n - 2.0 * weighted / (n * total))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: f64,
    }

    fn value(c: &Counter) -> Result<f64> {
        Ok(c.value)
    }

    fn never(_: &Counter) -> Result<f64> {
        Err(SimError::EmptyPopulation { metric: "never" })
    }

    fn broken(_: &Counter) -> Result<f64> {
        Err(SimError::GridFull)
    }

    #[test]
    fn test_gini_equal_distribution() {
        let g = gini(&[5.0, 5.0, 5.0, 5.0]).unwrap();
        assert!(g.abs() < 1e-12);
    }

    #[test]
    fn test_gini_maximal_inequality() {
        let g = gini(&[0.0, 0.0, 0.0, 10.0]).unwrap();
        assert!((g - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_gini_order_independent() {
        let a = gini(&[1.0, 7.0, 3.0, 2.0]).unwrap();
        let b = gini(&[7.0, 2.0, 1.0, 3.0]).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.0 && a < 1.0);
    }

    #[test]
    fn test_gini_undefined_cases() {
        assert!(matches!(gini(&[]), Err(SimError::EmptyPopulation { .. })));
        assert!(matches!(
            gini(&[0.0, 0.0]),
            Err(SimError::UndefinedMetric { .. })
        ));
    }

    #[test]
    fn test_collector_records_undefined_as_none() {
        let collector = MetricCollector::new()
            .with("value", value)
            .with("never", never);
        let row = collector.sample(&Counter { value: 2.5 }, 4).unwrap();
        assert_eq!(row.step, 4);
        assert_eq!(row.get("value"), Some(2.5));
        assert_eq!(row.get("never"), None);
        assert!(row.values.contains_key("never"));
        assert_eq!(collector.names().collect::<Vec<_>>(), vec!["value", "never"]);
    }

    #[test]
    fn test_collector_propagates_other_errors() {
        let collector = MetricCollector::new().with("broken", broken);
        assert!(matches!(
            collector.sample(&Counter { value: 0.0 }, 0),
            Err(SimError::GridFull)
        ));
    }

    #[test]
    fn test_record_column_and_json() {
        let collector = MetricCollector::new().with("value", value);
        let mut record = MetricRecord::new();
        for (step, v) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            record.push(collector.sample(&Counter { value: v }, step as Step).unwrap());
        }
        assert_eq!(record.len(), 3);
        assert_eq!(record.column("value"), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(record.last().map(|r| r.step), Some(2));

        let json = record.to_json().unwrap();
        let back: MetricRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
