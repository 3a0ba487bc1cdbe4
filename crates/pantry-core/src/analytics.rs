//! The analytics singleton.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read-only, unkeyed summary record. Its metric set is defined by the
/// backend, so it is kept as an open object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalyticsSnapshot {
  pub metrics: Map<String, Value>,
}

impl AnalyticsSnapshot {
  pub fn get(&self, metric: &str) -> Option<&Value> { self.metrics.get(metric) }

  /// Numeric metric as `f64`; `None` when absent or non-numeric.
  pub fn number(&self, metric: &str) -> Option<f64> {
    self.get(metric).and_then(Value::as_f64)
  }
}
