//! The filtered-listing query builder.
//!
//! Listing filters follow a truthiness rule: an entry only becomes a
//! predicate when its value is truthy. `null`, `false`, `0` and `""` are
//! indistinguishable from "no filter", which means a plain filter can never
//! ask for "listings where `flag` is false". That limitation is kept as the
//! default behaviour; [`FilterValue::Exact`] is the explicit way around it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::query::{Collection, Predicate, Query};

/// Column every listing read is ordered by, newest first.
pub const CREATED_AT: &str = "created_at";

// ─── Values ───────────────────────────────────────────────────────────────────

/// How a filter entry is turned into a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
  /// Applied only when the value is truthy (see [`is_truthy`]).
  Truthy(Value),
  /// Always applied; `null` means "column is null".
  Exact(Value),
}

impl FilterValue {
  /// The predicate value, or `None` if the entry is skipped.
  pub fn applied(&self) -> Option<&Value> {
    match self {
      Self::Truthy(v) if is_truthy(v) => Some(v),
      Self::Truthy(_) => None,
      Self::Exact(v) => Some(v),
    }
  }
}

/// `false` for `null`, `false`, `0`, `NaN` and `""`; `true` for everything
/// else, including empty arrays and objects.
pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Value::String(s) => !s.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

// ─── Filter ───────────────────────────────────────────────────────────────────

/// Field name → candidate value, in insertion order. Field names are not
/// checked against any schema; unknown names surface as backend errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
  entries: Vec<(String, FilterValue)>,
}

impl ListingFilter {
  pub fn new() -> Self { Self::default() }

  /// Add a truthiness-gated entry. Replaces any earlier entry for `field`.
  pub fn with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(field, FilterValue::Truthy(value.into()))
  }

  /// Add an entry that is applied whatever its value.
  pub fn exact(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(field, FilterValue::Exact(value.into()))
  }

  pub fn insert(mut self, field: impl Into<String>, value: FilterValue) -> Self {
    let field = field.into();
    match self.entries.iter_mut().find(|(f, _)| *f == field) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((field, value)),
    }
    self
  }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn entries(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
    self.entries.iter().map(|(f, v)| (f.as_str(), v))
  }

  /// The predicates this filter contributes, one per applied entry.
  pub fn predicates(&self) -> Vec<Predicate> {
    self
      .entries
      .iter()
      .filter_map(|(field, value)| {
        value.applied().map(|v| Predicate::eq(field.as_str(), v.clone()))
      })
      .collect()
  }
}

impl From<Map<String, Value>> for ListingFilter {
  /// Every entry of a plain object is truthiness-gated.
  fn from(map: Map<String, Value>) -> Self {
    map
      .into_iter()
      .fold(Self::new(), |filter, (field, value)| filter.with(field, value))
  }
}

impl<'de> Deserialize<'de> for ListingFilter {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Map::<String, Value>::deserialize(deserializer).map(Self::from)
  }
}

// ─── Builder ──────────────────────────────────────────────────────────────────

/// Build the listing read: `select *` from `food_listings`, one equality
/// predicate per applied entry, newest first.
pub fn build_listing_query(filter: &ListingFilter) -> Query {
  let mut query = Query::table(Collection::FoodListings).newest_first(CREATED_AT);
  query.predicates = filter.predicates();
  query
}
