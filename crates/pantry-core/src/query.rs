//! Declarative read queries against named record collections.
//!
//! A [`Query`] only describes what to read. Backends translate it into their
//! own dialect (PostgREST parameters, SQL over JSON documents, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};

/// One record as exchanged with a backend.
pub type Row = Map<String, Value>;

// ─── Collections ──────────────────────────────────────────────────────────────

/// The record collections (tables) this layer reads and writes.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
  FoodListings,
  FoodRequests,
  Profiles,
  Analytics,
}

impl Collection {
  /// The backend-side table name.
  pub fn name(self) -> &'static str { self.into() }
}

// ─── Query parts ──────────────────────────────────────────────────────────────

/// An equality predicate. A `null` value means "column is null".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
  pub column: String,
  pub value:  Value,
}

impl Predicate {
  pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      column: column.into(),
      value:  value.into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub column:    String,
  pub direction: Direction,
}

/// Which columns to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Columns {
  #[default]
  All,
  Only(Vec<String>),
}

/// A parent record embedded into each result row, joined through
/// `foreign_key` on the queried collection. The embedded object is stored
/// under the parent collection's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
  pub collection:  Collection,
  pub foreign_key: String,
}

// ─── Query ────────────────────────────────────────────────────────────────────

/// A read over one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
  pub collection: Collection,
  pub columns:    Columns,
  pub embeds:     Vec<Embed>,
  /// Conjunctive; every predicate must hold.
  pub predicates: Vec<Predicate>,
  pub order:      Option<Order>,
  pub limit:      Option<usize>,
  /// Exactly one row is expected; any other count is a backend error.
  pub single:     bool,
}

impl Query {
  /// `select *` over `collection` with no predicates.
  pub fn table(collection: Collection) -> Self {
    Self {
      collection,
      columns: Columns::All,
      embeds: Vec::new(),
      predicates: Vec::new(),
      order: None,
      limit: None,
      single: false,
    }
  }

  pub fn select<I, S>(mut self, columns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.columns = Columns::Only(columns.into_iter().map(Into::into).collect());
    self
  }

  pub fn embed(mut self, collection: Collection, foreign_key: impl Into<String>) -> Self {
    self.embeds.push(Embed {
      collection,
      foreign_key: foreign_key.into(),
    });
    self
  }

  pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.predicates.push(Predicate::eq(column, value));
    self
  }

  pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
    self.order = Some(Order {
      column: column.into(),
      direction,
    });
    self
  }

  /// Shorthand for descending order on `column`.
  pub fn newest_first(self, column: impl Into<String>) -> Self {
    self.order(column, Direction::Desc)
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn single(mut self) -> Self {
    self.single = true;
    self
  }

  /// The select list in PostgREST syntax, e.g. `*, food_listings(*)`.
  pub fn select_clause(&self) -> String {
    let mut parts: Vec<String> = match &self.columns {
      Columns::All => vec!["*".to_owned()],
      Columns::Only(cols) => cols.clone(),
    };
    parts.extend(self.embeds.iter().map(|e| format!("{}(*)", e.collection)));
    parts.join(", ")
  }
}
