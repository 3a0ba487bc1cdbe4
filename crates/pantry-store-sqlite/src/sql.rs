//! Translation of [`Query`] values into SQL over the `records` table.

use pantry_core::query::{Collection, Direction, Predicate, Query};
use rusqlite::types::Value as SqlValue;

use crate::{
  Result,
  encode::{json_path, sql_value},
};

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
  pub sql:    String,
  pub params: Vec<SqlValue>,
}

impl Statement {
  fn bind(&mut self, value: SqlValue) -> String {
    self.params.push(value);
    format!("?{}", self.params.len())
  }
}

/// `SELECT id, body FROM records WHERE <collection and predicates>`.
pub fn select(collection: Collection, predicates: &[Predicate]) -> Result<Statement> {
  let mut stmt = Statement {
    sql:    String::new(),
    params: Vec::new(),
  };
  let collection_param = stmt.bind(SqlValue::Text(collection.name().to_owned()));
  stmt.sql = format!("SELECT id, body FROM records WHERE collection = {collection_param}");

  for predicate in predicates {
    let path = stmt.bind(SqlValue::Text(json_path(&predicate.column)?));
    let clause = match sql_value(&predicate.value) {
      SqlValue::Null => format!(" AND json_extract(body, {path}) IS NULL"),
      value => {
        let value = stmt.bind(value);
        format!(" AND json_extract(body, {path}) = {value}")
      }
    };
    stmt.sql.push_str(&clause);
  }
  Ok(stmt)
}

/// The full read for `query`: predicates, ordering and limit. Projection and
/// embedding are applied to the decoded rows afterwards.
pub fn fetch(query: &Query) -> Result<Statement> {
  let mut stmt = select(query.collection, &query.predicates)?;

  if let Some(order) = &query.order {
    let path = stmt.bind(SqlValue::Text(json_path(&order.column)?));
    let direction = match order.direction {
      Direction::Asc => "ASC",
      Direction::Desc => "DESC",
    };
    stmt.sql.push_str(&format!(" ORDER BY json_extract(body, {path}) {direction}"));
  }

  if let Some(limit) = query.limit {
    let limit = stmt.bind(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    stmt.sql.push_str(&format!(" LIMIT {limit}"));
  }
  Ok(stmt)
}
