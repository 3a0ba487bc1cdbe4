//! Rendering of [`Query`] values as PostgREST URL parameters.

use pantry_core::query::{Direction, Predicate, Query};
use serde_json::Value;

/// `eq.<value>`, or `is.null` for a null value.
pub fn render_filter(value: &Value) -> String {
  match value {
    Value::Null => "is.null".to_owned(),
    Value::String(s) => format!("eq.{s}"),
    other => format!("eq.{other}"),
  }
}

pub fn filter_params(predicates: &[Predicate]) -> Vec<(String, String)> {
  predicates
    .iter()
    .map(|p| (p.column.clone(), render_filter(&p.value)))
    .collect()
}

/// The full parameter list for a read: `select`, filters, `order`, `limit`.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
  let mut params = vec![("select".to_owned(), query.select_clause())];
  params.extend(filter_params(&query.predicates));
  if let Some(order) = &query.order {
    let direction = match order.direction {
      Direction::Asc => "asc",
      Direction::Desc => "desc",
    };
    params.push(("order".to_owned(), format!("{}.{direction}", order.column)));
  }
  if let Some(limit) = query.limit {
    params.push(("limit".to_owned(), limit.to_string()));
  }
  params
}

#[cfg(test)]
mod tests {
  use pantry_core::query::{Collection, Query};
  use serde_json::json;

  use super::*;

  #[test]
  fn filter_values() {
    assert_eq!(render_filter(&json!("bakery")), "eq.bakery");
    assert_eq!(render_filter(&json!(12)), "eq.12");
    assert_eq!(render_filter(&json!(false)), "eq.false");
    assert_eq!(render_filter(&json!(null)), "is.null");
  }

  #[test]
  fn leaderboard_params() {
    let query = Query::table(Collection::Profiles)
      .select(["id", "points"])
      .order("points", Direction::Desc)
      .limit(10);
    let pairs: Vec<(String, String)> = query_params(&query);
    let pairs: Vec<(&str, &str)> =
      pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    assert_eq!(pairs, vec![
      ("select", "id, points"),
      ("order", "points.desc"),
      ("limit", "10"),
    ]);
  }
}
