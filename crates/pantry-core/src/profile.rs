//! Profile records, keyed by the owning account's identifier.
//!
//! A profile's `id` is a back-reference to the account (`profile.id ==
//! user.id`); the account never points at its profile.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Derived fields are absent on fresh profiles and come back as `null` when
/// a projection selects them; both read as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What role the account plays in the food-sharing network.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccountType {
  Donor,
  Requester,
  Organization,
}

/// A stored profile, including the derived gamification fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub id:           Uuid,
  pub full_name:    String,
  pub username:     String,
  pub account_type: AccountType,
  #[serde(default)]
  pub organization: Option<String>,
  #[serde(default)]
  pub address:      Option<String>,
  #[serde(default)]
  pub phone:        Option<String>,
  // ── Derived ───────────────────────────────────────────────────────────
  #[serde(default, deserialize_with = "null_as_default")]
  pub points:       i64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub badges:       Vec<String>,
  #[serde(default)]
  pub avatar_url:   Option<String>,
}

/// Caller-supplied attributes for the profile created during sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
  pub full_name:    String,
  pub username:     String,
  pub account_type: AccountType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organization: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:        Option<String>,
}

impl NewProfile {
  /// Convenience constructor with all optional fields unset.
  pub fn new(
    full_name: impl Into<String>,
    username: impl Into<String>,
    account_type: AccountType,
  ) -> Self {
    Self {
      full_name: full_name.into(),
      username: username.into(),
      account_type,
      organization: None,
      address: None,
      phone: None,
    }
  }
}

/// Partial update for [`crate::Pantry::update_user_profile`].
///
/// Only `Some` fields are sent. Points and badges are derived by the backend
/// and cannot be set here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_name:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub username:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub account_type: Option<AccountType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub organization: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url:   Option<String>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

/// One row of the points leaderboard: a fixed projection of [`Profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub id:         Uuid,
  pub username:   String,
  #[serde(default)]
  pub avatar_url: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub points:     i64,
  #[serde(default, deserialize_with = "null_as_default")]
  pub badges:     Vec<String>,
}

impl LeaderboardEntry {
  /// The exact column set read for the leaderboard.
  pub const COLUMNS: [&'static str; 5] =
    ["id", "username", "avatar_url", "points", "badges"];
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn null_derived_fields_read_as_defaults() {
    let entry: LeaderboardEntry = serde_json::from_value(json!({
      "id": Uuid::nil(),
      "username": "ada",
      "avatar_url": null,
      "points": null,
      "badges": null,
    }))
    .unwrap();
    assert_eq!(entry.points, 0);
    assert!(entry.badges.is_empty());

    let profile: Profile = serde_json::from_value(json!({
      "id": Uuid::nil(),
      "full_name": "Ada Lovelace",
      "username": "ada",
      "account_type": "donor",
      "points": null,
    }))
    .unwrap();
    assert_eq!(profile.points, 0);
    assert!(profile.badges.is_empty());
  }
}
