//! Food listings and the requests made against them.
//!
//! Only the fields this layer relies on are typed. Everything else a listing
//! or request carries (title, quantity, pickup window, ...) is kept in an
//! open `attributes` object and passed through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Open set of domain attributes flattened alongside the typed fields.
pub type Attributes = Map<String, Value>;

// ─── Listings ─────────────────────────────────────────────────────────────────

/// A donor-authored listing. Never mutated or deleted by this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodListing {
  pub id:         Uuid,
  pub donor_id:   Uuid,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub attributes: Attributes,
}

/// Input to [`crate::Pantry::add_food_listing`]. `id` and `created_at` are
/// assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoodListing {
  pub donor_id:   Uuid,
  #[serde(flatten)]
  pub attributes: Attributes,
}

impl NewFoodListing {
  pub fn new(donor_id: Uuid) -> Self {
    Self {
      donor_id,
      attributes: Attributes::new(),
    }
  }

  /// Builder-style attribute setter.
  pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }
}

// ─── Requests ─────────────────────────────────────────────────────────────────

/// A requester-authored claim on a [`FoodListing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRequest {
  pub id:           Uuid,
  pub requester_id: Uuid,
  pub listing_id:   Uuid,
  pub created_at:   DateTime<Utc>,
  /// The parent listing, present only when read joined.
  #[serde(
    rename = "food_listings",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub listing:      Option<FoodListing>,
  #[serde(flatten)]
  pub attributes:   Attributes,
}

/// Input to [`crate::Pantry::request_food`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoodRequest {
  pub requester_id: Uuid,
  pub listing_id:   Uuid,
  #[serde(flatten)]
  pub attributes:   Attributes,
}

impl NewFoodRequest {
  pub fn new(requester_id: Uuid, listing_id: Uuid) -> Self {
    Self {
      requester_id,
      listing_id,
      attributes: Attributes::new(),
    }
  }

  /// Builder-style attribute setter.
  pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.attributes.insert(key.into(), value.into());
    self
  }
}
