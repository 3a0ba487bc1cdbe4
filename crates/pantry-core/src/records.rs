//! Record access: reads and writes against the named collections.
//!
//! | Operation | Collection | Shape |
//! |-----------|------------|-------|
//! | [`get_food_listings`](Pantry::get_food_listings) | `food_listings` | filtered, newest first |
//! | [`get_user_donations`](Pantry::get_user_donations) | `food_listings` | `donor_id = id`, newest first |
//! | [`get_user_requests`](Pantry::get_user_requests) | `food_requests` | joined with parent listing, newest first |
//! | [`add_food_listing`](Pantry::add_food_listing) | `food_listings` | insert one |
//! | [`request_food`](Pantry::request_food) | `food_requests` | insert one |
//! | [`get_user_profile`](Pantry::get_user_profile) | `profiles` | single by key |
//! | [`update_user_profile`](Pantry::update_user_profile) | `profiles` | update by key |
//! | [`get_leaderboard`](Pantry::get_leaderboard) | `profiles` | top 10 by points |
//! | [`get_analytics`](Pantry::get_analytics) | `analytics` | singleton |

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Backend, Error, Pantry, Result,
  analytics::AnalyticsSnapshot,
  filter::{CREATED_AT, ListingFilter, build_listing_query},
  listing::{FoodListing, FoodRequest, NewFoodListing, NewFoodRequest},
  profile::{LeaderboardEntry, Profile, ProfileUpdate},
  query::{Collection, Direction, Predicate, Query, Row},
};

/// Number of profiles on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

// ─── Row conversion ───────────────────────────────────────────────────────────

pub(crate) fn to_row<T: Serialize>(collection: Collection, record: &T) -> Result<Row> {
  match serde_json::to_value(record) {
    Ok(Value::Object(row)) => Ok(row),
    Ok(_) => Err(Error::Codec {
      collection,
      source: serde::ser::Error::custom("record did not serialise to an object"),
    }),
    Err(source) => Err(Error::Codec { collection, source }),
  }
}

pub(crate) fn from_row<T: DeserializeOwned>(collection: Collection, row: Row) -> Result<T> {
  serde_json::from_value(Value::Object(row))
    .map_err(|source| Error::Codec { collection, source })
}

fn from_rows<T: DeserializeOwned>(collection: Collection, rows: Vec<Row>) -> Result<Vec<T>> {
  rows.into_iter().map(|row| from_row(collection, row)).collect()
}

// ─── Operations ───────────────────────────────────────────────────────────────

impl<B: Backend> Pantry<B> {
  async fn read<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
    debug!(
      collection = %query.collection,
      predicates = query.predicates.len(),
      "fetch"
    );
    let rows = self.backend.fetch(query).await.map_err(Error::backend)?;
    from_rows(query.collection, rows)
  }

  async fn read_one<T: DeserializeOwned>(&self, query: &Query) -> Result<T> {
    let mut rows = self.read::<T>(query).await?;
    // `single` queries already fail in the backend unless exactly one row
    // comes back.
    rows.pop().ok_or(Error::MissingRow(query.collection))
  }

  /// Insert a single record and return it as stored.
  pub(crate) async fn insert_one<T: DeserializeOwned>(
    &self,
    collection: Collection,
    row: Row,
  ) -> Result<T> {
    debug!(%collection, "insert");
    let rows = self
      .backend
      .insert(collection, vec![row])
      .await
      .map_err(Error::backend)?;
    let row = rows.into_iter().next().ok_or(Error::MissingRow(collection))?;
    from_row(collection, row)
  }

  // ── Listings ──────────────────────────────────────────────────────────

  /// All listings matching `filter`, newest first.
  ///
  /// Plain entries (`ListingFilter::with`) only apply when their value is
  /// truthy, so filtering on `false`, `0` or `""` needs
  /// [`ListingFilter::exact`].
  pub async fn get_food_listings(&self, filter: &ListingFilter) -> Result<Vec<FoodListing>> {
    self.read(&build_listing_query(filter)).await
  }

  /// Listings authored by `donor_id`, newest first.
  pub async fn get_user_donations(&self, donor_id: Uuid) -> Result<Vec<FoodListing>> {
    let query = Query::table(Collection::FoodListings)
      .eq("donor_id", donor_id.to_string())
      .newest_first(CREATED_AT);
    self.read(&query).await
  }

  pub async fn add_food_listing(&self, listing: &NewFoodListing) -> Result<FoodListing> {
    let row = to_row(Collection::FoodListings, listing)?;
    self.insert_one(Collection::FoodListings, row).await
  }

  // ── Requests ──────────────────────────────────────────────────────────

  /// Requests made by `requester_id`, each joined with its parent listing,
  /// newest first.
  pub async fn get_user_requests(&self, requester_id: Uuid) -> Result<Vec<FoodRequest>> {
    let query = Query::table(Collection::FoodRequests)
      .embed(Collection::FoodListings, "listing_id")
      .eq("requester_id", requester_id.to_string())
      .newest_first(CREATED_AT);
    self.read(&query).await
  }

  pub async fn request_food(&self, request: &NewFoodRequest) -> Result<FoodRequest> {
    let row = to_row(Collection::FoodRequests, request)?;
    self.insert_one(Collection::FoodRequests, row).await
  }

  // ── Profiles ──────────────────────────────────────────────────────────

  /// The profile keyed by `user_id`. A missing profile is a backend error.
  pub async fn get_user_profile(&self, user_id: Uuid) -> Result<Profile> {
    let query = Query::table(Collection::Profiles)
      .eq("id", user_id.to_string())
      .single();
    self.read_one(&query).await
  }

  /// Apply `updates` to the profile keyed by `user_id`.
  ///
  /// Returns `None` when no profile has that key.
  pub async fn update_user_profile(
    &self,
    user_id: Uuid,
    updates: &ProfileUpdate,
  ) -> Result<Option<Profile>> {
    let patch = to_row(Collection::Profiles, updates)?;
    let filter = [Predicate::eq("id", user_id.to_string())];
    debug!(%user_id, fields = patch.len(), "update profile");
    let rows = self
      .backend
      .update(Collection::Profiles, patch, &filter)
      .await
      .map_err(Error::backend)?;
    rows
      .into_iter()
      .next()
      .map(|row| from_row(Collection::Profiles, row))
      .transpose()
  }

  /// The top [`LEADERBOARD_SIZE`] profiles by points.
  pub async fn get_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
    let query = Query::table(Collection::Profiles)
      .select(LeaderboardEntry::COLUMNS)
      .order("points", Direction::Desc)
      .limit(LEADERBOARD_SIZE);
    self.read(&query).await
  }

  // ── Analytics ─────────────────────────────────────────────────────────

  pub async fn get_analytics(&self) -> Result<AnalyticsSnapshot> {
    self
      .read_one(&Query::table(Collection::Analytics).single())
      .await
  }
}
