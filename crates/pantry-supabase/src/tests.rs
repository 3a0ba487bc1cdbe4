//! Tests for `SupabaseClient` against an in-process fake Supabase server.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use axum::{
  Json, Router,
  extract::{Query, State},
  http::{HeaderMap, Method, StatusCode, Uri},
  response::{IntoResponse, Response},
};
use pantry_core::{
  Backend, ListingFilter, Pantry, SignUpOutcome,
  auth::Credentials,
  profile::{AccountType, NewProfile, ProfileUpdate},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::{Error, SupabaseClient, SupabaseConfig};

// ─── Fake server ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Captured {
  method:  Method,
  path:    String,
  params:  Vec<(String, String)>,
  headers: HeaderMap,
  body:    String,
}

impl Captured {
  fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|v| v.to_str().ok())
  }

  fn params(&self) -> Vec<(&str, &str)> {
    self
      .params
      .iter()
      .map(|(k, v)| (k.as_str(), v.as_str()))
      .collect()
  }

  fn json(&self) -> Value { serde_json::from_str(&self.body).expect("json body") }
}

/// Scripted responses keyed by `"METHOD /path"`; a `null` body means an
/// empty response.
#[derive(Clone, Default)]
struct Fake {
  captured: Arc<Mutex<Vec<Captured>>>,
  routes:   Arc<HashMap<String, (StatusCode, Value)>>,
}

impl Fake {
  fn captured(&self) -> Vec<Captured> { self.captured.lock().unwrap().clone() }
}

async fn handle(
  State(fake): State<Fake>,
  method: Method,
  uri: Uri,
  Query(params): Query<Vec<(String, String)>>,
  headers: HeaderMap,
  body: String,
) -> Response {
  let key = format!("{method} {}", uri.path());
  fake.captured.lock().unwrap().push(Captured {
    method,
    path: uri.path().to_owned(),
    params,
    headers,
    body,
  });
  match fake.routes.get(&key) {
    Some((status, Value::Null)) => status.into_response(),
    Some((status, body)) => (*status, Json(body.clone())).into_response(),
    None => (
      StatusCode::NOT_FOUND,
      Json(json!({ "message": format!("no route for {key}") })),
    )
      .into_response(),
  }
}

async fn serve(routes: &[(&str, StatusCode, Value)]) -> (SupabaseClient, Fake) {
  let fake = Fake {
    captured: Arc::default(),
    routes:   Arc::new(
      routes
        .iter()
        .map(|(key, status, body)| ((*key).to_owned(), (*status, body.clone())))
        .collect(),
    ),
  };
  let app = Router::new().fallback(handle).with_state(fake.clone());
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let address = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

  let client =
    SupabaseClient::new(SupabaseConfig::new(format!("http://{address}/"), "anon-key")).unwrap();
  (client, fake)
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn user_id() -> Uuid { Uuid::from_u128(0xfeed) }

fn user_json() -> Value {
  json!({
    "id": user_id().to_string(),
    "aud": "authenticated",
    "role": "authenticated",
    "email": "ada@example.com",
    "created_at": "2024-05-01T12:00:00.123456Z",
    "confirmed_at": "2024-05-01T12:00:00.123456Z",
  })
}

fn session_json() -> Value {
  json!({
    "access_token": "tok-123",
    "token_type": "bearer",
    "expires_in": 3600,
    "expires_at": 1714568400,
    "refresh_token": "refresh-456",
    "user": user_json(),
  })
}

fn profile_json() -> Value {
  json!({
    "id": user_id().to_string(),
    "full_name": "Ada Lovelace",
    "username": "ada",
    "account_type": "donor",
    "organization": null,
    "address": null,
    "phone": null,
    "points": 0,
    "badges": [],
    "avatar_url": null,
  })
}

fn ada() -> Credentials { Credentials::new("ada@example.com", "correct horse") }

fn ada_profile() -> NewProfile { NewProfile::new("Ada Lovelace", "ada", AccountType::Donor) }

// ─── Configuration ───────────────────────────────────────────────────────────

#[test]
fn empty_settings_are_rejected() {
  let err = SupabaseClient::new(SupabaseConfig::new("", "key")).err().unwrap();
  assert!(matches!(err, Error::Config(_)));
  let err = SupabaseClient::new(SupabaseConfig::new("https://x.supabase.co", " "))
    .err()
    .unwrap();
  assert!(matches!(err, Error::Config(_)));
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_in_stores_session_for_later_calls() {
  let (client, fake) = serve(&[
    ("POST /auth/v1/token", StatusCode::OK, session_json()),
    ("GET /auth/v1/user", StatusCode::OK, user_json()),
    ("POST /auth/v1/logout", StatusCode::NO_CONTENT, Value::Null),
  ])
  .await;
  let pantry = Pantry::new(client);

  let signed_in = pantry.sign_in(&ada()).await.unwrap();
  assert_eq!(signed_in.user.id, user_id());
  assert_eq!(signed_in.session.refresh_token.as_deref(), Some("refresh-456"));

  let me = pantry.current_user().await.unwrap().expect("signed in");
  assert_eq!(me.email.as_deref(), Some("ada@example.com"));

  pantry.sign_out().await.unwrap();
  assert!(pantry.backend().session().is_none());
  assert_eq!(pantry.current_user().await.unwrap(), None);

  let calls = fake.captured();
  assert_eq!(calls.len(), 3, "no /user request once signed out");

  assert_eq!(calls[0].params(), vec![("grant_type", "password")]);
  assert_eq!(
    calls[0].json(),
    json!({ "email": "ada@example.com", "password": "correct horse" })
  );
  assert_eq!(calls[0].header("authorization"), Some("Bearer anon-key"));
  assert_eq!(calls[1].header("authorization"), Some("Bearer tok-123"));
  assert_eq!(calls[2].path, "/auth/v1/logout");
  assert_eq!(calls[2].header("authorization"), Some("Bearer tok-123"));
}

#[tokio::test]
async fn rejected_sign_in_keeps_service_error() {
  let (client, _fake) = serve(&[(
    "POST /auth/v1/token",
    StatusCode::BAD_REQUEST,
    json!({ "code": 400, "error_code": "invalid_credentials", "msg": "Invalid login credentials" }),
  )])
  .await;
  let pantry = Pantry::new(client);

  let err = pantry.sign_in(&ada()).await.unwrap_err();
  let api = err.backend_error::<Error>().expect("supabase error");
  assert_eq!(api.code(), Some("invalid_credentials"));
  assert!(pantry.backend().session().is_none());
}

#[tokio::test]
async fn sign_up_with_bare_user_creates_profile() {
  let (client, fake) = serve(&[
    ("POST /auth/v1/signup", StatusCode::OK, user_json()),
    ("POST /rest/v1/profiles", StatusCode::CREATED, json!([profile_json()])),
  ])
  .await;
  let pantry = Pantry::new(client);

  let outcome = pantry.sign_up(&ada(), &ada_profile()).await;
  let SignUpOutcome::Success { account, profile } = outcome else {
    panic!("expected success");
  };
  assert!(account.session.is_none());
  assert_eq!(profile.id, user_id());

  let calls = fake.captured();
  assert_eq!(calls.len(), 2);
  assert_eq!(calls[1].method, Method::POST);
  assert_eq!(calls[1].header("prefer"), Some("return=representation"));
  assert_eq!(
    calls[1].json(),
    json!([{
      "id": user_id().to_string(),
      "full_name": "Ada Lovelace",
      "username": "ada",
      "account_type": "donor",
    }])
  );
}

#[tokio::test]
async fn sign_up_with_session_signs_in() {
  let (client, _fake) = serve(&[
    ("POST /auth/v1/signup", StatusCode::OK, session_json()),
    ("POST /rest/v1/profiles", StatusCode::CREATED, json!([profile_json()])),
  ])
  .await;
  let pantry = Pantry::new(client);

  assert!(pantry.sign_up(&ada(), &ada_profile()).await.is_success());
  assert_eq!(
    pantry.backend().session().map(|s| s.access_token),
    Some("tok-123".to_string())
  );
}

#[tokio::test]
async fn sign_up_without_user_skips_profile() {
  let (client, fake) = serve(&[("POST /auth/v1/signup", StatusCode::OK, json!({}))]).await;
  let pantry = Pantry::new(client);

  let outcome = pantry.sign_up(&ada(), &ada_profile()).await;
  assert!(matches!(outcome, SignUpOutcome::AccountOnlyPendingProfile { .. }));
  assert_eq!(fake.captured().len(), 1);
}

#[tokio::test]
async fn failed_profile_insert_is_reported_with_account() {
  let (client, _fake) = serve(&[
    ("POST /auth/v1/signup", StatusCode::OK, user_json()),
    (
      "POST /rest/v1/profiles",
      StatusCode::CONFLICT,
      json!({ "code": "23505", "message": "duplicate key value violates unique constraint" }),
    ),
  ])
  .await;
  let pantry = Pantry::new(client);

  let (data, error) = pantry.sign_up(&ada(), &ada_profile()).await.into_parts();
  assert_eq!(
    data.and_then(|d| d.account.user).map(|u| u.id),
    Some(user_id())
  );
  let error = error.expect("profile error");
  assert_eq!(error.backend_error::<Error>().and_then(Error::code), Some("23505"));
}

#[tokio::test]
async fn sign_up_failure_skips_profile() {
  let (client, fake) = serve(&[(
    "POST /auth/v1/signup",
    StatusCode::UNPROCESSABLE_ENTITY,
    json!({ "code": 422, "error_code": "user_already_exists", "msg": "User already registered" }),
  )])
  .await;
  let pantry = Pantry::new(client);

  let outcome = pantry.sign_up(&ada(), &ada_profile()).await;
  let SignUpOutcome::AccountFailed(err) = outcome else {
    panic!("expected account failure");
  };
  assert_eq!(err.backend_error::<Error>().and_then(Error::code), Some("user_already_exists"));
  assert_eq!(fake.captured().len(), 1);
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_filter_becomes_postgrest_params() {
  let listing = json!({
    "id": Uuid::new_v4().to_string(),
    "donor_id": user_id().to_string(),
    "created_at": "2024-05-02T09:30:00+00:00",
    "title": "Bread",
    "category": "bakery",
  });
  let (client, fake) =
    serve(&[("GET /rest/v1/food_listings", StatusCode::OK, json!([listing]))]).await;
  let pantry = Pantry::new(client);

  let filter = ListingFilter::new()
    .with("category", "bakery")
    .with("quantity", 0)
    .exact("vegan", false);
  let listings = pantry.get_food_listings(&filter).await.unwrap();
  assert_eq!(listings.len(), 1);
  assert_eq!(listings[0].attributes["category"], json!("bakery"));

  let calls = fake.captured();
  assert_eq!(calls[0].params(), vec![
    ("select", "*"),
    ("category", "eq.bakery"),
    ("vegan", "eq.false"),
    ("order", "created_at.desc"),
  ]);
  assert_eq!(calls[0].header("apikey"), Some("anon-key"));
  assert_eq!(calls[0].header("authorization"), Some("Bearer anon-key"));
}

#[tokio::test]
async fn user_requests_select_embedded_listing() {
  let (client, fake) =
    serve(&[("GET /rest/v1/food_requests", StatusCode::OK, json!([]))]).await;
  let pantry = Pantry::new(client);

  assert!(pantry.get_user_requests(user_id()).await.unwrap().is_empty());
  assert_eq!(fake.captured()[0].params(), vec![
    ("select", "*, food_listings(*)"),
    ("requester_id", format!("eq.{}", user_id()).as_str()),
    ("order", "created_at.desc"),
  ]);
}

#[tokio::test]
async fn leaderboard_is_projected_and_limited() {
  let (client, fake) = serve(&[("GET /rest/v1/profiles", StatusCode::OK, json!([{
    "id": user_id().to_string(),
    "username": "ada",
    "avatar_url": null,
    "points": 120,
    "badges": ["top-donor"],
  }]))])
  .await;
  let pantry = Pantry::new(client);

  let board = pantry.get_leaderboard().await.unwrap();
  assert_eq!(board[0].points, 120);
  assert_eq!(fake.captured()[0].params(), vec![
    ("select", "id, username, avatar_url, points, badges"),
    ("order", "points.desc"),
    ("limit", "10"),
  ]);
}

#[tokio::test]
async fn single_reads_ask_for_an_object() {
  let (client, fake) =
    serve(&[("GET /rest/v1/profiles", StatusCode::OK, profile_json())]).await;
  let pantry = Pantry::new(client);

  let profile = pantry.get_user_profile(user_id()).await.unwrap();
  assert_eq!(profile.username, "ada");
  let call = &fake.captured()[0];
  assert_eq!(call.header("accept"), Some("application/vnd.pgrst.object+json"));
  assert_eq!(call.params(), vec![
    ("select", "*"),
    ("id", format!("eq.{}", user_id()).as_str()),
  ]);
}

#[tokio::test]
async fn missing_singleton_surfaces_postgrest_error() {
  let (client, _fake) = serve(&[(
    "GET /rest/v1/analytics",
    StatusCode::NOT_ACCEPTABLE,
    json!({
      "code": "PGRST116",
      "details": "The result contains 0 rows",
      "message": "JSON object requested, multiple (or no) rows returned",
    }),
  )])
  .await;
  let pantry = Pantry::new(client);

  let err = pantry.get_analytics().await.unwrap_err();
  let api = err.backend_error::<Error>().expect("supabase error");
  assert!(matches!(api, Error::Api { status: 406, .. }));
  assert_eq!(api.code(), Some("PGRST116"));
}

#[tokio::test]
async fn profile_update_patches_by_key() {
  let (client, fake) = serve(&[("PATCH /rest/v1/profiles", StatusCode::OK, json!([]))]).await;
  let pantry = Pantry::new(client);

  let updated = pantry
    .update_user_profile(user_id(), &ProfileUpdate {
      phone: Some("555-0100".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(updated.is_none());

  let call = &fake.captured()[0];
  assert_eq!(call.params(), vec![("id", format!("eq.{}", user_id()).as_str())]);
  assert_eq!(call.json(), json!({ "phone": "555-0100" }));
  assert_eq!(call.header("prefer"), Some("return=representation"));
}

#[tokio::test]
async fn raw_insert_returns_representation() {
  let row = json!({ "id": Uuid::new_v4().to_string(), "total_listings": 4 });
  let (client, _fake) =
    serve(&[("POST /rest/v1/analytics", StatusCode::CREATED, json!([row.clone()]))]).await;

  let inserted = client
    .insert(pantry_core::query::Collection::Analytics, vec![
      row.as_object().cloned().unwrap(),
    ])
    .await
    .unwrap();
  assert_eq!(Value::Object(inserted[0].clone()), row);
}
