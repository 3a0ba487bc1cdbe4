//! [`SupabaseClient`], the hosted-service implementation of [`Backend`].

use std::{
  sync::{Arc, PoisonError, RwLock},
  time::Duration,
};

use pantry_core::{
  Backend,
  auth::{AuthSession, Credentials, Session, SignUpResponse, User},
  query::{Collection, Predicate, Query, Row},
};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
  Error, Result, SupabaseConfig,
  params::{filter_params, query_params},
};

/// PostgREST media type asking for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// GoTrue session payload: the token fields plus the user they belong to.
#[derive(Deserialize)]
struct SessionBody {
  #[serde(flatten)]
  session: Session,
  user:    User,
}

/// Async client for a Supabase project.
///
/// Cheap to clone: the inner [`reqwest::Client`] and the current session are
/// `Arc`-based and shared between clones.
#[derive(Clone)]
pub struct SupabaseClient {
  http:    Client,
  config:  SupabaseConfig,
  session: Arc<RwLock<Option<Session>>>,
}

impl SupabaseClient {
  pub fn new(config: SupabaseConfig) -> Result<Self> {
    if config.url.trim().is_empty() {
      return Err(Error::Config("supabase url is empty".to_owned()));
    }
    if config.anon_key.trim().is_empty() {
      return Err(Error::Config("supabase anon key is empty".to_owned()));
    }
    let http = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      http,
      config,
      session: Arc::new(RwLock::new(None)),
    })
  }

  /// The current session, if signed in.
  pub fn session(&self) -> Option<Session> {
    self
      .session
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Replace the current session, e.g. to restore one saved earlier.
  pub fn set_session(&self, session: Option<Session>) -> Option<Session> {
    let mut current = self.session.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *current, session)
  }

  fn base(&self) -> &str { self.config.url.trim_end_matches('/') }

  fn auth_url(&self, path: &str) -> String { format!("{}/auth/v1{path}", self.base()) }

  fn rest_url(&self, collection: Collection) -> String {
    format!("{}/rest/v1/{collection}", self.base())
  }

  /// A request carrying the API key and the current bearer token (the anon
  /// key when signed out).
  fn request(&self, method: Method, url: &str) -> RequestBuilder {
    let bearer = self
      .session()
      .map_or_else(|| self.config.anon_key.clone(), |s| s.access_token);
    debug!(%method, url, "supabase request");
    self
      .http
      .request(method, url)
      .header("apikey", &self.config.anon_key)
      .bearer_auth(bearer)
  }
}

/// Fail with [`Error::Api`] unless the response is a success.
async fn check(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::from_response(status.as_u16(), &body))
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T> {
  let bytes = check(resp).await?.bytes().await?;
  Ok(serde_json::from_slice(&bytes)?)
}

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SupabaseClient {
  type Error = Error;

  // ── Auth ──────────────────────────────────────────────────────────────────

  /// `POST /auth/v1/signup`
  async fn create_account(&self, credentials: &Credentials) -> Result<SignUpResponse> {
    let resp = self
      .request(Method::POST, &self.auth_url("/signup"))
      .json(credentials)
      .send()
      .await?;
    let body: Value = json(resp).await?;

    // With auto-confirm GoTrue answers with a session; otherwise with the
    // bare user, or with nothing usable at all.
    if body.get("access_token").is_some() {
      let SessionBody { session, user } = serde_json::from_value(body)?;
      self.set_session(Some(session.clone()));
      return Ok(SignUpResponse {
        user:    Some(user),
        session: Some(session),
      });
    }
    if body.get("id").is_some() {
      return Ok(SignUpResponse {
        user:    Some(serde_json::from_value(body)?),
        session: None,
      });
    }
    Ok(SignUpResponse::default())
  }

  /// `POST /auth/v1/token?grant_type=password`
  async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession> {
    let resp = self
      .request(Method::POST, &self.auth_url("/token"))
      .query(&[("grant_type", "password")])
      .json(credentials)
      .send()
      .await?;
    let SessionBody { session, user } = json(resp).await?;
    self.set_session(Some(session.clone()));
    Ok(AuthSession { user, session })
  }

  /// `POST /auth/v1/logout`. The local session is dropped even if the call
  /// fails.
  async fn invalidate_session(&self) -> Result<()> {
    if self.session().is_none() {
      return Ok(());
    }
    let resp = self
      .request(Method::POST, &self.auth_url("/logout"))
      .send()
      .await;
    self.set_session(None);
    check(resp?).await?;
    Ok(())
  }

  /// `GET /auth/v1/user`; no request is made when signed out.
  async fn session_user(&self) -> Result<Option<User>> {
    if self.session().is_none() {
      return Ok(None);
    }
    let resp = self
      .request(Method::GET, &self.auth_url("/user"))
      .send()
      .await?;
    Ok(Some(json(resp).await?))
  }

  // ── Records ───────────────────────────────────────────────────────────────

  /// `GET /rest/v1/<collection>?select=...`
  async fn fetch(&self, query: &Query) -> Result<Vec<Row>> {
    let mut req = self
      .request(Method::GET, &self.rest_url(query.collection))
      .query(&query_params(query));
    if query.single {
      req = req.header(header::ACCEPT, SINGLE_OBJECT);
      let row: Row = json(req.send().await?).await?;
      return Ok(vec![row]);
    }
    json(req.send().await?).await
  }

  /// `POST /rest/v1/<collection>` with `Prefer: return=representation`.
  async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
    let resp = self
      .request(Method::POST, &self.rest_url(collection))
      .header("Prefer", "return=representation")
      .json(&rows)
      .send()
      .await?;
    json(resp).await
  }

  /// `PATCH /rest/v1/<collection>?<filters>` with
  /// `Prefer: return=representation`.
  async fn update(
    &self,
    collection: Collection,
    patch: Row,
    filter: &[Predicate],
  ) -> Result<Vec<Row>> {
    let resp = self
      .request(Method::PATCH, &self.rest_url(collection))
      .query(&filter_params(filter))
      .header("Prefer", "return=representation")
      .json(&patch)
      .send()
      .await?;
    json(resp).await
  }
}
