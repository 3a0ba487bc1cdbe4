//! Session operations, including two-phase account provisioning.
//!
//! Sign-up is a two-step saga with no compensating action: the account is
//! created first, then its profile. If the profile insert fails the account
//! stays, and [`SignUpOutcome::ProfileFailed`] hands the caller everything
//! needed to retry with [`Pantry::create_profile`].

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
  Backend, Error, Pantry, Result,
  auth::{AuthSession, Credentials, SignUpResponse, User},
  profile::{NewProfile, Profile},
  query::Collection,
  records::to_row,
};

// ─── Outcome ──────────────────────────────────────────────────────────────────

/// Every way a sign-up can end.
#[must_use = "a sign-up may have partially succeeded"]
#[derive(Debug)]
pub enum SignUpOutcome {
  /// Account and profile both created.
  Success {
    account: SignUpResponse,
    profile: Profile,
  },
  /// Account created but no identity was returned (e.g. confirmation
  /// pending), so no profile was attempted.
  AccountOnlyPendingProfile { account: SignUpResponse },
  /// Account creation failed; nothing was created.
  AccountFailed(Error),
  /// Account created, profile insert failed. The account is not rolled back.
  ProfileFailed {
    account: SignUpResponse,
    error:   Error,
  },
}

/// The merged `{...account, profile}` shape of a sign-up result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignUpData {
  #[serde(flatten)]
  pub account: SignUpResponse,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub profile: Option<Profile>,
}

impl SignUpOutcome {
  pub fn is_success(&self) -> bool { matches!(self, Self::Success { .. }) }

  pub fn error(&self) -> Option<&Error> {
    match self {
      Self::AccountFailed(error) | Self::ProfileFailed { error, .. } => Some(error),
      _ => None,
    }
  }

  /// The account-creation result, unless account creation failed.
  pub fn account(&self) -> Option<&SignUpResponse> {
    match self {
      Self::Success { account, .. }
      | Self::AccountOnlyPendingProfile { account }
      | Self::ProfileFailed { account, .. } => Some(account),
      Self::AccountFailed(_) => None,
    }
  }

  pub fn profile(&self) -> Option<&Profile> {
    match self {
      Self::Success { profile, .. } => Some(profile),
      _ => None,
    }
  }

  /// Flatten into a `(data, error)` pair. Both halves are populated only for
  /// [`SignUpOutcome::ProfileFailed`].
  pub fn into_parts(self) -> (Option<SignUpData>, Option<Error>) {
    match self {
      Self::Success { account, profile } => (
        Some(SignUpData {
          account,
          profile: Some(profile),
        }),
        None,
      ),
      Self::AccountOnlyPendingProfile { account } => {
        (Some(SignUpData { account, profile: None }), None)
      }
      Self::AccountFailed(error) => (None, Some(error)),
      Self::ProfileFailed { account, error } => {
        (Some(SignUpData { account, profile: None }), Some(error))
      }
    }
  }
}

/// The row inserted into `profiles`: the account id plus caller attributes.
#[derive(Serialize)]
struct ProfileRow<'a> {
  id:      Uuid,
  #[serde(flatten)]
  profile: &'a NewProfile,
}

// ─── Operations ───────────────────────────────────────────────────────────────

impl<B: Backend> Pantry<B> {
  /// Create an account, then its profile.
  ///
  /// The profile insert is issued only after account creation has resolved
  /// successfully and reported a user.
  pub async fn sign_up(
    &self,
    credentials: &Credentials,
    profile: &NewProfile,
  ) -> SignUpOutcome {
    let account = match self.backend.create_account(credentials).await {
      Ok(account) => account,
      Err(e) => return SignUpOutcome::AccountFailed(Error::backend(e)),
    };

    let Some(user_id) = account.user.as_ref().map(|u| u.id) else {
      debug!(email = %credentials.email, "account created without identity; profile deferred");
      return SignUpOutcome::AccountOnlyPendingProfile { account };
    };

    match self.create_profile(user_id, profile).await {
      Ok(profile) => SignUpOutcome::Success { account, profile },
      Err(error) => {
        error!(%user_id, %error, "error creating user profile");
        SignUpOutcome::ProfileFailed { account, error }
      }
    }
  }

  /// Insert the profile for an existing account. Used by
  /// [`sign_up`](Self::sign_up) and for retrying after
  /// [`SignUpOutcome::ProfileFailed`].
  pub async fn create_profile(&self, user_id: Uuid, profile: &NewProfile) -> Result<Profile> {
    let row = to_row(Collection::Profiles, &ProfileRow {
      id: user_id,
      profile,
    })?;
    self.insert_one(Collection::Profiles, row).await
  }

  pub async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession> {
    let session = self
      .backend
      .authenticate(credentials)
      .await
      .map_err(Error::backend)?;
    info!(user_id = %session.user.id, "signed in");
    Ok(session)
  }

  pub async fn sign_out(&self) -> Result<()> {
    self
      .backend
      .invalidate_session()
      .await
      .map_err(Error::backend)?;
    info!("signed out");
    Ok(())
  }

  /// The user behind the current session, if any.
  pub async fn current_user(&self) -> Result<Option<User>> {
    self.backend.session_user().await.map_err(Error::backend)
  }
}
