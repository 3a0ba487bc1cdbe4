//! Subcommands and their dispatch against any [`Backend`].

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use pantry_core::{
  Backend, ListingFilter, Pantry,
  auth::Credentials,
  listing::{NewFoodListing, NewFoodRequest},
  profile::{AccountType, NewProfile, ProfileUpdate},
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

type Pair = (String, Value);

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create an account for --email/--password, then its profile.
  SignUp(NewProfileArgs),
  /// Sign in with --email/--password and print the session.
  SignIn,
  /// End the current session.
  SignOut,
  /// Print the signed-in user, or null.
  Whoami,
  /// List food listings, newest first.
  Listings {
    /// Match `KEY` when `VALUE` is truthy; falsy values are ignored.
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_pair)]
    filters: Vec<Pair>,
    /// Match `KEY` against `VALUE` even when it is falsy.
    #[arg(long = "exact", value_name = "KEY=VALUE", value_parser = parse_pair)]
    exact:   Vec<Pair>,
  },
  /// Listings created by a donor, newest first.
  Donations { donor: Uuid },
  /// Requests made by a requester, with their listings.
  Requests { requester: Uuid },
  /// Create a food listing.
  AddListing {
    #[arg(long)]
    donor:      Uuid,
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_pair)]
    attributes: Vec<Pair>,
  },
  /// Request a listing.
  RequestFood {
    #[arg(long)]
    requester:  Uuid,
    #[arg(long)]
    listing:    Uuid,
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_pair)]
    attributes: Vec<Pair>,
  },
  /// Print a user's profile.
  Profile { user: Uuid },
  /// Change fields of a user's profile.
  UpdateProfile {
    user:   Uuid,
    #[command(flatten)]
    update: ProfileUpdateArgs,
  },
  /// Top profiles by points.
  Leaderboard,
  /// The analytics snapshot.
  Analytics,
}

#[derive(Args, Debug)]
pub struct NewProfileArgs {
  #[arg(long)]
  full_name:    String,
  #[arg(long)]
  username:     String,
  /// donor, requester or organization.
  #[arg(long)]
  account_type: AccountType,
  #[arg(long)]
  organization: Option<String>,
  #[arg(long)]
  address:      Option<String>,
  #[arg(long)]
  phone:        Option<String>,
}

impl From<NewProfileArgs> for NewProfile {
  fn from(args: NewProfileArgs) -> Self {
    Self {
      full_name:    args.full_name,
      username:     args.username,
      account_type: args.account_type,
      organization: args.organization,
      address:      args.address,
      phone:        args.phone,
    }
  }
}

#[derive(Args, Debug)]
pub struct ProfileUpdateArgs {
  #[arg(long)]
  full_name:    Option<String>,
  #[arg(long)]
  username:     Option<String>,
  #[arg(long)]
  account_type: Option<AccountType>,
  #[arg(long)]
  organization: Option<String>,
  #[arg(long)]
  address:      Option<String>,
  #[arg(long)]
  phone:        Option<String>,
  #[arg(long)]
  avatar_url:   Option<String>,
}

impl From<ProfileUpdateArgs> for ProfileUpdate {
  fn from(args: ProfileUpdateArgs) -> Self {
    Self {
      full_name:    args.full_name,
      username:     args.username,
      account_type: args.account_type,
      organization: args.organization,
      address:      args.address,
      phone:        args.phone,
      avatar_url:   args.avatar_url,
    }
  }
}

impl Command {
  /// Whether the command consumes the credentials itself rather than
  /// signing in beforehand.
  fn takes_credentials(&self) -> bool { matches!(self, Self::SignUp(_) | Self::SignIn) }
}

/// Parse `KEY=VALUE`. The value is read as JSON when it parses, otherwise
/// kept as a string.
pub fn parse_pair(raw: &str) -> Result<Pair, String> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
  if key.is_empty() {
    return Err(format!("missing key in `{raw}`"));
  }
  let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
  Ok((key.to_owned(), value))
}

fn print(value: &impl Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<B: Backend>(
  pantry: &Pantry<B>,
  command: Command,
  credentials: Option<Credentials>,
) -> Result<()> {
  if !command.takes_credentials()
    && let Some(credentials) = &credentials
  {
    pantry.sign_in(credentials).await.context("sign-in failed")?;
  }

  match command {
    Command::SignUp(profile) => {
      let credentials = credentials.context("sign-up needs --email and --password")?;
      let outcome = pantry.sign_up(&credentials, &profile.into()).await;
      let (data, error) = outcome.into_parts();
      if let Some(data) = data {
        print(&data)?;
      }
      if let Some(error) = error {
        return Err(error).context("sign-up failed");
      }
    }
    Command::SignIn => {
      let credentials = credentials.context("sign-in needs --email and --password")?;
      print(&pantry.sign_in(&credentials).await?)?;
    }
    Command::SignOut => {
      pantry.sign_out().await?;
      print(&Value::Null)?;
    }
    Command::Whoami => print(&pantry.current_user().await?)?,
    Command::Listings { filters, exact } => {
      let mut filter = ListingFilter::new();
      for (field, value) in filters {
        filter = filter.with(field, value);
      }
      for (field, value) in exact {
        filter = filter.exact(field, value);
      }
      print(&pantry.get_food_listings(&filter).await?)?;
    }
    Command::Donations { donor } => print(&pantry.get_user_donations(donor).await?)?,
    Command::Requests { requester } => print(&pantry.get_user_requests(requester).await?)?,
    Command::AddListing { donor, attributes } => {
      let listing = NewFoodListing {
        donor_id:   donor,
        attributes: attributes.into_iter().collect(),
      };
      print(&pantry.add_food_listing(&listing).await?)?;
    }
    Command::RequestFood {
      requester,
      listing,
      attributes,
    } => {
      let request = NewFoodRequest {
        requester_id: requester,
        listing_id:   listing,
        attributes:   attributes.into_iter().collect(),
      };
      print(&pantry.request_food(&request).await?)?;
    }
    Command::Profile { user } => print(&pantry.get_user_profile(user).await?)?,
    Command::UpdateProfile { user, update } => {
      print(&pantry.update_user_profile(user, &update.into()).await?)?;
    }
    Command::Leaderboard => print(&pantry.get_leaderboard().await?)?,
    Command::Analytics => print(&pantry.get_analytics().await?)?,
  }
  Ok(())
}
