use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Profile Enumerations ---

/// UserType
///
/// The role flag stored on `public.profiles.user_type`. Module access in the
/// route table is expressed as a set of these values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UserType {
    Staff,
    PathwaysCoordinator,
    NewUser,
}

/// ProfileStatus
///
/// Account lifecycle state. Every profile starts in `PendingInduction` and
/// moves to `Active` once the induction checklist is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProfileStatus {
    PendingInduction,
    Active,
    Inactive,
}

impl ProfileStatus {
    /// Text stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::PendingInduction => "pending_induction",
            ProfileStatus::Active => "active",
            ProfileStatus::Inactive => "inactive",
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Profile
///
/// The application-level record of a user's role and onboarding state, one row
/// per user in `public.profiles`, keyed by the identity provider's user id.
/// The row is provisioned asynchronously after first sign-in, so callers must
/// treat its absence as a normal, transient condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, TS, ToSchema)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub user_type: UserType,
    pub status: ProfileStatus,
    #[ts(type = "string | null")]
    pub induction_completed_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A profile needs induction while no completion timestamp is recorded and
    /// the account is still pending. Both conditions must hold.
    pub fn needs_induction(&self) -> bool {
        self.induction_completed_at.is_none() && self.status == ProfileStatus::PendingInduction
    }
}

// --- Response Schemas ---

/// InductionStatus
///
/// Output schema for `GET /intranet/induction/status`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InductionStatus {
    pub profile: Profile,
    pub needs_induction: bool,
}

impl From<Profile> for InductionStatus {
    fn from(profile: Profile) -> Self {
        Self {
            needs_induction: profile.needs_induction(),
            profile,
        }
    }
}
