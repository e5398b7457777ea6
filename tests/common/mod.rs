#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use staff_portal::{
    auth::{
        IdentityError, IdentityProvider, RefreshedCredentials, SessionCredentials,
        ValidatedSession,
    },
    models::{Profile, ProfileStatus, UserType},
    repository::{Repository, RepositoryError},
};
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use uuid::Uuid;

pub const USER_ID: Uuid = Uuid::from_u128(42);

// --- Profile Builders ---

pub fn pending(user_type: UserType) -> Profile {
    Profile {
        id: USER_ID,
        user_type,
        status: ProfileStatus::PendingInduction,
        induction_completed_at: None,
    }
}

pub fn active(user_type: UserType) -> Profile {
    Profile {
        id: USER_ID,
        user_type,
        status: ProfileStatus::Active,
        induction_completed_at: Some(Utc::now()),
    }
}

pub fn refreshed() -> RefreshedCredentials {
    RefreshedCredentials {
        access_token: "rotated-access".to_string(),
        refresh_token: "rotated-refresh".to_string(),
        expires_in: 3600,
    }
}

// --- Mock Profile Store ---

/// In-memory profile store. `fail` turns every call into a database error.
#[derive(Default)]
pub struct MockRepo {
    pub profiles: Mutex<HashMap<Uuid, Profile>>,
    pub fail: bool,
    pub lookups: AtomicUsize,
}

impl MockRepo {
    pub fn with(profile: Profile) -> Self {
        let repo = Self::default();
        repo.profiles.lock().unwrap().insert(profile.id, profile);
        repo
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.profiles.lock().unwrap().get(&id).cloned())
    }

    async fn complete_induction(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut profiles = self.profiles.lock().unwrap();
        match profiles.get_mut(&id) {
            Some(profile) if profile.status == ProfileStatus::PendingInduction => {
                profile.status = ProfileStatus::Active;
                profile.induction_completed_at = Some(Utc::now());
                Ok(Some(profile.clone()))
            }
            _ => Ok(None),
        }
    }
}

// --- Mock Identity Provider ---

pub enum SessionResult {
    Valid(ValidatedSession),
    Invalid,
    Unreachable,
}

pub struct MockIdentity {
    pub result: SessionResult,
    pub calls: AtomicUsize,
}

impl MockIdentity {
    pub fn signed_in() -> Self {
        Self::returning(SessionResult::Valid(ValidatedSession::new(USER_ID)))
    }

    pub fn signed_in_with_refresh() -> Self {
        Self::returning(SessionResult::Valid(ValidatedSession {
            user_id: USER_ID,
            refreshed: Some(refreshed()),
        }))
    }

    pub fn signed_out() -> Self {
        Self::returning(SessionResult::Invalid)
    }

    pub fn unreachable() -> Self {
        Self::returning(SessionResult::Unreachable)
    }

    fn returning(result: SessionResult) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn validate_session(
        &self,
        _credentials: &SessionCredentials,
    ) -> Result<Option<ValidatedSession>, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            SessionResult::Valid(session) => Ok(Some(session.clone())),
            SessionResult::Invalid => Ok(None),
            SessionResult::Unreachable => Err(IdentityError::Upstream(503)),
        }
    }
}
