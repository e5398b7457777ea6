use crate::models::Profile;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Read/write failures of the profile store. "Row does not exist" is never an
/// error here; it is reported as `Ok(None)`. A column holding text outside
/// the known enum values surfaces as `sqlx::Error::ColumnDecode`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Abstract contract for the profile store. Handlers and the access gate only
/// see this trait, so tests can substitute an in-memory implementation.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetches the profile for a user id. `Ok(None)` when no row exists yet.
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError>;

    /// Marks induction as complete: sets the completion timestamp and moves the
    /// status to `active`. Only applies to profiles that are still
    /// `pending_induction`; returns `Ok(None)` when no row was updated.
    async fn complete_induction(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// managed Postgres instance.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"SELECT id, user_type, status, induction_completed_at
               FROM profiles
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    /// complete_induction
    ///
    /// The `status = 'pending_induction'` guard makes the transition one-way:
    /// repeated calls leave an already active (or inactive) profile untouched.
    async fn complete_induction(&self, id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"UPDATE profiles
               SET status = 'active', induction_completed_at = NOW()
               WHERE id = $1 AND status = 'pending_induction'
               RETURNING id, user_type, status, induction_completed_at"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
