use crate::{
    AppState,
    auth::CurrentUser,
    models::{InductionStatus, Profile},
    repository::{RepositoryError, RepositoryState},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// ApiError
///
/// Failures a JSON handler can report. Rendered as a status code with a
/// plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("profile not found")]
    ProfileNotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("internal error")]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::ProfileNotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Repository(e) => {
                tracing::error!(error = %e, "profile store request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

// --- Handlers ---

/// get_induction_status
///
/// [Induction Flow] Returns the caller's profile and whether induction is
/// still outstanding. Reads the store again rather than trusting the gate's
/// copy so the page reflects a completion made moments ago.
#[utoipa::path(
    get,
    path = "/intranet/induction/status",
    responses(
        (status = 200, description = "Induction status", body = InductionStatus),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Profile not provisioned yet")
    )
)]
pub async fn get_induction_status(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<InductionStatus>, ApiError> {
    let profile = state
        .repo
        .get_profile(user.id)
        .await?
        .ok_or(ApiError::ProfileNotFound)?;

    Ok(Json(InductionStatus::from(profile)))
}

/// complete_induction
///
/// [Induction Flow] Finishes the induction checklist: stamps
/// `induction_completed_at` and moves the profile to `active`.
///
/// Only a `pending_induction` profile can be completed. An existing profile in
/// any other state yields 409; a missing one yields 404.
#[utoipa::path(
    post,
    path = "/intranet/induction/complete",
    responses(
        (status = 200, description = "Induction completed", body = Profile),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Profile not provisioned yet"),
        (status = 409, description = "Profile is not pending induction")
    )
)]
pub async fn complete_induction(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Profile>, ApiError> {
    if let Some(profile) = state.repo.complete_induction(user.id).await? {
        tracing::info!(user_id = %user.id, "induction completed");
        return Ok(Json(profile));
    }

    match state.repo.get_profile(user.id).await? {
        Some(profile) => Err(ApiError::Conflict(format!(
            "profile is {}, not pending induction",
            profile.status.as_str()
        ))),
        None => Err(ApiError::ProfileNotFound),
    }
}

/// get_me
///
/// [Default-Protected] Retrieves the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/dashboard/me",
    responses(
        (status = 200, description = "Current profile", body = Profile),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Profile not provisioned yet")
    )
)]
pub async fn get_me(
    user: CurrentUser,
    State(repo): State<RepositoryState>,
) -> Result<Json<Profile>, ApiError> {
    repo.get_profile(user.id)
        .await?
        .map(Json)
        .ok_or(ApiError::ProfileNotFound)
}

/// Fallback for gated paths with no handler in this service.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
