use chrono::Utc;
use staff_portal::models::{InductionStatus, Profile, ProfileStatus, UserType};
use uuid::Uuid;

fn profile(user_type: UserType, status: ProfileStatus) -> Profile {
    Profile {
        id: Uuid::from_u128(7),
        user_type,
        status,
        induction_completed_at: None,
    }
}

#[test]
fn test_profile_deserializes_snake_case_columns() {
    let profile: Profile = serde_json::from_value(serde_json::json!({
        "id": Uuid::from_u128(7),
        "user_type": "pathways_coordinator",
        "status": "pending_induction",
        "induction_completed_at": null,
    }))
    .unwrap();

    assert_eq!(profile.user_type, UserType::PathwaysCoordinator);
    assert_eq!(profile.status, ProfileStatus::PendingInduction);
    assert!(profile.needs_induction());
}

#[test]
fn test_unknown_user_type_is_rejected() {
    let result = serde_json::from_value::<Profile>(serde_json::json!({
        "id": Uuid::from_u128(7),
        "user_type": "admin",
        "status": "active",
        "induction_completed_at": null,
    }));

    assert!(result.is_err());
}

#[test]
fn test_status_text_matches_serde() {
    for status in [
        ProfileStatus::PendingInduction,
        ProfileStatus::Active,
        ProfileStatus::Inactive,
    ] {
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json, status.as_str());
    }
}

#[test]
fn test_completion_timestamp_alone_ends_induction() {
    let mut stale = profile(UserType::Staff, ProfileStatus::PendingInduction);
    stale.induction_completed_at = Some(Utc::now());

    assert!(!stale.needs_induction());
    assert!(!profile(UserType::NewUser, ProfileStatus::Inactive).needs_induction());
}

#[test]
fn test_induction_status_reflects_profile() {
    let pending = profile(UserType::NewUser, ProfileStatus::PendingInduction);
    assert!(InductionStatus::from(pending).needs_induction);

    let done = Profile {
        induction_completed_at: Some(Utc::now()),
        ..profile(UserType::Staff, ProfileStatus::Active)
    };
    let status = InductionStatus::from(done.clone());
    assert!(!status.needs_induction);
    assert_eq!(status.profile, done);
}
