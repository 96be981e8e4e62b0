//! End-to-end scenarios: session client → silent refresh gateway →
//! in-process transport → auth server, with the route guard on top.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use medgate_contracts::{
    error::MedgateError,
    review::ReviewStatus,
    role::Role,
    wire::{getme_path, review_path, ApiRequest, ACCESS_COOKIE},
};
use medgate_core::{traits::RoleStore, ManualClock};
use medgate_guard::{GuardDecision, RouteGuard, BLOCKED_MESSAGE};
use medgate_server::{seed, AuthServer, InProcessTransport, ServerConfig};
use medgate_session::{MemoryRoleStore, SessionClient};

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Tab {
    client: SessionClient,
    transport: Arc<InProcessTransport>,
    roles: Arc<MemoryRoleStore>,
}

fn server() -> (Arc<AuthServer>, Arc<ManualClock>) {
    let config = ServerConfig::development();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let server = Arc::new(AuthServer::seeded(&config, clock.clone()).unwrap());
    (server, clock)
}

fn open_tab(server: &Arc<AuthServer>) -> Tab {
    let transport = Arc::new(InProcessTransport::new(server.clone()));
    let roles = Arc::new(MemoryRoleStore::new());
    let client = SessionClient::new(transport.clone(), roles.clone());
    Tab {
        client,
        transport,
        roles,
    }
}

async fn signed_in(server: &Arc<AuthServer>, account: &seed::SeedAccount) -> Tab {
    let tab = open_tab(server);
    tab.client
        .login(account.email, account.password, account.role)
        .await
        .unwrap();
    tab
}

// ── Scenario A: fresh doctor is held on the review page ───────────────────────

#[tokio::test]
async fn scenario_a_pending_doctor_sees_review_page() {
    let (server, _) = server();
    let guard = RouteGuard::hospital().unwrap();
    let doctor = signed_in(&server, &seed::PENDING_DOCTOR).await;

    assert_eq!(doctor.roles.load().unwrap(), Some(Role::Doctor));
    match doctor.client.navigate(&guard, Role::Doctor, "/doctor/dashboard").await {
        GuardDecision::RedirectToReviewPending { to, status, message } => {
            assert_eq!(to, "/doctor/review-pending");
            assert_eq!(status, ReviewStatus::Pending);
            assert!(message.contains("under review"));
        }
        other => panic!("expected RedirectToReviewPending, got {:?}", other),
    }
}

// ── Scenario B: rejection surfaces the reason and blocks the session ──────────

#[tokio::test]
async fn scenario_b_rejected_doctor_is_blocked_with_reason() {
    let (server, _) = server();
    let guard = RouteGuard::hospital().unwrap();
    let admin = signed_in(&server, &seed::HOSPITAL_ADMIN).await;
    let doctor = signed_in(&server, &seed::PENDING_DOCTOR).await;
    let doctor_id = doctor.client.snapshot().user.unwrap().id();

    let response = admin
        .client
        .gateway()
        .send(ApiRequest::patch(
            review_path("reject"),
            json!({ "id": doctor_id, "reason": "missing license" }),
        ))
        .await
        .unwrap();
    assert!(response.is_success());

    // The doctor's next whoami exposes the literal reason.
    let state = doctor.client.restore().await;
    let user = state.user.unwrap();
    assert_eq!(user.review_status(), ReviewStatus::Rejected);
    assert_eq!(user.rejection_reason(), Some("missing license"));
    assert!(!state.is_active);

    match doctor.client.navigate(&guard, Role::Doctor, "/doctor/dashboard").await {
        GuardDecision::ForceLogout { message, .. } => assert_eq!(message, BLOCKED_MESSAGE),
        other => panic!("expected ForceLogout, got {:?}", other),
    }
    let notice = doctor.client.snapshot().notice.unwrap();
    let review = notice.review.unwrap();
    assert!(review.can_reapply());
    assert_eq!(review.rejection_reason.as_deref(), Some("missing license"));
    assert_eq!(doctor.roles.load().unwrap(), None);
    assert_eq!(doctor.transport.cookie(ACCESS_COOKIE), None);
}

// ── Scenario C: reapply returns the account to pending ────────────────────────

#[tokio::test]
async fn scenario_c_reapply_clears_reason() {
    let (server, _) = server();
    let admin = signed_in(&server, &seed::HOSPITAL_ADMIN).await;
    let doctor = open_tab(&server);
    let doctor_id = doctor
        .client
        .login(seed::PENDING_DOCTOR.email, seed::PENDING_DOCTOR.password, Role::Doctor)
        .await
        .unwrap()
        .id();
    admin
        .client
        .gateway()
        .send(ApiRequest::patch(
            review_path("reject"),
            json!({ "id": doctor_id, "reason": "missing license" }),
        ))
        .await
        .unwrap();

    // Signing in again is refused but names the rejection.
    doctor.client.logout().await;
    assert_eq!(
        doctor
            .client
            .login(seed::PENDING_DOCTOR.email, seed::PENDING_DOCTOR.password, Role::Doctor)
            .await,
        Err(MedgateError::AccountBlocked)
    );

    let notice = doctor
        .client
        .reapply_blocked(seed::PENDING_DOCTOR.password)
        .await
        .unwrap();
    assert_eq!(notice.review_status, ReviewStatus::Pending);
    assert_eq!(notice.rejection_reason, None);

    let user = doctor
        .client
        .login(seed::PENDING_DOCTOR.email, seed::PENDING_DOCTOR.password, Role::Doctor)
        .await
        .unwrap();
    assert_eq!(user.review_status(), ReviewStatus::Pending);
    assert_eq!(user.rejection_reason(), None);
    assert!(server.ledger().verify_integrity());
}

#[tokio::test]
async fn revision_doctor_edits_profile_then_reapplies() {
    let (server, _) = server();
    let guard = RouteGuard::hospital().unwrap();
    let admin = signed_in(&server, &seed::HOSPITAL_ADMIN).await;
    let doctor = signed_in(&server, &seed::PENDING_DOCTOR).await;
    let doctor_id = doctor.client.snapshot().user.unwrap().id();

    admin
        .client
        .gateway()
        .send(ApiRequest::patch(
            review_path("request-revision"),
            json!({ "id": doctor_id, "reason": "upload license scan" }),
        ))
        .await
        .unwrap();
    doctor.client.restore().await;

    assert_eq!(
        doctor.client.navigate(&guard, Role::Doctor, "/doctor/edit-profile").await,
        GuardDecision::Render
    );
    assert_eq!(
        doctor
            .client
            .navigate(&guard, Role::Doctor, "/doctor/appointments")
            .await
            .redirect(),
        Some("/doctor/review-pending")
    );

    let state = doctor.client.reapply().await.unwrap();
    assert_eq!(state.user.unwrap().review_status(), ReviewStatus::Pending);
}

// ── Scenario D: expired access token is renewed invisibly ─────────────────────

#[tokio::test]
async fn scenario_d_expired_access_token_is_refreshed() {
    let (server, clock) = server();
    let doctor = signed_in(&server, &seed::APPROVED_DOCTOR).await;
    let stale = doctor.transport.cookie(ACCESS_COOKIE).unwrap();

    clock.advance(Duration::minutes(16));
    let response = doctor
        .client
        .gateway()
        .send(ApiRequest::get(getme_path(Role::Doctor)))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_ne!(doctor.transport.cookie(ACCESS_COOKIE).unwrap(), stale);
    assert!(doctor.client.snapshot().is_authenticated);
    assert_eq!(doctor.roles.load().unwrap(), Some(Role::Doctor));
}

// ── Scenario E: dead refresh token ends the session without looping ───────────

#[tokio::test]
async fn scenario_e_dead_refresh_token_logs_out() {
    let (server, clock) = server();
    let doctor = signed_in(&server, &seed::APPROVED_DOCTOR).await;

    clock.advance(Duration::days(8));
    let state = doctor.client.restore().await;

    assert!(!state.is_authenticated);
    assert!(!state.loading);
    assert_eq!(doctor.roles.load().unwrap(), None);
    assert_eq!(doctor.transport.cookie(ACCESS_COOKIE), None);
}

// ── Session restore ───────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_restore_yields_identical_state() {
    let (server, _) = server();
    let patient = signed_in(&server, &seed::PATIENT).await;

    let (first, second) = tokio::join!(patient.client.restore(), patient.client.restore());
    assert_eq!(first, second);
    assert!(first.is_authenticated);
    assert_eq!(first.role, Some(Role::Patient));
}

#[tokio::test]
async fn tampered_access_cookie_recovers_through_refresh() {
    let (server, _) = server();
    let patient = signed_in(&server, &seed::PATIENT).await;
    patient.transport.set_cookie(ACCESS_COOKIE, "garbage");

    let state = patient.client.restore().await;
    assert!(state.is_authenticated);
    assert_ne!(patient.transport.cookie(ACCESS_COOKIE).as_deref(), Some("garbage"));
}
