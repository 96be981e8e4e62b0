//! The five session scenarios, each against a fresh seeded server.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    role::Role,
    wire::{getme_path, review_path, ApiRequest, ACCESS_COOKIE},
};
use medgate_core::ManualClock;
use medgate_guard::{GuardDecision, RouteGuard};
use medgate_server::{seed, AuthServer, InProcessTransport, ServerConfig};
use medgate_session::{MemoryRoleStore, SessionClient, SessionState};

/// Everything one scenario runs against.
pub struct Stage {
    server: Arc<AuthServer>,
    clock: Arc<ManualClock>,
    guard: RouteGuard,
}

/// One browser tab: a session client and the cookie jar behind it.
struct Tab {
    client: SessionClient,
    transport: Arc<InProcessTransport>,
}

impl Stage {
    pub fn new(config: &ServerConfig, guard: RouteGuard) -> MedgateResult<Self> {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let server = Arc::new(AuthServer::seeded(config, clock.clone())?);
        Ok(Self {
            server,
            clock,
            guard,
        })
    }

    fn open_tab(&self) -> Tab {
        let transport = Arc::new(InProcessTransport::new(self.server.clone()));
        let client = SessionClient::new(transport.clone(), Arc::new(MemoryRoleStore::new()));
        Tab { client, transport }
    }

    async fn sign_in(&self, account: &seed::SeedAccount) -> MedgateResult<Tab> {
        let tab = self.open_tab();
        tab.client
            .login(account.email, account.password, account.role)
            .await?;
        println!("  {} signed in as {}", account.name, account.role);
        Ok(tab)
    }

    async fn review(&self, reviewer: &Tab, action: &str, body: serde_json::Value) -> MedgateResult<()> {
        let response = reviewer
            .client
            .gateway()
            .send(ApiRequest::patch(review_path(action), body))
            .await?;
        if let Some(err) = response.error() {
            return Err(err);
        }
        println!("  reviewer applied '{}'", action);
        Ok(())
    }
}

// ── Scenario A ────────────────────────────────────────────────────────────────

/// A fresh doctor signs in and is held on the review-pending page.
pub async fn pending_doctor(stage: &Stage) -> MedgateResult<()> {
    println!("Scenario A: fresh doctor, review pending");
    let doctor = stage.sign_in(&seed::PENDING_DOCTOR).await?;
    let decision = doctor
        .client
        .navigate(&stage.guard, Role::Doctor, "/doctor/dashboard")
        .await;
    print_decision("/doctor/dashboard", &decision);
    expect(
        matches!(decision, GuardDecision::RedirectToReviewPending { .. }),
        "pending doctor should be held on the review page",
    )
}

// ── Scenario B ────────────────────────────────────────────────────────────────

/// An admin rejects the doctor; the doctor's session is forced out with the
/// reason on display.
pub async fn rejected_doctor(stage: &Stage) -> MedgateResult<()> {
    println!("Scenario B: reject with reason");
    let admin = stage.sign_in(&seed::HOSPITAL_ADMIN).await?;
    let doctor = stage.sign_in(&seed::PENDING_DOCTOR).await?;
    let doctor_id = signed_in_id(&doctor.client.snapshot())?;

    stage
        .review(&admin, "reject", json!({ "id": doctor_id, "reason": "missing license" }))
        .await?;

    let state = doctor.client.restore().await;
    print_state(&state);
    let decision = doctor
        .client
        .navigate(&stage.guard, Role::Doctor, "/doctor/dashboard")
        .await;
    print_decision("/doctor/dashboard", &decision);

    let notice = doctor.client.snapshot().notice;
    if let Some(review) = notice.as_ref().and_then(|notice| notice.review.as_ref()) {
        println!(
            "  login page: status {}, reason {:?}, reapply offered: {}",
            review.review_status,
            review.rejection_reason,
            review.can_reapply()
        );
    }
    expect(
        matches!(decision, GuardDecision::ForceLogout { .. }),
        "rejected doctor should be forced out",
    )
}

// ── Scenario C ────────────────────────────────────────────────────────────────

/// The rejected doctor reapplies and is back to pending with no reason.
pub async fn reapply(stage: &Stage) -> MedgateResult<()> {
    println!("Scenario C: reapply after rejection");
    let admin = stage.sign_in(&seed::HOSPITAL_ADMIN).await?;
    let doctor = stage.sign_in(&seed::PENDING_DOCTOR).await?;
    let doctor_id = signed_in_id(&doctor.client.snapshot())?;
    stage
        .review(&admin, "reject", json!({ "id": doctor_id, "reason": "missing license" }))
        .await?;
    doctor.client.logout().await;

    let account = seed::PENDING_DOCTOR;
    match doctor.client.login(account.email, account.password, account.role).await {
        Err(MedgateError::AccountBlocked) => println!("  login refused: account is blocked"),
        other => return Err(unexpected("a blocked login", &other)),
    }

    let notice = doctor.client.reapply_blocked(account.password).await?;
    println!(
        "  reapplied: status {}, reason {:?}",
        notice.review_status, notice.rejection_reason
    );
    let user = doctor.client.login(account.email, account.password, account.role).await?;
    println!("  signed in again, status {}", user.review_status());
    println!(
        "  review ledger: {} entries, chain intact: {}",
        stage.server.ledger().len(),
        stage.server.ledger().verify_integrity()
    );
    expect(
        user.rejection_reason().is_none() && !user.review_status().is_approved(),
        "reapply should clear the reason and return to pending",
    )
}

// ── Scenario D ────────────────────────────────────────────────────────────────

/// The access token expires mid-session and is renewed without the caller
/// noticing.
pub async fn silent_refresh(stage: &Stage) -> MedgateResult<()> {
    println!("Scenario D: access token expires mid-session");
    let doctor = stage.sign_in(&seed::APPROVED_DOCTOR).await?;
    let before = doctor.transport.cookie(ACCESS_COOKIE);

    stage.clock.advance(Duration::minutes(16));
    println!("  clock advanced 16 minutes");
    let response = doctor
        .client
        .gateway()
        .send(ApiRequest::get(getme_path(Role::Doctor)))
        .await?;
    let renewed = doctor.transport.cookie(ACCESS_COOKIE) != before;
    println!("  whoami status {}, access cookie renewed: {}", response.status, renewed);
    info!(status = response.status, renewed, "silent refresh finished");
    expect(response.is_success() && renewed, "request should succeed after refresh")
}

// ── Scenario E ────────────────────────────────────────────────────────────────

/// The refresh token itself has expired; the session ends without a loop.
pub async fn dead_refresh(stage: &Stage) -> MedgateResult<()> {
    println!("Scenario E: refresh token expired");
    let doctor = stage.sign_in(&seed::APPROVED_DOCTOR).await?;

    stage.clock.advance(Duration::days(8));
    println!("  clock advanced 8 days");
    let state = doctor.client.restore().await;
    print_state(&state);
    let decision = doctor
        .client
        .navigate(&stage.guard, Role::Doctor, "/doctor/dashboard")
        .await;
    print_decision("/doctor/dashboard", &decision);
    expect(
        !state.is_authenticated && matches!(decision, GuardDecision::RedirectToLogin { .. }),
        "expired session should end at the login page",
    )
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn signed_in_id(state: &SessionState) -> MedgateResult<medgate_contracts::account::AccountId> {
    state
        .user
        .as_ref()
        .map(|user| user.id())
        .ok_or(MedgateError::AuthExpired)
}

fn print_state(state: &SessionState) {
    match &state.user {
        Some(user) => println!(
            "  session: {} ({}), active {}, status {}, reason {:?}",
            user.base().name,
            user.role(),
            state.is_active,
            user.review_status(),
            user.rejection_reason()
        ),
        None => println!("  session: signed out"),
    }
}

fn print_decision(path: &str, decision: &GuardDecision) {
    match decision {
        GuardDecision::Render => println!("  guard {}: render", path),
        GuardDecision::Loading => println!("  guard {}: loading", path),
        GuardDecision::ForceLogout { to, message } => {
            println!("  guard {}: forced logout to {} ({})", path, to, message)
        }
        GuardDecision::RedirectToReviewPending { to, message, .. } => {
            println!("  guard {}: redirect to {} \"{}\"", path, to, message)
        }
        GuardDecision::RedirectToLogin { to } | GuardDecision::RedirectToDashboard { to } => {
            println!("  guard {}: redirect to {}", path, to)
        }
    }
}

fn expect(ok: bool, what: &str) -> MedgateResult<()> {
    if ok {
        println!("  ok");
        println!();
        Ok(())
    } else {
        Err(MedgateError::validation(format!("scenario check failed: {}", what)))
    }
}

fn unexpected<T: std::fmt::Debug>(wanted: &str, got: &T) -> MedgateError {
    MedgateError::validation(format!("expected {}, got {:?}", wanted, got))
}
