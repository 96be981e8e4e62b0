//! # medgate-session
//!
//! The client half of the MEDGATE access layer.
//!
//! - [`SessionCell`] holds the session state behind a watch channel and the
//!   persisted role marker.
//! - [`SilentRefreshGateway`] wraps the transport: an expired access token is
//!   renewed once and the request replayed; a dead refresh token ends the
//!   session.
//! - [`SessionClient`] drives login, whoami, logout and reapply, and applies
//!   route guard decisions that require a forced logout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = SessionClient::new(transport, Arc::new(FileRoleStore::new(".medgate-role")));
//! client.restore().await;
//! match client.navigate(&RouteGuard::hospital()?, Role::Doctor, "/doctor").await {
//!     GuardDecision::Render => {}
//!     other => println!("redirect to {:?}", other.redirect()),
//! }
//! ```

pub mod client;
pub mod gateway;
pub mod role_store;
pub mod state;

pub use client::SessionClient;
pub use gateway::SilentRefreshGateway;
pub use role_store::{FileRoleStore, MemoryRoleStore};
pub use state::{LoginNotice, SessionCell, SessionState};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, OnceLock, Weak,
    };
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    use medgate_contracts::{
        account::{CredentialRecord, Profile},
        error::{MedgateError, MedgateResult},
        identity::Identity,
        review::ReviewStatus,
        role::Role,
        wire::{
            ApiRequest, ApiResponse, LoginRequest, ReviewNotice, LOGIN_PATH, LOGOUT_PATH,
            REFRESH_PATH,
        },
    };
    use medgate_core::traits::{RoleStore, Transport};
    use medgate_guard::{GuardDecision, RouteGuard, BLOCKED_MESSAGE};

    use crate::{MemoryRoleStore, SessionCell, SessionClient};

    // ── Mock server ───────────────────────────────────────────────────────────

    /// Scripted server. The client's cookie jar and the token the server
    /// accepts are plain strings; a request is authorized when they match.
    struct MockServer {
        identity: Identity,
        accepted: Mutex<String>,
        jar: Mutex<String>,
        refresh_ok: AtomicBool,
        reject_always: AtomicBool,
        blocked_login: AtomicBool,
        refreshes: AtomicUsize,
        whoamis: AtomicUsize,
        logouts: AtomicUsize,
        whoami_gate: Option<Arc<Notify>>,
    }

    impl MockServer {
        fn new(identity: Identity) -> Self {
            Self {
                identity,
                accepted: Mutex::new("token-0".to_string()),
                jar: Mutex::new("token-0".to_string()),
                refresh_ok: AtomicBool::new(true),
                reject_always: AtomicBool::new(false),
                blocked_login: AtomicBool::new(false),
                refreshes: AtomicUsize::new(0),
                whoamis: AtomicUsize::new(0),
                logouts: AtomicUsize::new(0),
                whoami_gate: None,
            }
        }

        /// Make the client's access token stale.
        fn expire_access(&self) {
            *self.accepted.lock().unwrap() = "token-rotated".to_string();
        }

        fn authorized(&self) -> bool {
            !self.reject_always.load(Ordering::SeqCst)
                && *self.jar.lock().unwrap() == *self.accepted.lock().unwrap()
        }

        fn protected(&self, data: Value) -> ApiResponse {
            if self.authorized() {
                ApiResponse::ok("ok", Some(data))
            } else {
                ApiResponse::from_error(&MedgateError::AuthExpired)
            }
        }
    }

    #[async_trait]
    impl Transport for MockServer {
        async fn send(&self, request: ApiRequest) -> MedgateResult<ApiResponse> {
            tokio::task::yield_now().await;
            let response = match request.path.as_str() {
                REFRESH_PATH => {
                    self.refreshes.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if self.refresh_ok.load(Ordering::SeqCst) {
                        let fresh = format!("token-{}", self.refreshes.load(Ordering::SeqCst));
                        *self.accepted.lock().unwrap() = fresh.clone();
                        *self.jar.lock().unwrap() = fresh.clone();
                        ApiResponse::ok("refreshed", Some(json!({ "accessToken": fresh })))
                    } else {
                        ApiResponse::from_error(&MedgateError::SessionInvalid {
                            reason: "refresh token expired".to_string(),
                        })
                    }
                }
                LOGOUT_PATH => {
                    self.logouts.fetch_add(1, Ordering::SeqCst);
                    ApiResponse::ok("logged out", None)
                }
                LOGIN_PATH => {
                    let login: LoginRequest = serde_json::from_value(request.body).unwrap();
                    if login.password != "pw" {
                        ApiResponse::from_error(&MedgateError::InvalidCredentials)
                    } else if self.blocked_login.load(Ordering::SeqCst) {
                        let mut response = ApiResponse::from_error(&MedgateError::AccountBlocked);
                        response.body.data =
                            Some(serde_json::to_value(ReviewNotice::from_identity(&self.identity)).unwrap());
                        response
                    } else {
                        *self.jar.lock().unwrap() = self.accepted.lock().unwrap().clone();
                        ApiResponse::ok(
                            "logged in",
                            Some(json!({
                                "accessToken": "a",
                                "refreshToken": "r",
                                "user": self.identity,
                            })),
                        )
                    }
                }
                path if path.ends_with("/getme") => {
                    self.whoamis.fetch_add(1, Ordering::SeqCst);
                    if let Some(gate) = &self.whoami_gate {
                        gate.notified().await;
                    }
                    self.protected(serde_json::to_value(&self.identity).unwrap())
                }
                _ => self.protected(json!({ "path": request.path })),
            };
            Ok(response)
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn doctor() -> CredentialRecord {
        CredentialRecord::register(
            "bailey@seattle-grace.example",
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
            "Dr. Bailey",
            Profile::Doctor {
                specialization: "general surgery".to_string(),
                license_number: "WA-1002".to_string(),
            },
            Utc::now(),
        )
    }

    fn approved_doctor() -> Identity {
        let mut record = doctor();
        record.review_status = Some(ReviewStatus::Approved);
        record.identity()
    }

    fn client(server: &Arc<MockServer>, roles: &Arc<MemoryRoleStore>) -> SessionClient {
        SessionClient::new(server.clone(), roles.clone())
    }

    // ── 1. init ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn init_without_saved_role_makes_no_call() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));
        assert!(client.snapshot().loading);

        let state = client.restore().await;
        assert!(!state.loading);
        assert!(!state.is_authenticated);
        assert_eq!(server.whoamis.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_init_shares_one_whoami() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::with_role(Role::Doctor)));

        let (first, second) =
            tokio::join!(client.init(Some(Role::Doctor)), client.init(Some(Role::Doctor)));

        assert_eq!(server.whoamis.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(first.is_authenticated);
        assert_eq!(first.role, Some(Role::Doctor));
        assert!(first.is_active);
    }

    #[tokio::test]
    async fn stale_whoami_is_dropped_after_logout() {
        let gate = Arc::new(Notify::new());
        let mut mock = MockServer::new(approved_doctor());
        mock.whoami_gate = Some(gate.clone());
        let server = Arc::new(mock);
        let roles = Arc::new(MemoryRoleStore::with_role(Role::Doctor));
        let client = client(&server, &roles);

        let (state, _) = tokio::join!(client.init(Some(Role::Doctor)), async {
            tokio::task::yield_now().await;
            client.logout().await;
            gate.notify_one();
        });

        assert!(!state.is_authenticated);
        assert!(!client.snapshot().is_authenticated);
        assert_eq!(roles.load().unwrap(), None);
    }

    // ── 2. silent refresh ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn expired_access_token_is_refreshed_and_replayed() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));
        client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await.unwrap();

        server.expire_access();
        let response = client
            .gateway()
            .send(ApiRequest::get("/doctor/patients"))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
        assert!(client.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn burst_of_401s_shares_one_refresh() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));
        client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await.unwrap();
        server.expire_access();

        let gateway = client.gateway();
        let results = futures::future::join_all(
            (0..5).map(|i| gateway.send(ApiRequest::get(format!("/doctor/patients/{i}")))),
        )
        .await;

        assert!(results.iter().all(|r| matches!(r, Ok(resp) if resp.is_success())));
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_refresh_logs_out_and_clears_role() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        server.expire_access();
        server.refresh_ok.store(false, Ordering::SeqCst);
        let roles = Arc::new(MemoryRoleStore::with_role(Role::Doctor));
        let client = client(&server, &roles);

        let state = client.restore().await;

        assert!(!state.is_authenticated);
        assert!(!state.loading);
        assert_eq!(roles.load().unwrap(), None);
        assert_eq!(server.whoamis.load(Ordering::SeqCst), 1);
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(server.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_call_rejected_is_not_retried() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        server.refresh_ok.store(false, Ordering::SeqCst);
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));

        match client
            .gateway()
            .send(ApiRequest::post(REFRESH_PATH, Value::Null))
            .await
        {
            Err(MedgateError::SessionInvalid { .. }) => {}
            other => panic!("expected SessionInvalid, got {:?}", other),
        }
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(server.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replay_rejected_again_ends_session() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let roles = Arc::new(MemoryRoleStore::new());
        let client = client(&server, &roles);
        client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await.unwrap();
        server.reject_always.store(true, Ordering::SeqCst);

        match client.gateway().send(ApiRequest::get("/doctor/patients")).await {
            Err(MedgateError::SessionInvalid { .. }) => {}
            other => panic!("expected SessionInvalid, got {:?}", other),
        }
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
        assert!(!client.snapshot().is_authenticated);
        assert_eq!(roles.load().unwrap(), None);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_a_newer_login() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let roles = Arc::new(MemoryRoleStore::new());
        let client = client(&server, &roles);
        client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await.unwrap();
        server.expire_access();
        server.refresh_ok.store(false, Ordering::SeqCst);

        let (result, _) = tokio::join!(
            client.gateway().send(ApiRequest::get("/doctor/patients")),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                client.login_success(approved_doctor());
            }
        );

        match result {
            Err(MedgateError::SessionInvalid { .. }) => {}
            other => panic!("expected SessionInvalid, got {:?}", other),
        }
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(server.logouts.load(Ordering::SeqCst), 0);
        let state = client.snapshot();
        assert!(state.is_authenticated);
        assert_eq!(state.role, Some(Role::Doctor));
        assert_eq!(roles.load().unwrap(), Some(Role::Doctor));
    }

    #[tokio::test]
    async fn refresh_started_before_a_new_login_is_not_joined() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));
        client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await.unwrap();
        server.expire_access();

        let gateway = client.gateway();
        let (first, second) = tokio::join!(
            gateway.send(ApiRequest::get("/doctor/patients/1")),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                client.login_success(approved_doctor());
                server.expire_access();
                gateway.send(ApiRequest::get("/doctor/patients/2")).await
            }
        );

        assert!(first.unwrap().is_success());
        assert!(second.unwrap().is_success());
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 2);
    }

    // ── 3. login / logout ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn login_persists_role_and_logout_is_idempotent() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let roles = Arc::new(MemoryRoleStore::new());
        let client = client(&server, &roles);
        let mut changes = client.subscribe();

        let user = client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await.unwrap();
        assert_eq!(user.role(), Role::Doctor);
        assert_eq!(roles.load().unwrap(), Some(Role::Doctor));
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_authenticated);

        client.logout().await;
        client.logout().await;
        let state = client.snapshot();
        assert!(!state.is_authenticated);
        assert_eq!(state.user, None);
        assert_eq!(roles.load().unwrap(), None);
    }

    #[tokio::test]
    async fn wrong_password_does_not_trigger_refresh() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));

        assert_eq!(
            client.login("bailey@seattle-grace.example", "nope", Role::Doctor).await,
            Err(MedgateError::InvalidCredentials)
        );
        assert_eq!(server.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blocked_login_keeps_notice_with_review_status() {
        let mut record = doctor();
        record.review_status = Some(ReviewStatus::Rejected);
        record.rejection_reason = Some("missing license".to_string());
        record.is_active = false;
        let server = Arc::new(MockServer::new(record.identity()));
        server.blocked_login.store(true, Ordering::SeqCst);
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));

        assert_eq!(
            client.login("bailey@seattle-grace.example", "pw", Role::Doctor).await,
            Err(MedgateError::AccountBlocked)
        );
        let notice = client.snapshot().notice.unwrap();
        assert_eq!(notice.message, BLOCKED_MESSAGE);
        let review = notice.review.unwrap();
        assert_eq!(review.review_status, ReviewStatus::Rejected);
        assert_eq!(review.rejection_reason.as_deref(), Some("missing license"));
        assert!(review.can_reapply());
    }

    // ── 4. guard ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn navigate_before_init_is_loading() {
        let server = Arc::new(MockServer::new(approved_doctor()));
        let client = client(&server, &Arc::new(MemoryRoleStore::new()));
        let guard = RouteGuard::hospital().unwrap();

        assert_eq!(
            client.navigate(&guard, Role::Doctor, "/doctor/dashboard").await,
            GuardDecision::Loading
        );
    }

    #[tokio::test]
    async fn navigate_forces_logout_for_inactive_account() {
        let mut record = doctor();
        record.is_active = false;
        let server = Arc::new(MockServer::new(record.identity()));
        let roles = Arc::new(MemoryRoleStore::with_role(Role::Doctor));
        let client = client(&server, &roles);
        let guard = RouteGuard::hospital().unwrap();

        let state = client.restore().await;
        assert!(state.is_authenticated);
        assert!(!state.is_active);

        match client.navigate(&guard, Role::Doctor, "/doctor/dashboard").await {
            GuardDecision::ForceLogout { to, message } => {
                assert_eq!(to, "/doctor/login");
                assert_eq!(message, BLOCKED_MESSAGE);
            }
            other => panic!("expected ForceLogout, got {:?}", other),
        }
        let state = client.snapshot();
        assert!(!state.is_authenticated);
        assert_eq!(state.notice.unwrap().message, BLOCKED_MESSAGE);
        assert_eq!(roles.load().unwrap(), None);
    }

    // ── 5. session cell ───────────────────────────────────────────────────────

    /// Reads the cell's generation from inside every role marker write, which
    /// would deadlock if the write ran under the generation lock.
    #[derive(Default)]
    struct ReentrantRoleStore {
        cell: OnceLock<Weak<SessionCell>>,
        inner: MemoryRoleStore,
        seen: Mutex<Vec<u64>>,
    }

    impl ReentrantRoleStore {
        fn record_generation(&self) {
            if let Some(cell) = self.cell.get().and_then(Weak::upgrade) {
                self.seen.lock().unwrap().push(cell.generation());
            }
        }
    }

    impl RoleStore for ReentrantRoleStore {
        fn load(&self) -> MedgateResult<Option<Role>> {
            self.inner.load()
        }

        fn save(&self, role: Role) -> MedgateResult<()> {
            self.record_generation();
            self.inner.save(role)
        }

        fn clear(&self) -> MedgateResult<()> {
            self.record_generation();
            self.inner.clear()
        }
    }

    fn reentrant_cell() -> (Arc<SessionCell>, Arc<ReentrantRoleStore>) {
        let roles = Arc::new(ReentrantRoleStore::default());
        let cell = Arc::new(SessionCell::new(roles.clone()));
        roles.cell.set(Arc::downgrade(&cell)).ok();
        (cell, roles)
    }

    #[test]
    fn role_marker_is_written_outside_the_generation_lock() {
        let (cell, roles) = reentrant_cell();

        cell.sign_in(approved_doctor());
        assert_eq!(roles.load().unwrap(), Some(Role::Doctor));
        cell.sign_out(None);
        assert_eq!(roles.load().unwrap(), None);

        assert_eq!(*roles.seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn stale_sign_out_leaves_the_session_alone() {
        let (cell, roles) = reentrant_cell();
        let started = cell.generation();
        cell.sign_in(approved_doctor());

        assert!(!cell.sign_out_if_current(started, None));
        assert!(cell.snapshot().is_authenticated);
        assert_eq!(roles.load().unwrap(), Some(Role::Doctor));

        assert!(cell.sign_out_if_current(cell.generation(), None));
        assert!(!cell.snapshot().is_authenticated);
        assert_eq!(roles.load().unwrap(), None);
    }
}
