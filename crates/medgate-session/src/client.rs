//! Session client: login, whoami, logout, and reapply on top of the gateway.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    identity::Identity,
    role::Role,
    wire::{
        getme_path, review_path, ApiRequest, LoginRequest, LoginResponse, ReviewNotice,
        ReviewRequest, LOGIN_PATH, LOGOUT_PATH,
    },
};
use medgate_core::traits::{RoleStore, Transport};
use medgate_guard::{GuardDecision, RouteGuard};

use crate::{
    gateway::SilentRefreshGateway,
    state::{LoginNotice, SessionCell, SessionState},
};

type InitFuture = Shared<BoxFuture<'static, SessionState>>;

struct InitFlight {
    id: u64,
    role: Role,
    future: InitFuture,
}

/// Client-held session for one browser tab.
///
/// ```rust,ignore
/// let client = SessionClient::new(transport, Arc::new(MemoryRoleStore::new()));
/// client.restore().await;
/// let decision = client.navigate(&guard, Role::Doctor, "/doctor/dashboard").await;
/// ```
pub struct SessionClient {
    gateway: Arc<SilentRefreshGateway>,
    session: Arc<SessionCell>,
    init: Mutex<Option<InitFlight>>,
    next_init: AtomicU64,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, roles: Arc<dyn RoleStore>) -> Self {
        let session = Arc::new(SessionCell::new(roles));
        let gateway = Arc::new(SilentRefreshGateway::new(transport, session.clone()));
        Self {
            gateway,
            session,
            init: Mutex::new(None),
            next_init: AtomicU64::new(1),
        }
    }

    pub fn gateway(&self) -> &Arc<SilentRefreshGateway> {
        &self.gateway
    }

    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Re-run `init` with the role persisted by the last sign-in.
    pub async fn restore(&self) -> SessionState {
        let saved = self.session.saved_role();
        self.init(saved).await
    }

    /// Populate the session from whoami.
    ///
    /// With no saved role the session settles as signed out without any
    /// network call. Concurrent calls for the same role share one whoami.
    pub async fn init(&self, saved_role: Option<Role>) -> SessionState {
        let Some(role) = saved_role else {
            self.session.finish_loading();
            return self.snapshot();
        };

        let (id, future) = {
            let mut slot = self.init.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref().filter(|flight| flight.role == role) {
                Some(flight) => {
                    debug!(role = %role, "joining in-flight whoami");
                    (flight.id, flight.future.clone())
                }
                None => {
                    let id = self.next_init.fetch_add(1, Ordering::Relaxed);
                    let future = whoami(self.gateway.clone(), role).boxed().shared();
                    *slot = Some(InitFlight {
                        id,
                        role,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let state = future.await;

        let mut slot = self.init.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|flight| flight.id == id) {
            *slot = None;
        }
        state
    }

    /// Sign in with credentials.
    ///
    /// A blocked account keeps a "blocked" notice in the session; for a
    /// reviewed account the notice carries its review status so the login
    /// page can offer reapply.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> MedgateResult<Identity> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            role,
        })
        .map_err(|e| MedgateError::validation(format!("unencodable login request: {}", e)))?;

        let response = self.gateway.send(ApiRequest::post(LOGIN_PATH, body)).await?;
        match response.error() {
            None => {
                let login: LoginResponse = response.into_data()?;
                self.login_success(login.user.clone());
                Ok(login.user)
            }
            Some(MedgateError::AccountBlocked) => {
                let review = response
                    .body
                    .data
                    .and_then(|data| serde_json::from_value::<ReviewNotice>(data).ok());
                warn!(role = %role, "login refused, account blocked");
                self.session.sign_out(Some(LoginNotice::blocked(review)));
                Err(MedgateError::AccountBlocked)
            }
            Some(err) => {
                debug!(role = %role, error = %err, "login refused");
                Err(err)
            }
        }
    }

    /// Adopt the identity from a completed login without calling whoami.
    pub fn login_success(&self, identity: Identity) {
        self.session.sign_in(identity);
    }

    /// End the session locally and tell the server. Idempotent.
    pub async fn logout(&self) {
        self.end_session(None).await;
    }

    async fn end_session(&self, notice: Option<LoginNotice>) {
        self.session.sign_out(notice);
        match self.gateway.send(ApiRequest::post(LOGOUT_PATH, Value::Null)).await {
            Ok(response) if response.is_success() => debug!("server session cleared"),
            Ok(response) => debug!(status = response.status, "logout call refused"),
            Err(err) => debug!(error = %err, "logout call failed"),
        }
    }

    /// Resubmit the signed-in account for review, then reload it via whoami.
    pub async fn reapply(&self) -> MedgateResult<SessionState> {
        let state = self.snapshot();
        let (Some(user), Some(role)) = (state.user, state.role) else {
            return Err(MedgateError::AuthExpired);
        };
        self.send_reapply(ReviewRequest::new(user.id())).await?;
        info!(account_id = %user.id(), role = %role, "reapplied for review");
        Ok(self.init(Some(role)).await)
    }

    /// Resubmit a blocked account named by the session's login notice.
    ///
    /// The account cannot sign in while blocked, so the password stands in
    /// for a session. On success the notice is updated with the new status.
    pub async fn reapply_blocked(&self, password: &str) -> MedgateResult<ReviewNotice> {
        let notice = self
            .snapshot()
            .notice
            .and_then(|notice| notice.review)
            .filter(ReviewNotice::can_reapply)
            .ok_or_else(|| MedgateError::validation("no rejected application to resubmit"))?;

        let identity = self
            .send_reapply(ReviewRequest::new(notice.id).with_password(password))
            .await?;
        let updated = ReviewNotice::from_identity(&identity);
        info!(account_id = %updated.id, role = %updated.role, "blocked account reapplied");
        self.session.set_notice(Some(LoginNotice {
            message: "application resubmitted".to_string(),
            review: Some(updated.clone()),
        }));
        Ok(updated)
    }

    /// Evaluate the guard against the current session and carry out a
    /// forced logout if the guard asks for one.
    pub async fn navigate(&self, guard: &RouteGuard, region: Role, path: &str) -> GuardDecision {
        let state = self.snapshot();
        let decision = guard.evaluate(region, &state.view(), path);
        if let GuardDecision::ForceLogout { message, .. } = &decision {
            let review = state.user.as_ref().map(ReviewNotice::from_identity);
            self.end_session(Some(LoginNotice {
                message: message.clone(),
                review: review.filter(|notice| notice.role.is_reviewed()),
            }))
            .await;
        }
        decision
    }

    async fn send_reapply(&self, request: ReviewRequest) -> MedgateResult<Identity> {
        let body = serde_json::to_value(request)
            .map_err(|e| MedgateError::validation(format!("unencodable review request: {}", e)))?;
        self.gateway
            .send(ApiRequest::patch(review_path("reapply"), body))
            .await?
            .into_data()
    }
}

/// One whoami call for `role`, applied to the session if still current.
async fn whoami(gateway: Arc<SilentRefreshGateway>, role: Role) -> SessionState {
    let session = gateway.session().clone();
    let started = session.generation();

    let result = match gateway.send(ApiRequest::get(getme_path(role))).await {
        Ok(response) => response.into_data::<Identity>(),
        Err(err) => Err(err),
    };
    let result = result.and_then(|identity| {
        if identity.role() == role {
            Ok(identity)
        } else {
            Err(MedgateError::SessionInvalid {
                reason: format!("whoami returned a {} identity", identity.role()),
            })
        }
    });

    match result {
        Ok(identity) => {
            debug!(role = %role, account_id = %identity.id(), "whoami resolved");
            session.apply_whoami(started, identity);
        }
        Err(err) => {
            debug!(role = %role, error = %err, "whoami failed");
            session.apply_whoami_failure(started, &err);
        }
    }
    session.snapshot()
}
