//! Silent refresh around the transport.
//!
//! Every request goes out through `SilentRefreshGateway::send`. A `401` on a
//! session-bound request triggers one refresh and one replay:
//!
//! ```text
//! send ──► 401 ──► refresh ──ok──► replay once ──► response
//!                     │                 │
//!                     └──fail──► logout └──401──► logout
//! ```
//!
//! Requests that hit `401` together share the same in-flight refresh. The
//! in-flight call is a `Shared` future parked in a mutex slot and tagged with
//! an id; whoever observes it finish clears the slot only if the id still
//! matches, so a later burst never reuses a finished refresh.
//!
//! Each call captures the session generation when it starts. A failure that
//! lands after a newer sign-in or sign-out does not end the session and does
//! not call logout.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tracing::{debug, info, warn};

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    wire::{ApiRequest, ApiResponse, RefreshResponse, ACCESS_COOKIE, LOGOUT_PATH, REFRESH_PATH},
};
use medgate_core::traits::Transport;

use crate::state::SessionCell;

type RefreshFuture = Shared<BoxFuture<'static, MedgateResult<String>>>;

struct InFlight {
    id: u64,
    generation: u64,
    future: RefreshFuture,
}

pub struct SilentRefreshGateway {
    transport: Arc<dyn Transport>,
    session: Arc<SessionCell>,
    refresh: Mutex<Option<InFlight>>,
    next_refresh: AtomicU64,
}

impl SilentRefreshGateway {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionCell>) -> Self {
        Self {
            transport,
            session,
            refresh: Mutex::new(None),
            next_refresh: AtomicU64::new(1),
        }
    }

    pub fn session(&self) -> &Arc<SessionCell> {
        &self.session
    }

    /// Send `request`, renewing the session once if the server answers `401`.
    ///
    /// Returns `Ok` for every non-`401` answer; callers decode the envelope.
    /// A session that cannot be renewed is cleared and reported as
    /// `SessionInvalid`.
    pub async fn send(&self, request: ApiRequest) -> MedgateResult<ApiResponse> {
        let started = self.session.generation();
        let response = self.transport.send(request.clone()).await?;
        if !needs_refresh(&request, &response) {
            return Ok(response);
        }

        if request.is_refresh() {
            warn!("refresh call rejected, ending session");
            end_session(&self.transport, &self.session, started).await;
            return Err(MedgateError::SessionInvalid {
                reason: response.body.message,
            });
        }

        debug!(path = %request.path, "access token rejected, refreshing");
        let access_token = self.shared_refresh(started).await?;

        let replay = with_access_token(request, &access_token);
        let response = self.transport.send(replay.clone()).await?;
        if needs_refresh(&replay, &response) {
            warn!(path = %replay.path, "replay rejected after refresh, ending session");
            end_session(&self.transport, &self.session, started).await;
            return Err(MedgateError::SessionInvalid {
                reason: response.body.message,
            });
        }
        debug!(path = %replay.path, status = response.status, "request replayed");
        Ok(response)
    }

    /// Join the in-flight refresh started under the same session
    /// generation, or start one.
    async fn shared_refresh(&self, started: u64) -> MedgateResult<String> {
        let (id, future) = {
            let mut slot = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(in_flight) if in_flight.generation == started => {
                    debug!(refresh_id = in_flight.id, "joining in-flight refresh");
                    (in_flight.id, in_flight.future.clone())
                }
                _ => {
                    let id = self.next_refresh.fetch_add(1, Ordering::Relaxed);
                    let future = refresh_once(self.transport.clone(), self.session.clone(), started)
                        .boxed()
                        .shared();
                    *slot = Some(InFlight {
                        id,
                        generation: started,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.refresh.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            *slot = None;
        }
        outcome
    }
}

#[async_trait]
impl Transport for SilentRefreshGateway {
    async fn send(&self, request: ApiRequest) -> MedgateResult<ApiResponse> {
        SilentRefreshGateway::send(self, request).await
    }
}

/// A `401` the gateway should act on. Sessionless endpoints and failed
/// credential checks answer `401` without any session being involved.
fn needs_refresh(request: &ApiRequest, response: &ApiResponse) -> bool {
    response.status == 401
        && !request.is_sessionless()
        && response.error() != Some(MedgateError::InvalidCredentials)
}

/// The single refresh call shared by a burst. Ends the session on failure so
/// the logout happens once per burst.
async fn refresh_once(
    transport: Arc<dyn Transport>,
    session: Arc<SessionCell>,
    started: u64,
) -> MedgateResult<String> {
    let outcome = match transport.send(ApiRequest::post(REFRESH_PATH, Value::Null)).await {
        Ok(response) if response.is_success() => response
            .into_data::<RefreshResponse>()
            .map(|data| data.access_token),
        Ok(response) => Err(MedgateError::SessionInvalid {
            reason: response.body.message,
        }),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(access_token) => {
            info!("session refreshed");
            Ok(access_token)
        }
        Err(err) => {
            warn!(error = %err, "refresh failed, ending session");
            end_session(&transport, &session, started).await;
            Err(match err {
                MedgateError::SessionInvalid { .. } => err,
                other => MedgateError::SessionInvalid {
                    reason: other.to_string(),
                },
            })
        }
    }
}

/// Clear local state, then tell the server. Nothing happens if the session
/// changed since `started`. The server call goes straight to the transport
/// and its outcome is ignored.
async fn end_session(transport: &Arc<dyn Transport>, session: &SessionCell, started: u64) {
    if !session.sign_out_if_current(started, None) {
        debug!(started, "session changed since the request started, keeping it");
        return;
    }
    if let Err(err) = transport.send(ApiRequest::post(LOGOUT_PATH, Value::Null)).await {
        debug!(error = %err, "logout call failed");
    }
}

/// Point an explicit bearer or access cookie at the renewed token. Cookies
/// the transport attaches itself are already current.
fn with_access_token(mut request: ApiRequest, access_token: &str) -> ApiRequest {
    if request.bearer.is_some() {
        request.bearer = Some(access_token.to_string());
    }
    if let Some(cookie) = request.cookies.get_mut(ACCESS_COOKIE) {
        *cookie = access_token.to_string();
    }
    request
}
