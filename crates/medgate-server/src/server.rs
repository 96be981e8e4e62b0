//! The auth endpoints.
//!
//! `AuthServer::handle` routes one request and always answers with the
//! `{success, message, data?}` envelope:
//!
//! | method | path                       | session            |
//! |--------|----------------------------|--------------------|
//! | POST   | `/auth/login`              | none               |
//! | POST   | `/auth/refresh`            | refresh cookie     |
//! | POST   | `/auth/logout`             | none               |
//! | GET    | `/{role}/getme`            | access, any status |
//! | POST   | `/{role}/register`         | none               |
//! | PATCH  | `/review/{action}`         | access, active     |
//!
//! Every session-bound endpoint except `getme` refuses an inactive account
//! with `403`, whatever its token says. `getme` answers so the client can
//! learn it has been blocked.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use medgate_audit::InMemoryReviewLedger;
use medgate_contracts::{
    account::{CredentialRecord, Profile},
    error::{MedgateError, MedgateResult},
    review::ReviewAction,
    role::Role,
    token::Claims,
    wire::{
        ApiRequest, ApiResponse, LoginRequest, LoginResponse, Method, RefreshResponse,
        RegisterRequest, ReviewNotice, ReviewRequest, REFRESH_COOKIE,
    },
};
use medgate_core::{
    traits::{Clock, CredentialStore},
    InMemoryCredentialStore, ReviewStateMachine,
};
use medgate_token::{PasswordHasher, TokenService};

use crate::{
    config::{CookiePolicy, ServerConfig},
    cookies, seed,
};

const MIN_PASSWORD_LEN: usize = 8;

pub struct AuthServer {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    reviews: ReviewStateMachine,
    ledger: Arc<InMemoryReviewLedger>,
    cookies: CookiePolicy,
    clock: Arc<dyn Clock>,
}

impl AuthServer {
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> MedgateResult<Self> {
        let tokens = TokenService::new(&config.token, clock.clone())?;
        let ledger = Arc::new(InMemoryReviewLedger::new("credential-reviews"));
        let reviews = ReviewStateMachine::new(store.clone(), ledger.clone(), clock.clone());
        Ok(Self {
            store,
            tokens,
            reviews,
            ledger,
            cookies: config.cookies,
            clock,
        })
    }

    /// A server over an in-memory store holding the seeded accounts.
    pub fn seeded(config: &ServerConfig, clock: Arc<dyn Clock>) -> MedgateResult<Self> {
        let hasher = PasswordHasher::new();
        let records = seed::records(|password| hasher.hash(password), clock.now())?;
        let store = Arc::new(InMemoryCredentialStore::with_records(records)?);
        Self::new(config, store, clock)
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<InMemoryReviewLedger> {
        &self.ledger
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Route `request` and render the outcome as a response.
    pub fn handle(&self, request: ApiRequest) -> ApiResponse {
        let method = request.method;
        let path = request.path.clone();
        match self.route(&request) {
            Ok(response) => {
                debug!(method = ?method, path = %path, status = response.status, "request handled");
                response
            }
            Err(err) => {
                debug!(method = ?method, path = %path, status = err.status_code(), error = %err, "request refused");
                ApiResponse::from_error(&err)
            }
        }
    }

    fn route(&self, request: &ApiRequest) -> MedgateResult<ApiResponse> {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Post, ["auth", "login"]) => self.login(request),
            (Method::Post, ["auth", "refresh"]) => self.refresh(request),
            (Method::Post, ["auth", "logout"]) => Ok(self.logout()),
            (Method::Get, [role, "getme"]) => self.getme(request, role.parse()?),
            (Method::Post, [role, "register"]) => self.register(request, role.parse()?),
            (Method::Patch, ["review", action]) => self.review(request, action),
            _ => Err(MedgateError::NotFound {
                entity: "route".to_string(),
                id: format!("{:?} {}", request.method, request.path),
            }),
        }
    }

    // ── Session endpoints ────────────────────────────────────────────────────

    fn login(&self, request: &ApiRequest) -> MedgateResult<ApiResponse> {
        let body: LoginRequest = parse_body(request)?;
        let record = self
            .store
            .find_by_email(body.role, &body.email)?
            .ok_or(MedgateError::InvalidCredentials)?;

        let pair = match self.tokens.issue(&record, &body.password) {
            Ok(pair) => pair,
            Err(MedgateError::AccountBlocked) if record.role().is_reviewed() => {
                let mut response = ApiResponse::from_error(&MedgateError::AccountBlocked);
                response.body.data = Some(encode(&ReviewNotice::from_identity(&record.identity()))?);
                return Ok(response);
            }
            Err(err) => return Err(err),
        };

        let set_cookies = vec![
            cookies::access_cookie(self.cookies, &pair.access_token, self.tokens.access_ttl()),
            cookies::refresh_cookie(self.cookies, &pair.refresh_token, self.tokens.refresh_ttl()),
        ];
        let data = LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: record.identity(),
        };
        Ok(ApiResponse::ok("login successful", Some(encode(&data)?)).with_cookies(set_cookies))
    }

    fn refresh(&self, request: &ApiRequest) -> MedgateResult<ApiResponse> {
        let refresh_token = request
            .cookies
            .get(REFRESH_COOKIE)
            .map(String::as_str)
            .or_else(|| request.body.get("refreshToken").and_then(Value::as_str))
            .ok_or_else(|| MedgateError::SessionInvalid {
                reason: "no refresh token presented".to_string(),
            })?;

        let access_token = self.tokens.refresh(refresh_token)?;
        let cookie = cookies::access_cookie(self.cookies, &access_token, self.tokens.access_ttl());
        let data = RefreshResponse { access_token };
        Ok(ApiResponse::ok("token refreshed", Some(encode(&data)?)).with_cookies(vec![cookie]))
    }

    fn logout(&self) -> ApiResponse {
        ApiResponse::ok("logged out", None).with_cookies(cookies::clear_session(self.cookies))
    }

    fn getme(&self, request: &ApiRequest, role: Role) -> MedgateResult<ApiResponse> {
        let (claims, record) = self.authenticate(request, false)?;
        if claims.role != role {
            return Err(MedgateError::Forbidden {
                reason: format!("session belongs to a {} account", claims.role),
            });
        }
        Ok(ApiResponse::ok("identity", Some(encode(&record.identity())?)))
    }

    fn register(&self, request: &ApiRequest, role: Role) -> MedgateResult<ApiResponse> {
        let body: RegisterRequest = parse_body(request)?;
        let profile = match role {
            Role::SuperAdmin => {
                return Err(MedgateError::Forbidden {
                    reason: "superadmin accounts cannot self-register".to_string(),
                })
            }
            Role::Patient => Profile::Patient {
                phone: body.phone.clone().filter(|phone| !phone.trim().is_empty()),
            },
            Role::Doctor => Profile::Doctor {
                specialization: required(&body.specialization, "specialization")?,
                license_number: required(&body.license_number, "licenseNumber")?,
            },
            Role::Admin => Profile::Admin {
                hospital_name: required(&body.hospital_name, "hospitalName")?,
            },
        };

        let email = body.email.trim();
        if !email.contains('@') {
            return Err(MedgateError::validation("email address is malformed"));
        }
        let name = required(&Some(body.name.clone()), "name")?;
        if body.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(MedgateError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let record = CredentialRecord::register(
            email,
            self.tokens.hash_password(&body.password)?,
            name,
            profile,
            self.clock.now(),
        );
        let identity = record.identity();
        self.store.insert(record)?;
        info!(account_id = %identity.id(), role = %role, "account registered");

        let mut response = ApiResponse::ok("registered", Some(json!({ "user": encode(&identity)? })));
        response.status = 201;
        Ok(response)
    }

    // ── Review endpoints ─────────────────────────────────────────────────────

    fn review(&self, request: &ApiRequest, action: &str) -> MedgateResult<ApiResponse> {
        let body: ReviewRequest = parse_body(request)?;
        let reason = body.reason.clone().unwrap_or_default();
        let action = match action {
            "approve" => ReviewAction::Approve,
            "reject" => ReviewAction::Reject { reason },
            "request-revision" => ReviewAction::RequestRevision { reason },
            "reapply" => ReviewAction::Reapply,
            other => {
                return Err(MedgateError::NotFound {
                    entity: "review action".to_string(),
                    id: other.to_string(),
                })
            }
        };

        let record = if action.is_self_service() {
            self.authorize_reapply(request, &body)?;
            self.reviews.reapply(&body.id)?
        } else {
            let (_, reviewer) = self.authenticate(request, true)?;
            let target = self
                .store
                .get(&body.id)?
                .ok_or_else(|| MedgateError::account_not_found(body.id))?;
            self.authorize_reviewer(&reviewer, &target)?;
            self.reviews.apply(&body.id, action.clone(), Some(reviewer.id))?
        };

        Ok(ApiResponse::ok(
            format!("{} applied", action.name()),
            Some(encode(&record.identity())?),
        ))
    }

    fn authorize_reviewer(&self, reviewer: &CredentialRecord, target: &CredentialRecord) -> MedgateResult<()> {
        if !reviewer.effective_review_status().is_approved() {
            warn!(reviewer_id = %reviewer.id, "unapproved account attempted a review");
            return Err(MedgateError::Forbidden {
                reason: "reviewer account is not approved".to_string(),
            });
        }
        if !reviewer.role().may_review(target.role()) {
            warn!(
                reviewer_id = %reviewer.id,
                reviewer_role = %reviewer.role(),
                target_role = %target.role(),
                "review refused for role"
            );
            return Err(MedgateError::Forbidden {
                reason: format!("a {} may not review a {}", reviewer.role(), target.role()),
            });
        }
        Ok(())
    }

    /// Reapply is self-service: either the account's own active session, or
    /// its password when rejection has blocked it from signing in.
    fn authorize_reapply(&self, request: &ApiRequest, body: &ReviewRequest) -> MedgateResult<()> {
        if let Some(password) = &body.password {
            let record = self
                .store
                .get(&body.id)?
                .ok_or(MedgateError::InvalidCredentials)?;
            if !PasswordHasher::verify(&record.password_hash, password) {
                warn!(account_id = %body.id, "reapply refused, password mismatch");
                return Err(MedgateError::InvalidCredentials);
            }
            return Ok(());
        }

        let (claims, _) = self.authenticate(request, true)?;
        if claims.user_id != body.id {
            return Err(MedgateError::Forbidden {
                reason: "accounts may only reapply for themselves".to_string(),
            });
        }
        Ok(())
    }

    // ── Middleware ───────────────────────────────────────────────────────────

    /// Verify the access token and load its account. With `require_active`,
    /// an inactive account is refused even if its token is valid.
    fn authenticate(
        &self,
        request: &ApiRequest,
        require_active: bool,
    ) -> MedgateResult<(Claims, CredentialRecord)> {
        let token = request.access_token().ok_or(MedgateError::AuthExpired)?;
        let claims = self.tokens.verify(token)?;
        let record = self
            .store
            .get(&claims.user_id)?
            .ok_or(MedgateError::AuthExpired)?;
        if require_active && !record.is_active {
            warn!(account_id = %record.id, path = %request.path, "blocked account presented a valid token");
            return Err(MedgateError::AccountBlocked);
        }
        Ok((claims, record))
    }
}

fn parse_body<T: DeserializeOwned>(request: &ApiRequest) -> MedgateResult<T> {
    serde_json::from_value(request.body.clone())
        .map_err(|e| MedgateError::validation(format!("malformed request body: {}", e)))
}

fn encode<T: Serialize>(value: &T) -> MedgateResult<Value> {
    serde_json::to_value(value).map_err(|e| MedgateError::Transport {
        reason: format!("failed to encode response: {}", e),
    })
}

fn required(value: &Option<String>, field: &str) -> MedgateResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MedgateError::validation(format!("{} is required", field)))
}
