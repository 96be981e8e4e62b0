//! Request, response, and cookie types shared by the server and the client.
//!
//! MEDGATE models HTTP at the level the session layer cares about: a method,
//! a path, a JSON body, cookies, and a status code wrapped around the
//! `{success, message, data?}` envelope.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    account::AccountId,
    error::{MedgateError, MedgateResult},
    identity::Identity,
    review::ReviewStatus,
    role::Role,
};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// `GET /{role}/getme`
pub fn getme_path(role: Role) -> String {
    format!("/{}/getme", role)
}

/// `POST /{role}/register`
pub fn register_path(role: Role) -> String {
    format!("/{}/register", role)
}

/// `PATCH /review/{action}`
pub fn review_path(action: &str) -> String {
    format!("/review/{}", action)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Value,
    /// `Authorization: Bearer` token, for callers that do not use cookies.
    pub bearer: Option<String>,
    pub cookies: BTreeMap<String, String>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            bearer: None,
            cookies: BTreeMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, Value::Null)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path, body)
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// True for the refresh call, which the gateway must never retry.
    pub fn is_refresh(&self) -> bool {
        self.method == Method::Post && self.path == REFRESH_PATH
    }

    /// True for endpoints that do not run on a session (login, logout,
    /// registration). A 401 from these is an answer, not an expired session.
    pub fn is_sessionless(&self) -> bool {
        self.method == Method::Post
            && (self.path == LOGIN_PATH
                || self.path == LOGOUT_PATH
                || self.path.ends_with("/register"))
    }

    /// The access token presented with this request, bearer header first.
    pub fn access_token(&self) -> Option<&str> {
        self.bearer
            .as_deref()
            .or_else(|| self.cookies.get(ACCESS_COOKIE).map(String::as_str))
    }
}

/// The JSON envelope every endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
}

/// A `Set-Cookie` instruction attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Lifetime in seconds; zero deletes the cookie.
    pub max_age: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl SetCookie {
    /// Render as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Path=/; Max-Age={}",
            self.name, self.value, self.max_age
        );
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str(match self.same_site {
            SameSite::Strict => "; SameSite=Strict",
            SameSite::Lax => "; SameSite=Lax",
        });
        out
    }

    pub fn is_removal(&self) -> bool {
        self.max_age <= 0
    }
}

/// A response: status, envelope, and cookies to set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Envelope<Value>,
    pub set_cookies: Vec<SetCookie>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            status: 200,
            body: Envelope {
                success: true,
                message: message.into(),
                data,
            },
            set_cookies: Vec::new(),
        }
    }

    pub fn from_error(err: &MedgateError) -> Self {
        Self {
            status: err.status_code(),
            body: Envelope {
                success: false,
                message: err.to_string(),
                data: None,
            },
            set_cookies: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<SetCookie>) -> Self {
        self.set_cookies.extend(cookies);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.body.success
    }

    /// Turn a failed response back into a `MedgateError`.
    pub fn error(&self) -> Option<MedgateError> {
        (!self.is_success()).then(|| MedgateError::from_status(self.status, self.body.message.clone()))
    }

    /// Decode `data` into `T`, or return the error the response carries.
    pub fn into_data<T: DeserializeOwned>(self) -> MedgateResult<T> {
        if let Some(err) = self.error() {
            return Err(err);
        }
        let data = self.body.data.unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| MedgateError::Transport {
            reason: format!("malformed response body: {}", e),
        })
    }
}

/// Client-side cookie store: applies `Set-Cookie` and attaches cookies to requests.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn apply(&mut self, set_cookies: &[SetCookie]) {
        for cookie in set_cookies {
            if cookie.is_removal() {
                self.cookies.remove(&cookie.name);
            } else {
                self.cookies.insert(cookie.name.clone(), cookie.value.clone());
            }
        }
    }

    pub fn attach(&self, request: &mut ApiRequest) {
        for (name, value) in &self.cookies {
            request.cookies.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Overwrite a cookie directly (used to simulate a tampered or stale cookie).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }
}

// ── Request and response bodies ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Body of the four review endpoints. `reason` is required for reject and
/// request-revision and ignored otherwise.
///
/// `password` lets a blocked account reapply without a session: rejection
/// deactivates the account, so it can no longer sign in to do so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: AccountId,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ReviewRequest {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            reason: None,
            password: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Data attached to a refused login of a reviewed account, so the login
/// page can show why and offer reapply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNotice {
    pub id: AccountId,
    pub role: Role,
    pub review_status: ReviewStatus,
    pub rejection_reason: Option<String>,
}

impl ReviewNotice {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.id(),
            role: identity.role(),
            review_status: identity.review_status(),
            rejection_reason: identity.rejection_reason().map(str::to_string),
        }
    }

    /// True when the account may call reapply.
    pub fn can_reapply(&self) -> bool {
        matches!(
            self.review_status,
            ReviewStatus::Rejected | ReviewStatus::Revision
        )
    }
}

/// Body of `POST /{role}/register`. Which optional fields are required
/// depends on the role in the path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub hospital_name: Option<String>,
}
