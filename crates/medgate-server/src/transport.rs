//! A `Transport` that calls an `AuthServer` in the same process.
//!
//! It keeps a cookie jar the way a browser does: `Set-Cookie` instructions
//! from every response are applied, and stored cookies ride along on every
//! request.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use medgate_contracts::{
    error::MedgateResult,
    wire::{ApiRequest, ApiResponse, CookieJar},
};
use medgate_core::traits::Transport;

use crate::server::AuthServer;

pub struct InProcessTransport {
    server: Arc<AuthServer>,
    jar: Mutex<CookieJar>,
}

impl InProcessTransport {
    pub fn new(server: Arc<AuthServer>) -> Self {
        Self {
            server,
            jar: Mutex::new(CookieJar::default()),
        }
    }

    pub fn server(&self) -> &Arc<AuthServer> {
        &self.server
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar().get(name).map(str::to_string)
    }

    /// Overwrite a cookie, e.g. to present a stale or tampered token.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar().insert(name, value);
    }

    pub fn clear_cookies(&self) {
        self.jar().clear();
    }

    fn jar(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, mut request: ApiRequest) -> MedgateResult<ApiResponse> {
        self.jar().attach(&mut request);
        let response = self.server.handle(request);
        self.jar().apply(&response.set_cookies);
        Ok(response)
    }
}
